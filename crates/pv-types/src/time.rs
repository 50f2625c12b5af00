//! Time source abstraction.
//!
//! Audit services stamp validation timestamps on every pass; taking the
//! clock as an explicit dependency keeps re-check cadence logic testable
//! with a fixed or steppable source.

/// Seconds since the Unix epoch.
pub type Timestamp = u64;

/// Abstract clock for timestamp stamping (for testability).
pub trait TimeSource: Send + Sync {
    /// Current timestamp in seconds since epoch.
    fn now(&self) -> Timestamp;
}

impl<T: TimeSource + ?Sized> TimeSource for std::sync::Arc<T> {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}

/// Default time source using system time.
#[derive(Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> Timestamp {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

/// Fixed time source for unit tests.
pub struct FixedTimeSource {
    now: Timestamp,
}

impl FixedTimeSource {
    pub fn new(now: Timestamp) -> Self {
        Self { now }
    }
}

impl TimeSource for FixedTimeSource {
    fn now(&self) -> Timestamp {
        self.now
    }
}
