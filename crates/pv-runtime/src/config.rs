//! Runtime configuration.
//!
//! One `VaultConfig` for the whole process, loadable from the environment
//! with sane defaults for development. No process-wide singletons: the
//! config is built once in `main` and handed into constructors.

use pv_types::StorageRootName;
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no storage roots configured")]
    NoStorageRoots,

    #[error("worker count must be at least 1")]
    NoWorkers,

    #[error("{what} must be positive")]
    ZeroInterval { what: &'static str },

    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

/// Complete runtime configuration.
#[derive(Debug, Clone, Default)]
pub struct VaultConfig {
    pub storage: StorageConfig,
    pub replication: ReplicationConfig,
    pub scheduling: SchedulingConfig,
    pub logging: LoggingConfig,
}

impl VaultConfig {
    /// Load from `PV_*` environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Environment-independent loader backing [`from_env`](Self::from_env).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(raw) = lookup("PV_STORAGE_ROOTS") {
            config.storage.roots = parse_roots(&raw)?;
        }
        if let Some(raw) = lookup("PV_ENDPOINTS") {
            config.replication.endpoints = raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(raw) = lookup("PV_CHECK_UNREPLICATED") {
            config.replication.check_unreplicated =
                parse_value("PV_CHECK_UNREPLICATED", &raw)?;
        }
        if let Some(raw) = lookup("PV_WORKERS") {
            config.scheduling.worker_count = parse_value("PV_WORKERS", &raw)?;
        }
        if let Some(raw) = lookup("PV_SCAN_INTERVAL_SECS") {
            config.scheduling.scan_interval_secs = parse_value("PV_SCAN_INTERVAL_SECS", &raw)?;
        }
        if let Some(raw) = lookup("PV_VERSION_AUDIT_TTL_SECS") {
            config.scheduling.version_audit_ttl_secs =
                parse_value("PV_VERSION_AUDIT_TTL_SECS", &raw)?;
        }
        if let Some(raw) = lookup("PV_FIXITY_TTL_SECS") {
            config.scheduling.fixity_ttl_secs = parse_value("PV_FIXITY_TTL_SECS", &raw)?;
        }
        if let Some(raw) = lookup("PV_ARCHIVE_TTL_SECS") {
            config.scheduling.archive_ttl_secs = parse_value("PV_ARCHIVE_TTL_SECS", &raw)?;
        }
        if let Some(raw) = lookup("PV_LOG_FILTER") {
            config.logging.filter = raw;
        }

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.roots.is_empty() {
            return Err(ConfigError::NoStorageRoots);
        }
        if self.scheduling.worker_count == 0 {
            return Err(ConfigError::NoWorkers);
        }
        for (what, value) in [
            ("scan interval", self.scheduling.scan_interval_secs),
            ("version audit ttl", self.scheduling.version_audit_ttl_secs),
            ("fixity ttl", self.scheduling.fixity_ttl_secs),
            ("archive ttl", self.scheduling.archive_ttl_secs),
        ] {
            if value == 0 {
                return Err(ConfigError::ZeroInterval { what });
            }
        }
        Ok(())
    }
}

/// `name=path,name=path` pairs.
fn parse_roots(raw: &str) -> Result<HashMap<StorageRootName, PathBuf>, ConfigError> {
    let mut roots = HashMap::new();
    for pair in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let (name, path) = pair.split_once('=').ok_or(ConfigError::InvalidValue {
            key: "PV_STORAGE_ROOTS",
            value: pair.to_string(),
        })?;
        roots.insert(StorageRootName::new(name.trim()), PathBuf::from(path.trim()));
    }
    Ok(roots)
}

fn parse_value<T: std::str::FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: raw.to_string(),
    })
}

/// Named storage roots holding preservation packages.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub roots: HashMap<StorageRootName, PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            roots: HashMap::from([(
                StorageRootName::new("root-01"),
                PathBuf::from("./storage/root-01"),
            )]),
        }
    }
}

/// Replica endpoints and auditing behavior toward them.
#[derive(Debug, Clone)]
pub struct ReplicationConfig {
    /// Endpoint names replica audits run against.
    pub endpoints: Vec<String>,
    /// Also query endpoints for parts the catalog marks unreplicated.
    pub check_unreplicated: bool,
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self {
            endpoints: vec!["aws-east".to_string()],
            check_unreplicated: false,
        }
    }
}

/// Worker pool sizing and re-check cadence defaults.
///
/// The fixity and archive TTLs are fallbacks for objects whose policy does
/// not override them.
#[derive(Debug, Clone)]
pub struct SchedulingConfig {
    pub worker_count: usize,
    pub scan_interval_secs: u64,
    pub version_audit_ttl_secs: u64,
    pub fixity_ttl_secs: u64,
    pub archive_ttl_secs: u64,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            worker_count: 4,
            scan_interval_secs: 300,
            // Weekly version audits, quarterly fixity, monthly archive checks.
            version_audit_ttl_secs: 7 * 24 * 3600,
            fixity_ttl_secs: 90 * 24 * 3600,
            archive_ttl_secs: 30 * 24 * 3600,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// `EnvFilter` directive string.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}
