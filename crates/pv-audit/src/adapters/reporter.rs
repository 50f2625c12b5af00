//! Log-sink reporter.
//!
//! The default consumer of finished ledgers: completed findings at info,
//! everything else at warn, plus the full stable-shape JSON payload for
//! downstream log processors.

use tracing::{info, warn};

use crate::domain::results::AuditResults;
use crate::ports::outbound::AuditReporter;

#[derive(Default)]
pub struct TracingReporter;

impl TracingReporter {
    pub fn new() -> Self {
        Self
    }
}

impl AuditReporter for TracingReporter {
    fn report(&self, results: &AuditResults) {
        let subject = results.subject_id();
        let check = results.check_name();

        for finding in results.completed_results() {
            info!(
                subject = %subject,
                check,
                code = finding.code().as_str(),
                "{}",
                finding.message()
            );
        }
        for finding in results.error_results() {
            warn!(
                subject = %subject,
                check,
                code = finding.code().as_str(),
                "{}",
                finding.message()
            );
        }

        info!(subject = %subject, check, payload = %results.to_json(), "audit complete");
    }
}
