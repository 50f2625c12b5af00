//! The runtime pipeline end to end: due-audit scan, worker pool, reporter.

use std::sync::Arc;

use parking_lot::Mutex;
use tempfile::TempDir;

use pv_audit::domain::results::AuditResults;
use pv_audit::ports::outbound::{AuditReporter, CatalogStore};
use pv_runtime::config::SchedulingConfig;
use pv_runtime::jobs::{scan_due, spawn_workers, AuditKind, WorkerDeps};
use pv_types::RecordStatus;

use crate::integration::support::{build_package, oid, seed_object, Harness, NOW};

#[derive(Default)]
struct RecordingReporter {
    ledgers: Mutex<Vec<AuditResults>>,
}

impl AuditReporter for RecordingReporter {
    fn report(&self, results: &AuditResults) {
        self.ledgers.lock().push(results.clone());
    }
}

#[tokio::test]
async fn test_scan_feeds_workers_which_stamp_and_report() {
    let tmp = TempDir::new().unwrap();
    build_package(tmp.path(), 1);
    let h = Harness::over(tmp.path());
    // Never audited, so both the version and fixity scans pick it up.
    seed_object(&h.catalog, 1, RecordStatus::ValidityUnknown);

    let scheduling = SchedulingConfig::default();
    let jobs = scan_due(h.catalog.as_ref(), &scheduling, NOW).await;
    assert!(jobs.iter().any(|j| j.kind == AuditKind::VersionCheck));
    assert!(jobs.iter().any(|j| j.kind == AuditKind::FixityCheck));

    let reporter = Arc::new(RecordingReporter::default());
    let deps = WorkerDeps {
        version: Arc::new(h.version),
        fixity: Arc::new(h.fixity),
        replica: Arc::new(h.replica),
        reporter: reporter.clone(),
    };
    let (tx, handles) = spawn_workers(2, deps);
    let expected = jobs.len();
    for job in jobs {
        tx.send(job).await.unwrap();
    }
    drop(tx);
    for handle in handles {
        handle.await.unwrap();
    }

    let ledgers = reporter.ledgers.lock();
    assert_eq!(ledgers.len(), expected);
    assert!(ledgers.iter().all(|l| l.subject_id() == "bj102hs9687"));

    // The units ran for real: the record is now fixity-validated and ok.
    let record = h.catalog.record(&oid()).await.unwrap().unwrap();
    assert_eq!(record.status, RecordStatus::Ok);
    assert_eq!(record.last_fixity_validation, Some(NOW));
    assert_eq!(record.last_version_audit, Some(NOW));
}
