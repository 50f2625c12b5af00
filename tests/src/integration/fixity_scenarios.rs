//! Fixity walk scenarios over a multi-version package on disk, including
//! the absorbing `invalid_checksum` interaction with the version audit.

use std::fs;

use tempfile::TempDir;

use pv_audit::ports::inbound::{FixityAuditApi, VersionAuditApi};
use pv_audit::ports::outbound::CatalogStore;
use pv_audit::ResultCode;
use pv_types::RecordStatus;

use crate::integration::support::{build_package, oid, seed_object, vn, Harness, NOW};

#[tokio::test]
async fn test_clean_two_version_package_reaches_ok() {
    let tmp = TempDir::new().unwrap();
    build_package(tmp.path(), 2);
    let h = Harness::over(tmp.path());
    seed_object(&h.catalog, 2, RecordStatus::ValidityUnknown);

    let results = h.fixity.validate_checksums("bj102hs9687").await;

    assert!(results.contains(ResultCode::MoabChecksumValid));
    assert_eq!(results.completed_results().len(), 1);
    let record = h.catalog.record(&oid()).await.unwrap().unwrap();
    assert_eq!(record.status, RecordStatus::Ok);
    assert_eq!(record.last_fixity_validation, Some(NOW));
    assert_eq!(record.last_version_audit, Some(NOW));
}

#[tokio::test]
async fn test_stray_file_is_flagged_once_and_fails_the_record() {
    let tmp = TempDir::new().unwrap();
    build_package(tmp.path(), 2);
    fs::write(
        tmp.path()
            .join(oid().tree_path())
            .join("v0002/data/content/stray.bin"),
        b"nobody expects me",
    )
    .unwrap();
    let h = Harness::over(tmp.path());
    seed_object(&h.catalog, 2, RecordStatus::Ok);

    let results = h.fixity.validate_checksums("bj102hs9687").await;

    let uncataloged = results
        .findings()
        .iter()
        .filter(|f| f.code() == ResultCode::FileNotInSignatureCatalog)
        .count();
    assert_eq!(uncataloged, 1);
    assert!(results.contains(ResultCode::FileNotInManifest));
    let record = h.catalog.record(&oid()).await.unwrap().unwrap();
    assert_eq!(record.status, RecordStatus::InvalidChecksum);
}

#[tokio::test]
async fn test_missing_cataloged_file_is_flagged_per_file() {
    let tmp = TempDir::new().unwrap();
    build_package(tmp.path(), 2);
    fs::remove_file(
        tmp.path()
            .join(oid().tree_path())
            .join("v0001/data/content/page-1.jpg"),
    )
    .unwrap();
    let h = Harness::over(tmp.path());
    seed_object(&h.catalog, 2, RecordStatus::Ok);

    let results = h.fixity.validate_checksums("bj102hs9687").await;

    assert!(results.contains(ResultCode::FileNotInMoab));
    let record = h.catalog.record(&oid()).await.unwrap().unwrap();
    assert_eq!(record.status, RecordStatus::InvalidChecksum);
}

#[tokio::test]
async fn test_invalid_checksum_absorbs_version_audit_transitions() {
    let tmp = TempDir::new().unwrap();
    build_package(tmp.path(), 2);
    // Tamper, fail the fixity pass, then run a version audit: the record
    // must stay invalid_checksum no matter what the reconciler sees.
    fs::write(
        tmp.path()
            .join(oid().tree_path())
            .join("v0001/data/content/page-1.jpg"),
        b"tampered",
    )
    .unwrap();
    let h = Harness::over(tmp.path());
    seed_object(&h.catalog, 2, RecordStatus::Ok);

    let fixity = h.fixity.validate_checksums("bj102hs9687").await;
    assert!(fixity.contains(ResultCode::ChecksumMismatch));

    let version = h.version.check_existence("bj102hs9687").await;
    assert!(version.contains(ResultCode::UnableToCheckStatus));
    let record = h.catalog.record(&oid()).await.unwrap().unwrap();
    assert_eq!(record.status, RecordStatus::InvalidChecksum);
}

#[tokio::test]
async fn test_clean_refixity_is_the_only_way_back_to_ok() {
    let tmp = TempDir::new().unwrap();
    build_package(tmp.path(), 2);
    let h = Harness::over(tmp.path());
    seed_object(&h.catalog, 2, RecordStatus::InvalidChecksum);

    let results = h.fixity.validate_checksums("bj102hs9687").await;

    assert!(results.contains(ResultCode::MoabChecksumValid));
    let record = h.catalog.record(&oid()).await.unwrap().unwrap();
    assert_eq!(record.status, RecordStatus::Ok);
    assert_eq!(record.version, vn(2));
}
