//! Version reconciler scenarios over a real package tree on disk.

use tempfile::TempDir;

use pv_audit::ports::inbound::VersionAuditApi;
use pv_audit::ports::outbound::CatalogStore;
use pv_audit::ResultCode;
use pv_types::RecordStatus;

use crate::integration::support::{build_package, oid, seed_object, vn, Harness, NOW};

#[tokio::test]
async fn test_agreeing_versions_leave_record_untouched() {
    let tmp = TempDir::new().unwrap();
    build_package(tmp.path(), 3);
    let h = Harness::over(tmp.path());
    seed_object(&h.catalog, 3, RecordStatus::Ok);

    let results = h.version.check_existence("bj102hs9687").await;

    assert_eq!(results.len(), 1);
    assert!(results.contains(ResultCode::VersionMatches));
    let record = h.catalog.record(&oid()).await.unwrap().unwrap();
    assert_eq!(record.status, RecordStatus::Ok);
    assert_eq!(record.version, vn(3));
    assert_eq!(record.last_version_audit, Some(NOW));
}

#[tokio::test]
async fn test_newer_package_on_storage_advances_the_catalog() {
    let tmp = TempDir::new().unwrap();
    build_package(tmp.path(), 4);
    let h = Harness::over(tmp.path());
    seed_object(&h.catalog, 3, RecordStatus::Ok);

    let results = h.version.check_existence("bj102hs9687").await;

    assert!(results.contains(ResultCode::ActualVersGreaterThanCatalog));
    assert!(results.contains(ResultCode::RecordStatusChanged));
    let record = h.catalog.record(&oid()).await.unwrap().unwrap();
    assert_eq!(record.version, vn(4));
    // Advanced but not yet fixity-checked.
    assert_eq!(record.status, RecordStatus::ValidityUnknown);
    let object = h.catalog.object(&oid()).await.unwrap().unwrap();
    assert_eq!(object.current_version, vn(4));
}

#[tokio::test]
async fn test_older_package_on_storage_is_an_error_state() {
    let tmp = TempDir::new().unwrap();
    build_package(tmp.path(), 2);
    let h = Harness::over(tmp.path());
    seed_object(&h.catalog, 3, RecordStatus::Ok);

    let results = h.version.check_existence("bj102hs9687").await;

    assert!(results.contains(ResultCode::UnexpectedVersion));
    assert!(results.contains(ResultCode::RecordStatusChanged));
    let record = h.catalog.record(&oid()).await.unwrap().unwrap();
    // The catalog's belief is kept; only the status records the problem.
    assert_eq!(record.version, vn(3));
    assert_eq!(record.status, RecordStatus::UnexpectedVersionOnStorage);
}

#[tokio::test]
async fn test_create_then_check_round_trip() {
    let tmp = TempDir::new().unwrap();
    build_package(tmp.path(), 1);
    let h = Harness::over(tmp.path());

    let created = h.version.create_object("bj102hs9687", "root-01").await;
    assert!(created.contains(ResultCode::CreatedNewObject));

    let checked = h.version.check_existence("bj102hs9687").await;
    assert!(checked.contains(ResultCode::VersionMatches));
    let record = h.catalog.record(&oid()).await.unwrap().unwrap();
    assert_eq!(record.version, vn(1));
}

#[tokio::test]
async fn test_ledger_json_shape_survives_the_full_stack() {
    let tmp = TempDir::new().unwrap();
    build_package(tmp.path(), 3);
    let h = Harness::over(tmp.path());
    seed_object(&h.catalog, 3, RecordStatus::Ok);

    let results = h.version.check_existence("bj102hs9687").await;
    let json = results.to_json();

    assert_eq!(json["subjectId"], "bj102hs9687");
    assert_eq!(
        json["results"][0]["versionMatches"],
        "actual version (3) matches CatalogRecord db version"
    );
}

#[tokio::test]
async fn test_commit_failure_reports_only_observations() {
    let tmp = TempDir::new().unwrap();
    build_package(tmp.path(), 4);
    let h = Harness::over(tmp.path());
    seed_object(&h.catalog, 3, RecordStatus::Ok);
    h.catalog.fail_next_commit("connection reset by peer");

    let results = h.version.check_existence("bj102hs9687").await;

    assert!(results.contains(ResultCode::ActualVersGreaterThanCatalog));
    assert!(!results.contains(ResultCode::RecordStatusChanged));
    assert!(results.contains(ResultCode::DbUpdateFailed));
    let record = h.catalog.record(&oid()).await.unwrap().unwrap();
    assert_eq!(record.version, vn(3));
    assert_eq!(record.status, RecordStatus::Ok);
}
