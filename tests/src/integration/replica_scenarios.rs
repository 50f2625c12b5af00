//! Replica audit scenarios: catalog rows, a real package on disk for the
//! size comparison, and the in-memory endpoint.

use tempfile::TempDir;

use pv_audit::ports::inbound::ReplicaAuditApi;
use pv_audit::ports::outbound::{CatalogStore, PartMetadata};
use pv_audit::ResultCode;
use pv_types::{PartKey, PartStatus, PartSuffix, RecordStatus, ReplicaStatus};

use crate::integration::support::{
    build_package, endpoint, md5, oid, part, seed_object, seed_replica, vn, Harness,
};

/// `payload bytes for version 1` is 27 bytes on disk; parts at or above
/// that total pass the size comparison.
const PART_SIZE: u64 = 64;

#[tokio::test]
async fn test_fully_replicated_version_verifies_clean() {
    let tmp = TempDir::new().unwrap();
    build_package(tmp.path(), 1);
    let h = Harness::over(tmp.path());
    seed_object(&h.catalog, 1, RecordStatus::Ok);
    let z01 = PartSuffix::segment(1).unwrap();
    seed_replica(
        &h.catalog,
        1,
        vec![
            part(PartSuffix::ZIP, md5("a"), PART_SIZE, 2, PartStatus::Ok),
            part(z01, md5("b"), PART_SIZE, 2, PartStatus::Ok),
        ],
    );
    for (suffix, nibble) in [(PartSuffix::ZIP, "a"), (z01, "b")] {
        h.object_store.set_object(
            &endpoint(),
            &PartKey::new(oid(), vn(1), suffix),
            PartMetadata {
                checksum_md5: md5(nibble),
                size: PART_SIZE,
            },
        );
    }

    let results = h.replica.verify_replica("bj102hs9687", 1, "aws-east").await;

    assert!(results.is_empty(), "{:?}", results.findings());
    let (replica, _) = h
        .catalog
        .replica_version(&oid(), &endpoint(), vn(1))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(replica.status, ReplicaStatus::Ok);
}

#[tokio::test]
async fn test_declared_three_stored_two_one_lost_is_incomplete() {
    let tmp = TempDir::new().unwrap();
    build_package(tmp.path(), 1);
    let h = Harness::over(tmp.path());
    seed_object(&h.catalog, 1, RecordStatus::Ok);
    let z01 = PartSuffix::segment(1).unwrap();
    seed_replica(
        &h.catalog,
        1,
        vec![
            part(PartSuffix::ZIP, md5("a"), PART_SIZE, 3, PartStatus::Ok),
            part(z01, md5("b"), PART_SIZE, 3, PartStatus::Ok),
        ],
    );
    // Only the base chunk survived on the endpoint.
    h.object_store.set_object(
        &endpoint(),
        &PartKey::new(oid(), vn(1), PartSuffix::ZIP),
        PartMetadata {
            checksum_md5: md5("a"),
            size: PART_SIZE,
        },
    );

    let results = h.replica.verify_replica("bj102hs9687", 1, "aws-east").await;

    assert!(results.contains(ResultCode::ZipPartsCountDiffersFromActual));
    assert!(results.contains(ResultCode::ZipPartNotFound));
    let (replica, parts) = h
        .catalog
        .replica_version(&oid(), &endpoint(), vn(1))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(replica.status, ReplicaStatus::Incomplete);
    assert_eq!(parts[0].status, PartStatus::Ok);
    assert_eq!(parts[1].status, PartStatus::NotFound);
}

#[tokio::test]
async fn test_deliver_then_verify_round_trip() {
    let tmp = TempDir::new().unwrap();
    build_package(tmp.path(), 1);
    let h = Harness::over(tmp.path());
    seed_object(&h.catalog, 1, RecordStatus::Ok);

    let delivered = h
        .replica
        .deliver_part(
            "bj102hs9687",
            1,
            "aws-east",
            ".zip",
            1,
            vec![0xab; PART_SIZE as usize],
        )
        .await;
    assert!(delivered.contains(ResultCode::ZipPartDelivered));

    let verified = h.replica.verify_replica("bj102hs9687", 1, "aws-east").await;

    assert!(verified.is_empty(), "{:?}", verified.findings());
    let (replica, parts) = h
        .catalog
        .replica_version(&oid(), &endpoint(), vn(1))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(replica.status, ReplicaStatus::Ok);
    assert_eq!(parts[0].status, PartStatus::Ok);
    assert_eq!(replica.stated_parts_count, Some(1));
}
