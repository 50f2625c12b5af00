//! Inbound ports: the audit operations a dispatcher drives.
//!
//! Every method takes raw, untrusted input and returns a ledger; input
//! validation failures surface as an `invalidArguments` finding, never as
//! an error. No method panics or propagates an error to the caller.

use async_trait::async_trait;

use crate::domain::results::AuditResults;

/// The version reconciler and catalog bookkeeping operations.
#[async_trait]
pub trait VersionAuditApi: Send + Sync {
    /// Reconcile catalog version, parent-object version, and on-storage
    /// version for one object.
    async fn check_existence(&self, object_id: &str) -> AuditResults;

    /// First catalog entry for a package already present on storage.
    async fn create_object(&self, object_id: &str, storage_root: &str) -> AuditResults;

    /// Transfer a record to a new storage root, resetting status and all
    /// validation timestamps.
    async fn migrate_storage_root(
        &self,
        object_id: &str,
        from: &str,
        to: &str,
    ) -> AuditResults;
}

/// The fixity auditor.
#[async_trait]
pub trait FixityAuditApi: Send + Sync {
    /// Cryptographically verify the package against its two manifests and
    /// transition the record's status from the outcome.
    async fn validate_checksums(&self, object_id: &str) -> AuditResults;
}

/// The replica auditor and part delivery.
#[async_trait]
pub trait ReplicaAuditApi: Send + Sync {
    /// Verify chunked replica completeness for one (object, version,
    /// endpoint).
    async fn verify_replica(&self, object_id: &str, version: u32, endpoint: &str)
        -> AuditResults;

    /// Upload one locally produced zip part and upsert its catalog row.
    async fn deliver_part(
        &self,
        object_id: &str,
        version: u32,
        endpoint: &str,
        suffix: &str,
        parts_count: u32,
        bytes: Vec<u8>,
    ) -> AuditResults;
}
