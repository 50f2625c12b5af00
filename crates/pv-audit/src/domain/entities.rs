//! Catalog entities owned by the audit subsystem.
//!
//! One canonical schema: a `PreservationObject` owns exactly one
//! `CatalogRecord` and any number of `ReplicaVersionRecord`s, each of which
//! owns its `ReplicaPartRecord`s. Ownership is enforced by the catalog
//! store; deleting an object cascades to everything below it.

use pv_types::{
    EndpointName, Md5Digest, ObjectId, PartStatus, PartSuffix, RecordStatus, ReplicaStatus,
    StorageRootName, Timestamp, VersionNumber,
};
use serde::{Deserialize, Serialize};

/// Re-check cadence and required endpoints for a set of objects.
///
/// Policy rows are seeded from static configuration by an external loader;
/// the auditors only read them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicationPolicy {
    pub id: String,
    /// Seconds between fixity re-checks.
    pub fixity_ttl_secs: u64,
    /// Seconds between replica (archive) re-checks.
    pub archive_ttl_secs: u64,
    /// Endpoints every version of a governed object must be replicated to.
    pub endpoints: Vec<EndpointName>,
}

/// The root entity: one preserved object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreservationObject {
    pub object_id: ObjectId,
    /// Monotonically non-decreasing; mutated only by the version reconciler
    /// after validation.
    pub current_version: VersionNumber,
    pub policy_id: String,
}

/// What the catalog believes about the object's moab on storage. 1:1 with
/// its `PreservationObject`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogRecord {
    pub object_id: ObjectId,
    pub status: RecordStatus,
    /// Believed on-storage version.
    pub version: VersionNumber,
    /// Approximate byte size, informational only. Never an input to fixity
    /// decisions.
    pub size: u64,
    pub storage_root: StorageRootName,
    /// Set when the record was migrated from another storage root.
    pub migrated_from: Option<StorageRootName>,
    /// Human-readable trail of the most recent transition.
    pub status_details: String,
    pub last_structural_validation: Option<Timestamp>,
    pub last_version_audit: Option<Timestamp>,
    pub last_fixity_validation: Option<Timestamp>,
}

impl CatalogRecord {
    /// A fresh record in the initial state, as created alongside its object
    /// or after a storage-root migration.
    pub fn initial(
        object_id: ObjectId,
        version: VersionNumber,
        size: u64,
        storage_root: StorageRootName,
    ) -> Self {
        Self {
            object_id,
            status: RecordStatus::ValidityUnknown,
            version,
            size,
            storage_root,
            migrated_from: None,
            status_details: String::new(),
            last_structural_validation: None,
            last_version_audit: None,
            last_fixity_validation: None,
        }
    }
}

/// One replicated version of one object on one endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicaVersionRecord {
    pub object_id: ObjectId,
    pub endpoint: EndpointName,
    pub version: VersionNumber,
    pub status: ReplicaStatus,
    /// Declared total part count; `None` until the first part is observed.
    pub stated_parts_count: Option<u32>,
}

/// One zip chunk of a replicated version.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicaPartRecord {
    pub suffix: PartSuffix,
    pub md5: Md5Digest,
    pub size: u64,
    /// This part's own copy of the declared total, used to detect drift
    /// between sibling parts.
    pub parts_count: u32,
    pub status: PartStatus,
    pub last_existence_check: Option<Timestamp>,
    pub last_fixity_check: Option<Timestamp>,
}
