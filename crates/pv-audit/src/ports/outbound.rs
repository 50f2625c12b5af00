//! Outbound ports: the dependencies an audit service requires the host to
//! provide.
//!
//! Database and network dependencies are async; filesystem access and the
//! structural validator stay synchronous. Every trait has an in-memory or
//! default adapter in `adapters/`, with controllable failure injection
//! where tests need it.

use async_trait::async_trait;
use pv_types::{
    EndpointName, FileDigests, Md5Digest, ObjectId, PartKey, PartStatus, PartSuffix,
    ReplicaStatus, StorageRootName, Timestamp, VersionNumber,
};
use thiserror::Error;

use crate::domain::entities::{
    CatalogRecord, PreservationObject, ReplicaPartRecord, ReplicaVersionRecord, ReplicationPolicy,
};
use crate::domain::results::AuditResults;
use pv_types::RecordStatus;

/// Catalog persistence failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("connection lost: {message}")]
    ConnectionLost { message: String },

    #[error("constraint violation: {message}")]
    ConstraintViolation { message: String },

    #[error("row not found: {message}")]
    RowNotFound { message: String },
}

impl CatalogError {
    /// The error class name rendered into a `dbUpdateFailed` finding.
    pub fn class(&self) -> &'static str {
        match self {
            CatalogError::ConnectionLost { .. } => "ConnectionLost",
            CatalogError::ConstraintViolation { .. } => "ConstraintViolation",
            CatalogError::RowNotFound { .. } => "RowNotFound",
        }
    }
}

/// A package file or directory could not be read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PackageError {
    #[error("not found: {path}")]
    NotFound { path: String },

    #[error("io error reading {path}: {message}")]
    Io { path: String, message: String },
}

/// A remote object-store call failed (transport, auth, throttling).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("object store error on {endpoint}: {message}")]
pub struct ObjectStoreError {
    pub endpoint: String,
    pub message: String,
}

/// Which timestamp on a catalog record to stamp.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordStamp {
    StructuralValidation,
    VersionAudit,
    FixityValidation,
}

/// Which timestamp on a replica part to stamp.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PartStamp {
    Existence,
    Fixity,
}

/// One mutation in an atomic catalog commit batch.
///
/// An audit unit collects its ops and applies them through a single
/// [`CatalogStore::commit`]; either the whole batch lands or none of it
/// does.
#[derive(Clone, Debug)]
pub enum CatalogOp {
    /// First catalog entry for an object: the object row plus its record.
    CreateObject {
        object: PreservationObject,
        record: CatalogRecord,
    },
    /// Move the parent object's current version forward.
    SetCurrentVersion {
        object_id: ObjectId,
        version: VersionNumber,
    },
    /// Reconcile the record's believed version and size with storage.
    SetRecordVersion {
        object_id: ObjectId,
        version: VersionNumber,
        size: u64,
    },
    /// Transition the record's status, recording a human-readable trail.
    SetRecordStatus {
        object_id: ObjectId,
        status: RecordStatus,
        details: String,
    },
    /// Stamp one of the record's validation timestamps.
    StampRecord {
        object_id: ObjectId,
        stamp: RecordStamp,
        at: Timestamp,
    },
    /// Transfer the record to another storage root, resetting status and
    /// all validation timestamps to the initial state.
    MigrateRecord {
        object_id: ObjectId,
        to: StorageRootName,
    },
    /// Create or update a replica version row.
    UpsertReplicaVersion { replica: ReplicaVersionRecord },
    /// Set the derived status of a replica version.
    SetReplicaStatus {
        object_id: ObjectId,
        endpoint: EndpointName,
        version: VersionNumber,
        status: ReplicaStatus,
    },
    /// Create or update one part row under a replica version.
    UpsertPart {
        object_id: ObjectId,
        endpoint: EndpointName,
        version: VersionNumber,
        part: ReplicaPartRecord,
    },
    /// Set one part's status.
    SetPartStatus {
        object_id: ObjectId,
        endpoint: EndpointName,
        version: VersionNumber,
        suffix: PartSuffix,
        status: PartStatus,
    },
    /// Stamp one of a part's check timestamps.
    StampPart {
        object_id: ObjectId,
        endpoint: EndpointName,
        version: VersionNumber,
        suffix: PartSuffix,
        stamp: PartStamp,
        at: Timestamp,
    },
}

/// The catalog database.
///
/// Reads are typed; writes go through exactly one atomic [`commit`] batch
/// per audit unit.
///
/// [`commit`]: CatalogStore::commit
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn object(&self, id: &ObjectId) -> Result<Option<PreservationObject>, CatalogError>;

    async fn record(&self, id: &ObjectId) -> Result<Option<CatalogRecord>, CatalogError>;

    async fn policy(&self, policy_id: &str) -> Result<Option<ReplicationPolicy>, CatalogError>;

    /// The replica version row and its parts, ordered by suffix.
    async fn replica_version(
        &self,
        id: &ObjectId,
        endpoint: &EndpointName,
        version: VersionNumber,
    ) -> Result<Option<(ReplicaVersionRecord, Vec<ReplicaPartRecord>)>, CatalogError>;

    /// Objects whose `last_version_audit` is older than `older_than` (or
    /// never stamped).
    async fn version_audits_due(
        &self,
        older_than: Timestamp,
    ) -> Result<Vec<ObjectId>, CatalogError>;

    /// Objects whose `last_fixity_validation` is older than `older_than`.
    async fn fixity_checks_due(&self, older_than: Timestamp)
        -> Result<Vec<ObjectId>, CatalogError>;

    /// Replica versions with at least one part last checked before
    /// `older_than` (or never checked).
    async fn replica_audits_due(
        &self,
        older_than: Timestamp,
    ) -> Result<Vec<(ObjectId, EndpointName, VersionNumber)>, CatalogError>;

    /// Apply the whole batch atomically, or none of it.
    async fn commit(&self, ops: Vec<CatalogOp>) -> Result<(), CatalogError>;
}

/// Which manifest document to read from a version's `manifests/` folder.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ManifestKind {
    Inventory,
    SignatureCatalog,
}

impl ManifestKind {
    /// On-disk file name under `manifests/`.
    pub fn file_name(self) -> &'static str {
        match self {
            ManifestKind::Inventory => "manifestInventory.xml",
            ManifestKind::SignatureCatalog => "signatureCatalog.xml",
        }
    }
}

/// Read access to moabs on the storage roots.
pub trait PackageStore: Send + Sync {
    /// Highest version directory present, or `None` when the package cannot
    /// be located at all.
    fn on_storage_version(
        &self,
        root: &StorageRootName,
        id: &ObjectId,
    ) -> Result<Option<VersionNumber>, PackageError>;

    /// Approximate total byte size of the package. Informational only.
    fn package_size(&self, root: &StorageRootName, id: &ObjectId) -> Result<u64, PackageError>;

    /// Byte size of one version's payload, for replica size comparison.
    fn version_size(
        &self,
        root: &StorageRootName,
        id: &ObjectId,
        version: VersionNumber,
    ) -> Result<u64, PackageError>;

    /// Raw XML of one manifest document.
    fn read_manifest(
        &self,
        root: &StorageRootName,
        id: &ObjectId,
        version: VersionNumber,
        kind: ManifestKind,
    ) -> Result<String, PackageError>;

    /// Relative paths of every file under the version's `data/` directory.
    /// A missing `data/` directory lists as empty.
    fn list_data_files(
        &self,
        root: &StorageRootName,
        id: &ObjectId,
        version: VersionNumber,
    ) -> Result<Vec<String>, PackageError>;

    /// Streaming digests of one data file.
    fn digest_data_file(
        &self,
        root: &StorageRootName,
        id: &ObjectId,
        version: VersionNumber,
        path: &str,
    ) -> Result<FileDigests, PackageError>;
}

/// Checksum and size metadata stored alongside a replicated part.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PartMetadata {
    pub checksum_md5: Md5Digest,
    pub size: u64,
}

/// A remote object-store endpoint holding zip part replicas.
#[async_trait]
pub trait ReplicaObjectStore: Send + Sync {
    async fn exists(
        &self,
        endpoint: &EndpointName,
        key: &PartKey,
    ) -> Result<bool, ObjectStoreError>;

    /// Stored metadata for a key, `None` when the object is absent.
    async fn metadata(
        &self,
        endpoint: &EndpointName,
        key: &PartKey,
    ) -> Result<Option<PartMetadata>, ObjectStoreError>;

    /// Upload a part with its checksum/size metadata.
    async fn put(
        &self,
        endpoint: &EndpointName,
        key: &PartKey,
        bytes: Vec<u8>,
        metadata: PartMetadata,
    ) -> Result<(), ObjectStoreError>;
}

/// Verdict of the black-box structural validator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StructuralVerdict {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

impl StructuralVerdict {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
        }
    }

    pub fn invalid(errors: Vec<String>) -> Self {
        Self {
            is_valid: false,
            errors,
        }
    }
}

/// The external low-level package validator, consumed as a black box.
pub trait StructuralValidator: Send + Sync {
    fn validate(&self, root: &StorageRootName, id: &ObjectId) -> StructuralVerdict;
}

/// Consumes a finished ledger (log sink, paging, workflow callback).
pub trait AuditReporter: Send + Sync {
    fn report(&self, results: &AuditResults);
}

// Shared adapters are handed to several services at once; forwarding the
// port traits through `Arc` keeps the service generics plain.

#[async_trait]
impl<S: CatalogStore + ?Sized> CatalogStore for std::sync::Arc<S> {
    async fn object(&self, id: &ObjectId) -> Result<Option<PreservationObject>, CatalogError> {
        (**self).object(id).await
    }

    async fn record(&self, id: &ObjectId) -> Result<Option<CatalogRecord>, CatalogError> {
        (**self).record(id).await
    }

    async fn policy(&self, policy_id: &str) -> Result<Option<ReplicationPolicy>, CatalogError> {
        (**self).policy(policy_id).await
    }

    async fn replica_version(
        &self,
        id: &ObjectId,
        endpoint: &EndpointName,
        version: VersionNumber,
    ) -> Result<Option<(ReplicaVersionRecord, Vec<ReplicaPartRecord>)>, CatalogError> {
        (**self).replica_version(id, endpoint, version).await
    }

    async fn version_audits_due(
        &self,
        older_than: Timestamp,
    ) -> Result<Vec<ObjectId>, CatalogError> {
        (**self).version_audits_due(older_than).await
    }

    async fn fixity_checks_due(
        &self,
        older_than: Timestamp,
    ) -> Result<Vec<ObjectId>, CatalogError> {
        (**self).fixity_checks_due(older_than).await
    }

    async fn replica_audits_due(
        &self,
        older_than: Timestamp,
    ) -> Result<Vec<(ObjectId, EndpointName, VersionNumber)>, CatalogError> {
        (**self).replica_audits_due(older_than).await
    }

    async fn commit(&self, ops: Vec<CatalogOp>) -> Result<(), CatalogError> {
        (**self).commit(ops).await
    }
}

impl<S: PackageStore + ?Sized> PackageStore for std::sync::Arc<S> {
    fn on_storage_version(
        &self,
        root: &StorageRootName,
        id: &ObjectId,
    ) -> Result<Option<VersionNumber>, PackageError> {
        (**self).on_storage_version(root, id)
    }

    fn package_size(&self, root: &StorageRootName, id: &ObjectId) -> Result<u64, PackageError> {
        (**self).package_size(root, id)
    }

    fn version_size(
        &self,
        root: &StorageRootName,
        id: &ObjectId,
        version: VersionNumber,
    ) -> Result<u64, PackageError> {
        (**self).version_size(root, id, version)
    }

    fn read_manifest(
        &self,
        root: &StorageRootName,
        id: &ObjectId,
        version: VersionNumber,
        kind: ManifestKind,
    ) -> Result<String, PackageError> {
        (**self).read_manifest(root, id, version, kind)
    }

    fn list_data_files(
        &self,
        root: &StorageRootName,
        id: &ObjectId,
        version: VersionNumber,
    ) -> Result<Vec<String>, PackageError> {
        (**self).list_data_files(root, id, version)
    }

    fn digest_data_file(
        &self,
        root: &StorageRootName,
        id: &ObjectId,
        version: VersionNumber,
        path: &str,
    ) -> Result<FileDigests, PackageError> {
        (**self).digest_data_file(root, id, version, path)
    }
}

#[async_trait]
impl<S: ReplicaObjectStore + ?Sized> ReplicaObjectStore for std::sync::Arc<S> {
    async fn exists(
        &self,
        endpoint: &EndpointName,
        key: &PartKey,
    ) -> Result<bool, ObjectStoreError> {
        (**self).exists(endpoint, key).await
    }

    async fn metadata(
        &self,
        endpoint: &EndpointName,
        key: &PartKey,
    ) -> Result<Option<PartMetadata>, ObjectStoreError> {
        (**self).metadata(endpoint, key).await
    }

    async fn put(
        &self,
        endpoint: &EndpointName,
        key: &PartKey,
        bytes: Vec<u8>,
        metadata: PartMetadata,
    ) -> Result<(), ObjectStoreError> {
        (**self).put(endpoint, key, bytes, metadata).await
    }
}

impl<S: StructuralValidator + ?Sized> StructuralValidator for std::sync::Arc<S> {
    fn validate(&self, root: &StorageRootName, id: &ObjectId) -> StructuralVerdict {
        (**self).validate(root, id)
    }
}

impl<S: AuditReporter + ?Sized> AuditReporter for std::sync::Arc<S> {
    fn report(&self, results: &AuditResults) {
        (**self).report(results)
    }
}
