//! Audit services: orchestration behind the inbound ports.
//!
//! Each service owns the dependencies for one audit family and implements
//! the matching inbound trait. Services are generic over the outbound
//! ports; construction wires concrete adapters through a `…Dependencies`
//! struct.
//!
//! Shared discipline across all three services: every invocation returns a
//! ledger on every path, all catalog mutations for one invocation go
//! through a single commit batch, and a failed commit downgrades to a
//! `dbUpdateFailed` finding after stripping write-dependent claims.

pub mod fixity;
pub mod replica;
pub mod version;

use tracing::warn;

use crate::domain::entities::CatalogRecord;
use crate::domain::results::{AuditResults, ResultCode};
use crate::domain::status::StatusDecision;
use crate::ports::outbound::{CatalogError, CatalogOp, CatalogStore};

/// Label rendered into version-comparison findings for the record side.
pub(crate) const DB_RECORD_NAME: &str = "CatalogRecord";

/// Turn a transition decision into findings and the status-change op.
///
/// `recordStatusChanged` is emitted only when the new status differs from
/// the old one; `Absorbed` emits `unableToCheckStatus` and writes nothing.
pub(crate) fn apply_transition(
    decision: StatusDecision,
    record: &CatalogRecord,
    results: &mut AuditResults,
    ops: &mut Vec<CatalogOp>,
) {
    match decision {
        StatusDecision::Absorbed => {
            results.add_result(
                ResultCode::UnableToCheckStatus,
                &[("current_status", record.status.to_string())],
            );
        }
        StatusDecision::Transition(new) if new != record.status => {
            results.add_result(
                ResultCode::RecordStatusChanged,
                &[
                    ("old_status", record.status.to_string()),
                    ("new_status", new.to_string()),
                ],
            );
            ops.push(CatalogOp::SetRecordStatus {
                object_id: record.object_id.clone(),
                status: new,
                details: format!("status changed from {} to {}", record.status, new),
            });
        }
        StatusDecision::Transition(_) => {}
    }
}

/// Commit the batch; on failure strip write-dependent findings and record
/// `dbUpdateFailed` so the reported ledger never overclaims.
pub(crate) async fn commit_or_downgrade<C: CatalogStore>(
    catalog: &C,
    ops: Vec<CatalogOp>,
    results: &mut AuditResults,
) {
    if ops.is_empty() {
        return;
    }
    if let Err(e) = catalog.commit(ops).await {
        warn!(subject = results.subject_id(), error = %e, "catalog commit failed");
        results.remove_write_confirmed_results();
        add_catalog_failure(results, &e);
    }
}

pub(crate) fn add_catalog_failure(results: &mut AuditResults, error: &CatalogError) {
    results.add_result(
        ResultCode::DbUpdateFailed,
        &[
            ("error_class", error.class().to_string()),
            ("error_message", error.to_string()),
        ],
    );
}

pub(crate) fn add_invalid_arguments(results: &mut AuditResults, errors: &[String]) {
    results.add_result(ResultCode::InvalidArguments, &[("errors", errors.join("; "))]);
}

#[cfg(test)]
pub(crate) mod testutil {
    //! A settable package-store stub for service tests that never touch
    //! manifests.

    use pv_types::{FileDigests, ObjectId, StorageRootName, VersionNumber};

    use crate::ports::outbound::{ManifestKind, PackageError, PackageStore};

    pub struct StubPackages {
        pub on_storage: Option<VersionNumber>,
        pub package_size: u64,
        pub version_size: u64,
    }

    impl StubPackages {
        pub fn at_version(version: u32, size: u64) -> Self {
            Self {
                on_storage: VersionNumber::new(version).ok(),
                package_size: size,
                version_size: size,
            }
        }

        pub fn missing() -> Self {
            Self {
                on_storage: None,
                package_size: 0,
                version_size: 0,
            }
        }
    }

    impl PackageStore for StubPackages {
        fn on_storage_version(
            &self,
            _root: &StorageRootName,
            _id: &ObjectId,
        ) -> Result<Option<VersionNumber>, PackageError> {
            Ok(self.on_storage)
        }

        fn package_size(
            &self,
            _root: &StorageRootName,
            _id: &ObjectId,
        ) -> Result<u64, PackageError> {
            Ok(self.package_size)
        }

        fn version_size(
            &self,
            _root: &StorageRootName,
            _id: &ObjectId,
            _version: VersionNumber,
        ) -> Result<u64, PackageError> {
            Ok(self.version_size)
        }

        fn read_manifest(
            &self,
            _root: &StorageRootName,
            _id: &ObjectId,
            version: VersionNumber,
            kind: ManifestKind,
        ) -> Result<String, PackageError> {
            Err(PackageError::NotFound {
                path: format!("{}/manifests/{}", version.dir_label(), kind.file_name()),
            })
        }

        fn list_data_files(
            &self,
            _root: &StorageRootName,
            _id: &ObjectId,
            _version: VersionNumber,
        ) -> Result<Vec<String>, PackageError> {
            Ok(Vec::new())
        }

        fn digest_data_file(
            &self,
            _root: &StorageRootName,
            _id: &ObjectId,
            _version: VersionNumber,
            path: &str,
        ) -> Result<FileDigests, PackageError> {
            Err(PackageError::NotFound {
                path: path.to_string(),
            })
        }
    }
}
