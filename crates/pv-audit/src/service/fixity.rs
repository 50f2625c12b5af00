//! The fixity audit service.
//!
//! Wraps the pure fixity walk: locates the package, runs the walk, and
//! drives the status transitioner from the verdict. A clean walk is the
//! only path that sets a record to `ok` (and the only thing that clears
//! `invalid_checksum`); a dirty walk forces `invalid_checksum`.

use async_trait::async_trait;
use pv_types::{ObjectId, RecordStatus, TimeSource};
use tracing::{debug, warn};

use crate::domain::fixity::audit_package;
use crate::domain::results::{AuditResults, ResultCode};
use crate::domain::status::next_status;
use crate::ports::inbound::FixityAuditApi;
use crate::ports::outbound::{CatalogOp, CatalogStore, PackageStore, RecordStamp};
use crate::service::{
    add_catalog_failure, add_invalid_arguments, apply_transition, commit_or_downgrade,
};

const VALIDATE_CHECKSUMS: &str = "validate-checksums";

pub struct FixityAuditDependencies<C, P, T> {
    pub catalog: C,
    pub packages: P,
    pub time: T,
}

pub struct FixityAuditService<C, P, T> {
    catalog: C,
    packages: P,
    time: T,
}

impl<C, P, T> FixityAuditService<C, P, T>
where
    C: CatalogStore,
    P: PackageStore,
    T: TimeSource,
{
    pub fn new(deps: FixityAuditDependencies<C, P, T>) -> Self {
        Self {
            catalog: deps.catalog,
            packages: deps.packages,
            time: deps.time,
        }
    }
}

#[async_trait]
impl<C, P, T> FixityAuditApi for FixityAuditService<C, P, T>
where
    C: CatalogStore,
    P: PackageStore,
    T: TimeSource,
{
    async fn validate_checksums(&self, object_id: &str) -> AuditResults {
        let id = match ObjectId::parse(object_id) {
            Ok(id) => id,
            Err(e) => {
                let mut results = AuditResults::for_raw_subject(object_id, VALIDATE_CHECKSUMS);
                add_invalid_arguments(&mut results, &[e.to_string()]);
                return results;
            }
        };
        let mut results = AuditResults::new(id.clone(), VALIDATE_CHECKSUMS);

        let record = match self.catalog.record(&id).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                results.add_result(ResultCode::ObjectNotInCatalog, &[("druid", id.to_string())]);
                return results;
            }
            Err(e) => {
                add_catalog_failure(&mut results, &e);
                return results;
            }
        };
        results.set_storage_location(record.storage_root.to_string());

        let now = self.time.now();
        let mut ops = Vec::new();

        let on_storage = match self.packages.on_storage_version(&record.storage_root, &id) {
            Ok(found) => found,
            Err(e) => {
                warn!(subject = %id, error = %e, "package lookup failed, treating as absent");
                None
            }
        };
        let Some(actual) = on_storage else {
            results.add_result(
                ResultCode::MoabNotFound,
                &[
                    ("druid", id.to_string()),
                    ("storage_root", record.storage_root.to_string()),
                ],
            );
            if record.status != RecordStatus::MoabNotFound {
                results.add_result(
                    ResultCode::RecordStatusChanged,
                    &[
                        ("old_status", record.status.to_string()),
                        ("new_status", RecordStatus::MoabNotFound.to_string()),
                    ],
                );
                ops.push(CatalogOp::SetRecordStatus {
                    object_id: id.clone(),
                    status: RecordStatus::MoabNotFound,
                    details: format!("package not found on {}", record.storage_root),
                });
            }
            ops.push(CatalogOp::StampRecord {
                object_id: id,
                stamp: RecordStamp::FixityValidation,
                at: now,
            });
            commit_or_downgrade(&self.catalog, ops, &mut results).await;
            return results;
        };
        results.set_actual_version(actual);

        let before = results.len();
        audit_package(&self.packages, &record.storage_root, &id, actual, &mut results);
        let clean = results.len() == before;
        debug!(subject = %id, clean, "fixity walk finished");

        if clean {
            results.add_plain(ResultCode::MoabChecksumValid);
            let found_expected = actual == record.version;
            let decision = next_status(record.status, found_expected, &[], true);
            apply_transition(decision, &record, &mut results, &mut ops);
            // Versions were compared on this path, so the version audit is
            // as fresh as the fixity one.
            ops.push(CatalogOp::StampRecord {
                object_id: id.clone(),
                stamp: RecordStamp::VersionAudit,
                at: now,
            });
        } else if record.status != RecordStatus::InvalidChecksum {
            results.add_result(
                ResultCode::RecordStatusChanged,
                &[
                    ("old_status", record.status.to_string()),
                    ("new_status", RecordStatus::InvalidChecksum.to_string()),
                ],
            );
            ops.push(CatalogOp::SetRecordStatus {
                object_id: id.clone(),
                status: RecordStatus::InvalidChecksum,
                details: "fixity validation found mismatches".to_string(),
            });
        }

        ops.push(CatalogOp::StampRecord {
            object_id: id,
            stamp: RecordStamp::FixityValidation,
            at: now,
        });
        commit_or_downgrade(&self.catalog, ops, &mut results).await;
        results
    }
}
