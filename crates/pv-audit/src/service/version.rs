//! The version reconciler service.
//!
//! `check_existence` decides which of {catalog record, parent object,
//! on-storage package} is authoritative when their version numbers
//! disagree, transitions the record's status accordingly, and persists the
//! whole outcome in one commit batch. `create_object` and
//! `migrate_storage_root` cover catalog bookkeeping for packages entering
//! the catalog or moving between storage roots.

use async_trait::async_trait;
use pv_types::{ObjectId, RecordStatus, StorageRootName, TimeSource};
use std::cmp::Ordering;
use tracing::{info, warn};

use crate::domain::entities::{CatalogRecord, PreservationObject};
use crate::domain::results::{AuditResults, ResultCode};
use crate::domain::status::next_status;
use crate::ports::inbound::VersionAuditApi;
use crate::ports::outbound::{
    CatalogOp, CatalogStore, PackageStore, RecordStamp, StructuralValidator,
};
use crate::service::{
    add_catalog_failure, add_invalid_arguments, apply_transition, commit_or_downgrade,
    DB_RECORD_NAME,
};

const CHECK_EXISTENCE: &str = "check-existence";
const CREATE_OBJECT: &str = "create-object";
const MIGRATE_STORAGE_ROOT: &str = "migrate-storage-root";

/// Policy id assigned to objects entering the catalog through
/// `create_object`; reassignment is a configuration concern.
const DEFAULT_POLICY: &str = "default";

pub struct VersionAuditDependencies<C, P, V, T> {
    pub catalog: C,
    pub packages: P,
    pub validator: V,
    pub time: T,
}

pub struct VersionAuditService<C, P, V, T> {
    catalog: C,
    packages: P,
    validator: V,
    time: T,
}

impl<C, P, V, T> VersionAuditService<C, P, V, T>
where
    C: CatalogStore,
    P: PackageStore,
    V: StructuralValidator,
    T: TimeSource,
{
    pub fn new(deps: VersionAuditDependencies<C, P, V, T>) -> Self {
        Self {
            catalog: deps.catalog,
            packages: deps.packages,
            validator: deps.validator,
            time: deps.time,
        }
    }

    /// Load the object and its record; any missing row downgrades to
    /// `objectNotInCatalog`.
    async fn load(
        &self,
        id: &ObjectId,
        results: &mut AuditResults,
    ) -> Option<(PreservationObject, CatalogRecord)> {
        let object = match self.catalog.object(id).await {
            Ok(object) => object,
            Err(e) => {
                add_catalog_failure(results, &e);
                return None;
            }
        };
        let record = match self.catalog.record(id).await {
            Ok(record) => record,
            Err(e) => {
                add_catalog_failure(results, &e);
                return None;
            }
        };
        match (object, record) {
            (Some(object), Some(record)) => Some((object, record)),
            _ => {
                results.add_result(ResultCode::ObjectNotInCatalog, &[("druid", id.to_string())]);
                None
            }
        }
    }

    /// Run the structural validator, downgrading a failed verdict to one
    /// `invalidMoab` finding, and hand back the error list for the
    /// transitioner.
    fn validate_structure(
        &self,
        root: &StorageRootName,
        id: &ObjectId,
        results: &mut AuditResults,
    ) -> Vec<String> {
        let verdict = self.validator.validate(root, id);
        if !verdict.is_valid {
            results.add_result(
                ResultCode::InvalidMoab,
                &[("errors", verdict.errors.join("; "))],
            );
        }
        verdict.errors
    }
}

#[async_trait]
impl<C, P, V, T> VersionAuditApi for VersionAuditService<C, P, V, T>
where
    C: CatalogStore,
    P: PackageStore,
    V: StructuralValidator,
    T: TimeSource,
{
    async fn check_existence(&self, object_id: &str) -> AuditResults {
        let id = match ObjectId::parse(object_id) {
            Ok(id) => id,
            Err(e) => {
                let mut results = AuditResults::for_raw_subject(object_id, CHECK_EXISTENCE);
                add_invalid_arguments(&mut results, &[e.to_string()]);
                return results;
            }
        };
        let mut results = AuditResults::new(id.clone(), CHECK_EXISTENCE);

        let Some((object, record)) = self.load(&id, &mut results).await else {
            return results;
        };
        results.set_storage_location(record.storage_root.to_string());

        // An internal catalog inconsistency is not resolvable by this
        // check; report it and leave everything untouched.
        if record.version != object.current_version {
            results.add_result(
                ResultCode::CatalogVersionsDisagree,
                &[
                    ("catalog_version", record.version.to_string()),
                    ("object_version", object.current_version.to_string()),
                ],
            );
            return results;
        }

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
                stamp: RecordStamp::VersionAudit,
                at: now,
            });
            commit_or_downgrade(&self.catalog, ops, &mut results).await;
            return results;
        };
        results.set_actual_version(actual);

        // Absorbing rule: only a fixity re-validation may move the record.
        if record.status == RecordStatus::InvalidChecksum {
            results.add_result(
                ResultCode::UnableToCheckStatus,
                &[("current_status", record.status.to_string())],
            );
            ops.push(CatalogOp::StampRecord {
                object_id: id,
                stamp: RecordStamp::VersionAudit,
                at: now,
            });
            commit_or_downgrade(&self.catalog, ops, &mut results).await;
            return results;
        }

        match actual.cmp(&record.version) {
            Ordering::Equal => {
                results.add_result(
                    ResultCode::VersionMatches,
                    &[
                        ("actual_version", actual.to_string()),
                        ("db_obj_name", DB_RECORD_NAME.to_string()),
                    ],
                );
                // A record already in `ok` stays untouched on a clean match.
                if record.status != RecordStatus::Ok {
                    let errors = self.validate_structure(&record.storage_root, &id, &mut results);
                    let decision = next_status(record.status, true, &errors, false);
                    apply_transition(decision, &record, &mut results, &mut ops);
                    ops.push(CatalogOp::StampRecord {
                        object_id: id.clone(),
                        stamp: RecordStamp::StructuralValidation,
                        at: now,
                    });
                }
            }
            Ordering::Greater => {
                results.add_result(
                    ResultCode::ActualVersGreaterThanCatalog,
                    &[
                        ("actual_version", actual.to_string()),
                        ("db_obj_name", DB_RECORD_NAME.to_string()),
                        ("db_obj_version", record.version.to_string()),
                    ],
                );
                let errors = self.validate_structure(&record.storage_root, &id, &mut results);
                let size = self
                    .packages
                    .package_size(&record.storage_root, &id)
                    .unwrap_or(record.size);
                ops.push(CatalogOp::SetRecordVersion {
                    object_id: id.clone(),
                    version: actual,
                    size,
                });
                ops.push(CatalogOp::SetCurrentVersion {
                    object_id: id.clone(),
                    version: actual,
                });
                let decision = next_status(record.status, true, &errors, false);
                apply_transition(decision, &record, &mut results, &mut ops);
                ops.push(CatalogOp::StampRecord {
                    object_id: id.clone(),
                    stamp: RecordStamp::StructuralValidation,
                    at: now,
                });
            }
            Ordering::Less => {
                results.add_result(
                    ResultCode::UnexpectedVersion,
                    &[
                        ("actual_version", actual.to_string()),
                        ("db_obj_name", DB_RECORD_NAME.to_string()),
                        ("db_obj_version", record.version.to_string()),
                    ],
                );
                let errors = self.validate_structure(&record.storage_root, &id, &mut results);
                let decision = next_status(record.status, false, &errors, false);
                apply_transition(decision, &record, &mut results, &mut ops);
                ops.push(CatalogOp::StampRecord {
                    object_id: id.clone(),
                    stamp: RecordStamp::StructuralValidation,
                    at: now,
                });
            }
        }

        ops.push(CatalogOp::StampRecord {
            object_id: id,
            stamp: RecordStamp::VersionAudit,
            at: now,
        });
        commit_or_downgrade(&self.catalog, ops, &mut results).await;
        results
    }

    async fn create_object(&self, object_id: &str, storage_root: &str) -> AuditResults {
        let mut arg_errors = Vec::new();
        let id = match ObjectId::parse(object_id) {
            Ok(id) => Some(id),
            Err(e) => {
                arg_errors.push(e.to_string());
                None
            }
        };
        if storage_root.trim().is_empty() {
            arg_errors.push("storage root must not be empty".to_string());
        }
        let Some(id) = id else {
            let mut results = AuditResults::for_raw_subject(object_id, CREATE_OBJECT);
            add_invalid_arguments(&mut results, &arg_errors);
            return results;
        };
        let mut results = AuditResults::new(id.clone(), CREATE_OBJECT);
        if !arg_errors.is_empty() {
            add_invalid_arguments(&mut results, &arg_errors);
            return results;
        }

        let root = StorageRootName::new(storage_root.trim());
        results.set_storage_location(root.to_string());

        match self.catalog.object(&id).await {
            Ok(Some(_)) => {
                results.add_result(
                    ResultCode::ObjectAlreadyInCatalog,
                    &[("druid", id.to_string())],
                );
                return results;
            }
            Ok(None) => {}
            Err(e) => {
                add_catalog_failure(&mut results, &e);
                return results;
            }
        }

        let version = match self.packages.on_storage_version(&root, &id) {
            Ok(Some(version)) => version,
            Ok(None) | Err(_) => {
                results.add_result(
                    ResultCode::MoabNotFound,
                    &[("druid", id.to_string()), ("storage_root", root.to_string())],
                );
                return results;
            }
        };
        results.set_actual_version(version);
        let size = self.packages.package_size(&root, &id).unwrap_or(0);

        let record = CatalogRecord::initial(id.clone(), version, size, root);
        let object = PreservationObject {
            object_id: id.clone(),
            current_version: version,
            policy_id: DEFAULT_POLICY.to_string(),
        };
        results.add_result(
            ResultCode::CreatedNewObject,
            &[("status", record.status.to_string())],
        );
        info!(subject = %id, version = %version, "adding object to catalog");

        let ops = vec![
            CatalogOp::CreateObject { object, record },
            CatalogOp::StampRecord {
                object_id: id,
                stamp: RecordStamp::VersionAudit,
                at: self.time.now(),
            },
        ];
        commit_or_downgrade(&self.catalog, ops, &mut results).await;
        results
    }

    async fn migrate_storage_root(&self, object_id: &str, from: &str, to: &str) -> AuditResults {
        let mut arg_errors = Vec::new();
        let id = match ObjectId::parse(object_id) {
            Ok(id) => Some(id),
            Err(e) => {
                arg_errors.push(e.to_string());
                None
            }
        };
        if from.trim().is_empty() {
            arg_errors.push("source storage root must not be empty".to_string());
        }
        if to.trim().is_empty() {
            arg_errors.push("target storage root must not be empty".to_string());
        }
        if !from.trim().is_empty() && from.trim() == to.trim() {
            arg_errors.push("source and target storage roots are the same".to_string());
        }
        let Some(id) = id else {
            let mut results = AuditResults::for_raw_subject(object_id, MIGRATE_STORAGE_ROOT);
            add_invalid_arguments(&mut results, &arg_errors);
            return results;
        };
        let mut results = AuditResults::new(id.clone(), MIGRATE_STORAGE_ROOT);
        if !arg_errors.is_empty() {
            add_invalid_arguments(&mut results, &arg_errors);
            return results;
        }

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
        if record.storage_root.as_str() != from.trim() {
            add_invalid_arguments(
                &mut results,
                &[format!(
                    "record is on storage root {}, not {}",
                    record.storage_root,
                    from.trim()
                )],
            );
            return results;
        }
        results.set_storage_location(to.trim().to_string());

        let ops = vec![CatalogOp::MigrateRecord {
            object_id: id.clone(),
            to: StorageRootName::new(to.trim()),
        }];
        // Migration resets the record to the initial state.
        if record.status != RecordStatus::ValidityUnknown {
            results.add_result(
                ResultCode::RecordStatusChanged,
                &[
                    ("old_status", record.status.to_string()),
                    ("new_status", RecordStatus::ValidityUnknown.to_string()),
                ],
            );
        }
        info!(subject = %id, from = %record.storage_root, to = to.trim(), "migrating record");
        commit_or_downgrade(&self.catalog, ops, &mut results).await;
        results
    }
}
