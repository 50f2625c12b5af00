//! The replica audit service.
//!
//! `verify_replica` checks one (object, version, endpoint) triple for
//! chunk completeness: declared-count agreement between sibling parts,
//! size sum against the on-storage version, and per-part existence plus
//! checksum metadata on the remote endpoint. `deliver_part` uploads one
//! locally produced chunk and records its catalog row.

use async_trait::async_trait;
use pv_types::{
    EndpointName, FileDigests, ObjectId, PartKey, PartStatus, PartSuffix, ReplicaStatus,
    TimeSource, VersionNumber,
};
use tracing::{info, warn};

use crate::domain::entities::{ReplicaPartRecord, ReplicaVersionRecord};
use crate::domain::replica::{
    declared_parts_count, derive_replica_status, total_part_size, unreplicated_parts,
    DeclaredCount,
};
use crate::domain::results::{AuditResults, ResultCode};
use crate::ports::inbound::ReplicaAuditApi;
use crate::ports::outbound::{
    CatalogOp, CatalogStore, PackageStore, PartMetadata, PartStamp, ReplicaObjectStore,
};
use crate::service::{add_catalog_failure, add_invalid_arguments, commit_or_downgrade};

const VERIFY_REPLICA: &str = "verify-replica";
const DELIVER_PART: &str = "deliver-part";

/// Tunables for the replica auditor.
#[derive(Clone, Debug)]
pub struct ReplicaAuditConfig {
    /// Also query the endpoint for parts the catalog still marks
    /// `unreplicated`. Off by default: a part that was never uploaded is
    /// expected to be absent.
    pub check_unreplicated: bool,
}

impl Default for ReplicaAuditConfig {
    fn default() -> Self {
        Self {
            check_unreplicated: false,
        }
    }
}

pub struct ReplicaAuditDependencies<C, P, O, T> {
    pub catalog: C,
    pub packages: P,
    pub object_store: O,
    pub time: T,
}

pub struct ReplicaAuditService<C, P, O, T> {
    config: ReplicaAuditConfig,
    catalog: C,
    packages: P,
    object_store: O,
    time: T,
}

impl<C, P, O, T> ReplicaAuditService<C, P, O, T>
where
    C: CatalogStore,
    P: PackageStore,
    O: ReplicaObjectStore,
    T: TimeSource,
{
    pub fn new(config: ReplicaAuditConfig, deps: ReplicaAuditDependencies<C, P, O, T>) -> Self {
        Self {
            config,
            catalog: deps.catalog,
            packages: deps.packages,
            object_store: deps.object_store,
            time: deps.time,
        }
    }
}

#[async_trait]
impl<C, P, O, T> ReplicaAuditApi for ReplicaAuditService<C, P, O, T>
where
    C: CatalogStore,
    P: PackageStore,
    O: ReplicaObjectStore,
    T: TimeSource,
{
    async fn verify_replica(
        &self,
        object_id: &str,
        version: u32,
        endpoint: &str,
    ) -> AuditResults {
        let mut arg_errors = Vec::new();
        let id = match ObjectId::parse(object_id) {
            Ok(id) => Some(id),
            Err(e) => {
                arg_errors.push(e.to_string());
                None
            }
        };
        let version = match VersionNumber::new(version) {
            Ok(version) => Some(version),
            Err(e) => {
                arg_errors.push(e.to_string());
                None
            }
        };
        if endpoint.trim().is_empty() {
            arg_errors.push("endpoint name must not be empty".to_string());
        }
        let (Some(id), Some(version), true) = (id, version, arg_errors.is_empty()) else {
            let mut results = AuditResults::for_raw_subject(object_id, VERIFY_REPLICA);
            add_invalid_arguments(&mut results, &arg_errors);
            return results;
        };
        let endpoint = EndpointName::new(endpoint.trim());
        let mut results = AuditResults::new(id.clone(), VERIFY_REPLICA);
        results.set_storage_location(endpoint.to_string());
        results.set_actual_version(version);

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

        let replica_row = match self.catalog.replica_version(&id, &endpoint, version).await {
            Ok(row) => row,
            Err(e) => {
                add_catalog_failure(&mut results, &e);
                return results;
            }
        };
        let Some((replica, parts)) = replica_row.filter(|(_, parts)| !parts.is_empty()) else {
            // Nothing else is checkable without part rows.
            results.add_result(
                ResultCode::ZipPartsNotCreated,
                &[
                    ("version", version.to_string()),
                    ("endpoint_name", endpoint.to_string()),
                ],
            );
            return results;
        };

        let mut counts_and_size_ok = true;

        match self.packages.version_size(&record.storage_root, &id, version) {
            Ok(moab_size) => {
                let total = total_part_size(&parts);
                if total < moab_size {
                    results.add_result(
                        ResultCode::ZipPartsSizeInconsistency,
                        &[
                            ("version", version.to_string()),
                            ("endpoint_name", endpoint.to_string()),
                            ("total_part_size", total.to_string()),
                            ("moab_size", moab_size.to_string()),
                        ],
                    );
                    counts_and_size_ok = false;
                }
            }
            Err(e) => {
                warn!(subject = %id, error = %e, "version size unavailable, skipping size check");
            }
        }

        match declared_parts_count(&parts) {
            DeclaredCount::Inconsistent(counts) => {
                results.add_result(
                    ResultCode::ZipPartsCountInconsistency,
                    &[
                        ("version", version.to_string()),
                        ("endpoint_name", endpoint.to_string()),
                        ("counts", format!("{counts:?}")),
                    ],
                );
                counts_and_size_ok = false;
            }
            DeclaredCount::Consistent(declared) if declared as usize != parts.len() => {
                results.add_result(
                    ResultCode::ZipPartsCountDiffersFromActual,
                    &[
                        ("version", version.to_string()),
                        ("endpoint_name", endpoint.to_string()),
                        ("db_count", declared.to_string()),
                        ("actual_count", parts.len().to_string()),
                    ],
                );
                counts_and_size_ok = false;
            }
            DeclaredCount::Consistent(_) => {}
        }

        let waiting = unreplicated_parts(&parts);
        if !waiting.is_empty() {
            results.add_result(
                ResultCode::ZipPartsNotAllReplicated,
                &[
                    ("version", version.to_string()),
                    ("endpoint_name", endpoint.to_string()),
                    ("unreplicated_count", waiting.len().to_string()),
                ],
            );
        }

        let now = self.time.now();
        let mut ops = Vec::new();
        let mut final_statuses = Vec::with_capacity(parts.len());

        for part in &parts {
            if part.status == PartStatus::Unreplicated && !self.config.check_unreplicated {
                final_statuses.push(part.status);
                continue;
            }

            let key = PartKey::new(id.clone(), version, part.suffix);
            let new_status = match self.object_store.metadata(&endpoint, &key).await {
                Err(e) => {
                    // Transport trouble is not evidence about the part;
                    // leave its status alone.
                    warn!(subject = %id, %key, error = %e, "endpoint query failed");
                    part.status
                }
                Ok(None) => {
                    results.add_result(
                        ResultCode::ZipPartNotFound,
                        &[
                            ("version", version.to_string()),
                            ("endpoint_name", endpoint.to_string()),
                            ("suffix", part.suffix.to_string()),
                        ],
                    );
                    if part.status == PartStatus::Unreplicated {
                        PartStatus::Unreplicated
                    } else {
                        PartStatus::NotFound
                    }
                }
                Ok(Some(metadata)) => {
                    if metadata.checksum_md5 == part.md5 {
                        PartStatus::Ok
                    } else {
                        results.add_result(
                            ResultCode::ZipPartChecksumMismatch,
                            &[
                                ("version", version.to_string()),
                                ("endpoint_name", endpoint.to_string()),
                                ("suffix", part.suffix.to_string()),
                                ("md5", part.md5.to_string()),
                                ("replicated_md5", metadata.checksum_md5.to_string()),
                            ],
                        );
                        PartStatus::ChecksumMismatch
                    }
                }
            };

            if new_status != part.status {
                ops.push(CatalogOp::SetPartStatus {
                    object_id: id.clone(),
                    endpoint: endpoint.clone(),
                    version,
                    suffix: part.suffix,
                    status: new_status,
                });
            }
            // Check timestamps move on every check, whatever the outcome.
            for stamp in [PartStamp::Existence, PartStamp::Fixity] {
                ops.push(CatalogOp::StampPart {
                    object_id: id.clone(),
                    endpoint: endpoint.clone(),
                    version,
                    suffix: part.suffix,
                    stamp,
                    at: now,
                });
            }
            final_statuses.push(new_status);
        }

        let derived = derive_replica_status(&final_statuses, counts_and_size_ok);
        if derived != replica.status {
            ops.push(CatalogOp::SetReplicaStatus {
                object_id: id,
                endpoint,
                version,
                status: derived,
            });
        }
        commit_or_downgrade(&self.catalog, ops, &mut results).await;
        results
    }

    async fn deliver_part(
        &self,
        object_id: &str,
        version: u32,
        endpoint: &str,
        suffix: &str,
        parts_count: u32,
        bytes: Vec<u8>,
    ) -> AuditResults {
        let mut arg_errors = Vec::new();
        let id = match ObjectId::parse(object_id) {
            Ok(id) => Some(id),
            Err(e) => {
                arg_errors.push(e.to_string());
                None
            }
        };
        let version = match VersionNumber::new(version) {
            Ok(version) => Some(version),
            Err(e) => {
                arg_errors.push(e.to_string());
                None
            }
        };
        let suffix = match PartSuffix::parse(suffix) {
            Ok(suffix) => Some(suffix),
            Err(e) => {
                arg_errors.push(e.to_string());
                None
            }
        };
        if endpoint.trim().is_empty() {
            arg_errors.push("endpoint name must not be empty".to_string());
        }
        if parts_count == 0 {
            arg_errors.push("parts count must be positive".to_string());
        }
        if bytes.is_empty() {
            arg_errors.push("part payload must not be empty".to_string());
        }
        let (Some(id), Some(version), Some(suffix), true) =
            (id, version, suffix, arg_errors.is_empty())
        else {
            let mut results = AuditResults::for_raw_subject(object_id, DELIVER_PART);
            add_invalid_arguments(&mut results, &arg_errors);
            return results;
        };
        let endpoint = EndpointName::new(endpoint.trim());
        let mut results = AuditResults::new(id.clone(), DELIVER_PART);
        results.set_storage_location(endpoint.to_string());
        results.set_actual_version(version);

        let digests = FileDigests::from_bytes(&bytes);
        let size = digests.size;
        let key = PartKey::new(id.clone(), version, suffix);
        let metadata = PartMetadata {
            checksum_md5: digests.md5.clone(),
            size,
        };
        if let Err(e) = self.object_store.put(&endpoint, &key, bytes, metadata).await {
            warn!(subject = %id, %key, error = %e, "part upload failed");
            results.add_result(
                ResultCode::DbUpdateFailed,
                &[
                    ("error_class", "ObjectStoreError".to_string()),
                    ("error_message", e.to_string()),
                ],
            );
            return results;
        }
        info!(subject = %id, %key, size, "part uploaded");

        let replica = match self.catalog.replica_version(&id, &endpoint, version).await {
            Ok(Some((mut replica, _))) => {
                replica.stated_parts_count = Some(parts_count);
                replica
            }
            Ok(None) => ReplicaVersionRecord {
                object_id: id.clone(),
                endpoint: endpoint.clone(),
                version,
                status: ReplicaStatus::Created,
                stated_parts_count: Some(parts_count),
            },
            Err(e) => {
                add_catalog_failure(&mut results, &e);
                return results;
            }
        };

        let now = self.time.now();
        results.add_result(
            ResultCode::ZipPartDelivered,
            &[
                ("version", version.to_string()),
                ("endpoint_name", endpoint.to_string()),
                ("suffix", suffix.to_string()),
                ("size", size.to_string()),
                ("md5", digests.md5.to_string()),
            ],
        );
        let ops = vec![
            CatalogOp::UpsertReplicaVersion { replica },
            CatalogOp::UpsertPart {
                object_id: id,
                endpoint,
                version,
                part: ReplicaPartRecord {
                    suffix,
                    md5: digests.md5,
                    size,
                    parts_count,
                    status: PartStatus::Ok,
                    last_existence_check: Some(now),
                    last_fixity_check: Some(now),
                },
            },
        ];
        commit_or_downgrade(&self.catalog, ops, &mut results).await;
        results
    }
}
