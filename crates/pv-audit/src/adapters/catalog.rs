//! In-memory catalog store.
//!
//! Backs unit and scenario tests, and doubles as the development catalog
//! for the runtime when no database is wired in. Commits are
//! all-or-nothing: the batch is applied to a copy of the state and swapped
//! in only when every op succeeded. `fail_next_commit` lets tests exercise
//! the transaction-failure path.

use async_trait::async_trait;
use parking_lot::RwLock;
use pv_types::{
    EndpointName, ObjectId, PartSuffix, RecordStatus, Timestamp, VersionNumber,
};
use std::collections::{BTreeMap, HashMap};

use crate::domain::entities::{
    CatalogRecord, PreservationObject, ReplicaPartRecord, ReplicaVersionRecord, ReplicationPolicy,
};
use crate::ports::outbound::{
    CatalogError, CatalogOp, CatalogStore, PartStamp, RecordStamp,
};

type ReplicaKey = (ObjectId, EndpointName, VersionNumber);

#[derive(Default, Clone)]
struct Inner {
    objects: HashMap<ObjectId, PreservationObject>,
    records: HashMap<ObjectId, CatalogRecord>,
    policies: HashMap<String, ReplicationPolicy>,
    replicas: HashMap<ReplicaKey, ReplicaVersionRecord>,
    parts: HashMap<ReplicaKey, BTreeMap<PartSuffix, ReplicaPartRecord>>,
}

impl Inner {
    fn apply(&mut self, op: CatalogOp) -> Result<(), CatalogError> {
        match op {
            CatalogOp::CreateObject { object, record } => {
                if self.objects.contains_key(&object.object_id) {
                    return Err(CatalogError::ConstraintViolation {
                        message: format!("object {} already exists", object.object_id),
                    });
                }
                self.records.insert(record.object_id.clone(), record);
                self.objects.insert(object.object_id.clone(), object);
            }
            CatalogOp::SetCurrentVersion { object_id, version } => {
                let object = self.object_mut(&object_id)?;
                object.current_version = version;
            }
            CatalogOp::SetRecordVersion {
                object_id,
                version,
                size,
            } => {
                let record = self.record_mut(&object_id)?;
                record.version = version;
                record.size = size;
            }
            CatalogOp::SetRecordStatus {
                object_id,
                status,
                details,
            } => {
                let record = self.record_mut(&object_id)?;
                record.status = status;
                record.status_details = details;
            }
            CatalogOp::StampRecord {
                object_id,
                stamp,
                at,
            } => {
                let record = self.record_mut(&object_id)?;
                match stamp {
                    RecordStamp::StructuralValidation => {
                        record.last_structural_validation = Some(at)
                    }
                    RecordStamp::VersionAudit => record.last_version_audit = Some(at),
                    RecordStamp::FixityValidation => record.last_fixity_validation = Some(at),
                }
            }
            CatalogOp::MigrateRecord { object_id, to } => {
                let record = self.record_mut(&object_id)?;
                let from = std::mem::replace(&mut record.storage_root, to);
                record.migrated_from = Some(from.clone());
                record.status = RecordStatus::ValidityUnknown;
                record.status_details = format!("migrated from {from}");
                record.last_structural_validation = None;
                record.last_version_audit = None;
                record.last_fixity_validation = None;
            }
            CatalogOp::UpsertReplicaVersion { replica } => {
                let key = (
                    replica.object_id.clone(),
                    replica.endpoint.clone(),
                    replica.version,
                );
                self.replicas.insert(key, replica);
            }
            CatalogOp::SetReplicaStatus {
                object_id,
                endpoint,
                version,
                status,
            } => {
                let key = (object_id, endpoint, version);
                let replica = self.replicas.get_mut(&key).ok_or_else(|| {
                    CatalogError::RowNotFound {
                        message: replica_label(&key),
                    }
                })?;
                replica.status = status;
            }
            CatalogOp::UpsertPart {
                object_id,
                endpoint,
                version,
                part,
            } => {
                let key = (object_id, endpoint, version);
                self.parts
                    .entry(key)
                    .or_default()
                    .insert(part.suffix, part);
            }
            CatalogOp::SetPartStatus {
                object_id,
                endpoint,
                version,
                suffix,
                status,
            } => {
                let part = self.part_mut(&(object_id, endpoint, version), suffix)?;
                part.status = status;
            }
            CatalogOp::StampPart {
                object_id,
                endpoint,
                version,
                suffix,
                stamp,
                at,
            } => {
                let part = self.part_mut(&(object_id, endpoint, version), suffix)?;
                match stamp {
                    PartStamp::Existence => part.last_existence_check = Some(at),
                    PartStamp::Fixity => part.last_fixity_check = Some(at),
                }
            }
        }
        Ok(())
    }

    fn object_mut(&mut self, id: &ObjectId) -> Result<&mut PreservationObject, CatalogError> {
        self.objects
            .get_mut(id)
            .ok_or_else(|| CatalogError::RowNotFound {
                message: format!("object {id}"),
            })
    }

    fn record_mut(&mut self, id: &ObjectId) -> Result<&mut CatalogRecord, CatalogError> {
        self.records
            .get_mut(id)
            .ok_or_else(|| CatalogError::RowNotFound {
                message: format!("record {id}"),
            })
    }

    fn part_mut(
        &mut self,
        key: &ReplicaKey,
        suffix: PartSuffix,
    ) -> Result<&mut ReplicaPartRecord, CatalogError> {
        self.parts
            .get_mut(key)
            .and_then(|parts| parts.get_mut(&suffix))
            .ok_or_else(|| CatalogError::RowNotFound {
                message: format!("{} part {suffix}", replica_label(key)),
            })
    }
}

fn replica_label(key: &ReplicaKey) -> String {
    format!("replica {}/{}/{}", key.0, key.1, key.2)
}

/// In-memory [`CatalogStore`] with all-or-nothing commits.
#[derive(Default)]
pub struct InMemoryCatalog {
    inner: RwLock<Inner>,
    fail_next_commit: RwLock<Option<String>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `commit` fail with a lost-connection error carrying
    /// `message`, without applying anything.
    pub fn fail_next_commit(&self, message: impl Into<String>) {
        *self.fail_next_commit.write() = Some(message.into());
    }

    /// Seed an object and its record, bypassing the commit path.
    pub fn seed_object(&self, object: PreservationObject, record: CatalogRecord) {
        let mut inner = self.inner.write();
        inner.records.insert(record.object_id.clone(), record);
        inner.objects.insert(object.object_id.clone(), object);
    }

    pub fn seed_policy(&self, policy: ReplicationPolicy) {
        self.inner.write().policies.insert(policy.id.clone(), policy);
    }

    /// Seed a replica version with its parts, bypassing the commit path.
    pub fn seed_replica(&self, replica: ReplicaVersionRecord, parts: Vec<ReplicaPartRecord>) {
        let key = (
            replica.object_id.clone(),
            replica.endpoint.clone(),
            replica.version,
        );
        let mut inner = self.inner.write();
        inner
            .parts
            .insert(key.clone(), parts.into_iter().map(|p| (p.suffix, p)).collect());
        inner.replicas.insert(key, replica);
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalog {
    async fn object(&self, id: &ObjectId) -> Result<Option<PreservationObject>, CatalogError> {
        Ok(self.inner.read().objects.get(id).cloned())
    }

    async fn record(&self, id: &ObjectId) -> Result<Option<CatalogRecord>, CatalogError> {
        Ok(self.inner.read().records.get(id).cloned())
    }

    async fn policy(&self, policy_id: &str) -> Result<Option<ReplicationPolicy>, CatalogError> {
        Ok(self.inner.read().policies.get(policy_id).cloned())
    }

    async fn replica_version(
        &self,
        id: &ObjectId,
        endpoint: &EndpointName,
        version: VersionNumber,
    ) -> Result<Option<(ReplicaVersionRecord, Vec<ReplicaPartRecord>)>, CatalogError> {
        let inner = self.inner.read();
        let key = (id.clone(), endpoint.clone(), version);
        Ok(inner.replicas.get(&key).cloned().map(|replica| {
            let parts = inner
                .parts
                .get(&key)
                .map(|m| m.values().cloned().collect())
                .unwrap_or_default();
            (replica, parts)
        }))
    }

    async fn version_audits_due(
        &self,
        older_than: Timestamp,
    ) -> Result<Vec<ObjectId>, CatalogError> {
        let inner = self.inner.read();
        let mut due: Vec<ObjectId> = inner
            .records
            .values()
            .filter(|r| r.last_version_audit.is_none_or(|t| t < older_than))
            .map(|r| r.object_id.clone())
            .collect();
        due.sort();
        Ok(due)
    }

    async fn fixity_checks_due(
        &self,
        older_than: Timestamp,
    ) -> Result<Vec<ObjectId>, CatalogError> {
        let inner = self.inner.read();
        let mut due: Vec<ObjectId> = inner
            .records
            .values()
            .filter(|r| r.last_fixity_validation.is_none_or(|t| t < older_than))
            .map(|r| r.object_id.clone())
            .collect();
        due.sort();
        Ok(due)
    }

    async fn replica_audits_due(
        &self,
        older_than: Timestamp,
    ) -> Result<Vec<(ObjectId, EndpointName, VersionNumber)>, CatalogError> {
        let inner = self.inner.read();
        let mut due: Vec<ReplicaKey> = inner
            .parts
            .iter()
            .filter(|(_, parts)| {
                parts
                    .values()
                    .any(|p| p.last_existence_check.is_none_or(|t| t < older_than))
            })
            .map(|(key, _)| key.clone())
            .collect();
        due.sort();
        Ok(due)
    }

    async fn commit(&self, ops: Vec<CatalogOp>) -> Result<(), CatalogError> {
        if let Some(message) = self.fail_next_commit.write().take() {
            return Err(CatalogError::ConnectionLost { message });
        }

        let mut inner = self.inner.write();
        // Apply to a copy; swap in only when the whole batch succeeded.
        let mut staged = inner.clone();
        for op in ops {
            staged.apply(op)?;
        }
        *inner = staged;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pv_types::StorageRootName;

    fn oid() -> ObjectId {
        ObjectId::parse("bj102hs9687").unwrap()
    }

    fn vn(v: u32) -> VersionNumber {
        VersionNumber::new(v).unwrap()
    }

    fn seeded() -> InMemoryCatalog {
        let catalog = InMemoryCatalog::new();
        let record = CatalogRecord::initial(oid(), vn(3), 1024, StorageRootName::new("root-01"));
        catalog.seed_object(
            PreservationObject {
                object_id: oid(),
                current_version: vn(3),
                policy_id: "default".to_string(),
            },
            record,
        );
        catalog
    }

    #[tokio::test]
    async fn test_commit_applies_whole_batch() {
        let catalog = seeded();
        catalog
            .commit(vec![
                CatalogOp::SetRecordStatus {
                    object_id: oid(),
                    status: RecordStatus::Ok,
                    details: "validated".to_string(),
                },
                CatalogOp::StampRecord {
                    object_id: oid(),
                    stamp: RecordStamp::VersionAudit,
                    at: 1_700_000_000,
                },
            ])
            .await
            .unwrap();

        let record = catalog.record(&oid()).await.unwrap().unwrap();
        assert_eq!(record.status, RecordStatus::Ok);
        assert_eq!(record.last_version_audit, Some(1_700_000_000));
    }

    #[tokio::test]
    async fn test_failed_batch_applies_nothing() {
        let catalog = seeded();
        let missing = ObjectId::parse("zz999zz9999").unwrap();
        let err = catalog
            .commit(vec![
                CatalogOp::SetRecordStatus {
                    object_id: oid(),
                    status: RecordStatus::Ok,
                    details: "validated".to_string(),
                },
                // Second op targets a missing row; the first must not stick.
                CatalogOp::SetRecordStatus {
                    object_id: missing,
                    status: RecordStatus::Ok,
                    details: String::new(),
                },
            ])
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::RowNotFound { .. }));

        let record = catalog.record(&oid()).await.unwrap().unwrap();
        assert_eq!(record.status, RecordStatus::ValidityUnknown);
    }

    #[tokio::test]
    async fn test_fail_next_commit_injection() {
        let catalog = seeded();
        catalog.fail_next_commit("connection reset by peer");

        let err = catalog
            .commit(vec![CatalogOp::SetRecordStatus {
                object_id: oid(),
                status: RecordStatus::Ok,
                details: String::new(),
            }])
            .await
            .unwrap_err();
        assert_eq!(err.class(), "ConnectionLost");

        // Only the next commit fails; the one after goes through.
        catalog
            .commit(vec![CatalogOp::SetRecordStatus {
                object_id: oid(),
                status: RecordStatus::Ok,
                details: String::new(),
            }])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_migrate_resets_record() {
        let catalog = seeded();
        catalog
            .commit(vec![
                CatalogOp::SetRecordStatus {
                    object_id: oid(),
                    status: RecordStatus::Ok,
                    details: "was fine".to_string(),
                },
                CatalogOp::StampRecord {
                    object_id: oid(),
                    stamp: RecordStamp::FixityValidation,
                    at: 1_700_000_000,
                },
                CatalogOp::MigrateRecord {
                    object_id: oid(),
                    to: StorageRootName::new("root-02"),
                },
            ])
            .await
            .unwrap();

        let record = catalog.record(&oid()).await.unwrap().unwrap();
        assert_eq!(record.storage_root, StorageRootName::new("root-02"));
        assert_eq!(record.migrated_from, Some(StorageRootName::new("root-01")));
        assert_eq!(record.status, RecordStatus::ValidityUnknown);
        assert!(record.last_fixity_validation.is_none());
    }

    #[tokio::test]
    async fn test_due_queries_pick_up_never_audited_rows() {
        let catalog = seeded();
        let due = catalog.version_audits_due(1_700_000_000).await.unwrap();
        assert_eq!(due, vec![oid()]);

        catalog
            .commit(vec![CatalogOp::StampRecord {
                object_id: oid(),
                stamp: RecordStamp::VersionAudit,
                at: 1_700_000_500,
            }])
            .await
            .unwrap();
        assert!(catalog
            .version_audits_due(1_700_000_000)
            .await
            .unwrap()
            .is_empty());
        assert_eq!(
            catalog.version_audits_due(1_700_001_000).await.unwrap(),
            vec![oid()]
        );
    }
}
