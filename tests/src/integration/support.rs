//! Shared fixtures: packages laid out on disk, catalog seeding, and a fully
//! wired trio of audit services over one temp storage root.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use pv_audit::adapters::{
    BasicStructuralValidator, FilesystemPackages, InMemoryCatalog, InMemoryObjectStore,
};
use pv_audit::domain::entities::{
    CatalogRecord, PreservationObject, ReplicaPartRecord, ReplicaVersionRecord,
};
use pv_audit::{
    FixityAuditDependencies, FixityAuditService, ReplicaAuditConfig, ReplicaAuditDependencies,
    ReplicaAuditService, VersionAuditDependencies, VersionAuditService,
};
use pv_types::{
    EndpointName, FileDigests, FixedTimeSource, Md5Digest, ObjectId, PartStatus, PartSuffix,
    RecordStatus, ReplicaStatus, StorageRootName, VersionNumber,
};

pub const NOW: u64 = 1_700_000_000;

pub fn oid() -> ObjectId {
    ObjectId::parse("bj102hs9687").unwrap()
}

pub fn vn(v: u32) -> VersionNumber {
    VersionNumber::new(v).unwrap()
}

pub fn root() -> StorageRootName {
    StorageRootName::new("root-01")
}

pub fn endpoint() -> EndpointName {
    EndpointName::new("aws-east")
}

/// A 32-hex md5 made of one repeated nibble, for part fixtures.
pub fn md5(nibble: &str) -> Md5Digest {
    Md5Digest::parse(&nibble.repeat(32)).unwrap()
}

fn payload(version: u32) -> Vec<u8> {
    format!("payload bytes for version {version}").into_bytes()
}

/// Lay a clean `versions`-deep package under `base`: one data file per
/// version, a consistent inventory per version, and a signature catalog at
/// the latest version covering every file.
pub fn build_package(base: &Path, versions: u32) {
    let tree = base.join(oid().tree_path());
    for v in 1..=versions {
        let content = payload(v);
        let digests = FileDigests::from_bytes(&content);
        let vdir = tree.join(vn(v).dir_label());
        let data = vdir.join(format!("data/content/page-{v}.jpg"));
        fs::create_dir_all(data.parent().unwrap()).unwrap();
        fs::create_dir_all(vdir.join("manifests")).unwrap();
        fs::write(&data, &content).unwrap();
        fs::write(
            vdir.join("manifests/manifestInventory.xml"),
            format!(
                r#"<manifestInventory objectId="bj102hs9687" versionId="{v}" fileCount="1"><file change="added" path="content/page-{v}.jpg" md5="{}" size="{}"/></manifestInventory>"#,
                digests.md5,
                content.len()
            ),
        )
        .unwrap();
    }

    let entries: String = (1..=versions)
        .map(|v| {
            let content = payload(v);
            let digests = FileDigests::from_bytes(&content);
            format!(
                r#"<entry originalVersion="{v}" path="content/page-{v}.jpg" md5="{}" size="{}"/>"#,
                digests.md5,
                content.len()
            )
        })
        .collect();
    fs::write(
        tree.join(vn(versions).dir_label())
            .join("manifests/signatureCatalog.xml"),
        format!(
            r#"<signatureCatalog objectId="bj102hs9687" versionId="{versions}">{entries}</signatureCatalog>"#
        ),
    )
    .unwrap();
}

/// Seed the object and its record at `version` with `status`.
pub fn seed_object(catalog: &InMemoryCatalog, version: u32, status: RecordStatus) {
    let mut record = CatalogRecord::initial(oid(), vn(version), 1024, root());
    record.status = status;
    catalog.seed_object(
        PreservationObject {
            object_id: oid(),
            current_version: vn(version),
            policy_id: "default".to_string(),
        },
        record,
    );
}

pub fn part(
    suffix: PartSuffix,
    md5: Md5Digest,
    size: u64,
    parts_count: u32,
    status: PartStatus,
) -> ReplicaPartRecord {
    ReplicaPartRecord {
        suffix,
        md5,
        size,
        parts_count,
        status,
        last_existence_check: None,
        last_fixity_check: None,
    }
}

/// Seed a replica version row with `parts` on the default endpoint.
pub fn seed_replica(catalog: &InMemoryCatalog, version: u32, parts: Vec<ReplicaPartRecord>) {
    let count = parts.first().map(|p| p.parts_count);
    catalog.seed_replica(
        ReplicaVersionRecord {
            object_id: oid(),
            endpoint: endpoint(),
            version: vn(version),
            status: ReplicaStatus::Created,
            stated_parts_count: count,
        },
        parts,
    );
}

type Catalog = Arc<InMemoryCatalog>;
type Packages = Arc<FilesystemPackages>;
type Store = Arc<InMemoryObjectStore>;

/// All three services wired over one storage root, sharing one catalog and
/// one object store.
pub struct Harness {
    pub catalog: Catalog,
    pub object_store: Store,
    pub version: VersionAuditService<Catalog, Packages, BasicStructuralValidator, FixedTimeSource>,
    pub fixity: FixityAuditService<Catalog, Packages, FixedTimeSource>,
    pub replica: ReplicaAuditService<Catalog, Packages, Store, FixedTimeSource>,
}

impl Harness {
    pub fn over(storage: &Path) -> Self {
        let catalog = Arc::new(InMemoryCatalog::new());
        let packages = Arc::new(FilesystemPackages::single(root(), storage));
        let object_store = Arc::new(InMemoryObjectStore::new());

        let version = VersionAuditService::new(VersionAuditDependencies {
            catalog: Arc::clone(&catalog),
            packages: Arc::clone(&packages),
            validator: BasicStructuralValidator::single(root(), storage),
            time: FixedTimeSource::new(NOW),
        });
        let fixity = FixityAuditService::new(FixityAuditDependencies {
            catalog: Arc::clone(&catalog),
            packages: Arc::clone(&packages),
            time: FixedTimeSource::new(NOW),
        });
        let replica = ReplicaAuditService::new(
            ReplicaAuditConfig::default(),
            ReplicaAuditDependencies {
                catalog: Arc::clone(&catalog),
                packages,
                object_store: Arc::clone(&object_store),
                time: FixedTimeSource::new(NOW),
            },
        );

        Self {
            catalog,
            object_store,
            version,
            fixity,
            replica,
        }
    }
}
