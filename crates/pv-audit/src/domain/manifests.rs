//! Parsers for the two embedded manifest documents.
//!
//! Each version directory carries a `manifests/manifestInventory.xml`
//! declaring that version's added, modified, and deleted files relative to
//! the prior version. The latest version additionally carries
//! `manifests/signatureCatalog.xml`, a cumulative map of every file ever
//! added, across all versions, to its last-known checksum, size, and origin
//! version.
//!
//! Parse failures are typed and never abort an audit: the fixity auditor
//! downgrades them to a single `invalidManifest` or
//! `signatureCatalogNotInMoab` finding and keeps going.

use pv_types::{Md5Digest, ObjectId, Sha256Digest, VersionNumber};
use thiserror::Error;

/// A manifest document that could not be understood.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ManifestError {
    /// The XML itself would not parse.
    #[error("malformed xml: {message}")]
    Malformed { message: String },

    /// Root element is not the expected document type.
    #[error("expected <{expected}> document, found <{found}>")]
    WrongRoot { expected: String, found: String },

    /// A required attribute is absent.
    #[error("<{element}> is missing required attribute {attribute:?}")]
    MissingAttribute { element: String, attribute: String },

    /// An attribute is present but its value is unusable.
    #[error("invalid value {value:?} for attribute {attribute:?}")]
    InvalidAttribute { attribute: String, value: String },
}

impl ManifestError {
    fn missing(element: &str, attribute: &str) -> Self {
        ManifestError::MissingAttribute {
            element: element.to_string(),
            attribute: attribute.to_string(),
        }
    }

    fn invalid(attribute: &str, value: &str) -> Self {
        ManifestError::InvalidAttribute {
            attribute: attribute.to_string(),
            value: value.to_string(),
        }
    }
}

/// How one file changed in this version, relative to the prior version.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileChange {
    Added,
    Modified,
    Deleted,
}

/// One `<file>` entry of a manifest inventory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InventoryEntry {
    /// Path relative to the version's `data/` directory.
    pub path: String,
    pub change: FileChange,
    /// Required for added and modified entries; absent for deleted ones.
    pub md5: Option<Md5Digest>,
    pub sha256: Option<Sha256Digest>,
    pub size: Option<u64>,
}

/// The per-version manifest inventory document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ManifestInventory {
    pub object_id: ObjectId,
    pub version: VersionNumber,
    /// The document's own declared entry count, checked against the actual
    /// entries as the inventory's internal consistency check.
    pub declared_file_count: u32,
    pub entries: Vec<InventoryEntry>,
}

impl ManifestInventory {
    /// Parse a `manifestInventory.xml` document.
    pub fn parse(xml: &str) -> Result<Self, ManifestError> {
        let doc = roxmltree::Document::parse(xml).map_err(|e| ManifestError::Malformed {
            message: e.to_string(),
        })?;
        let root = doc.root_element();
        if root.tag_name().name() != "manifestInventory" {
            return Err(ManifestError::WrongRoot {
                expected: "manifestInventory".to_string(),
                found: root.tag_name().name().to_string(),
            });
        }

        let object_id = parse_object_id(root)?;
        let version = parse_version_attr(root, "versionId")?;
        let raw_count = root
            .attribute("fileCount")
            .ok_or_else(|| ManifestError::missing("manifestInventory", "fileCount"))?;
        let declared_file_count: u32 = raw_count
            .parse()
            .map_err(|_| ManifestError::invalid("fileCount", raw_count))?;

        let mut entries = Vec::new();
        for node in root.children().filter(|n| n.has_tag_name("file")) {
            let path = node
                .attribute("path")
                .ok_or_else(|| ManifestError::missing("file", "path"))?
                .to_string();
            let change = match node
                .attribute("change")
                .ok_or_else(|| ManifestError::missing("file", "change"))?
            {
                "added" => FileChange::Added,
                "modified" => FileChange::Modified,
                "deleted" => FileChange::Deleted,
                other => return Err(ManifestError::invalid("change", other)),
            };

            let md5 = parse_optional_md5(node)?;
            let sha256 = parse_optional_sha256(node)?;
            let size = parse_optional_size(node)?;
            if change != FileChange::Deleted && (md5.is_none() || size.is_none()) {
                return Err(ManifestError::missing("file", "md5/size"));
            }

            entries.push(InventoryEntry {
                path,
                change,
                md5,
                sha256,
                size,
            });
        }

        Ok(Self {
            object_id,
            version,
            declared_file_count,
            entries,
        })
    }

    /// The inventory's internal consistency check: declared entry count
    /// against the entries actually present.
    pub fn count_is_consistent(&self) -> bool {
        self.declared_file_count as usize == self.entries.len()
    }

    pub fn added(&self) -> impl Iterator<Item = &InventoryEntry> {
        self.entries.iter().filter(|e| e.change == FileChange::Added)
    }

    pub fn modified(&self) -> impl Iterator<Item = &InventoryEntry> {
        self.entries
            .iter()
            .filter(|e| e.change == FileChange::Modified)
    }

    /// Paths this version claims to exist on disk: added plus modified.
    pub fn expected_paths(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|e| e.change != FileChange::Deleted)
            .map(|e| e.path.as_str())
    }
}

/// One `<entry>` of the signature catalog.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CatalogEntry {
    /// Path relative to the origin version's `data/` directory.
    pub path: String,
    /// The version whose `data/` directory physically holds this file.
    pub origin_version: VersionNumber,
    pub md5: Md5Digest,
    pub sha256: Option<Sha256Digest>,
    pub size: u64,
}

/// The cumulative signature catalog, present only at the latest version.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignatureCatalog {
    pub object_id: ObjectId,
    pub version: VersionNumber,
    pub entries: Vec<CatalogEntry>,
}

impl SignatureCatalog {
    /// Parse a `signatureCatalog.xml` document.
    pub fn parse(xml: &str) -> Result<Self, ManifestError> {
        let doc = roxmltree::Document::parse(xml).map_err(|e| ManifestError::Malformed {
            message: e.to_string(),
        })?;
        let root = doc.root_element();
        if root.tag_name().name() != "signatureCatalog" {
            return Err(ManifestError::WrongRoot {
                expected: "signatureCatalog".to_string(),
                found: root.tag_name().name().to_string(),
            });
        }

        let object_id = parse_object_id(root)?;
        let version = parse_version_attr(root, "versionId")?;

        let mut entries = Vec::new();
        for node in root.children().filter(|n| n.has_tag_name("entry")) {
            let path = node
                .attribute("path")
                .ok_or_else(|| ManifestError::missing("entry", "path"))?
                .to_string();
            let origin_version = parse_version_attr(node, "originalVersion")?;
            let md5 =
                parse_optional_md5(node)?.ok_or_else(|| ManifestError::missing("entry", "md5"))?;
            let sha256 = parse_optional_sha256(node)?;
            let size = parse_optional_size(node)?
                .ok_or_else(|| ManifestError::missing("entry", "size"))?;

            entries.push(CatalogEntry {
                path,
                origin_version,
                md5,
                sha256,
                size,
            });
        }

        Ok(Self {
            object_id,
            version,
            entries,
        })
    }

    /// Whether a file at `path` under `version`'s data directory is known
    /// to the catalog.
    pub fn contains(&self, version: VersionNumber, path: &str) -> bool {
        self.entries
            .iter()
            .any(|e| e.origin_version == version && e.path == path)
    }
}

fn parse_object_id(node: roxmltree::Node<'_, '_>) -> Result<ObjectId, ManifestError> {
    let raw = node
        .attribute("objectId")
        .ok_or_else(|| ManifestError::missing(node.tag_name().name(), "objectId"))?;
    ObjectId::parse(raw).map_err(|_| ManifestError::invalid("objectId", raw))
}

fn parse_version_attr(
    node: roxmltree::Node<'_, '_>,
    attribute: &str,
) -> Result<VersionNumber, ManifestError> {
    let raw = node
        .attribute(attribute)
        .ok_or_else(|| ManifestError::missing(node.tag_name().name(), attribute))?;
    let value: u32 = raw
        .parse()
        .map_err(|_| ManifestError::invalid(attribute, raw))?;
    VersionNumber::new(value).map_err(|_| ManifestError::invalid(attribute, raw))
}

fn parse_optional_md5(node: roxmltree::Node<'_, '_>) -> Result<Option<Md5Digest>, ManifestError> {
    node.attribute("md5")
        .map(|raw| Md5Digest::parse(raw).map_err(|_| ManifestError::invalid("md5", raw)))
        .transpose()
}

fn parse_optional_sha256(
    node: roxmltree::Node<'_, '_>,
) -> Result<Option<Sha256Digest>, ManifestError> {
    node.attribute("sha256")
        .map(|raw| Sha256Digest::parse(raw).map_err(|_| ManifestError::invalid("sha256", raw)))
        .transpose()
}

fn parse_optional_size(node: roxmltree::Node<'_, '_>) -> Result<Option<u64>, ManifestError> {
    node.attribute("size")
        .map(|raw| raw.parse().map_err(|_| ManifestError::invalid("size", raw)))
        .transpose()
}
