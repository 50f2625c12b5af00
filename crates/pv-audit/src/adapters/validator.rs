//! Structural validators.
//!
//! `BasicStructuralValidator` covers the shape checks a moab must pass
//! before any fixity work is worth doing; production deployments may
//! substitute the external low-level validator behind the same port.
//! `MockStructuralValidator` is the controllable test double.

use parking_lot::RwLock;
use pv_types::{ObjectId, StorageRootName, VersionNumber};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::ports::outbound::{StructuralValidator, StructuralVerdict};

/// Directory-shape validator: version directories must form a contiguous
/// `v0001..vNNNN` run, each with a manifest inventory and a data directory.
pub struct BasicStructuralValidator {
    roots: HashMap<StorageRootName, PathBuf>,
}

impl BasicStructuralValidator {
    pub fn new(roots: HashMap<StorageRootName, PathBuf>) -> Self {
        Self { roots }
    }

    pub fn single(name: StorageRootName, path: impl Into<PathBuf>) -> Self {
        Self::new(HashMap::from([(name, path.into())]))
    }
}

impl StructuralValidator for BasicStructuralValidator {
    fn validate(&self, root: &StorageRootName, id: &ObjectId) -> StructuralVerdict {
        let mut errors = Vec::new();

        let Some(base) = self.roots.get(root) else {
            return StructuralVerdict::invalid(vec![format!("unknown storage root {root}")]);
        };
        let package = base.join(id.tree_path());
        if !package.is_dir() {
            return StructuralVerdict::invalid(vec![format!(
                "package directory missing: {}",
                package.display()
            )]);
        }

        let mut versions: Vec<u32> = Vec::new();
        match std::fs::read_dir(&package) {
            Ok(entries) => {
                for entry in entries.flatten() {
                    let name = entry.file_name();
                    let name = name.to_string_lossy().to_string();
                    match name
                        .strip_prefix('v')
                        .and_then(|d| d.parse::<u32>().ok())
                        .and_then(|n| VersionNumber::new(n).ok())
                    {
                        Some(version) => versions.push(version.get()),
                        None => errors.push(format!("unexpected entry in package root: {name}")),
                    }
                }
            }
            Err(e) => {
                return StructuralVerdict::invalid(vec![format!(
                    "unreadable package directory: {e}"
                )]);
            }
        }
        versions.sort_unstable();

        if versions.is_empty() {
            errors.push("no version directories".to_string());
        }
        for (index, version) in versions.iter().enumerate() {
            let expected = index as u32 + 1;
            if *version != expected {
                errors.push(format!(
                    "version directories not contiguous: expected v{expected:04}, found v{version:04}"
                ));
                break;
            }
        }

        for version in &versions {
            let vdir = package.join(format!("v{version:04}"));
            if !vdir.join("manifests").join("manifestInventory.xml").is_file() {
                errors.push(format!("v{version:04} missing manifests/manifestInventory.xml"));
            }
            if !vdir.join("data").is_dir() {
                errors.push(format!("v{version:04} missing data directory"));
            }
        }

        if errors.is_empty() {
            StructuralVerdict::valid()
        } else {
            StructuralVerdict::invalid(errors)
        }
    }
}

/// Controllable validator for unit and scenario tests.
pub struct MockStructuralValidator {
    verdict: RwLock<StructuralVerdict>,
}

impl MockStructuralValidator {
    /// Starts out reporting a valid structure.
    pub fn valid() -> Self {
        Self {
            verdict: RwLock::new(StructuralVerdict::valid()),
        }
    }

    /// Update the verdict returned to subsequent callers.
    pub fn set_verdict(&self, verdict: StructuralVerdict) {
        *self.verdict.write() = verdict;
    }
}

impl StructuralValidator for MockStructuralValidator {
    fn validate(&self, _root: &StorageRootName, _id: &ObjectId) -> StructuralVerdict {
        self.verdict.read().clone()
    }
}
