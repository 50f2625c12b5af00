//! Filesystem package store.
//!
//! Reads real moab directory trees:
//!
//! ```text
//! <root>/bj/102/hs/9687/bj102hs9687/
//!   v0001/
//!     manifests/manifestInventory.xml
//!     data/content/page-1.jpg
//!   v0002/
//!     manifests/manifestInventory.xml
//!     manifests/signatureCatalog.xml
//!     data/...
//! ```
//!
//! All I/O errors surface as typed [`PackageError`]s so the fixity walk can
//! downgrade them per file instead of aborting.

use pv_types::{FileDigests, ObjectId, StorageRootName, VersionNumber};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::ports::outbound::{ManifestKind, PackageError, PackageStore};

/// Filesystem-backed [`PackageStore`] over a set of named storage roots.
pub struct FilesystemPackages {
    roots: HashMap<StorageRootName, PathBuf>,
}

impl FilesystemPackages {
    pub fn new(roots: HashMap<StorageRootName, PathBuf>) -> Self {
        Self { roots }
    }

    /// Convenience constructor for a single root.
    pub fn single(name: StorageRootName, path: impl Into<PathBuf>) -> Self {
        Self::new(HashMap::from([(name, path.into())]))
    }

    fn package_dir(&self, root: &StorageRootName, id: &ObjectId) -> Result<PathBuf, PackageError> {
        let base = self.roots.get(root).ok_or_else(|| PackageError::NotFound {
            path: format!("storage root {root}"),
        })?;
        Ok(base.join(id.tree_path()))
    }

    fn version_dir(
        &self,
        root: &StorageRootName,
        id: &ObjectId,
        version: VersionNumber,
    ) -> Result<PathBuf, PackageError> {
        Ok(self.package_dir(root, id)?.join(version.dir_label()))
    }
}

fn io_error(path: &Path, e: io::Error) -> PackageError {
    if e.kind() == io::ErrorKind::NotFound {
        PackageError::NotFound {
            path: path.display().to_string(),
        }
    } else {
        PackageError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        }
    }
}

/// Recursively collect file paths under `dir`, relative to `base`, with
/// forward-slash separators.
fn walk_files(base: &Path, dir: &Path, out: &mut Vec<String>) -> Result<(), PackageError> {
    let entries = fs::read_dir(dir).map_err(|e| io_error(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| io_error(dir, e))?;
        let path = entry.path();
        if path.is_dir() {
            walk_files(base, &path, out)?;
        } else {
            let rel = path
                .strip_prefix(base)
                .unwrap_or(&path)
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            out.push(rel);
        }
    }
    Ok(())
}

fn dir_size(dir: &Path) -> Result<u64, PackageError> {
    let mut total = 0u64;
    let entries = fs::read_dir(dir).map_err(|e| io_error(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| io_error(dir, e))?;
        let path = entry.path();
        if path.is_dir() {
            total += dir_size(&path)?;
        } else {
            let meta = fs::metadata(&path).map_err(|e| io_error(&path, e))?;
            total += meta.len();
        }
    }
    Ok(total)
}

impl PackageStore for FilesystemPackages {
    fn on_storage_version(
        &self,
        root: &StorageRootName,
        id: &ObjectId,
    ) -> Result<Option<VersionNumber>, PackageError> {
        let dir = self.package_dir(root, id)?;
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error(&dir, e)),
        };

        let mut max = None;
        for entry in entries {
            let entry = entry.map_err(|e| io_error(&dir, e))?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if let Some(digits) = name.strip_prefix('v') {
                if let Ok(n) = digits.parse::<u32>() {
                    if let Ok(version) = VersionNumber::new(n) {
                        max = Some(max.map_or(version, |m: VersionNumber| m.max(version)));
                    }
                }
            }
        }
        Ok(max)
    }

    fn package_size(&self, root: &StorageRootName, id: &ObjectId) -> Result<u64, PackageError> {
        let dir = self.package_dir(root, id)?;
        dir_size(&dir)
    }

    fn version_size(
        &self,
        root: &StorageRootName,
        id: &ObjectId,
        version: VersionNumber,
    ) -> Result<u64, PackageError> {
        let dir = self.version_dir(root, id, version)?;
        dir_size(&dir)
    }

    fn read_manifest(
        &self,
        root: &StorageRootName,
        id: &ObjectId,
        version: VersionNumber,
        kind: ManifestKind,
    ) -> Result<String, PackageError> {
        let path = self
            .version_dir(root, id, version)?
            .join("manifests")
            .join(kind.file_name());
        fs::read_to_string(&path).map_err(|e| io_error(&path, e))
    }

    fn list_data_files(
        &self,
        root: &StorageRootName,
        id: &ObjectId,
        version: VersionNumber,
    ) -> Result<Vec<String>, PackageError> {
        let data = self.version_dir(root, id, version)?.join("data");
        if !data.is_dir() {
            return Ok(Vec::new());
        }
        let mut files = Vec::new();
        walk_files(&data, &data, &mut files)?;
        files.sort();
        Ok(files)
    }

    fn digest_data_file(
        &self,
        root: &StorageRootName,
        id: &ObjectId,
        version: VersionNumber,
        path: &str,
    ) -> Result<FileDigests, PackageError> {
        let full = self.version_dir(root, id, version)?.join("data").join(path);
        let file = fs::File::open(&full).map_err(|e| io_error(&full, e))?;
        FileDigests::from_reader(io::BufReader::new(file)).map_err(|e| io_error(&full, e))
    }
}
