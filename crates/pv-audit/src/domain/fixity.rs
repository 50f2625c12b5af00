//! The fixity walk: verify a package's bytes against its two manifests.
//!
//! Two phases. First, per version oldest to newest, the version's manifest
//! inventory is checked for internal consistency and against the files in
//! that version's `data/` directory. Second, once, every physically present
//! data file and every signature-catalog entry are cross-checked against
//! the latest signature catalog.
//!
//! Nothing here aborts the run: a malformed document, a missing file, or an
//! unreadable path each downgrade to one typed finding and the walk
//! continues, so a single pass surfaces every problem at once. The caller's
//! verdict is simply whether the ledger stayed empty.

use pv_types::{ObjectId, StorageRootName, VersionNumber};
use std::collections::HashSet;
use tracing::debug;

use crate::domain::manifests::{ManifestInventory, SignatureCatalog};
use crate::domain::results::{AuditResults, ResultCode};
use crate::ports::outbound::{ManifestKind, PackageError, PackageStore};

/// Version-qualified display path for a data file,
/// e.g. `v0002/data/content/page-2.jpg`.
fn qualified(version: VersionNumber, path: &str) -> String {
    format!("{}/data/{}", version.dir_label(), path)
}

fn manifest_path(version: VersionNumber, kind: ManifestKind) -> String {
    format!("{}/manifests/{}", version.dir_label(), kind.file_name())
}

/// Run the full fixity walk, accumulating findings into `results`.
///
/// An empty ledger afterwards means the package is fixity-valid.
pub fn audit_package<P: PackageStore + ?Sized>(
    packages: &P,
    root: &StorageRootName,
    id: &ObjectId,
    latest: VersionNumber,
    results: &mut AuditResults,
) {
    debug!(object = %id, %root, latest = %latest, "starting fixity walk");

    for v in 1..=latest.get() {
        // Version numbers in 1..=latest are positive by construction.
        let Ok(version) = VersionNumber::new(v) else {
            continue;
        };
        audit_version_inventory(packages, root, id, version, results);
    }

    audit_signature_catalog(packages, root, id, latest, results);
}

/// Phase one for a single version: the manifest inventory against the
/// version's data directory.
fn audit_version_inventory<P: PackageStore + ?Sized>(
    packages: &P,
    root: &StorageRootName,
    id: &ObjectId,
    version: VersionNumber,
    results: &mut AuditResults,
) {
    let doc_path = manifest_path(version, ManifestKind::Inventory);
    let xml = match packages.read_manifest(root, id, version, ManifestKind::Inventory) {
        Ok(xml) => xml,
        Err(e) => {
            results.add_result(
                ResultCode::InvalidManifest,
                &[
                    ("manifest_file_path", doc_path),
                    ("error_message", e.to_string()),
                ],
            );
            return;
        }
    };

    let inventory = match ManifestInventory::parse(&xml) {
        Ok(inventory) => inventory,
        Err(e) => {
            results.add_result(
                ResultCode::InvalidManifest,
                &[
                    ("manifest_file_path", doc_path),
                    ("error_message", e.to_string()),
                ],
            );
            return;
        }
    };

    // The inventory's own internal consistency check.
    if !inventory.count_is_consistent() {
        results.add_result(
            ResultCode::InvalidManifest,
            &[
                ("manifest_file_path", doc_path.clone()),
                (
                    "error_message",
                    format!(
                        "declared fileCount {} does not match {} file entries",
                        inventory.declared_file_count,
                        inventory.entries.len()
                    ),
                ),
            ],
        );
    }

    // Modified entries: the recorded checksum must match the live file.
    for entry in inventory.modified() {
        match packages.digest_data_file(root, id, version, &entry.path) {
            Ok(digests) => {
                let md5_disagrees = entry.md5.as_ref().is_some_and(|m| *m != digests.md5);
                let size_disagrees = entry.size.is_some_and(|s| s != digests.size);
                if md5_disagrees || size_disagrees {
                    results.add_result(
                        ResultCode::ChecksumMismatch,
                        &[
                            ("file_path", qualified(version, &entry.path)),
                            ("version", version.to_string()),
                        ],
                    );
                }
            }
            Err(PackageError::NotFound { .. }) => {
                results.add_result(
                    ResultCode::FileNotInMoab,
                    &[("file_path", qualified(version, &entry.path))],
                );
            }
            Err(e) => {
                results.add_result(
                    ResultCode::InvalidMoab,
                    &[("errors", e.to_string())],
                );
            }
        }
    }

    // Added entries: existence only here; their checksums are covered by
    // the signature catalog phase.
    for entry in inventory.added() {
        match packages.digest_data_file(root, id, version, &entry.path) {
            Ok(_) => {}
            Err(PackageError::NotFound { .. }) => {
                results.add_result(
                    ResultCode::FileNotInMoab,
                    &[("file_path", qualified(version, &entry.path))],
                );
            }
            Err(e) => {
                results.add_result(ResultCode::InvalidMoab, &[("errors", e.to_string())]);
            }
        }
    }

    // On-disk additions the manifest does not know about.
    let expected: HashSet<&str> = inventory.expected_paths().collect();
    match packages.list_data_files(root, id, version) {
        Ok(on_disk) => {
            for path in on_disk {
                if !expected.contains(path.as_str()) {
                    results.add_result(
                        ResultCode::FileNotInManifest,
                        &[("file_path", qualified(version, &path))],
                    );
                }
            }
        }
        Err(e) => {
            results.add_result(ResultCode::InvalidMoab, &[("errors", e.to_string())]);
        }
    }
}

/// Phase two: every on-disk data file and every catalog entry, against the
/// latest signature catalog.
fn audit_signature_catalog<P: PackageStore + ?Sized>(
    packages: &P,
    root: &StorageRootName,
    id: &ObjectId,
    latest: VersionNumber,
    results: &mut AuditResults,
) {
    let doc_path = manifest_path(latest, ManifestKind::SignatureCatalog);
    let xml = match packages.read_manifest(root, id, latest, ManifestKind::SignatureCatalog) {
        Ok(xml) => xml,
        Err(PackageError::NotFound { .. }) => {
            results.add_result(
                ResultCode::SignatureCatalogNotInMoab,
                &[("manifest_file_path", doc_path)],
            );
            return;
        }
        Err(e) => {
            results.add_result(
                ResultCode::InvalidManifest,
                &[
                    ("manifest_file_path", doc_path),
                    ("error_message", e.to_string()),
                ],
            );
            return;
        }
    };

    let catalog = match SignatureCatalog::parse(&xml) {
        Ok(catalog) => catalog,
        Err(e) => {
            results.add_result(
                ResultCode::InvalidManifest,
                &[
                    ("manifest_file_path", doc_path),
                    ("error_message", e.to_string()),
                ],
            );
            return;
        }
    };

    // Every physically present data file must be cataloged.
    for v in 1..=latest.get() {
        let Ok(version) = VersionNumber::new(v) else {
            continue;
        };
        match packages.list_data_files(root, id, version) {
            Ok(on_disk) => {
                for path in on_disk {
                    if !catalog.contains(version, &path) {
                        results.add_result(
                            ResultCode::FileNotInSignatureCatalog,
                            &[("file_path", qualified(version, &path))],
                        );
                    }
                }
            }
            Err(e) => {
                results.add_result(ResultCode::InvalidMoab, &[("errors", e.to_string())]);
            }
        }
    }

    // Every catalog entry must still digest to its recorded signature.
    for entry in &catalog.entries {
        match packages.digest_data_file(root, id, entry.origin_version, &entry.path) {
            Ok(digests) => {
                let sha_disagrees = entry
                    .sha256
                    .as_ref()
                    .is_some_and(|s| *s != digests.sha256);
                if entry.md5 != digests.md5 || entry.size != digests.size || sha_disagrees {
                    results.add_result(
                        ResultCode::ChecksumMismatch,
                        &[
                            ("file_path", qualified(entry.origin_version, &entry.path)),
                            ("version", entry.origin_version.to_string()),
                        ],
                    );
                }
            }
            Err(PackageError::NotFound { .. }) => {
                results.add_result(
                    ResultCode::FileNotInMoab,
                    &[("file_path", qualified(entry.origin_version, &entry.path))],
                );
            }
            Err(e) => {
                results.add_result(ResultCode::InvalidMoab, &[("errors", e.to_string())]);
            }
        }
    }
}
