//! Pure replica-consistency checks over a set of sibling part rows.
//!
//! The replica audit service feeds these with the catalog's part rows and
//! the remote-endpoint observations; everything here is deterministic
//! collection logic with no I/O.

use pv_types::{PartStatus, ReplicaStatus};

use crate::domain::entities::ReplicaPartRecord;

/// What the sibling parts collectively declare as their total count.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeclaredCount {
    /// Exactly one distinct declared value across all siblings.
    Consistent(u32),
    /// Siblings disagree; the distinct values, ascending.
    Inconsistent(Vec<u32>),
}

/// Distinct `parts_count` values declared by sibling parts.
///
/// Callers must not pass an empty slice; zero parts short-circuits before
/// any consistency check.
pub fn declared_parts_count(parts: &[ReplicaPartRecord]) -> DeclaredCount {
    let mut counts: Vec<u32> = parts.iter().map(|p| p.parts_count).collect();
    counts.sort_unstable();
    counts.dedup();
    match counts.as_slice() {
        [single] => DeclaredCount::Consistent(*single),
        _ => DeclaredCount::Inconsistent(counts),
    }
}

/// Sum of the catalog-recorded part sizes.
pub fn total_part_size(parts: &[ReplicaPartRecord]) -> u64 {
    parts.iter().map(|p| p.size).sum()
}

/// Parts still waiting for their first upload.
pub fn unreplicated_parts(parts: &[ReplicaPartRecord]) -> Vec<&ReplicaPartRecord> {
    parts
        .iter()
        .filter(|p| p.status == PartStatus::Unreplicated)
        .collect()
}

/// Derive the owning replica version's status from its parts' (possibly
/// just-updated) statuses and the count/size consistency verdicts.
///
/// A missing or not-yet-replicated part makes the replica `incomplete`
/// even when inconsistencies were also found; a checksum mismatch or a
/// count/size inconsistency with all parts present makes it `failed`.
pub fn derive_replica_status(statuses: &[PartStatus], counts_and_size_ok: bool) -> ReplicaStatus {
    if statuses
        .iter()
        .any(|s| matches!(s, PartStatus::NotFound | PartStatus::Unreplicated))
    {
        return ReplicaStatus::Incomplete;
    }
    if statuses.iter().any(|s| *s == PartStatus::ChecksumMismatch) || !counts_and_size_ok {
        return ReplicaStatus::Failed;
    }
    ReplicaStatus::Ok
}
