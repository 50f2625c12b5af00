//! Status enums for catalog records, replica versions, and zip parts.
//!
//! All three are closed sum types with exhaustive matching. The wire names
//! are snake_case and stable: reporters and the catalog both round-trip
//! through them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Audit status of one catalog record.
///
/// `InvalidChecksum` is absorbing for version/structural passes: only a
/// fixity re-validation may move a record out of it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    /// Expected version found, structure valid, checksums validated.
    Ok,
    /// Structural validation reported errors.
    InvalidMoab,
    /// A fixity pass found checksum disagreements. Absorbing.
    InvalidChecksum,
    /// Expected version found but checksums not yet validated.
    #[default]
    ValidityUnknown,
    /// On-storage version is behind the catalog version.
    UnexpectedVersionOnStorage,
    /// The package could not be located on its storage root.
    MoabNotFound,
}

impl RecordStatus {
    /// Stable snake_case name, as persisted and rendered in findings.
    pub fn as_str(self) -> &'static str {
        match self {
            RecordStatus::Ok => "ok",
            RecordStatus::InvalidMoab => "invalid_moab",
            RecordStatus::InvalidChecksum => "invalid_checksum",
            RecordStatus::ValidityUnknown => "validity_unknown",
            RecordStatus::UnexpectedVersionOnStorage => "unexpected_version_on_storage",
            RecordStatus::MoabNotFound => "moab_not_found",
        }
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Derived status of one replicated version on one endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReplicaStatus {
    /// Row exists but no audit conclusion yet.
    #[default]
    Created,
    /// At least one part is missing or not yet replicated.
    Incomplete,
    /// Every part is `ok` and the declared count matches the rows.
    Ok,
    /// A checksum, count, or size inconsistency was found.
    Failed,
}

impl ReplicaStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ReplicaStatus::Created => "created",
            ReplicaStatus::Incomplete => "incomplete",
            ReplicaStatus::Ok => "ok",
            ReplicaStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for ReplicaStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Status of one replicated zip part.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PartStatus {
    /// Present on the endpoint with matching checksum metadata.
    Ok,
    /// Not yet uploaded; the initial state of every part row.
    #[default]
    Unreplicated,
    /// Expected on the endpoint but absent at last check.
    NotFound,
    /// Present but endpoint checksum metadata disagrees with the catalog.
    ChecksumMismatch,
}

impl PartStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PartStatus::Ok => "ok",
            PartStatus::Unreplicated => "unreplicated",
            PartStatus::NotFound => "not_found",
            PartStatus::ChecksumMismatch => "checksum_mismatch",
        }
    }
}

impl fmt::Display for PartStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_states() {
        assert_eq!(RecordStatus::default(), RecordStatus::ValidityUnknown);
        assert_eq!(ReplicaStatus::default(), ReplicaStatus::Created);
        assert_eq!(PartStatus::default(), PartStatus::Unreplicated);
    }

    #[test]
    fn test_wire_names_are_snake_case() {
        let json = serde_json::to_string(&RecordStatus::UnexpectedVersionOnStorage).unwrap();
        assert_eq!(json, "\"unexpected_version_on_storage\"");
        let back: RecordStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, RecordStatus::UnexpectedVersionOnStorage);

        assert_eq!(
            serde_json::to_string(&PartStatus::ChecksumMismatch).unwrap(),
            "\"checksum_mismatch\""
        );
    }

    #[test]
    fn test_display_matches_wire_name() {
        assert_eq!(RecordStatus::InvalidChecksum.to_string(), "invalid_checksum");
        assert_eq!(ReplicaStatus::Incomplete.to_string(), "incomplete");
        assert_eq!(PartStatus::NotFound.to_string(), "not_found");
    }
}
