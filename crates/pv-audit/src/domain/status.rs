//! The status transitioner: a pure function from audit evidence to the
//! record's next status.
//!
//! Callers are responsible for emitting the `recordStatusChanged` finding
//! (only when the status actually changed) and for persisting the result;
//! this module decides, nothing more.

use pv_types::RecordStatus;

/// Outcome of one transition decision.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StatusDecision {
    /// The record's next status. May equal the old status.
    Transition(RecordStatus),
    /// The old status was `invalid_checksum` and this pass did not validate
    /// checksums; the record stays untouched and the caller emits an
    /// `unableToCheckStatus` finding.
    Absorbed,
}

/// Compute a catalog record's next status.
///
/// Rules, in precedence order:
///
/// 1. `invalid_checksum` is absorbing: only a pass that just validated
///    checksums may move it.
/// 2. Structural errors force `invalid_moab`, regardless of version match.
/// 3. No structural errors and the expected version found: `ok` when
///    checksums were just validated, else `validity_unknown`.
/// 4. No structural errors but an unexpected version:
///    `unexpected_version_on_storage`.
pub fn next_status(
    old_status: RecordStatus,
    found_expected_version: bool,
    structural_errors: &[String],
    checksums_validated: bool,
) -> StatusDecision {
    if old_status == RecordStatus::InvalidChecksum && !checksums_validated {
        return StatusDecision::Absorbed;
    }
    if !structural_errors.is_empty() {
        return StatusDecision::Transition(RecordStatus::InvalidMoab);
    }
    if found_expected_version {
        if checksums_validated {
            StatusDecision::Transition(RecordStatus::Ok)
        } else {
            StatusDecision::Transition(RecordStatus::ValidityUnknown)
        }
    } else {
        StatusDecision::Transition(RecordStatus::UnexpectedVersionOnStorage)
    }
}
