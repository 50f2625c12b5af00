//! Input validation errors.
//!
//! Every fallible constructor in this crate returns one of these variants.
//! Audit services aggregate them into a single `invalidArguments` finding
//! before any I/O happens.

use thiserror::Error;

/// Rejected raw input (malformed identifier, non-positive number, unknown
/// label). Carries enough context to render a human-readable finding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Object identifier does not match the expected shape.
    #[error("malformed object identifier: {input:?}")]
    MalformedObjectId { input: String },

    /// Version numbers are positive integers; zero is never valid.
    #[error("version must be a positive integer, got {value}")]
    NonPositiveVersion { value: u64 },

    /// MD5 digests are exactly 32 hex characters.
    #[error("malformed md5 digest: {input:?}")]
    MalformedDigest { input: String },

    /// Zip part suffixes are `.zip` or `.zNN`.
    #[error("malformed zip part suffix: {input:?}")]
    MalformedPartSuffix { input: String },

    /// Storage root label not present in the configured set.
    #[error("unknown storage root: {name:?}")]
    UnknownStorageRoot { name: String },

    /// Replica endpoint label not present in the configured set.
    #[error("unknown replica endpoint: {name:?}")]
    UnknownEndpoint { name: String },
}
