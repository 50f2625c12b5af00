//! # Shared Types Crate
//!
//! Domain vocabulary for the Preservation Vault audit subsystem.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: object identifiers, version numbers,
//!   checksums, zip part keys, and status enums are defined once, here.
//! - **Parse, don't validate twice**: every constructor that accepts raw
//!   input returns `Result<_, ValidationError>`; a value that exists is a
//!   value that passed validation.
//! - **Closed status sets**: record, replica, and part statuses are tagged
//!   enums with exhaustive matching, never runtime symbol tables.

pub mod digests;
pub mod errors;
pub mod ids;
pub mod parts;
pub mod status;
pub mod time;

pub use digests::{FileDigests, Md5Digest, Sha256Digest};
pub use errors::ValidationError;
pub use ids::{EndpointName, ObjectId, StorageRootName, VersionNumber};
pub use parts::{PartKey, PartSuffix};
pub use status::{PartStatus, RecordStatus, ReplicaStatus};
pub use time::{FixedTimeSource, SystemTimeSource, TimeSource, Timestamp};
