//! Zip part suffixes and object-store keys.
//!
//! Each package version is replicated as one or more zip chunks. The first
//! chunk carries the plain `.zip` suffix; split archives continue with
//! `.z01`, `.z02`, and so on. The object-store key for a chunk is the
//! tree-shaped path of the object identifier plus a zero-padded version and
//! the chunk suffix, e.g. `bj/102/hs/9687/bj102hs9687.v0003.z01`.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::ValidationError;
use crate::ids::{ObjectId, VersionNumber};

/// Chunk ordinal within a split zip archive.
///
/// Ordinal 0 is the base `.zip`; ordinal N is `.zNN`. Ordering follows the
/// ordinal, so `.zip < .z01 < .z02`.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(try_from = "String", into = "String")]
pub struct PartSuffix(u16);

impl PartSuffix {
    /// The base `.zip` chunk.
    pub const ZIP: PartSuffix = PartSuffix(0);

    /// The `.zNN` continuation chunk for ordinal `n >= 1`.
    pub fn segment(n: u16) -> Result<Self, ValidationError> {
        if n == 0 {
            return Err(ValidationError::MalformedPartSuffix {
                input: ".z00".to_string(),
            });
        }
        Ok(Self(n))
    }

    /// Parse `.zip` or `.zNN` (two or more digits, not all zero).
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let lowered = input.trim().to_ascii_lowercase();
        if lowered == ".zip" {
            return Ok(Self::ZIP);
        }
        let malformed = || ValidationError::MalformedPartSuffix {
            input: input.to_string(),
        };
        let digits = lowered.strip_prefix(".z").ok_or_else(malformed)?;
        if digits.len() < 2 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }
        let n: u16 = digits.parse().map_err(|_| malformed())?;
        if n == 0 {
            return Err(malformed());
        }
        Ok(Self(n))
    }

    /// Chunk ordinal: 0 for `.zip`, N for `.zNN`.
    pub fn ordinal(self) -> u16 {
        self.0
    }
}

impl fmt::Display for PartSuffix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 == 0 {
            write!(f, ".zip")
        } else {
            write!(f, ".z{:02}", self.0)
        }
    }
}

impl TryFrom<String> for PartSuffix {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PartSuffix> for String {
    fn from(s: PartSuffix) -> Self {
        s.to_string()
    }
}

/// Fully-qualified object-store key of one replicated zip chunk.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PartKey {
    object_id: ObjectId,
    version: VersionNumber,
    suffix: PartSuffix,
}

impl PartKey {
    pub fn new(object_id: ObjectId, version: VersionNumber, suffix: PartSuffix) -> Self {
        Self {
            object_id,
            version,
            suffix,
        }
    }

    pub fn object_id(&self) -> &ObjectId {
        &self.object_id
    }

    pub fn version(&self) -> VersionNumber {
        self.version
    }

    pub fn suffix(&self) -> PartSuffix {
        self.suffix
    }
}

impl fmt::Display for PartKey {
    /// `bj/102/hs/9687/bj102hs9687.v0003.z01`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}.{}{}",
            self.object_id.tree_path().rsplit_once('/').map(|(p, _)| p).unwrap_or_default(),
            self.object_id.bare(),
            self.version.dir_label(),
            self.suffix
        )
    }
}
