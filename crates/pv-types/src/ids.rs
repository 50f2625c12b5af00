//! Identifiers and labels.
//!
//! The object identifier is opaque to callers but has a fixed bare shape
//! (two letters, three digits, two letters, four digits) so that a
//! deterministic tree path can be derived for object-store keys and on-disk
//! package directories. Identifiers are case-insensitive and may carry a
//! namespace prefix, e.g. `vault:bj102hs9687`.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::ValidationError;

/// Opaque, case-insensitive identifier of a preservation object.
///
/// Parsing normalizes to lowercase and keeps the optional namespace prefix
/// separate from the bare form. Two identifiers differing only in case or
/// prefix spelling case compare equal after parsing.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ObjectId {
    prefix: Option<String>,
    bare: String,
}

impl ObjectId {
    /// Parse a raw identifier, with or without a namespace prefix.
    ///
    /// ## Errors
    ///
    /// `ValidationError::MalformedObjectId` when the bare form is not
    /// `aa111bb2222` shaped or the prefix is empty/non-alphanumeric.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let normalized = input.trim().to_ascii_lowercase();
        let (prefix, bare) = match normalized.split_once(':') {
            Some((p, b)) => (Some(p), b),
            None => (None, normalized.as_str()),
        };

        if let Some(p) = prefix {
            if p.is_empty() || !p.bytes().all(|b| b.is_ascii_alphanumeric()) {
                return Err(ValidationError::MalformedObjectId {
                    input: input.to_string(),
                });
            }
        }

        if !Self::bare_form_is_valid(bare) {
            return Err(ValidationError::MalformedObjectId {
                input: input.to_string(),
            });
        }

        Ok(Self {
            prefix: prefix.map(str::to_string),
            bare: bare.to_string(),
        })
    }

    /// `aa111bb2222`: 2 letters, 3 digits, 2 letters, 4 digits.
    fn bare_form_is_valid(bare: &str) -> bool {
        let b = bare.as_bytes();
        b.len() == 11
            && b[0..2].iter().all(u8::is_ascii_lowercase)
            && b[2..5].iter().all(u8::is_ascii_digit)
            && b[5..7].iter().all(u8::is_ascii_lowercase)
            && b[7..11].iter().all(u8::is_ascii_digit)
    }

    /// The bare form without any namespace prefix.
    pub fn bare(&self) -> &str {
        &self.bare
    }

    /// The namespace prefix, if one was given.
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Tree-shaped path segments derived from the bare form,
    /// e.g. `bj102hs9687` -> `["bj", "102", "hs", "9687"]`.
    ///
    /// Used both for on-disk package directories and object-store keys.
    pub fn tree_segments(&self) -> [&str; 4] {
        [
            &self.bare[0..2],
            &self.bare[2..5],
            &self.bare[5..7],
            &self.bare[7..11],
        ]
    }

    /// Tree path including the trailing bare directory,
    /// e.g. `bj/102/hs/9687/bj102hs9687`.
    pub fn tree_path(&self) -> String {
        let [a, b, c, d] = self.tree_segments();
        format!("{a}/{b}/{c}/{d}/{}", self.bare)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.prefix {
            Some(p) => write!(f, "{p}:{}", self.bare),
            None => write!(f, "{}", self.bare),
        }
    }
}

impl TryFrom<String> for ObjectId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ObjectId> for String {
    fn from(id: ObjectId) -> Self {
        id.to_string()
    }
}

/// A positive package version number.
///
/// Versions start at 1 and only ever grow; zero anywhere in raw input is an
/// input-validation error, not a catalog state.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct VersionNumber(u32);

impl VersionNumber {
    /// Validate a raw version number.
    pub fn new(value: u32) -> Result<Self, ValidationError> {
        if value == 0 {
            return Err(ValidationError::NonPositiveVersion {
                value: value as u64,
            });
        }
        Ok(Self(value))
    }

    /// The underlying integer.
    pub fn get(self) -> u32 {
        self.0
    }

    /// Zero-padded directory label, e.g. `v0003`.
    pub fn dir_label(self) -> String {
        format!("v{:04}", self.0)
    }
}

impl fmt::Display for VersionNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Label of a filesystem storage root holding preservation packages.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StorageRootName(String);

impl StorageRootName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StorageRootName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Label of a remote object-store endpoint receiving zip part replicas.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EndpointName(String);

impl EndpointName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EndpointName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
