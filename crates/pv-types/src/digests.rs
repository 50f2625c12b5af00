//! Checksums used for fixity decisions.
//!
//! MD5 is the primary digest (it is what the manifests and the replica
//! metadata carry); SHA-256 rides along where the manifests record it.
//! Digests are stored as validated lowercase hex strings so they compare
//! directly against manifest attributes and object-store metadata.

use md5::{Digest as _, Md5};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::fmt;
use std::io::{self, Read};

use crate::errors::ValidationError;

/// Buffer size for streaming digest computation.
const DIGEST_BUF_SIZE: usize = 64 * 1024;

/// An MD5 digest: exactly 32 lowercase hex characters.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Md5Digest(String);

impl Md5Digest {
    /// Validate a raw hex string, normalizing case.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let normalized = input.trim().to_ascii_lowercase();
        if normalized.len() != 32 || !normalized.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ValidationError::MalformedDigest {
                input: input.to_string(),
            });
        }
        Ok(Self(normalized))
    }

    /// Digest an in-memory buffer.
    pub fn compute(bytes: &[u8]) -> Self {
        let mut hasher = Md5::new();
        hasher.update(bytes);
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Md5Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for Md5Digest {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Md5Digest> for String {
    fn from(d: Md5Digest) -> Self {
        d.0
    }
}

/// A SHA-256 digest: exactly 64 lowercase hex characters.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Sha256Digest(String);

impl Sha256Digest {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let normalized = input.trim().to_ascii_lowercase();
        if normalized.len() != 64 || !normalized.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ValidationError::MalformedDigest {
                input: input.to_string(),
            });
        }
        Ok(Self(normalized))
    }

    pub fn compute(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Sha256Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for Sha256Digest {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Sha256Digest> for String {
    fn from(d: Sha256Digest) -> Self {
        d.0
    }
}

/// All digests of one file, computed in a single streaming pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileDigests {
    pub md5: Md5Digest,
    pub sha256: Sha256Digest,
    /// Actual byte count seen while digesting.
    pub size: u64,
}

impl FileDigests {
    /// Digest a reader without buffering the whole file in memory.
    pub fn from_reader<R: Read>(mut reader: R) -> io::Result<Self> {
        let mut md5 = Md5::new();
        let mut sha256 = Sha256::new();
        let mut size = 0u64;
        let mut buf = [0u8; DIGEST_BUF_SIZE];
        loop {
            let n = reader.read(&mut buf)?;
            if n == 0 {
                break;
            }
            md5.update(&buf[..n]);
            sha256.update(&buf[..n]);
            size += n as u64;
        }
        Ok(Self {
            md5: Md5Digest(hex::encode(md5.finalize())),
            sha256: Sha256Digest(hex::encode(sha256.finalize())),
            size,
        })
    }

    /// Digest an in-memory buffer.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            md5: Md5Digest::compute(bytes),
            sha256: Sha256Digest::compute(bytes),
            size: bytes.len() as u64,
        }
    }
}
