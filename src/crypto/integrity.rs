//! SHA-256 integrity tags.
//!
//! File payloads are tagged over their plaintext; backup artifacts are
//! tagged over their encrypted bytes so they can be checked without the
//! key.  Tags are stored base64-encoded.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::errors::{Result, VaultError};

/// Length of a SHA-256 digest in bytes.
pub const TAG_LEN: usize = 32;

#[derive(Clone, Copy)]
pub struct IntegrityTag([u8; TAG_LEN]);

impl IntegrityTag {
    /// Hash `data` with SHA-256.
    pub fn compute(data: &[u8]) -> Self {
        Self(Sha256::digest(data).into())
    }

    /// Constant-time check that `data` hashes to this tag.
    pub fn matches(&self, data: &[u8]) -> bool {
        *self == Self::compute(data)
    }

    /// Fail with `IntegrityFailed(subject)` unless `data` matches.
    pub fn verify(&self, data: &[u8], subject: &str) -> Result<()> {
        if self.matches(data) {
            Ok(())
        } else {
            Err(VaultError::IntegrityFailed(subject.to_string()))
        }
    }

    pub fn to_base64(&self) -> String {
        BASE64.encode(self.0)
    }

    pub fn from_base64(s: &str) -> Result<Self> {
        let bytes = BASE64
            .decode(s)
            .map_err(|e| VaultError::Serialization(format!("integrity tag: {e}")))?;
        let arr: [u8; TAG_LEN] = bytes.try_into().map_err(|_| {
            VaultError::Serialization("integrity tag must be 32 bytes".to_string())
        })?;
        Ok(Self(arr))
    }
}

impl PartialEq for IntegrityTag {
    fn eq(&self, other: &Self) -> bool {
        self.0.ct_eq(&other.0).into()
    }
}

impl Eq for IntegrityTag {}

impl std::fmt::Debug for IntegrityTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "IntegrityTag({})", self.to_base64())
    }
}

impl Serialize for IntegrityTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base64())
    }
}

impl<'de> Deserialize<'de> for IntegrityTag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_base64(&s).map_err(serde::de::Error::custom)
    }
}
