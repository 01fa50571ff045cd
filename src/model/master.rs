//! The master credential: salt and verifier for the master password.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{base64_decode, base64_encode};
use crate::crypto::KdfParams;

/// Stored once per vault.  Holds neither the password nor the key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasterCredential {
    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub salt: Vec<u8>,

    /// PBKDF2 verifier for the master password.
    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub verifier: Vec<u8>,

    /// Work factor the verifier was computed with.
    pub kdf: KdfParams,

    pub created_at: DateTime<Utc>,

    /// Last time the master password was changed.
    pub updated_at: DateTime<Utc>,
}
