//! Domain records persisted through the record store.
//!
//! Secret fields are never stored in the clear: each one is an
//! [`StoredEnvelope`] (IV and ciphertext kept as two base64 fields).

pub mod card;
pub mod collection;
pub mod credential;
pub mod file;
pub mod master;
pub mod note;

use serde::{Deserialize, Serialize};

use crate::crypto::Envelope;
use crate::errors::Result;

pub use card::{
    CardFields, CardStatistics, CardType, CardTypeSpec, ExpiryStatus, IdentityCard, NewCard,
};
pub use collection::{Collection, CollectionKind, VaultKeyDescriptor};
pub use credential::{Credential, NewCredential};
pub use file::{guess_mime_type, EncryptedFile, NoteAttachment};
pub use master::MasterCredential;
pub use note::{NoteCategory, SecureNote};

/// A record kept in one of the record store's tables.
pub trait Record: Clone + Serialize + serde::de::DeserializeOwned {
    /// Table name, also used in log fields and error messages.
    const TABLE: &'static str;

    fn id(&self) -> u64;

    /// Called by the store when a record with id `0` is first inserted.
    fn assign_id(&mut self, id: u64);
}

/// An envelope split into the two fields a structured record stores.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEnvelope {
    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub iv: Vec<u8>,

    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub data: Vec<u8>,
}

impl StoredEnvelope {
    pub fn to_envelope(&self) -> Result<Envelope> {
        Envelope::from_parts(&self.iv, self.data.clone())
    }
}

impl From<Envelope> for StoredEnvelope {
    fn from(env: Envelope) -> Self {
        Self {
            iv: env.iv().to_vec(),
            data: env.ciphertext().to_vec(),
        }
    }
}

impl std::fmt::Debug for StoredEnvelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredEnvelope")
            .field("len", &(self.iv.len() + self.data.len()))
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Serde helpers for base64-encoded Vec<u8> fields
// ---------------------------------------------------------------------------

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

pub(crate) fn base64_encode<S>(data: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    let encoded = BASE64.encode(data);
    serializer.serialize_str(&encoded)
}

pub(crate) fn base64_decode<'de, D>(deserializer: D) -> std::result::Result<Vec<u8>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    BASE64.decode(&s).map_err(serde::de::Error::custom)
}
