//! Named collections of files and their key protection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{base64_decode, base64_encode};
use crate::crypto::KdfParams;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionKind {
    Images,
    Pdfs,
    Documents,
    Others,
    Custom,
}

impl CollectionKind {
    pub const ALL: [Self; 5] = [
        Self::Images,
        Self::Pdfs,
        Self::Documents,
        Self::Others,
        Self::Custom,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Images => "Images",
            Self::Pdfs => "PDFs",
            Self::Documents => "Documents",
            Self::Others => "Others",
            Self::Custom => "Custom",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|k| k.display_name().eq_ignore_ascii_case(name))
    }
}

/// Which key protects a collection.
///
/// `HasOwnSecret` always carries both salt and verifier, so a descriptor
/// with only one of them cannot be represented.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum VaultKeyDescriptor {
    UsesMasterKey,
    HasOwnSecret {
        #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
        salt: Vec<u8>,
        #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
        verifier: Vec<u8>,
        kdf: KdfParams,
    },
}

impl VaultKeyDescriptor {
    pub fn has_separate_secret(&self) -> bool {
        matches!(self, Self::HasOwnSecret { .. })
    }

    pub fn salt(&self) -> Option<&[u8]> {
        match self {
            Self::UsesMasterKey => None,
            Self::HasOwnSecret { salt, .. } => Some(salt),
        }
    }

    pub fn verifier(&self) -> Option<&[u8]> {
        match self {
            Self::UsesMasterKey => None,
            Self::HasOwnSecret { verifier, .. } => Some(verifier),
        }
    }
}

impl Default for VaultKeyDescriptor {
    fn default() -> Self {
        Self::UsesMasterKey
    }
}

impl std::fmt::Debug for VaultKeyDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UsesMasterKey => f.write_str("UsesMasterKey"),
            Self::HasOwnSecret { kdf, .. } => f
                .debug_struct("HasOwnSecret")
                .field("kdf", kdf)
                .finish_non_exhaustive(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collection {
    pub name: String,
    pub kind: CollectionKind,
    #[serde(default)]
    pub descriptor: VaultKeyDescriptor,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub last_accessed: Option<DateTime<Utc>>,
}

impl Collection {
    pub fn new(name: &str, kind: CollectionKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            descriptor: VaultKeyDescriptor::UsesMasterKey,
            created_at: Utc::now(),
            last_accessed: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_accessors_agree_with_state() {
        let none = VaultKeyDescriptor::UsesMasterKey;
        assert!(!none.has_separate_secret());
        assert!(none.salt().is_none() && none.verifier().is_none());

        let own = VaultKeyDescriptor::HasOwnSecret {
            salt: vec![1; 32],
            verifier: vec![2; 32],
            kdf: KdfParams::default(),
        };
        assert!(own.has_separate_secret());
        assert!(own.salt().is_some() && own.verifier().is_some());
    }

    #[test]
    fn descriptor_serializes_with_state_tag() {
        let json = serde_json::to_string(&VaultKeyDescriptor::UsesMasterKey).unwrap();
        assert_eq!(json, r#"{"state":"uses_master_key"}"#);
    }

    #[test]
    fn kind_parse() {
        assert_eq!(CollectionKind::parse("pdfs"), Some(CollectionKind::Pdfs));
        assert_eq!(CollectionKind::parse("Documents"), Some(CollectionKind::Documents));
        assert_eq!(CollectionKind::parse("music"), None);
    }
}
