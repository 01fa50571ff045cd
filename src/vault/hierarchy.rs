//! Collection key hierarchy.
//!
//! Each collection is in one of two states, recorded by its
//! [`VaultKeyDescriptor`]:
//!
//! ```text
//!                set_secret(Some(s))
//!   UsesMasterKey ──────────────────▶ HasOwnSecret{salt, verifier, kdf}
//!        ▲                                   │
//!        └───────── set_secret(None) ────────┘
//! ```
//!
//! `resolve_key` turns the session's master key plus an optional supplied
//! secret into the key that actually protects the collection.  It is
//! re-run on every access; no collection key is cached here.

use tracing::{debug, info};

use crate::crypto::{derive_key, generate_salt, hash_password, kdf, KdfParams, MasterKey, Password, SecureRandom, VaultKey};
use crate::errors::{Result, VaultError};
use crate::model::{Collection, CollectionKind, VaultKeyDescriptor};
use crate::store::RecordStore;

/// Longest accepted collection name.
const MAX_NAME_LEN: usize = 64;

#[derive(Debug, Clone, Copy)]
pub struct KeyHierarchy {
    rng: SecureRandom,
    kdf: KdfParams,
}

impl KeyHierarchy {
    /// `kdf` is the work factor used for newly set secrets; existing
    /// descriptors keep the one they were created with.
    pub fn new(rng: SecureRandom, kdf: KdfParams) -> Self {
        Self { rng, kdf }
    }

    // ------------------------------------------------------------------
    // Descriptor-level operations
    // ------------------------------------------------------------------

    /// Build the descriptor for `secret` and return it together with the
    /// key it resolves to.
    ///
    /// `None` means master-key protection.
    pub fn new_descriptor(
        &self,
        secret: Option<Password>,
        master: &MasterKey,
    ) -> Result<(VaultKeyDescriptor, VaultKey)> {
        match secret {
            None => Ok((VaultKeyDescriptor::UsesMasterKey, master.to_vault_key())),
            Some(secret) => {
                if secret.is_empty() {
                    return Err(VaultError::InvalidInput(
                        "collection secret cannot be empty".into(),
                    ));
                }
                let salt = generate_salt(&self.rng)?;
                let verifier = hash_password(secret.clone(), &salt, &self.kdf)?;
                let key = derive_key(secret, &salt, &self.kdf)?;
                let descriptor = VaultKeyDescriptor::HasOwnSecret {
                    salt: salt.to_vec(),
                    verifier: verifier.to_vec(),
                    kdf: self.kdf,
                };
                Ok((descriptor, key))
            }
        }
    }

    /// Resolve the key for a collection in state `descriptor`.
    ///
    /// `UsesMasterKey` returns the master key and ignores `supplied`.
    /// `HasOwnSecret` requires a secret matching the stored verifier;
    /// a missing or wrong secret is `AuthFailed`.
    pub fn resolve(
        &self,
        descriptor: &VaultKeyDescriptor,
        master: &MasterKey,
        supplied: Option<Password>,
    ) -> Result<VaultKey> {
        match descriptor {
            VaultKeyDescriptor::UsesMasterKey => Ok(master.to_vault_key()),
            VaultKeyDescriptor::HasOwnSecret {
                salt,
                verifier,
                kdf: params,
            } => {
                let secret = supplied.ok_or(VaultError::AuthFailed)?;
                kdf::unlock(secret, salt, verifier, params)
            }
        }
    }

    // ------------------------------------------------------------------
    // Store-level operations
    // ------------------------------------------------------------------

    /// Create a collection, optionally protected by its own secret.
    pub fn create_collection<S: RecordStore>(
        &self,
        store: &mut S,
        name: &str,
        kind: CollectionKind,
        secret: Option<Password>,
        master: &MasterKey,
    ) -> Result<Collection> {
        validate_collection_name(name)?;
        if store.get_collection(name)?.is_some() {
            return Err(VaultError::AlreadyExists(format!("collection '{name}'")));
        }

        let mut collection = Collection::new(name, kind);
        let (descriptor, _key) = self.new_descriptor(secret, master)?;
        collection.descriptor = descriptor;
        store.save_collection(&collection)?;

        info!(
            collection = %name,
            own_secret = collection.descriptor.has_separate_secret(),
            "collection created"
        );
        Ok(collection)
    }

    /// Move a collection to `HasOwnSecret` (`Some`) or back to
    /// `UsesMasterKey` (`None`).
    ///
    /// Only the descriptor changes; payloads sealed under the previous key
    /// are not touched.  `Vault::set_collection_secret` also re-seals.
    pub fn set_secret<S: RecordStore>(
        &self,
        store: &mut S,
        name: &str,
        secret: Option<Password>,
        master: &MasterKey,
    ) -> Result<Collection> {
        let mut collection = store
            .get_collection(name)?
            .ok_or_else(|| VaultError::NotFound(format!("collection '{name}'")))?;

        let (descriptor, _key) = self.new_descriptor(secret, master)?;
        collection.descriptor = descriptor;
        store.save_collection(&collection)?;

        info!(
            collection = %name,
            own_secret = collection.descriptor.has_separate_secret(),
            "collection secret updated"
        );
        Ok(collection)
    }

    /// Resolve the key protecting collection `name`.
    ///
    /// An unknown collection is reported exactly like a wrong secret.
    pub fn resolve_key<S: RecordStore>(
        &self,
        store: &S,
        name: &str,
        master: &MasterKey,
        supplied: Option<Password>,
    ) -> Result<VaultKey> {
        let collection = store.get_collection(name)?.ok_or(VaultError::AuthFailed)?;
        let key = self.resolve(&collection.descriptor, master, supplied)?;
        debug!(collection = %name, "collection key resolved");
        Ok(key)
    }

    pub fn has_separate_secret<S: RecordStore>(&self, store: &S, name: &str) -> Result<bool> {
        store
            .get_collection(name)?
            .map(|c| c.descriptor.has_separate_secret())
            .ok_or_else(|| VaultError::NotFound(format!("collection '{name}'")))
    }
}

/// Collection names: 1..=64 chars, no path separators or control chars.
pub fn validate_collection_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(VaultError::InvalidInput(
            "collection name cannot be empty".into(),
        ));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(VaultError::InvalidInput(format!(
            "collection name cannot exceed {MAX_NAME_LEN} characters"
        )));
    }
    if name.chars().any(|c| c == '/' || c == '\\' || c.is_control()) {
        return Err(VaultError::InvalidInput(format!(
            "collection name '{name}' contains invalid characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::kdf::MIN_ITERATIONS;

    fn hierarchy() -> KeyHierarchy {
        KeyHierarchy::new(
            SecureRandom::new().unwrap(),
            KdfParams {
                iterations: MIN_ITERATIONS,
            },
        )
    }

    #[test]
    fn master_state_ignores_supplied_secret() {
        let h = hierarchy();
        let master = MasterKey::new([3u8; 32]);
        let key = h
            .resolve(&VaultKeyDescriptor::UsesMasterKey, &master, Some("anything".into()))
            .unwrap();
        assert_eq!(&key, master.key());
    }

    #[test]
    fn own_secret_requires_the_right_secret() {
        let h = hierarchy();
        let master = MasterKey::new([3u8; 32]);
        let (desc, key) = h.new_descriptor(Some("vaultPass1".into()), &master).unwrap();

        assert!(matches!(h.resolve(&desc, &master, None), Err(VaultError::AuthFailed)));
        assert!(matches!(
            h.resolve(&desc, &master, Some("wrong".into())),
            Err(VaultError::AuthFailed)
        ));
        let resolved = h.resolve(&desc, &master, Some("vaultPass1".into())).unwrap();
        assert_eq!(resolved, key);
        assert_ne!(&resolved, master.key());
    }

    #[test]
    fn empty_secret_is_invalid() {
        let h = hierarchy();
        let master = MasterKey::new([3u8; 32]);
        assert!(matches!(
            h.new_descriptor(Some("".into()), &master),
            Err(VaultError::InvalidInput(_))
        ));
    }

    #[test]
    fn collection_names_are_validated() {
        assert!(validate_collection_name("Documents").is_ok());
        assert!(validate_collection_name("  ").is_err());
        assert!(validate_collection_name("a/b").is_err());
        assert!(validate_collection_name(&"x".repeat(65)).is_err());
    }
}
