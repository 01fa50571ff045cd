//! Zeroizing wrappers for passwords and symmetric keys.
//!
//! Every type here wipes its bytes when dropped.  Functions that accept a
//! `Password` take it by value, so the buffer is destroyed on every
//! return path (success or error) of the callee.

use std::fmt;

use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Length of every symmetric key in bytes (256 bits, for AES-256).
pub const KEY_LEN: usize = 32;

/// A user-supplied password or collection secret.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Password(Vec<u8>);

impl Password {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Access the raw password bytes (e.g. to feed PBKDF2).
    pub fn expose(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl From<&str> for Password {
    fn from(s: &str) -> Self {
        Self(s.as_bytes().to_vec())
    }
}

impl From<String> for Password {
    fn from(s: String) -> Self {
        Self(s.into_bytes())
    }
}

impl From<Zeroizing<String>> for Password {
    fn from(mut s: Zeroizing<String>) -> Self {
        Self(std::mem::take(&mut *s).into_bytes())
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password([REDACTED])")
    }
}

/// A 256-bit symmetric key that protects one collection's envelopes.
///
/// Equality is constant-time.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct VaultKey {
    bytes: [u8; KEY_LEN],
}

impl VaultKey {
    pub fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self { bytes }
    }

    /// Access the raw key bytes (e.g. to build a block cipher).
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }
}

impl PartialEq for VaultKey {
    fn eq(&self, other: &Self) -> bool {
        self.bytes.ct_eq(&other.bytes).into()
    }
}

impl Eq for VaultKey {}

impl fmt::Debug for VaultKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("VaultKey([REDACTED])")
    }
}

/// The session's master key, derived once at login.
///
/// Owned by the unlocked `Vault`; dropping it (logout, timeout) zeroes
/// the key material.  Clones (handed to background backup tasks) are
/// zeroed independently.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct MasterKey {
    key: VaultKey,
}

impl MasterKey {
    pub fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self {
            key: VaultKey::new(bytes),
        }
    }

    /// Borrow the master key as the key for master-protected collections.
    pub fn key(&self) -> &VaultKey {
        &self.key
    }

    /// Copy the master key into a caller-scoped `VaultKey`.
    pub fn to_vault_key(&self) -> VaultKey {
        self.key.clone()
    }
}

impl From<VaultKey> for MasterKey {
    fn from(key: VaultKey) -> Self {
        Self { key }
    }
}

impl fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MasterKey([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_is_redacted() {
        let pw = Password::from("hunter2");
        let key = MasterKey::new([7u8; KEY_LEN]);
        assert!(!format!("{pw:?}").contains("hunter2"));
        assert_eq!(format!("{key:?}"), "MasterKey([REDACTED])");
    }

    #[test]
    fn master_key_copies_compare_equal() {
        let master = MasterKey::new([0x42u8; KEY_LEN]);
        assert_eq!(master.to_vault_key(), *master.key());
        assert_ne!(master.to_vault_key(), VaultKey::new([0x43u8; KEY_LEN]));
    }

    #[test]
    fn password_from_zeroizing_string() {
        let pw = Password::from(Zeroizing::new("s3cret".to_string()));
        assert_eq!(pw.expose(), b"s3cret");
        assert_eq!(pw.len(), 6);
    }
}
