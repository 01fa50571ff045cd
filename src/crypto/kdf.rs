//! Password-based key derivation using PBKDF2-HMAC-SHA256.
//!
//! Two outputs come from the same function at the same cost:
//! - a **key**, used directly as an AES-256 key and never stored;
//! - a **verifier**, stored so a password can be checked later.
//!
//! The salt is prefixed with a distinct label for each purpose, so the
//! verifier kept on disk is never equal to the key derived from the same
//! password and salt.

use hmac::Hmac;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use super::keys::{Password, VaultKey, KEY_LEN};
use super::random::SecureRandom;
use crate::errors::{Result, VaultError};

/// Length of the salt in bytes (256 bits).
pub const SALT_LEN: usize = 32;

/// Length of a stored verifier in bytes.
pub const VERIFIER_LEN: usize = 32;

/// Default PBKDF2 iteration count.
pub const DEFAULT_ITERATIONS: u32 = 100_000;

/// Minimum accepted iteration count.
pub const MIN_ITERATIONS: u32 = 10_000;

const KEY_LABEL: &[u8] = b"passvault/key/";
const VERIFIER_LABEL: &[u8] = b"passvault/verifier/";

/// PBKDF2 work factor.
///
/// Stored next to every salt/verifier pair so a later change of the
/// default never breaks existing credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    pub iterations: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
        }
    }
}

/// Derive a 32-byte symmetric key from `password` and `salt`.
///
/// The same password + salt + params always produce the same key.
pub fn derive_key(password: Password, salt: &[u8], params: &KdfParams) -> Result<VaultKey> {
    let out = pbkdf2_sha256(password.expose(), KEY_LABEL, salt, params)?;
    Ok(VaultKey::new(*out))
}

/// Compute the storage-safe verifier for `password` and `salt`.
pub fn hash_password(
    password: Password,
    salt: &[u8],
    params: &KdfParams,
) -> Result<[u8; VERIFIER_LEN]> {
    let out = pbkdf2_sha256(password.expose(), VERIFIER_LABEL, salt, params)?;
    Ok(*out)
}

/// Recompute the verifier and compare it with `expected` in constant time.
pub fn verify_password(
    password: Password,
    salt: &[u8],
    expected: &[u8],
    params: &KdfParams,
) -> Result<bool> {
    let actual = pbkdf2_sha256(password.expose(), VERIFIER_LABEL, salt, params)?;
    Ok(actual.as_slice().ct_eq(expected).into())
}

/// Verify `password` against a stored verifier and, on success, derive
/// the matching key.
///
/// A mismatch is reported as `AuthFailed`.
pub fn unlock(
    password: Password,
    salt: &[u8],
    expected: &[u8],
    params: &KdfParams,
) -> Result<VaultKey> {
    let actual = pbkdf2_sha256(password.expose(), VERIFIER_LABEL, salt, params)?;
    if !bool::from(actual.as_slice().ct_eq(expected)) {
        return Err(VaultError::AuthFailed);
    }
    derive_key(password, salt, params)
}

/// Generate a cryptographically random 32-byte salt.
pub fn generate_salt(rng: &SecureRandom) -> Result<[u8; SALT_LEN]> {
    rng.array()
}

fn pbkdf2_sha256(
    password: &[u8],
    label: &[u8],
    salt: &[u8],
    params: &KdfParams,
) -> Result<Zeroizing<[u8; KEY_LEN]>> {
    if params.iterations < MIN_ITERATIONS {
        return Err(VaultError::Configuration(format!(
            "PBKDF2 iterations must be at least {MIN_ITERATIONS} (got {})",
            params.iterations
        )));
    }
    if salt.is_empty() {
        return Err(VaultError::Configuration("PBKDF2 salt is empty".into()));
    }

    let mut labelled_salt = Vec::with_capacity(label.len() + salt.len());
    labelled_salt.extend_from_slice(label);
    labelled_salt.extend_from_slice(salt);

    let mut out = Zeroizing::new([0u8; KEY_LEN]);
    pbkdf2::pbkdf2::<Hmac<Sha256>>(password, &labelled_salt, params.iterations, out.as_mut())
        .map_err(|e| VaultError::Configuration(format!("PBKDF2-HMAC-SHA256 unavailable: {e}")))?;

    Ok(out)
}
