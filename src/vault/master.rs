//! Master credential: create, verify, derive.
//!
//! The stored credential holds only the salt, the verifier and the work
//! factor.  The master key is derived on demand and lives in the session.

use chrono::Utc;

use crate::crypto::{generate_salt, hash_password, kdf, KdfParams, MasterKey, Password, SecureRandom};
use crate::errors::Result;
use crate::model::MasterCredential;

/// Build a new master credential for `password`.
pub fn create_master_credential(
    rng: &SecureRandom,
    password: Password,
    params: &KdfParams,
) -> Result<MasterCredential> {
    let salt = generate_salt(rng)?;
    let verifier = hash_password(password, &salt, params)?;
    let now = Utc::now();
    Ok(MasterCredential {
        salt: salt.to_vec(),
        verifier: verifier.to_vec(),
        kdf: *params,
        created_at: now,
        updated_at: now,
    })
}

/// Replace the salt and verifier of `current` for a new password.
///
/// Keeps the original creation time.
pub fn renew_master_credential(
    rng: &SecureRandom,
    current: &MasterCredential,
    new_password: Password,
    params: &KdfParams,
) -> Result<MasterCredential> {
    let mut renewed = create_master_credential(rng, new_password, params)?;
    renewed.created_at = current.created_at;
    Ok(renewed)
}

/// Check `password` against the stored verifier in constant time.
pub fn verify_master_password(password: Password, credential: &MasterCredential) -> Result<bool> {
    kdf::verify_password(password, &credential.salt, &credential.verifier, &credential.kdf)
}

/// Verify `password`, then derive the master key from it.
///
/// A wrong password is `AuthFailed`.
pub fn derive_master_key(password: Password, credential: &MasterCredential) -> Result<MasterKey> {
    let key = kdf::unlock(password, &credential.salt, &credential.verifier, &credential.kdf)?;
    Ok(MasterKey::from(key))
}
