//! Cryptographic primitives for PassVault.
//!
//! This module provides:
//! - An injected, thread-safe secure random source (`random`)
//! - PBKDF2-HMAC-SHA256 key derivation and password verifiers (`kdf`)
//! - Zeroizing password and key wrappers (`keys`)
//! - The AES-256-CBC `iv || ciphertext` envelope (`envelope`)
//! - SHA-256 integrity tags for files and backup artifacts (`integrity`)

pub mod envelope;
pub mod integrity;
pub mod kdf;
pub mod keys;
pub mod random;

// Re-export the most commonly used items so callers can write:
//   use crate::crypto::{encrypt, decrypt, Envelope, Password, ...};
pub use envelope::{decrypt, encrypt, Envelope, IV_LEN};
pub use integrity::IntegrityTag;
pub use kdf::{derive_key, generate_salt, hash_password, unlock, verify_password, KdfParams};
pub use keys::{MasterKey, Password, VaultKey};
pub use random::SecureRandom;
