//! PassVault: a local-only vault for passwords, secure notes, identity
//! cards and files.
//!
//! Secrets are sealed with AES-256-CBC under keys derived by
//! PBKDF2-HMAC-SHA256.  Collections of files may carry their own secret
//! instead of the master key, and the whole store can be backed up into
//! checksummed, encrypted artifacts.

#[cfg(feature = "audit-log")]
pub mod audit;
pub mod backup;
pub mod cli;
pub mod config;
pub mod crypto;
pub mod errors;
pub mod model;
pub mod seal;
pub mod store;
pub mod vault;

pub use errors::{ErrorClass, Result, StoreError, VaultError};
pub use vault::Vault;
