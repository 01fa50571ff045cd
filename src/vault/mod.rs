//! Vault key hierarchy and session.
//!
//! This module provides:
//! - Master credential create / verify / derive (`master`)
//! - Per-collection key resolution (`hierarchy`)
//! - The `Vault` session facade used by the CLI (`session`)

pub mod hierarchy;
pub mod master;
pub mod session;

pub use hierarchy::KeyHierarchy;
pub use master::{
    create_master_credential, derive_master_key, renew_master_credential, verify_master_password,
};
pub use session::Vault;
