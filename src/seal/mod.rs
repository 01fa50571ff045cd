//! Per-entity encryption adapters.
//!
//! Every adapter turns one kind of domain value into an envelope and back
//! under an already-resolved key.  The contract is uniform:
//! - `seal` always draws a fresh IV, so sealing the same value twice
//!   yields two different envelopes;
//! - `open` fails with `DecryptionFailed` on a wrong key or corrupt
//!   envelope, and with `Deserialization` when the plaintext does not have
//!   the expected shape;
//! - file payloads also carry an `IntegrityTag` over the plaintext, and a
//!   mismatch after decryption is an `IntegrityFailed`.
//!
//! Adapters never log and never put plaintext in error messages.

pub mod bytes;
pub mod card;
pub mod file;
pub mod text;

use crate::crypto::VaultKey;
use crate::errors::Result;

pub use bytes::BytesSealer;
pub use card::CardSealer;
pub use file::{FileSealer, SealedFile};
pub use text::TextSealer;

/// Seals credential passwords.
pub type PasswordSealer = TextSealer;

/// Seals secure-note bodies.
pub type NoteSealer = TextSealer;

/// Applies the envelope to one kind of domain value.
pub trait Sealer {
    /// What the caller hands in to be sealed.
    type Value: ?Sized;
    /// What `open` hands back; wiped on drop where it holds secrets.
    type Opened;
    /// The stored form.
    type Sealed;

    fn seal(&self, value: &Self::Value, key: &VaultKey) -> Result<Self::Sealed>;

    fn open(&self, sealed: &Self::Sealed, key: &VaultKey) -> Result<Self::Opened>;
}
