//! Secure random source.
//!
//! `SecureRandom` is constructed once at startup and handed to every
//! component that needs randomness (salts, IVs, blob names).  It wraps the
//! operating-system CSPRNG, holds no mutable state, and is `Send + Sync`,
//! so concurrent callers can share one instance by reference.

use rand::rngs::OsRng;
use rand::TryRngCore;
use uuid::{Builder, Uuid};

use crate::errors::{Result, VaultError};

/// Handle to the operating-system cryptographic random generator.
#[derive(Debug, Clone, Copy)]
pub struct SecureRandom {
    _private: (),
}

impl SecureRandom {
    /// Draw one byte from the OS generator and return a handle to it.
    ///
    /// An unavailable generator is a fatal configuration error.
    pub fn new() -> Result<Self> {
        let rng = Self { _private: () };
        let mut first = [0u8; 1];
        rng.fill(&mut first)?;
        Ok(rng)
    }

    /// Fill `buf` with cryptographically secure random bytes.
    pub fn fill(&self, buf: &mut [u8]) -> Result<()> {
        OsRng.try_fill_bytes(buf).map_err(|e| {
            VaultError::Configuration(format!("OS random source unavailable: {e}"))
        })
    }

    /// Return `N` fresh random bytes.
    pub fn array<const N: usize>(&self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        self.fill(&mut out)?;
        Ok(out)
    }

    /// A random (version 4) UUID drawn from this generator.
    pub fn uuid(&self) -> Result<Uuid> {
        Ok(Builder::from_random_bytes(self.array()?).into_uuid())
    }
}
