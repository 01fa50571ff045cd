//! Raw byte payloads without an integrity tag (identity-card photos).

use zeroize::Zeroizing;

use super::Sealer;
use crate::crypto::{decrypt, encrypt, Envelope, SecureRandom, VaultKey};
use crate::errors::Result;

#[derive(Debug, Clone, Copy)]
pub struct BytesSealer {
    rng: SecureRandom,
}

impl BytesSealer {
    pub fn new(rng: SecureRandom) -> Self {
        Self { rng }
    }
}

impl Sealer for BytesSealer {
    type Value = [u8];
    type Opened = Zeroizing<Vec<u8>>;
    type Sealed = Envelope;

    fn seal(&self, value: &[u8], key: &VaultKey) -> Result<Envelope> {
        encrypt(&self.rng, key, value)
    }

    fn open(&self, sealed: &Envelope, key: &VaultKey) -> Result<Zeroizing<Vec<u8>>> {
        decrypt(key, sealed)
    }
}
