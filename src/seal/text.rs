//! UTF-8 text payloads: credential passwords and note bodies.

use zeroize::Zeroizing;

use super::Sealer;
use crate::crypto::{decrypt, encrypt, Envelope, SecureRandom, VaultKey};
use crate::errors::{Result, VaultError};

#[derive(Debug, Clone, Copy)]
pub struct TextSealer {
    rng: SecureRandom,
}

impl TextSealer {
    pub fn new(rng: SecureRandom) -> Self {
        Self { rng }
    }
}

impl Sealer for TextSealer {
    type Value = str;
    type Opened = Zeroizing<String>;
    type Sealed = Envelope;

    fn seal(&self, value: &str, key: &VaultKey) -> Result<Envelope> {
        encrypt(&self.rng, key, value.as_bytes())
    }

    fn open(&self, sealed: &Envelope, key: &VaultKey) -> Result<Zeroizing<String>> {
        let mut plain = decrypt(key, sealed)?;
        // A lucky padding match under the wrong key yields random bytes,
        // which are almost never valid UTF-8.
        let bytes = std::mem::take(&mut *plain);
        match String::from_utf8(bytes) {
            Ok(text) => Ok(Zeroizing::new(text)),
            Err(e) => {
                drop(Zeroizing::new(e.into_bytes()));
                Err(VaultError::DecryptionFailed)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opens_what_it_sealed() {
        let sealer = TextSealer::new(SecureRandom::new().unwrap());
        let key = VaultKey::new([9u8; 32]);
        let env = sealer.seal("hunter2", &key).unwrap();
        assert_eq!(sealer.open(&env, &key).unwrap().as_str(), "hunter2");
    }

    #[test]
    fn non_utf8_plaintext_is_a_decryption_failure() {
        let rng = SecureRandom::new().unwrap();
        let key = VaultKey::new([9u8; 32]);
        let env = encrypt(&rng, &key, &[0xff, 0xfe, 0x80]).unwrap();
        let sealer = TextSealer::new(rng);
        assert!(matches!(sealer.open(&env, &key), Err(VaultError::DecryptionFailed)));
    }
}
