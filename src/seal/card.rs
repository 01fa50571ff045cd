//! Identity-card field maps.
//!
//! Fields are serialized as a JSON object with sorted keys (`CardFields`
//! is backed by a `BTreeMap`) before sealing, so the same map always
//! produces the same plaintext.

use zeroize::Zeroizing;

use super::Sealer;
use crate::crypto::{decrypt, encrypt, Envelope, SecureRandom, VaultKey};
use crate::errors::{Result, VaultError};
use crate::model::CardFields;

#[derive(Debug, Clone, Copy)]
pub struct CardSealer {
    rng: SecureRandom,
}

impl CardSealer {
    pub fn new(rng: SecureRandom) -> Self {
        Self { rng }
    }
}

impl Sealer for CardSealer {
    type Value = CardFields;
    type Opened = CardFields;
    type Sealed = Envelope;

    fn seal(&self, value: &CardFields, key: &VaultKey) -> Result<Envelope> {
        let plain = Zeroizing::new(
            serde_json::to_vec(value)
                .map_err(|e| VaultError::Serialization(format!("card fields: {e}")))?,
        );
        encrypt(&self.rng, key, &plain)
    }

    fn open(&self, sealed: &Envelope, key: &VaultKey) -> Result<CardFields> {
        let plain = decrypt(key, sealed)?;
        serde_json::from_slice(&plain)
            .map_err(|_| VaultError::Deserialization("card fields are not a string map".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_map_roundtrips() {
        let sealer = CardSealer::new(SecureRandom::new().unwrap());
        let key = VaultKey::new([5u8; 32]);
        let fields: CardFields = [("passportNumber", "X1234567"), ("fullName", "Ada L")]
            .into_iter()
            .collect();

        let env = sealer.seal(&fields, &key).unwrap();
        assert_eq!(sealer.open(&env, &key).unwrap(), fields);
    }

    #[test]
    fn wrong_shape_is_a_deserialization_error() {
        let rng = SecureRandom::new().unwrap();
        let key = VaultKey::new([5u8; 32]);
        let env = encrypt(&rng, &key, b"[1, 2, 3]").unwrap();
        let err = CardSealer::new(rng).open(&env, &key).unwrap_err();
        assert!(matches!(err, VaultError::Deserialization(_)));
        assert!(!err.to_string().contains("[1, 2, 3]"));
    }
}
