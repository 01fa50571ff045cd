//! File payloads: envelope plus a SHA-256 tag over the plaintext.

use zeroize::Zeroizing;

use super::Sealer;
use crate::crypto::{decrypt, encrypt, Envelope, IntegrityTag, SecureRandom, VaultKey};
use crate::errors::Result;

/// A sealed file: the encrypted payload and the tag of its plaintext.
#[derive(Debug, Clone)]
pub struct SealedFile {
    pub envelope: Envelope,
    pub tag: IntegrityTag,
}

#[derive(Debug, Clone, Copy)]
pub struct FileSealer {
    rng: SecureRandom,
}

impl FileSealer {
    pub fn new(rng: SecureRandom) -> Self {
        Self { rng }
    }

    /// Like `open`, naming `subject` (a file id or name) in an integrity
    /// failure.
    pub fn open_as(
        &self,
        sealed: &SealedFile,
        key: &VaultKey,
        subject: &str,
    ) -> Result<Zeroizing<Vec<u8>>> {
        let plain = decrypt(key, &sealed.envelope)?;
        sealed.tag.verify(&plain, subject)?;
        Ok(plain)
    }
}

impl Sealer for FileSealer {
    type Value = [u8];
    type Opened = Zeroizing<Vec<u8>>;
    type Sealed = SealedFile;

    fn seal(&self, value: &[u8], key: &VaultKey) -> Result<SealedFile> {
        let tag = IntegrityTag::compute(value);
        let envelope = encrypt(&self.rng, key, value)?;
        Ok(SealedFile { envelope, tag })
    }

    fn open(&self, sealed: &SealedFile, key: &VaultKey) -> Result<Zeroizing<Vec<u8>>> {
        self.open_as(sealed, key, "file payload")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::VaultError;

    #[test]
    fn tag_is_over_plaintext() {
        let sealer = FileSealer::new(SecureRandom::new().unwrap());
        let key = VaultKey::new([7u8; 32]);
        let sealed = sealer.seal(b"%PDF-1.7 ...", &key).unwrap();
        assert_eq!(sealed.tag, IntegrityTag::compute(b"%PDF-1.7 ..."));
        assert_eq!(&*sealer.open(&sealed, &key).unwrap(), b"%PDF-1.7 ...");
    }

    #[test]
    fn swapped_tag_is_an_integrity_failure() {
        let sealer = FileSealer::new(SecureRandom::new().unwrap());
        let key = VaultKey::new([7u8; 32]);
        let a = sealer.seal(b"first file", &key).unwrap();
        let b = sealer.seal(b"second file", &key).unwrap();

        let mixed = SealedFile {
            envelope: a.envelope,
            tag: b.tag,
        };
        assert!(matches!(
            sealer.open_as(&mixed, &key, "file 3"),
            Err(VaultError::IntegrityFailed(s)) if s == "file 3"
        ));
    }
}
