//! AES-256-CBC envelope encryption.
//!
//! Each call to `encrypt` draws a fresh random 16-byte IV and runs
//! AES-256 in CBC mode with PKCS#7 padding.  `decrypt` splits the IV back
//! out before decrypting and rejects bad padding instead of returning
//! partial data.
//!
//! Layout of a single-blob envelope (fixed, versionless):
//!   [ 16-byte IV | AES-CBC ciphertext (multiple of 16 bytes) ]

use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use zeroize::Zeroizing;

use super::keys::VaultKey;
use super::random::SecureRandom;
use crate::errors::{Result, VaultError};

/// Size of the CBC initialization vector in bytes.
pub const IV_LEN: usize = 16;

/// AES block size in bytes.
const BLOCK_LEN: usize = 16;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// An encrypted payload: IV plus ciphertext.
///
/// Immutable once built; editing a value means sealing a new envelope.
#[derive(Clone, PartialEq, Eq)]
pub struct Envelope {
    iv: [u8; IV_LEN],
    ciphertext: Vec<u8>,
}

impl Envelope {
    /// Rebuild an envelope stored as two separate fields.
    pub fn from_parts(iv: &[u8], ciphertext: Vec<u8>) -> Result<Self> {
        let iv: [u8; IV_LEN] = iv.try_into().map_err(|_| VaultError::DecryptionFailed)?;
        Self::check_ciphertext_len(&ciphertext)?;
        Ok(Self { iv, ciphertext })
    }

    /// Parse a single `iv || ciphertext` blob.
    pub fn from_bytes(blob: &[u8]) -> Result<Self> {
        if blob.len() < IV_LEN + BLOCK_LEN {
            return Err(VaultError::DecryptionFailed);
        }
        let (iv, ciphertext) = blob.split_at(IV_LEN);
        Self::from_parts(iv, ciphertext.to_vec())
    }

    /// Serialize as a single `iv || ciphertext` blob.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(IV_LEN + self.ciphertext.len());
        out.extend_from_slice(&self.iv);
        out.extend_from_slice(&self.ciphertext);
        out
    }

    pub fn iv(&self) -> &[u8; IV_LEN] {
        &self.iv
    }

    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    /// Total size of the envelope in bytes.
    pub fn len(&self) -> usize {
        IV_LEN + self.ciphertext.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    fn check_ciphertext_len(ciphertext: &[u8]) -> Result<()> {
        if ciphertext.is_empty() || ciphertext.len() % BLOCK_LEN != 0 {
            return Err(VaultError::DecryptionFailed);
        }
        Ok(())
    }
}

impl std::fmt::Debug for Envelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Envelope")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

/// Encrypt `plaintext` under `key` with a fresh random IV.
pub fn encrypt(rng: &SecureRandom, key: &VaultKey, plaintext: &[u8]) -> Result<Envelope> {
    let iv: [u8; IV_LEN] = rng.array()?;

    let cipher = Aes256CbcEnc::new_from_slices(key.as_bytes(), &iv)
        .map_err(|e| VaultError::Configuration(format!("AES-256-CBC init failed: {e}")))?;

    let ciphertext = cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext);

    Ok(Envelope { iv, ciphertext })
}

/// Decrypt an envelope produced by `encrypt`.
///
/// Wrong key, corrupted ciphertext, and invalid padding all surface as
/// `DecryptionFailed`.
pub fn decrypt(key: &VaultKey, envelope: &Envelope) -> Result<Zeroizing<Vec<u8>>> {
    let cipher = Aes256CbcDec::new_from_slices(key.as_bytes(), &envelope.iv)
        .map_err(|e| VaultError::Configuration(format!("AES-256-CBC init failed: {e}")))?;

    let plaintext = cipher
        .decrypt_padded_vec_mut::<Pkcs7>(&envelope.ciphertext)
        .map_err(|_| VaultError::DecryptionFailed)?;

    Ok(Zeroizing::new(plaintext))
}
