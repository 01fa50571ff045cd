//! Metadata for encrypted file payloads kept in the blob store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{base64_decode, base64_encode, Record};
use crate::crypto::IntegrityTag;

/// A file stored in a collection.
///
/// The payload lives in the blob store under `blob_name` as a single
/// `iv || ciphertext` blob; `checksum` is taken over the plaintext.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptedFile {
    pub id: u64,
    pub collection: String,
    pub original_name: String,
    pub blob_name: String,
    pub original_size: u64,
    pub encrypted_size: u64,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub iv: Vec<u8>,
    pub checksum: IntegrityTag,
    pub uploaded_at: DateTime<Utc>,
    #[serde(default)]
    pub last_accessed: Option<DateTime<Utc>>,
}

impl Record for EncryptedFile {
    const TABLE: &'static str = "files";

    fn id(&self) -> u64 {
        self.id
    }

    fn assign_id(&mut self, id: u64) {
        self.id = id;
    }
}

/// A file attached to a secure note.  Always sealed under the master key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteAttachment {
    pub id: u64,
    pub note_id: u64,
    pub original_name: String,
    pub blob_name: String,
    pub size: u64,
    #[serde(default)]
    pub mime_type: Option<String>,
    pub checksum: IntegrityTag,
    pub uploaded_at: DateTime<Utc>,
}

impl Record for NoteAttachment {
    const TABLE: &'static str = "note_attachments";

    fn id(&self) -> u64 {
        self.id
    }

    fn assign_id(&mut self, id: u64) {
        self.id = id;
    }
}

/// Guess a MIME type from a file name's extension.
pub fn guess_mime_type(name: &str) -> Option<String> {
    let ext = name.rsplit_once('.')?.1.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "md" => "text/markdown",
        "json" => "application/json",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "zip" => "application/zip",
        _ => return None,
    };
    Some(mime.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_from_extension() {
        assert_eq!(guess_mime_type("scan.PDF").as_deref(), Some("application/pdf"));
        assert_eq!(guess_mime_type("photo.jpeg").as_deref(), Some("image/jpeg"));
        assert_eq!(guess_mime_type("noext"), None);
        assert_eq!(guess_mime_type("archive.xyz"), None);
    }
}
