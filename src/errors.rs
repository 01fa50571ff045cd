use thiserror::Error;

/// Failures raised by a record or blob store collaborator.
///
/// The core never inspects these beyond classifying them as fatal; they
/// are wrapped in [`VaultError::Store`] and handed to the caller as-is.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store document is malformed: {0}")]
    Malformed(String),

    #[error("store backend error: {0}")]
    Backend(String),
}

/// All errors that can occur in PassVault.
///
/// None of the messages ever carry plaintext, keys, or passwords; only
/// identifiers (record ids, collection names, backup names).
#[derive(Debug, Error)]
pub enum VaultError {
    // --- Expected domain outcomes ---
    /// Wrong master or collection password.  Deliberately the same message
    /// whether the collection exists or not.
    #[error("Authentication failed: wrong password or unknown vault")]
    AuthFailed,

    #[error("Vault is locked: unlock it with the master password first")]
    Locked,

    #[error("Decryption failed: wrong key or corrupted data")]
    DecryptionFailed,

    #[error("Integrity check failed for {0}: data is corrupted or mismatched")]
    IntegrityFailed(String),

    #[error("Decrypted payload has an unexpected shape: {0}")]
    Deserialization(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0} already exists")]
    AlreadyExists(String),

    // --- Infrastructure failures ---
    #[error("Crypto configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Config file error: {0}")]
    Config(String),

    #[error("Audit error: {0}")]
    Audit(String),

    #[error("Background task failed: {0}")]
    Task(String),

    // --- CLI errors ---
    #[error("Command failed: {0}")]
    CommandFailed(String),
}

/// Which channel an error belongs to.
///
/// `Rejected` outcomes are normal answers to a request (wrong password,
/// tampered artifact, unknown id).  `Fatal` outcomes mean the environment
/// is broken (missing crypto provider, disk failure) and retrying the same
/// request will not help.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Rejected,
    Fatal,
}

impl VaultError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::AuthFailed
            | Self::Locked
            | Self::DecryptionFailed
            | Self::IntegrityFailed(_)
            | Self::Deserialization(_)
            | Self::InvalidInput(_)
            | Self::NotFound(_)
            | Self::AlreadyExists(_)
            | Self::CommandFailed(_) => ErrorClass::Rejected,
            Self::Configuration(_)
            | Self::Store(_)
            | Self::Io(_)
            | Self::Serialization(_)
            | Self::Config(_)
            | Self::Audit(_)
            | Self::Task(_) => ErrorClass::Fatal,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.class() == ErrorClass::Fatal
    }
}

/// Convenience type alias for PassVault results.
pub type Result<T> = std::result::Result<T, VaultError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrong_password_is_not_fatal() {
        assert_eq!(VaultError::AuthFailed.class(), ErrorClass::Rejected);
        assert!(!VaultError::DecryptionFailed.is_fatal());
        assert!(!VaultError::IntegrityFailed("backup".into()).is_fatal());
    }

    #[test]
    fn infrastructure_errors_are_fatal() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk gone");
        assert!(VaultError::Store(StoreError::Io(io)).is_fatal());
        assert!(VaultError::Configuration("no rng".into()).is_fatal());
    }

    #[test]
    fn auth_message_does_not_reveal_existence() {
        let msg = VaultError::AuthFailed.to_string();
        assert!(msg.contains("wrong password or unknown vault"));
    }

    #[test]
    fn messages_are_plain_ascii_punctuation() {
        let errors = [
            VaultError::AuthFailed,
            VaultError::Locked,
            VaultError::DecryptionFailed,
            VaultError::IntegrityFailed("backup 1".into()),
        ];
        for err in errors {
            let msg = err.to_string();
            assert!(msg.is_ascii(), "{msg}");
            assert!(msg.contains(": "), "{msg}");
        }
    }
}
