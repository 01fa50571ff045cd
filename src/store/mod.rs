//! Persistence collaborators.
//!
//! The core consumes two interfaces and never implements storage logic
//! itself:
//! - [`RecordStore`]: typed tables of records plus the master credential
//!   and collection descriptors.
//! - [`BlobStore`]: named opaque byte payloads (encrypted files).
//!
//! `FileRecordStore` and `FsBlobStore` are the bundled implementations,
//! laid out on disk by [`VaultLayout`].

pub mod blob;
pub mod document;

use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::StoreError;
use crate::model::{Collection, MasterCredential, Record};

pub use blob::FsBlobStore;
pub use document::FileRecordStore;

/// Result type for collaborator calls.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Record persistence used by the core.
///
/// `put` with a record whose id is `0` inserts it under a fresh id and
/// returns the stored copy; any other id replaces the existing record.
pub trait RecordStore {
    fn get<R: Record>(&self, id: u64) -> StoreResult<Option<R>>;
    fn put<R: Record>(&mut self, record: R) -> StoreResult<R>;
    fn delete<R: Record>(&mut self, id: u64) -> StoreResult<bool>;
    fn list<R: Record>(&self) -> StoreResult<Vec<R>>;

    fn master_credential(&self) -> StoreResult<Option<MasterCredential>>;
    fn save_master_credential(&mut self, credential: &MasterCredential) -> StoreResult<()>;

    fn list_collections(&self) -> StoreResult<Vec<Collection>>;
    fn get_collection(&self, name: &str) -> StoreResult<Option<Collection>>;
    fn save_collection(&mut self, collection: &Collection) -> StoreResult<()>;

    /// Start grouping writes; nothing is persisted until `commit_batch`.
    fn begin_batch(&mut self) {}

    fn commit_batch(&mut self) -> StoreResult<()> {
        Ok(())
    }

    /// Drop every write since `begin_batch`.
    fn abort_batch(&mut self) -> StoreResult<()> {
        Ok(())
    }
}

/// Opaque payload persistence keyed by generated names.
pub trait BlobStore {
    fn write(&mut self, name: &str, bytes: &[u8]) -> StoreResult<()>;
    fn read(&self, name: &str) -> StoreResult<Vec<u8>>;
    fn delete(&mut self, name: &str) -> StoreResult<bool>;
    fn list(&self) -> StoreResult<Vec<String>>;
}

/// On-disk layout of a vault directory.
///
/// ```text
/// <root>/
///   store/                  live store (swapped as a whole on restore)
///     vault.json            record document
///     blobs/<name>          encrypted payloads
///   store.restore-staging/  restore in progress
///   store.before_restore/   previous live store after a restore
///   backups/                artifacts + catalog.json
///   audit.db                operation log
/// ```
#[derive(Debug, Clone)]
pub struct VaultLayout {
    root: PathBuf,
}

impl VaultLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn store_dir(&self) -> PathBuf {
        self.root.join("store")
    }

    pub fn document_path(&self) -> PathBuf {
        Self::document_in(&self.store_dir())
    }

    pub fn blobs_dir(&self) -> PathBuf {
        Self::blobs_in(&self.store_dir())
    }

    pub fn staging_dir(&self) -> PathBuf {
        self.root.join("store.restore-staging")
    }

    pub fn before_restore_dir(&self) -> PathBuf {
        self.root.join("store.before_restore")
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.root.join("backups")
    }

    pub fn audit_db(&self) -> PathBuf {
        self.root.join("audit.db")
    }

    /// Whether a vault has been initialized here.
    pub fn exists(&self) -> bool {
        self.document_path().exists()
    }

    pub(crate) fn document_in(store_dir: &Path) -> PathBuf {
        store_dir.join("vault.json")
    }

    pub(crate) fn blobs_in(store_dir: &Path) -> PathBuf {
        store_dir.join("blobs")
    }
}

/// Write `bytes` to `path` **atomically**.
///
/// Writes to a temp file in the same directory, then renames it over the
/// target, so readers never see a half-written file.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let parent = path.parent().unwrap_or(Path::new("."));
    let tmp_path = parent.join(format!(
        ".{}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy()
    ));

    fs::write(&tmp_path, bytes)?;
    restrict_permissions(&tmp_path);
    fs::rename(&tmp_path, path)
}

/// Owner-only permissions on Unix; best effort.
pub(crate) fn restrict_permissions(path: &Path) {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let _ = fs::set_permissions(path, fs::Permissions::from_mode(0o600));
    }
    #[cfg(not(unix))]
    let _ = path;
}
