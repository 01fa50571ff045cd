//! Backup and restore of the whole live store.
//!
//! Artifact layout (internal, not portable):
//!   [ 16-byte IV | AES-256-CBC ciphertext of the JSON snapshot ]
//!
//! The snapshot is the record document exactly as stored plus every blob.
//! The checksum is taken over the artifact bytes, so `verify` never needs
//! a key.  Restore is two-phase:
//!
//! 1. verify, decrypt and materialize the snapshot in a staging directory;
//! 2. rename live -> `store.before_restore`, then staging -> live.
//!
//! Nothing under the live store is written before step 2.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use super::catalog::{BackupCatalog, BackupKind, BackupRecord, BackupStatus};
use crate::crypto::{decrypt, encrypt, Envelope, IntegrityTag, MasterKey, SecureRandom};
use crate::errors::{Result, VaultError};
use crate::model::{base64_decode, base64_encode};
use crate::store::{write_atomic, BlobStore, FileRecordStore, FsBlobStore, VaultLayout};

/// File extension of backup artifacts.
pub const ARTIFACT_EXT: &str = "pvbak";

const SNAPSHOT_FORMAT: u8 = 1;

/// Serialized full-store snapshot (the plaintext of an artifact).
#[derive(Serialize, Deserialize)]
struct Snapshot {
    format: u8,
    created_at: DateTime<Utc>,
    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    document: Vec<u8>,
    /// blob name -> base64 payload
    blobs: BTreeMap<String, String>,
}

/// What a successful restore put back.
#[derive(Debug, Clone)]
pub struct RestoreReport {
    pub backup: String,
    pub blobs: usize,
    pub snapshot_taken_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct BackupEngine {
    layout: VaultLayout,
    rng: SecureRandom,
}

impl BackupEngine {
    pub fn new(layout: VaultLayout, rng: SecureRandom) -> Self {
        Self { layout, rng }
    }

    pub fn layout(&self) -> &VaultLayout {
        &self.layout
    }

    pub fn catalog(&self) -> Result<BackupCatalog> {
        BackupCatalog::open(&self.layout.backup_dir())
    }

    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Snapshot the live store, seal it under the master key, and record
    /// it in the catalog.
    ///
    /// The caller must not write to the store while this runs.
    pub fn create(
        &self,
        master: &MasterKey,
        description: Option<&str>,
        kind: BackupKind,
    ) -> Result<BackupRecord> {
        let created_at = Utc::now();
        let id = self.rng.uuid()?;
        let name = format!(
            "passvault_backup_{}_{}.{ARTIFACT_EXT}",
            created_at.format("%Y%m%d_%H%M%S"),
            &id.simple().to_string()[..8]
        );
        let backup_dir = self.layout.backup_dir();
        let path = backup_dir.join(&name);

        let artifact = self.seal_snapshot(master, created_at)?;
        let checksum = IntegrityTag::compute(&artifact);

        let mut record = BackupRecord {
            id: id.to_string(),
            name,
            path,
            size: artifact.len() as u64,
            checksum,
            kind,
            status: BackupStatus::Completed,
            created_at,
            description: description.map(str::to_string),
        };

        let mut catalog = self.catalog()?;
        let written = fs::create_dir_all(&backup_dir).and_then(|()| write_atomic(&record.path, &artifact));
        if let Err(e) = written {
            warn!(backup = %record.name, error = %e, "backup artifact write failed");
            record.status = BackupStatus::Failed;
            catalog.add(record)?;
            return Err(e.into());
        }
        catalog.add(record.clone())?;

        info!(backup = %record.name, size = record.size, "backup created");
        Ok(record)
    }

    fn seal_snapshot(&self, master: &MasterKey, created_at: DateTime<Utc>) -> Result<Vec<u8>> {
        let document = fs::read(self.layout.document_path())?;

        let blob_store = FsBlobStore::open(self.layout.blobs_dir())?;
        let mut blobs = BTreeMap::new();
        for name in blob_store.list()? {
            let bytes = blob_store.read(&name)?;
            blobs.insert(name, base64_string(&bytes));
        }

        let snapshot = Snapshot {
            format: SNAPSHOT_FORMAT,
            created_at,
            document,
            blobs,
        };
        let plain = Zeroizing::new(
            serde_json::to_vec(&snapshot)
                .map_err(|e| VaultError::Serialization(format!("backup snapshot: {e}")))?,
        );
        debug!(blobs = snapshot.blobs.len(), bytes = plain.len(), "snapshot serialized");

        Ok(encrypt(&self.rng, master.key(), &plain)?.to_bytes())
    }

    // ------------------------------------------------------------------
    // Verify
    // ------------------------------------------------------------------

    /// Recompute the checksum over the artifact bytes.
    ///
    /// A missing artifact verifies as `false`.  Never decrypts.
    pub fn verify(&self, record: &BackupRecord) -> Result<bool> {
        let artifact = match fs::read(&record.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e.into()),
        };
        let ok = record.checksum.matches(&artifact);
        info!(backup = %record.name, ok, "backup verified");
        Ok(ok)
    }

    // ------------------------------------------------------------------
    // Restore
    // ------------------------------------------------------------------

    /// Replace the live store with the contents of `record`.
    ///
    /// Any failure before the final swap leaves the live store untouched.
    /// Requires exclusive access to the store.
    pub fn restore(&self, record: &BackupRecord, master: &MasterKey) -> Result<RestoreReport> {
        let live = self.layout.store_dir();
        let before = self.layout.before_restore_dir();
        let staging = self.layout.staging_dir();

        if before.exists() {
            return Err(VaultError::AlreadyExists(format!(
                "pre-restore copy at {} (clean it up before restoring again)",
                before.display()
            )));
        }

        // Verify and decrypt the very bytes we read, once.
        let artifact = fs::read(&record.path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => VaultError::NotFound(format!("backup artifact '{}'", record.name)),
            _ => e.into(),
        })?;
        if !record.checksum.matches(&artifact) {
            warn!(backup = %record.name, "backup checksum mismatch, restore aborted");
            return Err(VaultError::IntegrityFailed(format!("backup '{}'", record.name)));
        }

        let envelope = Envelope::from_bytes(&artifact)?;
        let plain = decrypt(master.key(), &envelope)?;
        let snapshot: Snapshot = serde_json::from_slice(&plain)
            .map_err(|_| VaultError::Deserialization(format!("backup '{}'", record.name)))?;
        drop(plain);
        if snapshot.format != SNAPSHOT_FORMAT {
            return Err(VaultError::Deserialization(format!(
                "backup '{}' has unsupported snapshot format {}",
                record.name, snapshot.format
            )));
        }

        // Phase 1: stage.
        if staging.exists() {
            fs::remove_dir_all(&staging)?;
        }
        if let Err(e) = stage_snapshot(&staging, &snapshot) {
            let _ = fs::remove_dir_all(&staging);
            return Err(e);
        }
        debug!(backup = %record.name, "snapshot staged");

        // Phase 2: swap.
        if live.exists() {
            fs::rename(&live, &before)?;
        }
        if let Err(e) = fs::rename(&staging, &live) {
            warn!(error = %e, "swap failed, putting the previous store back");
            if before.exists() {
                fs::rename(&before, &live)?;
            }
            return Err(e.into());
        }

        info!(backup = %record.name, blobs = snapshot.blobs.len(), "backup restored");
        Ok(RestoreReport {
            backup: record.name.clone(),
            blobs: snapshot.blobs.len(),
            snapshot_taken_at: snapshot.created_at,
        })
    }

    /// Remove the pre-restore copy left by the last restore.
    ///
    /// Returns `false` if there was none.
    pub fn cleanup_before_restore(&self) -> Result<bool> {
        let before = self.layout.before_restore_dir();
        match fs::remove_dir_all(&before) {
            Ok(()) => {
                info!("pre-restore store removed");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    // ------------------------------------------------------------------
    // Catalog maintenance
    // ------------------------------------------------------------------

    /// Look a backup up by id or file name.
    pub fn find(&self, id_or_name: &str) -> Result<BackupRecord> {
        self.catalog()?
            .find(id_or_name)
            .cloned()
            .ok_or_else(|| VaultError::NotFound(format!("backup '{id_or_name}'")))
    }

    /// Remove a backup's artifact and its catalog entry.
    pub fn delete(&self, id_or_name: &str) -> Result<BackupRecord> {
        let record = self.find(id_or_name)?;
        match fs::remove_file(&record.path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        self.catalog()?.remove(&record.id)?;
        info!(backup = %record.name, "backup deleted");
        Ok(record)
    }
}

fn stage_snapshot(staging: &std::path::Path, snapshot: &Snapshot) -> Result<()> {
    FileRecordStore::write_raw(staging, &snapshot.document)?;
    let mut blobs = FsBlobStore::open(VaultLayout::blobs_in(staging))?;
    for (name, encoded) in &snapshot.blobs {
        let bytes = base64_bytes(encoded)?;
        blobs.write(name, &bytes)?;
    }
    Ok(())
}

fn base64_string(bytes: &[u8]) -> String {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

fn base64_bytes(s: &str) -> Result<Vec<u8>> {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD
        .decode(s)
        .map_err(|_| VaultError::Deserialization("backup blob is not base64".into()))
}
