//! Asynchronous wrappers around the synchronous backup engine.
//!
//! The engine itself stays blocking and thread-model agnostic; these
//! helpers move a create or restore onto tokio's blocking pool and hand
//! back a future the caller can await (or drop, which does not cancel the
//! work).

use tokio::task::JoinHandle;

use super::catalog::{BackupKind, BackupRecord};
use super::engine::{BackupEngine, RestoreReport};
use crate::crypto::MasterKey;
use crate::errors::{Result, VaultError};

/// A backup operation running on the blocking pool.
pub struct BackupTask<T> {
    handle: JoinHandle<Result<T>>,
}

impl<T> BackupTask<T> {
    /// Wait for the operation to finish.
    pub async fn wait(self) -> Result<T> {
        self.handle
            .await
            .map_err(|e| VaultError::Task(e.to_string()))?
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Run `BackupEngine::create` on the blocking pool.
///
/// Must be called from within a tokio runtime.
pub fn spawn_create_backup(
    engine: BackupEngine,
    master: MasterKey,
    description: Option<String>,
    kind: BackupKind,
) -> BackupTask<BackupRecord> {
    let handle = tokio::task::spawn_blocking(move || {
        engine.create(&master, description.as_deref(), kind)
    });
    BackupTask { handle }
}

/// Run `BackupEngine::restore` on the blocking pool.
///
/// The caller must keep every other writer off the store until the
/// returned task completes.
pub fn spawn_restore(
    engine: BackupEngine,
    record: BackupRecord,
    master: MasterKey,
) -> BackupTask<RestoreReport> {
    let handle = tokio::task::spawn_blocking(move || engine.restore(&record, &master));
    BackupTask { handle }
}
