//! Encrypted, integrity-checked backups of the whole store.
//!
//! - `engine`: create / verify / restore with a staged swap
//! - `catalog`: backup metadata, listing, deletion, statistics
//! - `task`: async wrappers (feature `async-tasks`)

pub mod catalog;
pub mod engine;

#[cfg(feature = "async-tasks")]
pub mod task;

pub use catalog::{BackupCatalog, BackupKind, BackupRecord, BackupStatistics, BackupStatus};
pub use engine::{BackupEngine, RestoreReport, ARTIFACT_EXT};

#[cfg(feature = "async-tasks")]
pub use task::{spawn_create_backup, spawn_restore, BackupTask};
