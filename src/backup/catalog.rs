//! Backup catalog: metadata for every artifact in `backups/`.
//!
//! The catalog is a JSON list in `backups/catalog.json`, rewritten
//! atomically on every change.  Checksums and metadata live here, never
//! inside the artifact bytes.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::crypto::IntegrityTag;
use crate::errors::{Result, VaultError};
use crate::store::write_atomic;

const CATALOG_FILE: &str = "catalog.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackupKind {
    Manual,
    Automatic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackupStatus {
    Completed,
    Failed,
}

/// One entry of the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupRecord {
    pub id: String,
    /// File name, e.g. `passvault_backup_20260101_120000_1a2b3c4d.pvbak`.
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
    /// SHA-256 over the encrypted artifact bytes.
    pub checksum: IntegrityTag,
    pub kind: BackupKind,
    pub status: BackupStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Aggregate numbers over completed backups.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackupStatistics {
    pub count: usize,
    pub total_size: u64,
    pub latest: Option<DateTime<Utc>>,
    pub oldest: Option<DateTime<Utc>>,
}

pub struct BackupCatalog {
    path: PathBuf,
    records: Vec<BackupRecord>,
}

impl BackupCatalog {
    /// Load the catalog from `backup_dir`; a missing file is an empty catalog.
    pub fn open(backup_dir: &Path) -> Result<Self> {
        let path = backup_dir.join(CATALOG_FILE);
        let records = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| VaultError::Serialization(format!("backup catalog: {e}")))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self { path, records })
    }

    pub fn add(&mut self, record: BackupRecord) -> Result<()> {
        self.records.push(record);
        self.save()
    }

    /// Look a backup up by id or by file name.
    pub fn find(&self, id_or_name: &str) -> Option<&BackupRecord> {
        self.records
            .iter()
            .find(|r| r.id == id_or_name || r.name == id_or_name)
    }

    /// All records, newest first.
    pub fn list(&self) -> Vec<BackupRecord> {
        let mut records = self.records.clone();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records
    }

    pub fn remove(&mut self, id: &str) -> Result<Option<BackupRecord>> {
        let Some(pos) = self.records.iter().position(|r| r.id == id) else {
            return Ok(None);
        };
        let removed = self.records.remove(pos);
        self.save()?;
        Ok(Some(removed))
    }

    pub fn statistics(&self) -> BackupStatistics {
        let completed = self
            .records
            .iter()
            .filter(|r| r.status == BackupStatus::Completed);

        let mut stats = BackupStatistics::default();
        for r in completed {
            stats.count += 1;
            stats.total_size += r.size;
            stats.latest = stats.latest.max(Some(r.created_at));
            stats.oldest = Some(stats.oldest.map_or(r.created_at, |o| o.min(r.created_at)));
        }
        stats
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let bytes = serde_json::to_vec_pretty(&self.records)
            .map_err(|e| VaultError::Serialization(format!("backup catalog: {e}")))?;
        write_atomic(&self.path, &bytes)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::TempDir;

    fn record(id: &str, size: u64, age_days: i64, status: BackupStatus) -> BackupRecord {
        BackupRecord {
            id: id.into(),
            name: format!("{id}.pvbak"),
            path: PathBuf::from(format!("/tmp/{id}.pvbak")),
            size,
            checksum: IntegrityTag::compute(id.as_bytes()),
            kind: BackupKind::Manual,
            status,
            created_at: Utc::now() - Duration::days(age_days),
            description: None,
        }
    }

    #[test]
    fn lists_newest_first_and_persists() {
        let dir = TempDir::new().unwrap();
        let mut catalog = BackupCatalog::open(dir.path()).unwrap();
        catalog.add(record("old", 10, 5, BackupStatus::Completed)).unwrap();
        catalog.add(record("new", 20, 1, BackupStatus::Completed)).unwrap();

        let reopened = BackupCatalog::open(dir.path()).unwrap();
        let ids: Vec<_> = reopened.list().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["new", "old"]);
        assert!(reopened.find("old.pvbak").is_some());
    }

    #[test]
    fn statistics_skip_failed_backups() {
        let dir = TempDir::new().unwrap();
        let mut catalog = BackupCatalog::open(dir.path()).unwrap();
        catalog.add(record("a", 100, 3, BackupStatus::Completed)).unwrap();
        catalog.add(record("b", 50, 1, BackupStatus::Completed)).unwrap();
        catalog.add(record("c", 999, 0, BackupStatus::Failed)).unwrap();

        let stats = catalog.statistics();
        assert_eq!(stats.count, 2);
        assert_eq!(stats.total_size, 150);
        assert!(stats.latest > stats.oldest);
    }

    #[test]
    fn remove_unknown_is_none() {
        let dir = TempDir::new().unwrap();
        let mut catalog = BackupCatalog::open(dir.path()).unwrap();
        assert!(catalog.remove("nope").unwrap().is_none());
    }
}
