//! JSON-document record store.
//!
//! The whole record set lives in one `vault.json` document that is kept in
//! memory and rewritten atomically (temp file + rename) after every
//! mutation, or once per batch.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{restrict_permissions, write_atomic, RecordStore, StoreResult, VaultLayout};
use crate::errors::StoreError;
use crate::model::{Collection, MasterCredential, Record};

/// Current document format.
pub const DOCUMENT_FORMAT: u8 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoreDocument {
    format: u8,

    #[serde(default)]
    master: Option<MasterCredential>,

    #[serde(default)]
    collections: BTreeMap<String, Collection>,

    /// table name -> id -> record
    #[serde(default)]
    tables: BTreeMap<String, BTreeMap<u64, serde_json::Value>>,

    #[serde(default = "first_id")]
    next_id: u64,
}

fn first_id() -> u64 {
    1
}

impl Default for StoreDocument {
    fn default() -> Self {
        Self {
            format: DOCUMENT_FORMAT,
            master: None,
            collections: BTreeMap::new(),
            tables: BTreeMap::new(),
            next_id: first_id(),
        }
    }
}

/// `RecordStore` backed by a single JSON document on disk.
pub struct FileRecordStore {
    path: PathBuf,
    doc: StoreDocument,
    batching: bool,
}

impl FileRecordStore {
    /// Create an empty store in `store_dir` and write it to disk.
    pub fn create(store_dir: &Path) -> StoreResult<Self> {
        fs::create_dir_all(store_dir)?;
        let store = Self {
            path: VaultLayout::document_in(store_dir),
            doc: StoreDocument::default(),
            batching: false,
        };
        store.flush()?;
        Ok(store)
    }

    /// Load the store document from `store_dir`.
    pub fn open(store_dir: &Path) -> StoreResult<Self> {
        let path = VaultLayout::document_in(store_dir);
        let bytes = fs::read(&path)?;
        let doc = parse_document(&bytes)?;
        Ok(Self {
            path,
            doc,
            batching: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The document exactly as it is stored on disk.
    pub fn raw_document(&self) -> StoreResult<Vec<u8>> {
        Ok(fs::read(&self.path)?)
    }

    /// Write a raw document into `store_dir`, checking that it parses.
    pub fn write_raw(store_dir: &Path, bytes: &[u8]) -> StoreResult<()> {
        parse_document(bytes)?;
        fs::create_dir_all(store_dir)?;
        let path = VaultLayout::document_in(store_dir);
        fs::write(&path, bytes)?;
        restrict_permissions(&path);
        Ok(())
    }

    fn flush(&self) -> StoreResult<()> {
        let bytes = serde_json::to_vec_pretty(&self.doc)
            .map_err(|e| StoreError::Malformed(format!("encode document: {e}")))?;
        write_atomic(&self.path, &bytes)?;
        Ok(())
    }

    fn persist(&self) -> StoreResult<()> {
        if self.batching {
            return Ok(());
        }
        self.flush()
    }

    fn decode<R: Record>(value: &serde_json::Value) -> StoreResult<R> {
        serde_json::from_value(value.clone())
            .map_err(|e| StoreError::Malformed(format!("{} record: {e}", R::TABLE)))
    }
}

fn parse_document(bytes: &[u8]) -> StoreResult<StoreDocument> {
    let doc: StoreDocument = serde_json::from_slice(bytes)
        .map_err(|e| StoreError::Malformed(format!("vault.json: {e}")))?;
    if doc.format != DOCUMENT_FORMAT {
        return Err(StoreError::Malformed(format!(
            "unsupported document format {}, expected {DOCUMENT_FORMAT}",
            doc.format
        )));
    }
    Ok(doc)
}

impl RecordStore for FileRecordStore {
    fn get<R: Record>(&self, id: u64) -> StoreResult<Option<R>> {
        self.doc
            .tables
            .get(R::TABLE)
            .and_then(|t| t.get(&id))
            .map(Self::decode)
            .transpose()
    }

    fn put<R: Record>(&mut self, mut record: R) -> StoreResult<R> {
        if record.id() == 0 {
            record.assign_id(self.doc.next_id);
            self.doc.next_id += 1;
        }
        let value = serde_json::to_value(&record)
            .map_err(|e| StoreError::Malformed(format!("{} record: {e}", R::TABLE)))?;
        self.doc
            .tables
            .entry(R::TABLE.to_string())
            .or_default()
            .insert(record.id(), value);
        self.persist()?;
        Ok(record)
    }

    fn delete<R: Record>(&mut self, id: u64) -> StoreResult<bool> {
        let removed = self
            .doc
            .tables
            .get_mut(R::TABLE)
            .and_then(|t| t.remove(&id))
            .is_some();
        if removed {
            self.persist()?;
        }
        Ok(removed)
    }

    fn list<R: Record>(&self) -> StoreResult<Vec<R>> {
        match self.doc.tables.get(R::TABLE) {
            Some(table) => table.values().map(Self::decode).collect(),
            None => Ok(Vec::new()),
        }
    }

    fn master_credential(&self) -> StoreResult<Option<MasterCredential>> {
        Ok(self.doc.master.clone())
    }

    fn save_master_credential(&mut self, credential: &MasterCredential) -> StoreResult<()> {
        self.doc.master = Some(credential.clone());
        self.persist()
    }

    fn list_collections(&self) -> StoreResult<Vec<Collection>> {
        Ok(self.doc.collections.values().cloned().collect())
    }

    fn get_collection(&self, name: &str) -> StoreResult<Option<Collection>> {
        Ok(self.doc.collections.get(name).cloned())
    }

    fn save_collection(&mut self, collection: &Collection) -> StoreResult<()> {
        self.doc
            .collections
            .insert(collection.name.clone(), collection.clone());
        self.persist()
    }

    fn begin_batch(&mut self) {
        self.batching = true;
    }

    fn commit_batch(&mut self) -> StoreResult<()> {
        self.batching = false;
        self.flush()
    }

    fn abort_batch(&mut self) -> StoreResult<()> {
        self.batching = false;
        let bytes = fs::read(&self.path)?;
        self.doc = parse_document(&bytes)?;
        Ok(())
    }
}
