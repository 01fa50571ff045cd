//! Filesystem blob store: one file per payload under `store/blobs/`.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::{write_atomic, BlobStore, StoreResult};
use crate::errors::StoreError;

pub struct FsBlobStore {
    dir: PathBuf,
}

impl FsBlobStore {
    /// Open (creating if needed) the blob directory.
    pub fn open(dir: impl Into<PathBuf>) -> StoreResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, name: &str) -> StoreResult<PathBuf> {
        validate_name(name)?;
        Ok(self.dir.join(name))
    }
}

/// Blob names are generated, flat, and never leave the blob directory.
fn validate_name(name: &str) -> StoreResult<()> {
    let bad = name.is_empty()
        || name.starts_with('.')
        || name.contains('/')
        || name.contains('\\')
        || name.contains("..");
    if bad {
        return Err(StoreError::Backend(format!("invalid blob name '{name}'")));
    }
    Ok(())
}

impl BlobStore for FsBlobStore {
    fn write(&mut self, name: &str, bytes: &[u8]) -> StoreResult<()> {
        let path = self.path_for(name)?;
        write_atomic(&path, bytes)?;
        Ok(())
    }

    fn read(&self, name: &str) -> StoreResult<Vec<u8>> {
        let path = self.path_for(name)?;
        Ok(fs::read(path)?)
    }

    fn delete(&mut self, name: &str) -> StoreResult<bool> {
        let path = self.path_for(name)?;
        match fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn list(&self) -> StoreResult<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            // Skip in-flight temp files from write_atomic.
            if !name.starts_with('.') {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn write_read_delete() {
        let dir = TempDir::new().unwrap();
        let mut blobs = FsBlobStore::open(dir.path().join("blobs")).unwrap();

        blobs.write("a.enc", b"one").unwrap();
        blobs.write("b.enc", b"two").unwrap();
        assert_eq!(blobs.read("a.enc").unwrap(), b"one");
        assert_eq!(blobs.list().unwrap(), vec!["a.enc", "b.enc"]);

        assert!(blobs.delete("a.enc").unwrap());
        assert!(!blobs.delete("a.enc").unwrap());
        assert!(blobs.read("a.enc").is_err());
    }

    #[test]
    fn rejects_path_escapes() {
        let dir = TempDir::new().unwrap();
        let mut blobs = FsBlobStore::open(dir.path()).unwrap();
        assert!(blobs.write("../evil", b"x").is_err());
        assert!(blobs.write("sub/dir", b"x").is_err());
        assert!(blobs.read("").is_err());
    }
}
