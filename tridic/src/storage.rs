//! Durable key-value storage boundary.
//!
//! Each component persists its whole state as one JSON document under a
//! named slot. Hosts pick an implementation: in-memory for tests and
//! ephemeral sessions, file-backed for real installs.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// One named slot per component; values are JSON documents. A missing slot
/// reads as `None`, never as an error.
pub trait KeyValueStorage {
    fn get_string(&self, key: &str) -> StorageResult<Option<String>>;
    fn set_string(&mut self, key: &str, value: &str) -> StorageResult<()>;
}

impl<S: KeyValueStorage + ?Sized> KeyValueStorage for &mut S {
    fn get_string(&self, key: &str) -> StorageResult<Option<String>> {
        (**self).get_string(key)
    }

    fn set_string(&mut self, key: &str, value: &str) -> StorageResult<()> {
        (**self).set_string(key, value)
    }
}

/// Volatile storage over a plain map.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    slots: HashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get_string(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.slots.get(key).cloned())
    }

    fn set_string(&mut self, key: &str, value: &str) -> StorageResult<()> {
        self.slots.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// One `<key>.json` file per slot under a directory. Writes go through a
/// temp file and a rename so a crash never leaves a half-written slot.
#[derive(Debug)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Opens the directory, creating it if missing.
    pub fn open(dir: impl Into<PathBuf>) -> StorageResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn slot_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl KeyValueStorage for FileStorage {
    fn get_string(&self, key: &str) -> StorageResult<Option<String>> {
        match fs::read_to_string(self.slot_path(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_string(&mut self, key: &str, value: &str) -> StorageResult<()> {
        let tmp = self.dir.join(format!("{}.json.tmp", key));
        fs::write(&tmp, value)?;
        fs::rename(&tmp, self.slot_path(key))?;
        Ok(())
    }
}
