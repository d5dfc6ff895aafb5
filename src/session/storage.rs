//! Durable key/value storage for the signed-in session.

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage io error: {0}")]
    Io(#[from] io::Error),

    #[error("storage file is not valid JSON: {0}")]
    Format(#[from] serde_json::Error),
}

/// String-keyed storage the session store mirrors itself into.
pub trait SessionStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

/// JSON object on disk, rewritten in full on every change.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<Map<String, Value>, StorageError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(e.into()),
        };
        if contents.trim().is_empty() {
            return Ok(Map::new());
        }
        Ok(serde_json::from_str(&contents)?)
    }

    fn write_map(&self, map: &Map<String, Value>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(map)?;
        // Write beside the target and rename so a crash never leaves half a file
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, contents)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl SessionStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let map = self.read_map()?;
        Ok(map.get(key).and_then(|v| v.as_str()).map(str::to_string))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        // A corrupt file is replaced rather than blocking new writes
        let mut map = self.read_map().unwrap_or_default();
        map.insert(key.to_string(), Value::String(value.to_string()));
        self.write_map(&map)
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        let mut map = match self.read_map() {
            Ok(m) => m,
            Err(StorageError::Format(_)) => Map::new(),
            Err(e) => return Err(e),
        };
        map.remove(key);
        if map.is_empty() {
            return match fs::remove_file(&self.path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(e.into()),
            };
        }
        self.write_map(&map)
    }
}

/// In-process storage, for tests and for running without a writable disk.
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    entries: HashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn with_entries(entries: &[(&str, &str)]) -> Self {
        Self {
            entries: entries
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl SessionStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.entries.remove(key);
        Ok(())
    }
}
