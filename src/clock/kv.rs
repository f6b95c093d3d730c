//! Key-value backends for persisted integers.

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage io error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("corrupt storage file: {0}")]
    Corrupt(#[from] serde_json::Error),
    #[error("value under '{0}' is not an integer")]
    NotAnInteger(String),
    #[error("storage task failed: {0}")]
    Task(String),
}

pub trait KeyValueStore: Send + Sync {
    fn get_i64(&self, key: &str) -> Result<Option<i64>, StorageError>;

    fn set_i64(&self, key: &str, value: i64) -> Result<(), StorageError>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, i64>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn values(&self) -> MutexGuard<'_, HashMap<String, i64>> {
        self.values.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl KeyValueStore for MemoryStore {
    fn get_i64(&self, key: &str) -> Result<Option<i64>, StorageError> {
        Ok(self.values().get(key).copied())
    }

    fn set_i64(&self, key: &str, value: i64) -> Result<(), StorageError> {
        self.values().insert(key.to_string(), value);
        Ok(())
    }
}

/// One JSON object on disk, rewritten whole on every set.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    fn io_error(&self, source: std::io::Error) -> StorageError {
        StorageError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }

    fn load(&self) -> Result<Map<String, Value>, StorageError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(self.io_error(e)),
        };
        if text.trim().is_empty() {
            return Ok(Map::new());
        }
        Ok(serde_json::from_str(&text)?)
    }
}

impl KeyValueStore for JsonFileStore {
    fn get_i64(&self, key: &str) -> Result<Option<i64>, StorageError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        match self.load()?.get(key) {
            None => Ok(None),
            Some(value) => value
                .as_i64()
                .map(Some)
                .ok_or_else(|| StorageError::NotAnInteger(key.to_string())),
        }
    }

    fn set_i64(&self, key: &str, value: i64) -> Result<(), StorageError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut values = self.load()?;
        values.insert(key.to_string(), Value::from(value));
        let text = serde_json::to_string_pretty(&values)?;
        std::fs::write(&self.path, text).map_err(|e| self.io_error(e))?;
        debug!(path = %self.path.display(), key, value, "Persisted value");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_round_trip() {
        let store = MemoryStore::new();
        assert_eq!(store.get_i64("k").unwrap(), None);
        store.set_i64("k", 42).unwrap();
        assert_eq!(store.get_i64("k").unwrap(), Some(42));
    }

    #[test]
    fn json_file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kv.json");

        JsonFileStore::new(&path).set_i64("system_time", 1_759_082_426_000).unwrap();
        JsonFileStore::new(&path).set_i64("other", 7).unwrap();

        let reopened = JsonFileStore::new(&path);
        assert_eq!(reopened.get_i64("system_time").unwrap(), Some(1_759_082_426_000));
        assert_eq!(reopened.get_i64("other").unwrap(), Some(7));
        assert_eq!(reopened.get_i64("missing").unwrap(), None);
    }

    #[test]
    fn json_file_store_reports_bad_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kv.json");

        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(JsonFileStore::new(&path).get_i64("k"), Err(StorageError::Corrupt(_))));

        std::fs::write(&path, r#"{"k":"soon"}"#).unwrap();
        assert!(matches!(
            JsonFileStore::new(&path).get_i64("k"),
            Err(StorageError::NotAnInteger(key)) if key == "k"
        ));
    }
}
