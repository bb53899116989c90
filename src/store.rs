// Key-value persistence for engine state
// Stands in for the browser's local storage: a string map keyed by fixed names

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::error::Result;

/// Key-value capability injected into the engine
pub trait Store: Send + Sync {
    /// Read a value, `None` when the key was never written
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value, replacing any previous one
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Delete a key (no-op when missing)
    fn remove(&self, key: &str) -> Result<()>;
}

/// In-memory store
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }
}

impl Store for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.values.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.values.lock().remove(key);
        Ok(())
    }
}

/// File-backed store: one JSON object per directory
pub struct FileStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles
    lock: Mutex<()>,
}

impl FileStore {
    /// File name used inside the store directory
    pub const FILE_NAME: &'static str = "kb-store.json";

    /// Create a store rooted at `dir` (the directory is created on first write)
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        FileStore {
            path: dir.as_ref().join(Self::FILE_NAME),
            lock: Mutex::new(()),
        }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<HashMap<String, String>> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }

        let data = std::fs::read_to_string(&self.path)?;
        if data.trim().is_empty() {
            return Ok(HashMap::new());
        }
        Ok(serde_json::from_str(&data)?)
    }

    fn write_all(&self, values: &HashMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let data = serde_json::to_string_pretty(values)?;
        std::fs::write(&self.path, data)?;
        Ok(())
    }
}

impl Store for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let _guard = self.lock.lock();
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.lock.lock();
        let mut values = self.read_all()?;
        values.insert(key.to_string(), value.to_string());
        self.write_all(&values)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let _guard = self.lock.lock();
        let mut values = self.read_all()?;
        if values.remove(key).is_some() {
            self.write_all(&values)?;
        }
        Ok(())
    }
}

/// Store whose every operation fails
#[cfg(test)]
pub(crate) struct BrokenStore;

#[cfg(test)]
impl Store for BrokenStore {
    fn get(&self, _key: &str) -> Result<Option<String>> {
        Err(crate::error::KbError::storage("unavailable"))
    }

    fn set(&self, _key: &str, _value: &str) -> Result<()> {
        Err(crate::error::KbError::storage("unavailable"))
    }

    fn remove(&self, _key: &str) -> Result<()> {
        Err(crate::error::KbError::storage("unavailable"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::new();
        assert_eq!(store.get("lang").unwrap(), None);

        store.set("lang", "es").unwrap();
        assert_eq!(store.get("lang").unwrap().as_deref(), Some("es"));

        store.remove("lang").unwrap();
        assert_eq!(store.get("lang").unwrap(), None);
    }

    #[test]
    fn test_file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("state");

        let store = FileStore::new(&nested);
        store.set("lang", "es").unwrap();
        store.set("history", "[]").unwrap();
        assert!(store.path().exists());

        let reopened = FileStore::new(&nested);
        assert_eq!(reopened.get("lang").unwrap().as_deref(), Some("es"));
        assert_eq!(reopened.get("history").unwrap().as_deref(), Some("[]"));

        reopened.remove("lang").unwrap();
        assert_eq!(store.get("lang").unwrap(), None);
        assert_eq!(store.get("history").unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn test_broken_store_errors() {
        assert!(BrokenStore.get("lang").is_err());
        assert!(BrokenStore.set("lang", "es").is_err());
    }

    #[test]
    fn test_file_store_corrupt_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        std::fs::write(store.path(), "not json").unwrap();

        assert!(store.get("lang").is_err());
    }
}
