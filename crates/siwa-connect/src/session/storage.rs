/*
[INPUT]:  String keys and values
[OUTPUT]: Durable key/value persistence (JSON file or in-memory)
[POS]:    Session layer - storage medium behind the session store
[UPDATE]: When adding storage backends or changing the file format
*/

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use tempfile::NamedTempFile;

use crate::http::{Result, SiwaError};

/// Client-side key/value storage, the equivalent of a browser's local storage
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> Result<()>;

    fn remove(&self, key: &str) -> Result<()>;

    /// Write several entries; backends that can should do it in one step
    fn set_entries(&self, entries: &[(&str, &str)]) -> Result<()> {
        for (key, value) in entries {
            self.set(key, value)?;
        }
        Ok(())
    }

    /// Remove several entries; backends that can should do it in one step
    fn remove_entries(&self, keys: &[&str]) -> Result<()> {
        for key in keys {
            self.remove(key)?;
        }
        Ok(())
    }
}

/// Process-local storage, shared between clones
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let guard = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        Ok(guard.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut guard = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        guard.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut guard = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        guard.remove(key);
        Ok(())
    }
}

/// Key/value storage persisted as a flat JSON object on disk.
///
/// Every write replaces the file atomically through a temporary file in the
/// same directory.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }

        let contents = std::fs::read_to_string(&self.path)
            .map_err(|e| SiwaError::Storage(format!("read {}: {e}", self.path.display())))?;
        if contents.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        serde_json::from_str(&contents).map_err(|e| {
            SiwaError::Storage(format!("corrupt store {}: {e}", self.path.display()))
        })
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        let parent_dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent_dir)
            .map_err(|e| SiwaError::Storage(format!("create {}: {e}", parent_dir.display())))?;

        let json = serde_json::to_string_pretty(entries)?;
        let mut temp_file = NamedTempFile::new_in(&parent_dir)
            .map_err(|e| SiwaError::Storage(format!("temp file: {e}")))?;
        temp_file
            .write_all(json.as_bytes())
            .and_then(|_| temp_file.flush())
            .map_err(|e| SiwaError::Storage(format!("write temp file: {e}")))?;
        temp_file
            .persist(&self.path)
            .map_err(|e| SiwaError::Storage(format!("persist {}: {e}", self.path.display())))?;

        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.set_entries(&[(key, value)])
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.remove_entries(&[key])
    }

    fn set_entries(&self, entries: &[(&str, &str)]) -> Result<()> {
        let mut all = self.read_all()?;
        for (key, value) in entries {
            all.insert((*key).to_string(), (*value).to_string());
        }
        self.write_all(&all)
    }

    fn remove_entries(&self, keys: &[&str]) -> Result<()> {
        let mut all = self.read_all()?;
        let before = all.len();
        for key in keys {
            all.remove(*key);
        }
        if all.len() == before {
            return Ok(());
        }
        self.write_all(&all)
    }
}
