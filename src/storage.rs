//! Key/value persistence for credentials and the cached user profile.
//!
//! Values are JSON. [`MemoryStorage`] lives as long as the process;
//! [`FileStorage`] keeps every key in one JSON object on disk so a
//! restarted client picks up where it left off.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde_json::{Map, Value};

use crate::error::MiniappError;

/// Synchronous key/value store.
pub trait Storage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Value>, MiniappError>;

    fn set(&self, key: &str, value: Value) -> Result<(), MiniappError>;

    /// Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<(), MiniappError>;
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, Value>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<Value>, MiniappError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<(), MiniappError> {
        self.entries.lock().insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), MiniappError> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

/// All keys in a single JSON file, rewritten on each mutation.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Map<String, Value>, MiniappError> {
        if !self.path.exists() {
            return Ok(Map::new());
        }
        let contents = std::fs::read_to_string(&self.path).map_err(|e| {
            MiniappError::Storage(format!("failed to read {}: {e}", self.path.display()))
        })?;
        if contents.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str::<Value>(&contents)? {
            Value::Object(map) => Ok(map),
            _ => Err(MiniappError::Storage(format!(
                "{} does not hold a JSON object",
                self.path.display()
            ))),
        }
    }

    fn save(&self, map: &Map<String, Value>) -> Result<(), MiniappError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    MiniappError::Storage(format!("failed to create {}: {e}", parent.display()))
                })?;
            }
        }
        let contents = serde_json::to_string_pretty(map)?;
        std::fs::write(&self.path, contents).map_err(|e| {
            MiniappError::Storage(format!("failed to write {}: {e}", self.path.display()))
        })
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<Value>, MiniappError> {
        let _guard = self.lock.lock();
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: Value) -> Result<(), MiniappError> {
        let _guard = self.lock.lock();
        let mut map = self.load()?;
        map.insert(key.to_string(), value);
        self.save(&map)
    }

    fn remove(&self, key: &str) -> Result<(), MiniappError> {
        let _guard = self.lock.lock();
        let mut map = self.load()?;
        if map.remove(key).is_some() {
            self.save(&map)?;
        }
        Ok(())
    }
}
