//! Client-local key-value storage holding demo mode state.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::store::{StoreError, StoreResult};

/// String key-value storage, the shape of a browser's `localStorage`.
pub trait LocalStorage: Send + Sync {
    fn get(&self, key: &str) -> StoreResult<Option<String>>;

    fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    fn remove(&self, key: &str) -> StoreResult<()>;
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<BTreeMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn items(&self) -> StoreResult<std::sync::MutexGuard<'_, BTreeMap<String, String>>> {
        self.items
            .lock()
            .map_err(|_| StoreError::Backend("local storage lock poisoned".into()))
    }
}

impl LocalStorage for MemoryStorage {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.items()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.items()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        self.items()?.remove(key);
        Ok(())
    }
}

/// All keys kept in one JSON object on disk.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStorage {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    fn read(&self) -> StoreResult<BTreeMap<String, String>> {
        match fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(raw) => serde_json::from_str(&raw).map_err(|e| StoreError::Corrupt(e.to_string())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(StoreError::Backend(e.to_string())),
        }
    }

    fn write(&self, items: &BTreeMap<String, String>) -> StoreResult<()> {
        let raw = serde_json::to_string_pretty(items)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        fs::write(&self.path, raw).map_err(|e| StoreError::Backend(e.to_string()))
    }

    fn modify(&self, f: impl FnOnce(&mut BTreeMap<String, String>)) -> StoreResult<()> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| StoreError::Backend("local storage lock poisoned".into()))?;
        let mut items = self.read()?;
        f(&mut items);
        self.write(&items)
    }
}

impl LocalStorage for FileStorage {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.read()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.modify(|items| {
            items.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        self.modify(|items| {
            items.remove(key);
        })
    }
}
