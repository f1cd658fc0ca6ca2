//! Durable key-value storage
//!
//! Persisted state (episode progress) is written through the `KeyValueStore`
//! trait so the same stores work against a browser-style string store, a
//! JSON file on disk, or plain memory in tests.

use crate::error::Result;
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::warn;

/// String key-value storage
///
/// Implementations never fail loudly: reads of missing or unreadable keys
/// return `None`, writes report success as a boolean.
pub trait KeyValueStore: Send + Sync {
    /// Get the value stored under `key`
    fn get_item(&self, key: &str) -> Option<String>;

    /// Store `value` under `key`
    ///
    /// Returns `false` when the value could not be made durable.
    fn set_item(&self, key: &str, value: &str) -> bool;

    /// Remove `key`
    ///
    /// Returns `false` when the removal could not be made durable.
    fn remove_item(&self, key: &str) -> bool;
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory storage
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        lock(&self.items).len()
    }

    /// Whether the store holds no keys
    pub fn is_empty(&self) -> bool {
        lock(&self.items).is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get_item(&self, key: &str) -> Option<String> {
        lock(&self.items).get(key).cloned()
    }

    fn set_item(&self, key: &str, value: &str) -> bool {
        lock(&self.items).insert(key.to_string(), value.to_string());
        true
    }

    fn remove_item(&self, key: &str) -> bool {
        lock(&self.items).remove(key);
        true
    }
}

/// JSON file storage with an in-memory fallback
///
/// All keys live in a single JSON object document. Every write is mirrored
/// into memory, so a failing disk degrades to session-only persistence
/// instead of losing state.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    memory: MemoryStore,
}

impl FileStore {
    /// Create a store backed by the document at `path`
    ///
    /// The file (and its parent directory) is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            memory: MemoryStore::new(),
        }
    }

    /// Location of the backing document
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_document(&self) -> Result<BTreeMap<String, String>> {
        match fs::read_to_string(&self.path) {
            Ok(text) if text.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_document(&self, document: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        // Write to a sibling file first so a crash never leaves a torn document
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_string_pretty(document)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn update_document(&self, apply: impl FnOnce(&mut BTreeMap<String, String>)) -> Result<()> {
        let mut document = self.read_document()?;
        apply(&mut document);
        self.write_document(&document)
    }
}

impl KeyValueStore for FileStore {
    fn get_item(&self, key: &str) -> Option<String> {
        match self.read_document() {
            Ok(document) => document.get(key).cloned(),
            Err(e) => {
                warn!("Failed to read {:?} for key {}: {}", self.path, key, e);
                self.memory.get_item(key)
            }
        }
    }

    fn set_item(&self, key: &str, value: &str) -> bool {
        self.memory.set_item(key, value);

        match self.update_document(|document| {
            document.insert(key.to_string(), value.to_string());
        }) {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to persist key {} to {:?}: {}", key, self.path, e);
                false
            }
        }
    }

    fn remove_item(&self, key: &str) -> bool {
        self.memory.remove_item(key);

        match self.update_document(|document| {
            document.remove(key);
        }) {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to remove key {} from {:?}: {}", key, self.path, e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_round_trip() {
        let store = MemoryStore::new();
        assert!(store.is_empty());

        assert!(store.set_item("a", "1"));
        assert_eq!(store.get_item("a").as_deref(), Some("1"));
        assert_eq!(store.len(), 1);

        assert!(store.remove_item("a"));
        assert_eq!(store.get_item("a"), None);
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("nope.json"));
        assert_eq!(store.get_item("anything"), None);
    }

    #[test]
    fn file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");

        let store = FileStore::new(&path);
        assert!(store.set_item("episode-progress", "{\"a\":1}"));
        assert!(store.set_item("other", "x"));
        assert!(store.remove_item("other"));

        let reopened = FileStore::new(&path);
        assert_eq!(
            reopened.get_item("episode-progress").as_deref(),
            Some("{\"a\":1}")
        );
        assert_eq!(reopened.get_item("other"), None);
    }

    #[test]
    fn corrupt_file_falls_back_to_memory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "not json").unwrap();

        let store = FileStore::new(&path);
        assert!(!store.set_item("k", "v"));
        assert_eq!(store.get_item("k").as_deref(), Some("v"));
    }
}
