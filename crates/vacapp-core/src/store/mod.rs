//! Persistent key-value store.
//!
//! All local state lives in one JSON document stored under a single key:
//! the auth token, the session user (with the credentials kept for silent
//! re-login), cow records under `vacas` and brands under `marcas`.
//!
//! The store never fails towards its callers. A document that cannot be
//! read or parsed is treated as empty, and write failures are logged.

pub mod backend;
pub mod document;

use std::path::Path;
use std::sync::{Mutex, PoisonError};

use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

pub use backend::{FileBackend, MemoryBackend, StorageBackend};

/// Storage key of the document; also the file stem of the file backend.
pub const STORAGE_KEY: &str = "app_data";

/// Namespace holding cow records by ID.
pub const COWS_NAMESPACE: &str = "vacas";

/// Namespace holding brands by ID.
pub const BRANDS_NAMESPACE: &str = "marcas";

pub struct LocalStore {
    backend: Box<dyn StorageBackend>,
    // Serializes read-modify-write cycles on the document
    lock: Mutex<()>,
}

impl LocalStore {
    pub fn new(backend: impl StorageBackend + 'static) -> Self {
        Self {
            backend: Box::new(backend),
            lock: Mutex::new(()),
        }
    }

    /// Open the file-backed store inside `dir`.
    pub fn open(dir: &Path) -> Self {
        let path = dir.join(format!("{}.json", STORAGE_KEY));
        debug!(path = %path.display(), "Opening local store");
        Self::new(FileBackend::new(path))
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryBackend::new())
    }

    fn load(&self) -> Map<String, Value> {
        let raw = match self.backend.read() {
            Ok(Some(raw)) => raw,
            Ok(None) => return Map::new(),
            Err(e) => {
                warn!(error = %e, "Failed to read local store, treating as empty");
                return Map::new();
            }
        };

        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(map)) => map,
            Ok(_) => {
                debug!("Local store document is not an object, treating as empty");
                Map::new()
            }
            Err(e) => {
                debug!(error = %e, "Local store document is corrupt, treating as empty");
                Map::new()
            }
        }
    }

    fn persist(&self, doc: &Map<String, Value>) {
        let contents = match serde_json::to_string(doc) {
            Ok(contents) => contents,
            Err(e) => {
                warn!(error = %e, "Failed to serialize local store");
                return;
            }
        };
        if let Err(e) = self.backend.write(&contents) {
            warn!(error = %e, "Failed to persist local store");
        }
    }

    /// Assign `value` at a dotted `path`, merging into existing objects.
    pub fn set(&self, path: &str, value: Value) {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut doc = self.load();
        document::set_path(&mut doc, path, value);
        self.persist(&doc);
    }

    /// Read the value at a dotted `path`.
    pub fn get(&self, path: &str) -> Option<Value> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let doc = self.load();
        document::get_path(&doc, path).cloned()
    }

    /// Delete the key at a dotted `path`.
    pub fn remove(&self, path: &str) {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut doc = self.load();
        document::remove_path(&mut doc, path);
        self.persist(&doc);
    }

    /// Drop the whole document.
    pub fn clear(&self) {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = self.backend.remove() {
            warn!(error = %e, "Failed to clear local store");
        }
    }

    /// Read and deserialize the value at `path`; a value of the wrong shape
    /// reads as absent.
    pub fn get_as<T: DeserializeOwned>(&self, path: &str) -> Option<T> {
        let value = self.get(path)?;
        match serde_json::from_value(value) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                debug!(path, error = %e, "Stored value has unexpected shape");
                None
            }
        }
    }

    /// Serialize `value` and store it at `path`.
    pub fn set_as<T: Serialize>(&self, path: &str, value: &T) {
        match serde_json::to_value(value) {
            Ok(value) => self.set(path, value),
            Err(e) => warn!(path, error = %e, "Failed to serialize value for local store"),
        }
    }

    // ===== Namespaced entries =====

    pub fn save_entry<T: Serialize>(&self, namespace: &str, id: i64, value: &T) {
        self.set_as(&format!("{}.{}", namespace, id), value);
    }

    pub fn entry<T: DeserializeOwned>(&self, namespace: &str, id: i64) -> Option<T> {
        self.get_as(&format!("{}.{}", namespace, id))
    }

    pub fn remove_entry(&self, namespace: &str, id: i64) {
        self.remove(&format!("{}.{}", namespace, id));
    }

    /// Every entry of a namespace. Keys that are not numeric and values that
    /// fail to deserialize are skipped.
    pub fn entries<T: DeserializeOwned>(&self, namespace: &str) -> Vec<(i64, T)> {
        let Some(Value::Object(map)) = self.get(namespace) else {
            return Vec::new();
        };

        let mut entries = Vec::with_capacity(map.len());
        for (key, value) in map {
            let Ok(id) = key.parse::<i64>() else {
                debug!(namespace, key = %key, "Skipping non-numeric store key");
                continue;
            };
            match serde_json::from_value(value) {
                Ok(parsed) => entries.push((id, parsed)),
                Err(e) => debug!(namespace, id, error = %e, "Skipping unreadable store entry"),
            }
        }
        entries
    }

    pub fn clear_namespace(&self, namespace: &str) {
        self.remove(namespace);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_set_then_get_round_trip() {
        let store = LocalStore::in_memory();
        store.set("auth_token", json!("abc"));
        assert_eq!(store.get("auth_token"), Some(json!("abc")));
    }

    #[test]
    fn test_nested_sets_merge_into_user() {
        let store = LocalStore::in_memory();
        store.set("user.username", json!("ana"));
        store.set("user.password", json!("x"));

        assert_eq!(
            store.get("user"),
            Some(json!({"username": "ana", "password": "x"}))
        );
    }

    #[test]
    fn test_get_missing_is_none() {
        let store = LocalStore::in_memory();
        assert!(store.get("user.username").is_none());
    }

    #[test]
    fn test_corrupt_document_reads_as_empty() {
        let store = LocalStore::new(MemoryBackend::with_contents("{not json"));
        assert!(store.get("auth_token").is_none());

        // Writing over a corrupt document starts a fresh one
        store.set("auth_token", json!("t"));
        assert_eq!(store.get("auth_token"), Some(json!("t")));
    }

    #[test]
    fn test_non_object_document_reads_as_empty() {
        let store = LocalStore::new(MemoryBackend::with_contents("[1, 2, 3]"));
        assert!(store.get("0").is_none());
    }

    #[test]
    fn test_remove_missing_intermediate_is_noop() {
        let store = LocalStore::in_memory();
        store.set("marcas.1", json!({"id": 1}));
        store.remove("vacas.1");
        assert_eq!(store.get("marcas.1"), Some(json!({"id": 1})));
    }

    #[test]
    fn test_clear_drops_everything() {
        let store = LocalStore::in_memory();
        store.set("auth_token", json!("t"));
        store.set("user.username", json!("ana"));
        store.clear();
        assert!(store.get("auth_token").is_none());
        assert!(store.get("user").is_none());
    }

    #[test]
    fn test_get_as_wrong_shape_is_none() {
        let store = LocalStore::in_memory();
        store.set("count", json!("not a number"));
        assert_eq!(store.get_as::<i64>("count"), None);
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Item {
        name: String,
    }

    #[test]
    fn test_entries_skip_bad_keys_and_values() {
        let store = LocalStore::in_memory();
        store.save_entry("items", 2, &Item { name: "b".into() });
        store.save_entry("items", 1, &Item { name: "a".into() });
        store.set("items.oops", json!({"name": "bad key"}));
        store.set("items.3", json!(42));

        let mut entries: Vec<(i64, Item)> = store.entries("items");
        entries.sort_by_key(|(id, _)| *id);

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0], (1, Item { name: "a".into() }));
        assert_eq!(entries[1], (2, Item { name: "b".into() }));
    }

    #[test]
    fn test_remove_entry_keeps_other_entries() {
        let store = LocalStore::in_memory();
        store.save_entry("items", 1, &Item { name: "a".into() });
        store.save_entry("items", 2, &Item { name: "b".into() });

        store.remove_entry("items", 1);

        assert!(store.entry::<Item>("items", 1).is_none());
        assert_eq!(store.entry::<Item>("items", 2), Some(Item { name: "b".into() }));
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let temp = TempDir::new().unwrap();
        {
            let store = LocalStore::open(temp.path());
            store.set("user.username", json!("ana"));
        }
        let reopened = LocalStore::open(temp.path());
        assert_eq!(reopened.get("user.username"), Some(json!("ana")));
    }
}
