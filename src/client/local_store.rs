//! Local key-value cache used as the offline mirror of the API.
//!
//! Values are JSON strings keyed by [`cache_key`]. Writes are whole-value
//! replacements; there is no locking between two handles on the same file,
//! so concurrent read-modify-write cycles from separate processes can lose
//! the earlier write.

use log::warn;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

pub const DEFAULT_PREFIX: &str = "celebration_";

/// Same order of magnitude as a browser's local storage allowance.
pub const DEFAULT_QUOTA_BYTES: usize = 5 * 1024 * 1024;

/// Raised when the cache cannot take a write. Nothing falls back from here.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("local storage full while writing '{key}': {reason}")]
pub struct LocalStorageFull {
    pub key: String,
    pub reason: String,
}

pub trait LocalStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), LocalStorageFull>;
    fn remove(&self, key: &str);
}

/// Builds the cache key for a collection: `prefix` + name with `/` → `_`.
pub fn cache_key(prefix: &str, collection: &str) -> String {
    format!("{}{}", prefix, collection.trim_matches('/').replace('/', "_"))
}

fn used_bytes(entries: &HashMap<String, String>) -> usize {
    entries.iter().map(|(k, v)| k.len() + v.len()).sum()
}

fn check_quota(entries: &HashMap<String, String>, key: &str, quota: Option<usize>) -> Result<(), LocalStorageFull> {
    if let Some(quota) = quota {
        let used = used_bytes(entries);
        if used > quota {
            return Err(LocalStorageFull {
                key: key.to_string(),
                reason: format!("{} bytes needed, quota is {}", used, quota),
            });
        }
    }
    Ok(())
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
    quota: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota: usize) -> Self {
        Self { entries: Mutex::default(), quota: Some(quota) }
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl LocalStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), LocalStorageFull> {
        let mut entries = self.entries();
        let mut next = entries.clone();
        next.insert(key.to_string(), value.to_string());
        check_quota(&next, key, self.quota)?;
        *entries = next;
        Ok(())
    }

    fn remove(&self, key: &str) {
        self.entries().remove(key);
    }
}

/// JSON object on disk, re-read on every access so several handles on the
/// same path observe each other's completed writes.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    quota: usize,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>, quota: usize) -> Self {
        Self { path: path.into(), quota }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> HashMap<String, String> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return HashMap::new(),
            Err(e) => {
                warn!("[LOCAL_STORE] Cannot read {}: {}", self.path.display(), e);
                return HashMap::new();
            }
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!("[LOCAL_STORE] Ignoring corrupt cache file {}: {}", self.path.display(), e);
            HashMap::new()
        })
    }

    fn persist(&self, entries: &HashMap<String, String>, key: &str) -> Result<(), LocalStorageFull> {
        let failed = |reason: String| LocalStorageFull { key: key.to_string(), reason };
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| failed(e.to_string()))?;
            }
        }
        let data = serde_json::to_string(entries).map_err(|e| failed(e.to_string()))?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, data).map_err(|e| failed(e.to_string()))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| failed(e.to_string()))
    }
}

impl LocalStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.load().remove(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), LocalStorageFull> {
        let mut entries = self.load();
        entries.insert(key.to_string(), value.to_string());
        check_quota(&entries, key, Some(self.quota))?;
        self.persist(&entries, key)
    }

    fn remove(&self, key: &str) {
        let mut entries = self.load();
        if entries.remove(key).is_some() {
            if let Err(e) = self.persist(&entries, key) {
                warn!("[LOCAL_STORE] Failed to remove '{}': {}", key, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_prefixed_and_path_normalized() {
        assert_eq!(cache_key(DEFAULT_PREFIX, "events"), "celebration_events");
        assert_eq!(cache_key("app_", "/gallery/upload/"), "app_gallery_upload");
    }

    #[test]
    fn memory_store_rejects_writes_over_quota_and_keeps_old_value() {
        let store = MemoryStore::with_quota(20);
        store.set("k", "small").unwrap();
        let err = store.set("k", "this value is far too large").unwrap_err();
        assert_eq!(err.key, "k");
        assert_eq!(store.get("k").as_deref(), Some("small"));
    }

    #[test]
    fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cache.json");
        FileStore::new(&path, DEFAULT_QUOTA_BYTES).set("a", "[1]").unwrap();

        let reopened = FileStore::new(&path, DEFAULT_QUOTA_BYTES);
        assert_eq!(reopened.get("a").as_deref(), Some("[1]"));
        reopened.remove("a");
        assert_eq!(reopened.get("a"), None);
    }

    #[test]
    fn file_store_treats_corrupt_file_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, "{not json").unwrap();
        let store = FileStore::new(&path, DEFAULT_QUOTA_BYTES);
        assert_eq!(store.get("a"), None);
        store.set("a", "1").unwrap();
        assert_eq!(store.get("a").as_deref(), Some("1"));
    }

    #[test]
    fn two_handles_on_one_file_lose_the_interleaved_write() {
        // Accepted limitation: no cross-process locking or merging.
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        let tab_a = FileStore::new(&path, DEFAULT_QUOTA_BYTES);
        let tab_b = FileStore::new(&path, DEFAULT_QUOTA_BYTES);
        tab_a.set("notes", r#"[{"id":"n0"}]"#).unwrap();

        let snapshot_a = tab_a.get("notes").unwrap();
        tab_b.set("notes", r#"[{"id":"n0"},{"id":"from_b"}]"#).unwrap();
        let mut list: Vec<serde_json::Value> = serde_json::from_str(&snapshot_a).unwrap();
        list.push(serde_json::json!({"id": "from_a"}));
        tab_a.set("notes", &serde_json::to_string(&list).unwrap()).unwrap();

        let final_list = tab_b.get("notes").unwrap();
        assert!(final_list.contains("from_a"));
        assert!(!final_list.contains("from_b"));
    }
}
