//! # Storage
//!
//! Namespaced key/value persistence used by the rate limiter, the XP ledger and
//! the credibility cache. Values are JSON strings.
//!
//! - `MemoryStorage`: process-local map, the default for tests and single-node dev.
//! - `JsonFileStorage`: whole map persisted as one JSON document; every write
//!   goes to a temp file that is renamed over the target.
//! - `KeyLocks`: per-key mutexes so read-modify-write cycles on one identity are
//!   serialized while different identities proceed in parallel.

use serde::{de::DeserializeOwned, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("storage io error: {0}")]
    Io(#[from] io::Error),

    #[error("storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("storage lock poisoned")]
    Poisoned,
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Persistence collaborator. Implementations must give read-your-writes
/// consistency within one process.
pub trait Storage: Send + Sync {
    fn get(&self, key: &str) -> StorageResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;
    fn remove(&self, key: &str) -> StorageResult<()>;
    /// All `(key, value)` pairs whose key starts with `prefix`, ordered by key.
    fn scan_prefix(&self, prefix: &str) -> StorageResult<Vec<(String, String)>>;
}

pub type DynStorage = Arc<dyn Storage>;

/// Read and decode a JSON value.
pub fn load_json<T: DeserializeOwned>(store: &dyn Storage, key: &str) -> StorageResult<Option<T>> {
    match store.get(key)? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

/// Encode and write a JSON value.
pub fn save_json<T: Serialize>(store: &dyn Storage, key: &str, value: &T) -> StorageResult<()> {
    let raw = serde_json::to_string(value)?;
    store.set(key, &raw)
}

/* ----------------------------
In-memory backend
---------------------------- */

#[derive(Debug, Default)]
pub struct MemoryStorage {
    inner: RwLock<BTreeMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> DynStorage {
        Arc::new(Self::new())
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let map = self.inner.read().map_err(|_| StorageError::Poisoned)?;
        Ok(map.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut map = self.inner.write().map_err(|_| StorageError::Poisoned)?;
        map.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let mut map = self.inner.write().map_err(|_| StorageError::Poisoned)?;
        map.remove(key);
        Ok(())
    }

    fn scan_prefix(&self, prefix: &str) -> StorageResult<Vec<(String, String)>> {
        let map = self.inner.read().map_err(|_| StorageError::Poisoned)?;
        Ok(scan(&map, prefix))
    }
}

/* ----------------------------
JSON file backend
---------------------------- */

/// File-backed store. The whole map is cached in memory and flushed on
/// every mutation.
#[derive(Debug)]
pub struct JsonFileStorage {
    path: PathBuf,
    inner: RwLock<BTreeMap<String, String>>,
}

impl JsonFileStorage {
    /// Open (or lazily create) the store at `path`. A missing file is an empty
    /// store; an unreadable or corrupt file is an error.
    pub fn open<P: AsRef<Path>>(path: P) -> StorageResult<Self> {
        let path = path.as_ref().to_path_buf();
        let map = match fs::read_to_string(&path) {
            Ok(s) if s.trim().is_empty() => BTreeMap::new(),
            Ok(s) => serde_json::from_str(&s)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path,
            inner: RwLock::new(map),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, map: &BTreeMap<String, String>) -> StorageResult<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        let body = serde_json::to_vec_pretty(map)?;
        fs::write(&tmp, body)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl Storage for JsonFileStorage {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let map = self.inner.read().map_err(|_| StorageError::Poisoned)?;
        Ok(map.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut map = self.inner.write().map_err(|_| StorageError::Poisoned)?;
        let previous = map.insert(key.to_string(), value.to_string());
        if let Err(e) = self.flush(&map) {
            // Keep memory and disk in agreement.
            match previous {
                Some(v) => map.insert(key.to_string(), v),
                None => map.remove(key),
            };
            warn!(target: "storage", error = %e, path = %self.path.display(), "flush failed");
            return Err(e);
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let mut map = self.inner.write().map_err(|_| StorageError::Poisoned)?;
        if let Some(previous) = map.remove(key) {
            if let Err(e) = self.flush(&map) {
                map.insert(key.to_string(), previous);
                return Err(e);
            }
        }
        Ok(())
    }

    fn scan_prefix(&self, prefix: &str) -> StorageResult<Vec<(String, String)>> {
        let map = self.inner.read().map_err(|_| StorageError::Poisoned)?;
        Ok(scan(&map, prefix))
    }
}

fn scan(map: &BTreeMap<String, String>, prefix: &str) -> Vec<(String, String)> {
    map.range(prefix.to_string()..)
        .take_while(|(k, _)| k.starts_with(prefix))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/* ----------------------------
Per-key locking
---------------------------- */

/// Registry of per-key mutexes. Entries are dropped again once no caller
/// holds or waits on them.
#[derive(Debug, Default)]
pub struct KeyLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl KeyLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` while holding the lock for `key`.
    pub fn with_lock<T>(&self, key: &str, f: impl FnOnce() -> T) -> StorageResult<T> {
        let slot = {
            let mut locks = self.locks.lock().map_err(|_| StorageError::Poisoned)?;
            locks
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };

        let out = {
            let _guard = slot.lock().map_err(|_| StorageError::Poisoned)?;
            f()
        };

        let mut locks = self.locks.lock().map_err(|_| StorageError::Poisoned)?;
        // Registry + our clone: nobody else is waiting.
        if Arc::strong_count(&slot) == 2 {
            locks.remove(key);
        }
        Ok(out)
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.lock().map(|l| l.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_roundtrip_and_prefix_scan() {
        let s = MemoryStorage::new();
        s.set("xp:a", "1").unwrap();
        s.set("xp:b", "2").unwrap();
        s.set("ratelimit:a", "3").unwrap();

        assert_eq!(s.get("xp:a").unwrap().as_deref(), Some("1"));
        assert_eq!(s.get("missing").unwrap(), None);

        let xp = s.scan_prefix("xp:").unwrap();
        assert_eq!(xp.len(), 2);
        assert_eq!(xp[0].0, "xp:a");

        s.remove("xp:a").unwrap();
        assert_eq!(s.scan_prefix("xp:").unwrap().len(), 1);
    }

    #[test]
    fn file_storage_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("kleo.json");

        {
            let s = JsonFileStorage::open(&path).unwrap();
            s.set("xp:0xabc", r#"{"total_xp":6}"#).unwrap();
            s.set("ratelimit:0xabc", "{}").unwrap();
            s.remove("ratelimit:0xabc").unwrap();
        }

        let reopened = JsonFileStorage::open(&path).unwrap();
        assert_eq!(
            reopened.get("xp:0xabc").unwrap().as_deref(),
            Some(r#"{"total_xp":6}"#)
        );
        assert_eq!(reopened.get("ratelimit:0xabc").unwrap(), None);
    }

    #[test]
    fn file_storage_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kleo.json");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            JsonFileStorage::open(&path),
            Err(StorageError::Serialization(_))
        ));
    }

    #[test]
    fn json_helpers_decode_typed_values() {
        #[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug)]
        struct Rec {
            n: u32,
        }
        let s = MemoryStorage::new();
        save_json(&s, "k", &Rec { n: 7 }).unwrap();
        let back: Option<Rec> = load_json(&s, "k").unwrap();
        assert_eq!(back, Some(Rec { n: 7 }));

        s.set("bad", "nope").unwrap();
        assert!(load_json::<Rec>(&s, "bad").is_err());
    }

    #[test]
    fn key_locks_release_entries() {
        let locks = KeyLocks::new();
        let v = locks.with_lock("a", || 41 + 1).unwrap();
        assert_eq!(v, 42);
        assert_eq!(locks.len(), 0);
    }
}
