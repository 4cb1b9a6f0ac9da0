//! Key/value storage behind the snapshot cache

use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage encoding error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A stored payload and the time it was captured
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// Compressed payload string
    pub payload: String,
    /// Capture time, epoch milliseconds
    pub captured_at_ms: i64,
}

impl CacheEntry {
    pub fn new(payload: impl Into<String>, captured_at_ms: i64) -> Self {
        Self {
            payload: payload.into(),
            captured_at_ms,
        }
    }

    /// Whether the entry may still be served at `now_ms`
    ///
    /// Entries stamped in the future (or too far apart to subtract) are
    /// never fresh.
    pub fn is_fresh(&self, now_ms: i64, window_ms: i64) -> bool {
        let Some(age) = now_ms.checked_sub(self.captured_at_ms) else {
            return false;
        };
        (0..window_ms).contains(&age)
    }
}

/// Minimal key/value interface for persisted cache entries
pub trait CacheStore: Send + Sync {
    fn get(&self, key: &str) -> Option<CacheEntry>;
    fn set(&self, key: &str, entry: CacheEntry) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Source of wall-clock time in epoch milliseconds
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

/// Clock backed by the system time
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Clock that only moves when told to
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: AtomicI64,
}

impl ManualClock {
    pub fn new(now_ms: i64) -> Self {
        Self {
            now_ms: AtomicI64::new(now_ms),
        }
    }

    pub fn advance_ms(&self, ms: i64) {
        self.now_ms.fetch_add(ms, Ordering::SeqCst);
    }

    pub fn set_ms(&self, ms: i64) {
        self.now_ms.store(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

/// In-process store
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheStore for MemoryStore {
    fn get(&self, key: &str) -> Option<CacheEntry> {
        self.entries().get(key).cloned()
    }

    fn set(&self, key: &str, entry: CacheEntry) -> Result<(), StoreError> {
        self.entries().insert(key.to_string(), entry);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries().remove(key);
        Ok(())
    }
}

/// File-backed store laid out like browser local storage
///
/// The file is a flat JSON object of string values. Each cache domain owns
/// two keys: `{domain}Data` holds the payload and `{domain}DataTimestamp`
/// the capture time in epoch milliseconds.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn data_key(domain: &str) -> String {
        format!("{}Data", domain)
    }

    fn timestamp_key(domain: &str) -> String {
        format!("{}DataTimestamp", domain)
    }

    /// Read the whole key/value map; a missing or unreadable file is empty
    fn read_map(&self) -> BTreeMap<String, String> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(path = %self.path.display(), error = %e, "Cache file unreadable");
                }
                return BTreeMap::new();
            }
        };

        serde_json::from_str(&content).unwrap_or_else(|e| {
            tracing::warn!(path = %self.path.display(), error = %e, "Cache file corrupt, ignoring");
            BTreeMap::new()
        })
    }

    fn write_map(&self, map: &BTreeMap<String, String>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, serde_json::to_vec(map)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn update(
        &self,
        f: impl FnOnce(&mut BTreeMap<String, String>),
    ) -> Result<(), StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut map = self.read_map();
        f(&mut map);
        self.write_map(&map)
    }
}

impl CacheStore for FileStore {
    fn get(&self, key: &str) -> Option<CacheEntry> {
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let map = self.read_map();
        let payload = map.get(&Self::data_key(key))?;
        let captured_at_ms = map.get(&Self::timestamp_key(key))?.parse().ok()?;
        Some(CacheEntry::new(payload.clone(), captured_at_ms))
    }

    fn set(&self, key: &str, entry: CacheEntry) -> Result<(), StoreError> {
        self.update(|map| {
            map.insert(Self::data_key(key), entry.payload);
            map.insert(Self::timestamp_key(key), entry.captured_at_ms.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.update(|map| {
            map.remove(&Self::data_key(key));
            map.remove(&Self::timestamp_key(key));
        })
    }
}
