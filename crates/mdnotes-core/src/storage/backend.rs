//! Raw key-value backends
//!
//! A [`KvBackend`] stores opaque string values under string keys. It knows
//! nothing about notes or JSON; [`Storage`](super::Storage) layers typed
//! access and fallback behavior on top.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use super::error::{StorageError, StorageResult};

/// Abstract interface for a durable local key-value medium.
///
/// All methods take `&self`; backends that need mutation use interior
/// mutability since the whole system is single-threaded.
pub trait KvBackend {
    /// Read the raw value for `key`.
    /// Returns Ok(None) if the key has never been written.
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Remove `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> StorageResult<()>;

    /// List all stored keys.
    fn keys(&self) -> StorageResult<Vec<String>>;

    /// Short human-readable description, used in logs.
    fn describe(&self) -> String;
}

impl<B: KvBackend + ?Sized> KvBackend for Box<B> {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        (**self).remove(key)
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        (**self).keys()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

#[derive(Default)]
struct MemoryState {
    entries: BTreeMap<String, String>,
    quota: Option<usize>,
    fail_reads: bool,
    fail_writes: bool,
    writes: usize,
}

impl MemoryState {
    fn used_bytes_without(&self, key: &str) -> usize {
        self.entries
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| k.len() + v.len())
            .sum()
    }
}

/// In-memory backend.
///
/// Clones share the same underlying map, so a test can keep a handle,
/// hand a clone to a store, and later hydrate a second store from the same
/// data to simulate a restart.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    state: Rc<RefCell<MemoryState>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend that rejects writes once keys plus values would
    /// exceed `bytes` in total.
    pub fn with_quota(bytes: usize) -> Self {
        let backend = Self::default();
        backend.state.borrow_mut().quota = Some(bytes);
        backend
    }

    /// Make every read fail as if the medium were unavailable.
    pub fn set_fail_reads(&self, fail: bool) {
        self.state.borrow_mut().fail_reads = fail;
    }

    /// Make every write fail as if the medium were unavailable.
    pub fn set_fail_writes(&self, fail: bool) {
        self.state.borrow_mut().fail_writes = fail;
    }

    /// Number of successful `set` calls since creation.
    pub fn write_count(&self) -> usize {
        self.state.borrow().writes
    }

    /// Store a raw value without any checks (for seeding test fixtures).
    pub fn insert_raw(&self, key: &str, value: &str) {
        self.state
            .borrow_mut()
            .entries
            .insert(key.to_string(), value.to_string());
    }

    /// Peek at a raw value without going through the failure switches.
    pub fn raw(&self, key: &str) -> Option<String> {
        self.state.borrow().entries.get(key).cloned()
    }
}

impl KvBackend for MemoryBackend {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let state = self.state.borrow();
        if state.fail_reads {
            return Err(StorageError::Unavailable(
                "memory backend reads disabled".to_string(),
            ));
        }
        Ok(state.entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut state = self.state.borrow_mut();
        if state.fail_writes {
            return Err(StorageError::Unavailable(
                "memory backend writes disabled".to_string(),
            ));
        }
        if let Some(quota) = state.quota {
            let needed = state.used_bytes_without(key) + key.len() + value.len();
            if needed > quota {
                return Err(StorageError::QuotaExceeded {
                    key: key.to_string(),
                    needed,
                    quota,
                });
            }
        }
        state.entries.insert(key.to_string(), value.to_string());
        state.writes += 1;
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let mut state = self.state.borrow_mut();
        if state.fail_writes {
            return Err(StorageError::Unavailable(
                "memory backend writes disabled".to_string(),
            ));
        }
        state.entries.remove(key);
        Ok(())
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        Ok(self.state.borrow().entries.keys().cloned().collect())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
