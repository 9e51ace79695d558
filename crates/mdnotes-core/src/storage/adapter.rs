//! Typed storage adapter
//!
//! Wraps a [`KvBackend`] with JSON (de)serialization. Reads never fail:
//! a missing key, an unreadable medium or a corrupt value all yield the
//! caller's default. Writes report failures but never panic.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error, warn};

use super::backend::KvBackend;
use super::error::{StorageError, StorageResult};

/// JSON key-value adapter over a raw backend
pub struct Storage<B> {
    backend: B,
}

impl<B: KvBackend> Storage<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Get the underlying backend
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Read and parse the value under `key`.
    ///
    /// Returns `Ok(None)` for a missing key and `CorruptValue` if the stored
    /// text is not valid JSON for `T`.
    pub fn try_read<T: DeserializeOwned>(&self, key: &str) -> StorageResult<Option<T>> {
        let Some(raw) = self.backend.get(key)? else {
            return Ok(None);
        };

        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| StorageError::CorruptValue {
                key: key.to_string(),
                details: e.to_string(),
            })
    }

    /// Read the value under `key`, falling back to `default`.
    pub fn read<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        match self.try_read(key) {
            Ok(Some(value)) => value,
            Ok(None) => {
                debug!(key, "No stored value, using default");
                default
            }
            Err(e) => {
                warn!(key, backend = %self.backend.describe(), error = %e, "Failed to read stored value, using default");
                default
            }
        }
    }

    /// Serialize `value` and store it under `key`.
    pub fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> StorageResult<()> {
        let result = serde_json::to_string(value)
            .map_err(|source| StorageError::Serialize {
                key: key.to_string(),
                source,
            })
            .and_then(|raw| self.backend.set(key, &raw));

        if let Err(e) = &result {
            error!(key, backend = %self.backend.describe(), error = %e, "Failed to persist value");
        }
        result
    }

    /// Remove the value under `key`.
    pub fn remove(&self, key: &str) -> StorageResult<()> {
        self.backend.remove(key)
    }

    /// Remove every stored key.
    pub fn clear(&self) -> StorageResult<()> {
        for key in self.backend.keys()? {
            self.backend.remove(&key)?;
        }
        Ok(())
    }
}

/// Storage over a backend chosen at runtime
pub type DynStorage = Storage<Box<dyn KvBackend>>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryBackend;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        name: String,
        count: u32,
    }

    #[test]
    fn test_missing_key_returns_default() {
        let storage = Storage::new(MemoryBackend::new());
        let value: Vec<String> = storage.read("missing", vec!["default".to_string()]);
        assert_eq!(value, vec!["default".to_string()]);
    }

    #[test]
    fn test_write_then_read() {
        let storage = Storage::new(MemoryBackend::new());
        let sample = Sample {
            name: "a".to_string(),
            count: 3,
        };

        storage.write("sample", &sample).unwrap();

        let loaded: Option<Sample> = storage.try_read("sample").unwrap();
        assert_eq!(loaded, Some(sample));
    }

    #[test]
    fn test_corrupt_value_falls_back() {
        let backend = MemoryBackend::new();
        backend.insert_raw("sample", "{not json");
        let storage = Storage::new(backend);

        assert!(matches!(
            storage.try_read::<Sample>("sample"),
            Err(StorageError::CorruptValue { .. })
        ));

        let value = storage.read("sample", Sample {
            name: "fallback".to_string(),
            count: 0,
        });
        assert_eq!(value.name, "fallback");
    }

    #[test]
    fn test_wrong_shape_falls_back() {
        let backend = MemoryBackend::new();
        backend.insert_raw("count", "\"seven\"");
        let storage = Storage::new(backend);

        assert_eq!(storage.read("count", 7u32), 7);
    }

    #[test]
    fn test_unavailable_read_falls_back() {
        let backend = MemoryBackend::new();
        backend.insert_raw("count", "3");
        backend.set_fail_reads(true);
        let storage = Storage::new(backend);

        assert_eq!(storage.read("count", 0u32), 0);
    }

    #[test]
    fn test_write_failure_is_reported() {
        let backend = MemoryBackend::new();
        backend.set_fail_writes(true);
        let storage = Storage::new(backend);

        let err = storage.write("count", &1u32).unwrap_err();
        assert!(matches!(err, StorageError::Unavailable(_)));
    }

    #[test]
    fn test_clear_removes_everything() {
        let storage = Storage::new(MemoryBackend::new());
        storage.write("a", &1u32).unwrap();
        storage.write("b", &2u32).unwrap();

        storage.clear().unwrap();

        assert!(storage.backend().keys().unwrap().is_empty());
    }
}
