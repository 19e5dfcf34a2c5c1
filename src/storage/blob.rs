use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::errors::AppResult;
use crate::storage::memory::MemoryBackend;
use crate::storage::traits::BlobBackend;

pub const DEFAULT_NAMESPACE: &str = "contabilNews";

/// Whole-collection JSON storage on top of a [`BlobBackend`].
///
/// Every read deserializes and every write serializes, so callers only ever
/// hold independent copies of stored data.
#[derive(Clone)]
pub struct BlobStore {
    backend: Arc<dyn BlobBackend>,
    namespace: String,
}

impl BlobStore {
    pub fn new(backend: Arc<dyn BlobBackend>) -> Self {
        Self {
            backend,
            namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()))
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// `<namespace>:<collection>`, e.g. `contabilNews:news`.
    pub fn key_for(&self, collection: &str) -> String {
        format!("{}:{}", self.namespace, collection)
    }

    /// Reads the array stored under `key`.
    ///
    /// A missing key, or a value that is not a JSON array, is replaced by
    /// `fallback` (written back) and the fallback is returned. Individual
    /// elements that no longer match `T` are dropped with a warning.
    pub fn read<T>(&self, key: &str, fallback: &[T]) -> AppResult<Vec<T>>
    where
        T: Serialize + DeserializeOwned + Clone,
    {
        let raw = match self.backend.get(key)? {
            Some(raw) if !raw.trim().is_empty() => raw,
            _ => return self.restore(key, fallback),
        };

        let items = match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Array(items)) => items,
            Ok(_) => {
                warn!(key, "stored value is not an array, restoring defaults");
                return self.restore(key, fallback);
            }
            Err(e) => {
                warn!(key, error = %e, "failed to parse stored collection, restoring defaults");
                return self.restore(key, fallback);
            }
        };

        let mut records = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            match serde_json::from_value(item) {
                Ok(record) => records.push(record),
                Err(e) => warn!(key, index, error = %e, "dropping unreadable record"),
            }
        }
        Ok(records)
    }

    pub fn write<T: Serialize>(&self, key: &str, data: &[T]) -> AppResult<()> {
        let raw = serde_json::to_string(data)?;
        self.backend.set(key, &raw)
    }

    pub fn clear(&self, key: &str) -> AppResult<()> {
        self.backend.remove(key)
    }

    fn restore<T>(&self, key: &str, fallback: &[T]) -> AppResult<Vec<T>>
    where
        T: Serialize + Clone,
    {
        self.write(key, fallback)?;
        Ok(fallback.to_vec())
    }
}
