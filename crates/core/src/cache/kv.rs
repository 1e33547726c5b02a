//! Key/value medium abstraction.
//!
//! The cache only needs batch get/set/remove and a full enumeration. Values
//! are structured JSON so records round-trip without loss.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::Error;

/// A persistent key/value store accessed asynchronously.
///
/// Implementations must apply each call atomically with respect to other
/// calls; the cache adds no locking of its own.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// A short name for logs.
    fn name(&self) -> &'static str;

    /// Fetch the given keys. Missing keys are absent from the returned map.
    async fn get(&self, keys: &[String]) -> Result<HashMap<String, Value>, Error>;

    /// Write every entry, overwriting existing values.
    async fn set(&self, entries: HashMap<String, Value>) -> Result<(), Error>;

    /// Remove the given keys. Unknown keys are ignored.
    async fn remove(&self, keys: &[String]) -> Result<(), Error>;

    /// Remove `key` only while it still holds `expected`.
    ///
    /// Returns whether the entry was removed. Must be atomic with respect to
    /// `set` on the same key.
    async fn remove_if(&self, key: &str, expected: &Value) -> Result<bool, Error>;

    /// Enumerate the whole store.
    async fn get_all(&self) -> Result<HashMap<String, Value>, Error>;
}

/// Process-local medium backed by a `HashMap`.
#[derive(Debug, Clone, Default)]
pub struct MemoryKv {
    entries: Arc<RwLock<HashMap<String, Value>>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl KvStore for MemoryKv {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, keys: &[String]) -> Result<HashMap<String, Value>, Error> {
        let entries = self.entries.read().await;
        Ok(keys
            .iter()
            .filter_map(|k| entries.get(k).map(|v| (k.clone(), v.clone())))
            .collect())
    }

    async fn set(&self, entries: HashMap<String, Value>) -> Result<(), Error> {
        self.entries.write().await.extend(entries);
        Ok(())
    }

    async fn remove(&self, keys: &[String]) -> Result<(), Error> {
        let mut entries = self.entries.write().await;
        for key in keys {
            entries.remove(key);
        }
        Ok(())
    }

    async fn remove_if(&self, key: &str, expected: &Value) -> Result<bool, Error> {
        let mut entries = self.entries.write().await;
        if entries.get(key) == Some(expected) {
            entries.remove(key);
            return Ok(true);
        }
        Ok(false)
    }

    async fn get_all(&self) -> Result<HashMap<String, Value>, Error> {
        Ok(self.entries.read().await.clone())
    }
}
