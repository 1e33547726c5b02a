//! TTL cache over a key/value medium.
//!
//! Entries are written as `{ value, captured_at }` and read back as misses
//! once they are `ttl` old or older. Stale entries are removed by a spawned
//! task so the miss is returned without waiting on the medium. That task only
//! deletes the exact value the read saw, so a `set` landing in between wins.

use chrono::{DateTime, TimeDelta, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinSet;

use super::key::{CacheKey, derive_key};
use super::kv::KvStore;
use crate::Error;
use crate::time::{Clock, SystemClock};

/// Default time-to-live for every entry (30 minutes).
pub const DEFAULT_TTL: Duration = Duration::from_secs(30 * 60);

/// Default key prefix shared by every namespace.
pub const DEFAULT_KEY_PREFIX: &str = "bandrelay";

/// Store-wide cache settings.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Age at which an entry stops being served.
    pub ttl: Duration,
    /// Prefix carried by every key this store writes.
    pub key_prefix: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl: DEFAULT_TTL, key_prefix: DEFAULT_KEY_PREFIX.to_string() }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry<T> {
    value: T,
    captured_at: DateTime<Utc>,
}

/// A fresh value together with the time it was captured.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheHit<T> {
    pub value: T,
    pub captured_at: DateTime<Utc>,
}

/// TTL-keyed cache shared by every request.
pub struct CacheStore {
    kv: Arc<dyn KvStore>,
    config: CacheConfig,
    ttl: TimeDelta,
    clock: Arc<dyn Clock>,
    evictions: Mutex<JoinSet<()>>,
}

impl fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheStore")
            .field("medium", &self.kv.name())
            .field("config", &self.config)
            .finish()
    }
}

impl CacheStore {
    /// Create a store over `kv` using the system clock.
    pub fn new(kv: Arc<dyn KvStore>, config: CacheConfig) -> Self {
        let ttl = TimeDelta::from_std(config.ttl).unwrap_or(TimeDelta::MAX);
        Self { kv, config, ttl, clock: Arc::new(SystemClock), evictions: Mutex::new(JoinSet::new()) }
    }

    /// Replace the clock used for capture timestamps and expiry.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Derive the key for `identity` in `namespace` under this store's prefix.
    pub fn derive_key(&self, namespace: &str, identity: &str) -> CacheKey {
        derive_key(&self.config.key_prefix, namespace, identity)
    }

    /// Look up a fresh value.
    ///
    /// Returns `Ok(None)` when the key is absent, expired or no longer decodes
    /// as `T`. Medium failures are returned as errors, never as misses.
    pub async fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> Result<Option<CacheHit<T>>, Error> {
        let raw_key = key.as_str().to_string();
        let mut found = self.kv.get(std::slice::from_ref(&raw_key)).await?;

        let Some(raw) = found.remove(&raw_key) else {
            tracing::debug!(%key, "cache miss");
            return Ok(None);
        };

        let entry: CacheEntry<T> = match serde_json::from_value(raw.clone()) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(%key, error = %e, "undecodable cache entry, evicting");
                self.evict(raw_key, raw);
                return Ok(None);
            }
        };

        if !self.is_fresh(entry.captured_at) {
            tracing::debug!(%key, captured_at = %entry.captured_at, "cache entry expired");
            self.evict(raw_key, raw);
            return Ok(None);
        }

        tracing::debug!(%key, captured_at = %entry.captured_at, "cache hit");
        Ok(Some(CacheHit { value: entry.value, captured_at: entry.captured_at }))
    }

    /// Write `value` under `key`, replacing any previous entry.
    ///
    /// Returns the capture timestamp stored with the value.
    pub async fn set<T: Serialize>(&self, key: &CacheKey, value: &T) -> Result<DateTime<Utc>, Error> {
        let captured_at = self.clock.now();
        let entry = CacheEntry { value, captured_at };
        let json = serde_json::to_value(&entry).map_err(Error::storage)?;

        self.kv.set(HashMap::from([(key.as_str().to_string(), json)])).await?;
        tracing::debug!(%key, %captured_at, "cache write");

        Ok(captured_at)
    }

    /// Remove every key in `namespace` and return how many were removed.
    ///
    /// Walks the whole medium, since it has no prefix index.
    pub async fn clear_namespace(&self, namespace: &str) -> Result<usize, Error> {
        let prefix = self.config.key_prefix.as_str();
        let removed = self.sweep(|key| key.in_namespace(prefix, namespace)).await?;
        tracing::info!(namespace, removed, "cleared cache namespace");
        Ok(removed)
    }

    /// Remove every key carrying this store's prefix.
    pub async fn clear_all(&self) -> Result<usize, Error> {
        let prefix = self.config.key_prefix.as_str();
        let removed = self.sweep(|key| key.has_prefix(prefix)).await?;
        tracing::info!(prefix, removed, "cleared cache");
        Ok(removed)
    }

    /// Wait for every pending lazy eviction to finish.
    pub async fn settle_evictions(&self) {
        let mut pending = std::mem::take(&mut *self.evictions.lock().unwrap_or_else(|e| e.into_inner()));
        while let Some(joined) = pending.join_next().await {
            if let Err(e) = joined {
                tracing::warn!(error = %e, "eviction task panicked");
            }
        }
    }

    fn is_fresh(&self, captured_at: DateTime<Utc>) -> bool {
        self.clock.now() - captured_at < self.ttl
    }

    /// Queue removal of `key` while it still holds `stale`.
    fn evict(&self, key: String, stale: serde_json::Value) {
        let kv = Arc::clone(&self.kv);
        let mut evictions = self.evictions.lock().unwrap_or_else(|e| e.into_inner());
        while evictions.try_join_next().is_some() {}
        evictions.spawn(async move {
            match kv.remove_if(&key, &stale).await {
                Ok(true) => tracing::debug!(%key, "evicted stale cache entry"),
                Ok(false) => tracing::debug!(%key, "cache entry rewritten before eviction, kept"),
                Err(e) => tracing::warn!(%key, error = %e, "failed to evict stale cache entry"),
            }
        });
    }

    async fn sweep(&self, matches: impl Fn(&CacheKey) -> bool) -> Result<usize, Error> {
        let doomed: Vec<String> = self
            .kv
            .get_all()
            .await?
            .into_keys()
            .filter(|k| matches(&CacheKey::from_raw(k.as_str())))
            .collect();

        if !doomed.is_empty() {
            self.kv.remove(&doomed).await?;
        }

        Ok(doomed.len())
    }
}
