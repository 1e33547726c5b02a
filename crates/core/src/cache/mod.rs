//! TTL cache for extracted records.
//!
//! This module provides a keyed cache with lazy expiry over any `KvStore`
//! medium. It supports:
//!
//! - Namespaced keys built from a full SHA-256 digest of the identity
//! - Read-time expiry with non-blocking eviction of stale entries
//! - Namespace and prefix sweeps
//! - A SQLite medium (WAL mode, versioned migrations) and an in-memory one

pub mod connection;
pub mod entries;
pub mod key;
pub mod kv;
pub mod migrations;
pub mod store;

pub use crate::Error;

pub use connection::CacheDb;
pub use key::{CacheKey, derive_key, list_identity};
pub use kv::{KvStore, MemoryKv};
pub use store::{CacheConfig, CacheHit, CacheStore, DEFAULT_KEY_PREFIX, DEFAULT_TTL};
