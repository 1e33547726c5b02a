//! Core types and shared functionality for bandrelay.
//!
//! This crate provides:
//! - TTL cache over a key/value medium, with a SQLite backend
//! - Group-paced batch fetcher
//! - Unified error types
//! - Configuration structures

pub mod batch;
pub mod cache;
pub mod config;
pub mod error;
pub mod time;

pub use batch::{BatchFetcher, BatchOptions, BatchResult, FetchFailure, FetchItem};
pub use cache::{CacheDb, CacheHit, CacheKey, CacheStore, KvStore, MemoryKv};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
