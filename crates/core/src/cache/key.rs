//! Namespaced cache key derivation.
//!
//! Keys have the shape `{prefix}:{namespace}:{digest}` where `digest` is the
//! full hex SHA-256 of the identity. The digest never contains `:`, so the
//! namespace is always everything between the prefix and the last separator.

use sha2::{Digest, Sha256};
use std::fmt;

const SEPARATOR: char = ':';

/// An opaque, deterministic cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Wrap a raw key read back from the medium.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Split the key into `(prefix, namespace)`.
    ///
    /// Returns `None` for keys that were not produced by [`derive_key`].
    pub fn scope(&self) -> Option<(&str, &str)> {
        let (scope, digest) = self.0.rsplit_once(SEPARATOR)?;
        if digest.len() != 64 || !digest.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        scope.split_once(SEPARATOR)
    }

    /// Whether this key lives under `prefix`.
    pub fn has_prefix(&self, prefix: &str) -> bool {
        self.scope().is_some_and(|(p, _)| p == prefix)
    }

    /// Whether this key lives under exactly `prefix` and `namespace`.
    pub fn in_namespace(&self, prefix: &str, namespace: &str) -> bool {
        self.scope().is_some_and(|(p, ns)| p == prefix && ns == namespace)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Derive the cache key for `identity` within `namespace`.
pub fn derive_key(prefix: &str, namespace: &str, identity: &str) -> CacheKey {
    let mut hasher = Sha256::new();
    hasher.update(identity.as_bytes());
    let digest = hex::encode(hasher.finalize());
    CacheKey(format!("{prefix}{SEPARATOR}{namespace}{SEPARATOR}{digest}"))
}

/// Build one identity from a list of identities, independent of their order.
pub fn list_identity<S: AsRef<str>>(items: &[S]) -> String {
    let mut sorted: Vec<&str> = items.iter().map(AsRef::as_ref).collect();
    sorted.sort_unstable();
    sorted.join("\n")
}
