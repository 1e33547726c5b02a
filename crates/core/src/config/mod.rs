//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (BANDRELAY_*)
//! 2. TOML config file (if BANDRELAY_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::batch::BatchOptions;
use crate::cache::{CacheConfig, DEFAULT_KEY_PREFIX};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (BANDRELAY_*)
/// 2. TOML config file (if BANDRELAY_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to SQLite cache database.
    ///
    /// Set via BANDRELAY_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Age in seconds at which cached records stop being served.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Prefix of every cache key. Must not contain `:`.
    #[serde(default = "default_cache_key_prefix")]
    pub cache_key_prefix: String,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via BANDRELAY_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per page.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// HTTP request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Album pages fetched at once.
    #[serde(default = "default_batch_concurrency")]
    pub batch_concurrency: usize,

    /// Pause between two groups of album fetches, in milliseconds.
    #[serde(default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,

    /// Lower bound of the random pause before each album fetch.
    #[serde(default = "default_jitter_min_ms")]
    pub jitter_min_ms: u64,

    /// Upper bound of the random pause before each album fetch.
    #[serde(default = "default_jitter_max_ms")]
    pub jitter_max_ms: u64,

    /// Base URL of the remote API records are relayed to.
    ///
    /// Relaying is disabled when unset.
    #[serde(default)]
    pub api_base_url: Option<String>,

    /// Token sent in the `Authorization` header of relay requests.
    ///
    /// Set via BANDRELAY_API_TOKEN environment variable.
    #[serde(default)]
    pub api_token: Option<String>,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./bandrelay-cache.sqlite")
}

fn default_cache_ttl_secs() -> u64 {
    30 * 60
}

fn default_cache_key_prefix() -> String {
    DEFAULT_KEY_PREFIX.into()
}

fn default_user_agent() -> String {
    "bandrelay/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_batch_concurrency() -> usize {
    2
}

fn default_batch_delay_ms() -> u64 {
    1_000
}

fn default_jitter_min_ms() -> u64 {
    500
}

fn default_jitter_max_ms() -> u64 {
    1_500
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            cache_ttl_secs: default_cache_ttl_secs(),
            cache_key_prefix: default_cache_key_prefix(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
            batch_concurrency: default_batch_concurrency(),
            batch_delay_ms: default_batch_delay_ms(),
            jitter_min_ms: default_jitter_min_ms(),
            jitter_max_ms: default_jitter_max_ms(),
            api_base_url: None,
            api_token: None,
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig { ttl: self.cache_ttl(), key_prefix: self.cache_key_prefix.clone() }
    }

    pub fn batch_options(&self) -> BatchOptions {
        BatchOptions {
            concurrency: self.batch_concurrency,
            inter_batch_delay: Duration::from_millis(self.batch_delay_ms),
        }
    }

    /// Jitter bounds as `(min, max)` durations.
    pub fn jitter_bounds(&self) -> (Duration, Duration) {
        (Duration::from_millis(self.jitter_min_ms), Duration::from_millis(self.jitter_max_ms))
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `BANDRELAY_`
    /// 2. TOML file from `BANDRELAY_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("BANDRELAY_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("BANDRELAY_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// The relay endpoint and token, when relaying is configured.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if the base URL is set without a token.
    pub fn relay_endpoint(&self) -> Result<Option<(&str, &str)>, ConfigError> {
        let Some(base_url) = self.api_base_url.as_deref() else {
            return Ok(None);
        };
        let token = self.api_token.as_deref().ok_or_else(|| ConfigError::Missing {
            field: "api_token".into(),
            hint: "Set BANDRELAY_API_TOKEN environment variable".into(),
        })?;
        Ok(Some((base_url, token)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.db_path, PathBuf::from("./bandrelay-cache.sqlite"));
        assert_eq!(config.cache_ttl(), Duration::from_secs(1800));
        assert_eq!(config.cache_key_prefix, "bandrelay");
        assert_eq!(config.user_agent, "bandrelay/0.1");
        assert_eq!(config.batch_concurrency, 2);
        assert_eq!(config.batch_delay_ms, 1_000);
        assert!(config.api_base_url.is_none());
        assert!(config.api_token.is_none());
    }

    #[test]
    fn test_derived_settings() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(20_000));
        assert_eq!(config.cache_config().ttl, Duration::from_secs(1800));
        assert_eq!(config.batch_options().inter_batch_delay, Duration::from_secs(1));
        assert_eq!(config.jitter_bounds(), (Duration::from_millis(500), Duration::from_millis(1500)));
    }

    #[test]
    fn test_relay_disabled_without_base_url() {
        let config = AppConfig { api_token: Some("t".into()), ..Default::default() };
        assert!(config.relay_endpoint().unwrap().is_none());
    }

    #[test]
    fn test_relay_requires_token() {
        let config = AppConfig { api_base_url: Some("https://api.example.com".into()), ..Default::default() };
        assert!(matches!(config.relay_endpoint(), Err(ConfigError::Missing { .. })));
    }

    #[test]
    fn test_relay_endpoint_present() {
        let config = AppConfig {
            api_base_url: Some("https://api.example.com".into()),
            api_token: Some("secret".into()),
            ..Default::default()
        };
        assert_eq!(config.relay_endpoint().unwrap(), Some(("https://api.example.com", "secret")));
    }
}
