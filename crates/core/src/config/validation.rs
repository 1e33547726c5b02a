//! Configuration validation rules.
//!
//! Checks `AppConfig` values after they have been loaded from environment,
//! files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `cache_ttl_secs` is 0
    /// - `cache_key_prefix` is empty or contains `:`
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `batch_concurrency` is 0
    /// - `jitter_min_ms` exceeds `jitter_max_ms`
    /// - `api_base_url` is not an http(s) URL
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_ttl_secs == 0 {
            return Err(invalid("cache_ttl_secs", "must be greater than 0"));
        }
        if self.cache_key_prefix.is_empty() {
            return Err(invalid("cache_key_prefix", "must not be empty"));
        }
        if self.cache_key_prefix.contains(':') {
            return Err(invalid("cache_key_prefix", "must not contain ':'"));
        }

        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(invalid("max_bytes", "must not exceed 50MB"));
        }

        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        if self.batch_concurrency == 0 {
            return Err(invalid("batch_concurrency", "must be at least 1"));
        }
        if self.batch_concurrency > 16 {
            tracing::warn!(
                batch_concurrency = self.batch_concurrency,
                "high batch concurrency may get requests blocked by the target site"
            );
        }

        if self.jitter_min_ms > self.jitter_max_ms {
            return Err(invalid("jitter_min_ms", "must not exceed jitter_max_ms"));
        }

        if let Some(base_url) = &self.api_base_url {
            match url::Url::parse(base_url) {
                Ok(u) if matches!(u.scheme(), "http" | "https") => {}
                Ok(u) => return Err(invalid("api_base_url", &format!("unsupported scheme: {}", u.scheme()))),
                Err(e) => return Err(invalid("api_base_url", &e.to_string())),
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_invalid(config: AppConfig, expected: &str) {
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == expected));
    }

    #[test]
    fn test_validate_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_zero_ttl() {
        assert_invalid(AppConfig { cache_ttl_secs: 0, ..Default::default() }, "cache_ttl_secs");
    }

    #[test]
    fn test_validate_prefix() {
        assert_invalid(AppConfig { cache_key_prefix: String::new(), ..Default::default() }, "cache_key_prefix");
        assert_invalid(AppConfig { cache_key_prefix: "a:b".into(), ..Default::default() }, "cache_key_prefix");
    }

    #[test]
    fn test_validate_max_bytes_bounds() {
        assert_invalid(AppConfig { max_bytes: 0, ..Default::default() }, "max_bytes");
        assert_invalid(AppConfig { max_bytes: 51 * 1024 * 1024, ..Default::default() }, "max_bytes");
    }

    #[test]
    fn test_validate_timeout_bounds() {
        assert_invalid(AppConfig { timeout_ms: 50, ..Default::default() }, "timeout_ms");
        assert_invalid(AppConfig { timeout_ms: 301_000, ..Default::default() }, "timeout_ms");
    }

    #[test]
    fn test_validate_zero_concurrency() {
        assert_invalid(AppConfig { batch_concurrency: 0, ..Default::default() }, "batch_concurrency");
    }

    #[test]
    fn test_validate_inverted_jitter() {
        assert_invalid(AppConfig { jitter_min_ms: 2_000, jitter_max_ms: 1_000, ..Default::default() }, "jitter_min_ms");
    }

    #[test]
    fn test_validate_api_base_url() {
        assert_invalid(AppConfig { api_base_url: Some("not a url".into()), ..Default::default() }, "api_base_url");
        assert_invalid(AppConfig { api_base_url: Some("ftp://api.example.com".into()), ..Default::default() }, "api_base_url");

        let ok = AppConfig { api_base_url: Some("https://api.example.com/api/".into()), ..Default::default() };
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn test_validate_edge_case_values() {
        let config = AppConfig {
            max_bytes: 1,
            timeout_ms: 100,
            batch_concurrency: 1,
            batch_delay_ms: 0,
            jitter_min_ms: 0,
            jitter_max_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }
}
