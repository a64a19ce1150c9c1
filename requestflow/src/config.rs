//! Default settings for request handlers.
//!
//! A [`HandlerConfig`] seeds every execution descriptor a handler creates.
//! It can be built in code or loaded from JSON.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::vault::CacheBackend;

/// Defaults applied to execution descriptors and response streams.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerConfig {
    /// Overall deadline of a run in milliseconds.
    #[serde(default = "default_max_duration_ms")]
    pub max_duration_ms: u64,
    /// Minimum time before a terminal value is delivered, in milliseconds.
    #[serde(default = "default_min_duration_ms")]
    pub min_duration_ms: u64,
    /// Lifetime of a cached value in milliseconds.
    #[serde(default = "default_cache_ttl_ms")]
    pub cache_ttl_ms: u64,
    /// Backend holding TTL records when a cache policy does not pick one.
    #[serde(default)]
    pub default_backend: CacheBackend,
    /// Number of responses buffered per stream subscriber.
    #[serde(default = "default_stream_capacity")]
    pub stream_capacity: usize,
    /// Maximum length of free-text log payloads.
    #[serde(default = "default_log_message_limit")]
    pub log_message_limit: usize,
}

fn default_max_duration_ms() -> u64 {
    5 * 60 * 1000
}

fn default_min_duration_ms() -> u64 {
    200
}

fn default_cache_ttl_ms() -> u64 {
    10 * 60 * 1000
}

fn default_stream_capacity() -> usize {
    64
}

fn default_log_message_limit() -> usize {
    200
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            max_duration_ms: default_max_duration_ms(),
            min_duration_ms: default_min_duration_ms(),
            cache_ttl_ms: default_cache_ttl_ms(),
            default_backend: CacheBackend::default(),
            stream_capacity: default_stream_capacity(),
            log_message_limit: default_log_message_limit(),
        }
    }
}

impl HandlerConfig {
    /// Creates a config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a config from a JSON document. Missing fields take defaults.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Sets the default deadline.
    #[must_use]
    pub fn with_max_duration(mut self, duration: Duration) -> Self {
        self.max_duration_ms = duration_to_millis(duration);
        self
    }

    /// Sets the default minimum duration.
    #[must_use]
    pub fn with_min_duration(mut self, duration: Duration) -> Self {
        self.min_duration_ms = duration_to_millis(duration);
        self
    }

    /// Sets the default cache TTL.
    #[must_use]
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl_ms = duration_to_millis(ttl);
        self
    }

    /// Sets the default cache backend.
    #[must_use]
    pub const fn with_default_backend(mut self, backend: CacheBackend) -> Self {
        self.default_backend = backend;
        self
    }

    /// Sets the per-subscriber stream buffer.
    #[must_use]
    pub fn with_stream_capacity(mut self, capacity: usize) -> Self {
        self.stream_capacity = capacity.max(1);
        self
    }

    /// Returns the default deadline.
    #[must_use]
    pub const fn max_duration(&self) -> Duration {
        Duration::from_millis(self.max_duration_ms)
    }

    /// Returns the default minimum duration.
    #[must_use]
    pub const fn min_duration(&self) -> Duration {
        Duration::from_millis(self.min_duration_ms)
    }

    /// Returns the default cache TTL.
    #[must_use]
    pub const fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }
}

fn duration_to_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = HandlerConfig::default();
        assert_eq!(config.max_duration(), Duration::from_secs(300));
        assert_eq!(config.min_duration(), Duration::from_millis(200));
        assert_eq!(config.cache_ttl(), Duration::from_secs(600));
        assert_eq!(config.default_backend, CacheBackend::Disk);
        assert_eq!(config.stream_capacity, 64);
        assert_eq!(config.log_message_limit, 200);
    }

    #[test]
    fn test_from_json_partial() {
        let config = HandlerConfig::from_json_str(
            r#"{"min_duration_ms": 0, "default_backend": "memory"}"#,
        )
        .unwrap();

        assert_eq!(config.min_duration(), Duration::ZERO);
        assert_eq!(config.default_backend, CacheBackend::Memory);
        assert_eq!(config.max_duration_ms, 300_000);
    }

    #[test]
    fn test_builders() {
        let config = HandlerConfig::new()
            .with_max_duration(Duration::from_secs(2))
            .with_min_duration(Duration::ZERO)
            .with_cache_ttl(Duration::from_secs(30))
            .with_default_backend(CacheBackend::Memory)
            .with_stream_capacity(0);

        assert_eq!(config.max_duration_ms, 2_000);
        assert_eq!(config.min_duration_ms, 0);
        assert_eq!(config.cache_ttl_ms, 30_000);
        assert_eq!(config.default_backend, CacheBackend::Memory);
        assert_eq!(config.stream_capacity, 1);
    }
}
