//! Span helpers for pipeline runs.

use tokio::time::Instant;
use tracing::Span;

/// Attributes attached to the span of one pipeline run.
#[derive(Debug, Clone, Default)]
pub struct RunSpanAttributes {
    /// Handler key.
    pub key: String,
    /// Identifier of this run.
    pub run_id: String,
    /// `single_shot` or `streaming`.
    pub mode: &'static str,
    /// Cache key when a cache policy is attached.
    pub cache_key: Option<String>,
}

impl RunSpanAttributes {
    /// Creates attributes for a run.
    #[must_use]
    pub fn new(key: impl Into<String>, run_id: impl Into<String>, mode: &'static str) -> Self {
        Self {
            key: key.into(),
            run_id: run_id.into(),
            mode,
            cache_key: None,
        }
    }

    /// Sets the cache key.
    #[must_use]
    pub fn with_cache_key(mut self, cache_key: impl Into<String>) -> Self {
        self.cache_key = Some(cache_key.into());
        self
    }

    /// Opens the `request_pipeline` span.
    #[must_use]
    pub fn span(&self) -> Span {
        tracing::info_span!(
            "request_pipeline",
            key = %self.key,
            run_id = %self.run_id,
            mode = self.mode,
            cache_key = self.cache_key.as_deref().unwrap_or(""),
        )
    }
}

/// Measures the time since a run started.
///
/// Uses the tokio clock so paused-time tests observe the same elapsed time
/// as the pipeline.
#[derive(Debug, Clone, Copy)]
pub struct SpanTimer {
    start: Instant,
}

impl SpanTimer {
    /// Starts a timer now.
    #[must_use]
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Returns the elapsed time.
    #[must_use]
    pub fn elapsed(&self) -> std::time::Duration {
        self.start.elapsed()
    }

    /// Returns the elapsed time in milliseconds.
    #[must_use]
    pub fn elapsed_ms(&self) -> u128 {
        self.elapsed().as_millis()
    }
}
