//! Declarative recipe for producing a value.

use futures::future::{BoxFuture, FutureExt};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{CachePolicy, CachePolicyBuilder};
use crate::config::HandlerConfig;

/// Zero-argument async producer of a value.
pub type ExecutionFn<T> = Arc<dyn Fn() -> BoxFuture<'static, anyhow::Result<T>> + Send + Sync>;

/// Execution function, duration bounds and optional cache policy.
///
/// Built fluently and treated as immutable once handed to a runner.
/// Missing an execution function is not a configuration error; running such
/// a descriptor fails with `NoExecutionConfigured`.
pub struct ExecutionDescriptor<T> {
    key: String,
    config: HandlerConfig,
    execution: Option<ExecutionFn<T>>,
    max_duration: Duration,
    min_duration: Duration,
    cache: Option<CachePolicy<T>>,
}

impl<T> ExecutionDescriptor<T>
where
    T: Send + 'static,
{
    /// Creates a descriptor with default bounds (5 minutes / 200 ms).
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self::with_config(key, HandlerConfig::default())
    }

    /// Creates a descriptor seeded from a handler config.
    #[must_use]
    pub fn with_config(key: impl Into<String>, config: HandlerConfig) -> Self {
        Self {
            key: key.into(),
            max_duration: config.max_duration(),
            min_duration: config.min_duration(),
            config,
            execution: None,
            cache: None,
        }
    }

    /// Sets the overall deadline of a run.
    #[must_use]
    pub fn max_duration(mut self, duration: Duration) -> Self {
        self.max_duration = duration;
        self
    }

    /// Sets the minimum time before a terminal value is delivered.
    #[must_use]
    pub fn min_duration(mut self, duration: Duration) -> Self {
        self.min_duration = duration;
        self
    }

    /// Sets the execution function.
    #[must_use]
    pub fn request<F, Fut>(mut self, execution: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        self.execution = Some(Arc::new(move || execution().boxed()));
        self
    }

    /// Attaches a cache policy, replacing any previous one.
    ///
    /// The builder starts with the descriptor key as cache key.
    #[must_use]
    pub fn cache<F>(mut self, configure: F) -> Self
    where
        F: FnOnce(CachePolicyBuilder<T>) -> CachePolicyBuilder<T>,
    {
        let builder = CachePolicyBuilder::with_config(self.key.clone(), &self.config);
        self.cache = Some(configure(builder).build());
        self
    }

    /// Returns the descriptor key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the config the descriptor was seeded from.
    #[must_use]
    pub const fn config(&self) -> &HandlerConfig {
        &self.config
    }

    /// Returns the execution function, if bound.
    #[must_use]
    pub fn execution(&self) -> Option<&ExecutionFn<T>> {
        self.execution.as_ref()
    }

    /// Returns the deadline.
    #[must_use]
    pub const fn get_max_duration(&self) -> Duration {
        self.max_duration
    }

    /// Returns the minimum duration.
    #[must_use]
    pub const fn get_min_duration(&self) -> Duration {
        self.min_duration
    }

    /// Returns the cache policy, if attached.
    #[must_use]
    pub const fn cache_policy(&self) -> Option<&CachePolicy<T>> {
        self.cache.as_ref()
    }
}

impl<T> fmt::Debug for ExecutionDescriptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionDescriptor")
            .field("key", &self.key)
            .field("execution", &self.execution.is_some())
            .field("max_duration", &self.max_duration)
            .field("min_duration", &self.min_duration)
            .field("cache", &self.cache)
            .finish()
    }
}
