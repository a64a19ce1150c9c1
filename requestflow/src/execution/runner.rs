//! Deadline- and cache-aware execution of one descriptor.
//!
//! A run proceeds as follows:
//!
//! 1. Start the run timer and enter the deadline scope (`max_duration`).
//! 2. Without a cache policy, invoke the execution function.
//! 3. With a cache policy, check the TTL record:
//!    - fresh and `retrieve` yields a value: cache hit
//!    - fresh but `retrieve` yields nothing: execute as a miss
//!    - expired or missing: `remove` (best effort), then execute
//! 4. After a successful execution, `save` the value (best effort).
//! 5. Hold the terminal value until `min_duration` has elapsed.
//!
//! Everything after step 1, including the minimum-duration hold, counts
//! against the deadline. When it elapses the in-flight work is dropped.

use futures::FutureExt;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, info, warn, Instrument};

use super::ExecutionDescriptor;
use crate::cache::CachePolicy;
use crate::core::Response;
use crate::errors::RequestError;
use crate::observability::{truncate_message, RunSpanAttributes, SpanTimer};
use crate::utils::{generate_run_id, now_millis};
use crate::vault::Vaults;

/// How the outcome of a run is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunMode {
    /// Failures are returned to the caller.
    SingleShot,
    /// Failures become `Error` responses.
    Streaming,
}

impl RunMode {
    /// Returns the mode name used in spans.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::SingleShot => "single_shot",
            Self::Streaming => "streaming",
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Executes one descriptor against a pair of TTL stores.
pub struct PipelineRunner<T> {
    descriptor: Arc<ExecutionDescriptor<T>>,
    vaults: Vaults,
}

impl<T> Clone for PipelineRunner<T> {
    fn clone(&self) -> Self {
        Self {
            descriptor: self.descriptor.clone(),
            vaults: self.vaults.clone(),
        }
    }
}

impl<T> PipelineRunner<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Creates a runner.
    #[must_use]
    pub fn new(descriptor: Arc<ExecutionDescriptor<T>>, vaults: Vaults) -> Self {
        Self { descriptor, vaults }
    }

    /// Returns the descriptor being run.
    #[must_use]
    pub fn descriptor(&self) -> &ExecutionDescriptor<T> {
        &self.descriptor
    }

    /// Runs once and returns the value or the underlying failure.
    pub async fn run_once(&self) -> Result<T, RequestError> {
        self.run(RunMode::SingleShot).await
    }

    /// Runs once and converts every failure, including a panic of the
    /// execution function, into an `Error` response.
    pub async fn run_streaming(&self) -> Response<T> {
        match AssertUnwindSafe(self.run(RunMode::Streaming)).catch_unwind().await {
            Ok(result) => result.into(),
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                warn!(key = %self.descriptor.key(), panic = %message, "Request execution panicked");
                Response::Error(RequestError::execution(anyhow::anyhow!(
                    "request execution panicked: {message}"
                )))
            }
        }
    }

    async fn run(&self, mode: RunMode) -> Result<T, RequestError> {
        let timer = SpanTimer::start();
        let key = self.descriptor.key();
        let mut attrs = RunSpanAttributes::new(key, generate_run_id().to_string(), mode.as_str());
        if let Some(cache) = self.descriptor.cache_policy() {
            attrs = attrs.with_cache_key(cache.cache_key());
        }

        let max_duration = self.descriptor.get_max_duration();
        let log_limit = self.descriptor.config().log_message_limit;
        async move {
            let result = match tokio::time::timeout(max_duration, self.execute(timer)).await {
                Ok(result) => result,
                Err(_) => Err(RequestError::DeadlineExceeded {
                    key: key.to_string(),
                    max_duration,
                }),
            };

            match &result {
                Ok(_) => info!(elapsed_ms = timer.elapsed_ms() as u64, "Time to finish"),
                Err(e) => warn!(
                    elapsed_ms = timer.elapsed_ms() as u64,
                    error = %truncate_message(&e.to_string(), log_limit),
                    "Request failed"
                ),
            }
            result
        }
        .instrument(attrs.span())
        .await
    }

    async fn execute(&self, timer: SpanTimer) -> Result<T, RequestError> {
        let Some(cache) = self.descriptor.cache_policy() else {
            debug!("Request started - no cache");
            let data = self.invoke().await?;
            self.hold_min_duration(timer).await;
            return Ok(data);
        };

        if cache.is_expired(&self.vaults, now_millis()).await {
            debug!(cache_key = %cache.cache_key(), "Request started - cache expired");
            cache.remove().await;
        } else {
            debug!(cache_key = %cache.cache_key(), "Using cache");
            match cache.retrieve().await.map_err(RequestError::cache_retrieve)? {
                Some(data) => {
                    self.hold_min_duration(timer).await;
                    debug!(cache_key = %cache.cache_key(), "Emitting cache");
                    return Ok(data);
                }
                None => debug!(cache_key = %cache.cache_key(), "Request started - cache not set"),
            }
        }

        self.execute_and_save(cache, timer).await
    }

    async fn execute_and_save(
        &self,
        cache: &CachePolicy<T>,
        timer: SpanTimer,
    ) -> Result<T, RequestError> {
        let data = self.invoke().await?;
        cache.save(&self.vaults, data.clone(), now_millis()).await;
        self.hold_min_duration(timer).await;
        Ok(data)
    }

    async fn invoke(&self) -> Result<T, RequestError> {
        let Some(execution) = self.descriptor.execution() else {
            return Err(RequestError::NoExecutionConfigured {
                key: self.descriptor.key().to_string(),
            });
        };

        let data = execution().await.map_err(RequestError::execution)?;
        debug!("Request ended");
        Ok(data)
    }

    async fn hold_min_duration(&self, timer: SpanTimer) {
        let min_duration = self.descriptor.get_min_duration();
        let elapsed = timer.elapsed();
        if let Some(remaining) = min_duration.checked_sub(elapsed).filter(|d| !d.is_zero()) {
            debug!(
                elapsed_ms = elapsed.as_millis() as u64,
                wait_ms = remaining.as_millis() as u64,
                "Holding result for minimum duration"
            );
            tokio::time::sleep(remaining).await;
        }
    }
}

impl<T> fmt::Debug for PipelineRunner<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineRunner")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
