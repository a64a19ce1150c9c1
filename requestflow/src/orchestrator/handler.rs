//! The request handler.
//!
//! A [`RequestHandler`] owns the current [`ExecutionDescriptor`], a
//! [`TaskScope`] for streaming runs and the [`ResponseStream`] they publish
//! to.
//!
//! Every [`start`](RequestHandler::start) schedules an independent run.
//! Overlapping runs are neither deduplicated nor ordered: each publishes
//! `Loading` and then its own terminal value, so the stream ends on whichever
//! run finishes last.

use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::cancellation::TaskScope;
use crate::config::HandlerConfig;
use crate::core::Response;
use crate::errors::RequestError;
use crate::execution::{ExecutionDescriptor, PipelineRunner};
use crate::stream::ResponseStream;
use crate::vault::Vaults;

struct HandlerInner<T> {
    key: String,
    config: HandlerConfig,
    vaults: Vaults,
    descriptor: RwLock<Arc<ExecutionDescriptor<T>>>,
    stream: ResponseStream<T>,
    scope: TaskScope,
}

impl<T> Drop for HandlerInner<T> {
    fn drop(&mut self) {
        self.scope.close("handler dropped");
    }
}

/// Declares how to produce a value and runs it on demand.
///
/// Cloning yields another handle to the same handler. Dropping the last handle
/// aborts its in-flight runs.
pub struct RequestHandler<T> {
    inner: Arc<HandlerInner<T>>,
}

impl<T> Clone for RequestHandler<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> RequestHandler<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Creates a handler with default config and the process-wide vaults.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self::builder(key).build()
    }

    /// Starts building a handler.
    #[must_use]
    pub fn builder(key: impl Into<String>) -> RequestHandlerBuilder<T> {
        RequestHandlerBuilder::new(key)
    }

    /// Returns the handler key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.inner.key
    }

    /// Returns the handler config.
    #[must_use]
    pub fn config(&self) -> &HandlerConfig {
        &self.inner.config
    }

    /// Replaces the descriptor with the one produced by `build`.
    ///
    /// `build` starts from a fresh descriptor seeded with the handler key and
    /// config; nothing of the previous descriptor is kept.
    pub fn configure<F>(&self, build: F) -> &Self
    where
        F: FnOnce(ExecutionDescriptor<T>) -> ExecutionDescriptor<T>,
    {
        let fresh =
            ExecutionDescriptor::with_config(self.inner.key.clone(), self.inner.config.clone());
        *self.inner.descriptor.write() = Arc::new(build(fresh));
        self
    }

    /// Returns the current descriptor.
    #[must_use]
    pub fn descriptor(&self) -> Arc<ExecutionDescriptor<T>> {
        self.inner.descriptor.read().clone()
    }

    fn runner(&self) -> PipelineRunner<T> {
        PipelineRunner::new(self.descriptor(), self.inner.vaults.clone())
    }

    /// Runs the pipeline once and returns its outcome.
    ///
    /// The response stream is not touched.
    pub async fn run_once(&self) -> Result<T, RequestError> {
        self.runner().run_once().await
    }

    /// Alias of [`run_once`](Self::run_once).
    pub async fn execute_data(&self) -> Result<T, RequestError> {
        self.run_once().await
    }

    /// Schedules a streaming run and returns immediately.
    ///
    /// The run publishes `Loading`, then exactly one terminal value.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn start(&self) -> &Self {
        let runner = self.runner();
        let stream = self.inner.stream.clone();

        let scheduled = self.inner.scope.spawn(async move {
            stream.publish(Response::Loading);
            let response = runner.run_streaming().await;
            stream.publish(response);
        });

        if scheduled {
            debug!(key = %self.inner.key, in_flight = self.in_flight(), "Streaming run scheduled");
        } else {
            warn!(key = %self.inner.key, "Handler scope closed, run not scheduled");
        }
        self
    }

    /// Returns the response stream.
    #[must_use]
    pub fn stream(&self) -> &ResponseStream<T> {
        &self.inner.stream
    }

    /// Publishes `Success(data)` directly, bypassing the pipeline.
    pub fn set_success(&self, data: T) {
        self.inner.stream.publish(Response::Success(data));
    }

    /// Publishes `Loading` directly, bypassing the pipeline.
    pub fn set_loading(&self) {
        self.inner.stream.publish(Response::Loading);
    }

    /// Publishes an error directly, bypassing the pipeline.
    pub fn set_error(&self, error: anyhow::Error) {
        self.inner
            .stream
            .publish(Response::Error(RequestError::injected(error)));
    }

    /// Returns the number of streaming runs still in flight.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.inner.scope.in_flight()
    }

    /// Waits until every scheduled streaming run has finished.
    pub async fn wait_idle(&self) {
        self.inner.scope.wait_idle().await;
    }
}

impl<T> fmt::Debug for RequestHandler<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestHandler")
            .field("key", &self.inner.key)
            .field("scope", &self.inner.scope)
            .finish_non_exhaustive()
    }
}

/// Builder for [`RequestHandler`].
pub struct RequestHandlerBuilder<T> {
    key: String,
    config: Option<HandlerConfig>,
    vaults: Option<Vaults>,
    _marker: std::marker::PhantomData<fn() -> T>,
}

impl<T> RequestHandlerBuilder<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            config: None,
            vaults: None,
            _marker: std::marker::PhantomData,
        }
    }

    /// Sets the config seeding descriptors and the stream.
    #[must_use]
    pub fn config(mut self, config: HandlerConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets the TTL stores. Defaults to the process-wide pair.
    #[must_use]
    pub fn vaults(mut self, vaults: Vaults) -> Self {
        self.vaults = Some(vaults);
        self
    }

    /// Builds the handler with an empty descriptor.
    #[must_use]
    pub fn build(self) -> RequestHandler<T> {
        let config = self.config.unwrap_or_default();
        let descriptor = ExecutionDescriptor::with_config(self.key.clone(), config.clone());
        let stream = ResponseStream::new(config.stream_capacity);
        let scope = TaskScope::new(self.key.clone());

        RequestHandler {
            inner: Arc::new(HandlerInner {
                key: self.key,
                config,
                vaults: self.vaults.unwrap_or_default(),
                descriptor: RwLock::new(Arc::new(descriptor)),
                stream,
                scope,
            }),
        }
    }
}

impl<T> Default for RequestHandler<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new("")
    }
}

impl<T> fmt::Debug for RequestHandlerBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestHandlerBuilder")
            .field("key", &self.key)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fast_config;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn handler() -> RequestHandler<u32> {
        RequestHandler::builder("numbers")
            .config(fast_config())
            .vaults(Vaults::isolated())
            .build()
    }

    #[test]
    fn test_default_key_is_empty() {
        let handler: RequestHandler<u8> = RequestHandler::default();
        assert_eq!(handler.key(), "");
    }

    #[test]
    fn test_configure_seeds_from_config() {
        let handler = handler();
        handler.configure(|d| d.max_duration(Duration::from_secs(1)));

        let descriptor = handler.descriptor();
        assert_eq!(descriptor.key(), "numbers");
        assert_eq!(descriptor.get_max_duration(), Duration::from_secs(1));
        assert_eq!(descriptor.get_min_duration(), Duration::ZERO);
    }

    #[test]
    fn test_configure_replaces_wholesale() {
        let handler = handler();
        handler.configure(|d| d.max_duration(Duration::from_secs(1)).request(|| async { Ok(1) }));
        handler.configure(|d| d);

        let descriptor = handler.descriptor();
        assert!(descriptor.execution().is_none());
        assert_eq!(descriptor.get_max_duration(), fast_config().max_duration());
    }

    #[tokio::test]
    async fn test_execute_data_aliases_run_once() {
        let handler = handler();
        handler.configure(|d| d.request(|| async { Ok(9) }));

        assert_eq!(handler.execute_data().await.unwrap(), 9);
        assert_eq!(handler.run_once().await.unwrap(), 9);
    }

    #[tokio::test]
    async fn test_run_once_does_not_publish() {
        let handler = handler();
        handler.configure(|d| d.request(|| async { Ok(1) }));
        let mut subscriber = handler.stream().subscribe();

        handler.run_once().await.unwrap();

        assert!(subscriber.try_next().is_none());
        assert!(handler.stream().value().is_loading());
    }

    #[tokio::test]
    async fn test_injectors_publish_directly() {
        let handler = handler();
        let mut subscriber = handler.stream().subscribe();

        handler.set_success(3);
        handler.set_loading();
        handler.set_error(anyhow::anyhow!("injected"));

        assert_eq!(subscriber.next().await.and_then(Response::into_data), Some(3));
        assert!(subscriber.next().await.is_some_and(|r| r.is_loading()));
        let error = subscriber.next().await.unwrap();
        assert!(matches!(error, Response::Error(RequestError::Injected(_))));
        assert!(handler.stream().value().is_error());
    }
}
