//! Recording doubles for cache callbacks and request functions.

use dashmap::DashMap;
use futures::future::ready;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::cache::CachePolicyBuilder;

struct RecordingState<T> {
    preset: Option<T>,
    stored: DashMap<String, T>,
    saves: DashMap<String, usize>,
    retrieves: DashMap<String, usize>,
    removes: DashMap<String, usize>,
}

impl<T> RecordingState<T> {
    fn record(counter: &DashMap<String, usize>, key: &str) {
        *counter.entry(key.to_string()).or_insert(0) += 1;
    }

    fn count(counter: &DashMap<String, usize>, key: &str) -> usize {
        counter.get(key).map_or(0, |count| *count)
    }
}

/// In-memory cache callbacks that count every call per cache key.
///
/// Saved payloads are kept and returned by later retrieves. A preset value is
/// returned for keys that were never saved.
pub struct RecordingCache<T> {
    state: Arc<RecordingState<T>>,
}

impl<T> Clone for RecordingCache<T> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
        }
    }
}

impl<T> RecordingCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn with_preset(preset: Option<T>) -> Self {
        Self {
            state: Arc::new(RecordingState {
                preset,
                stored: DashMap::new(),
                saves: DashMap::new(),
                retrieves: DashMap::new(),
                removes: DashMap::new(),
            }),
        }
    }

    /// Creates a cache answering retrieves with `value` until something is saved.
    #[must_use]
    pub fn with_value(value: T) -> Self {
        Self::with_preset(Some(value))
    }

    /// Creates a cache with no payload.
    #[must_use]
    pub fn empty() -> Self {
        Self::with_preset(None)
    }

    /// Installs recording save, retrieve and remove callbacks on `builder`.
    #[must_use]
    pub fn attach(&self, builder: CachePolicyBuilder<T>) -> CachePolicyBuilder<T> {
        let (on_save, on_retrieve, on_remove) =
            (self.state.clone(), self.state.clone(), self.state.clone());

        builder
            .save(move |key: String, value: T| {
                RecordingState::<T>::record(&on_save.saves, &key);
                on_save.stored.insert(key, value);
                ready(Ok(true))
            })
            .retrieve(move |key: String| {
                RecordingState::<T>::record(&on_retrieve.retrieves, &key);
                let value = on_retrieve
                    .stored
                    .get(&key)
                    .map(|entry| entry.value().clone())
                    .or_else(|| on_retrieve.preset.clone());
                ready(Ok(value))
            })
            .remove(move |key: String| {
                RecordingState::<T>::record(&on_remove.removes, &key);
                on_remove.stored.remove(&key);
                ready(Ok(true))
            })
    }

    /// Returns the number of saves for `key`.
    #[must_use]
    pub fn saves(&self, key: &str) -> usize {
        RecordingState::<T>::count(&self.state.saves, key)
    }

    /// Returns the number of retrieves for `key`.
    #[must_use]
    pub fn retrieves(&self, key: &str) -> usize {
        RecordingState::<T>::count(&self.state.retrieves, key)
    }

    /// Returns the number of removes for `key`.
    #[must_use]
    pub fn removes(&self, key: &str) -> usize {
        RecordingState::<T>::count(&self.state.removes, key)
    }

    /// Returns the payload currently stored for `key`.
    #[must_use]
    pub fn stored(&self, key: &str) -> Option<T> {
        self.state.stored.get(key).map(|entry| entry.value().clone())
    }
}

impl<T> std::fmt::Debug for RecordingCache<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingCache")
            .field("stored", &self.state.stored.len())
            .finish()
    }
}

/// A request function that answers from a script and counts its calls.
#[derive(Debug)]
pub struct ScriptedRequest<T> {
    result: Mutex<Result<T, String>>,
    delay: Duration,
    calls: AtomicUsize,
}

impl<T> ScriptedRequest<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Creates a request that succeeds with `value`.
    #[must_use]
    pub fn succeeding(value: T) -> Arc<Self> {
        Arc::new(Self {
            result: Mutex::new(Ok(value)),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        })
    }

    /// Creates a request that fails with `message`.
    #[must_use]
    pub fn failing(message: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            result: Mutex::new(Err(message.into())),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        })
    }

    /// Creates a request that succeeds with `value` after `delay`.
    #[must_use]
    pub fn delayed(value: T, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            result: Mutex::new(Ok(value)),
            delay,
            calls: AtomicUsize::new(0),
        })
    }

    /// Replaces the scripted result for later calls.
    pub fn set_result(&self, result: Result<T, String>) {
        *self.result.lock() = result;
    }

    /// Returns the number of calls so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Runs one call.
    pub async fn call(&self) -> anyhow::Result<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.result.lock().clone().map_err(anyhow::Error::msg)
    }

    /// Returns a closure suitable for `ExecutionDescriptor::request`.
    pub fn as_fn(
        self: &Arc<Self>,
    ) -> impl Fn() -> futures::future::BoxFuture<'static, anyhow::Result<T>> + Send + Sync + 'static
    {
        let request = self.clone();
        move || {
            let request = request.clone();
            Box::pin(async move { request.call().await })
        }
    }
}
