//! Cache policy and its builder.

use futures::future::{BoxFuture, FutureExt};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::HandlerConfig;
use crate::observability::truncate_message;
use crate::utils::{expiration_after, format_millis};
use crate::vault::{CacheBackend, Vaults, VaultValue};

/// Callback persisting a payload under a cache key. `Ok(true)` means stored.
pub type SaveFn<T> =
    Arc<dyn Fn(String, T) -> BoxFuture<'static, anyhow::Result<bool>> + Send + Sync>;

/// Callback loading a payload for a cache key.
pub type RetrieveFn<T> =
    Arc<dyn Fn(String) -> BoxFuture<'static, anyhow::Result<Option<T>>> + Send + Sync>;

/// Callback deleting a payload for a cache key. `Ok(true)` means removed.
pub type RemoveFn = Arc<dyn Fn(String) -> BoxFuture<'static, anyhow::Result<bool>> + Send + Sync>;

/// TTL bookkeeping plus payload callbacks for one cached value.
///
/// A policy holds configuration only; the expiration record lives in the TTL
/// store and the payload lives wherever the callbacks put it.
pub struct CachePolicy<T> {
    owner_key: String,
    cache_key: String,
    backend: CacheBackend,
    ttl: Duration,
    log_limit: usize,
    save: Option<SaveFn<T>>,
    retrieve: Option<RetrieveFn<T>>,
    remove: Option<RemoveFn>,
}

impl<T> CachePolicy<T>
where
    T: Send + 'static,
{
    /// Starts building a policy owned by `owner_key`.
    #[must_use]
    pub fn builder(owner_key: impl Into<String>) -> CachePolicyBuilder<T> {
        CachePolicyBuilder::new(owner_key)
    }

    /// Returns the key the payload and TTL record are stored under.
    #[must_use]
    pub fn cache_key(&self) -> &str {
        &self.cache_key
    }

    /// Returns the TTL store backend.
    #[must_use]
    pub const fn backend(&self) -> CacheBackend {
        self.backend
    }

    /// Returns the time-to-live of a saved payload.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Saves a payload and, when the save callback reports success, records
    /// its expiration as `now + ttl`.
    ///
    /// Callback failures, `false` results and TTL write failures are logged
    /// and otherwise ignored.
    pub async fn save(&self, vaults: &Vaults, value: T, now_ms: i64) {
        let Some(save) = &self.save else {
            return;
        };

        match save(self.cache_key.clone(), value).await {
            Ok(true) => {
                let expiration = expiration_after(now_ms, self.ttl);
                let store = vaults.store(self.backend);
                match store.set(&self.cache_key, VaultValue::Long(expiration)).await {
                    Ok(()) => debug!(
                        key = %self.owner_key,
                        cache_key = %self.cache_key,
                        backend = %self.backend,
                        expires_at = %format_millis(expiration),
                        "Cache saved"
                    ),
                    Err(e) => warn!(
                        key = %self.owner_key,
                        cache_key = %self.cache_key,
                        backend = %self.backend,
                        error = %e,
                        "Cache saved but expiration record could not be written"
                    ),
                }
            }
            Ok(false) => warn!(
                key = %self.owner_key,
                cache_key = %self.cache_key,
                "Cache not saved successfully"
            ),
            Err(e) => warn!(
                key = %self.owner_key,
                cache_key = %self.cache_key,
                error = %truncate_message(&format!("{e:#}"), self.log_limit),
                "Error while saving cache"
            ),
        }
    }

    /// Loads the cached payload. A missing retrieve callback is a permanent miss.
    ///
    /// Callback failures propagate to the caller.
    pub async fn retrieve(&self) -> anyhow::Result<Option<T>> {
        match &self.retrieve {
            Some(retrieve) => retrieve(self.cache_key.clone()).await,
            None => Ok(None),
        }
    }

    /// Removes the cached payload. The outcome is only logged.
    pub async fn remove(&self) {
        let Some(remove) = &self.remove else {
            return;
        };

        match remove(self.cache_key.clone()).await {
            Ok(true) => debug!(
                key = %self.owner_key,
                cache_key = %self.cache_key,
                "Cache removed"
            ),
            Ok(false) => debug!(
                key = %self.owner_key,
                cache_key = %self.cache_key,
                "Cache removed unsuccessfully"
            ),
            Err(e) => warn!(
                key = %self.owner_key,
                cache_key = %self.cache_key,
                error = %truncate_message(&format!("{e:#}"), self.log_limit),
                "Failure removing cache"
            ),
        }
    }

    /// Returns true when no expiration record exists or `now_ms` has reached it.
    pub async fn is_expired(&self, vaults: &Vaults, now_ms: i64) -> bool {
        match vaults.store(self.backend).get_long(&self.cache_key).await {
            Some(expiration) => now_ms >= expiration,
            None => true,
        }
    }
}

impl<T> fmt::Debug for CachePolicy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachePolicy")
            .field("cache_key", &self.cache_key)
            .field("backend", &self.backend)
            .field("ttl", &self.ttl)
            .field("save", &self.save.is_some())
            .field("retrieve", &self.retrieve.is_some())
            .field("remove", &self.remove.is_some())
            .finish()
    }
}

/// Fluent builder for [`CachePolicy`].
pub struct CachePolicyBuilder<T> {
    owner_key: String,
    cache_key: Option<String>,
    backend: CacheBackend,
    ttl: Duration,
    log_limit: usize,
    save: Option<SaveFn<T>>,
    retrieve: Option<RetrieveFn<T>>,
    remove: Option<RemoveFn>,
}

impl<T> CachePolicyBuilder<T>
where
    T: Send + 'static,
{
    /// Creates a builder with the default TTL (10 minutes) and backend (disk).
    #[must_use]
    pub fn new(owner_key: impl Into<String>) -> Self {
        Self::with_config(owner_key, &HandlerConfig::default())
    }

    /// Creates a builder seeded from a handler config.
    #[must_use]
    pub fn with_config(owner_key: impl Into<String>, config: &HandlerConfig) -> Self {
        Self {
            owner_key: owner_key.into(),
            cache_key: None,
            backend: config.default_backend,
            ttl: config.cache_ttl(),
            log_limit: config.log_message_limit,
            save: None,
            retrieve: None,
            remove: None,
        }
    }

    /// Overrides the cache key (defaults to the owning key).
    #[must_use]
    pub fn set_cache_key(mut self, key: impl Into<String>) -> Self {
        self.cache_key = Some(key.into());
        self
    }

    /// Sets the TTL and the backend keeping its record.
    #[must_use]
    pub fn timeout(mut self, ttl: Duration, backend: CacheBackend) -> Self {
        self.ttl = ttl;
        self.backend = backend;
        self
    }

    /// Sets the save callback.
    #[must_use]
    pub fn save<F, Fut>(mut self, save: F) -> Self
    where
        F: Fn(String, T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<bool>> + Send + 'static,
    {
        self.save = Some(Arc::new(move |key, value| save(key, value).boxed()));
        self
    }

    /// Sets the retrieve callback.
    #[must_use]
    pub fn retrieve<F, Fut>(mut self, retrieve: F) -> Self
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Option<T>>> + Send + 'static,
    {
        self.retrieve = Some(Arc::new(move |key| retrieve(key).boxed()));
        self
    }

    /// Sets the remove callback.
    #[must_use]
    pub fn remove<F, Fut>(mut self, remove: F) -> Self
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<bool>> + Send + 'static,
    {
        self.remove = Some(Arc::new(move |key| remove(key).boxed()));
        self
    }

    /// Builds the policy.
    #[must_use]
    pub fn build(self) -> CachePolicy<T> {
        let cache_key = self.cache_key.unwrap_or_else(|| self.owner_key.clone());
        CachePolicy {
            owner_key: self.owner_key,
            cache_key,
            backend: self.backend,
            ttl: self.ttl,
            log_limit: self.log_limit,
            save: self.save,
            retrieve: self.retrieve,
            remove: self.remove,
        }
    }
}

impl<T> fmt::Debug for CachePolicyBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachePolicyBuilder")
            .field("owner_key", &self.owner_key)
            .field("cache_key", &self.cache_key)
            .field("backend", &self.backend)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}
