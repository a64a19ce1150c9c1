//! Error types for requestflow.
//!
//! Failures of a pipeline run are modelled by [`RequestError`]. It is `Clone`
//! so a single terminal error can be delivered to every observer of a
//! response stream. Failures of the TTL store medium are modelled by
//! [`VaultError`] and never escape a pipeline run.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// The error type returned by a pipeline run.
#[derive(Debug, Clone, Error)]
pub enum RequestError {
    /// The pipeline was run without an execution function bound.
    #[error("No execution configured for request '{key}'")]
    NoExecutionConfigured {
        /// The handler key.
        key: String,
    },

    /// The overall deadline elapsed before the pipeline finished.
    #[error("Request '{key}' exceeded its deadline of {}ms", max_duration.as_millis())]
    DeadlineExceeded {
        /// The handler key.
        key: String,
        /// The deadline that was exceeded.
        max_duration: Duration,
    },

    /// The execution function itself failed.
    #[error("Request execution failed: {0}")]
    Execution(Arc<anyhow::Error>),

    /// The cache retrieve callback failed.
    #[error("Cache retrieve failed: {0}")]
    CacheRetrieve(Arc<anyhow::Error>),

    /// A mapping applied to a derived stream failed.
    #[error("Response transform failed: {0}")]
    Transform(Arc<anyhow::Error>),

    /// An error pushed directly onto a stream, bypassing the pipeline.
    #[error("Injected error: {0}")]
    Injected(Arc<anyhow::Error>),
}

impl RequestError {
    /// Wraps a failure raised by an execution function.
    #[must_use]
    pub fn execution(error: anyhow::Error) -> Self {
        Self::Execution(Arc::new(error))
    }

    /// Wraps a failure raised by a cache retrieve callback.
    #[must_use]
    pub fn cache_retrieve(error: anyhow::Error) -> Self {
        Self::CacheRetrieve(Arc::new(error))
    }

    /// Wraps a failure raised by a stream transform.
    #[must_use]
    pub fn transform(error: anyhow::Error) -> Self {
        Self::Transform(Arc::new(error))
    }

    /// Wraps an error injected by a caller.
    #[must_use]
    pub fn injected(error: anyhow::Error) -> Self {
        Self::Injected(Arc::new(error))
    }

    /// Returns true for [`RequestError::DeadlineExceeded`].
    #[must_use]
    pub const fn is_deadline_exceeded(&self) -> bool {
        matches!(self, Self::DeadlineExceeded { .. })
    }

    /// Returns true for [`RequestError::NoExecutionConfigured`].
    #[must_use]
    pub const fn is_no_execution(&self) -> bool {
        matches!(self, Self::NoExecutionConfigured { .. })
    }

    /// Returns the original failure of the execution function, if any.
    #[must_use]
    pub fn execution_failure(&self) -> Option<&anyhow::Error> {
        match self {
            Self::Execution(error) => Some(error.as_ref()),
            _ => None,
        }
    }

    /// Attempts to downcast the wrapped failure to a concrete error type.
    ///
    /// Works for every variant wrapping a caller failure.
    #[must_use]
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: std::fmt::Display + std::fmt::Debug + Send + Sync + 'static,
    {
        match self {
            Self::Execution(error)
            | Self::CacheRetrieve(error)
            | Self::Transform(error)
            | Self::Injected(error) => error.downcast_ref::<E>(),
            _ => None,
        }
    }
}

/// Errors raised by a TTL store medium.
#[derive(Debug, Error)]
pub enum VaultError {
    /// Reading or writing the durable medium failed.
    #[error("Vault IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The durable document could not be encoded or decoded.
    #[error("Vault serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
