//! The value published by a pipeline run.

use super::ResponseStatus;
use crate::errors::RequestError;

/// Progress or outcome of a pipeline run.
///
/// Each run publishes exactly one `Loading` followed by exactly one terminal
/// value (`Success` or `Error`).
#[derive(Debug, Clone)]
pub enum Response<T> {
    /// The run is in progress. Carries no payload.
    Loading,
    /// The run produced a value.
    Success(T),
    /// The run failed.
    Error(RequestError),
}

impl<T> Default for Response<T> {
    fn default() -> Self {
        Self::Loading
    }
}

impl<T> Response<T> {
    /// Creates a loading response.
    #[must_use]
    pub const fn loading() -> Self {
        Self::Loading
    }

    /// Creates a success response.
    #[must_use]
    pub const fn success(data: T) -> Self {
        Self::Success(data)
    }

    /// Creates an error response.
    #[must_use]
    pub const fn error(error: RequestError) -> Self {
        Self::Error(error)
    }

    /// Returns the status tag.
    #[must_use]
    pub const fn status(&self) -> ResponseStatus {
        match self {
            Self::Loading => ResponseStatus::Loading,
            Self::Success(_) => ResponseStatus::Success,
            Self::Error(_) => ResponseStatus::Error,
        }
    }

    /// Returns true if this is a loading response.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    /// Returns true if this is a success response.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Returns true if this is an error response.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// Returns the data if this is a success response.
    #[must_use]
    pub const fn data(&self) -> Option<&T> {
        match self {
            Self::Success(data) => Some(data),
            _ => None,
        }
    }

    /// Returns the failure if this is an error response.
    #[must_use]
    pub const fn failure(&self) -> Option<&RequestError> {
        match self {
            Self::Error(error) => Some(error),
            _ => None,
        }
    }

    /// Consumes the response, returning the data if any.
    #[must_use]
    pub fn into_data(self) -> Option<T> {
        match self {
            Self::Success(data) => Some(data),
            _ => None,
        }
    }

    /// Maps the success payload, leaving loading and error untouched.
    pub fn map<U, F>(self, f: F) -> Response<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            Self::Loading => Response::Loading,
            Self::Success(data) => Response::Success(f(data)),
            Self::Error(error) => Response::Error(error),
        }
    }

    /// Maps the success payload with a fallible transform.
    ///
    /// A transform failure becomes an `Error` response.
    pub fn try_map<U, F>(self, f: F) -> Response<U>
    where
        F: FnOnce(T) -> anyhow::Result<U>,
    {
        match self {
            Self::Loading => Response::Loading,
            Self::Success(data) => match f(data) {
                Ok(mapped) => Response::Success(mapped),
                Err(error) => Response::Error(RequestError::transform(error)),
            },
            Self::Error(error) => Response::Error(error),
        }
    }

    /// Maps the failure, leaving loading and success untouched.
    pub fn map_error<F>(self, f: F) -> Self
    where
        F: FnOnce(RequestError) -> RequestError,
    {
        match self {
            Self::Error(error) => Self::Error(f(error)),
            other => other,
        }
    }
}

impl<T> From<Result<T, RequestError>> for Response<T> {
    fn from(result: Result<T, RequestError>) -> Self {
        match result {
            Ok(data) => Self::Success(data),
            Err(error) => Self::Error(error),
        }
    }
}
