//! Response status enum.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The state carried by a [`Response`](super::Response).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    /// A run is in progress.
    #[default]
    Loading,
    /// A run produced a value.
    Success,
    /// A run failed.
    Error,
}

impl fmt::Display for ResponseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Loading => write!(f, "loading"),
            Self::Success => write!(f, "success"),
            Self::Error => write!(f, "error"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_status_display() {
        assert_eq!(ResponseStatus::Loading.to_string(), "loading");
        assert_eq!(ResponseStatus::Success.to_string(), "success");
        assert_eq!(ResponseStatus::Error.to_string(), "error");
    }

    #[test]
    fn test_response_status_serialize() {
        let json = serde_json::to_string(&ResponseStatus::Success).unwrap();
        assert_eq!(json, r#""success""#);

        let deserialized: ResponseStatus = serde_json::from_str(r#""loading""#).unwrap();
        assert_eq!(deserialized, ResponseStatus::Loading);
    }
}
