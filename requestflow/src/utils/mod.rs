//! Utility functions for run identifiers and wall-clock timestamps.

pub mod timestamps;

pub use timestamps::{expiration_after, format_millis, now_millis};

/// Generates a new run identifier.
#[must_use]
pub fn generate_run_id() -> uuid::Uuid {
    uuid::Uuid::new_v4()
}
