//! Observability utilities.

mod logging;
mod tracing;

pub use logging::{init_logging, truncate_message, LogFormat, DEFAULT_LOG_FILTER};
pub use tracing::{RunSpanAttributes, SpanTimer};
