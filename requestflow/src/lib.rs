//! # Requestflow
//!
//! Declare how to produce a value once, then obtain it through a pipeline
//! that applies:
//!
//! - **TTL caching**: caller-supplied save/retrieve/remove callbacks with
//!   expiration records kept in a memory or disk vault
//! - **Deadlines**: an overall `max_duration` covering execution and cache
//!   callbacks
//! - **Minimum duration**: a floor on how fast a terminal value is delivered
//! - **Multicast results**: a hot, zero-replay stream of
//!   `Loading`/`Success`/`Error` responses
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use requestflow::prelude::*;
//!
//! requestflow::init(DiskBinding::new("/var/lib/app"), false).await?;
//!
//! let places = RequestHandler::new("places");
//! places.configure(|d| {
//!     d.request(|| async { fetch_places().await })
//!         .cache(|c| c.timeout(Duration::from_secs(600), CacheBackend::Memory)
//!             .save(|key, value| async move { store(key, value).await })
//!             .retrieve(|key| async move { load(key).await }))
//! });
//!
//! // Single shot
//! let value = places.run_once().await?;
//!
//! // Streaming
//! let mut updates = places.stream().subscribe();
//! places.start();
//! while let Some(response) = updates.next().await {
//!     println!("{}", response.status());
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cache;
pub mod cancellation;
pub mod config;
pub mod core;
pub mod errors;
pub mod execution;
pub mod observability;
pub mod orchestrator;
pub mod stream;
pub mod utils;
pub mod vault;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use vault::{clear_all, init};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cache::{CacheBackend, CachePolicy, CachePolicyBuilder};
    pub use crate::config::HandlerConfig;
    pub use crate::core::{Response, ResponseStatus};
    pub use crate::errors::{RequestError, VaultError};
    pub use crate::execution::{ExecutionDescriptor, PipelineRunner, RunMode};
    pub use crate::observability::{init_logging, LogFormat};
    pub use crate::orchestrator::{RequestHandler, RequestHandlerBuilder};
    pub use crate::stream::{ResponseStream, ResponseSubscriber};
    pub use crate::vault::{DiskBinding, TtlStore, VaultValue, Vaults};
}
