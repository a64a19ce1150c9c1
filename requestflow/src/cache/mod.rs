//! Cache policies for execution descriptors.
//!
//! A policy keeps per-key TTL bookkeeping in a TTL store and delegates the
//! cached payload itself to caller-supplied save/retrieve/remove callbacks.
//! Payloads are never inspected or serialized here.

mod policy;

pub use policy::{CachePolicy, CachePolicyBuilder, RemoveFn, RetrieveFn, SaveFn};
pub use crate::vault::CacheBackend;
