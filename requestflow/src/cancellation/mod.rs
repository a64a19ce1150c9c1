//! Structured ownership of background pipeline runs.

mod scope;

pub use scope::TaskScope;
