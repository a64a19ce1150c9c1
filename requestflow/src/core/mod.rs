//! Core domain model types for requestflow.
//!
//! This module contains the value published by every pipeline run:
//! - The response status enum
//! - The `Response<T>` tagged union with factory methods

mod response;
mod status;

pub use response::Response;
pub use status::ResponseStatus;
