//! Request handlers: one descriptor, one task scope, one response stream.

mod handler;


pub use handler::{RequestHandler, RequestHandlerBuilder};
