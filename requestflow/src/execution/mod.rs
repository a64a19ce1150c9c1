//! Execution descriptors and the pipeline that runs them.
//!
//! An [`ExecutionDescriptor`] declares how to produce a value: the execution
//! function, the deadline and minimum-duration bounds, and an optional cache
//! policy. A [`PipelineRunner`] executes one descriptor once, choosing between
//! the cache-hit, cache-miss and no-cache paths.

mod descriptor;
mod runner;

pub use descriptor::{ExecutionDescriptor, ExecutionFn};
pub use runner::{PipelineRunner, RunMode};
