//! Testing utilities for requestflow handlers.
//!
//! This module provides:
//! - Recording cache callbacks and scripted request functions
//! - Assertions over response sequences
//! - Fixtures for fast configs, isolated vaults and stream collection

mod assertions;
mod fixtures;
mod mocks;

pub use assertions::{
    assert_deadline_exceeded, assert_error_response, assert_status_sequence,
    assert_success_eq,
};
pub use fixtures::{collect_responses, fast_config, TestVaults};
pub use mocks::{RecordingCache, ScriptedRequest};
