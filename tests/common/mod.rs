//! Shared helpers for integration tests.
//!
//! - `fixtures`: credential and data fixtures, mock upstream helpers
//! - `log_capture`: `tracing` event capture for assertions
//! - `logger`: structured per-test logging

pub mod fixtures;
pub mod log_capture;
pub mod logger;
