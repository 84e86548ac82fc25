//! spendlog - per-request AI spend tracking and resilient notifications.
//!
//! Services open a usage scope per request, record model calls into it
//! (directly or from nested code through the task-local scope), and append
//! one ledger row when the request finishes. Result emails go through a
//! notifier that retries transient provider failures.

#![deny(unsafe_code)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod core;
pub mod error;
pub mod storage;
pub mod util;

/// Test utilities module - included in test builds or when test-utils feature is enabled.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use error::{ExitCode, Result, SpendlogError};

#[cfg(any(test, feature = "test-utils"))]
pub use test_utils::*;
