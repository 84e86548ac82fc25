//! Utility functions.

pub mod format;
pub mod time;

pub use format::{format_cost, format_duration_secs, format_ledger_cost, format_tokens};
pub use time::format_countdown;
