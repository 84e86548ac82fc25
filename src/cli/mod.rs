//! CLI argument parsing and command dispatch.

pub mod args;
pub mod auth;
pub mod estimate;
pub mod notify;
pub mod output;
pub mod rates;

pub use args::{Cli, Commands, OutputFormat};
