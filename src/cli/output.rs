//! JSON envelope for machine-readable command output.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{Result, SpendlogError};

const SCHEMA_VERSION: &str = "spendlog.v1";

/// Envelope wrapped around every `--json` result.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandOutput<T> {
    pub schema_version: &'static str,
    pub generated_at: DateTime<Utc>,
    pub command: String,
    pub data: T,
}

impl<T: Serialize> CommandOutput<T> {
    pub fn new(command: impl Into<String>, data: T) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            generated_at: Utc::now(),
            command: command.into(),
            data,
        }
    }

    /// Serialize and print to stdout.
    ///
    /// # Errors
    ///
    /// Returns error if the data cannot be serialized.
    pub fn print(&self, pretty: bool) -> Result<()> {
        let json = if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        }?;
        println!("{json}");
        Ok(())
    }
}

/// Error report printed in JSON mode.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorOutput {
    pub schema_version: &'static str,
    pub code: &'static str,
    pub category: String,
    pub message: String,
    pub retryable: bool,
}

impl From<&SpendlogError> for ErrorOutput {
    fn from(err: &SpendlogError) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            code: err.error_code(),
            category: err.category().to_string(),
            message: err.to_string(),
            retryable: err.is_retryable(),
        }
    }
}

/// Render an error for stderr.
#[must_use]
pub fn render_error(err: &SpendlogError, json: bool) -> String {
    if json {
        serde_json::to_string(&ErrorOutput::from(err))
            .unwrap_or_else(|_| format!("{{\"message\":\"{err}\"}}"))
    } else {
        format!("Error [{}]: {err}", err.error_code())
    }
}
