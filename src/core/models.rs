//! Core data models.
//!
//! Ledger rows produced by finished tracking scopes, and the email message
//! shape consumed by the notification client.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::mime;
use crate::error::Result;
use crate::util::{format_duration_secs, format_ledger_cost};

// =============================================================================
// Model Usage
// =============================================================================

/// Per-model call count and accumulated cost within one scope.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct ModelUsage {
    pub calls: u64,
    pub cost: f64,
}

// =============================================================================
// Ledger Row
// =============================================================================

/// Number of columns in a ledger row (`A:H`).
pub const LEDGER_COLUMNS: usize = 8;

/// One finished request, in ledger column order.
///
/// Column order: timestamp, service, user, inputs, cost, duration, results,
/// per-model breakdown.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerRow {
    pub timestamp: DateTime<Utc>,
    pub service: String,
    pub user: String,
    pub inputs: Value,
    pub cost_usd: f64,
    pub duration: Duration,
    pub results: Value,
    pub breakdown: BTreeMap<String, ModelUsage>,
}

impl LedgerRow {
    /// Cell values in column order.
    ///
    /// Structured columns are JSON-encoded strings; cost carries four decimal
    /// places and duration (seconds) one.
    #[must_use]
    pub fn to_values(&self) -> [Value; LEDGER_COLUMNS] {
        let breakdown =
            serde_json::to_string(&self.breakdown).unwrap_or_else(|_| "{}".to_string());
        [
            Value::String(self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)),
            Value::String(self.service.clone()),
            Value::String(self.user.clone()),
            Value::String(self.inputs.to_string()),
            Value::String(format_ledger_cost(self.cost_usd)),
            Value::String(format_duration_secs(self.duration)),
            Value::String(self.results.to_string()),
            Value::String(breakdown),
        ]
    }
}

// =============================================================================
// Email
// =============================================================================

/// A file attached to an outgoing email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub content: Vec<u8>,
    /// Explicit content type; when absent the filename extension decides.
    pub mime_type: Option<String>,
}

impl Attachment {
    #[must_use]
    pub fn new(filename: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            content: content.into(),
            mime_type: None,
        }
    }

    #[must_use]
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Read an attachment from disk, named after the file.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be read.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read(path)?;
        let filename = path
            .file_name()
            .map_or_else(|| "attachment".to_string(), |n| n.to_string_lossy().into_owned());
        Ok(Self::new(filename, content))
    }

    /// Content type sent to the provider.
    #[must_use]
    pub fn resolved_mime_type(&self) -> String {
        match self.mime_type.as_deref().map(str::trim) {
            Some(explicit) if !explicit.is_empty() => explicit.to_string(),
            _ => mime::mime_type_for(Some(&self.filename)),
        }
    }
}

/// An outgoing HTML email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
    /// Display name for the sender; the configured default applies when absent.
    pub sender_name: Option<String>,
    pub attachments: Vec<Attachment>,
}

impl EmailMessage {
    #[must_use]
    pub fn new(to: impl Into<String>, subject: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            html: html.into(),
            sender_name: None,
            attachments: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_sender_name(mut self, name: impl Into<String>) -> Self {
        self.sender_name = Some(name.into());
        self
    }

    /// Attach zero, one, or many files.
    ///
    /// Accepts anything iterable over attachments, so a single `Option`,
    /// an array, or a `Vec` all normalize to the same ordered list.
    #[must_use]
    pub fn with_attachments(mut self, attachments: impl IntoIterator<Item = Attachment>) -> Self {
        self.attachments.extend(attachments);
        self
    }

    #[must_use]
    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }
}
