//! Append-only spreadsheet ledger for finished requests.
//!
//! Telemetry is optional infrastructure: without a spreadsheet id and a
//! service credential every append is a no-op, and any failure while
//! appending is logged and reported as `false`. Nothing here returns an
//! error to the caller.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::Value;

use crate::core::auth::{ServiceCredential, TokenCache};
use crate::core::http::{DEFAULT_TIMEOUT, error_body, transport_error};
use crate::core::models::{LEDGER_COLUMNS, LedgerRow};
use crate::error::{Result, SpendlogError};
use crate::storage::LedgerSettings;

/// Spreadsheet API base URL.
pub const DEFAULT_SHEETS_ENDPOINT: &str = "https://sheets.googleapis.com";

/// Range rows are appended to.
pub const DEFAULT_SHEET_RANGE: &str = "Sheet1!A:H";

#[derive(Serialize)]
struct AppendBody<'a> {
    values: [&'a [Value; LEDGER_COLUMNS]; 1],
}

/// Client that appends one row per finished request.
pub struct LedgerClient {
    client: Client,
    tokens: Arc<TokenCache>,
    endpoint: String,
    range: String,
    settings: Option<LedgerSettings>,
    timeout: Duration,
}

impl LedgerClient {
    /// A ledger that is not yet pointed at a spreadsheet.
    #[must_use]
    pub fn new(client: Client, tokens: Arc<TokenCache>) -> Self {
        Self {
            client,
            tokens,
            endpoint: DEFAULT_SHEETS_ENDPOINT.to_string(),
            range: DEFAULT_SHEET_RANGE.to_string(),
            settings: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// A ledger that never writes.
    #[must_use]
    pub fn disabled() -> Self {
        let client = Client::new();
        let tokens = Arc::new(TokenCache::new(client.clone()));
        Self::new(client, tokens)
    }

    /// Point the ledger at a spreadsheet. `None` keeps it disabled.
    #[must_use]
    pub fn with_settings(mut self, settings: Option<LedgerSettings>) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn with_spreadsheet(
        self,
        spreadsheet_id: impl Into<String>,
        credential: ServiceCredential,
    ) -> Self {
        self.with_settings(Some(LedgerSettings {
            spreadsheet_id: spreadsheet_id.into(),
            credential,
        }))
    }

    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    #[must_use]
    pub fn with_range(mut self, range: impl Into<String>) -> Self {
        self.range = range.into();
        self
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Whether appends will be attempted.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.settings.is_some()
    }

    fn append_url(&self, spreadsheet_id: &str) -> String {
        format!(
            "{}/v4/spreadsheets/{}/values/{}:append?valueInputOption=USER_ENTERED",
            self.endpoint.trim_end_matches('/'),
            spreadsheet_id,
            self.range
        )
    }

    /// Append a row. Returns whether the row was written.
    pub async fn append(&self, row: &LedgerRow) -> bool {
        let Some(settings) = &self.settings else {
            tracing::debug!(service = %row.service, "ledger not configured, skipping append");
            return false;
        };

        match self.try_append(settings, row).await {
            Ok(()) => {
                tracing::debug!(service = %row.service, user = %row.user, "ledger row appended");
                true
            }
            Err(e) => {
                tracing::warn!(
                    service = %row.service,
                    code = e.error_code(),
                    error = %e,
                    "ledger append failed"
                );
                false
            }
        }
    }

    async fn try_append(&self, settings: &LedgerSettings, row: &LedgerRow) -> Result<()> {
        let token = self.tokens.get_token(&settings.credential).await?;
        let values = row.to_values();
        let body = AppendBody { values: [&values] };

        let response = self
            .client
            .post(self.append_url(&settings.spreadsheet_id))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(&e, self.timeout))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        if status == StatusCode::UNAUTHORIZED {
            // Token revoked or clock skew; force a fresh exchange next time.
            self.tokens.invalidate();
        }
        let message = error_body(response).await;
        Err(SpendlogError::TelemetryWrite(format!(
            "HTTP {}: {message}",
            status.as_u16()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::ModelUsage;
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn row() -> LedgerRow {
        LedgerRow {
            timestamp: Utc::now(),
            service: "svc".to_string(),
            user: "u".to_string(),
            inputs: Value::Null,
            cost_usd: 0.0,
            duration: Duration::ZERO,
            results: Value::Null,
            breakdown: BTreeMap::<String, ModelUsage>::new(),
        }
    }

    #[tokio::test]
    async fn disabled_ledger_is_a_no_op() {
        let ledger = LedgerClient::disabled();
        assert!(!ledger.is_enabled());
        assert!(!ledger.append(&row()).await);
    }

    #[test]
    fn append_url_targets_range() {
        let ledger = LedgerClient::disabled().with_endpoint("https://sheets.example.com/");
        assert_eq!(
            ledger.append_url("abc123"),
            "https://sheets.example.com/v4/spreadsheets/abc123/values/Sheet1!A:H:append?valueInputOption=USER_ENTERED"
        );
    }

    #[test]
    fn body_wraps_single_row() {
        let values = row().to_values();
        let body = serde_json::to_value(AppendBody { values: [&values] }).unwrap();
        let rows = body["values"].as_array().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].as_array().unwrap().len(), LEDGER_COLUMNS);
    }
}
