//! HTTP client utilities.
//!
//! Provides the shared HTTP client used for the identity provider, the
//! ledger, and the notification provider.

use std::time::Duration;

use reqwest::{Client, ClientBuilder, Response};

use crate::error::{Result, SpendlogError};

/// Default timeout for HTTP requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Upper bound on how much of an error body is kept for messages and logs.
const MAX_ERROR_BODY: usize = 512;

/// Build a configured HTTP client.
///
/// # Errors
///
/// Returns error if client construction fails.
pub fn build_client(timeout: Duration) -> Result<Client> {
    ClientBuilder::new()
        .timeout(timeout)
        .user_agent(format!("spendlog/{}", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| SpendlogError::Network(e.to_string()))
}

/// Map a transport failure to a spendlog error.
#[must_use]
pub fn transport_error(err: &reqwest::Error, timeout: Duration) -> SpendlogError {
    if err.is_timeout() {
        SpendlogError::Timeout(timeout.as_secs())
    } else {
        SpendlogError::Network(err.to_string())
    }
}

/// Read a non-success response body for diagnostics, truncated.
pub async fn error_body(response: Response) -> String {
    let body = response.text().await.unwrap_or_default();
    truncate(body.trim(), MAX_ERROR_BODY)
}

fn truncate(text: &str, max: usize) -> String {
    if text.len() <= max {
        return text.to_string();
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &text[..end])
}
