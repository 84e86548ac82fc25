//! Test utilities for spendlog.
//!
//! Shared fixtures and factories for unit and integration tests.
//!
//! # Usage
//!
//! ```rust,ignore
//! use spendlog::test_utils::*;
//!
//! let credential = make_test_credential("http://127.0.0.1:9999/token");
//! let row = make_test_ledger_row();
//! let dir = TestDir::new();
//! dir.create_file("config.toml", &make_test_config_toml("http://127.0.0.1:9999"));
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::io::Write as IoWrite;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{TimeZone, Utc};
use serde_json::json;

use crate::core::auth::ServiceCredential;
use crate::core::models::{Attachment, EmailMessage, LedgerRow, ModelUsage};
use crate::storage::{
    ENV_LEDGER_ID, ENV_SENDER_EMAIL, ENV_SENDER_NAME, ENV_SENDGRID_API_KEY, ENV_SERVICE_ACCOUNT,
    NotifyCredentials, Secrets,
};

/// Service-account key file used across tests.
pub const TEST_SERVICE_ACCOUNT_JSON: &str = include_str!("../tests/fixtures/service_account.json");

/// Public half of the test key, for verifying signed assertions.
pub const TEST_RSA_PUBLIC_PEM: &str = include_str!("../tests/fixtures/test_rsa_public.pem");

/// Issuer email in the test key file.
pub const TEST_CLIENT_EMAIL: &str = "ledger-writer@spendlog-test.iam.gserviceaccount.com";

// =============================================================================
// Credential Factories
// =============================================================================

/// Test credential whose token endpoint points at `token_uri`.
///
/// # Panics
///
/// Panics if the bundled key file is malformed.
#[must_use]
pub fn make_test_credential(token_uri: &str) -> ServiceCredential {
    ServiceCredential::from_json(TEST_SERVICE_ACCOUNT_JSON)
        .expect("bundled service account must parse")
        .with_token_uri(token_uri)
}

/// Notification credentials with a fixed sender.
#[must_use]
pub fn make_test_notify_credentials() -> NotifyCredentials {
    NotifyCredentials {
        api_key: "SG.test-key".to_string(),
        sender_email: "reports@example.com".to_string(),
        sender_name: Some("Spendlog Reports".to_string()),
    }
}

/// Secrets with every variable set; the ledger credential is inline JSON.
#[must_use]
pub fn make_test_secrets(spreadsheet_id: &str) -> Secrets {
    let spreadsheet_id = spreadsheet_id.to_string();
    Secrets::from_lookup(move |name| match name {
        ENV_SENDER_EMAIL => Some("reports@example.com".to_string()),
        ENV_SENDER_NAME => Some("Spendlog Reports".to_string()),
        ENV_SENDGRID_API_KEY => Some("SG.test-key".to_string()),
        ENV_LEDGER_ID => Some(spreadsheet_id.clone()),
        ENV_SERVICE_ACCOUNT => Some(TEST_SERVICE_ACCOUNT_JSON.to_string()),
        _ => None,
    })
}

// =============================================================================
// Data Factories
// =============================================================================

/// A finished request with two models and a fixed timestamp.
#[must_use]
pub fn make_test_ledger_row() -> LedgerRow {
    let mut breakdown = BTreeMap::new();
    breakdown.insert(
        "claude-sonnet-4".to_string(),
        ModelUsage {
            calls: 2,
            cost: 0.036,
        },
    );
    breakdown.insert(
        "gpt-4o-mini".to_string(),
        ModelUsage {
            calls: 1,
            cost: 0.00046,
        },
    );
    LedgerRow {
        timestamp: Utc
            .with_ymd_and_hms(2026, 5, 4, 12, 0, 0)
            .single()
            .unwrap_or_else(Utc::now),
        service: "market-report".to_string(),
        user: "user-42".to_string(),
        inputs: json!({"ticker": "ACME", "depth": "full"}),
        cost_usd: 0.03646,
        duration: Duration::from_millis(12_340),
        results: json!({"pages": 4, "status": "ok"}),
        breakdown,
    }
}

/// An email with one spreadsheet attachment.
#[must_use]
pub fn make_test_email() -> EmailMessage {
    EmailMessage::new(
        "user@example.com",
        "Your market report",
        "<h1>Report ready</h1><p>See attached.</p>",
    )
    .with_attachment(Attachment::new("report.xlsx", b"PK\x03\x04sheet".to_vec()))
}

/// Config file pointing every upstream at `base_url`, with a tiny backoff.
#[must_use]
pub fn make_test_config_toml(base_url: &str) -> String {
    format!(
        r#"[http]
timeout_secs = 5

[notify]
endpoint = "{base_url}/v3/mail/send"
sender_name = "Spendlog Test"
max_retries = 3
base_delay_ms = 5

[ledger]
endpoint = "{base_url}"
sheet_range = "Sheet1!A:H"

[pricing.rates."house-model"]
input = 1.0
output = 2.0
"#
    )
}

// =============================================================================
// Temporary Directory
// =============================================================================

/// An isolated temporary directory, removed on drop.
pub struct TestDir {
    inner: tempfile::TempDir,
}

impl TestDir {
    /// # Panics
    ///
    /// Panics if the temporary directory cannot be created.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: tempfile::tempdir().expect("Failed to create temp directory"),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        self.inner.path()
    }

    /// Create a file, with parent directories as needed.
    ///
    /// # Panics
    ///
    /// Panics if the file cannot be created or written.
    pub fn create_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.inner.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        let mut file = fs::File::create(&path).expect("Failed to create test file");
        file.write_all(content.as_bytes())
            .expect("Failed to write test file");
        path
    }

    #[must_use]
    pub fn file_path(&self, name: &str) -> PathBuf {
        self.inner.path().join(name)
    }
}

impl Default for TestDir {
    fn default() -> Self {
        Self::new()
    }
}
