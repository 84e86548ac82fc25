//! Configuration file loading and environment secrets.
//!
//! Tunables load from a TOML file:
//! - `SPENDLOG_CONFIG` if set
//! - otherwise `<config dir>/spendlog/config.toml`
//!
//! A missing file means built-in defaults. Credentials never live in the
//! file; they come from the environment:
//!
//! - `SENDER_EMAIL`: From address for notifications (required to send)
//! - `SENDER_NAME`: From display name (optional)
//! - `SENDGRID_API_KEY`: Notification provider key (required to send)
//! - `LEDGER_SPREADSHEET_ID`: Ledger spreadsheet (optional; telemetry is off without it)
//! - `GOOGLE_SERVICE_ACCOUNT_JSON`: Service-account key, inline JSON or a path

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::AppPaths;
use crate::core::auth::{SPREADSHEETS_SCOPE, ServiceCredential};
use crate::core::ledger::{DEFAULT_SHEET_RANGE, DEFAULT_SHEETS_ENDPOINT};
use crate::core::notify::{
    DEFAULT_MAX_ATTEMPTS, DEFAULT_SEND_ENDPOINT, DEFAULT_SENDER_NAME, RetryPolicy,
};
use crate::core::pricing::ModelRate;
use crate::error::{Result, SpendlogError};

// =============================================================================
// Environment Variable Names
// =============================================================================

/// Environment variable to override config file path.
pub const ENV_CONFIG: &str = "SPENDLOG_CONFIG";
/// Sender address for notifications.
pub const ENV_SENDER_EMAIL: &str = "SENDER_EMAIL";
/// Sender display name for notifications.
pub const ENV_SENDER_NAME: &str = "SENDER_NAME";
/// Notification provider API key.
pub const ENV_SENDGRID_API_KEY: &str = "SENDGRID_API_KEY";
/// Ledger spreadsheet identifier.
pub const ENV_LEDGER_ID: &str = "LEDGER_SPREADSHEET_ID";
/// Service-account key (inline JSON or file path).
pub const ENV_SERVICE_ACCOUNT: &str = "GOOGLE_SERVICE_ACCOUNT_JSON";

/// Bounds for `http.timeout_secs`.
const TIMEOUT_RANGE: std::ops::RangeInclusive<u64> = 1..=300;

// =============================================================================
// Config File
// =============================================================================

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub http: HttpConfig,
    pub notify: NotifyConfig,
    pub ledger: LedgerConfig,
    pub auth: AuthConfig,
    pub pricing: PricingConfig,
}

/// HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

/// Notification provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// Mail-send endpoint.
    pub endpoint: String,
    /// Display name used when `SENDER_NAME` is unset.
    pub sender_name: String,
    /// Total attempts per message.
    pub max_retries: u32,
    /// Backoff unit; attempt `n` waits `base * 2^n`.
    pub base_delay_ms: u64,
}

/// Ledger settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Spreadsheet API base URL.
    pub endpoint: String,
    /// Range rows are appended to.
    pub sheet_range: String,
}

/// Identity provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// OAuth scope requested in the assertion.
    pub scope: String,
}

/// Rate table additions and overrides (USD per 1000 tokens).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    pub rates: BTreeMap<String, ModelRate>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { timeout_secs: 30 }
    }
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_SEND_ENDPOINT.to_string(),
            sender_name: DEFAULT_SENDER_NAME.to_string(),
            max_retries: DEFAULT_MAX_ATTEMPTS,
            base_delay_ms: 1000,
        }
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_SHEETS_ENDPOINT.to_string(),
            sheet_range: DEFAULT_SHEET_RANGE.to_string(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            scope: SPREADSHEETS_SCOPE.to_string(),
        }
    }
}

impl Config {
    /// Load configuration, respecting the `SPENDLOG_CONFIG` override.
    ///
    /// Returns default config if the file doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns error only if the file exists but is invalid.
    pub fn load() -> Result<Self> {
        if let Ok(path) = std::env::var(ENV_CONFIG) {
            return Self::load_from(Path::new(&path));
        }
        let paths = AppPaths::new();
        Self::load_from(&paths.config_file())
    }

    /// Load configuration from a specific path.
    ///
    /// Returns default config if the file doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns error only if the file exists but is invalid.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(?path, "Config file not found, using defaults");
            return Ok(Self::default());
        }

        tracing::debug!(?path, "Loading config file");
        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content).map_err(|e| SpendlogError::ConfigParse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns [`SpendlogError::ConfigInvalid`] naming the first bad key.
    pub fn validate(&self) -> Result<()> {
        if !TIMEOUT_RANGE.contains(&self.http.timeout_secs) {
            return Err(invalid(
                "http.timeout_secs",
                self.http.timeout_secs,
                "Timeout must be between 1 and 300 seconds",
            ));
        }
        if self.notify.max_retries == 0 {
            return Err(invalid(
                "notify.max_retries",
                self.notify.max_retries,
                "At least one attempt is required",
            ));
        }
        if self.notify.endpoint.trim().is_empty() {
            return Err(invalid("notify.endpoint", "", "Endpoint must not be empty"));
        }
        if self.ledger.endpoint.trim().is_empty() {
            return Err(invalid("ledger.endpoint", "", "Endpoint must not be empty"));
        }
        for (model, rate) in &self.pricing.rates {
            if !(rate.input.is_finite() && rate.output.is_finite())
                || rate.input < 0.0
                || rate.output < 0.0
            {
                return Err(invalid(
                    &format!("pricing.rates.{model}"),
                    format!("{}/{}", rate.input, rate.output),
                    "Rates must be non-negative numbers",
                ));
            }
        }
        Ok(())
    }

    /// HTTP timeout as a duration.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.http.timeout_secs)
    }

    /// Retry policy for notifications.
    #[must_use]
    pub const fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.notify.max_retries,
            base_delay: Duration::from_millis(self.notify.base_delay_ms),
        }
    }
}

fn invalid(key: &str, value: impl fmt::Display, message: &str) -> SpendlogError {
    SpendlogError::ConfigInvalid {
        key: key.to_string(),
        value: value.to_string(),
        message: message.to_string(),
    }
}

// =============================================================================
// Environment Secrets
// =============================================================================

/// Credentials needed to send notifications.
#[derive(Clone)]
pub struct NotifyCredentials {
    pub api_key: String,
    pub sender_email: String,
    pub sender_name: Option<String>,
}

impl fmt::Debug for NotifyCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotifyCredentials")
            .field("api_key", &"<redacted>")
            .field("sender_email", &self.sender_email)
            .field("sender_name", &self.sender_name)
            .finish()
    }
}

/// Everything the ledger needs; absent means telemetry is disabled.
#[derive(Debug, Clone)]
pub struct LedgerSettings {
    pub spreadsheet_id: String,
    pub credential: ServiceCredential,
}

/// Secrets read from the process environment.
#[derive(Clone, Default)]
pub struct Secrets {
    vars: BTreeMap<&'static str, String>,
}

impl fmt::Debug for Secrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secrets")
            .field("present", &self.vars.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Secrets {
    const NAMES: [&'static str; 5] = [
        ENV_SENDER_EMAIL,
        ENV_SENDER_NAME,
        ENV_SENDGRID_API_KEY,
        ENV_LEDGER_ID,
        ENV_SERVICE_ACCOUNT,
    ];

    /// Read secrets from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read secrets through an arbitrary lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let vars = Self::NAMES
            .iter()
            .filter_map(|&name| {
                lookup(name)
                    .map(|v| v.trim().to_string())
                    .filter(|v| !v.is_empty())
                    .map(|v| (name, v))
            })
            .collect();
        Self { vars }
    }

    fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    fn require(&self, name: &str) -> Result<&str> {
        self.get(name).ok_or_else(|| SpendlogError::EnvVarMissing {
            name: name.to_string(),
        })
    }

    /// Credentials for the notification provider.
    ///
    /// # Errors
    ///
    /// Returns [`SpendlogError::EnvVarMissing`] if the sender address or the
    /// provider key is unset.
    pub fn notify_credentials(&self) -> Result<NotifyCredentials> {
        Ok(NotifyCredentials {
            api_key: self.require(ENV_SENDGRID_API_KEY)?.to_string(),
            sender_email: self.require(ENV_SENDER_EMAIL)?.to_string(),
            sender_name: self.get(ENV_SENDER_NAME).map(str::to_string),
        })
    }

    /// Service-account credential, if configured and parseable.
    ///
    /// # Errors
    ///
    /// Returns [`SpendlogError::EnvVarMissing`] when unset, or
    /// [`SpendlogError::InvalidCredential`] / I/O errors when unusable.
    pub fn service_credential(&self) -> Result<ServiceCredential> {
        let raw = self.require(ENV_SERVICE_ACCOUNT)?;
        if raw.starts_with('{') {
            ServiceCredential::from_json(raw)
        } else {
            let content = fs::read_to_string(raw)?;
            ServiceCredential::from_json(&content)
        }
    }

    /// Ledger settings, or `None` when telemetry is not configured.
    ///
    /// An unusable credential disables telemetry with a warning rather than
    /// failing the caller.
    #[must_use]
    pub fn ledger_settings(&self) -> Option<LedgerSettings> {
        let spreadsheet_id = self.get(ENV_LEDGER_ID)?.to_string();
        self.get(ENV_SERVICE_ACCOUNT)?;
        match self.service_credential() {
            Ok(credential) => Some(LedgerSettings {
                spreadsheet_id,
                credential,
            }),
            Err(e) => {
                tracing::warn!(error = %e, "service account unusable, ledger disabled");
                None
            }
        }
    }
}
