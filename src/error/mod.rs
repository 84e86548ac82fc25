//! Error types for spendlog.
//!
//! Uses `thiserror` for structured error types that map to exit codes.
//!
//! ## Error Taxonomy
//!
//! Errors are categorized into six main categories:
//! - **Authentication**: The identity provider rejected a signed assertion,
//!   or the service-account credential could not be used to sign one
//! - **Network**: Transport failures talking to any upstream
//! - **Configuration**: Missing environment values, config file problems
//! - **Delivery**: Notification sends that failed terminally
//! - **Telemetry**: Ledger writes; recovered locally and only logged
//! - **Internal**: Unexpected errors, bugs, or unclassified issues
//!
//! Each error has a stable error code (e.g., `SPND-A001`) for programmatic handling.

use thiserror::Error;

// =============================================================================
// Error Categories
// =============================================================================

/// High-level error categories for classification and routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Identity-provider and credential issues.
    Authentication,
    /// Transport failures (timeouts, refused connections, DNS).
    Network,
    /// Missing or invalid configuration.
    Configuration,
    /// Notification delivery failed terminally.
    Delivery,
    /// Ledger writes and cost tracking.
    Telemetry,
    /// Internal errors (bugs, unexpected state, unclassified).
    Internal,
}

impl ErrorCategory {
    /// Returns a human-readable description of the category.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::Authentication => "Authentication error",
            Self::Network => "Network error",
            Self::Configuration => "Configuration error",
            Self::Delivery => "Delivery error",
            Self::Telemetry => "Telemetry error",
            Self::Internal => "Internal error",
        }
    }

    /// Returns a short code prefix for this category.
    #[must_use]
    pub const fn code_prefix(&self) -> &'static str {
        match self {
            Self::Authentication => "A",
            Self::Network => "N",
            Self::Configuration => "C",
            Self::Delivery => "D",
            Self::Telemetry => "T",
            Self::Internal => "X",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

// =============================================================================
// Exit Codes
// =============================================================================

/// Process exit codes for the `spendlog` binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    /// Success
    Success = 0,
    /// Unexpected failure
    GeneralError = 1,
    /// Missing or invalid configuration
    ConfigError = 2,
    /// Identity provider rejected the credential
    AuthError = 3,
    /// Notification could not be delivered
    DeliveryError = 4,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as Self
    }
}

/// Main error type for spendlog operations.
#[derive(Error, Debug)]
pub enum SpendlogError {
    // ==========================================================================
    // Authentication errors (Category: Authentication)
    // ==========================================================================
    /// The token endpoint did not return success for the signed assertion.
    #[error("token exchange rejected (HTTP {status}): {message}")]
    AuthRejected { status: u16, message: String },

    /// The service-account credential is unusable (bad key, bad JSON).
    #[error("invalid service credential: {reason}")]
    InvalidCredential { reason: String },

    // ==========================================================================
    // Network errors (Category: Network)
    // ==========================================================================
    /// Request timed out.
    #[error("request timeout after {0} seconds")]
    Timeout(u64),

    /// Generic transport failure.
    #[error("network error: {0}")]
    Network(String),

    // ==========================================================================
    // Configuration errors (Category: Configuration)
    // ==========================================================================
    /// Required environment variable not set.
    #[error("environment variable not set: {name}")]
    EnvVarMissing { name: String },

    /// Error parsing configuration file.
    #[error("config parse error at {path}: {message}")]
    ConfigParse { path: String, message: String },

    /// Invalid value in configuration.
    #[error("invalid config value for '{key}': {message}")]
    ConfigInvalid {
        key: String,
        value: String,
        message: String,
    },

    /// Generic configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    // ==========================================================================
    // Delivery errors (Category: Delivery)
    // ==========================================================================
    /// Provider answered with a client error that retrying cannot fix.
    #[error("notification rejected (HTTP {status}): {message}")]
    DeliveryRejected { status: u16, message: String },

    /// Every attempt failed with a transient error.
    #[error("notification failed after {attempts} attempt(s): {last_error}")]
    DeliveryExhausted { attempts: u32, last_error: String },

    // ==========================================================================
    // Telemetry errors (Category: Telemetry)
    // ==========================================================================
    /// Ledger append failed. Never surfaced past the ledger client.
    #[error("ledger write failed: {0}")]
    TelemetryWrite(String),

    // ==========================================================================
    // Parse / I/O errors (Category: Internal)
    // ==========================================================================
    /// Failed to parse an upstream response.
    #[error("failed to parse response: {0}")]
    ParseResponse(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Catch-all for other errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SpendlogError {
    /// Map error to a process exit code.
    #[must_use]
    pub const fn exit_code(&self) -> ExitCode {
        match self.category() {
            ErrorCategory::Configuration => ExitCode::ConfigError,
            ErrorCategory::Authentication => ExitCode::AuthError,
            ErrorCategory::Delivery => ExitCode::DeliveryError,
            ErrorCategory::Network | ErrorCategory::Telemetry | ErrorCategory::Internal => {
                ExitCode::GeneralError
            }
        }
    }

    /// Returns the error category for classification and routing.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::AuthRejected { .. } | Self::InvalidCredential { .. } => {
                ErrorCategory::Authentication
            }

            Self::Timeout(_) | Self::Network(_) => ErrorCategory::Network,

            Self::EnvVarMissing { .. }
            | Self::ConfigParse { .. }
            | Self::ConfigInvalid { .. }
            | Self::Config(_) => ErrorCategory::Configuration,

            Self::DeliveryRejected { .. } | Self::DeliveryExhausted { .. } => {
                ErrorCategory::Delivery
            }

            Self::TelemetryWrite(_) => ErrorCategory::Telemetry,

            Self::ParseResponse(_) | Self::Io(_) | Self::Json(_) | Self::Other(_) => {
                ErrorCategory::Internal
            }
        }
    }

    /// Returns a stable error code for programmatic handling.
    ///
    /// Format: `SPND-{category}{number}`.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            // Authentication errors (A001-A099)
            Self::AuthRejected { .. } => "SPND-A001",
            Self::InvalidCredential { .. } => "SPND-A002",

            // Network errors (N001-N099)
            Self::Timeout(_) => "SPND-N001",
            Self::Network(_) => "SPND-N099",

            // Configuration errors (C001-C099)
            Self::EnvVarMissing { .. } => "SPND-C001",
            Self::ConfigParse { .. } => "SPND-C002",
            Self::ConfigInvalid { .. } => "SPND-C003",
            Self::Config(_) => "SPND-C004",

            // Delivery errors (D001-D099)
            Self::DeliveryRejected { .. } => "SPND-D001",
            Self::DeliveryExhausted { .. } => "SPND-D002",

            // Telemetry errors (T001-T099)
            Self::TelemetryWrite(_) => "SPND-T001",

            // Internal errors (X001-X099)
            Self::ParseResponse(_) => "SPND-X001",
            Self::Io(_) => "SPND-X002",
            Self::Json(_) => "SPND-X003",
            Self::Other(_) => "SPND-X099",
        }
    }

    /// Returns whether retrying the same operation could succeed.
    ///
    /// Only transport-level failures qualify. Delivery errors are already
    /// terminal: the notification client has done its own retrying.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Network(_))
    }
}

/// Result type alias for spendlog operations.
pub type Result<T> = std::result::Result<T, SpendlogError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_env_is_configuration() {
        let err = SpendlogError::EnvVarMissing {
            name: "SENDGRID_API_KEY".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert_eq!(err.exit_code(), ExitCode::ConfigError);
        assert_eq!(err.error_code(), "SPND-C001");
        assert!(err.to_string().contains("SENDGRID_API_KEY"));
    }

    #[test]
    fn delivery_errors_are_not_retryable() {
        let rejected = SpendlogError::DeliveryRejected {
            status: 400,
            message: "bad request".to_string(),
        };
        let exhausted = SpendlogError::DeliveryExhausted {
            attempts: 3,
            last_error: "HTTP 503".to_string(),
        };
        assert!(!rejected.is_retryable());
        assert!(!exhausted.is_retryable());
        assert_eq!(rejected.exit_code(), ExitCode::DeliveryError);
        assert_eq!(exhausted.category(), ErrorCategory::Delivery);
    }

    #[test]
    fn network_errors_are_retryable() {
        assert!(SpendlogError::Network("connection reset".to_string()).is_retryable());
        assert!(SpendlogError::Timeout(30).is_retryable());
    }

    #[test]
    fn auth_rejection_maps_to_auth_exit() {
        let err = SpendlogError::AuthRejected {
            status: 400,
            message: "invalid_grant".to_string(),
        };
        assert_eq!(err.exit_code(), ExitCode::AuthError);
        assert_eq!(err.category().code_prefix(), "A");
    }

    #[test]
    fn error_codes_use_category_prefix() {
        let errors = [
            SpendlogError::TelemetryWrite("x".to_string()),
            SpendlogError::Config("x".to_string()),
            SpendlogError::ParseResponse("x".to_string()),
        ];
        for err in errors {
            let expected = format!("SPND-{}", err.category().code_prefix());
            assert!(
                err.error_code().starts_with(&expected),
                "{} should start with {}",
                err.error_code(),
                expected
            );
        }
    }
}
