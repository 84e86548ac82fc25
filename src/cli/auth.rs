//! Auth command implementation.
//!
//! Performs a real token exchange so operators can check the service account
//! before relying on the ledger. The token itself is never printed.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cli::args::OutputFormat;
use crate::cli::output::CommandOutput;
use crate::core::services::Services;
use crate::error::Result;
use crate::util::format_countdown;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthReport {
    pub client_email: String,
    pub fingerprint: String,
    pub token_uri: String,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Execute the auth command.
///
/// # Errors
///
/// Returns an error if the credential is missing or unusable, or the
/// identity provider rejects the assertion.
pub async fn execute(services: &Services, format: OutputFormat, pretty: bool) -> Result<()> {
    let credential = services.service_credential()?;
    tracing::debug!(fingerprint = %credential.fingerprint(), "exchanging assertion");

    services.tokens().get_token(&credential).await?;
    let report = AuthReport {
        client_email: credential.client_email.clone(),
        fingerprint: credential.fingerprint(),
        token_uri: credential.token_uri.clone(),
        expires_at: services.tokens().cached().map(|t| t.expires_at),
    };

    match format {
        OutputFormat::Json => CommandOutput::new("auth", report).print(pretty),
        OutputFormat::Human => {
            println!("Authenticated as {}", report.client_email);
            println!("  key fingerprint  {}", report.fingerprint);
            if let Some(expires_at) = report.expires_at {
                println!(
                    "  token expires    {} ({})",
                    expires_at.to_rfc3339(),
                    format_countdown(expires_at, Utc::now())
                );
            }
            Ok(())
        }
    }
}
