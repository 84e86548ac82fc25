//! Service-account authentication with a shared bearer-token cache.
//!
//! A signed RS256 assertion is exchanged at the identity provider's token
//! endpoint (JWT-bearer grant). The resulting token is cached process-wide
//! and reused until fewer than [`REFRESH_MARGIN_SECS`] seconds remain.
//!
//! The cache holds a single token for a single identity. Concurrent refreshes
//! may race; each writer holds a valid token and the last store wins.

use std::fmt;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use arc_swap::ArcSwapOption;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::core::http::{DEFAULT_TIMEOUT, error_body, transport_error};
use crate::error::{Result, SpendlogError};

/// Token endpoint used when the credential does not name one.
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// OAuth scope needed to append spreadsheet rows.
pub const SPREADSHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

/// Lifetime requested for each signed assertion.
pub const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Cached tokens with less validity than this are replaced.
pub const REFRESH_MARGIN_SECS: i64 = 300;

/// Longest token lifetime accepted from the token endpoint.
pub const MAX_TOKEN_LIFETIME_SECS: i64 = 86_400;

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

// =============================================================================
// Service Credential
// =============================================================================

/// Service-account identity, as found in a provider-issued key file.
#[derive(Clone, Deserialize)]
pub struct ServiceCredential {
    /// Issuer of signed assertions.
    pub client_email: String,
    /// PEM-encoded RSA private key.
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl fmt::Debug for ServiceCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceCredential")
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

impl ServiceCredential {
    #[must_use]
    pub fn new(client_email: impl Into<String>, private_key: impl Into<String>) -> Self {
        Self {
            client_email: client_email.into(),
            private_key: normalize_pem(&private_key.into()),
            token_uri: default_token_uri(),
        }
    }

    #[must_use]
    pub fn with_token_uri(mut self, token_uri: impl Into<String>) -> Self {
        self.token_uri = token_uri.into();
        self
    }

    /// Parse a service-account key file.
    ///
    /// # Errors
    ///
    /// Returns [`SpendlogError::InvalidCredential`] if the JSON is malformed or
    /// lacks the issuer email or private key.
    pub fn from_json(json: &str) -> Result<Self> {
        let mut credential: Self =
            serde_json::from_str(json).map_err(|e| SpendlogError::InvalidCredential {
                reason: format!("service account JSON: {e}"),
            })?;
        if credential.client_email.trim().is_empty() {
            return Err(SpendlogError::InvalidCredential {
                reason: "client_email is empty".to_string(),
            });
        }
        if credential.private_key.trim().is_empty() {
            return Err(SpendlogError::InvalidCredential {
                reason: "private_key is empty".to_string(),
            });
        }
        credential.private_key = normalize_pem(&credential.private_key);
        Ok(credential)
    }

    /// Short SHA-256 fingerprint of the private key, safe to log.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.private_key.trim().as_bytes());
        hex::encode(&digest[..6])
    }
}

/// Keys pasted into environment variables often carry literal `\n` escapes.
fn normalize_pem(key: &str) -> String {
    if key.contains("\\n") && !key.contains('\n') {
        key.replace("\\n", "\n")
    } else {
        key.to_string()
    }
}

// =============================================================================
// Assertion
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct AssertionClaims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

/// Sign a JWT-bearer assertion for `credential`.
///
/// # Errors
///
/// Returns [`SpendlogError::InvalidCredential`] if the private key is not a
/// usable RSA PEM key.
pub fn sign_assertion(
    credential: &ServiceCredential,
    scope: &str,
    issued_at: DateTime<Utc>,
) -> Result<String> {
    let iat = issued_at.timestamp();
    let claims = AssertionClaims {
        iss: credential.client_email.clone(),
        scope: scope.to_string(),
        aud: credential.token_uri.clone(),
        iat,
        exp: iat + ASSERTION_LIFETIME_SECS,
    };

    let key = EncodingKey::from_rsa_pem(credential.private_key.as_bytes()).map_err(|e| {
        SpendlogError::InvalidCredential {
            reason: format!("private key: {e}"),
        }
    })?;

    encode(&Header::new(Algorithm::RS256), &claims, &key).map_err(|e| {
        SpendlogError::InvalidCredential {
            reason: format!("signing assertion: {e}"),
        }
    })
}

// =============================================================================
// Token Cache
// =============================================================================

/// A bearer token and the instant it stops being valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedToken {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

impl CachedToken {
    /// Whether the token still has the full safety margin at `now`.
    #[must_use]
    pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.signed_duration_since(now) >= Duration::seconds(REFRESH_MARGIN_SECS)
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

const fn default_expires_in() -> i64 {
    ASSERTION_LIFETIME_SECS
}

/// Process-wide bearer-token cache for one service identity.
pub struct TokenCache {
    client: Client,
    scope: String,
    timeout: StdDuration,
    cached: ArcSwapOption<CachedToken>,
}

impl TokenCache {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self {
            client,
            scope: SPREADSHEETS_SCOPE.to_string(),
            timeout: DEFAULT_TIMEOUT,
            cached: ArcSwapOption::empty(),
        }
    }

    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    /// Timeout the client was built with, used in error reports.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: StdDuration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Return a bearer token, exchanging a fresh assertion when needed.
    ///
    /// # Errors
    ///
    /// Returns [`SpendlogError::AuthRejected`] if the token endpoint does not
    /// answer with success, [`SpendlogError::InvalidCredential`] if the
    /// assertion cannot be signed, or a network error.
    pub async fn get_token(&self, credential: &ServiceCredential) -> Result<String> {
        self.get_token_at(credential, Utc::now()).await
    }

    /// [`get_token`](Self::get_token) evaluated against an explicit clock.
    ///
    /// # Errors
    ///
    /// Same as [`get_token`](Self::get_token).
    pub async fn get_token_at(
        &self,
        credential: &ServiceCredential,
        now: DateTime<Utc>,
    ) -> Result<String> {
        if let Some(token) = self.cached.load_full() {
            if token.is_usable_at(now) {
                tracing::trace!(expires_at = %token.expires_at, "using cached bearer token");
                return Ok(token.access_token.clone());
            }
        }

        let fresh = self.exchange(credential, now).await?;
        let access_token = fresh.access_token.clone();
        self.cached.store(Some(Arc::new(fresh)));
        Ok(access_token)
    }

    /// Snapshot of the cached token, if any.
    #[must_use]
    pub fn cached(&self) -> Option<Arc<CachedToken>> {
        self.cached.load_full()
    }

    /// Drop the cached token so the next call exchanges again.
    pub fn invalidate(&self) {
        self.cached.store(None);
    }

    async fn exchange(
        &self,
        credential: &ServiceCredential,
        issued_at: DateTime<Utc>,
    ) -> Result<CachedToken> {
        let assertion = sign_assertion(credential, &self.scope, issued_at)?;

        tracing::debug!(
            issuer = %credential.client_email,
            key = %credential.fingerprint(),
            "exchanging service-account assertion"
        );

        let response = self
            .client
            .post(&credential.token_uri)
            .form(&[
                ("grant_type", JWT_BEARER_GRANT),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await
            .map_err(|e| transport_error(&e, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            let message = error_body(response).await;
            tracing::warn!(status = status.as_u16(), "token exchange rejected");
            return Err(SpendlogError::AuthRejected {
                status: status.as_u16(),
                message,
            });
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| SpendlogError::ParseResponse(format!("token response: {e}")))?;

        if !(1..=MAX_TOKEN_LIFETIME_SECS).contains(&body.expires_in) {
            return Err(SpendlogError::ParseResponse(format!(
                "token response: expires_in {} out of range",
                body.expires_in
            )));
        }
        let expires_at = Duration::try_seconds(body.expires_in)
            .and_then(|lifetime| issued_at.checked_add_signed(lifetime))
            .ok_or_else(|| {
                SpendlogError::ParseResponse("token response: expiry overflows".to_string())
            })?;
        tracing::debug!(%expires_at, "minted bearer token");

        Ok(CachedToken {
            access_token: body.access_token,
            expires_at,
        })
    }
}
