//! Email notifications with bounded retries.
//!
//! Each attempt POSTs the full payload to the provider. A 2xx ends the loop,
//! a 4xx other than 429 fails at once, and anything else (5xx, 429, transport
//! failure) is retried after `base_delay * 2^attempt` until the attempt budget
//! runs out.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::{Client, StatusCode};
use serde::Serialize;

use crate::core::http::{DEFAULT_TIMEOUT, error_body, transport_error};
use crate::core::models::{Attachment, EmailMessage};
use crate::error::{Result, SpendlogError};
use crate::storage::NotifyCredentials;

/// Provider send endpoint.
pub const DEFAULT_SEND_ENDPOINT: &str = "https://api.sendgrid.com/v3/mail/send";

/// Total attempts per message, including the first.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Sender display name used when neither the message nor the environment sets one.
pub const DEFAULT_SENDER_NAME: &str = "Spendlog";

const MESSAGE_ID_HEADER: &str = "x-message-id";

// =============================================================================
// Retry Policy
// =============================================================================

/// How many times to try and how long to wait between tries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Wait after failed attempt `attempt` (1-based).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2_u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }
}

// =============================================================================
// Provider Payload
// =============================================================================

#[derive(Debug, Serialize)]
struct Address<'a> {
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct Personalization<'a> {
    to: [Address<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    value: &'a str,
}

#[derive(Debug, Serialize)]
struct AttachmentPayload<'a> {
    filename: &'a str,
    content: String,
    #[serde(rename = "type")]
    mime_type: String,
    disposition: &'static str,
}

impl<'a> From<&'a Attachment> for AttachmentPayload<'a> {
    fn from(attachment: &'a Attachment) -> Self {
        Self {
            filename: &attachment.filename,
            content: STANDARD.encode(&attachment.content),
            mime_type: attachment.resolved_mime_type(),
            disposition: "attachment",
        }
    }
}

#[derive(Debug, Serialize)]
struct SendPayload<'a> {
    personalizations: [Personalization<'a>; 1],
    from: Address<'a>,
    subject: &'a str,
    content: [Content<'a>; 1],
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attachments: Vec<AttachmentPayload<'a>>,
}

// =============================================================================
// Notifier
// =============================================================================

/// Result of a delivered message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryReceipt {
    /// Attempt that succeeded (1-based).
    pub attempts: u32,
    pub status: u16,
    /// Provider message id, when returned.
    pub message_id: Option<String>,
}

enum AttemptError {
    Permanent(SpendlogError),
    Transient(SpendlogError),
}

/// Sends HTML email through the provider's HTTP API.
pub struct Notifier {
    client: Client,
    endpoint: String,
    credentials: NotifyCredentials,
    policy: RetryPolicy,
    timeout: Duration,
    default_sender_name: String,
}

impl Notifier {
    #[must_use]
    pub fn new(client: Client, credentials: NotifyCredentials) -> Self {
        Self {
            client,
            endpoint: DEFAULT_SEND_ENDPOINT.to_string(),
            credentials,
            policy: RetryPolicy::default(),
            timeout: DEFAULT_TIMEOUT,
            default_sender_name: DEFAULT_SENDER_NAME.to_string(),
        }
    }

    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    #[must_use]
    pub const fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sender name used when neither the message nor the environment sets one.
    #[must_use]
    pub fn with_default_sender_name(mut self, name: impl Into<String>) -> Self {
        self.default_sender_name = name.into();
        self
    }

    #[must_use]
    pub const fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Send with the configured attempt budget.
    ///
    /// # Errors
    ///
    /// See [`Notifier::send_with_retries`].
    pub async fn send(&self, message: &EmailMessage) -> Result<DeliveryReceipt> {
        self.send_with_retries(message, self.policy.max_attempts).await
    }

    /// Send, making at most `max_attempts` attempts in total.
    ///
    /// # Errors
    ///
    /// Returns [`SpendlogError::DeliveryRejected`] on a non-retryable client
    /// error, or [`SpendlogError::DeliveryExhausted`] once every attempt failed.
    pub async fn send_with_retries(
        &self,
        message: &EmailMessage,
        max_attempts: u32,
    ) -> Result<DeliveryReceipt> {
        let max_attempts = max_attempts.max(1);
        let payload = self.payload(message);
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            match self.attempt(&payload).await {
                Ok((status, message_id)) => {
                    tracing::info!(
                        to = %message.to,
                        attempt,
                        status,
                        attachments = message.attachments.len(),
                        "notification delivered"
                    );
                    return Ok(DeliveryReceipt {
                        attempts: attempt,
                        status,
                        message_id,
                    });
                }
                Err(AttemptError::Permanent(e)) => {
                    tracing::error!(
                        to = %message.to,
                        attempt,
                        code = e.error_code(),
                        error = %e,
                        "notification rejected, not retrying"
                    );
                    return Err(e);
                }
                Err(AttemptError::Transient(e)) => {
                    last_error = e.to_string();
                    if attempt < max_attempts {
                        let delay = self.policy.delay_for(attempt);
                        tracing::warn!(
                            to = %message.to,
                            attempt,
                            max_attempts,
                            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                            error = %e,
                            "notification attempt failed, retrying"
                        );
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        tracing::error!(
            to = %message.to,
            attempts = max_attempts,
            error = %last_error,
            "notification failed after all attempts"
        );
        Err(SpendlogError::DeliveryExhausted {
            attempts: max_attempts,
            last_error,
        })
    }

    fn payload<'a>(&'a self, message: &'a EmailMessage) -> SendPayload<'a> {
        let name = message
            .sender_name
            .as_deref()
            .or(self.credentials.sender_name.as_deref())
            .unwrap_or(&self.default_sender_name);

        SendPayload {
            personalizations: [Personalization {
                to: [Address {
                    email: &message.to,
                    name: None,
                }],
            }],
            from: Address {
                email: &self.credentials.sender_email,
                name: Some(name),
            },
            subject: &message.subject,
            content: [Content {
                kind: "text/html",
                value: &message.html,
            }],
            attachments: message.attachments.iter().map(AttachmentPayload::from).collect(),
        }
    }

    async fn attempt(
        &self,
        payload: &SendPayload<'_>,
    ) -> std::result::Result<(u16, Option<String>), AttemptError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.credentials.api_key)
            .json(payload)
            .send()
            .await
            .map_err(|e| AttemptError::Transient(transport_error(&e, self.timeout)))?;

        let status = response.status();
        if status.is_success() {
            let message_id = response
                .headers()
                .get(MESSAGE_ID_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            return Ok((status.as_u16(), message_id));
        }

        let message = error_body(response).await;
        let error = SpendlogError::DeliveryRejected {
            status: status.as_u16(),
            message,
        };
        if is_permanent(status) {
            Err(AttemptError::Permanent(error))
        } else {
            Err(AttemptError::Transient(error))
        }
    }
}

/// Client errors cannot heal by retrying, except rate limiting.
fn is_permanent(status: StatusCode) -> bool {
    status.is_client_error() && status != StatusCode::TOO_MANY_REQUESTS
}
