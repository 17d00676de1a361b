//! Mandrill mailer backend
//!
//! Maps normalized messages onto the Mandrill send API and posts them.
//! Request mapping is pure and happens before the network call; transport
//! failures map onto the crate error type via the reqwest conversions.

pub mod payload;

pub use payload::{SendRequest, SEND_ENDPOINT, SEND_TEMPLATE_ENDPOINT};

use crate::config::Config;
use crate::email::{Mailer, RecipientOutcome, RecipientStatus, SendStatus};
use crate::error::{ErrorContext, MailwayError, Result};
use crate::message::OutboundMessage;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

/// Request timeout for provider API calls
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Cap on response text captured into error details
const ERROR_DETAIL_LIMIT: usize = 500;

/// One entry of the provider's send response array
#[derive(Debug, Deserialize)]
struct SendResponseEntry {
    email: String,
    status: RecipientOutcome,
    #[serde(default)]
    reject_reason: Option<String>,
    #[serde(default, rename = "_id")]
    id: Option<String>,
}

/// Mailer backed by the Mandrill HTTP API
///
/// # Example
///
/// ```rust,ignore
/// use mailway::{Config, OutboundMessage};
/// use mailway::email::{Mailer, MandrillMailer};
///
/// let mailer = MandrillMailer::new(Config::from_env()?)?;
/// let status = mailer.send(&message).await?;
/// ```
pub struct MandrillMailer {
    http: reqwest::Client,
    config: Config,
}

impl MandrillMailer {
    /// Create a new mailer with the given configuration
    pub fn new(config: Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| {
                MailwayError::configuration(format!("Failed to build HTTP client: {}", e))
            })?;
        Ok(Self { http, config })
    }

    /// Create a new mailer from environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(Config::from_env()?)
    }

    fn parse_send_status(&self, entries: Vec<SendResponseEntry>) -> Result<SendStatus> {
        let status = SendStatus {
            recipients: entries
                .into_iter()
                .map(|entry| RecipientStatus {
                    email: entry.email,
                    outcome: entry.status,
                    message_id: entry.id,
                    reject_reason: entry.reject_reason,
                })
                .collect(),
        };

        // Parallels SMTP behavior: an error only when *all* recipients
        // are invalid or refused, not when a subset bounces.
        if status.all_refused() && !self.config.ignore_recipient_status {
            return Err(MailwayError::RecipientsRefused);
        }

        Ok(status)
    }
}

#[async_trait]
impl Mailer for MandrillMailer {
    async fn send(&self, message: &OutboundMessage) -> Result<SendStatus> {
        // Mapping errors (including Serialization) surface here, before
        // any network traffic
        let request = SendRequest::build(message, &self.config)?;
        let endpoint = request.endpoint();

        let url = self.config.api_url.join(endpoint).map_err(|e| {
            MailwayError::configuration(format!("Invalid API endpoint URL: {}", e))
        })?;

        tracing::debug!(
            endpoint,
            recipients = request.message.to.len(),
            template = request.template_name.as_deref().unwrap_or(""),
            "Posting send request"
        );

        let response = self.http.post(url).json(&request).send().await?;
        let status = response.status();

        if status != reqwest::StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            let detail: String = body.chars().take(ERROR_DETAIL_LIMIT).collect();
            let recipients = message
                .to
                .iter()
                .map(|a| a.email.clone())
                .collect::<Vec<_>>()
                .join(",");

            let err = MailwayError::Api {
                status: status.as_u16(),
                detail,
            }
            .with_context(
                ErrorContext::new()
                    .with_detail(format!("sending to {}", recipients))
                    .with_context("endpoint", endpoint),
            );
            tracing::error!(error = %err, "Provider send call failed");
            return Err(err.into());
        }

        let entries: Vec<SendResponseEntry> = response.json().await.map_err(|e| {
            MailwayError::Api {
                status: status.as_u16(),
                detail: format!("Invalid JSON in provider response: {}", e),
            }
        })?;

        self.parse_send_status(entries)
    }

    fn is_healthy(&self) -> bool {
        // The client is stateless; connectivity problems surface per-send
        true
    }
}

impl std::fmt::Debug for MandrillMailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MandrillMailer")
            .field("api_url", &self.config.api_url.as_str())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mailer() -> MandrillMailer {
        MandrillMailer::new(Config::new("test-key")).unwrap()
    }

    fn entry(email: &str, status: &str) -> SendResponseEntry {
        serde_json::from_value(serde_json::json!({
            "email": email,
            "status": status,
            "_id": "abc123",
        }))
        .unwrap()
    }

    #[test]
    fn test_parse_send_status() {
        let status = mailer()
            .parse_send_status(vec![
                entry("a@example.com", "sent"),
                entry("b@example.com", "queued"),
            ])
            .unwrap();
        assert_eq!(status.recipients.len(), 2);
        assert_eq!(
            status.recipient("a@example.com").unwrap().outcome,
            RecipientOutcome::Sent
        );
        assert_eq!(
            status.recipient("a@example.com").unwrap().message_id.as_deref(),
            Some("abc123")
        );
    }

    #[test]
    fn test_all_refused_is_error() {
        let err = mailer()
            .parse_send_status(vec![
                entry("a@example.com", "rejected"),
                entry("b@example.com", "invalid"),
            ])
            .unwrap_err();
        assert!(matches!(err, MailwayError::RecipientsRefused));
    }

    #[test]
    fn test_partial_refusal_is_not_error() {
        let status = mailer()
            .parse_send_status(vec![
                entry("a@example.com", "rejected"),
                entry("b@example.com", "sent"),
            ])
            .unwrap();
        assert_eq!(
            status.recipient("a@example.com").unwrap().outcome,
            RecipientOutcome::Rejected
        );
    }

    #[test]
    fn test_ignore_recipient_status_suppresses_error() {
        let mailer =
            MandrillMailer::new(Config::new("test-key").ignore_recipient_status()).unwrap();
        let status = mailer
            .parse_send_status(vec![entry("a@example.com", "rejected")])
            .unwrap();
        assert!(status.all_refused());
    }
}
