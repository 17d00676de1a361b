//! Email sending backends
//!
//! This module provides email sending through the [`Mailer`] trait with
//! two backends:
//! - `ConsoleMailer` - Prints message summaries to stdout (for development)
//! - `MandrillMailer` - Sends via the Mandrill HTTP API
//!
//! # Example
//!
//! ```rust,ignore
//! use mailway::{Config, OutboundMessage};
//! use mailway::email::{Mailer, MandrillMailer};
//!
//! let config = Config::new("api-key");
//! let mailer = MandrillMailer::new(config)?;
//!
//! let message = OutboundMessage::new()
//!     .from("noreply@example.com")
//!     .to("user@example.com")
//!     .subject("Welcome!")
//!     .text("Thanks for signing up!");
//!
//! let status = mailer.send(&message).await?;
//! ```

mod console;
pub mod mandrill;

pub use console::ConsoleMailer;
pub use mandrill::MandrillMailer;

use crate::error::Result;
use crate::message::OutboundMessage;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Per-recipient outcome reported by the provider for a send
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecipientOutcome {
    Sent,
    Queued,
    Scheduled,
    Rejected,
    Invalid,
    #[serde(other)]
    Unknown,
}

impl RecipientOutcome {
    /// Whether the provider refused this recipient
    pub fn is_refused(self) -> bool {
        matches!(self, Self::Rejected | Self::Invalid)
    }
}

/// Status for one recipient of a completed send
#[derive(Debug, Clone)]
pub struct RecipientStatus {
    pub email: String,
    pub outcome: RecipientOutcome,
    /// Provider-assigned message id, correlates with tracking events
    pub message_id: Option<String>,
    pub reject_reason: Option<String>,
}

/// Result of a send call, one entry per recipient
#[derive(Debug, Clone, Default)]
pub struct SendStatus {
    pub recipients: Vec<RecipientStatus>,
}

impl SendStatus {
    /// Look up the status for one recipient email
    pub fn recipient(&self, email: &str) -> Option<&RecipientStatus> {
        self.recipients.iter().find(|r| r.email == email)
    }

    /// Whether every recipient was rejected or invalid
    pub fn all_refused(&self) -> bool {
        !self.recipients.is_empty() && self.recipients.iter().all(|r| r.outcome.is_refused())
    }
}

/// Mailer trait for sending normalized messages
///
/// Implement this trait to create custom backends.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Send a message, returning per-recipient status
    async fn send(&self, message: &OutboundMessage) -> Result<SendStatus>;

    /// Check if the mailer backend is healthy/connected
    fn is_healthy(&self) -> bool;
}
