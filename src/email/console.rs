//! Console mailer for development
//!
//! Prints message summaries to stdout instead of sending them, useful for
//! local development.
//!
//! # Security Warning
//!
//! This mailer outputs message content to stdout which may be captured by
//! logging systems in containerized environments. **Do not use in
//! production** as message content may contain sensitive information
//! (tokens, PII, merge data).

use crate::email::{Mailer, RecipientOutcome, RecipientStatus, SendStatus};
use crate::error::Result;
use crate::message::OutboundMessage;
use async_trait::async_trait;

/// A mailer that prints messages to stdout instead of sending them
///
/// By default, body content and merge values are redacted. Use
/// `with_full_output(true)` to see full content in development.
#[derive(Debug, Clone)]
pub struct ConsoleMailer {
    /// Optional prefix for log output
    prefix: String,
    /// Whether to show full message content (default: false for security)
    show_full_content: bool,
}

impl ConsoleMailer {
    pub fn new() -> Self {
        Self {
            prefix: "[EMAIL]".to_string(),
            show_full_content: false,
        }
    }

    /// Create a console mailer with a custom prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            show_full_content: false,
        }
    }

    /// Enable or disable full message content output
    ///
    /// # Security Warning
    ///
    /// When enabled, full body content and merge values are printed to
    /// stdout. Only enable this in secure development environments.
    pub fn with_full_output(mut self, enabled: bool) -> Self {
        if enabled {
            tracing::warn!(
                "ConsoleMailer: full output enabled - message content will be visible in logs. \
                 Do not use in production!"
            );
        }
        self.show_full_content = enabled;
        self
    }
}

impl Default for ConsoleMailer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Mailer for ConsoleMailer {
    async fn send(&self, message: &OutboundMessage) -> Result<SendStatus> {
        message.validate()?;

        println!("{} ════════════════════════════════════════", self.prefix);
        match &message.from {
            Some(from) => println!("{} From:    {}", self.prefix, from),
            None => println!("{} From:    [template default]", self.prefix),
        }
        println!("{} To:      {} recipient(s)", self.prefix, message.to.len());
        if !message.cc.is_empty() {
            println!("{} CC:      {} recipient(s)", self.prefix, message.cc.len());
        }
        if !message.bcc.is_empty() {
            println!("{} BCC:     {} recipient(s)", self.prefix, message.bcc.len());
        }
        match &message.subject {
            Some(subject) => println!("{} Subject: {}", self.prefix, subject),
            None => println!("{} Subject: [template default]", self.prefix),
        }
        if let Some(template) = &message.template_id {
            println!("{} Template: {}", self.prefix, template);
        }
        if message.has_merge_data() {
            println!(
                "{} Merge:   {} recipient(s) with per-recipient data",
                self.prefix,
                message.merge_data.len()
            );
        }
        println!("{} ────────────────────────────────────────", self.prefix);

        if self.show_full_content {
            if let Some(ref text) = message.text {
                println!("{} [TEXT]", self.prefix);
                for line in text.lines() {
                    println!("{} {}", self.prefix, line);
                }
            }
            if let Some(ref html) = message.html {
                println!("{} [HTML]", self.prefix);
                for line in html.lines() {
                    println!("{} {}", self.prefix, line);
                }
            }
        } else {
            if let Some(ref text) = message.text {
                println!("{} [TEXT] {} bytes [REDACTED]", self.prefix, text.len());
            }
            if let Some(ref html) = message.html {
                println!("{} [HTML] {} bytes [REDACTED]", self.prefix, html.len());
            }
        }

        println!("{} ════════════════════════════════════════", self.prefix);

        Ok(SendStatus {
            recipients: message
                .to
                .iter()
                .map(|addr| RecipientStatus {
                    email: addr.email.clone(),
                    outcome: RecipientOutcome::Sent,
                    message_id: None,
                    reject_reason: None,
                })
                .collect(),
        })
    }

    fn is_healthy(&self) -> bool {
        true // Console is always available
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_console_mailer_reports_sent_per_recipient() {
        let mailer = ConsoleMailer::new();
        let message = OutboundMessage::new()
            .from("from@test.com")
            .to("a@test.com")
            .to("b@test.com")
            .subject("Test Subject")
            .text("Test body");

        let status = mailer.send(&message).await.unwrap();
        assert_eq!(status.recipients.len(), 2);
        assert!(status
            .recipients
            .iter()
            .all(|r| r.outcome == RecipientOutcome::Sent));
    }

    #[tokio::test]
    async fn test_console_mailer_validates_message() {
        let mailer = ConsoleMailer::new();
        // No body and no template - should fail validation
        let message = OutboundMessage::new().from("from@test.com").to("to@test.com");
        assert!(mailer.send(&message).await.is_err());
    }

    #[test]
    fn test_console_mailer_is_healthy() {
        assert!(ConsoleMailer::new().is_healthy());
    }
}
