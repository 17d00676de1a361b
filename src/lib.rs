//! Mailway - transactional email delivery layer
//!
//! Mailway adapts a normalized "send email with merge data / templates"
//! interface to the Mandrill HTTP API and webhook format, built on Tokio
//! and Axum.
//!
//! # Features
//!
//! - **Messages**: provider-independent [`OutboundMessage`] with
//!   recipients, stored-template references, and per-recipient plus
//!   global merge data
//! - **Sending**: the [`email::Mailer`] trait with a Mandrill HTTP
//!   backend and a console backend for development
//! - **Tracking webhooks**: signature verification, normalized event
//!   fan-out, and a mountable axum endpoint
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use mailway::{Config, OutboundMessage};
//! use mailway::email::{Mailer, MandrillMailer};
//!
//! #[tokio::main]
//! async fn main() -> mailway::Result<()> {
//!     mailway::init_tracing();
//!
//!     let config = Config::from_env()?;
//!     let mailer = MandrillMailer::new(config)?;
//!
//!     let message = OutboundMessage::new()
//!         .from("noreply@example.com")
//!         .to_named("wile@example.com", "Wile E. Coyote")
//!         .template_id("order-confirmation")
//!         .merge_global("OFFER", "5% off")
//!         .merge("wile@example.com", "OFFER", "15% off");
//!
//!     mailer.send(&message).await?;
//!     Ok(())
//! }
//! ```

mod config;
pub mod email;
mod error;
mod message;
pub mod webhooks;

// Re-exports for public API
pub use config::{Config, SendDefaults, DEFAULT_API_URL};
pub use email::{
    ConsoleMailer, Mailer, MandrillMailer, RecipientOutcome, RecipientStatus, SendStatus,
};
pub use error::{ErrorContext, ErrorWithContext, MailwayError, Result};
pub use message::{Address, Attachment, OutboundMessage};
pub use webhooks::{
    EventHandler, EventType, InboundWebhookPayload, SignatureVerifier, TrackingEvent,
    TrackingWebhook,
};

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing/logging with sensible defaults
///
/// This should be called early in your application, before constructing
/// mailers or webhook routers.
///
/// # Environment Variables
///
/// - `RUST_LOG`: Set log level (e.g., "info", "debug", "mailway=debug")
/// - `MAILWAY_LOG_JSON`: Set to "true" for JSON formatted logs
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let json_logs = std::env::var("MAILWAY_LOG_JSON")
        .map(|v| v.parse::<bool>().unwrap_or(false))
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}
