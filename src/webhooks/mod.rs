//! Webhook handling for provider tracking events.
//!
//! Provides signature verification, event normalization, handler fan-out,
//! and a mountable axum endpoint for the provider's tracking POSTs.

pub mod events;
pub mod handler;
pub mod routes;
pub mod verification;

pub use events::{EventType, InboundWebhookPayload, TrackingEvent, EVENTS_FIELD};
pub use handler::{EventDispatcher, EventHandler};
pub use routes::TrackingWebhook;
pub use verification::{SignatureVerifier, SIGNATURE_HEADER};
