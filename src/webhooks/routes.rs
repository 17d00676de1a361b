//! Tracking webhook endpoint
//!
//! A drop-in axum router for the provider's tracking POSTs: decode the
//! form body, verify the signature, fan events out to the registered
//! handler, respond 200. Signature failures reject the whole request with
//! a 4xx before any handler runs.

use crate::error::{MailwayError, Result};
use crate::webhooks::events::{InboundWebhookPayload, EVENTS_FIELD};
use crate::webhooks::handler::{EventDispatcher, EventHandler};
use crate::webhooks::verification::{SignatureVerifier, SIGNATURE_HEADER};
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Router,
};
use std::sync::Arc;

/// Tracking webhook endpoint state: verifier plus event dispatcher
///
/// # Example
///
/// ```rust,ignore
/// use mailway::webhooks::{SignatureVerifier, TrackingWebhook};
///
/// let webhook = TrackingWebhook::new(
///     SignatureVerifier::from_config(&config)?,
///     Arc::new(MyHandler),
/// );
/// let app = axum::Router::new().nest("/webhooks/tracking", webhook.router());
/// ```
#[derive(Clone)]
pub struct TrackingWebhook {
    verifier: Arc<SignatureVerifier>,
    dispatcher: Arc<EventDispatcher>,
}

impl TrackingWebhook {
    pub fn new(verifier: SignatureVerifier, handler: Arc<dyn EventHandler>) -> Self {
        Self {
            verifier: Arc::new(verifier),
            dispatcher: Arc::new(EventDispatcher::new(handler)),
        }
    }

    /// Build the router for this endpoint, ready to mount at any path
    pub fn router(self) -> Router {
        Router::new()
            .route("/", post(receive_tracking).get(endpoint_check))
            .with_state(self)
    }
}

/// The provider probes newly configured webhook URLs before signing
/// anything; answering GET/HEAD with 200 passes that check.
async fn endpoint_check() -> StatusCode {
    StatusCode::OK
}

async fn receive_tracking(
    State(webhook): State<TrackingWebhook>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| {
            MailwayError::webhook_validation(format!("Missing {} header", SIGNATURE_HEADER))
        })?;

    let params: Vec<(String, String)> = url::form_urlencoded::parse(&body)
        .into_owned()
        .collect();

    webhook.verifier.verify(&params, signature)?;

    // The provider's endpoint check POSTs an empty batch; a missing events
    // field after a verified signature is treated the same way
    let payload = match params.iter().find(|(key, _)| key == EVENTS_FIELD) {
        Some((_, events_json)) => InboundWebhookPayload::parse(events_json)?,
        None => InboundWebhookPayload::default(),
    };

    let delivered = webhook.dispatcher.dispatch(&payload).await?;
    tracing::info!(events = delivered, "Tracking webhook processed");

    Ok(StatusCode::OK)
}
