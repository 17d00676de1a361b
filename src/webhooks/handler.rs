//! Event handler trait and fan-out
//!
//! A verified payload fans out to the registered handler one event at a
//! time, in the payload's original order. Events are never batched, and a
//! handler failure on one event is reported through `on_error` without
//! aborting delivery of the rest; only a failed signature check rejects a
//! payload wholesale.

use crate::error::{MailwayError, Result};
use crate::webhooks::events::{InboundWebhookPayload, TrackingEvent};
use async_trait::async_trait;
use std::sync::Arc;

/// Trait for handling normalized tracking events
///
/// # Example
///
/// ```rust,ignore
/// use mailway::webhooks::{EventHandler, TrackingEvent, EventType};
///
/// struct BounceRecorder { /* db handle */ }
///
/// #[async_trait::async_trait]
/// impl EventHandler for BounceRecorder {
///     async fn handle(&self, event: &TrackingEvent) -> mailway::Result<()> {
///         if event.event_type == EventType::Bounced {
///             // mark the recipient undeliverable
///         }
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Handle one tracking event
    async fn handle(&self, event: &TrackingEvent) -> Result<()>;

    /// Optional: called when `handle` fails for an event
    async fn on_error(&self, event: &TrackingEvent, error: &MailwayError) {
        tracing::error!(
            event_type = ?event.event_type,
            recipient = event.recipient.as_deref().unwrap_or(""),
            message_id = event.message_id.as_deref().unwrap_or(""),
            error = %error,
            "Tracking event processing failed"
        );
    }
}

/// Fans a verified payload out to a handler, one event per record
pub struct EventDispatcher {
    handler: Arc<dyn EventHandler>,
}

impl EventDispatcher {
    pub fn new(handler: Arc<dyn EventHandler>) -> Self {
        Self { handler }
    }

    /// Dispatch every record of a verified payload, in order.
    ///
    /// Returns the number of events delivered to the handler. Handler
    /// errors go through `on_error` and do not stop the batch.
    pub async fn dispatch(&self, payload: &InboundWebhookPayload) -> Result<usize> {
        let mut delivered = 0;
        for raw in &payload.events {
            let event = TrackingEvent::from_raw(raw.clone());
            if let Err(error) = self.handler.handle(&event).await {
                self.handler.on_error(&event, &error).await;
            }
            delivered += 1;
        }

        tracing::debug!(events = delivered, "Webhook payload dispatched");
        Ok(delivered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::webhooks::events::EventType;
    use serde_json::json;
    use std::sync::Mutex;

    /// Records what it saw, optionally failing on one event type
    struct RecordingHandler {
        seen: Mutex<Vec<TrackingEvent>>,
        fail_on: Option<EventType>,
        errors: Mutex<usize>,
    }

    impl RecordingHandler {
        fn new() -> Self {
            Self {
                seen: Mutex::new(Vec::new()),
                fail_on: None,
                errors: Mutex::new(0),
            }
        }

        fn failing_on(event_type: EventType) -> Self {
            Self {
                fail_on: Some(event_type),
                ..Self::new()
            }
        }
    }

    #[async_trait]
    impl EventHandler for RecordingHandler {
        async fn handle(&self, event: &TrackingEvent) -> Result<()> {
            self.seen.lock().unwrap().push(event.clone());
            if self.fail_on == Some(event.event_type) {
                return Err(MailwayError::internal("handler failure"));
            }
            Ok(())
        }

        async fn on_error(&self, _event: &TrackingEvent, _error: &MailwayError) {
            *self.errors.lock().unwrap() += 1;
        }
    }

    fn payload(events: serde_json::Value) -> InboundWebhookPayload {
        InboundWebhookPayload {
            events: events.as_array().unwrap().clone(),
        }
    }

    #[tokio::test]
    async fn test_one_event_per_record_in_order() {
        let handler = Arc::new(RecordingHandler::new());
        let dispatcher = EventDispatcher::new(handler.clone());

        let count = dispatcher
            .dispatch(&payload(json!([
                {"event": "send", "msg": {"email": "a@example.com"}},
                {"event": "open", "msg": {"email": "a@example.com"}},
                {"event": "click", "msg": {"email": "b@example.com"}},
            ])))
            .await
            .unwrap();

        assert_eq!(count, 3);
        let seen = handler.seen.lock().unwrap();
        let types: Vec<EventType> = seen.iter().map(|e| e.event_type).collect();
        assert_eq!(
            types,
            vec![EventType::Sent, EventType::Opened, EventType::Clicked]
        );
    }

    #[tokio::test]
    async fn test_unknown_record_still_dispatched() {
        let handler = Arc::new(RecordingHandler::new());
        let dispatcher = EventDispatcher::new(handler.clone());

        let count = dispatcher
            .dispatch(&payload(json!([
                {"event": "whitelist"},
                {"event": "open"},
            ])))
            .await
            .unwrap();

        assert_eq!(count, 2);
        let seen = handler.seen.lock().unwrap();
        assert_eq!(seen[0].event_type, EventType::Unknown);
        assert_eq!(seen[1].event_type, EventType::Opened);
    }

    #[tokio::test]
    async fn test_handler_error_does_not_stop_batch() {
        let handler = Arc::new(RecordingHandler::failing_on(EventType::Opened));
        let dispatcher = EventDispatcher::new(handler.clone());

        let count = dispatcher
            .dispatch(&payload(json!([
                {"event": "open"},
                {"event": "click"},
            ])))
            .await
            .unwrap();

        assert_eq!(count, 2);
        assert_eq!(*handler.errors.lock().unwrap(), 1);
        assert_eq!(handler.seen.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_payload_dispatches_nothing() {
        let handler = Arc::new(RecordingHandler::new());
        let dispatcher = EventDispatcher::new(handler.clone());

        let count = dispatcher
            .dispatch(&InboundWebhookPayload::default())
            .await
            .unwrap();

        assert_eq!(count, 0);
        assert!(handler.seen.lock().unwrap().is_empty());
    }
}
