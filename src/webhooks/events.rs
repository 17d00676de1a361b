//! Tracking event model
//!
//! The provider batches delivery-event notifications into a JSON array in
//! the `mandrill_events` POST field. Each raw record is normalized into a
//! [`TrackingEvent`]; unrecognized provider event strings classify as
//! [`EventType::Unknown`] rather than failing the batch, so one odd record
//! never aborts processing of the rest.

use crate::error::{MailwayError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// POST field carrying the JSON-encoded event batch
pub const EVENTS_FIELD: &str = "mandrill_events";

/// Normalized delivery-event categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Sent,
    Rejected,
    Deferred,
    Bounced,
    Opened,
    Clicked,
    Complained,
    Unsubscribed,
    Unknown,
}

impl EventType {
    /// Classify a provider event string.
    ///
    /// Anything unrecognized maps to `Unknown`, never an error.
    pub fn from_provider(event: &str) -> Self {
        match event {
            "send" => Self::Sent,
            "reject" => Self::Rejected,
            "deferral" => Self::Deferred,
            "hard_bounce" | "soft_bounce" => Self::Bounced,
            "open" => Self::Opened,
            "click" => Self::Clicked,
            "spam" => Self::Complained,
            "unsub" => Self::Unsubscribed,
            _ => Self::Unknown,
        }
    }
}

/// One normalized tracking event
///
/// Carries the identifiers most handlers need (recipient, provider
/// message id, timestamp) plus the full raw record for anything
/// provider-specific.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingEvent {
    pub event_type: EventType,
    /// Recipient the event refers to, when the record carries one
    pub recipient: Option<String>,
    /// Provider-assigned message id, correlates with send status
    pub message_id: Option<String>,
    /// Event time as unix seconds
    pub timestamp: Option<i64>,
    /// The raw provider record, untouched
    pub raw: Value,
}

impl TrackingEvent {
    /// Normalize one raw provider record. Never fails: missing or odd
    /// fields leave the corresponding attribute empty.
    pub fn from_raw(raw: Value) -> Self {
        let event_type = raw
            .get("event")
            .and_then(Value::as_str)
            .map(EventType::from_provider)
            .unwrap_or(EventType::Unknown);

        let msg = raw.get("msg");
        let recipient = msg
            .and_then(|m| m.get("email"))
            .and_then(Value::as_str)
            .map(String::from);
        let message_id = msg
            .and_then(|m| m.get("_id"))
            .or_else(|| raw.get("_id"))
            .and_then(Value::as_str)
            .map(String::from);
        let timestamp = raw.get("ts").and_then(Value::as_i64);

        Self {
            event_type,
            recipient,
            message_id,
            timestamp,
            raw,
        }
    }
}

/// A verified batch of raw provider event records, in original order
#[derive(Debug, Clone, Default)]
pub struct InboundWebhookPayload {
    pub events: Vec<Value>,
}

impl InboundWebhookPayload {
    /// Parse the JSON event batch out of the `mandrill_events` field value.
    ///
    /// The batch must be a JSON array; individual records can be any shape
    /// (classification degrades to `Unknown`, it never rejects a record).
    pub fn parse(events_json: &str) -> Result<Self> {
        let parsed: Value = serde_json::from_str(events_json)
            .map_err(|e| MailwayError::bad_request(format!("Invalid events JSON: {}", e)))?;
        match parsed {
            Value::Array(events) => Ok(Self { events }),
            _ => Err(MailwayError::bad_request(
                "Events payload must be a JSON array",
            )),
        }
    }
}
