//! Tests for the tracking webhook endpoint

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use mailway::webhooks::{
    EventHandler, SignatureVerifier, TrackingEvent, TrackingWebhook, SIGNATURE_HEADER,
};
use mailway::{EventType, MailwayError};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use url::Url;

const CALLBACK_URL: &str = "https://app.example.com/webhooks/tracking";
const WEBHOOK_KEY: &str = "test-webhook-key";

/// Handler that records every event it sees
#[derive(Default)]
struct CollectingHandler {
    seen: Mutex<Vec<TrackingEvent>>,
}

#[async_trait]
impl EventHandler for CollectingHandler {
    async fn handle(&self, event: &TrackingEvent) -> mailway::Result<()> {
        self.seen.lock().unwrap().push(event.clone());
        Ok(())
    }
}

fn verifier() -> SignatureVerifier {
    SignatureVerifier::new(WEBHOOK_KEY, Url::parse(CALLBACK_URL).unwrap())
}

fn form_body(events_json: &str) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .append_pair("mandrill_events", events_json)
        .finish()
}

fn valid_signature(events_json: &str) -> String {
    verifier().expected_signature(&[("mandrill_events".to_string(), events_json.to_string())])
}

fn request(body: String, signature: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(sig) = signature {
        builder = builder.header(SIGNATURE_HEADER, sig);
    }
    builder.body(Body::from(body)).unwrap()
}

#[tokio::test]
async fn test_valid_payload_yields_one_event_per_record_in_order() {
    let handler = Arc::new(CollectingHandler::default());
    let app = TrackingWebhook::new(verifier(), handler.clone()).router();

    let events = r#"[
        {"event":"send","ts":1,"msg":{"email":"wile@example.com","_id":"m1"}},
        {"event":"open","ts":2,"msg":{"email":"wile@example.com","_id":"m1"}},
        {"event":"hard_bounce","ts":3,"msg":{"email":"roadrunner@example.com","_id":"m2"}}
    ]"#;
    let response = app
        .oneshot(request(form_body(events), Some(&valid_signature(events))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let seen = handler.seen.lock().unwrap();
    assert_eq!(seen.len(), 3);
    let types: Vec<EventType> = seen.iter().map(|e| e.event_type).collect();
    assert_eq!(
        types,
        vec![EventType::Sent, EventType::Opened, EventType::Bounced]
    );
    assert_eq!(seen[2].recipient.as_deref(), Some("roadrunner@example.com"));
    assert_eq!(seen[2].message_id.as_deref(), Some("m2"));
}

#[tokio::test]
async fn test_invalid_signature_rejects_whole_payload() {
    let handler = Arc::new(CollectingHandler::default());
    let app = TrackingWebhook::new(verifier(), handler.clone()).router();

    let events = r#"[{"event":"open","msg":{"email":"wile@example.com"}}]"#;
    let response = app
        .oneshot(request(form_body(events), Some("Zm9yZ2VkLXNpZ25hdHVyZQ==")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(handler.seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_signature_rejects_whole_payload() {
    let handler = Arc::new(CollectingHandler::default());
    let app = TrackingWebhook::new(verifier(), handler.clone()).router();

    let events = r#"[{"event":"open"}]"#;
    let response = app.oneshot(request(form_body(events), None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(handler.seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_event_type_accepted_not_failed() {
    let handler = Arc::new(CollectingHandler::default());
    let app = TrackingWebhook::new(verifier(), handler.clone()).router();

    let events = r#"[{"event":"blacklist"},{"event":"click","msg":{"email":"wile@example.com"}}]"#;
    let response = app
        .oneshot(request(form_body(events), Some(&valid_signature(events))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let seen = handler.seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].event_type, EventType::Unknown);
    assert_eq!(seen[1].event_type, EventType::Clicked);
}

#[tokio::test]
async fn test_empty_batch_accepted() {
    let handler = Arc::new(CollectingHandler::default());
    let app = TrackingWebhook::new(verifier(), handler.clone()).router();

    let response = app
        .oneshot(request(form_body("[]"), Some(&valid_signature("[]"))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(handler.seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_endpoint_liveness_check() {
    let handler = Arc::new(CollectingHandler::default());
    let app = TrackingWebhook::new(verifier(), handler).router();

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_failing_handler_does_not_fail_request() {
    struct FailingHandler;

    #[async_trait]
    impl EventHandler for FailingHandler {
        async fn handle(&self, _event: &TrackingEvent) -> mailway::Result<()> {
            Err(MailwayError::internal("downstream store unavailable"))
        }
    }

    let app = TrackingWebhook::new(verifier(), Arc::new(FailingHandler)).router();

    let events = r#"[{"event":"open"},{"event":"click"}]"#;
    let response = app
        .oneshot(request(form_body(events), Some(&valid_signature(events))))
        .await
        .unwrap();

    // Handler failures are the handler's problem; the provider still gets
    // its 200 so it doesn't endlessly retry a poison batch
    assert_eq!(response.status(), StatusCode::OK);
}
