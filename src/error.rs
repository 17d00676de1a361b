use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::collections::HashMap;

/// The main error type for mailway operations
#[derive(Debug, thiserror::Error)]
pub enum MailwayError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Inbound webhook failed signature verification. Maps to a 400
    /// response so the provider sees the delivery as rejected.
    #[error("Webhook validation failed: {0}")]
    WebhookValidation(String),

    /// Outbound data could not be encoded for the provider API. Raised
    /// before any network call; retrying without fixing the data will
    /// fail the same way.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Unsuccessful response from the provider's API.
    #[error("Provider API error (status {status}): {detail}")]
    Api { status: u16, detail: String },

    /// Every recipient of a send was rejected or invalid.
    #[error("All message recipients were rejected or invalid")]
    RecipientsRefused,

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Request timeout")]
    RequestTimeout,

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

/// Error context for additional error information
///
/// Used by the Mandrill client to attach the send description and the
/// provider's response body to API errors, so server logs carry enough
/// detail to diagnose a failed send.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// Unique error ID for tracking
    pub error_id: Option<String>,
    /// Additional error details (e.g. provider response snippet)
    pub details: Option<String>,
    /// Contextual key-value pairs (recipients, endpoint, ...)
    pub context: HashMap<String, String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_error_id(mut self, id: impl Into<String>) -> Self {
        self.error_id = Some(id.into());
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.details = Some(detail.into());
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}

/// Error with attached context
///
/// Allows attaching context to a MailwayError while still being usable
/// as a MailwayError via the `Into` trait.
#[derive(Debug)]
pub struct ErrorWithContext {
    error: MailwayError,
    context: ErrorContext,
}

impl ErrorWithContext {
    pub fn new(error: MailwayError, context: ErrorContext) -> Self {
        Self { error, context }
    }

    /// Get a reference to the underlying error
    pub fn error(&self) -> &MailwayError {
        &self.error
    }

    /// Get a reference to the context
    pub fn context(&self) -> &ErrorContext {
        &self.context
    }
}

impl std::fmt::Display for ErrorWithContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.error)?;
        if let Some(ref details) = self.context.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for ErrorWithContext {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

impl From<ErrorWithContext> for MailwayError {
    fn from(err: ErrorWithContext) -> Self {
        err.error
    }
}

/// Standard error response format for the webhook endpoint.
#[derive(Serialize)]
pub struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    context: Option<HashMap<String, String>>,
}

impl MailwayError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn webhook_validation(msg: impl Into<String>) -> Self {
        Self::WebhookValidation(msg.into())
    }

    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn service_unavailable(msg: impl Into<String>) -> Self {
        Self::ServiceUnavailable(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Add context to this error, returning an ErrorWithContext
    pub fn with_context(self, context: ErrorContext) -> ErrorWithContext {
        ErrorWithContext::new(self, context)
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::WebhookValidation(_) => StatusCode::BAD_REQUEST,
            Self::Serialization(_)
            | Self::Api { .. }
            | Self::RecipientsRefused
            | Self::Configuration(_)
            | Self::Internal(_)
            | Self::Anyhow(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::RequestTimeout => StatusCode::REQUEST_TIMEOUT,
        }
    }

    /// Returns a safe error message suitable for client responses in production.
    ///
    /// Client errors (4xx) return the actual message; server errors (5xx)
    /// return a generic message to prevent information disclosure. Full
    /// detail is always logged server-side.
    fn safe_message(&self) -> String {
        match self {
            Self::BadRequest(msg) => format!("Bad request: {}", msg),
            Self::WebhookValidation(msg) => format!("Webhook validation failed: {}", msg),
            Self::RequestTimeout => "Request timeout".to_string(),

            Self::Serialization(_)
            | Self::Api { .. }
            | Self::RecipientsRefused
            | Self::Configuration(_)
            | Self::Internal(_)
            | Self::Anyhow(_) => "Internal server error".to_string(),
            Self::ServiceUnavailable(_) => "Service unavailable".to_string(),
        }
    }
}

impl IntoResponse for MailwayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_id = uuid::Uuid::new_v4().to_string();

        // Full error details go to server logs, not to the response body
        tracing::error!(
            status = status.as_u16(),
            error_id = %error_id,
            error = %self,
            "Request failed"
        );

        let body = Json(ErrorResponse {
            error: self.safe_message(),
            error_id: Some(error_id),
            details: None,
            context: None,
        });

        (status, body).into_response()
    }
}

impl IntoResponse for ErrorWithContext {
    fn into_response(self) -> Response {
        tracing::error!(
            error = %self,
            context = ?self.context.context,
            "Request failed"
        );
        self.error.into_response()
    }
}

/// Result type alias for mailway operations
pub type Result<T> = std::result::Result<T, MailwayError>;

// Common error type conversions

impl From<serde_json::Error> for MailwayError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_data() || err.is_syntax() || err.is_eof() {
            MailwayError::BadRequest(format!("JSON error: {}", err))
        } else {
            MailwayError::Serialization(format!("JSON serialization error: {}", err))
        }
    }
}

impl From<reqwest::Error> for MailwayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            MailwayError::RequestTimeout
        } else if err.is_connect() {
            MailwayError::ServiceUnavailable(format!("Connection error: {}", err))
        } else if err.is_status() {
            let status = err.status().map(|s| s.as_u16()).unwrap_or(0);
            MailwayError::Api {
                status,
                detail: err.to_string(),
            }
        } else {
            MailwayError::Internal(format!("Request error: {}", err))
        }
    }
}
