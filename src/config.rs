//! Provider configuration
//!
//! All provider settings (API key, webhook key, URLs, send defaults) live in
//! an immutable [`Config`] built once at startup and passed into the mailer
//! and webhook constructors. Nothing in this crate reads ambient global
//! state after construction.

use crate::error::{MailwayError, Result};
use secrecy::SecretString;
use url::Url;

/// Default base URL for the provider's JSON API.
pub const DEFAULT_API_URL: &str = "https://mandrillapp.com/api/1.0/";

/// Immutable provider configuration
///
/// # Example
///
/// ```rust,ignore
/// use mailway::Config;
///
/// let config = Config::new("api-key")
///     .webhook_key("webhook-key")
///     .webhook_url("https://app.example.com/webhooks/tracking")?;
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Provider API key, included in the body of every send request
    pub api_key: SecretString,
    /// Key used to verify inbound webhook signatures
    pub webhook_key: Option<SecretString>,
    /// The callback URL the provider signs requests against.
    ///
    /// Behind a proxy the URL the server observes differs from the URL the
    /// provider signed, so verification always uses this configured value
    /// and never the request's observed host.
    pub webhook_url: Option<Url>,
    /// Base URL for the provider API (override for testing/regional endpoints)
    pub api_url: Url,
    /// Treat an all-rejected send response as success instead of an error
    pub ignore_recipient_status: bool,
    /// Default provider options applied where a message leaves them unset
    pub send_defaults: SendDefaults,
}

impl Config {
    /// Create a configuration with the given API key and default API URL
    pub fn new(api_key: impl Into<SecretString>) -> Self {
        Self {
            api_key: api_key.into(),
            webhook_key: None,
            webhook_url: None,
            api_url: Url::parse(DEFAULT_API_URL).expect("default API URL is valid"),
            ignore_recipient_status: false,
            send_defaults: SendDefaults::default(),
        }
    }

    /// Set the webhook signing key
    pub fn webhook_key(mut self, key: impl Into<SecretString>) -> Self {
        self.webhook_key = Some(key.into());
        self
    }

    /// Set the callback URL used as the base of the webhook signature
    pub fn webhook_url(mut self, url: impl AsRef<str>) -> Result<Self> {
        let parsed = Url::parse(url.as_ref())
            .map_err(|e| MailwayError::configuration(format!("Invalid webhook URL: {}", e)))?;
        self.webhook_url = Some(parsed);
        Ok(self)
    }

    /// Override the provider API base URL
    pub fn api_url(mut self, url: impl AsRef<str>) -> Result<Self> {
        let parsed = Url::parse(url.as_ref())
            .map_err(|e| MailwayError::configuration(format!("Invalid API URL: {}", e)))?;
        self.api_url = parsed;
        Ok(self)
    }

    /// Don't error when every recipient of a send is rejected or invalid
    pub fn ignore_recipient_status(mut self) -> Self {
        self.ignore_recipient_status = true;
        self
    }

    /// Set default provider options for all sends
    pub fn send_defaults(mut self, defaults: SendDefaults) -> Self {
        self.send_defaults = defaults;
        self
    }

    /// Create config from environment variables
    ///
    /// Reads from:
    /// - `MAILWAY_API_KEY` (required)
    /// - `MAILWAY_WEBHOOK_KEY` (optional)
    /// - `MAILWAY_WEBHOOK_URL` (optional)
    /// - `MAILWAY_API_URL` (optional, default: provider production URL)
    /// - `MAILWAY_IGNORE_RECIPIENT_STATUS` (optional, default: false)
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("MAILWAY_API_KEY").map_err(|_| {
            MailwayError::configuration("MAILWAY_API_KEY environment variable not set")
        })?;

        let mut config = Config::new(api_key);

        if let Ok(key) = std::env::var("MAILWAY_WEBHOOK_KEY") {
            config = config.webhook_key(key);
        }
        if let Ok(url) = std::env::var("MAILWAY_WEBHOOK_URL") {
            config = config.webhook_url(url)?;
        }
        if let Ok(url) = std::env::var("MAILWAY_API_URL") {
            config = config.api_url(url)?;
        }
        if let Ok(v) = std::env::var("MAILWAY_IGNORE_RECIPIENT_STATUS") {
            if v == "true" || v == "1" {
                config = config.ignore_recipient_status();
            }
        }

        Ok(config)
    }
}

/// Default provider options applied to every send
///
/// A message-level value always overrides the corresponding default.
/// Options left unset both here and on the message are omitted from the
/// API request entirely, so provider account settings apply.
#[derive(Debug, Clone, Default)]
pub struct SendDefaults {
    pub from_name: Option<String>,
    pub important: Option<bool>,
    pub track_opens: Option<bool>,
    pub track_clicks: Option<bool>,
    pub preserve_recipients: Option<bool>,
    pub merge_language: Option<String>,
    pub subaccount: Option<String>,
    pub ip_pool: Option<String>,
    pub async_send: Option<bool>,
}

impl SendDefaults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_name(mut self, name: impl Into<String>) -> Self {
        self.from_name = Some(name.into());
        self
    }

    pub fn important(mut self, important: bool) -> Self {
        self.important = Some(important);
        self
    }

    pub fn track_opens(mut self, track: bool) -> Self {
        self.track_opens = Some(track);
        self
    }

    pub fn track_clicks(mut self, track: bool) -> Self {
        self.track_clicks = Some(track);
        self
    }

    pub fn preserve_recipients(mut self, preserve: bool) -> Self {
        self.preserve_recipients = Some(preserve);
        self
    }

    pub fn merge_language(mut self, language: impl Into<String>) -> Self {
        self.merge_language = Some(language.into());
        self
    }

    pub fn subaccount(mut self, subaccount: impl Into<String>) -> Self {
        self.subaccount = Some(subaccount.into());
        self
    }

    pub fn ip_pool(mut self, pool: impl Into<String>) -> Self {
        self.ip_pool = Some(pool.into());
        self
    }

    pub fn async_send(mut self, async_send: bool) -> Self {
        self.async_send = Some(async_send);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::new("key");
        assert_eq!(config.api_url.as_str(), DEFAULT_API_URL);
        assert!(config.webhook_key.is_none());
        assert!(config.webhook_url.is_none());
        assert!(!config.ignore_recipient_status);
    }

    #[test]
    fn test_config_builder() {
        let config = Config::new("key")
            .webhook_key("whk")
            .webhook_url("https://app.example.com/hooks/tracking")
            .unwrap()
            .api_url("https://mandrill.example.com/api/1.0/")
            .unwrap()
            .ignore_recipient_status();

        assert!(config.webhook_key.is_some());
        assert_eq!(
            config.webhook_url.as_ref().unwrap().as_str(),
            "https://app.example.com/hooks/tracking"
        );
        assert_eq!(
            config.api_url.as_str(),
            "https://mandrill.example.com/api/1.0/"
        );
        assert!(config.ignore_recipient_status);
    }

    #[test]
    fn test_invalid_webhook_url_rejected() {
        let result = Config::new("key").webhook_url("not a url");
        assert!(result.is_err());
    }

    #[test]
    fn test_send_defaults_builder() {
        let defaults = SendDefaults::new()
            .from_name("Acme Notifications")
            .preserve_recipients(true)
            .merge_language("handlebars")
            .subaccount("marketing")
            .ip_pool("Bulk Pool")
            .async_send(true);

        assert_eq!(defaults.from_name.as_deref(), Some("Acme Notifications"));
        assert_eq!(defaults.preserve_recipients, Some(true));
        assert_eq!(defaults.merge_language.as_deref(), Some("handlebars"));
        assert_eq!(defaults.subaccount.as_deref(), Some("marketing"));
        assert_eq!(defaults.ip_pool.as_deref(), Some("Bulk Pool"));
        assert_eq!(defaults.async_send, Some(true));
    }

    #[test]
    fn test_config_debug_hides_secrets() {
        let config = Config::new("super-secret-api-key").webhook_key("super-secret-webhook-key");
        let debug = format!("{:?}", config);
        assert!(!debug.contains("super-secret-api-key"));
        assert!(!debug.contains("super-secret-webhook-key"));
    }
}
