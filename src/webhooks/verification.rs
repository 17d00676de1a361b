//! Webhook signature verification
//!
//! The provider signs each tracking POST with
//! `base64(hmac_sha1(webhook_key, url + k1 + v1 + k2 + v2 + ...))` where
//! the POST parameters are ordered by key and `url` is the callback URL
//! as configured with the provider. Verification is a pure computation
//! over the already-received parameters; no I/O.

use crate::config::Config;
use crate::error::{MailwayError, Result};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha1::Sha1;
use subtle::ConstantTimeEq;
use url::Url;

type HmacSha1 = Hmac<Sha1>;

/// Header carrying the provider's signature on tracking requests
pub const SIGNATURE_HEADER: &str = "X-Mandrill-Signature";

/// Verifies provider signatures on inbound tracking requests
///
/// Holds the webhook key and the callback URL registered with the
/// provider. The URL must be the configured one, never the URL the server
/// observed: behind a proxy the observed host differs from the host the
/// provider signed.
///
/// # Example
///
/// ```rust,ignore
/// use mailway::webhooks::SignatureVerifier;
///
/// let verifier = SignatureVerifier::new(
///     "webhook-key",
///     "https://app.example.com/webhooks/tracking".parse()?,
/// );
/// verifier.verify(&params, signature_header)?;
/// ```
pub struct SignatureVerifier {
    key: SecretString,
    url: Url,
}

impl SignatureVerifier {
    /// Create a verifier with an explicit key and callback URL
    pub fn new(key: impl Into<SecretString>, url: Url) -> Self {
        Self {
            key: key.into(),
            url,
        }
    }

    /// Create a verifier from the process configuration.
    ///
    /// Fails if the config has no webhook key or no webhook URL; running a
    /// tracking endpoint without either would accept forged events.
    pub fn from_config(config: &Config) -> Result<Self> {
        let key = config.webhook_key.clone().ok_or_else(|| {
            MailwayError::configuration("Webhook verification requires a webhook key")
        })?;
        let url = config.webhook_url.clone().ok_or_else(|| {
            MailwayError::configuration("Webhook verification requires the configured webhook URL")
        })?;
        Ok(Self { key, url })
    }

    /// The canonical byte string the signature is computed over
    fn signed_base(&self, params: &[(String, String)]) -> Vec<u8> {
        let mut sorted: Vec<&(String, String)> = params.iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(&b.0));

        let mut base = self.url.as_str().as_bytes().to_vec();
        for (key, value) in sorted {
            base.extend_from_slice(key.as_bytes());
            base.extend_from_slice(value.as_bytes());
        }
        base
    }

    /// Compute the expected base64 signature for a parameter set
    pub fn expected_signature(&self, params: &[(String, String)]) -> String {
        let mut mac = HmacSha1::new_from_slice(self.key.expose_secret().as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(&self.signed_base(params));
        base64::Engine::encode(
            &base64::engine::general_purpose::STANDARD,
            mac.finalize().into_bytes(),
        )
    }

    /// Verify a received signature against the decoded POST parameters.
    ///
    /// Returns `WebhookValidation` on mismatch; the caller must reject the
    /// whole request without processing any events.
    pub fn verify(&self, params: &[(String, String)], signature: &str) -> Result<()> {
        let expected = self.expected_signature(params);

        if !constant_time_compare(expected.as_bytes(), signature.as_bytes()) {
            tracing::debug!("Webhook signature verification failed");
            return Err(MailwayError::webhook_validation(
                "Signature does not match",
            ));
        }

        Ok(())
    }
}

impl std::fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureVerifier")
            .field("url", &self.url.as_str())
            .finish()
    }
}

/// Constant-time comparison to prevent timing attacks
///
/// Uses the `subtle` crate which provides compiler-optimization-resistant
/// constant-time operations, preventing attackers from using timing
/// information to guess valid signatures byte-by-byte.
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}
