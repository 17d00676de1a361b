//! Normalized outbound message model
//!
//! [`OutboundMessage`] is the provider-independent description of a send:
//! recipients with display names, optional subject/from (absent means "use
//! the stored template's value"), body variants, a stored-template
//! reference, and per-recipient plus global merge data. The Mandrill
//! backend maps this onto the provider's request schema.

use crate::error::{MailwayError, Result};
use serde_json::Value;
use std::collections::HashMap;

/// An email address with an optional display name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    pub email: String,
    pub name: Option<String>,
}

impl Address {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: None,
        }
    }

    pub fn named(email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: Some(name.into()),
        }
    }
}

impl From<&str> for Address {
    fn from(email: &str) -> Self {
        Address::new(email)
    }
}

impl From<String> for Address {
    fn from(email: String) -> Self {
        Address::new(email)
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} <{}>", name, self.email),
            None => write!(f, "{}", self.email),
        }
    }
}

/// A file attached to an outbound message
#[derive(Debug, Clone)]
pub struct Attachment {
    /// MIME type (e.g. "application/pdf")
    pub mime_type: String,
    /// Filename shown to the recipient (or the cid for inline images)
    pub name: String,
    /// Raw content; base64-encoded at request mapping time
    pub content: Vec<u8>,
}

impl Attachment {
    pub fn new(
        mime_type: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            mime_type: mime_type.into(),
            name: name.into(),
            content: content.into(),
        }
    }
}

/// A normalized outbound email message
///
/// Absent subject or from means "use the stored template's value" when a
/// template is set; the mapped request omits the field so the provider
/// applies the template default.
///
/// # Example
///
/// ```rust,ignore
/// use mailway::OutboundMessage;
///
/// let message = OutboundMessage::new()
///     .from("noreply@example.com")
///     .to_named("wile@example.com", "Wile E. Coyote")
///     .template_id("order-confirmation")
///     .merge_global("OFFER", "5% off")
///     .merge("wile@example.com", "OFFER", "15% off");
/// ```
#[derive(Debug, Clone, Default)]
pub struct OutboundMessage {
    /// Sender; optional so a stored template's from applies when absent
    pub from: Option<Address>,
    /// Ordered primary recipients
    pub to: Vec<Address>,
    pub cc: Vec<Address>,
    pub bcc: Vec<Address>,
    /// Optional so a stored template's subject applies when absent
    pub subject: Option<String>,
    /// Plain text body
    pub text: Option<String>,
    /// HTML body
    pub html: Option<String>,
    pub reply_to: Option<String>,
    /// Stored-template identifier on the provider side
    pub template_id: Option<String>,
    /// Content for the template's editable regions (block name -> HTML)
    pub template_content: HashMap<String, String>,
    /// Per-recipient merge data: recipient email -> field -> value
    pub merge_data: HashMap<String, HashMap<String, Value>>,
    /// Global merge data, used as defaults for every recipient
    pub merge_global_data: HashMap<String, Value>,
    /// Merge syntax ("mailchimp" or "handlebars")
    pub merge_language: Option<String>,
    /// Message-level metadata echoed back in tracking events
    pub metadata: HashMap<String, Value>,
    /// Per-recipient metadata: recipient email -> key -> value
    pub recipient_metadata: HashMap<String, HashMap<String, Value>>,
    pub tags: Vec<String>,
    /// Scheduled delivery time as unix seconds
    pub send_at: Option<i64>,
    pub track_opens: Option<bool>,
    pub track_clicks: Option<bool>,
    pub important: Option<bool>,
    /// Expose the full recipient list to each recipient. Forced to false
    /// by the request mapper whenever per-recipient merge data is present.
    pub preserve_recipients: Option<bool>,
    pub subaccount: Option<String>,
    pub ip_pool: Option<String>,
    /// Ask the provider to queue the send instead of processing inline
    pub async_send: Option<bool>,
    pub attachments: Vec<Attachment>,
    /// Inline images, referenced from the HTML body by cid
    pub images: Vec<Attachment>,
}

impl OutboundMessage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the sender address
    pub fn from(mut self, email: impl Into<String>) -> Self {
        self.from = Some(Address::new(email));
        self
    }

    /// Set the sender address with a display name
    pub fn from_named(mut self, email: impl Into<String>, name: impl Into<String>) -> Self {
        self.from = Some(Address::named(email, name));
        self
    }

    /// Add a recipient
    pub fn to(mut self, email: impl Into<String>) -> Self {
        self.to.push(Address::new(email));
        self
    }

    /// Add a recipient with a display name
    pub fn to_named(mut self, email: impl Into<String>, name: impl Into<String>) -> Self {
        self.to.push(Address::named(email, name));
        self
    }

    /// Add a CC recipient
    pub fn cc(mut self, email: impl Into<String>) -> Self {
        self.cc.push(Address::new(email));
        self
    }

    /// Add a BCC recipient
    pub fn bcc(mut self, email: impl Into<String>) -> Self {
        self.bcc.push(Address::new(email));
        self
    }

    /// Set the subject line
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Set the plain text body
    pub fn text(mut self, body: impl Into<String>) -> Self {
        self.text = Some(body.into());
        self
    }

    /// Set the HTML body
    pub fn html(mut self, body: impl Into<String>) -> Self {
        self.html = Some(body.into());
        self
    }

    /// Set the reply-to address
    pub fn reply_to(mut self, address: impl Into<String>) -> Self {
        self.reply_to = Some(address.into());
        self
    }

    /// Reference a stored template by identifier
    pub fn template_id(mut self, id: impl Into<String>) -> Self {
        self.template_id = Some(id.into());
        self
    }

    /// Supply content for one of the template's editable regions
    pub fn template_content(mut self, block: impl Into<String>, html: impl Into<String>) -> Self {
        self.template_content.insert(block.into(), html.into());
        self
    }

    /// Set a merge field for one recipient (overrides the global value)
    pub fn merge(
        mut self,
        recipient: impl Into<String>,
        field: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        self.merge_data
            .entry(recipient.into())
            .or_default()
            .insert(field.into(), value.into());
        self
    }

    /// Set a global merge field, used as the default for every recipient
    pub fn merge_global(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.merge_global_data.insert(field.into(), value.into());
        self
    }

    /// Set the merge syntax ("mailchimp" or "handlebars")
    pub fn merge_language(mut self, language: impl Into<String>) -> Self {
        self.merge_language = Some(language.into());
        self
    }

    /// Attach message-level metadata
    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Attach metadata for one recipient
    pub fn recipient_metadata(
        mut self,
        recipient: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        self.recipient_metadata
            .entry(recipient.into())
            .or_default()
            .insert(key.into(), value.into());
        self
    }

    /// Add a tag
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Schedule delivery for the given unix timestamp (seconds)
    pub fn send_at(mut self, timestamp: i64) -> Self {
        self.send_at = Some(timestamp);
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

    pub fn important(mut self, important: bool) -> Self {
        self.important = Some(important);
        self
    }

    pub fn preserve_recipients(mut self, preserve: bool) -> Self {
        self.preserve_recipients = Some(preserve);
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

    /// Add an attachment
    pub fn attach(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Add an inline image, referenced from the HTML body by cid
    pub fn image(mut self, image: Attachment) -> Self {
        self.images.push(image);
        self
    }

    /// Whether any recipient has per-recipient merge data
    pub fn has_merge_data(&self) -> bool {
        self.merge_data.values().any(|vars| !vars.is_empty())
    }

    /// Validate the message has enough to send
    pub fn validate(&self) -> Result<()> {
        if self.to.is_empty() {
            return Err(MailwayError::bad_request(
                "Message must have at least one 'to' recipient",
            ));
        }
        if self.template_id.is_none() && self.text.is_none() && self.html.is_none() {
            return Err(MailwayError::bad_request(
                "Message must have a body or reference a stored template",
            ));
        }
        Ok(())
    }
}
