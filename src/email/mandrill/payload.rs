//! Outbound request mapping
//!
//! Translates an [`OutboundMessage`] into the JSON structure the Mandrill
//! send API expects. All mapping happens before any network call, so a
//! message that cannot be represented fails locally with a
//! `Serialization` error.
//!
//! Two invariants matter here:
//! - Options the caller never set are omitted from the JSON entirely (not
//!   sent as false/empty), so provider account defaults apply.
//! - When any recipient has per-recipient merge data, `preserve_recipients`
//!   is forced to false so each recipient sees only their own address.

use crate::config::Config;
use crate::error::{MailwayError, Result};
use crate::message::{Attachment, OutboundMessage};
use base64::Engine;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

/// API endpoint for inline-content sends
pub const SEND_ENDPOINT: &str = "messages/send.json";
/// API endpoint for stored-template sends
pub const SEND_TEMPLATE_ENDPOINT: &str = "messages/send-template.json";

/// Complete send request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendRequest {
    pub key: String,
    pub message: MessagePayload,
    #[serde(rename = "async", skip_serializing_if = "Option::is_none")]
    pub async_send: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_pool: Option<String>,
    /// UTC timestamp in the provider's "YYYY-MM-DD HH:MM:SS" format
    #[serde(skip_serializing_if = "Option::is_none")]
    pub send_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_content: Option<Vec<NamedContent>>,
}

/// The `message` object inside a send request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessagePayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_name: Option<String>,
    pub to: Vec<RecipientPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub important: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub track_opens: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub track_clicks: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preserve_recipients: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merge_language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub global_merge_vars: Option<Vec<NamedContent>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merge_vars: Option<Vec<RecipientVars>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BTreeMap<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient_metadata: Option<Vec<RecipientMetadata>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subaccount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<AttachmentPayload>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<AttachmentPayload>>,
}

/// One entry in the request's `to` array
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientPayload {
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub recipient_type: String,
}

/// Name/content pair, the provider's verbose form of a mapping entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedContent {
    pub name: String,
    pub content: Value,
}

/// Per-recipient merge variables in the provider's rcpt/vars form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipientVars {
    pub rcpt: String,
    pub vars: Vec<NamedContent>,
}

/// Per-recipient metadata in the provider's rcpt/values form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipientMetadata {
    pub rcpt: String,
    pub values: BTreeMap<String, Value>,
}

/// Base64-encoded attachment or inline image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentPayload {
    #[serde(rename = "type")]
    pub mime_type: String,
    pub name: String,
    pub content: String,
}

impl SendRequest {
    /// Map a normalized message onto the provider request structure.
    ///
    /// Applies the config's send defaults wherever the message leaves an
    /// option unset. Fails with `Serialization` if any merge or metadata
    /// value is not representable in the provider's accepted types; this
    /// happens before any network call.
    pub fn build(message: &OutboundMessage, config: &Config) -> Result<Self> {
        message.validate()?;

        let defaults = &config.send_defaults;

        let mut payload = MessagePayload {
            html: message.html.clone(),
            text: message.text.clone(),
            subject: message.subject.clone(),
            to: build_to_list(message),
            important: message.important.or(defaults.important),
            track_opens: message.track_opens.or(defaults.track_opens),
            track_clicks: message.track_clicks.or(defaults.track_clicks),
            merge_language: message
                .merge_language
                .clone()
                .or_else(|| defaults.merge_language.clone()),
            subaccount: message
                .subaccount
                .clone()
                .or_else(|| defaults.subaccount.clone()),
            ..MessagePayload::default()
        };

        if let Some(from) = &message.from {
            payload.from_email = Some(from.email.clone());
            payload.from_name = from.name.clone().or_else(|| defaults.from_name.clone());
        } else {
            payload.from_name = defaults.from_name.clone();
        }

        if let Some(reply_to) = &message.reply_to {
            let mut headers = BTreeMap::new();
            headers.insert("Reply-To".to_string(), reply_to.clone());
            payload.headers = Some(headers);
        }

        // Batch/individualized delivery: per-recipient merge data means the
        // full recipient list must not be exposed to each recipient.
        payload.preserve_recipients = if message.has_merge_data() {
            Some(false)
        } else {
            message
                .preserve_recipients
                .or(defaults.preserve_recipients)
        };

        if !message.merge_global_data.is_empty() {
            payload.global_merge_vars = Some(expand_named_content(
                "merge_global_data",
                &message.merge_global_data,
            )?);
        }

        if message.has_merge_data() {
            payload.merge_vars = Some(build_merge_vars(
                &message.merge_data,
                &message.merge_global_data,
            )?);
        }

        if !message.metadata.is_empty() {
            let mut metadata = BTreeMap::new();
            for (key, value) in &message.metadata {
                check_provider_value("metadata", key, value)?;
                metadata.insert(key.clone(), value.clone());
            }
            payload.metadata = Some(metadata);
        }

        if !message.recipient_metadata.is_empty() {
            let mut entries = Vec::new();
            for (rcpt, values) in sorted(&message.recipient_metadata) {
                let mut expanded = BTreeMap::new();
                for (key, value) in values {
                    check_provider_value("recipient_metadata", key, value)?;
                    expanded.insert(key.clone(), value.clone());
                }
                entries.push(RecipientMetadata {
                    rcpt: rcpt.clone(),
                    values: expanded,
                });
            }
            payload.recipient_metadata = Some(entries);
        }

        if !message.tags.is_empty() {
            payload.tags = Some(message.tags.clone());
        }
        if !message.attachments.is_empty() {
            payload.attachments = Some(message.attachments.iter().map(encode_attachment).collect());
        }
        if !message.images.is_empty() {
            payload.images = Some(message.images.iter().map(encode_attachment).collect());
        }

        let template_content = message.template_id.as_ref().map(|_| {
            sorted(&message.template_content)
                .map(|(name, content)| NamedContent {
                    name: name.clone(),
                    content: Value::String(content.clone()),
                })
                .collect()
        });

        Ok(SendRequest {
            key: config.api_key.expose_secret().to_string(),
            message: payload,
            async_send: message.async_send.or(defaults.async_send),
            ip_pool: message.ip_pool.clone().or_else(|| defaults.ip_pool.clone()),
            send_at: message.send_at.map(format_send_at).transpose()?,
            template_name: message.template_id.clone(),
            template_content,
        })
    }

    /// The API endpoint this request targets
    pub fn endpoint(&self) -> &'static str {
        if self.template_name.is_some() {
            SEND_TEMPLATE_ENDPOINT
        } else {
            SEND_ENDPOINT
        }
    }
}

fn build_to_list(message: &OutboundMessage) -> Vec<RecipientPayload> {
    let typed = |addresses: &[crate::message::Address], recipient_type: &str| {
        addresses
            .iter()
            .map(|addr| RecipientPayload {
                email: addr.email.clone(),
                name: addr.name.clone(),
                recipient_type: recipient_type.to_string(),
            })
            .collect::<Vec<_>>()
    };

    // The provider takes cc/bcc as typed entries in the single `to` array
    let mut to = typed(&message.to, "to");
    to.extend(typed(&message.cc, "cc"));
    to.extend(typed(&message.bcc, "bcc"));
    to
}

/// Expand a merge mapping into the provider's sorted name/content list
fn expand_named_content(
    field: &str,
    mapping: &HashMap<String, Value>,
) -> Result<Vec<NamedContent>> {
    sorted(mapping)
        .map(|(name, content)| {
            check_provider_value(field, name, content)?;
            Ok(NamedContent {
                name: name.clone(),
                content: content.clone(),
            })
        })
        .collect()
}

/// Build per-recipient merge vars with global values filling gaps.
///
/// Per-recipient values take precedence; global values are merged in for
/// fields the recipient doesn't override. This is deliberate: a recipient
/// entry supplements the global mapping rather than replacing it.
fn build_merge_vars(
    merge_data: &HashMap<String, HashMap<String, Value>>,
    global: &HashMap<String, Value>,
) -> Result<Vec<RecipientVars>> {
    sorted(merge_data)
        .map(|(rcpt, vars)| {
            let mut resolved: HashMap<String, Value> = global.clone();
            resolved.extend(vars.iter().map(|(k, v)| (k.clone(), v.clone())));
            Ok(RecipientVars {
                rcpt: rcpt.clone(),
                vars: expand_named_content("merge_data", &resolved)?,
            })
        })
        .collect()
}

/// Reject values the provider cannot accept.
///
/// Merge and metadata values must be strings, numbers, booleans, or
/// arrays/objects of those. Null is how serde renders values with no JSON
/// representation (dates and other opaque types), so it is refused here,
/// before any network call.
fn check_provider_value(field: &str, key: &str, value: &Value) -> Result<()> {
    match value {
        Value::Null => Err(MailwayError::serialization(format!(
            "Cannot send {} value for '{}' to the provider. \
             Try converting it to a string or number first.",
            field, key
        ))),
        Value::Array(items) => items
            .iter()
            .try_for_each(|item| check_provider_value(field, key, item)),
        Value::Object(entries) => entries
            .values()
            .try_for_each(|item| check_provider_value(field, key, item)),
        Value::Bool(_) | Value::Number(_) | Value::String(_) => Ok(()),
    }
}

fn encode_attachment(attachment: &Attachment) -> AttachmentPayload {
    AttachmentPayload {
        mime_type: attachment.mime_type.clone(),
        name: attachment.name.clone(),
        content: base64::engine::general_purpose::STANDARD.encode(&attachment.content),
    }
}

fn format_send_at(timestamp: i64) -> Result<String> {
    let datetime = chrono::DateTime::from_timestamp(timestamp, 0).ok_or_else(|| {
        MailwayError::serialization(format!("send_at timestamp {} is out of range", timestamp))
    })?;
    Ok(datetime.format("%Y-%m-%d %H:%M:%S").to_string())
}

/// Iterate a HashMap in key order so request output is deterministic
fn sorted<V>(map: &HashMap<String, V>) -> impl Iterator<Item = (&String, &V)> {
    let mut entries: Vec<_> = map.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    entries.into_iter()
}
