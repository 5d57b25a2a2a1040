use futures_util::future::BoxFuture;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Message type the store reports while the payload is still encrypted.
pub const CIPHERTEXT_TYPE: &str = "ciphertext";

/// Settles once the store has finished trying to decrypt a message.
/// Success and failure are both just "try again now" signals.
pub type DecryptionFuture = BoxFuture<'static, Result<(), anyhow::Error>>;

/// Optional capability of a ciphertext message: wait for its decryption.
pub trait DecryptionAwait: Send + Sync {
    /// Returns `Ok(None)` when there is nothing to wait on.
    fn wait_decrypted(&self) -> Result<Option<DecryptionFuture>, anyhow::Error>;
}

/// A message as delivered by the store's "message added" notification.
#[derive(Clone, Default)]
pub struct RawMessage {
    pub id: String,
    pub from: Option<String>,
    pub chat_id: Option<String>,
    pub msg_type: String,
    pub body: Option<String>,
    pub timestamp: Option<i64>,
    pub is_new_msg: bool,
    pub is_sent_by_me: bool,
    pub is_status_v3: bool,
    pub decryption: Option<Arc<dyn DecryptionAwait>>,
}

impl RawMessage {
    /// A freshly received message from someone else.
    pub fn incoming(id: impl Into<String>, msg_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            msg_type: msg_type.into(),
            is_new_msg: true,
            ..Default::default()
        }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_chat(mut self, chat_id: impl Into<String>) -> Self {
        let chat_id = chat_id.into();
        self.from = Some(chat_id.clone());
        self.chat_id = Some(chat_id);
        self
    }

    pub fn with_decryption(mut self, decryption: Arc<dyn DecryptionAwait>) -> Self {
        self.decryption = Some(decryption);
        self
    }

    /// New, from someone else, and not a status update.
    pub fn is_deliverable(&self) -> bool {
        self.is_new_msg && !self.is_sent_by_me && !self.is_status_v3
    }

    pub fn is_ciphertext(&self) -> bool {
        self.msg_type == CIPHERTEXT_TYPE
    }

    pub fn has_body(&self) -> bool {
        self.body.as_deref().is_some_and(|b| !b.is_empty())
    }
}

impl fmt::Debug for RawMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawMessage")
            .field("id", &self.id)
            .field("chat_id", &self.chat_id)
            .field("msg_type", &self.msg_type)
            .field("has_body", &self.has_body())
            .field("is_new_msg", &self.is_new_msg)
            .field("is_sent_by_me", &self.is_sent_by_me)
            .field("is_status_v3", &self.is_status_v3)
            .field("decryption", &self.decryption.is_some())
            .finish()
    }
}

/// Flags passed through to the normalizer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeOptions {
    pub include_me: bool,
    pub include_notifications: bool,
}

/// The public shape of a message handed to consumers.
///
/// `extra` carries any additional fields the normalizer attaches. An entry
/// present with `None` is a field that was set but holds no value; those
/// are stripped before the message is persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedMessage {
    pub id: String,
    #[serde(rename = "type")]
    pub msg_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    #[serde(flatten, deserialize_with = "present_fields")]
    pub extra: BTreeMap<String, Option<Value>>,
}

// Every field present in the input holds a value, `null` included.
fn present_fields<'de, D>(deserializer: D) -> Result<BTreeMap<String, Option<Value>>, D::Error>
where
    D: Deserializer<'de>,
{
    let fields = BTreeMap::<String, Value>::deserialize(deserializer)?;
    Ok(fields.into_iter().map(|(k, v)| (k, Some(v))).collect())
}

impl NormalizedMessage {
    pub fn new(id: impl Into<String>, msg_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            msg_type: msg_type.into(),
            ..Default::default()
        }
    }

    pub fn is_ciphertext(&self) -> bool {
        self.msg_type == CIPHERTEXT_TYPE
    }

    /// Drops every `extra` field that holds no value.
    pub fn strip_undefined(&mut self) {
        self.extra.retain(|_, v| v.is_some());
    }

    pub fn has_undefined(&self) -> bool {
        self.extra.values().any(Option::is_none)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deliverable_filter() {
        let msg = RawMessage::incoming("1", "chat");
        assert!(msg.is_deliverable());

        let mut mine = msg.clone();
        mine.is_sent_by_me = true;
        assert!(!mine.is_deliverable());

        let mut status = msg.clone();
        status.is_status_v3 = true;
        assert!(!status.is_deliverable());

        let mut old = msg;
        old.is_new_msg = false;
        assert!(!old.is_deliverable());
    }

    #[test]
    fn test_has_body_ignores_empty() {
        assert!(!RawMessage::incoming("1", "chat").has_body());
        assert!(!RawMessage::incoming("1", "chat").with_body("").has_body());
        assert!(RawMessage::incoming("1", "chat").with_body("hi").has_body());
    }

    #[test]
    fn test_strip_undefined_serializes_cleanly() {
        let mut msg = NormalizedMessage::new("ABC", "chat");
        msg.body = Some("hello".into());
        msg.extra.insert("quotedMsg".into(), None);
        msg.extra.insert("isForwarded".into(), Some(json!(false)));
        assert!(msg.has_undefined());

        msg.strip_undefined();
        assert!(!msg.has_undefined());

        let value = serde_json::to_value(&msg).expect("message should serialize");
        assert_eq!(
            value,
            json!({"id": "ABC", "type": "chat", "body": "hello", "isForwarded": false})
        );
    }

    #[test]
    fn test_deserialize_keeps_unknown_fields() {
        let msg: NormalizedMessage = serde_json::from_value(json!({
            "id": "ABC",
            "type": "image",
            "chatId": "12345@c.us",
            "mimetype": "image/jpeg"
        }))
        .expect("message should parse");
        assert_eq!(msg.chat_id.as_deref(), Some("12345@c.us"));
        assert_eq!(msg.extra.get("mimetype"), Some(&Some(json!("image/jpeg"))));
    }

    #[test]
    fn test_null_field_is_not_undefined() {
        let mut msg = NormalizedMessage::new("ABC", "chat");
        msg.extra.insert("quotedMsg".into(), Some(Value::Null));
        msg.strip_undefined();
        let json = serde_json::to_string(&msg).expect("message should serialize");

        let mut parsed: NormalizedMessage = serde_json::from_str(&json).expect("message should parse");
        assert_eq!(parsed.extra.get("quotedMsg"), Some(&Some(Value::Null)));
        assert!(!parsed.has_undefined());
        parsed.strip_undefined();
        assert_eq!(serde_json::to_string(&parsed).expect("message should serialize"), json);
    }
}
