//! Typed messages exchanged between agents.
//!
//! A [`Message`] carries an opaque payload between two roles (directed) or
//! from one role to every subscriber of its kind (broadcast, `recipient`
//! absent). Threading is expressed through `parent_id` lineage and an
//! optional conversation id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::role::AgentRole;

/// Error type for message id validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageIdError(String);

impl std::fmt::Display for MessageIdError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid message id (expected UUID): '{}'", self.0)
    }
}

impl std::error::Error for MessageIdError {}

/// Unique identifier for a message (UUID v4).
///
/// Freshly constructed ids are unique for the process lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(String);

impl MessageId {
    /// Create a new random message id.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Parse and validate a message id from a string.
    pub fn parse(id: impl AsRef<str>) -> Result<Self, MessageIdError> {
        let s = id.as_ref();
        Uuid::parse_str(s).map_err(|_| MessageIdError(s.to_string()))?;
        Ok(Self(s.to_string()))
    }

    /// Get the message id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Enumerated message kinds, the unit of subscription filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Request,
    Response,
    Notification,
    Error,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Request => "request",
            MessageKind::Response => "response",
            MessageKind::Notification => "notification",
            MessageKind::Error => "error",
        }
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Message payload - a tagged union per content shape.
///
/// The `Unknown` variant is the forward-compatibility fallback: payloads
/// whose tag is not recognized deserialize into it instead of failing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Payload {
    /// Plain text payload
    Text(String),
    /// Structured JSON payload
    Json(serde_json::Value),
    /// Payload with an unrecognized tag
    #[serde(other)]
    Unknown,
}

impl Payload {
    /// View the payload as JSON, whatever its variant.
    pub fn as_json(&self) -> serde_json::Value {
        match self {
            Payload::Text(s) => serde_json::Value::String(s.clone()),
            Payload::Json(v) => v.clone(),
            Payload::Unknown => serde_json::Value::Null,
        }
    }
}

impl From<String> for Payload {
    fn from(s: String) -> Self {
        Payload::Text(s)
    }
}

impl From<&str> for Payload {
    fn from(s: &str) -> Self {
        Payload::Text(s.to_string())
    }
}

impl From<serde_json::Value> for Payload {
    fn from(v: serde_json::Value) -> Self {
        Payload::Json(v)
    }
}

/// A message sent between agents.
///
/// `recipient` absent means broadcast: delivery to every registered agent
/// (except the sender) subscribed to the message's kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique message identifier
    pub id: MessageId,
    /// Sending agent role
    pub sender: AgentRole,
    /// Target agent role; `None` broadcasts to subscribers
    pub recipient: Option<AgentRole>,
    /// Message kind, the subscription filtering key
    pub kind: MessageKind,
    /// Opaque payload
    pub payload: Payload,
    /// Timestamp when the message was created
    pub timestamp: DateTime<Utc>,
    /// Id of the message this one answers, for threading
    pub parent_id: Option<MessageId>,
    /// Conversation this message belongs to
    pub conversation_id: Option<String>,
}

impl Message {
    /// Create a broadcast message of the given kind.
    pub fn broadcast(sender: AgentRole, kind: MessageKind, payload: impl Into<Payload>) -> Self {
        Self {
            id: MessageId::new(),
            sender,
            recipient: None,
            kind,
            payload: payload.into(),
            timestamp: Utc::now(),
            parent_id: None,
            conversation_id: None,
        }
    }

    /// Create a directed message to a specific role.
    pub fn direct(
        sender: AgentRole,
        recipient: AgentRole,
        kind: MessageKind,
        payload: impl Into<Payload>,
    ) -> Self {
        Self {
            recipient: Some(recipient),
            ..Self::broadcast(sender, kind, payload)
        }
    }

    /// Create a response threaded under an existing message.
    ///
    /// The reply is addressed to the original sender, inherits the
    /// conversation, and records the original id as `parent_id` - so a
    /// parent id always references a previously issued message.
    pub fn reply_to(original: &Message, sender: AgentRole, payload: impl Into<Payload>) -> Self {
        Self {
            recipient: Some(original.sender),
            parent_id: Some(original.id.clone()),
            conversation_id: original.conversation_id.clone(),
            ..Self::broadcast(sender, MessageKind::Response, payload)
        }
    }

    /// Attach the message to a conversation.
    pub fn with_conversation(mut self, conversation_id: impl Into<String>) -> Self {
        self.conversation_id = Some(conversation_id.into());
        self
    }

    /// Thread the message under a parent id.
    pub fn with_parent(mut self, parent_id: MessageId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    /// Check whether this message is a broadcast.
    pub fn is_broadcast(&self) -> bool {
        self.recipient.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_ids_are_unique() {
        let a = Message::broadcast(AgentRole::Planner, MessageKind::Request, "a");
        let b = Message::broadcast(AgentRole::Planner, MessageKind::Request, "b");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn message_id_parse_rejects_non_uuid() {
        assert!(MessageId::parse("not-a-uuid").is_err());
        assert!(MessageId::parse("").is_err());
        let id = MessageId::new();
        assert!(MessageId::parse(id.as_str()).is_ok());
    }

    #[test]
    fn reply_threads_under_original() {
        let req = Message::direct(
            AgentRole::Planner,
            AgentRole::Coder,
            MessageKind::Request,
            "write it",
        )
        .with_conversation("conv-1");

        let resp = Message::reply_to(&req, AgentRole::Coder, "done");
        assert_eq!(resp.recipient, Some(AgentRole::Planner));
        assert_eq!(resp.parent_id, Some(req.id.clone()));
        assert_eq!(resp.conversation_id.as_deref(), Some("conv-1"));
        assert_eq!(resp.kind, MessageKind::Response);
    }

    #[test]
    fn unknown_payload_tag_falls_back() {
        let raw = r#"{"type":"protobuf","data":"AAEC"}"#;
        let payload: Payload = serde_json::from_str(raw).unwrap();
        assert!(matches!(payload, Payload::Unknown));
    }

    #[test]
    fn payload_round_trips() {
        let payload = Payload::Json(serde_json::json!({"files": 3}));
        let json = serde_json::to_string(&payload).unwrap();
        let back: Payload = serde_json::from_str(&json).unwrap();
        assert!(matches!(back, Payload::Json(_)));
    }
}
