//! Request and conversation models for the assistant endpoint.
//!
//! The request shapes (`ChatRequest`, `ChatMessage`) are defined by the
//! messaging layer of the backend and passed through untouched; the crate
//! never interprets message content. `ChatEntry` is the finalized record the
//! stream consumer hands to observers.

use crate::events::ToolCall;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Sent by the user
    User,
    /// Produced by the assistant model
    Model,
}

/// One part of a multi-part message body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentPart {
    /// Plain text
    Text { text: String },
    /// Inline image, base64-encoded
    Image { data: String, mime_type: String },
}

impl ContentPart {
    /// Build an image part from raw bytes.
    pub fn image_from_bytes(bytes: &[u8], mime_type: impl Into<String>) -> Self {
        ContentPart::Image {
            data: BASE64.encode(bytes),
            mime_type: mime_type.into(),
        }
    }
}

/// Message content: either a plain string or an ordered list of typed parts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    /// Plain text body
    Text(String),
    /// Mixed text/image body
    Parts(Vec<ContentPart>),
}

impl From<&str> for MessageContent {
    fn from(text: &str) -> Self {
        MessageContent::Text(text.to_string())
    }
}

impl From<String> for MessageContent {
    fn from(text: String) -> Self {
        MessageContent::Text(text)
    }
}

/// One message in the conversation sent to the assistant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: MessageContent,
}

impl ChatMessage {
    /// A plain-text user message
    pub fn user(text: impl Into<MessageContent>) -> Self {
        Self {
            role: MessageRole::User,
            content: text.into(),
        }
    }

    /// A plain-text model message
    pub fn model(text: impl Into<MessageContent>) -> Self {
        Self {
            role: MessageRole::Model,
            content: text.into(),
        }
    }
}

/// Request body for the streaming chat endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ChatRequest {
    /// Previously persisted conversation turns
    #[serde(default)]
    pub history_messages: Vec<ChatMessage>,
    /// Messages for the current turn
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

impl ChatRequest {
    /// Request for a new turn with no history
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            history_messages: Vec::new(),
            messages,
        }
    }

    /// Attach conversation history
    pub fn with_history(mut self, history: Vec<ChatMessage>) -> Self {
        self.history_messages = history;
        self
    }
}

/// Kind of a finalized chat entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// Assistant reply text (or a synthetic error notice)
    Message,
    /// Standalone tool invocation record
    ToolCall,
}

/// A finalized conversation record handed to observers.
///
/// Produced when the accumulated reply is flushed on `done`, when a
/// `tool_call` event arrives, or synthetically when an exchange fails.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatEntry {
    /// Fresh identifier for this entry
    pub id: String,
    pub kind: EntryKind,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// Present only for tool-call entries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call: Option<ToolCall>,
}

impl ChatEntry {
    /// A finalized message entry with a fresh id and timestamp
    pub fn message(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind: EntryKind::Message,
            content: content.into(),
            timestamp: Utc::now(),
            tool_call: None,
        }
    }

    /// A standalone tool-call entry
    pub fn tool_call(content: impl Into<String>, call: ToolCall) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind: EntryKind::ToolCall,
            content: content.into(),
            timestamp: Utc::now(),
            tool_call: Some(call),
        }
    }
}
