//! Typed events for the assistant streaming protocol.
//!
//! The assistant endpoint emits exactly five event kinds. Keeping them in a
//! closed enum means dispatch is an exhaustive `match` and an unrecognized
//! kind is a parse-time error rather than a silent fallthrough.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A tool invocation reported by the assistant.
///
/// Tool calls are discrete units: they are never merged into the streamed
/// reply text, and signal to collaborators that backing data (contacts,
/// records) may have changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Name of the tool that was invoked
    pub name: String,
    /// Arguments the assistant passed to the tool
    #[serde(default)]
    pub arguments: Map<String, Value>,
    /// Result string returned by the tool
    #[serde(default)]
    pub result: String,
}

/// Typed events from the assistant streaming endpoint.
#[derive(Debug, Clone, PartialEq)]
pub enum SseEvent {
    /// Stream accepted by the server
    Connected { message: String },
    /// Incremental fragment (delta) of the assistant reply
    Message { content: String },
    /// Discrete tool invocation, reported as its own unit
    ToolCall {
        content: String,
        tool_call: ToolCall,
        timestamp: Option<String>,
    },
    /// Terminal success marker
    Done { message: String },
    /// Terminal failure marker
    Error {
        message: String,
        error_type: Option<String>,
    },
}

impl SseEvent {
    /// Returns the wire-level event type name.
    pub fn event_type_name(&self) -> &'static str {
        match self {
            SseEvent::Connected { .. } => "connected",
            SseEvent::Message { .. } => "message",
            SseEvent::ToolCall { .. } => "tool_call",
            SseEvent::Done { .. } => "done",
            SseEvent::Error { .. } => "error",
        }
    }

    /// Whether this event ends the exchange.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SseEvent::Done { .. } | SseEvent::Error { .. })
    }
}
