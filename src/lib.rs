//! Streaming chat client core for the Cardfile assistant.
//!
//! Cardfile's contact and record CRUD lives in a conventional REST backend;
//! this crate owns the one streaming piece: consuming the assistant's
//! `text/event-stream` response body, reassembling network-fragmented frames
//! into typed events, and driving the connection lifecycle a UI observes.
//!
//! Data flows one way: transport bytes -> UTF-8 decoder -> frame parser ->
//! typed events -> the session's accumulation and observer callbacks.
//!
//! ```ignore
//! use cardfile_stream::{ChatMessage, ChatRequest, ChatSession, StreamConfig};
//!
//! let mut session = ChatSession::new(StreamConfig::default(), observer);
//! session.send_message(ChatRequest::new(vec![ChatMessage::user("hi")]));
//! ```

pub mod chat;
pub mod client;
pub mod config;
pub mod connection;
pub mod decode;
pub mod events;
pub mod models;
pub mod sse;

pub use chat::{ChatObserver, ChatSession};
pub use client::{ChatClient, ChatError, EventStream};
pub use config::StreamConfig;
pub use connection::{ConnectionState, StateMachine};
pub use decode::Utf8Decoder;
pub use events::{SseEvent, ToolCall};
pub use models::{
    ChatEntry, ChatMessage, ChatRequest, ContentPart, EntryKind, MessageContent, MessageRole,
};
pub use sse::{SseParseError, SseParser};
