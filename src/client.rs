//! HTTP client for the assistant backend.
//!
//! Issues the streaming chat request and turns the response body into a
//! typed event stream: bytes from `bytes_stream()` go through the
//! incremental UTF-8 decoder and the SSE frame parser, and complete frames
//! come out as [`SseEvent`]s. Dropping the returned stream releases the
//! underlying connection.

use crate::config::DEFAULT_BASE_URL;
use crate::decode::Utf8Decoder;
use crate::events::SseEvent;
use crate::models::ChatRequest;
use crate::sse::SseParser;
use futures_util::stream::{self, Stream};
use futures_util::StreamExt;
use reqwest::Client;
use std::collections::VecDeque;
use std::pin::Pin;

/// Stream of typed events produced by one exchange
pub type EventStream = Pin<Box<dyn Stream<Item = Result<SseEvent, ChatError>> + Send>>;

/// Error type for chat client operations
#[derive(Debug)]
pub enum ChatError {
    /// HTTP request failed (connection, DNS, mid-stream abort)
    Http(reqwest::Error),
    /// Server returned a non-success status before streaming began
    Server { status: u16, message: String },
}

impl std::fmt::Display for ChatError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChatError::Http(e) => write!(f, "HTTP error: {}", e),
            ChatError::Server { status, message } => {
                write!(f, "Server error ({}): {}", status, message)
            }
        }
    }
}

impl std::error::Error for ChatError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ChatError::Http(e) => Some(e),
            ChatError::Server { .. } => None,
        }
    }
}

impl From<reqwest::Error> for ChatError {
    fn from(e: reqwest::Error) -> Self {
        ChatError::Http(e)
    }
}

/// Client for the assistant backend.
///
/// Cheap to clone; the inner `reqwest::Client` reuses its connection pool.
#[derive(Debug, Clone)]
pub struct ChatClient {
    /// Base URL for the backend
    pub base_url: String,
    /// Bearer token attached to requests when available
    token: Option<String>,
    /// Reusable HTTP client
    client: Client,
}

impl ChatClient {
    /// Create a client with the default base URL.
    pub fn new() -> Self {
        Self::with_url(DEFAULT_BASE_URL)
    }

    /// Create a client with a custom base URL.
    pub fn with_url(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
            client: Client::new(),
        }
    }

    /// Attach a bearer token for authenticated requests.
    pub fn with_auth(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }

    /// Send a chat turn and stream the assistant's response.
    ///
    /// Sends a POST to `/chat/assistant` with `Accept: text/event-stream`
    /// and returns the typed event stream. A non-2xx response is reported as
    /// [`ChatError::Server`] before any event is produced; a transport
    /// failure mid-stream surfaces as an `Err` item.
    pub async fn stream(&self, request: &ChatRequest) -> Result<EventStream, ChatError> {
        let url = format!("{}/chat/assistant", self.base_url);

        let mut builder = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("Accept", "text/event-stream")
            .header("Cache-Control", "no-cache")
            .json(request);
        if let Some(token) = &self.token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }

        let response = builder.send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ChatError::Server { status, message });
        }

        let bytes_stream = response.bytes_stream();

        // Bytes -> text -> frames -> events. A chunk can complete several
        // frames at once, so parsed events queue up and drain one per poll.
        let event_stream = stream::unfold(
            (
                bytes_stream,
                Utf8Decoder::new(),
                SseParser::new(),
                VecDeque::new(),
            ),
            |(mut bytes_stream, mut decoder, mut parser, mut ready)| async move {
                loop {
                    if let Some(event) = ready.pop_front() {
                        return Some((Ok(event), (bytes_stream, decoder, parser, ready)));
                    }

                    match bytes_stream.next().await {
                        Some(Ok(chunk)) => {
                            let text = decoder.decode(&chunk);
                            ready.extend(parser.feed(&text));
                        }
                        Some(Err(e)) => {
                            return Some((
                                Err(ChatError::Http(e)),
                                (bytes_stream, decoder, parser, ready),
                            ));
                        }
                        None => {
                            // End of stream. A residual partial frame is
                            // indistinguishable from normal termination and
                            // is discarded (see SseParser docs).
                            if parser.has_residual() {
                                tracing::debug!(
                                    "stream ended with an incomplete trailing frame; discarded"
                                );
                            }
                            return None;
                        }
                    }
                }
            },
        );

        Ok(Box::pin(event_stream))
    }

    /// Check whether the backend is reachable and healthy.
    pub async fn health_check(&self) -> Result<bool, ChatError> {
        let url = format!("{}/health", self.base_url);
        let response = self.client.get(&url).send().await?;
        Ok(response.status().is_success())
    }
}

impl Default for ChatClient {
    fn default() -> Self {
        Self::new()
    }
}
