//! Stream configuration.

use std::time::Duration;

/// Default backend base URL (the local development backend).
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Configuration for a chat session.
///
/// The `reconnect`, `max_retries` and `retry_delay` fields mirror the shape
/// the web client accepts. No retry loop consumes them: the core performs no
/// automatic reconnection, and a failed exchange must be re-sent by the
/// caller. The surface is kept so callers configuring it do not break if
/// reconnection is ever designed in.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamConfig {
    /// Base URL of the backend
    pub base_url: String,
    /// Accepted but not acted upon (no automatic reconnection)
    pub reconnect: bool,
    /// Accepted but not acted upon
    pub max_retries: u32,
    /// Accepted but not acted upon
    pub retry_delay: Duration,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            reconnect: false,
            max_retries: 3,
            retry_delay: Duration::from_millis(1000),
        }
    }
}

impl StreamConfig {
    /// Config pointing at a custom backend
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }
}
