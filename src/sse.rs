//! SSE (Server-Sent Events) frame parser for the assistant stream.
//!
//! Parses the SSE format emitted by the assistant endpoint:
//! - `event: <type>` - event type line
//! - `data: <json>` - data payload line
//! - Empty line - signals end of frame
//! - Lines starting with `:` - comments (ignored)
//!
//! The parser keeps a persistent text buffer so a frame split across
//! network chunks is reassembled transparently; anything after the last
//! complete frame stays buffered for the next feed.

use crate::events::{SseEvent, ToolCall};
use serde::Deserialize;

/// Represents a parsed SSE line
#[derive(Debug, Clone, PartialEq)]
pub enum SseLine {
    /// Event type declaration (e.g., "event: message")
    Event(String),
    /// Data payload (e.g., "data: {\"content\": \"hello\"}")
    Data(String),
    /// Empty line - signals end of frame
    Empty,
    /// Comment line (starts with ':')
    Comment(String),
}

/// Parse a single SSE line into its component type
pub fn parse_sse_line(line: &str) -> SseLine {
    let line = line.strip_suffix('\r').unwrap_or(line);

    if line.is_empty() {
        return SseLine::Empty;
    }

    if let Some(stripped) = line.strip_prefix(':') {
        return SseLine::Comment(stripped.trim().to_string());
    }

    if let Some(rest) = line.strip_prefix("event:") {
        return SseLine::Event(rest.trim().to_string());
    }

    if let Some(rest) = line.strip_prefix("data:") {
        return SseLine::Data(rest.trim().to_string());
    }

    // Unknown line format - treat as comment
    SseLine::Comment(line.to_string())
}

/// Errors that can occur while parsing a single SSE frame
#[derive(Debug, Clone, PartialEq)]
pub enum SseParseError {
    /// Event type is not one of the five known kinds
    UnknownEventType(String),
    /// Invalid JSON in data payload
    InvalidJson { event_type: String, source: String },
    /// Frame had an event header but no data header
    MissingData { event_type: String },
    /// Frame had a data header but no event header
    MissingEventType,
}

impl std::fmt::Display for SseParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SseParseError::UnknownEventType(t) => write!(f, "Unknown SSE event type: {}", t),
            SseParseError::InvalidJson { event_type, source } => {
                write!(f, "Invalid JSON for event '{}': {}", event_type, source)
            }
            SseParseError::MissingData { event_type } => {
                write!(f, "Missing data for event type: {}", event_type)
            }
            SseParseError::MissingEventType => write!(f, "Frame has data but no event type"),
        }
    }
}

impl std::error::Error for SseParseError {}

#[derive(Debug, Clone, Deserialize)]
struct ConnectedPayload {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Clone, Deserialize)]
struct MessagePayload {
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ToolCallPayload {
    #[serde(default)]
    content: String,
    tool_call: ToolCall,
    #[serde(default)]
    timestamp: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct DonePayload {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ErrorPayload {
    #[serde(default)]
    message: String,
    #[serde(default)]
    error_type: Option<String>,
}

/// Parse an SSE event type and JSON data into a typed [`SseEvent`]
pub fn parse_sse_event(event_type: &str, data: &str) -> Result<SseEvent, SseParseError> {
    let invalid_json = |e: serde_json::Error| SseParseError::InvalidJson {
        event_type: event_type.to_string(),
        source: e.to_string(),
    };

    match event_type {
        "connected" => {
            let payload: ConnectedPayload = serde_json::from_str(data).map_err(invalid_json)?;
            Ok(SseEvent::Connected {
                message: payload.message,
            })
        }
        "message" => {
            let payload: MessagePayload = serde_json::from_str(data).map_err(invalid_json)?;
            Ok(SseEvent::Message {
                content: payload.content,
            })
        }
        "tool_call" => {
            let payload: ToolCallPayload = serde_json::from_str(data).map_err(invalid_json)?;
            Ok(SseEvent::ToolCall {
                content: payload.content,
                tool_call: payload.tool_call,
                timestamp: payload.timestamp,
            })
        }
        "done" => {
            let payload: DonePayload = serde_json::from_str(data).map_err(invalid_json)?;
            Ok(SseEvent::Done {
                message: payload.message,
            })
        }
        "error" => {
            let payload: ErrorPayload = serde_json::from_str(data).map_err(invalid_json)?;
            Ok(SseEvent::Error {
                message: payload.message,
                error_type: payload.error_type,
            })
        }
        other => Err(SseParseError::UnknownEventType(other.to_string())),
    }
}

/// Parse one complete frame body (the text between blank-line delimiters).
///
/// Scans the frame line-by-line for the `event:` and `data:` headers. Header
/// order within the frame does not matter; comment lines are ignored. Both
/// headers must be present for the frame to produce an event.
pub fn parse_frame(frame: &str) -> Result<SseEvent, SseParseError> {
    let mut event_type: Option<String> = None;
    let mut data: Option<String> = None;

    for line in frame.lines() {
        match parse_sse_line(line) {
            SseLine::Event(t) => event_type = Some(t),
            SseLine::Data(d) => data = Some(d),
            SseLine::Empty | SseLine::Comment(_) => {}
        }
    }

    match (event_type, data) {
        (Some(event_type), Some(data)) => parse_sse_event(&event_type, &data),
        (Some(event_type), None) => Err(SseParseError::MissingData { event_type }),
        (None, _) => Err(SseParseError::MissingEventType),
    }
}

/// Stateful SSE parser that buffers text and emits complete frames as events.
///
/// Scoped to one exchange: create it when the exchange starts and drop it
/// when the exchange ends. Any residual buffered text that never formed a
/// complete frame is discarded with the parser - a truncated trailing frame
/// on a severed connection is indistinguishable from normal termination.
#[derive(Debug, Default)]
pub struct SseParser {
    /// Decoded text not yet resolved into a complete frame
    buffer: String,
}

impl SseParser {
    /// Create a new SSE parser with an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed decoded text to the parser, returning all events whose frames
    /// completed within this call.
    ///
    /// A malformed frame (unknown event kind, bad JSON, missing header) is
    /// dropped with a diagnostic; it never halts processing of subsequent
    /// frames. Empty input is a no-op.
    pub fn feed(&mut self, text: &str) -> Vec<SseEvent> {
        if text.is_empty() {
            return Vec::new();
        }

        self.buffer.push_str(text);

        let mut events = Vec::new();
        while let Some((delimiter, len)) = find_frame_delimiter(&self.buffer) {
            let frame = self.buffer[..delimiter].to_string();
            self.buffer.drain(..delimiter + len);
            if frame.trim().is_empty() {
                continue;
            }
            match parse_frame(&frame) {
                Ok(event) => events.push(event),
                Err(err) => {
                    tracing::warn!(error = %err, "dropping malformed SSE frame");
                }
            }
        }
        events
    }

    /// Whether undelivered text remains buffered (an incomplete frame).
    pub fn has_residual(&self) -> bool {
        !self.buffer.is_empty()
    }

    /// Discard any buffered text.
    pub fn reset(&mut self) {
        self.buffer.clear();
    }
}

/// Find the earliest frame delimiter: a blank line in either LF or CRLF
/// form. Returns its byte position and length.
fn find_frame_delimiter(buf: &str) -> Option<(usize, usize)> {
    let lf = buf.find("\n\n");
    let crlf = buf.find("\r\n\r\n");
    match (lf, crlf) {
        (Some(a), Some(b)) if b < a => Some((b, 4)),
        (Some(a), _) => Some((a, 2)),
        (None, Some(b)) => Some((b, 4)),
        (None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Tests for parse_sse_line

    #[test]
    fn test_parse_empty_line() {
        assert_eq!(parse_sse_line(""), SseLine::Empty);
    }

    #[test]
    fn test_parse_carriage_return_only() {
        assert_eq!(parse_sse_line("\r"), SseLine::Empty);
    }

    #[test]
    fn test_parse_event_line() {
        assert_eq!(
            parse_sse_line("event: message"),
            SseLine::Event("message".to_string())
        );
    }

    #[test]
    fn test_parse_event_line_extra_whitespace() {
        assert_eq!(
            parse_sse_line("event:   done  "),
            SseLine::Event("done".to_string())
        );
    }

    #[test]
    fn test_parse_data_line() {
        assert_eq!(
            parse_sse_line(r#"data: {"content": "hi"}"#),
            SseLine::Data(r#"{"content": "hi"}"#.to_string())
        );
    }

    #[test]
    fn test_parse_comment_line() {
        assert_eq!(
            parse_sse_line(": keepalive"),
            SseLine::Comment("keepalive".to_string())
        );
    }

    #[test]
    fn test_parse_line_with_crlf() {
        assert_eq!(
            parse_sse_line("event: connected\r"),
            SseLine::Event("connected".to_string())
        );
    }

    // Tests for parse_frame

    #[test]
    fn test_parse_frame_message() {
        let event = parse_frame("event: message\ndata: {\"content\": \"Hello\"}").unwrap();
        assert_eq!(
            event,
            SseEvent::Message {
                content: "Hello".to_string()
            }
        );
    }

    #[test]
    fn test_parse_frame_header_order_reversed() {
        let event = parse_frame("data: {\"content\": \"Hello\"}\nevent: message").unwrap();
        assert_eq!(
            event,
            SseEvent::Message {
                content: "Hello".to_string()
            }
        );
    }

    #[test]
    fn test_parse_frame_connected() {
        let event =
            parse_frame("event: connected\ndata: {\"status\": \"connected\", \"message\": \"ok\"}")
                .unwrap();
        assert_eq!(
            event,
            SseEvent::Connected {
                message: "ok".to_string()
            }
        );
    }

    #[test]
    fn test_parse_frame_tool_call() {
        let frame = concat!(
            "event: tool_call\n",
            r#"data: {"content": "Created contact", "tool_call": {"name": "create_contact", "arguments": {"name": "Amy"}, "result": "ok"}}"#
        );
        let event = parse_frame(frame).unwrap();
        match event {
            SseEvent::ToolCall {
                content, tool_call, ..
            } => {
                assert_eq!(content, "Created contact");
                assert_eq!(tool_call.name, "create_contact");
                assert_eq!(tool_call.result, "ok");
            }
            other => panic!("Expected ToolCall, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_frame_error_with_type() {
        let event = parse_frame(
            "event: error\ndata: {\"status\": \"error\", \"message\": \"boom\", \"error_type\": \"Timeout\"}",
        )
        .unwrap();
        assert_eq!(
            event,
            SseEvent::Error {
                message: "boom".to_string(),
                error_type: Some("Timeout".to_string()),
            }
        );
    }

    #[test]
    fn test_parse_frame_missing_data() {
        let result = parse_frame("event: message");
        assert!(matches!(result, Err(SseParseError::MissingData { .. })));
    }

    #[test]
    fn test_parse_frame_missing_event_type() {
        let result = parse_frame(r#"data: {"content": "orphan"}"#);
        assert!(matches!(result, Err(SseParseError::MissingEventType)));
    }

    #[test]
    fn test_parse_frame_unknown_event_type() {
        let result = parse_frame("event: reasoning\ndata: {}");
        assert!(matches!(result, Err(SseParseError::UnknownEventType(t)) if t == "reasoning"));
    }

    #[test]
    fn test_parse_frame_invalid_json() {
        let result = parse_frame("event: message\ndata: {\"content\": ");
        assert!(matches!(result, Err(SseParseError::InvalidJson { .. })));
    }

    #[test]
    fn test_parse_frame_ignores_comments() {
        let event =
            parse_frame(": keepalive\nevent: message\n: another\ndata: {\"content\": \"hi\"}")
                .unwrap();
        assert_eq!(
            event,
            SseEvent::Message {
                content: "hi".to_string()
            }
        );
    }

    // Tests for SseParser

    #[test]
    fn test_feed_single_frame() {
        let mut parser = SseParser::new();
        let events = parser.feed("event: message\ndata: {\"content\": \"Hello\"}\n\n");
        assert_eq!(
            events,
            vec![SseEvent::Message {
                content: "Hello".to_string()
            }]
        );
        assert!(!parser.has_residual());
    }

    #[test]
    fn test_feed_empty_chunk_is_noop() {
        let mut parser = SseParser::new();
        assert!(parser.feed("").is_empty());
        assert!(!parser.has_residual());
    }

    #[test]
    fn test_feed_incomplete_frame_stays_buffered() {
        let mut parser = SseParser::new();
        assert!(parser.feed("event: message\ndata: {\"content\"").is_empty());
        assert!(parser.has_residual());

        let events = parser.feed(": \"Hello\"}\n\n");
        assert_eq!(
            events,
            vec![SseEvent::Message {
                content: "Hello".to_string()
            }]
        );
        assert!(!parser.has_residual());
    }

    #[test]
    fn test_feed_multiple_frames_in_one_chunk() {
        let mut parser = SseParser::new();
        let chunk = concat!(
            "event: connected\ndata: {\"message\": \"ok\"}\n\n",
            "event: message\ndata: {\"content\": \"a\"}\n\n",
            "event: done\ndata: {\"status\": \"completed\", \"message\": \"bye\"}\n\n",
        );
        let events = parser.feed(chunk);
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].event_type_name(), "connected");
        assert_eq!(events[1].event_type_name(), "message");
        assert_eq!(events[2].event_type_name(), "done");
    }

    #[test]
    fn test_feed_trailing_partial_frame_remains() {
        let mut parser = SseParser::new();
        let events =
            parser.feed("event: message\ndata: {\"content\": \"a\"}\n\nevent: message\ndata:");
        assert_eq!(events.len(), 1);
        assert!(parser.has_residual());
    }

    #[test]
    fn test_feed_drops_malformed_frame_and_continues() {
        let mut parser = SseParser::new();
        let chunk = concat!(
            "event: message\ndata: {\"content\": \"first\"}\n\n",
            "event: message\ndata: {not json}\n\n",
            "event: message\ndata: {\"content\": \"second\"}\n\n",
        );
        let events = parser.feed(chunk);
        assert_eq!(
            events,
            vec![
                SseEvent::Message {
                    content: "first".to_string()
                },
                SseEvent::Message {
                    content: "second".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_feed_drops_unknown_kind_and_continues() {
        let mut parser = SseParser::new();
        let chunk = concat!(
            "event: usage\ndata: {\"tokens\": 42}\n\n",
            "event: message\ndata: {\"content\": \"kept\"}\n\n",
        );
        let events = parser.feed(chunk);
        assert_eq!(
            events,
            vec![SseEvent::Message {
                content: "kept".to_string()
            }]
        );
    }

    #[test]
    fn test_feed_blank_frames_skipped() {
        let mut parser = SseParser::new();
        let events = parser.feed("\n\n\n\nevent: message\ndata: {\"content\": \"x\"}\n\n");
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_chunk_boundary_invariance() {
        let frame = "event: message\ndata: {\"content\": \"Hello, world\"}\n\n";
        let whole = {
            let mut parser = SseParser::new();
            parser.feed(frame)
        };
        assert_eq!(whole.len(), 1);

        // Splitting the frame at every position must yield the same event.
        for split in 1..frame.len() {
            let mut parser = SseParser::new();
            let mut events = parser.feed(&frame[..split]);
            events.extend(parser.feed(&frame[split..]));
            assert_eq!(events, whole, "split at byte {}", split);
        }
    }

    #[test]
    fn test_chunk_boundary_invariance_many_pieces() {
        let frame = "event: message\ndata: {\"content\": \"Hello\"}\n\n";
        let mut parser = SseParser::new();
        let mut events = Vec::new();
        for i in 0..frame.len() {
            events.extend(parser.feed(&frame[i..i + 1]));
        }
        assert_eq!(
            events,
            vec![SseEvent::Message {
                content: "Hello".to_string()
            }]
        );
    }

    #[test]
    fn test_feed_crlf_delimited_stream() {
        let mut parser = SseParser::new();
        let chunk = concat!(
            "event: message\r\ndata: {\"content\": \"a\"}\r\n\r\n",
            "event: done\r\ndata: {\"status\": \"completed\", \"message\": \"\"}\r\n\r\n",
        );
        let events = parser.feed(chunk);
        assert_eq!(events.len(), 2);
        assert_eq!(
            events[0],
            SseEvent::Message {
                content: "a".to_string()
            }
        );
        assert_eq!(events[1].event_type_name(), "done");
        assert!(!parser.has_residual());
    }

    #[test]
    fn test_feed_crlf_frame_split_at_every_byte() {
        let frame = "event: message\r\ndata: {\"content\": \"Hello\"}\r\n\r\n";
        for split in 1..frame.len() {
            let mut parser = SseParser::new();
            let mut events = parser.feed(&frame[..split]);
            events.extend(parser.feed(&frame[split..]));
            assert_eq!(
                events,
                vec![SseEvent::Message {
                    content: "Hello".to_string()
                }],
                "split at byte {}",
                split
            );
        }
    }

    #[test]
    fn test_feed_mixed_line_endings() {
        // LF-delimited frame followed by a CRLF-delimited one.
        let mut parser = SseParser::new();
        let chunk = concat!(
            "event: message\ndata: {\"content\": \"lf\"}\n\n",
            "event: message\r\ndata: {\"content\": \"crlf\"}\r\n\r\n",
        );
        let events = parser.feed(chunk);
        assert_eq!(
            events,
            vec![
                SseEvent::Message {
                    content: "lf".to_string()
                },
                SseEvent::Message {
                    content: "crlf".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_reset_discards_buffer() {
        let mut parser = SseParser::new();
        parser.feed("event: message\ndata: {\"co");
        assert!(parser.has_residual());
        parser.reset();
        assert!(!parser.has_residual());
    }
}
