//! Chat session facade.
//!
//! Owns one streaming exchange at a time: opens the transport, drives the
//! read loop on a background task, accumulates `message` deltas, emits
//! standalone tool-call entries, and flushes the accumulated reply into a
//! finalized [`ChatEntry`] when the stream completes. Observers receive
//! state changes and entries through the [`ChatObserver`] trait.

use crate::client::{ChatClient, ChatError};
use crate::config::StreamConfig;
use crate::connection::{ConnectionState, StateMachine};
use crate::events::SseEvent;
use crate::models::{ChatEntry, ChatRequest};
use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;

/// Observer of one chat session.
///
/// All methods default to no-ops so callers implement only what they render.
/// Callbacks are invoked from the exchange task, strictly in wire order.
pub trait ChatObserver: Send + Sync {
    /// Connection state changed
    fn on_state_change(&self, _state: ConnectionState) {}

    /// Server accepted the stream
    fn on_connected(&self, _message: &str) {}

    /// The accumulated reply grew; `content` is the full text so far.
    /// Called with an empty string when streaming state resets.
    fn on_streaming_content(&self, _content: &str) {}

    /// A finalized entry was produced (flushed reply, tool call, or a
    /// synthetic error notice)
    fn on_entry(&self, _entry: &ChatEntry) {}

    /// A tool call was reported. Backing data (contacts, records) may have
    /// changed; collaborators that cache it may want to refresh. The core
    /// itself performs no refresh.
    fn on_tool_call(&self, _entry: &ChatEntry) {}
}

/// State shared between the session handle and the exchange task
struct SessionShared {
    machine: Mutex<StateMachine>,
    processing: AtomicBool,
    observer: Arc<dyn ChatObserver>,
}

impl SessionShared {
    fn machine(&self) -> MutexGuard<'_, StateMachine> {
        self.machine.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn state(&self) -> ConnectionState {
        self.machine().state()
    }

    /// Apply a transition and notify the observer if the state changed.
    /// The lock is released before the callback runs.
    fn transition(&self, apply: impl FnOnce(&mut StateMachine) -> ConnectionState) {
        let (before, after) = {
            let mut machine = self.machine();
            let before = machine.state();
            let after = apply(&mut machine);
            (before, after)
        };
        if before != after {
            self.observer.on_state_change(after);
        }
    }

    fn is_terminal(&self) -> bool {
        self.machine().is_terminal()
    }

    fn finish(&self, apply: impl FnOnce(&mut StateMachine) -> ConnectionState) {
        self.transition(apply);
        self.processing.store(false, Ordering::SeqCst);
    }
}

/// A chat session with the assistant.
///
/// At most one exchange may be in flight per session; `send_message` while
/// one is processing is refused, not queued. Dropping the session aborts any
/// in-flight exchange.
pub struct ChatSession {
    client: ChatClient,
    config: StreamConfig,
    shared: Arc<SessionShared>,
    task: Option<JoinHandle<()>>,
}

impl ChatSession {
    /// Create a session from a configuration.
    pub fn new(config: StreamConfig, observer: Arc<dyn ChatObserver>) -> Self {
        let client = ChatClient::with_url(&config.base_url);
        Self::with_client_and_config(client, config, observer)
    }

    /// Create a session around an existing client (e.g. one carrying a
    /// bearer token).
    pub fn with_client(client: ChatClient, observer: Arc<dyn ChatObserver>) -> Self {
        Self::with_client_and_config(client, StreamConfig::default(), observer)
    }

    fn with_client_and_config(
        client: ChatClient,
        config: StreamConfig,
        observer: Arc<dyn ChatObserver>,
    ) -> Self {
        Self {
            client,
            config,
            shared: Arc::new(SessionShared {
                machine: Mutex::new(StateMachine::new()),
                processing: AtomicBool::new(false),
                observer,
            }),
            task: None,
        }
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    /// Whether an exchange is in flight
    pub fn is_processing(&self) -> bool {
        self.shared.processing.load(Ordering::SeqCst)
    }

    /// Session configuration
    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Send a chat turn, streaming the response on a background task.
    ///
    /// Refused with a warning if an exchange is already in flight: at most
    /// one exchange may be active per session, and a second send would
    /// otherwise interleave into the first exchange's buffer. Must be called
    /// from within a tokio runtime.
    pub fn send_message(&mut self, request: ChatRequest) {
        if self.shared.processing.swap(true, Ordering::SeqCst) {
            tracing::warn!("already processing a message, ignoring new request");
            return;
        }

        // A finished exchange leaves its handle behind; reap it.
        self.task = None;

        self.shared.transition(StateMachine::begin);

        let client = self.client.clone();
        let shared = Arc::clone(&self.shared);
        self.task = Some(tokio::spawn(async move {
            run_exchange(client, request, shared).await;
        }));
    }

    /// Wait for the in-flight exchange (if any) to finish.
    ///
    /// The UI layer normally just observes; this is a completion point for
    /// callers that need one.
    pub async fn join(&mut self) {
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }

    /// Stop any in-flight exchange and release its resources.
    ///
    /// Buffered bytes that never formed a complete frame are discarded and
    /// no `done` is synthesized, so content streamed so far produces no
    /// finalized entry. Safe to call when idle.
    pub fn disconnect(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.shared.transition(StateMachine::complete);
        self.shared.processing.store(false, Ordering::SeqCst);
        tracing::debug!("chat session disconnected");
    }
}

impl Drop for ChatSession {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Drive one exchange to a terminal state.
async fn run_exchange(client: ChatClient, request: ChatRequest, shared: Arc<SessionShared>) {
    let mut stream = match client.stream(&request).await {
        Ok(stream) => stream,
        Err(err) => {
            // Request-level failure takes the same dispatch path as a
            // server-sent error event.
            tracing::error!(error = %err, "chat request failed");
            let mut accumulated = String::new();
            dispatch(&shared, &mut accumulated, synthetic_error(&err));
            return;
        }
    };

    // The exchange exclusively owns the accumulated reply; it lives and
    // dies with this task.
    let mut accumulated = String::new();

    while let Some(item) = stream.next().await {
        let event = match item {
            Ok(event) => event,
            Err(err) => {
                tracing::error!(error = %err, "transport failure mid-stream");
                synthetic_error(&err)
            }
        };
        if dispatch(&shared, &mut accumulated, event) {
            return;
        }
    }

    // Stream ended without a terminal event. Whatever never formed a
    // complete frame is gone; the accumulated text is dropped unflushed.
    tracing::debug!("stream ended without done/error");
    shared.finish(StateMachine::complete);
}

/// Synthesize an `error` event from a transport failure so it flows through
/// the same dispatch arm as a server-sent one.
fn synthetic_error(err: &ChatError) -> SseEvent {
    let error_type = match err {
        ChatError::Http(_) => "TransportError",
        ChatError::Server { .. } => "ServerError",
    };
    SseEvent::Error {
        message: err.to_string(),
        error_type: Some(error_type.to_string()),
    }
}

/// Dispatch one event. Returns `true` once the exchange has reached a
/// terminal state; callers must stop the read loop then, even if more bytes
/// are buffered.
fn dispatch(shared: &SessionShared, accumulated: &mut String, event: SseEvent) -> bool {
    if shared.is_terminal() {
        // Nothing is delivered once the exchange has ended, and the caller
        // returns without reaching `finish`; the in-flight flag must not
        // stay set on this path.
        shared.processing.store(false, Ordering::SeqCst);
        return true;
    }

    // Any first event moves connecting -> connected.
    shared.transition(StateMachine::event_received);

    match event {
        SseEvent::Connected { message } => {
            tracing::debug!(message = %message, "stream accepted");
            shared.observer.on_connected(&message);
            false
        }
        SseEvent::Message { content } => {
            accumulated.push_str(&content);
            shared.observer.on_streaming_content(accumulated);
            false
        }
        SseEvent::ToolCall {
            content,
            tool_call,
            timestamp,
        } => {
            let mut entry = ChatEntry::tool_call(content, tool_call);
            if let Some(ts) = timestamp.as_deref().and_then(parse_timestamp) {
                entry.timestamp = ts;
            }
            shared.observer.on_entry(&entry);
            shared.observer.on_tool_call(&entry);
            false
        }
        SseEvent::Done { message } => {
            tracing::debug!(message = %message, "exchange completed");
            if !accumulated.trim().is_empty() {
                let entry = ChatEntry::message(accumulated.clone());
                shared.observer.on_entry(&entry);
            }
            accumulated.clear();
            shared.observer.on_streaming_content("");
            shared.finish(StateMachine::complete);
            true
        }
        SseEvent::Error {
            message,
            error_type,
        } => {
            tracing::error!(message = %message, error_type = ?error_type, "exchange failed");
            accumulated.clear();
            shared.observer.on_streaming_content("");
            // Emit the notice before `finish` clears the in-flight flag, so
            // a caller reacting to `is_processing()` going false can never
            // see this exchange's entry interleave into its next one.
            let entry = ChatEntry::message(format!("Error: {}", message));
            shared.observer.on_entry(&entry);
            shared.finish(StateMachine::fail);
            true
        }
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}
