//! Connection lifecycle for one streaming exchange.
//!
//! One exchange moves `disconnected -> connecting -> connected` and ends in
//! either `disconnected` (after `done`) or `error`. `connected` is reachable
//! only from `connecting`, and nothing may be dispatched once a terminal
//! state is reached.

use serde::{Deserialize, Serialize};

/// State of the streaming connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// No exchange in progress (initial and post-`done` state)
    #[default]
    Disconnected,
    /// Request issued, no event received yet
    Connecting,
    /// At least one event received on the current exchange
    Connected,
    /// The current exchange failed (server error event or transport failure)
    Error,
}

impl ConnectionState {
    /// Wire-level name of the state.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Error => "error",
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tracks the lifecycle of one streaming exchange.
///
/// Transitions that are not legal for the current state are no-ops, so the
/// machine can never observe an illegal state sequence regardless of the
/// event order the wire produces.
#[derive(Debug, Default)]
pub struct StateMachine {
    state: ConnectionState,
}

impl StateMachine {
    /// Create a machine in the `disconnected` state
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Start of exchange: `disconnected -> connecting`. An errored exchange
    /// does not block the next one, so `error -> connecting` is legal too.
    pub fn begin(&mut self) -> ConnectionState {
        if matches!(
            self.state,
            ConnectionState::Disconnected | ConnectionState::Error
        ) {
            self.state = ConnectionState::Connecting;
        }
        self.state
    }

    /// First event dispatched: `connecting -> connected`. Idempotent, and a
    /// no-op from any state other than `connecting` - `connected` is never
    /// entered directly from `disconnected`.
    pub fn event_received(&mut self) -> ConnectionState {
        if self.state == ConnectionState::Connecting {
            self.state = ConnectionState::Connected;
        }
        self.state
    }

    /// `done` processed: the exchange ends successfully
    pub fn complete(&mut self) -> ConnectionState {
        self.state = ConnectionState::Disconnected;
        self.state
    }

    /// `error` processed or transport failure: the exchange ends in error
    pub fn fail(&mut self) -> ConnectionState {
        self.state = ConnectionState::Error;
        self.state
    }

    /// Whether the exchange has ended (no further dispatch permitted).
    /// Meaningful once `begin` has been called; the machine only re-enters
    /// `disconnected` through `complete`.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.state,
            ConnectionState::Disconnected | ConnectionState::Error
        )
    }
}
