//! Conversation state types

use serde::{Deserialize, Serialize};

/// Greeting shown at session start and after every mode toggle
pub const DEFAULT_GREETING: &str = "Hi there! \u{1F44B} Welcome to RAGTrip, your intelligent \
travel assistant. I\u{2019}ll help you plan a personalized route, suggest interesting places \
along the way, and answer your questions with reliable, real-world info. Ready to start your \
journey?";

/// Identifies one outstanding request to the answering service
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestTicket {
    pub request_id: String,
    /// Transcript generation the request was issued in
    pub generation: u64,
}

impl RequestTicket {
    pub fn new(request_id: impl Into<String>, generation: u64) -> Self {
        Self {
            request_id: request_id.into(),
            generation,
        }
    }
}

/// Request lifecycle phase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConvState {
    /// Ready for user input, nothing in flight
    #[default]
    Idle,

    /// One request is in flight; further submissions are refused
    AwaitingAnswer { ticket: RequestTicket },
}

impl ConvState {
    /// Whether a request is pending (the "typing" indicator)
    pub fn is_pending(&self) -> bool {
        matches!(self, ConvState::AwaitingAnswer { .. })
    }

    #[cfg(test)]
    pub fn ticket(&self) -> Option<&RequestTicket> {
        match self {
            ConvState::AwaitingAnswer { ticket } => Some(ticket),
            ConvState::Idle => None,
        }
    }
}

/// Everything the transition function decides on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub phase: ConvState,
    pub retrieval_mode: bool,
    /// Incremented on every transcript reset
    pub generation: u64,
}

impl SessionState {
    pub fn new(retrieval_mode: bool) -> Self {
        Self {
            phase: ConvState::Idle,
            retrieval_mode,
            generation: 0,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.phase.is_pending()
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Context for a session (immutable configuration)
#[derive(Debug, Clone)]
pub struct ConvContext {
    pub session_id: String,
    pub greeting: String,
}

impl ConvContext {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            greeting: DEFAULT_GREETING.to_string(),
        }
    }

    #[cfg(test)]
    pub fn with_greeting(mut self, greeting: impl Into<String>) -> Self {
        self.greeting = greeting.into();
        self
    }
}
