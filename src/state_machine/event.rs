//! Events that can occur in a session
//!
//! Identifiers and timestamps are minted by the runtime before an event is
//! built, so the transition function stays deterministic.

use super::state::RequestTicket;
use crate::service::{AnswerResponse, ServiceError};
use crate::transcript::MessageId;
use chrono::{DateTime, Utc};

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    // User events
    UserSubmit {
        text: String,
        message_id: MessageId,
        request_id: String,
        timestamp: DateTime<Utc>,
    },
    DraftChanged {
        text: String,
    },
    ToggleMode {
        greeting_id: MessageId,
        timestamp: DateTime<Utc>,
    },
    ToggleExpand {
        message_id: MessageId,
    },

    // Answering service events
    ServiceAnswered {
        ticket: RequestTicket,
        answer: AnswerResponse,
        message_id: MessageId,
        timestamp: DateTime<Utc>,
    },
    ServiceFailed {
        ticket: RequestTicket,
        error: ServiceError,
    },
}

impl Event {
    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            Event::UserSubmit { .. } => "user_submit",
            Event::DraftChanged { .. } => "draft_changed",
            Event::ToggleMode { .. } => "toggle_mode",
            Event::ToggleExpand { .. } => "toggle_expand",
            Event::ServiceAnswered { .. } => "service_answered",
            Event::ServiceFailed { .. } => "service_failed",
        }
    }
}
