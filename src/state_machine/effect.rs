//! Effects produced by state transitions

use super::state::RequestTicket;
use crate::service::{AnswerRequest, ServiceError};
use crate::transcript::{Message, MessageId};

/// Effects to be executed after state transition, in order
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Append a message to the transcript
    AppendMessage { message: Message },

    /// Replace the transcript with a fresh greeting and forget disclosure state
    ResetTranscript { greeting: Message },

    /// Empty the input draft
    ClearDraft,

    /// Replace the input draft
    SetDraft { text: String },

    /// Flip the expand flag of one message
    ToggleExpand { message_id: MessageId },

    /// Notify observers of the new pending/mode state
    PublishState,

    /// Issue the request to the answering service (spawns as background task)
    RequestAnswer {
        ticket: RequestTicket,
        request: AnswerRequest,
    },

    /// Log a failed request and keep it for display
    RecordFailure {
        ticket: RequestTicket,
        error: ServiceError,
    },

    /// A resolution arrived for a conversation that was reset meanwhile
    DropStaleAnswer { ticket: RequestTicket },
}

impl Effect {
    pub fn append(message: Message) -> Self {
        Effect::AppendMessage { message }
    }

    pub fn request_answer(ticket: RequestTicket, query: impl Into<String>, rag: bool) -> Self {
        Effect::RequestAnswer {
            ticket,
            request: AnswerRequest::new(query, rag),
        }
    }
}
