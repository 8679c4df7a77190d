//! Pure state transition function

use super::state::RequestTicket;
use super::{ConvContext, ConvState, Effect, Event, SessionState};
use crate::transcript::Message;
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: SessionState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: SessionState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Message is empty")]
    EmptySubmission,
    #[error("A request is already pending, wait for the answer before sending another message")]
    RequestPending,
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

impl TransitionError {
    /// Rejected submissions leave the session untouched and are not reported as failures
    pub fn is_submission_rejected(&self) -> bool {
        matches!(self, Self::EmptySubmission | Self::RequestPending)
    }
}

/// Pure transition function
///
/// Given the same inputs this always produces the same outputs, with no I/O.
pub fn transition(
    state: &SessionState,
    context: &ConvContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match (&state.phase, event) {
        // ============================================================
        // Submission
        // ============================================================
        (_, Event::UserSubmit { text, .. }) if text.trim().is_empty() => {
            Err(TransitionError::EmptySubmission)
        }

        (ConvState::AwaitingAnswer { .. }, Event::UserSubmit { .. }) => {
            Err(TransitionError::RequestPending)
        }

        // Idle + UserSubmit -> AwaitingAnswer
        (
            ConvState::Idle,
            Event::UserSubmit {
                text,
                message_id,
                request_id,
                timestamp,
            },
        ) => {
            let ticket = RequestTicket::new(request_id, state.generation);
            let new_state = SessionState {
                phase: ConvState::AwaitingAnswer {
                    ticket: ticket.clone(),
                },
                ..state.clone()
            };
            Ok(TransitionResult::new(new_state)
                .with_effect(Effect::append(Message::user(message_id, text.clone(), timestamp)))
                .with_effect(Effect::ClearDraft)
                .with_effect(Effect::PublishState)
                .with_effect(Effect::request_answer(ticket, text, state.retrieval_mode)))
        }

        // ============================================================
        // Resolution
        // ============================================================

        // Answer for the live conversation -> Idle with agent message
        (
            ConvState::AwaitingAnswer { ticket: pending },
            Event::ServiceAnswered {
                ticket,
                answer,
                message_id,
                timestamp,
            },
        ) if *pending == ticket && ticket.generation == state.generation => {
            let message = Message::agent(message_id, answer.response, answer.map_html, timestamp);
            Ok(TransitionResult::new(idle(state))
                .with_effect(Effect::append(message))
                .with_effect(Effect::PublishState))
        }

        // Failure for the live conversation -> Idle, nothing appended
        (ConvState::AwaitingAnswer { ticket: pending }, Event::ServiceFailed { ticket, error })
            if *pending == ticket && ticket.generation == state.generation =>
        {
            Ok(TransitionResult::new(idle(state))
                .with_effect(Effect::RecordFailure { ticket, error })
                .with_effect(Effect::PublishState))
        }

        // Resolution for a conversation reset since the request was issued -> drop it
        (ConvState::AwaitingAnswer { ticket: pending }, Event::ServiceAnswered { ticket, .. })
        | (ConvState::AwaitingAnswer { ticket: pending }, Event::ServiceFailed { ticket, .. })
            if *pending == ticket =>
        {
            Ok(TransitionResult::new(idle(state))
                .with_effect(Effect::DropStaleAnswer { ticket })
                .with_effect(Effect::PublishState))
        }

        // ============================================================
        // Mode toggle: flip the flag and start a new transcript generation
        // ============================================================
        (_, Event::ToggleMode { greeting_id, timestamp }) => {
            let new_state = SessionState {
                phase: state.phase.clone(),
                retrieval_mode: !state.retrieval_mode,
                generation: state.generation + 1,
            };
            let greeting = Message::agent(greeting_id, context.greeting.clone(), None, timestamp);
            Ok(TransitionResult::new(new_state)
                .with_effect(Effect::ResetTranscript { greeting })
                .with_effect(Effect::PublishState))
        }

        // ============================================================
        // Presentation-only updates
        // ============================================================
        (_, Event::DraftChanged { text }) => {
            Ok(TransitionResult::new(state.clone()).with_effect(Effect::SetDraft { text }))
        }

        (_, Event::ToggleExpand { message_id }) => Ok(TransitionResult::new(state.clone())
            .with_effect(Effect::ToggleExpand { message_id })),

        // ============================================================
        // Invalid Transitions
        // ============================================================
        (phase, event) => Err(TransitionError::InvalidTransition(format!(
            "No transition from {phase:?} with event {}",
            event.name()
        ))),
    }
}

fn idle(state: &SessionState) -> SessionState {
    SessionState {
        phase: ConvState::Idle,
        ..state.clone()
    }
}
