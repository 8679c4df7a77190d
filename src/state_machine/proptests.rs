//! Property-based tests for the state machine
//!
//! These tests verify key invariants hold across all possible inputs.

use super::state::*;
use super::transition::*;
use super::*;
use crate::service::{AnswerResponse, ServiceError, ServiceErrorKind};
use crate::transcript::{Message, MessageId, Sender, Transcript};
use chrono::Utc;
use proptest::prelude::*;

// ============================================================================
// Test Helpers
// ============================================================================

fn test_context() -> ConvContext {
    ConvContext::new("test-session").with_greeting("Welcome")
}

fn greeting(id: &str) -> Message {
    Message::agent(MessageId::new(id), "Welcome", None, Utc::now())
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_ticket() -> impl Strategy<Value = RequestTicket> {
    ("[a-z]{8}", 0u64..4).prop_map(|(id, generation)| RequestTicket::new(id, generation))
}

fn arb_phase() -> impl Strategy<Value = ConvState> {
    prop_oneof![
        Just(ConvState::Idle),
        arb_ticket().prop_map(|ticket| ConvState::AwaitingAnswer { ticket }),
    ]
}

fn arb_state() -> impl Strategy<Value = SessionState> {
    (arb_phase(), any::<bool>(), 0u64..4).prop_map(|(phase, retrieval_mode, generation)| {
        SessionState {
            phase,
            retrieval_mode,
            generation,
        }
    })
}

fn arb_pending_state() -> impl Strategy<Value = SessionState> {
    (arb_ticket(), any::<bool>(), 0u64..4).prop_map(|(ticket, retrieval_mode, generation)| {
        SessionState {
            phase: ConvState::AwaitingAnswer { ticket },
            retrieval_mode,
            generation,
        }
    })
}

fn arb_text() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ]{0,10}[a-zA-Z0-9][a-zA-Z0-9 ]{0,10}"
}

fn arb_blank() -> impl Strategy<Value = String> {
    "[ \t\n]{0,6}"
}

fn arb_error_kind() -> impl Strategy<Value = ServiceErrorKind> {
    prop_oneof![
        Just(ServiceErrorKind::Network),
        Just(ServiceErrorKind::Status),
        Just(ServiceErrorKind::MalformedResponse),
    ]
}

fn arb_answer() -> impl Strategy<Value = AnswerResponse> {
    ("[a-zA-Z ]{0,40}", proptest::option::of("<div>[a-z]{0,10}</div>")).prop_map(
        |(response, map_html)| AnswerResponse { response, map_html },
    )
}

fn submit_event(text: String) -> Event {
    Event::UserSubmit {
        text,
        message_id: MessageId::generate(),
        request_id: uuid::Uuid::new_v4().to_string(),
        timestamp: Utc::now(),
    }
}

fn toggle_event() -> Event {
    Event::ToggleMode {
        greeting_id: MessageId::generate(),
        timestamp: Utc::now(),
    }
}

/// Operations a user or the service can perform against a session
#[derive(Debug, Clone)]
enum Op {
    Submit(String),
    Answer(AnswerResponse),
    Fail(ServiceErrorKind),
    ToggleMode,
    Draft(String),
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => prop_oneof![arb_text(), arb_blank()].prop_map(Op::Submit),
        2 => arb_answer().prop_map(Op::Answer),
        1 => arb_error_kind().prop_map(Op::Fail),
        1 => Just(Op::ToggleMode),
        1 => "[a-z ]{0,8}".prop_map(Op::Draft),
    ]
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    /// A non-blank submission from Idle appends exactly one user message
    /// carrying the text, then clears the draft, then issues one request.
    #[test]
    fn prop_submit_from_idle(text in arb_text(), rag in any::<bool>(), generation in 0u64..4) {
        let state = SessionState { phase: ConvState::Idle, retrieval_mode: rag, generation };
        let result = transition(&state, &test_context(), submit_event(text.clone())).unwrap();

        prop_assert!(result.new_state.is_pending());
        prop_assert_eq!(result.new_state.retrieval_mode, rag);
        prop_assert_eq!(result.new_state.generation, generation);

        let appends: Vec<_> = result.effects.iter().filter_map(|e| match e {
            Effect::AppendMessage { message } => Some(message),
            _ => None,
        }).collect();
        prop_assert_eq!(appends.len(), 1);
        prop_assert_eq!(appends[0].sender(), Sender::User);
        prop_assert_eq!(appends[0].content(), text.as_str());

        let requests: Vec<_> = result.effects.iter().filter_map(|e| match e {
            Effect::RequestAnswer { ticket, request } => Some((ticket, request)),
            _ => None,
        }).collect();
        prop_assert_eq!(requests.len(), 1);
        prop_assert_eq!(requests[0].0.generation, generation);
        prop_assert_eq!(&requests[0].1.query, &text);
        prop_assert_eq!(requests[0].1.rag, rag);

        let position = |pred: fn(&Effect) -> bool| result.effects.iter().position(pred);
        let append_at = position(|e| matches!(e, Effect::AppendMessage { .. }));
        let clear_at = position(|e| matches!(e, Effect::ClearDraft));
        let request_at = position(|e| matches!(e, Effect::RequestAnswer { .. }));
        prop_assert!(append_at < clear_at && clear_at < request_at);
    }

    /// Whitespace-only text is always refused, whatever the phase
    #[test]
    fn prop_blank_submission_rejected(state in arb_state(), text in arb_blank()) {
        let result = transition(&state, &test_context(), submit_event(text));
        prop_assert_eq!(result.unwrap_err(), TransitionError::EmptySubmission);
    }

    /// No submission is accepted while a request is pending
    #[test]
    fn prop_no_overlapping_requests(state in arb_pending_state(), text in arb_text()) {
        let result = transition(&state, &test_context(), submit_event(text));
        prop_assert_eq!(result.unwrap_err(), TransitionError::RequestPending);
    }

    /// Toggling the mode always resets to one greeting and never touches the phase
    #[test]
    fn prop_toggle_mode_resets(state in arb_state()) {
        let result = transition(&state, &test_context(), toggle_event()).unwrap();

        prop_assert_eq!(result.new_state.retrieval_mode, !state.retrieval_mode);
        prop_assert_eq!(result.new_state.generation, state.generation + 1);
        prop_assert_eq!(&result.new_state.phase, &state.phase);

        let resets = result.effects.iter()
            .filter(|e| matches!(e, Effect::ResetTranscript { .. }))
            .count();
        prop_assert_eq!(resets, 1);
    }

    /// Resolving the pending request always returns to Idle with exactly one outcome
    #[test]
    fn prop_resolution_has_single_outcome(
        state in arb_pending_state(),
        answer in arb_answer(),
        kind in arb_error_kind(),
        succeed in any::<bool>(),
    ) {
        let ticket = state.phase.ticket().cloned().unwrap();
        let event = if succeed {
            Event::ServiceAnswered {
                ticket: ticket.clone(),
                answer,
                message_id: MessageId::generate(),
                timestamp: Utc::now(),
            }
        } else {
            Event::ServiceFailed { ticket: ticket.clone(), error: ServiceError::new(kind, "failed") }
        };

        let result = transition(&state, &test_context(), event).unwrap();
        prop_assert!(!result.new_state.is_pending());

        let outcomes: Vec<_> = result.effects.iter().filter(|e| matches!(
            e,
            Effect::AppendMessage { .. } | Effect::RecordFailure { .. } | Effect::DropStaleAnswer { .. }
        )).collect();
        prop_assert_eq!(outcomes.len(), 1);

        let stale = ticket.generation != state.generation;
        match outcomes[0] {
            Effect::AppendMessage { message } => {
                prop_assert!(succeed && !stale);
                prop_assert_eq!(message.sender(), Sender::Agent);
            }
            Effect::RecordFailure { .. } => prop_assert!(!succeed && !stale),
            Effect::DropStaleAnswer { .. } => prop_assert!(stale),
            _ => unreachable!(),
        }
    }

    /// Drive whole sessions: every accepted submission is resolved exactly
    /// once, the transcript never loses its greeting, and agent messages
    /// only ever answer the user message directly before them.
    #[test]
    fn prop_session_invariants(ops in proptest::collection::vec(arb_op(), 1..40)) {
        let context = test_context();
        let mut state = SessionState::new(true);
        let mut transcript = Transcript::with_greeting(greeting("g0"));
        let mut submissions = 0usize;
        let mut resolutions = 0usize;

        for op in ops {
            let was_pending = state.is_pending();
            let event = match op {
                Op::Submit(text) => submit_event(text),
                Op::ToggleMode => toggle_event(),
                Op::Draft(text) => Event::DraftChanged { text },
                Op::Answer(answer) => match state.phase.ticket() {
                    Some(ticket) => Event::ServiceAnswered {
                        ticket: ticket.clone(),
                        answer,
                        message_id: MessageId::generate(),
                        timestamp: Utc::now(),
                    },
                    None => continue,
                },
                Op::Fail(kind) => match state.phase.ticket() {
                    Some(ticket) => Event::ServiceFailed {
                        ticket: ticket.clone(),
                        error: ServiceError::new(kind, "failed"),
                    },
                    None => continue,
                },
            };

            let before = transcript.len();
            let Ok(result) = transition(&state, &context, event) else {
                prop_assert_eq!(transcript.len(), before);
                continue;
            };

            for effect in &result.effects {
                match effect {
                    Effect::AppendMessage { message } => transcript.append(message.clone()),
                    Effect::ResetTranscript { greeting } => transcript.reset(greeting.clone()),
                    _ => {}
                }
            }

            match (was_pending, result.new_state.is_pending()) {
                (false, true) => submissions += 1,
                (true, false) => resolutions += 1,
                _ => {}
            }
            state = result.new_state;

            let messages = transcript.messages();
            prop_assert!(!messages.is_empty());
            prop_assert_eq!(messages[0].sender(), Sender::Agent);
            for pair in messages.windows(2) {
                if pair[1].sender() == Sender::Agent {
                    prop_assert_eq!(pair[0].sender(), Sender::User);
                }
            }
        }

        let still_pending = usize::from(state.is_pending());
        prop_assert_eq!(submissions, resolutions + still_pending);
    }
}
