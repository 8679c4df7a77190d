//! Conversation runtime executor

use super::{Command, FailureRecord, MessageView, SessionError, SessionEvent, SessionSnapshot};
use crate::disclosure::{DisclosurePolicy, DisclosureState};
use crate::service::AnsweringService;
use crate::state_machine::{transition, ConvContext, Effect, Event, SessionState, TransitionError};
use crate::transcript::{Message, MessageId, Transcript};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};

/// Owns the session state and serialises every mutation onto one task
pub struct ConversationRuntime<A>
where
    A: AnsweringService + 'static,
{
    context: ConvContext,
    state: SessionState,
    transcript: Transcript,
    disclosure: DisclosureState,
    policy: DisclosurePolicy,
    draft: String,
    last_failure: Option<FailureRecord>,
    service: Arc<A>,
    command_rx: mpsc::Receiver<Command>,
    /// Resolutions from background service calls
    event_rx: mpsc::Receiver<Event>,
    event_tx: mpsc::Sender<Event>,
    broadcast_tx: broadcast::Sender<SessionEvent>,
}

impl<A> ConversationRuntime<A>
where
    A: AnsweringService + 'static,
{
    pub(crate) fn new(
        context: ConvContext,
        retrieval_mode: bool,
        policy: DisclosurePolicy,
        service: A,
        command_rx: mpsc::Receiver<Command>,
        broadcast_tx: broadcast::Sender<SessionEvent>,
    ) -> Self {
        let greeting = Message::agent(
            MessageId::generate(),
            context.greeting.clone(),
            None,
            Utc::now(),
        );
        let (event_tx, event_rx) = mpsc::channel(32);

        Self {
            context,
            state: SessionState::new(retrieval_mode),
            transcript: Transcript::with_greeting(greeting),
            disclosure: DisclosureState::new(),
            policy,
            draft: String::new(),
            last_failure: None,
            service: Arc::new(service),
            command_rx,
            event_rx,
            event_tx,
            broadcast_tx,
        }
    }

    pub async fn run(mut self) {
        tracing::info!(
            session_id = %self.context.session_id,
            retrieval_mode = self.state.retrieval_mode,
            endpoint = %self.service.endpoint(),
            "Starting session runtime"
        );

        loop {
            tokio::select! {
                command = self.command_rx.recv() => match command {
                    Some(command) => self.handle_command(command),
                    // Every handle is gone: the session is over
                    None => break,
                },
                Some(event) = self.event_rx.recv() => {
                    if let Err(e) = self.process_event(event) {
                        tracing::error!(error = %e, "Error handling service resolution");
                    }
                }
            }
        }

        tracing::info!(session_id = %self.context.session_id, "Session runtime stopped");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Submit { text, reply } => {
                let event = Event::UserSubmit {
                    text,
                    message_id: MessageId::generate(),
                    request_id: uuid::Uuid::new_v4().to_string(),
                    timestamp: Utc::now(),
                };
                let _ = reply.send(self.process_event(event).map_err(SessionError::from));
            }
            Command::SetDraft { text, reply } => {
                let result = self.process_event(Event::DraftChanged { text });
                let _ = reply.send(result.map_err(SessionError::from));
            }
            Command::ToggleMode { reply } => {
                let event = Event::ToggleMode {
                    greeting_id: MessageId::generate(),
                    timestamp: Utc::now(),
                };
                let result = self
                    .process_event(event)
                    .map(|()| self.state.retrieval_mode)
                    .map_err(SessionError::from);
                let _ = reply.send(result);
            }
            Command::ToggleExpand { message_id, reply } => {
                if !self.transcript.contains(&message_id) {
                    let _ = reply.send(Err(SessionError::UnknownMessage(message_id)));
                    return;
                }
                let result = self
                    .process_event(Event::ToggleExpand {
                        message_id: message_id.clone(),
                    })
                    .map(|()| self.disclosure.is_expanded(&message_id))
                    .map_err(SessionError::from);
                let _ = reply.send(result);
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
            Command::Watch { reply } => {
                let _ = reply.send((self.snapshot(), self.broadcast_tx.subscribe()));
            }
        }
    }

    fn process_event(&mut self, event: Event) -> Result<(), TransitionError> {
        let name = event.name();
        let result = match transition(&self.state, &self.context, event) {
            Ok(r) => r,
            Err(e) => {
                if e.is_submission_rejected() {
                    tracing::debug!(event = name, reason = %e, "Submission rejected");
                } else {
                    tracing::warn!(event = name, error = %e, "Transition refused");
                }
                return Err(e);
            }
        };

        self.state = result.new_state;
        for effect in result.effects {
            self.execute_effect(effect);
        }
        Ok(())
    }

    /// Execute an effect against the owned stores and notify observers
    fn execute_effect(&mut self, effect: Effect) {
        match effect {
            Effect::AppendMessage { message } => {
                let view = self.view(&message);
                self.transcript.append(message);
                tracing::debug!(
                    message_id = %view.id,
                    sender = ?view.sender,
                    transcript_len = self.transcript.len(),
                    "Message appended"
                );
                self.publish(SessionEvent::Message { message: view });
            }

            Effect::ResetTranscript { greeting } => {
                self.transcript.reset(greeting.clone());
                self.disclosure.clear();
                let greeting = self.view(&greeting);
                self.last_failure = None;
                tracing::info!(
                    session_id = %self.context.session_id,
                    retrieval_mode = self.state.retrieval_mode,
                    generation = self.state.generation,
                    "Transcript reset"
                );
                self.publish(SessionEvent::TranscriptReset { greeting });
            }

            Effect::ClearDraft => {
                self.draft.clear();
                self.publish(SessionEvent::DraftChanged {
                    draft: String::new(),
                });
            }

            Effect::SetDraft { text } => {
                self.draft.clone_from(&text);
                self.publish(SessionEvent::DraftChanged { draft: text });
            }

            Effect::ToggleExpand { message_id } => {
                self.disclosure.toggle_expand(&message_id);
                if let Some(message) = self.transcript.get(&message_id) {
                    let message = self.view(message);
                    self.publish(SessionEvent::ExpansionChanged { message });
                }
            }

            Effect::PublishState => {
                self.publish(SessionEvent::StateChange {
                    pending: self.state.is_pending(),
                    retrieval_mode: self.state.retrieval_mode,
                });
            }

            Effect::RequestAnswer { ticket, request } => {
                self.last_failure = None;

                // Spawn service call as background task
                let service = self.service.clone();
                let event_tx = self.event_tx.clone();

                tokio::spawn(async move {
                    tracing::info!(
                        request_id = %ticket.request_id,
                        rag = request.rag,
                        "Requesting answer (background)"
                    );

                    let event = match service.answer(&request).await {
                        Ok(answer) => Event::ServiceAnswered {
                            ticket,
                            answer,
                            message_id: MessageId::generate(),
                            timestamp: Utc::now(),
                        },
                        Err(error) => Event::ServiceFailed { ticket, error },
                    };
                    let _ = event_tx.send(event).await;
                });
            }

            Effect::RecordFailure { ticket, error } => {
                tracing::error!(
                    request_id = %ticket.request_id,
                    kind = error.kind.as_str(),
                    status = ?error.status,
                    error = %error.message,
                    "Answer request failed, question left unanswered"
                );
                let failure = FailureRecord {
                    request_id: ticket.request_id,
                    kind: error.kind,
                    message: error.message,
                    status: error.status,
                    at: Utc::now(),
                };
                self.last_failure = Some(failure.clone());
                self.publish(SessionEvent::RequestFailed { failure });
            }

            Effect::DropStaleAnswer { ticket } => {
                tracing::info!(
                    request_id = %ticket.request_id,
                    issued_in = ticket.generation,
                    current = self.state.generation,
                    "Dropping answer for a conversation that was reset"
                );
                self.publish(SessionEvent::AnswerDropped {
                    request_id: ticket.request_id,
                });
            }
        }
    }

    fn publish(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.broadcast_tx.send(event);
    }

    fn view(&self, message: &Message) -> MessageView {
        let expanded = self.disclosure.is_expanded(message.id());
        MessageView::new(message, &self.policy, expanded)
    }

    fn snapshot(&self) -> SessionSnapshot {
        let messages = self
            .transcript
            .messages()
            .iter()
            .map(|message| self.view(message))
            .collect();

        SessionSnapshot {
            session_id: self.context.session_id.clone(),
            messages,
            pending: self.state.is_pending(),
            retrieval_mode: self.state.retrieval_mode,
            draft: self.draft.clone(),
            last_failure: self.last_failure.clone(),
        }
    }
}
