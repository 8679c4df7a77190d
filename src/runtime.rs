//! Runtime for executing a conversation session
//!
//! One task owns all session state and processes commands and service
//! resolutions one at a time. Observers get a cloneable `SessionHandle`.

mod executor;


pub use executor::ConversationRuntime;

use crate::disclosure::DisclosurePolicy;
use crate::service::{AnsweringService, ServiceErrorKind};
use crate::state_machine::{ConvContext, TransitionError};
use crate::transcript::{Message, MessageId, Sender};
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;

/// Errors returned to callers of the session handle
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error(transparent)]
    Rejected(#[from] TransitionError),
    #[error("No message with id {0}")]
    UnknownMessage(MessageId),
    #[error("Session runtime has stopped")]
    Closed,
}

/// Commands sent from the presentation boundary to the runtime
#[derive(Debug)]
pub(crate) enum Command {
    Submit {
        text: String,
        reply: oneshot::Sender<Result<(), SessionError>>,
    },
    SetDraft {
        text: String,
        reply: oneshot::Sender<Result<(), SessionError>>,
    },
    ToggleMode {
        reply: oneshot::Sender<Result<bool, SessionError>>,
    },
    ToggleExpand {
        message_id: MessageId,
        reply: oneshot::Sender<Result<bool, SessionError>>,
    },
    Snapshot {
        reply: oneshot::Sender<SessionSnapshot>,
    },
    /// Snapshot plus a receiver for every event after it
    Watch {
        reply: oneshot::Sender<(SessionSnapshot, broadcast::Receiver<SessionEvent>)>,
    },
}

/// A failed request kept for display until the next submission or reset
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureRecord {
    pub request_id: String,
    pub kind: ServiceErrorKind,
    pub message: String,
    pub status: Option<u16>,
    pub at: DateTime<Utc>,
}

/// Notifications broadcast to observers after each state change
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    Message {
        message: MessageView,
    },
    TranscriptReset {
        greeting: MessageView,
    },
    StateChange {
        pending: bool,
        retrieval_mode: bool,
    },
    DraftChanged {
        draft: String,
    },
    ExpansionChanged {
        message: MessageView,
    },
    RequestFailed {
        failure: FailureRecord,
    },
    AnswerDropped {
        request_id: String,
    },
}

impl SessionEvent {
    /// Name used for the SSE `event:` field
    pub fn event_type(&self) -> &'static str {
        match self {
            SessionEvent::Message { .. } => "message",
            SessionEvent::TranscriptReset { .. } => "transcript_reset",
            SessionEvent::StateChange { .. } => "state_change",
            SessionEvent::DraftChanged { .. } => "draft_changed",
            SessionEvent::ExpansionChanged { .. } => "expansion_changed",
            SessionEvent::RequestFailed { .. } => "request_failed",
            SessionEvent::AnswerDropped { .. } => "answer_dropped",
        }
    }
}

/// A message as the presentation layer should show it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageView {
    pub id: MessageId,
    pub sender: Sender,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// Map markup to render; blank fragments are left out
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map_fragment: Option<String>,
    pub display_text: String,
    pub truncated: bool,
    pub expanded: bool,
}

impl MessageView {
    pub fn new(message: &Message, policy: &DisclosurePolicy, expanded: bool) -> Self {
        Self {
            id: message.id().clone(),
            sender: message.sender(),
            content: message.content().to_string(),
            timestamp: message.timestamp(),
            map_fragment: message.map_fragment().map(str::to_string),
            display_text: policy.display_text(message.content(), expanded),
            truncated: policy.is_truncated(message.content()),
            expanded,
        }
    }
}

/// Read-only view of the whole session
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub messages: Vec<MessageView>,
    pub pending: bool,
    pub retrieval_mode: bool,
    pub draft: String,
    pub last_failure: Option<FailureRecord>,
}

/// Handle to interact with a running session
#[derive(Clone)]
pub struct SessionHandle {
    command_tx: mpsc::Sender<Command>,
}

impl SessionHandle {
    /// Submit user text. Returns once the message is in the transcript and
    /// the request is in flight; the answer arrives later as an event.
    pub async fn submit(&self, text: impl Into<String>) -> Result<(), SessionError> {
        let text = text.into();
        self.request(|reply| Command::Submit { text, reply }).await?
    }

    pub async fn set_draft(&self, text: impl Into<String>) -> Result<(), SessionError> {
        let text = text.into();
        self.request(|reply| Command::SetDraft { text, reply }).await?
    }

    /// Flip retrieval mode and reset the transcript. Returns the new mode.
    pub async fn toggle_mode(&self) -> Result<bool, SessionError> {
        self.request(|reply| Command::ToggleMode { reply }).await?
    }

    /// Flip the expand flag of a message. Returns the new flag.
    pub async fn toggle_expand(&self, message_id: MessageId) -> Result<bool, SessionError> {
        self.request(|reply| Command::ToggleExpand { message_id, reply })
            .await?
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    /// Take a snapshot and subscribe in one runtime step, so every event
    /// on the receiver happened after the snapshot and none before it.
    pub async fn watch(
        &self,
    ) -> Result<(SessionSnapshot, broadcast::Receiver<SessionEvent>), SessionError> {
        self.request(|reply| Command::Watch { reply }).await
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.command_tx
            .send(command(reply_tx))
            .await
            .map_err(|_| SessionError::Closed)?;
        reply_rx.await.map_err(|_| SessionError::Closed)
    }
}

/// Start a session runtime on the current tokio runtime
pub fn start_session<A>(
    context: ConvContext,
    retrieval_mode: bool,
    policy: DisclosurePolicy,
    service: A,
) -> (SessionHandle, JoinHandle<()>)
where
    A: AnsweringService + 'static,
{
    let (command_tx, command_rx) = mpsc::channel(32);
    let (broadcast_tx, _) = broadcast::channel(128);

    let runtime = ConversationRuntime::new(
        context,
        retrieval_mode,
        policy,
        service,
        command_rx,
        broadcast_tx,
    );
    let join = tokio::spawn(runtime.run());

    (SessionHandle { command_tx }, join)
}
