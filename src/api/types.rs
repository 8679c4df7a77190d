//! API request and response types

use crate::transcript::MessageId;
use serde::{Deserialize, Serialize};

/// Request to submit a message
#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub text: String,
}

/// Request to replace the draft input
#[derive(Debug, Deserialize)]
pub struct DraftRequest {
    #[serde(default)]
    pub text: String,
}

/// Response for an accepted submission; the answer arrives on the stream
#[derive(Debug, Serialize)]
pub struct AcceptedResponse {
    pub accepted: bool,
}

/// Response for draft updates
#[derive(Debug, Serialize)]
pub struct DraftResponse {
    pub draft: String,
}

/// Response for a mode toggle
#[derive(Debug, Serialize)]
pub struct ModeResponse {
    pub retrieval_mode: bool,
}

/// Response for an expand toggle
#[derive(Debug, Serialize)]
pub struct ExpandResponse {
    pub message_id: MessageId,
    pub expanded: bool,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
