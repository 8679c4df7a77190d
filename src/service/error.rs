//! Answering service error types

use thiserror::Error;

/// Service error with classification
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct ServiceError {
    pub kind: ServiceErrorKind,
    pub message: String,
    /// HTTP status, when the service answered at all
    pub status: Option<u16>,
}

impl ServiceError {
    pub fn new(kind: ServiceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ServiceErrorKind::Network, message)
    }

    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::new(ServiceErrorKind::Status, message).with_status(status)
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(ServiceErrorKind::MalformedResponse, message)
    }
}

/// Failure classification. Every kind is handled the same way by the
/// conversation: no answer is appended and the pending flag clears.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceErrorKind {
    /// Transport failure: connection refused, timeout, reset
    Network,
    /// Non-2xx HTTP status
    Status,
    /// 2xx response whose body lacks the answer field
    MalformedResponse,
}

impl ServiceErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Status => "status",
            Self::MalformedResponse => "malformed_response",
        }
    }
}
