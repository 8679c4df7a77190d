//! Wire types for the answering service

use serde::{Deserialize, Serialize};

/// Outbound query body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRequest {
    pub query: String,
    /// Whether the service should use retrieval-augmented answering
    pub rag: bool,
}

impl AnswerRequest {
    pub fn new(query: impl Into<String>, rag: bool) -> Self {
        Self {
            query: query.into(),
            rag,
        }
    }
}

/// Successful response body. `response` is mandatory; a body without it
/// fails to deserialize and is reported as malformed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerResponse {
    pub response: String,
    #[serde(default)]
    pub map_html: Option<String>,
}

#[cfg(test)]
impl AnswerResponse {
    pub fn text(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            map_html: None,
        }
    }

    pub fn with_map(mut self, map_html: impl Into<String>) -> Self {
        self.map_html = Some(map_html.into());
        self
    }
}
