//! Answering service abstraction
//!
//! The remote service is an opaque request/response boundary: a query and
//! the retrieval-mode flag go out, an answer and optional map markup come back.

mod error;
mod http;
mod types;

pub use error::{ServiceError, ServiceErrorKind};
pub use http::HttpAnsweringService;
pub use types::{AnswerRequest, AnswerResponse};

use async_trait::async_trait;
use std::sync::Arc;

/// Common interface for answering services
#[async_trait]
pub trait AnsweringService: Send + Sync {
    /// Answer a single query
    async fn answer(&self, request: &AnswerRequest) -> Result<AnswerResponse, ServiceError>;

    /// Where requests are sent, for diagnostics
    fn endpoint(&self) -> &str;
}

#[async_trait]
impl<T: AnsweringService + ?Sized> AnsweringService for Arc<T> {
    async fn answer(&self, request: &AnswerRequest) -> Result<AnswerResponse, ServiceError> {
        (**self).answer(request).await
    }

    fn endpoint(&self) -> &str {
        (**self).endpoint()
    }
}

/// Logging wrapper for answering services
pub struct LoggingService<S> {
    inner: S,
}

impl<S: AnsweringService> LoggingService<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<S: AnsweringService> AnsweringService for LoggingService<S> {
    async fn answer(&self, request: &AnswerRequest) -> Result<AnswerResponse, ServiceError> {
        let start = std::time::Instant::now();
        let result = self.inner.answer(request).await;
        let duration = start.elapsed();

        match &result {
            Ok(response) => {
                tracing::info!(
                    endpoint = %self.inner.endpoint(),
                    duration_ms = %duration.as_millis(),
                    rag = request.rag,
                    answer_chars = response.response.chars().count(),
                    has_map = response.map_html.as_deref().is_some_and(|m| !m.trim().is_empty()),
                    "Answer request completed"
                );
            }
            Err(e) => {
                tracing::error!(
                    endpoint = %self.inner.endpoint(),
                    duration_ms = %duration.as_millis(),
                    rag = request.rag,
                    kind = e.kind.as_str(),
                    status = ?e.status,
                    error = %e.message,
                    "Answer request failed"
                );
            }
        }

        result
    }

    fn endpoint(&self) -> &str {
        self.inner.endpoint()
    }
}
