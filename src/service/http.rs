//! HTTP answering service

use super::types::{AnswerRequest, AnswerResponse};
use super::{AnsweringService, ServiceError};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// Answering service reached over HTTP POST with a JSON body
pub struct HttpAnsweringService {
    client: Client,
    endpoint: String,
}

impl HttpAnsweringService {
    /// Build a client for `endpoint`. `timeout` of `None` waits forever.
    pub fn new(
        endpoint: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, ServiceError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ServiceError::network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl AnsweringService for HttpAnsweringService {
    async fn answer(&self, request: &AnswerRequest) -> Result<AnswerResponse, ServiceError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ServiceError::network(format!("Request timeout: {e}"))
                } else if e.is_connect() {
                    ServiceError::network(format!("Connection failed: {e}"))
                } else {
                    ServiceError::network(format!("Request failed: {e}"))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ServiceError::network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(ServiceError::status(
                status.as_u16(),
                format!("HTTP {status} error: {body}"),
            ));
        }

        serde_json::from_str(&body).map_err(|e| {
            ServiceError::malformed(format!("Failed to parse response: {e} - body: {body}"))
                .with_status(status.as_u16())
        })
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}
