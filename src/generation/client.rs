//! HTTP client for the external generation service.
//!
//! One request, one classification: HTTP 200 with a JSON body is a success,
//! anything else is an [`ExternalCallError`]. Retrying is the caller's job.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;

use super::types::GenerationRequest;
use crate::error::ExternalCallError;
use crate::utils::json_extraction::{extract_json_object, normalize_response_body};

/// Trait for services that generate ad research for a business.
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Send one request and return the raw JSON document on success.
    async fn call(&self, request: &GenerationRequest) -> Result<Value, ExternalCallError>;
}

/// Client for a generation endpoint reachable over HTTP.
pub struct HttpGenerationClient {
    /// Endpoint that accepts the POSTed request.
    endpoint: String,
    /// HTTP client for making API requests.
    http_client: Client,
}

impl HttpGenerationClient {
    /// Create a client for `endpoint` with a per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns `ExternalCallError::Transport` if the HTTP client cannot be
    /// built (TLS backend initialisation).
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, ExternalCallError> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ExternalCallError::Transport(e.to_string()))?;

        Ok(Self {
            endpoint: endpoint.into(),
            http_client,
        })
    }
}

#[async_trait]
impl GenerationService for HttpGenerationClient {
    async fn call(&self, request: &GenerationRequest) -> Result<Value, ExternalCallError> {
        tracing::debug!(
            business = %request.business_name,
            has_context = request.existing_data.is_some(),
            "Calling generation service"
        );

        let http_response = self
            .http_client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| ExternalCallError::Transport(e.to_string()))?;

        let status = http_response.status();
        let text = http_response
            .text()
            .await
            .map_err(|e| ExternalCallError::Transport(e.to_string()))?;

        if status != StatusCode::OK {
            return Err(ExternalCallError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        parse_body(&text)
    }
}

/// Parses a 200 body into a JSON document.
///
/// Fenced or prose-wrapped documents are unwrapped.
fn parse_body(text: &str) -> Result<Value, ExternalCallError> {
    let value = match serde_json::from_str::<Value>(text) {
        Ok(value) => value,
        Err(parse_err) => {
            let json = extract_json_object(text)
                .map_err(|_| ExternalCallError::InvalidBody(parse_err.to_string()))?;
            serde_json::from_str(&json)
                .map_err(|e| ExternalCallError::InvalidBody(e.to_string()))?
        }
    };

    normalize_response_body(value).map_err(|e| ExternalCallError::InvalidBody(e.to_string()))
}
