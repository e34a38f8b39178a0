use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::endpoint::Endpoint;

/// Why a guidance request produced no answer.
///
/// The conversation treats every variant the same way; the distinction only
/// exists for the log.
#[derive(Debug, Error)]
pub enum ResponderError {
    #[error("request timed out")]
    Timeout,
    #[error("request failed: {0}")]
    Transport(String),
    #[error("guidance API returned {status}: {message}")]
    Status { status: StatusCode, message: String },
    #[error("malformed reply: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for ResponderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ResponderError::Timeout
        } else if e.is_decode() {
            ResponderError::Malformed(e.to_string())
        } else {
            ResponderError::Transport(e.to_string())
        }
    }
}

/// Something that answers a user's question.
#[async_trait]
pub trait Responder: Send + Sync {
    async fn request_response(&self, user_text: &str) -> Result<String, ResponderError>;
}

#[derive(Serialize)]
struct GuideRequest<'a> {
    query: &'a str,
}

#[derive(Deserialize)]
struct GuideReply {
    response: String,
}

#[derive(Deserialize)]
struct ErrorReply {
    error: String,
}

#[derive(Deserialize)]
struct HealthReply {
    status: String,
}

/// HTTP client for the guidance API.
#[derive(Clone)]
pub struct GuideClient {
    client: Client,
    endpoint: Endpoint,
}

impl GuideClient {
    pub fn new(endpoint: Endpoint, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, endpoint))
    }

    pub fn with_client(client: Client, endpoint: Endpoint) -> Self {
        Self { client, endpoint }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Probe the backend's health route. `Ok` only for `{"status": "ok"}`.
    pub async fn health(&self) -> Result<(), ResponderError> {
        let url = self
            .endpoint
            .health_url()
            .map_err(|e| ResponderError::Transport(e.to_string()))?;

        let response = self.client.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(status_error(status, &body));
        }

        let reply: HealthReply =
            serde_json::from_str(&body).map_err(|e| ResponderError::Malformed(e.to_string()))?;
        if reply.status != "ok" {
            return Err(ResponderError::Malformed(format!("unexpected health status: {}", reply.status)));
        }
        Ok(())
    }
}

#[async_trait]
impl Responder for GuideClient {
    async fn request_response(&self, user_text: &str) -> Result<String, ResponderError> {
        let request = GuideRequest { query: user_text };

        let response = self
            .client
            .post(self.endpoint.url().clone())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(status_error(status, &body));
        }

        let reply: GuideReply =
            serde_json::from_str(&body).map_err(|e| ResponderError::Malformed(e.to_string()))?;
        Ok(reply.response)
    }
}

/// The backend reports failures as `{"error": "..."}`; fall back to the raw body.
fn status_error(status: StatusCode, body: &str) -> ResponderError {
    let message = serde_json::from_str::<ErrorReply>(body)
        .map(|reply| reply.error)
        .unwrap_or_else(|_| body.chars().take(200).collect());
    ResponderError::Status { status, message }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_prefers_error_field() {
        let err = status_error(StatusCode::BAD_REQUEST, r#"{"error": "No query provided"}"#);
        match err {
            ResponderError::Status { status, message } => {
                assert_eq!(status, StatusCode::BAD_REQUEST);
                assert_eq!(message, "No query provided");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn status_error_keeps_raw_body() {
        let err = status_error(StatusCode::BAD_GATEWAY, "upstream down");
        assert_eq!(err.to_string(), "guidance API returned 502 Bad Gateway: upstream down");
    }

    #[test]
    fn request_body_shape() {
        let body = serde_json::to_value(GuideRequest { query: "hello" }).unwrap();
        assert_eq!(body, serde_json::json!({ "query": "hello" }));
    }
}
