//! Text-generation client.
//!
//! Provides the [`TextGenerator`] seam used by the extractor and an
//! OpenAI-compatible chat completions implementation. Calls are made once:
//! there is no retry, and no timeout unless one is configured.

use std::time::Duration;

use async_trait::async_trait;
use chaos_harvester_core::config::LlmConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, instrument, warn};

/// Errors that can occur when calling the text-generation API
#[derive(Debug, Error)]
pub enum LlmError {
    /// No API key configured
    #[error("No API key provided")]
    MissingCredential,

    /// Connection error
    #[error("Failed to connect to text-generation API: {0}")]
    Connection(String),

    /// Request timeout
    #[error("Text-generation request timed out")]
    Timeout,

    /// Authentication error
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Rate limited
    #[error("Rate limited by text-generation API")]
    RateLimited,

    /// Invalid request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Response body could not be decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Response decoded but carried no text
    #[error("Text-generation API returned no content")]
    EmptyResponse,

    /// Any other non-success status
    #[error("Text-generation API error (status {status}): {body}")]
    Api { status: u16, body: String },
}

impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            LlmError::Timeout
        } else if e.is_decode() {
            LlmError::Serialization(e.to_string())
        } else {
            LlmError::Connection(e.to_string())
        }
    }
}

// =============================================================================
// REQUEST/RESPONSE TYPES
// =============================================================================

/// One turn of a chat exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Chat completion request body
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

// =============================================================================
// GENERATOR TRAIT
// =============================================================================

/// Something that can complete a chat exchange
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate the assistant's reply for `request`
    async fn generate(&self, request: &CompletionRequest) -> Result<String, LlmError>;
}

// =============================================================================
// OPENAI CLIENT
// =============================================================================

/// OpenAI-compatible chat completions client
#[derive(Clone)]
pub struct OpenAiClient {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl std::fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("base_url", &self.base_url)
            .field("has_api_key", &self.api_key.is_some())
            .finish()
    }
}

impl OpenAiClient {
    /// Build a client from configuration.
    ///
    /// A missing key is not an error here; every call fails with
    /// [`LlmError::MissingCredential`] instead.
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let mut builder = reqwest::Client::builder().pool_max_idle_per_host(10);
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| LlmError::Connection(e.to_string()))?;

        if config.api_key.is_none() {
            warn!("No text-generation API key configured; extraction will record failures");
        }

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            client,
        })
    }
}

#[async_trait]
impl TextGenerator for OpenAiClient {
    #[instrument(skip(self, request), fields(model = %request.model))]
    async fn generate(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let api_key = self.api_key.as_deref().ok_or(LlmError::MissingCredential)?;
        let url = format!("{}/chat/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(request)
            .send()
            .await?;

        match response.status().as_u16() {
            200 => {
                let body: CompletionResponse = response
                    .json()
                    .await
                    .map_err(|e| LlmError::Serialization(e.to_string()))?;
                let content = body
                    .choices
                    .into_iter()
                    .next()
                    .and_then(|choice| choice.message.content)
                    .ok_or(LlmError::EmptyResponse)?;
                debug!(chars = content.len(), "Completion received");
                Ok(content)
            }
            401 | 403 => {
                let body = response.text().await.unwrap_or_default();
                error!("Text-generation authentication failed");
                Err(LlmError::Authentication(body))
            }
            429 => {
                warn!("Rate limited by text-generation API");
                Err(LlmError::RateLimited)
            }
            400 => {
                let body = response.text().await.unwrap_or_default();
                Err(LlmError::InvalidRequest(body))
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                error!(status, body = %body, "Text-generation API error");
                Err(LlmError::Api { status, body })
            }
        }
    }
}
