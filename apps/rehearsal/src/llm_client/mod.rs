/// Completion client: the single point of entry for all text-completion calls.
///
/// Question generation and answer evaluation depend on the `CompletionService` trait,
/// never on `LlmClient` directly, so tests and alternative backends can be injected.
/// `LlmClient` makes exactly one HTTP attempt per call; retry policy belongs to the caller.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod prompts;
pub mod retry;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
/// Default model when the request carries no selector.
pub const MODEL: &str = "claude-sonnet-4-5";
const MAX_TOKENS: u32 = 1024;

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Rate limited")]
    RateLimited,

    #[error("Completion returned empty content")]
    EmptyContent,

    #[error("Completion timed out after {0:?}")]
    Timeout(Duration),
}

impl CompletionError {
    /// Transient failures worth another attempt after the policy delay.
    pub fn is_retryable(&self) -> bool {
        match self {
            CompletionError::RateLimited
            | CompletionError::Timeout(_)
            | CompletionError::EmptyContent => true,
            CompletionError::Api { status, .. } => *status >= 500,
            // Connection refused or reset and client-side timeouts; body decode errors are not.
            CompletionError::Http(e) => e.is_connect() || e.is_timeout() || e.is_request(),
        }
    }
}

/// A free-form prompt plus an optional model selector.
#[derive(Debug, Clone, Copy)]
pub struct CompletionRequest<'a> {
    pub prompt: &'a str,
    pub system: &'a str,
    pub model: Option<&'a str>,
}

impl<'a> CompletionRequest<'a> {
    pub fn new(prompt: &'a str, system: &'a str) -> Self {
        Self {
            prompt,
            system,
            model: None,
        }
    }

    pub fn with_model(mut self, model: Option<&'a str>) -> Self {
        self.model = model;
        self
    }
}

#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Returns the raw completion text. Empty text is reported as `EmptyContent`.
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<String, CompletionError>;
}

/// Runs one completion bounded by `timeout`, mapping elapsed time to `CompletionError::Timeout`.
pub async fn complete_within(
    llm: &dyn CompletionService,
    request: CompletionRequest<'_>,
    timeout: Duration,
) -> Result<String, CompletionError> {
    match tokio::time::timeout(timeout, llm.complete(request)).await {
        Ok(result) => result,
        Err(_) => Err(CompletionError::Timeout(timeout)),
    }
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct LlmResponse {
    pub content: Vec<ContentBlock>,
    pub usage: Usage,
}

#[derive(Debug, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl LlmResponse {
    /// Extracts the text content from the first text block.
    pub fn text(&self) -> Option<&str> {
        self.content
            .iter()
            .find(|b| b.block_type == "text")
            .and_then(|b| b.text.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorBody,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorBody {
    message: String,
}

/// Anthropic Messages API adapter.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
}

impl LlmClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(120))
                .build()
                .expect("Failed to build HTTP client"),
            api_key,
        }
    }

    /// Makes a single call to the Messages API, returning the full response object.
    pub async fn call(
        &self,
        request: CompletionRequest<'_>,
    ) -> Result<LlmResponse, CompletionError> {
        let request_body = AnthropicRequest {
            model: request.model.unwrap_or(MODEL),
            max_tokens: MAX_TOKENS,
            system: request.system,
            messages: vec![AnthropicMessage {
                role: "user",
                content: request.prompt,
            }],
        };

        let response = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();

        if status.as_u16() == 429 {
            warn!("Completion API returned 429");
            return Err(CompletionError::RateLimited);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<AnthropicError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(CompletionError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let llm_response: LlmResponse = response.json().await?;

        debug!(
            input_tokens = llm_response.usage.input_tokens,
            output_tokens = llm_response.usage.output_tokens,
            "Completion call succeeded"
        );

        Ok(llm_response)
    }
}

#[async_trait]
impl CompletionService for LlmClient {
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<String, CompletionError> {
        let response = self.call(request).await?;
        match response.text().map(str::trim) {
            Some(text) if !text.is_empty() => Ok(text.to_string()),
            _ => Err(CompletionError::EmptyContent),
        }
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from model output.
pub fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

/// A real transport error: a request to a local port nothing listens on.
#[cfg(test)]
pub(crate) async fn connection_refused() -> reqwest::Error {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    Client::new()
        .get(format!("http://{addr}/"))
        .send()
        .await
        .unwrap_err()
}
