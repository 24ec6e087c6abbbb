/// LLM Client — the single point of entry for all text-generation calls in Sharp Hire.
///
/// ARCHITECTURAL RULE: No other module may call the Anthropic API directly.
/// All LLM interactions MUST go through a `ModelInvoker`.
///
/// The invoker never retries and never looks inside the returned text.
/// Retry policy lives in the pipeline; fence stripping and schema checks live in `structured`.
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

#[cfg(test)]
pub mod mock;
pub mod prompts;

pub const DEFAULT_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const PROVIDER: &str = "anthropic";
const REQUEST_TIMEOUT_SECS: u64 = 120;

/// Typed failure of a single backend call.
///
/// `Transient` is the only class the pipeline retries.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum LlmError {
    #[error("Transient backend error{}: {message}", status_suffix(.status))]
    Transient { status: Option<u16>, message: String },

    #[error("Backend rejected credentials (status {status}): {message}")]
    Auth { status: u16, message: String },

    #[error("Backend error{}: {message}", status_suffix(.status))]
    Backend { status: Option<u16>, message: String },

    #[error("LLM returned empty content")]
    EmptyContent,
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (status {s})")).unwrap_or_default()
}

impl LlmError {
    pub fn is_transient(&self) -> bool {
        matches!(self, LlmError::Transient { .. })
    }

    /// Maps a non-success HTTP status onto the error taxonomy.
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            401 | 403 => LlmError::Auth { status, message },
            // 529 is Anthropic's "overloaded"
            429 | 500..=599 => LlmError::Transient {
                status: Some(status),
                message,
            },
            _ => LlmError::Backend {
                status: Some(status),
                message,
            },
        }
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() || e.is_connect() {
            LlmError::Transient {
                status: None,
                message: e.to_string(),
            }
        } else if let Some(status) = e.status() {
            LlmError::from_status(status.as_u16(), e.to_string())
        } else {
            LlmError::Backend {
                status: None,
                message: e.to_string(),
            }
        }
    }
}

/// Generation parameters for one call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub model: String,
    pub max_output_tokens: u32,
    /// Sampling randomness, 0.0 – 1.0. Validated at config load.
    pub temperature: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// Raw text returned by the backend plus the token usage it reported.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
    pub usage: Usage,
}

/// A text-generation backend. Held in `AppState` as `Arc<dyn ModelInvoker>` so the
/// backend can be swapped without touching the pipeline.
#[async_trait]
pub trait ModelInvoker: Send + Sync {
    /// Name under which spend is recorded in the cost ledger.
    fn provider(&self) -> &str;

    async fn invoke(
        &self,
        system: &str,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<Completion, LlmError>;
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
    usage: Usage,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

impl AnthropicResponse {
    /// Extracts the text content from the first text block.
    fn text(&self) -> Option<&str> {
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
pub struct AnthropicInvoker {
    client: Client,
    api_key: String,
    api_url: String,
}

impl AnthropicInvoker {
    pub fn new(api_key: String, api_url: String) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| LlmError::Backend {
                status: None,
                message: format!("Failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            api_key,
            api_url,
        })
    }
}

#[async_trait]
impl ModelInvoker for AnthropicInvoker {
    fn provider(&self) -> &str {
        PROVIDER
    }

    async fn invoke(
        &self,
        system: &str,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<Completion, LlmError> {
        let request_body = AnthropicRequest {
            model: &params.model,
            max_tokens: params.max_output_tokens,
            temperature: params.temperature,
            system,
            messages: vec![AnthropicMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = error_message(&body);
            if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                warn!("LLM API returned {}: {}", status, message);
            }
            return Err(LlmError::from_status(status.as_u16(), message));
        }

        let body: AnthropicResponse = response.json().await?;
        let text = body.text().ok_or(LlmError::EmptyContent)?.to_string();

        debug!(
            "LLM call succeeded: model={}, input_tokens={}, output_tokens={}",
            params.model, body.usage.input_tokens, body.usage.output_tokens
        );

        Ok(Completion {
            text,
            usage: body.usage,
        })
    }
}

/// Pulls the human-readable message out of an Anthropic error envelope, falling back to the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<AnthropicError>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string())
}
