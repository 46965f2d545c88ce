use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use chadgpt_core::config::CompletionConfig;

pub use chadgpt_core::Role;

/// A single rendered prompt in the request's message list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

/// Sampling parameters forwarded verbatim to the backend.
///
/// Optional fields are omitted from the request body when unset and sent
/// as-is when set, even if the backend does not support them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SamplingParams {
    pub temperature: Option<f32>,
    pub max_tokens: u32,
    pub top_p: Option<f32>,
    pub frequency_penalty: Option<f32>,
    pub presence_penalty: Option<f32>,
}

impl From<&CompletionConfig> for SamplingParams {
    fn from(cfg: &CompletionConfig) -> Self {
        Self {
            temperature: cfg.temperature,
            max_tokens: cfg.max_tokens,
            top_p: cfg.top_p,
            frequency_penalty: cfg.frequency_penalty,
            presence_penalty: cfg.presence_penalty,
        }
    }
}

impl SamplingParams {
    /// Insert every configured sampling field into a JSON request body.
    pub(crate) fn apply(&self, body: &mut serde_json::Value) {
        body["max_tokens"] = serde_json::json!(self.max_tokens);
        let optional = [
            ("temperature", self.temperature),
            ("top_p", self.top_p),
            ("frequency_penalty", self.frequency_penalty),
            ("presence_penalty", self.presence_penalty),
        ];
        for (key, value) in optional {
            if let Some(v) = value {
                body[key] = serde_json::json!(v);
            }
        }
    }
}

/// One completion request, built per matched channel message.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub sampling: SamplingParams,
}

/// Successful backend reply.
#[derive(Debug, Clone, Default)]
pub struct ChatResponse {
    /// Text content blocks in backend order. May be empty.
    pub blocks: Vec<String>,
    pub model: String,
    pub stop_reason: String,
}

impl ChatResponse {
    pub fn first_block(&self) -> Option<&str> {
        self.blocks.first().map(String::as_str)
    }
}

/// Common interface for the generative backends.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Lowercase identifier for logs.
    fn name(&self) -> &str;

    /// Human-facing backend name used in channel error notices.
    fn display_name(&self) -> &str {
        self.name()
    }

    /// Send a non-streaming completion request and wait for the full response.
    async fn send(&self, req: &ChatRequest) -> Result<ChatResponse, ProviderError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The backend rejected the request itself, e.g. an unsupported sampling parameter.
    #[error("Invalid request ({status}): {message}")]
    InvalidRequest { status: u16, message: String },

    #[error("Rate limited, retry after {retry_after_ms}ms: {message}")]
    RateLimited { retry_after_ms: u64, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Provider unavailable: {0}")]
    Unavailable(String),
}

impl ProviderError {
    /// The message shown to channel users, without status codes or variant prefixes.
    pub fn backend_message(&self) -> String {
        match self {
            ProviderError::Http(e) => e.to_string(),
            ProviderError::Api { message, .. }
            | ProviderError::InvalidRequest { message, .. }
            | ProviderError::RateLimited { message, .. } => message.clone(),
            ProviderError::Parse(detail) => format!("malformed response: {detail}"),
            ProviderError::Unavailable(reason) => reason.clone(),
        }
    }

    /// Classify a non-success HTTP response.
    ///
    /// Both Anthropic and OpenAI wrap errors as `{"error": {"message": ...}}`;
    /// anything else falls back to the raw body.
    pub(crate) fn from_status(status: u16, retry_after_ms: u64, body: &str) -> Self {
        let message = extract_error_message(body)
            .unwrap_or_else(|| match body.trim() {
                "" => format!("HTTP {status}"),
                raw => raw.to_string(),
            });
        match status {
            429 => ProviderError::RateLimited {
                retry_after_ms,
                message,
            },
            400 | 404 | 413 | 422 => ProviderError::InvalidRequest { status, message },
            _ => ProviderError::Api { status, message },
        }
    }
}

fn extract_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let error = value.get("error")?;
    match error {
        serde_json::Value::String(s) => Some(s.clone()),
        other => other
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::to_string),
    }
}

/// Parse a `retry-after` header value (seconds) into milliseconds.
pub(crate) fn retry_after_ms(headers: &reqwest::header::HeaderMap) -> u64 {
    headers
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .map(|s| s * 1000)
        .unwrap_or(5000)
}
