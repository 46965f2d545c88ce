use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::provider::{
    retry_after_ms, ChatRequest, ChatResponse, LlmProvider, ProviderError, Role,
};

const API_VERSION: &str = "2023-06-01";

pub struct AnthropicProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl AnthropicProvider {
    pub fn new(api_key: String, base_url: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: base_url.unwrap_or_else(|| "https://api.anthropic.com".to_string()),
        }
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn display_name(&self) -> &str {
        "Anthropic"
    }

    async fn send(&self, req: &ChatRequest) -> Result<ChatResponse, ProviderError> {
        let body = build_request_body(req);
        let url = format!("{}/v1/messages", self.base_url.trim_end_matches('/'));

        debug!(model = %req.model, messages = req.messages.len(), "sending request to Anthropic");

        let resp = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let retry = retry_after_ms(resp.headers());
            let text = resp.text().await.unwrap_or_default();
            warn!(status, body = %text, "Anthropic API error");
            return Err(ProviderError::from_status(status, retry, &text));
        }

        let text = resp.text().await?;
        parse_response(&text)
    }
}

/// Build the Messages API body.
///
/// The Messages API has no `system` role inside `messages`, so leading system
/// templates are joined into the top-level `system` field. Every later
/// template keeps its position in `messages`.
fn build_request_body(req: &ChatRequest) -> serde_json::Value {
    let leading_system = req
        .messages
        .iter()
        .take_while(|m| m.role == Role::System)
        .count();

    let system: Vec<&str> = req.messages[..leading_system]
        .iter()
        .map(|m| m.content.as_str())
        .collect();

    let messages: Vec<serde_json::Value> = req.messages[leading_system..]
        .iter()
        .map(|m| {
            serde_json::json!({
                "role": m.role,
                "content": m.content,
            })
        })
        .collect();

    let mut body = serde_json::json!({
        "model": req.model,
        "messages": messages,
    });
    if !system.is_empty() {
        body["system"] = serde_json::Value::String(system.join("\n\n"));
    }
    req.sampling.apply(&mut body);
    body
}

fn parse_response(text: &str) -> Result<ChatResponse, ProviderError> {
    if text.trim().is_empty() {
        return Err(ProviderError::Parse("empty response body".to_string()));
    }
    let resp: ApiResponse =
        serde_json::from_str(text).map_err(|e| ProviderError::Parse(e.to_string()))?;

    let blocks = resp
        .content
        .into_iter()
        .filter_map(|block| match block {
            ContentBlock::Text { text } => Some(text),
            ContentBlock::Unknown => None,
        })
        .collect();

    Ok(ChatResponse {
        blocks,
        model: resp.model,
        stop_reason: resp.stop_reason.unwrap_or_default(),
    })
}

// Anthropic API response types (private, only used for deserialization)

#[derive(Deserialize)]
struct ApiResponse {
    #[serde(default)]
    model: String,
    content: Vec<ContentBlock>,
    stop_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Unknown,
}
