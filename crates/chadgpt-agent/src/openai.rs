use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::provider::{retry_after_ms, ChatRequest, ChatResponse, LlmProvider, ProviderError};

/// OpenAI-compatible chat completions backend.
pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OpenAiProvider {
    pub fn new(api_key: String, base_url: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: base_url.unwrap_or_else(|| "https://api.openai.com".to_string()),
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn display_name(&self) -> &str {
        "OpenAI"
    }

    async fn send(&self, req: &ChatRequest) -> Result<ChatResponse, ProviderError> {
        let body = build_request_body(req);
        let url = format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'));

        debug!(model = %req.model, messages = req.messages.len(), "sending request to OpenAI");

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let retry = retry_after_ms(resp.headers());
            let text = resp.text().await.unwrap_or_default();
            warn!(status, body = %text, "OpenAI API error");
            return Err(ProviderError::from_status(status, retry, &text));
        }

        let text = resp.text().await?;
        parse_response(&text)
    }
}

fn build_request_body(req: &ChatRequest) -> serde_json::Value {
    // Flat messages array; every role is passed through in declared order.
    let messages: Vec<serde_json::Value> = req
        .messages
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
    req.sampling.apply(&mut body);
    body
}

fn parse_response(text: &str) -> Result<ChatResponse, ProviderError> {
    if text.trim().is_empty() {
        return Err(ProviderError::Parse("empty response body".to_string()));
    }
    let resp: ApiResponse =
        serde_json::from_str(text).map_err(|e| ProviderError::Parse(e.to_string()))?;

    let stop_reason = resp
        .choices
        .first()
        .and_then(|c| c.finish_reason.clone())
        .unwrap_or_default();
    let blocks = resp
        .choices
        .into_iter()
        .filter_map(|c| c.message.content)
        .filter(|c| !c.is_empty())
        .collect();

    Ok(ChatResponse {
        blocks,
        model: resp.model,
        stop_reason,
    })
}

#[derive(Deserialize)]
struct ApiResponse {
    #[serde(default)]
    model: String,
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{Message, Role, SamplingParams};

    #[test]
    fn system_role_passes_through_in_order() {
        let req = ChatRequest {
            model: "gpt-test".into(),
            messages: vec![
                Message {
                    role: Role::System,
                    content: "be brief".into(),
                },
                Message {
                    role: Role::User,
                    content: "hi".into(),
                },
            ],
            sampling: SamplingParams {
                max_tokens: 64,
                presence_penalty: Some(0.5),
                ..Default::default()
            },
        };
        let body = build_request_body(&req);
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[1]["content"], "hi");
        assert_eq!(body["presence_penalty"], 0.5);
        assert!(body.get("temperature").is_none());
    }

    #[test]
    fn choices_become_blocks() {
        let json = r#"{"model":"gpt","choices":[
            {"message":{"content":"It is noon."},"finish_reason":"stop"}]}"#;
        let resp = parse_response(json).unwrap();
        assert_eq!(resp.first_block(), Some("It is noon."));
        assert_eq!(resp.stop_reason, "stop");
    }

    #[test]
    fn null_content_yields_no_blocks() {
        let json = r#"{"model":"gpt","choices":[{"message":{"content":null},"finish_reason":"stop"}]}"#;
        assert!(parse_response(json).unwrap().blocks.is_empty());
    }
}
