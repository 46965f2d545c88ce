pub mod anthropic;
pub mod openai;
pub mod prompt;
pub mod provider;

use std::sync::Arc;

use chadgpt_core::config::{CompletionConfig, ProviderKind};

pub use prompt::{PromptBuilder, PromptError, PromptVars};
pub use provider::{
    ChatRequest, ChatResponse, LlmProvider, Message, ProviderError, Role, SamplingParams,
};

/// Build the single configured backend.
pub fn build_provider(config: &CompletionConfig) -> Result<Arc<dyn LlmProvider>, ProviderError> {
    let api_key = config.resolve_api_key().ok_or_else(|| {
        ProviderError::Unavailable(format!("no API key configured for {:?}", config.provider))
    })?;

    let provider: Arc<dyn LlmProvider> = match config.provider {
        ProviderKind::Anthropic => Arc::new(anthropic::AnthropicProvider::new(
            api_key,
            config.base_url.clone(),
        )),
        ProviderKind::OpenAi => {
            Arc::new(openai::OpenAiProvider::new(api_key, config.base_url.clone()))
        }
    };
    tracing::info!(provider = %provider.name(), model = %config.model, "LLM provider ready");
    Ok(provider)
}
