use chadgpt_agent::PromptError;

#[derive(Debug, thiserror::Error)]
pub enum BotError {
    #[error("invalid ignored_nicks pattern: {0}")]
    IgnorePattern(#[from] glob::PatternError),

    #[error(transparent)]
    Prompt(#[from] PromptError),

    #[error("disconnected from IRC: {0}")]
    Disconnected(String),
}
