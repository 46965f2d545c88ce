use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChadError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration:\n  - {}", .problems.join("\n  - "))]
    Validation { problems: Vec<String> },
}

impl ChadError {
    /// Short error code, used as a structured field in startup logs.
    pub fn code(&self) -> &'static str {
        match self {
            ChadError::Config(_) => "CONFIG_ERROR",
            ChadError::Validation { .. } => "CONFIG_INVALID",
        }
    }
}

pub type Result<T> = std::result::Result<T, ChadError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_lists_every_problem() {
        let err = ChadError::Validation {
            problems: vec!["irc.nick is empty".into(), "reply.max_lines must be >= 1".into()],
        };
        let text = err.to_string();
        assert!(text.contains("irc.nick is empty"));
        assert!(text.contains("reply.max_lines must be >= 1"));
        assert_eq!(err.code(), "CONFIG_INVALID");
    }
}
