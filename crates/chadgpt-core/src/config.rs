use std::path::Path;

use figment::{
    providers::{Env, Format, Toml, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{ChadError, Result};
use crate::types::Role;

pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";
pub const DEFAULT_PORT: u16 = 6667;
pub const DEFAULT_MAX_LINES: usize = 7;
pub const DEFAULT_MAX_LINE_BYTES: usize = 400;
pub const ENV_PREFIX: &str = "CHADGPT_";

/// Top-level config (config.yaml or config.toml + CHADGPT_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChadConfig {
    pub irc: IrcConfig,
    #[serde(alias = "openai")]
    pub completion: CompletionConfig,
    #[serde(default)]
    pub reply: ReplyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IrcConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub tls: bool,
    /// Preferred nickname. The working nickname may differ after collisions.
    pub nick: String,
    /// Ident sent in USER. Defaults to the nickname.
    pub username: Option<String>,
    #[serde(default = "default_gecos")]
    pub gecos: String,
    /// Server password sent as PASS before registration.
    pub password: Option<String>,
    /// Take the preferred nickname back when its holder quits or renames.
    #[serde(default, alias = "keepnick")]
    pub keep_nick: bool,
    /// Channels joined after registration, in listed order.
    #[serde(default)]
    pub channels: Vec<String>,
    /// Glob patterns (`*`, `?`) matched against sender nicknames.
    #[serde(default)]
    pub ignored_nicks: Vec<String>,
    /// Ceiling on consecutive nick-collision fallbacks. Unset means unbounded.
    #[serde(default)]
    pub nick_retry_limit: Option<u32>,
    /// Longest PRIVMSG text sent in one line before splitting.
    #[serde(default = "default_max_line_bytes")]
    pub max_line_bytes: usize,
}

impl IrcConfig {
    pub fn username(&self) -> &str {
        self.username.as_deref().unwrap_or(&self.nick)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Anthropic,
    #[serde(rename = "openai")]
    OpenAi,
}

impl ProviderKind {
    fn api_key_env(&self) -> &'static str {
        match self {
            ProviderKind::Anthropic => "ANTHROPIC_API_KEY",
            ProviderKind::OpenAi => "OPENAI_API_KEY",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    #[serde(default)]
    pub provider: ProviderKind,
    /// API key, or an env var reference like `${ANTHROPIC_API_KEY}`.
    /// Falls back to the provider's conventional env var when unset.
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    pub temperature: Option<f32>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    pub top_p: Option<f32>,
    pub frequency_penalty: Option<f32>,
    pub presence_penalty: Option<f32>,
    /// Prompt templates, rendered and sent in this order.
    #[serde(default)]
    pub messages: Vec<PromptTemplateConfig>,
}

impl CompletionConfig {
    /// Resolve the API key from config, an `${ENV}` reference, or the provider default env var.
    pub fn resolve_api_key(&self) -> Option<String> {
        match self.api_key.as_deref() {
            Some(key) if key.starts_with("${") && key.ends_with('}') => {
                std::env::var(&key[2..key.len() - 1]).ok()
            }
            Some(key) => Some(key.to_string()),
            None => std::env::var(self.provider.api_key_env()).ok(),
        }
        .filter(|k| !k.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptTemplateConfig {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyConfig {
    #[serde(default = "default_max_lines")]
    pub max_lines: usize,
}

impl Default for ReplyConfig {
    fn default() -> Self {
        Self {
            max_lines: DEFAULT_MAX_LINES,
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_gecos() -> String {
    "chadgpt".to_string()
}
fn default_max_line_bytes() -> usize {
    DEFAULT_MAX_LINE_BYTES
}
fn default_model() -> String {
    "claude-sonnet-4-6".to_string()
}
fn default_max_tokens() -> u32 {
    512
}
fn default_max_lines() -> usize {
    DEFAULT_MAX_LINES
}

impl ChadConfig {
    /// Load config from a YAML or TOML file (chosen by extension) with
    /// CHADGPT_* env var overrides. Nested keys are separated by `__`,
    /// e.g. `CHADGPT_IRC__NICK`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ChadError::Config(format!(
                "config file not found: {}",
                path.display()
            )));
        }

        let figment = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Figment::new().merge(Toml::file(path)),
            _ => Figment::new().merge(Yaml::file(path)),
        };

        Self::from_figment(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: ChadConfig = figment
            .extract()
            .map_err(|e| ChadError::Config(e.to_string()))?;
        tracing::debug!(
            host = %config.irc.host,
            nick = %config.irc.nick,
            channels = config.irc.channels.len(),
            templates = config.completion.messages.len(),
            "configuration loaded"
        );
        Ok(config)
    }

    /// Check everything that would otherwise fail later at runtime.
    /// All problems are collected so the operator sees them in one pass.
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();

        if self.irc.host.trim().is_empty() {
            problems.push("irc.host is empty".to_string());
        }
        if self.irc.port == 0 {
            problems.push("irc.port must be non-zero".to_string());
        }
        if self.irc.nick.trim().is_empty() || self.irc.nick.contains(char::is_whitespace) {
            problems.push(format!("irc.nick `{}' is not a valid nickname", self.irc.nick));
        }
        if self.irc.nick_retry_limit == Some(0) {
            problems.push("irc.nick_retry_limit must be >= 1 when set".to_string());
        }
        if self.irc.max_line_bytes < 32 {
            problems.push("irc.max_line_bytes must be >= 32".to_string());
        }
        for channel in &self.irc.channels {
            if channel.is_empty() || channel.contains(char::is_whitespace) {
                problems.push(format!("irc.channels entry `{channel}' is not a valid channel"));
            }
        }
        if self.completion.messages.is_empty() {
            problems.push("completion.messages must contain at least one template".to_string());
        }
        if self.completion.max_tokens == 0 {
            problems.push("completion.max_tokens must be >= 1".to_string());
        }
        if self.completion.resolve_api_key().is_none() {
            problems.push(format!(
                "no API key: set completion.api_key or {}",
                self.completion.provider.api_key_env()
            ));
        }
        if self.reply.max_lines == 0 {
            problems.push("reply.max_lines must be >= 1".to_string());
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ChadError::Validation { problems })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r##"
irc:
  host: irc.example.net
  nick: chadgpt
  keepnick: true
  channels: ["#one", "#two"]
  ignored_nicks: ["*bot"]
openai:
  api_key: sk-test
  model: test-model
  temperature: 0.5
  frequency_penalty: 0.1
  messages:
    - role: system
      content: "You are in {{channel}}."
    - role: user
      content: "{{message}}"
"##;

    fn sample() -> ChadConfig {
        ChadConfig::from_figment(Figment::from(Yaml::string(SAMPLE))).unwrap()
    }

    #[test]
    fn parses_yaml_with_aliases_and_defaults() {
        let cfg = sample();
        assert_eq!(cfg.irc.port, DEFAULT_PORT);
        assert!(cfg.irc.keep_nick);
        assert!(!cfg.irc.tls);
        assert_eq!(cfg.irc.channels, vec!["#one", "#two"]);
        assert_eq!(cfg.irc.username(), "chadgpt");
        assert_eq!(cfg.irc.nick_retry_limit, None);
        assert_eq!(cfg.completion.provider, ProviderKind::Anthropic);
        assert_eq!(cfg.completion.messages.len(), 2);
        assert_eq!(cfg.completion.messages[0].role, Role::System);
        assert_eq!(cfg.completion.frequency_penalty, Some(0.1));
        assert_eq!(cfg.completion.presence_penalty, None);
        assert_eq!(cfg.reply.max_lines, DEFAULT_MAX_LINES);
    }

    #[test]
    fn sample_is_valid() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn validation_collects_all_problems() {
        let mut cfg = sample();
        cfg.irc.nick = String::new();
        cfg.completion.messages.clear();
        cfg.reply.max_lines = 0;
        match cfg.validate() {
            Err(ChadError::Validation { problems }) => assert_eq!(problems.len(), 3),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn missing_irc_section_is_a_config_error() {
        let err = ChadConfig::from_figment(Figment::from(Yaml::string("reply: {}"))).unwrap_err();
        assert_eq!(err.code(), "CONFIG_ERROR");
    }

    #[test]
    fn api_key_env_reference_is_resolved() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("CHADGPT_TEST_KEY", "from-env");
            let mut cfg = sample();
            cfg.completion.api_key = Some("${CHADGPT_TEST_KEY}".into());
            assert_eq!(cfg.completion.resolve_api_key().as_deref(), Some("from-env"));
            Ok(())
        });
    }

    #[test]
    fn env_overrides_nested_keys() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("config.yaml", SAMPLE)?;
            jail.set_env("CHADGPT_IRC__NICK", "otherbot");
            jail.set_env("CHADGPT_REPLY__MAX_LINES", "3");
            let cfg = ChadConfig::load("config.yaml").map_err(|e| e.to_string())?;
            assert_eq!(cfg.irc.nick, "otherbot");
            assert_eq!(cfg.reply.max_lines, 3);
            Ok(())
        });
    }

    #[test]
    fn toml_files_are_supported() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                r##"
[irc]
host = "irc.example.net"
nick = "chadgpt"

[completion]
provider = "openai"
api_key = "sk-test"

[[completion.messages]]
role = "user"
content = "{{message}}"
"##,
            )?;
            let cfg = ChadConfig::load("config.toml").map_err(|e| e.to_string())?;
            assert_eq!(cfg.completion.provider, ProviderKind::OpenAi);
            Ok(())
        });
    }

    #[test]
    fn missing_file_is_reported() {
        let err = ChadConfig::load("/nonexistent/chadgpt.yaml").unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }
}
