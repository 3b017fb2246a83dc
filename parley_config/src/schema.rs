use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

use parley_core::{
    DEFAULT_CHUNK_LIMIT,
    util::{DEFAULT_MODEL, DEFAULT_SYSTEM_ROLE, DEFAULT_TEMPERATURE},
};

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub defaults: ChatDefaults,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub slack: SlackConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ChatDefaults {
    #[serde(default = "ChatDefaults::default_model")]
    pub model: String,
    #[serde(default = "ChatDefaults::default_temperature")]
    pub temperature: f32,
    #[serde(default = "ChatDefaults::default_system_role")]
    pub system_role: String,
    #[serde(default = "ChatDefaults::default_chunk_limit")]
    pub chunk_limit: usize,
}

impl Default for ChatDefaults {
    fn default() -> Self {
        Self {
            model: Self::default_model(),
            temperature: Self::default_temperature(),
            system_role: Self::default_system_role(),
            chunk_limit: Self::default_chunk_limit(),
        }
    }
}

impl ChatDefaults {
    fn default_model() -> String {
        DEFAULT_MODEL.to_string()
    }

    const fn default_temperature() -> f32 {
        DEFAULT_TEMPERATURE
    }

    fn default_system_role() -> String {
        DEFAULT_SYSTEM_ROLE.to_string()
    }

    const fn default_chunk_limit() -> usize {
        DEFAULT_CHUNK_LIMIT
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub openai: ProviderConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProviderConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "ProviderConfig::default_base_url")]
    pub base_url: String,
    #[serde(default = "ProviderConfig::default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: Self::default_base_url(),
            timeout_secs: Self::default_timeout_secs(),
        }
    }
}

impl ProviderConfig {
    fn default_base_url() -> String {
        "https://api.openai.com/v1".to_string()
    }

    const fn default_timeout_secs() -> u64 {
        120
    }
}

/// Terminal chat settings.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ChatConfig {
    #[serde(default = "ChatConfig::default_directory")]
    pub directory: PathBuf,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            directory: Self::default_directory(),
        }
    }
}

impl ChatConfig {
    fn default_directory() -> PathBuf {
        PathBuf::from("chats")
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TelegramConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub token: String,
    /// Chat IDs allowed to talk to the bot. Empty allows everyone.
    #[serde(default)]
    pub allow_from: Vec<String>,
    #[serde(default = "TelegramConfig::default_directory")]
    pub directory: PathBuf,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            token: String::new(),
            allow_from: Vec::new(),
            directory: Self::default_directory(),
        }
    }
}

impl TelegramConfig {
    fn default_directory() -> PathBuf {
        PathBuf::from("telegram_chats")
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SlackConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub bot_token: String,
    #[serde(default)]
    pub signing_secret: String,
    #[serde(default = "SlackConfig::default_listen")]
    pub listen: String,
    #[serde(default = "SlackConfig::default_directory")]
    pub directory: PathBuf,
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bot_token: String::new(),
            signing_secret: String::new(),
            listen: Self::default_listen(),
            directory: Self::default_directory(),
        }
    }
}

impl SlackConfig {
    fn default_listen() -> String {
        "0.0.0.0:3000".to_string()
    }

    fn default_directory() -> PathBuf {
        PathBuf::from("slack_chats")
    }
}

impl Config {
    pub fn config_dir() -> anyhow::Result<PathBuf> {
        Ok(dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Cannot find home directory"))?
            .join("parley"))
    }

    pub fn config_path() -> anyhow::Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    /// Load `~/parley/config.json`, falling back to defaults when the file
    /// is absent. Empty secrets are then filled from the environment.
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path()?;

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Self::from_json(&content)?
        } else {
            warn!(
                "Config file not found at: {}. Using defaults; run 'parley init' to create one.",
                config_path.display()
            );
            Self::default()
        };

        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    pub fn from_json(content: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Fill empty secrets from `lookup` (the process environment in
    /// [`Config::load`]).
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let fill = |slot: &mut String, name: &str| {
            if slot.is_empty() {
                if let Some(value) = lookup(name).filter(|v| !v.is_empty()) {
                    *slot = value;
                }
            }
        };

        fill(&mut self.providers.openai.api_key, "OPENAI_API_KEY");
        fill(&mut self.telegram.token, "TELEGRAM_BOT_TOKEN");
        fill(&mut self.slack.bot_token, "SLACK_BOT_TOKEN");
        fill(&mut self.slack.signing_secret, "SLACK_SIGNING_SECRET");
    }

    pub fn ensure_config_dir() -> anyhow::Result<PathBuf> {
        let config_dir = Self::config_dir()?;
        std::fs::create_dir_all(&config_dir)?;
        Ok(config_dir)
    }

    pub fn create_config() -> anyhow::Result<()> {
        let config_dir = Self::ensure_config_dir()?;
        let config_path = config_dir.join("config.json");

        if config_path.exists() {
            anyhow::bail!(
                "Config file already exists at: {}. Please edit it directly.",
                config_path.display()
            );
        }

        let template = serde_json::to_string_pretty(&Self::default())?;
        std::fs::write(&config_path, template)?;

        println!("Created config file at: {}", config_path.display());
        println!();
        println!("Next steps:");
        println!("   1. Add your API key under providers.openai.api_key (or set OPENAI_API_KEY)");
        println!("   2. Run 'parley chat' to start a conversation in the terminal");
        println!("   3. Fill in the telegram or slack section to run a bot");
        println!();
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = Config::from_json("{}").unwrap();
        assert_eq!(config.defaults.model, DEFAULT_MODEL);
        assert!((config.defaults.temperature - 0.6).abs() < f32::EPSILON);
        assert_eq!(config.defaults.system_role, DEFAULT_SYSTEM_ROLE);
        assert_eq!(config.defaults.chunk_limit, 1900);
        assert_eq!(config.chat.directory, PathBuf::from("chats"));
        assert_eq!(config.slack.listen, "0.0.0.0:3000");
        assert!(!config.telegram.enabled);
    }

    #[test]
    fn partial_sections_keep_field_defaults() {
        let config = Config::from_json(
            r#"{"defaults": {"model": "gpt-4"}, "telegram": {"enabled": true, "token": "abc"}}"#,
        )
        .unwrap();
        assert_eq!(config.defaults.model, "gpt-4");
        assert_eq!(config.defaults.system_role, DEFAULT_SYSTEM_ROLE);
        assert!(config.telegram.enabled);
        assert_eq!(config.telegram.directory, PathBuf::from("telegram_chats"));
    }

    #[test]
    fn env_fills_only_empty_secrets() {
        let mut config = Config::from_json(r#"{"telegram": {"token": "from-file"}}"#).unwrap();
        config.apply_env(|name| Some(format!("env-{name}")));

        assert_eq!(config.providers.openai.api_key, "env-OPENAI_API_KEY");
        assert_eq!(config.telegram.token, "from-file");
        assert_eq!(config.slack.signing_secret, "env-SLACK_SIGNING_SECRET");
    }

    #[test]
    fn template_round_trips() {
        let template = serde_json::to_string_pretty(&Config::default()).unwrap();
        let config = Config::from_json(&template).unwrap();
        assert_eq!(config.providers.openai.timeout_secs, 120);
    }
}
