use std::path::PathBuf;

use crate::command::CommandStrategy;
use parley_config::Config;
use parley_telegram::TelegramBot;
use tracing::info;

use super::chat_service;

/// Input for Telegram bot command.
pub struct TelegramInput {
    /// Optional bot token (overrides config)
    pub token: Option<String>,
    /// Optional allowed chat IDs (overrides config)
    pub allow_from: Option<Vec<String>>,
    /// Optional model (overrides config)
    pub model: Option<String>,
    /// Optional chat directory (overrides config)
    pub directory: Option<PathBuf>,
}

/// Strategy for running Telegram bot.
pub struct TelegramStrategy;

impl CommandStrategy for TelegramStrategy {
    type Input = TelegramInput;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let config = Config::load()?;

        if !config.telegram.enabled {
            anyhow::bail!("Telegram is not enabled in config. Set \"telegram.enabled\": true");
        }

        let token = if let Some(t) = input.token {
            t
        } else if !config.telegram.token.is_empty() {
            config.telegram.token.clone()
        } else {
            anyhow::bail!(
                "Telegram bot token not configured. Set \"telegram.token\" in config or TELEGRAM_BOT_TOKEN"
            );
        };

        let allow_from = input
            .allow_from
            .unwrap_or_else(|| config.telegram.allow_from.clone());
        let directory = input
            .directory
            .unwrap_or_else(|| config.telegram.directory.clone());

        info!("Starting Telegram bot...");
        let chat = chat_service(&config, input.model, &directory)?;
        let bot = TelegramBot::new(token, chat, &allow_from);

        info!("Telegram bot is running. Press Ctrl+C to stop.");
        bot.run().await?;

        Ok(())
    }
}
