use std::path::PathBuf;

use crate::command::CommandStrategy;
use parley_config::Config;
use parley_slack::{SlackBot, SlackClient};
use tracing::info;

use super::chat_service;

/// Input for the Slack server command.
pub struct SlackInput {
    /// Optional listen address (overrides config)
    pub listen: Option<String>,
    /// Optional model (overrides config)
    pub model: Option<String>,
    /// Optional chat directory (overrides config)
    pub directory: Option<PathBuf>,
}

/// Strategy for running the Slack Events API server.
pub struct SlackStrategy;

impl CommandStrategy for SlackStrategy {
    type Input = SlackInput;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let config = Config::load()?;
        let slack = &config.slack;

        if !slack.enabled {
            anyhow::bail!("Slack is not enabled in config. Set \"slack.enabled\": true");
        }
        if slack.bot_token.is_empty() {
            anyhow::bail!(
                "Slack bot token not configured. Set \"slack.bot_token\" in config or SLACK_BOT_TOKEN"
            );
        }
        if slack.signing_secret.is_empty() {
            anyhow::bail!(
                "Slack signing secret not configured. Set \"slack.signing_secret\" in config or SLACK_SIGNING_SECRET"
            );
        }

        let listen = input.listen.unwrap_or_else(|| slack.listen.clone());
        let directory = input.directory.unwrap_or_else(|| slack.directory.clone());

        info!("Starting Slack bot...");
        let chat = chat_service(&config, input.model, &directory)?;
        let bot = SlackBot::new(
            SlackClient::new(slack.bot_token.clone()),
            chat,
            &slack.signing_secret,
            config.defaults.chunk_limit,
        );

        bot.run(&listen).await
    }
}
