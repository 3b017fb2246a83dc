use crate::{Command, Result};
use parley_conversation::ChatService;
use std::{sync::Arc, time::Duration};
use teloxide::prelude::*;
use tokio::time::sleep;
use tracing::{info, warn};

/// Telegram bot answering through a shared [`ChatService`]
#[derive(Clone)]
pub struct TelegramBot {
    /// Teloxide bot instance
    pub bot: Bot,
    /// Conversations, turn taking and storage
    pub chat: Arc<ChatService>,
    /// Allowed chat IDs; empty means everyone
    allowed_chats: Vec<i64>,
    /// Bot username, known once connected
    username: String,
}

impl TelegramBot {
    /// Create a new Telegram bot. Allow-list entries that are not chat ids
    /// are ignored.
    #[must_use]
    pub fn new(token: String, chat: Arc<ChatService>, allowed_chats: &[String]) -> Self {
        let allowed_chats = allowed_chats
            .iter()
            .filter_map(|s| s.trim().parse::<i64>().ok())
            .collect();

        Self {
            bot: Bot::new(token),
            chat,
            allowed_chats,
            username: String::new(),
        }
    }

    /// Check if a chat is allowed
    #[must_use]
    pub fn is_allowed(&self, chat_id: i64) -> bool {
        self.allowed_chats.is_empty() || self.allowed_chats.contains(&chat_id)
    }

    /// Username used to recognise `/command@username`; empty before `run`
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Test connection to Telegram API, retrying until it succeeds, and
    /// return the bot's username.
    /// Delay starts at 2s and grows by 2s per attempt up to 10s.
    async fn test_connection(&self) -> Result<String> {
        const INITIAL_DELAY_SECS: u64 = 2;
        const MAX_DELAY_SECS: u64 = 10;

        let mut attempt = 1u64;
        loop {
            match self.bot.get_me().await {
                Ok(bot_user) => {
                    let username = bot_user.user.username.clone().unwrap_or_default();
                    info!(
                        "Connected to Telegram API: @{} (id: {})",
                        if username.is_empty() { "no username" } else { username.as_str() },
                        bot_user.user.id
                    );
                    return Ok(username);
                }
                Err(e) => {
                    let delay_secs = (INITIAL_DELAY_SECS * attempt).min(MAX_DELAY_SECS);

                    warn!("Connection attempt {attempt} failed: {e}. Retrying in {delay_secs}s...");
                    if attempt == 1 {
                        warn!("Check network access to api.telegram.org and the bot token");
                    }

                    sleep(Duration::from_secs(delay_secs)).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Run the bot until Ctrl-C
    pub async fn run(mut self) -> Result<()> {
        use teloxide::dispatching::{Dispatcher, UpdateFilterExt};
        use teloxide::dptree;
        use teloxide::types::Update;

        self.username = self.test_connection().await?;

        if let Err(e) = self.bot.set_my_commands(Command::bot_commands()).await {
            warn!("Failed to register command list: {e}");
        }
        if self.allowed_chats.is_empty() {
            info!("No allow-list configured, answering every chat");
        }

        let bot = self.bot.clone();

        let schema = dptree::entry().branch(Update::filter_message().endpoint({
            let bot_clone = self.clone();
            move |_bot: Bot, msg: teloxide::types::Message| {
                let bot_clone = bot_clone.clone();
                async move { crate::handler::handle_message(bot_clone, msg).await }
            }
        }));

        Dispatcher::builder(bot, schema)
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_conversation::{ChatStore, TurnTaker};
    use parley_core::{ChatMessage, LLMProvider, LLMResponse};

    struct Silent;

    #[async_trait::async_trait]
    impl LLMProvider for Silent {
        async fn chat(
            &self,
            _messages: &[ChatMessage],
            _model: &str,
            _temperature: f32,
        ) -> anyhow::Result<LLMResponse> {
            anyhow::bail!("offline")
        }
    }

    fn service() -> Arc<ChatService> {
        let provider: Arc<dyn LLMProvider> = Arc::new(Silent);
        Arc::new(ChatService::new(
            TurnTaker::new(provider, "silent", 0.6),
            ChatStore::new("telegram_chats"),
            "You are a helpful assistant",
            1900,
        ))
    }

    #[test]
    fn empty_allow_list_admits_everyone() {
        let bot = TelegramBot::new("123:abc".to_string(), service(), &[]);
        assert!(bot.is_allowed(42));
        assert!(bot.is_allowed(-100_123));
    }

    #[test]
    fn allow_list_skips_garbage_entries() {
        let allowed = ["42".to_string(), "not-a-chat".to_string(), " -7 ".to_string()];
        let bot = TelegramBot::new("123:abc".to_string(), service(), &allowed);
        assert!(bot.is_allowed(42));
        assert!(bot.is_allowed(-7));
        assert!(!bot.is_allowed(43));
    }
}
