//! Interactive terminal chat.

use std::path::PathBuf;

use parley_config::Config;
use parley_conversation::{ChatStore, ReplOptions, ReplSession, TurnTaker};
use parley_core::Conversation;
use tracing::info;

use super::openai_provider;

/// Input parameters for the Chat command strategy.
#[derive(Debug, Clone, Default)]
pub struct ChatInput {
    /// Model override
    pub model: Option<String>,
    /// Temperature override
    pub temperature: Option<f32>,
    /// System role override
    pub role: Option<String>,
    pub show_usage: bool,
    pub debug: bool,
    /// Skip saving the chat on exit
    pub no_store: bool,
    /// Chat directory override
    pub directory: Option<PathBuf>,
    /// Saved chat to continue
    pub resume: Option<PathBuf>,
    /// Print the model list instead of chatting
    pub list_models: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct ChatStrategy;

impl super::CommandStrategy for ChatStrategy {
    type Input = ChatInput;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let config = Config::load()?;
        let provider = openai_provider(&config)?;

        if input.list_models {
            for model in provider.list_models().await? {
                println!("{model}");
            }
            return Ok(());
        }

        let conversation = match &input.resume {
            Some(path) => {
                let mut conversation = ChatStore::load(path)?;
                if let Some(role) = &input.role {
                    conversation.set_system_role(role.clone());
                }
                info!(
                    "Resuming {} with {} turns",
                    path.display(),
                    conversation.turn_count()
                );
                conversation
            }
            None => Conversation::with_system_role(
                input
                    .role
                    .unwrap_or_else(|| config.defaults.system_role.clone()),
            ),
        };

        let model = input.model.unwrap_or_else(|| config.defaults.model.clone());
        let temperature = input.temperature.unwrap_or(config.defaults.temperature);
        info!("Chatting with {model} at temperature {temperature}");

        let store = (!input.no_store).then(|| {
            ChatStore::new(
                input
                    .directory
                    .unwrap_or_else(|| config.chat.directory.clone()),
            )
        });

        let session = ReplSession::new(
            TurnTaker::new(provider, model, temperature),
            conversation,
            ReplOptions {
                show_usage: input.show_usage,
                debug: input.debug,
                store,
            },
        );
        session.run().await?;

        Ok(())
    }
}
