//! Static strategy pattern for CLI commands.
//!
//! Each command is a separate strategy with its own input type, dispatched
//! statically from `main`.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use parley_config::Config;
use parley_conversation::{ChatService, ChatStore, TurnTaker};
use parley_core::LLMProvider;
use parley_providers::OpenAiProvider;
use tracing::info;

mod chat;
mod info;
mod init;
mod models;
mod slack;
mod telegram;
mod version;

pub use chat::{ChatInput, ChatStrategy};
pub use info::InfoStrategy;
pub use init::InitStrategy;
pub use models::ModelsStrategy;
pub use slack::{SlackInput, SlackStrategy};
pub use telegram::{TelegramInput, TelegramStrategy};
pub use version::VersionStrategy;

/// Build the completion client from the `providers.openai` section.
fn openai_provider(config: &Config) -> anyhow::Result<OpenAiProvider> {
    let settings = &config.providers.openai;
    if settings.api_key.is_empty() {
        anyhow::bail!(
            "OpenAI API key not configured. Set \"providers.openai.api_key\" in config or OPENAI_API_KEY"
        );
    }

    OpenAiProvider::new(settings.api_key.clone())
        .with_base_url(settings.base_url.clone())
        .with_timeout(Duration::from_secs(settings.timeout_secs))
}

/// Shared chat service for the bot front-ends.
fn chat_service(
    config: &Config,
    model: Option<String>,
    directory: &Path,
) -> anyhow::Result<Arc<ChatService>> {
    let provider: Arc<dyn LLMProvider> = Arc::new(openai_provider(config)?);
    let model = model.unwrap_or_else(|| config.defaults.model.clone());

    info!(
        "Using model {model} at temperature {}, saving chats to {}",
        config.defaults.temperature,
        directory.display()
    );

    Ok(Arc::new(ChatService::new(
        TurnTaker::new(provider, model, config.defaults.temperature),
        ChatStore::new(directory),
        config.defaults.system_role.clone(),
        config.defaults.chunk_limit,
    )))
}

/// Core trait defining the contract for all command strategies.
///
/// Each strategy defines its own input type via the associated type, so
/// adding a command only requires implementing this trait.
pub trait CommandStrategy: Send + Sync + 'static {
    /// The input type this strategy accepts.
    type Input;

    /// Execute the command with the given input.
    ///
    /// # Errors
    /// Returns an error if command execution fails.
    async fn execute(&self, input: Self::Input) -> anyhow::Result<()>;
}
