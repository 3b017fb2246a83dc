use parley_config::Config;
use parley_core::util::preview;

/// Strategy for displaying configuration information.
///
/// Secrets are masked; the system role is shortened.
#[derive(Debug, Clone, Copy)]
pub struct InfoStrategy;

impl super::CommandStrategy for InfoStrategy {
    type Input = ();

    async fn execute(&self, _input: Self::Input) -> anyhow::Result<()> {
        let config = Config::load()?;

        println!("=== parley Configuration ===\n");
        println!("File: {}\n", Config::config_path()?.display());

        println!("OpenAI:");
        println!("  API Key: {}", mask(&config.providers.openai.api_key));
        println!("  Base URL: {}", config.providers.openai.base_url);
        println!("  Timeout: {}s", config.providers.openai.timeout_secs);
        println!();

        println!("Chat Defaults:");
        println!("  Model: {}", config.defaults.model);
        println!("  Temperature: {}", config.defaults.temperature);
        println!("  System Role: {}", preview(&config.defaults.system_role, 60));
        println!("  Chunk Limit: {}", config.defaults.chunk_limit);
        println!("  Chat Directory: {}", config.chat.directory.display());
        println!();

        println!("Telegram:");
        println!("  Enabled: {}", config.telegram.enabled);
        println!("  Token: {}", mask(&config.telegram.token));
        if config.telegram.allow_from.is_empty() {
            println!("  Allow From: (empty - all chats allowed)");
        } else {
            println!("  Allow From: {}", config.telegram.allow_from.join(", "));
        }
        println!("  Chat Directory: {}", config.telegram.directory.display());
        println!();

        println!("Slack:");
        println!("  Enabled: {}", config.slack.enabled);
        println!("  Bot Token: {}", mask(&config.slack.bot_token));
        println!("  Signing Secret: {}", mask(&config.slack.signing_secret));
        println!("  Listen: {}", config.slack.listen);
        println!("  Chat Directory: {}", config.slack.directory.display());

        Ok(())
    }
}

fn mask(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.is_empty() {
        "(not set)".to_string()
    } else if chars.len() > 8 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}...{tail}")
    } else {
        "***".to_string()
    }
}
