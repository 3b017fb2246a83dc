#![deny(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

mod command;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use command::{
    ChatInput, ChatStrategy, CommandStrategy, InfoStrategy, InitStrategy, ModelsStrategy,
    SlackInput, SlackStrategy, TelegramInput, TelegramStrategy, VersionStrategy,
};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::LocalTime;

#[derive(Parser)]
#[command(name = "parley")]
#[command(about = "Multi-turn chat with an OpenAI-compatible model", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat interactively in the terminal
    Chat {
        /// Model to use
        #[arg(short = 'm', long)]
        model: Option<String>,

        /// Sampling temperature, 0.0 to 1.0
        #[arg(short = 't', long)]
        temperature: Option<f32>,

        /// System role (persona) for a new chat
        #[arg(short = 'r', long)]
        role: Option<String>,

        /// Print token usage after each reply
        #[arg(short = 'u', long)]
        usage: bool,

        /// Print the message list before each call
        #[arg(short = 'd', long)]
        debug: bool,

        /// Do not save the chat on exit
        #[arg(short = 'n', long)]
        no_store: bool,

        /// Directory to store chats in
        #[arg(short = 'f', long)]
        directory: Option<PathBuf>,

        /// Continue a saved chat
        #[arg(long)]
        resume: Option<PathBuf>,

        /// List available models and exit
        #[arg(short = 'l', long)]
        list_models: bool,
    },
    /// Run the Telegram bot
    Telegram {
        /// Bot token (overrides config)
        #[arg(long)]
        token: Option<String>,

        /// Allowed chat IDs (overrides config)
        #[arg(long, value_delimiter = ',')]
        allow_from: Option<Vec<String>>,

        /// Model to use
        #[arg(short = 'm', long)]
        model: Option<String>,

        /// Directory to store chats in
        #[arg(short = 'f', long)]
        directory: Option<PathBuf>,
    },
    /// Run the Slack Events API server
    Slack {
        /// Address to listen on (overrides config)
        #[arg(long)]
        listen: Option<String>,

        /// Model to use
        #[arg(short = 'm', long)]
        model: Option<String>,

        /// Directory to store chats in
        #[arg(short = 'f', long)]
        directory: Option<PathBuf>,
    },
    /// List models offered by the configured endpoint
    Models,
    /// Initialize configuration
    Init,
    /// Show configuration
    Info,
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_timer(LocalTime::rfc_3339())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Chat {
            model,
            temperature,
            role,
            usage,
            debug,
            no_store,
            directory,
            resume,
            list_models,
        } => {
            ChatStrategy
                .execute(ChatInput {
                    model,
                    temperature,
                    role,
                    show_usage: usage,
                    debug,
                    no_store,
                    directory,
                    resume,
                    list_models,
                })
                .await?;
        }
        Commands::Telegram {
            token,
            allow_from,
            model,
            directory,
        } => {
            TelegramStrategy
                .execute(TelegramInput {
                    token,
                    allow_from,
                    model,
                    directory,
                })
                .await?;
        }
        Commands::Slack {
            listen,
            model,
            directory,
        } => {
            SlackStrategy
                .execute(SlackInput {
                    listen,
                    model,
                    directory,
                })
                .await?;
        }
        Commands::Models => ModelsStrategy.execute(()).await?,
        Commands::Init => InitStrategy.execute(()).await?,
        Commands::Info => InfoStrategy.execute(()).await?,
        Commands::Version => VersionStrategy.execute(()).await?,
    }

    Ok(())
}
