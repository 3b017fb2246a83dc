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

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod chunk;
pub mod conversation;
pub mod registry;
pub mod util;

pub use chunk::{DEFAULT_CHUNK_LIMIT, split_fixed, split_lines};
pub use conversation::{ChatRecord, Conversation, ConversationError, Entry, Turn};
pub use registry::{
    ConversationGuard, ConversationRegistry, Rehydrate, SCOPE_PLACEHOLDER, SharedConversation,
    TenantKey,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The `{role, content}` record sent to the completion endpoint and written
/// to chat files.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct LLMResponse {
    pub content: String,
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

#[async_trait]
pub trait LLMProvider: Send + Sync {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        model: &str,
        temperature: f32,
    ) -> anyhow::Result<LLMResponse>;
}

#[async_trait]
impl<P: LLMProvider + ?Sized> LLMProvider for std::sync::Arc<P> {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        model: &str,
        temperature: f32,
    ) -> anyhow::Result<LLMResponse> {
        (**self).chat(messages, model, temperature).await
    }
}

/// Destination for reply chunks: a terminal, a chat, or a thread.
#[async_trait]
pub trait OutboundChannel: Send + Sync {
    async fn send(&self, chunk: &str) -> anyhow::Result<()>;

    /// Sends each chunk as its own message, in order. Stops at the first
    /// failed send.
    async fn send_chunks(&self, chunks: &[String]) -> anyhow::Result<()> {
        for chunk in chunks {
            self.send(chunk).await?;
        }
        Ok(())
    }
}
