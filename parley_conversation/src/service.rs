//! Conversation controls shared by every bot front-end.
//!
//! A front-end turns its platform event into a [`TenantKey`] and calls one
//! of these methods; the returned chunks go straight to the platform's send
//! primitive.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Local;
use parley_core::{
    ConversationRegistry, LLMProvider, Rehydrate, TenantKey, split_fixed, split_lines,
    util::preview,
};
use serde::Serialize;
use tracing::info;

use crate::{ChatStore, TurnReply, TurnTaker};

pub struct ChatService<P = Arc<dyn LLMProvider>>
where
    P: Send + Sync,
{
    registry: ConversationRegistry,
    turn_taker: TurnTaker<P>,
    store: ChatStore,
    default_role: String,
    chunk_limit: usize,
}

impl<P> ChatService<P>
where
    P: LLMProvider + Send + Sync,
{
    pub fn new(
        turn_taker: TurnTaker<P>,
        store: ChatStore,
        default_role: impl Into<String>,
        chunk_limit: usize,
    ) -> Self {
        Self {
            registry: ConversationRegistry::new(),
            turn_taker,
            store,
            default_role: default_role.into(),
            chunk_limit: chunk_limit.max(1),
        }
    }

    #[must_use]
    pub const fn registry(&self) -> &ConversationRegistry {
        &self.registry
    }

    #[must_use]
    pub fn default_role(&self) -> &str {
        &self.default_role
    }

    /// Run one turn for `key` and return the reply split into line-preserving
    /// chunks. The tenant's lock is held for the whole call.
    pub async fn converse(
        &self,
        key: &TenantKey,
        text: &str,
        history: Option<&dyn Rehydrate>,
    ) -> anyhow::Result<Vec<String>> {
        let reply = self.take_turn(key, text, history).await?;
        Ok(split_lines(&reply.text, self.chunk_limit))
    }

    pub async fn take_turn(
        &self,
        key: &TenantKey,
        text: &str,
        history: Option<&dyn Rehydrate>,
    ) -> anyhow::Result<TurnReply> {
        let mut conversation = self
            .registry
            .get_or_create(key, &self.default_role, history)
            .await?;

        info!("[{key}] user asks: {}", preview(text, 80));
        let reply = self.turn_taker.take_turn(&mut conversation, text).await?;
        info!("[{key}] assistant responds: {}", preview(&reply.text, 80));

        Ok(reply)
    }

    /// Start a new conversation for `key`, with `role` as persona or the
    /// default one. Returns the persona now in effect.
    pub async fn reset(&self, key: &TenantKey, role: Option<&str>) -> anyhow::Result<String> {
        let role = role.unwrap_or(&self.default_role).to_string();
        let mut conversation = self
            .registry
            .get_or_create(key, &self.default_role, None)
            .await?;
        conversation.reset(role.clone());
        info!("[{key}] new conversation");
        Ok(role)
    }

    pub async fn system_role(&self, key: &TenantKey) -> anyhow::Result<String> {
        let conversation = self
            .registry
            .get_or_create(key, &self.default_role, None)
            .await?;
        Ok(conversation.system_role().unwrap_or_default().to_string())
    }

    /// The conversation as indented JSON, cut into fixed-width chunks.
    pub async fn report(&self, key: &TenantKey) -> anyhow::Result<Vec<String>> {
        let messages = {
            let conversation = self
                .registry
                .get_or_create(key, &self.default_role, None)
                .await?;
            conversation.to_message_list()
        };
        let json = to_indented_json(&messages)?;
        Ok(split_fixed(&json, self.chunk_limit))
    }

    pub async fn save(&self, key: &TenantKey) -> anyhow::Result<PathBuf> {
        let conversation = self
            .registry
            .get_or_create(key, &self.default_role, None)
            .await?;
        self.store.write(&conversation, Local::now())
    }

    /// One line per active conversation with its completed exchanges.
    pub async fn chat_summaries(&self) -> Vec<String> {
        self.registry
            .summaries()
            .await
            .into_iter()
            .map(|(key, turns)| format!("Chat {key} with {turns} turns"))
            .collect()
    }
}

/// JSON with four-space indentation.
fn to_indented_json<T: Serialize>(value: &T) -> anyhow::Result<String> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut serializer)?;
    Ok(String::from_utf8(buf)?)
}
