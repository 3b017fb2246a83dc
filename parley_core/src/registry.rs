//! Per-tenant conversation registry.
//!
//! A single map from [`TenantKey`] to a conversation behind its own mutex.
//! The map lock is held only for lookup-or-create; the per-tenant lock is
//! what callers hold across a completion call, so messages for one tenant
//! queue up while other tenants proceed in parallel.
//!
//! Entries are never evicted. Memory grows with every tenant seen since
//! process start.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info};

use crate::Conversation;

/// Stand-in for a scope level a front-end does not use.
pub const SCOPE_PLACEHOLDER: &str = "-";

/// Ordered tuple of scope identifiers (user, channel, thread, server, ...)
/// that picks out one independent conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TenantKey(Vec<String>);

impl TenantKey {
    pub fn new<I, S>(scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(scopes.into_iter().map(Into::into).collect())
    }

    /// Build a key where missing scope levels become [`SCOPE_PLACEHOLDER`],
    /// keeping the depth fixed for a given front-end.
    pub fn from_optional<I, S>(scopes: I) -> Self
    where
        I: IntoIterator<Item = Option<S>>,
        S: Into<String>,
    {
        Self(
            scopes
                .into_iter()
                .map(|scope| scope.map_or_else(|| SCOPE_PLACEHOLDER.to_string(), Into::into))
                .collect(),
        )
    }

    #[must_use]
    pub fn scopes(&self) -> &[String] {
        &self.0
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for TenantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("/"))
    }
}

pub type SharedConversation = Arc<Mutex<Conversation>>;

/// Exclusive access to one tenant's conversation.
pub type ConversationGuard = OwnedMutexGuard<Conversation>;

/// Rebuilds a conversation from history the platform stores itself.
#[async_trait]
pub trait Rehydrate: Send + Sync {
    async fn rehydrate(&self, conversation: &mut Conversation) -> anyhow::Result<()>;
}

#[derive(Debug, Default)]
pub struct ConversationRegistry {
    conversations: Mutex<HashMap<TenantKey, SharedConversation>>,
}

impl ConversationRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the conversation for `key`, creating it with `default_role`
    /// as persona if this is the tenant's first access.
    pub async fn entry(&self, key: &TenantKey, default_role: &str) -> SharedConversation {
        let mut conversations = self.conversations.lock().await;
        if let Some(existing) = conversations.get(key) {
            return Arc::clone(existing);
        }

        let conversation = Arc::new(Mutex::new(Conversation::with_system_role(default_role)));
        conversations.insert(key.clone(), Arc::clone(&conversation));
        info!(
            "Created conversation for {key} ({} active)",
            conversations.len()
        );
        conversation
    }

    pub async fn get(&self, key: &TenantKey) -> Option<SharedConversation> {
        self.conversations.lock().await.get(key).cloned()
    }

    /// Lock the tenant's conversation, creating it if needed.
    ///
    /// When `rehydrate` is given and the conversation holds nothing but its
    /// persona, platform history is replayed into it before the guard is
    /// returned. Rehydration runs under the tenant lock, so concurrent first
    /// messages see a single rebuilt conversation. If it fails the error is
    /// returned and the next call tries again.
    pub async fn get_or_create(
        &self,
        key: &TenantKey,
        default_role: &str,
        rehydrate: Option<&dyn Rehydrate>,
    ) -> anyhow::Result<ConversationGuard> {
        let shared = self.entry(key, default_role).await;
        let mut guard = shared.lock_owned().await;

        if let Some(source) = rehydrate {
            if guard.is_fresh() {
                source.rehydrate(&mut *guard).await?;
                debug!("Rehydrated {key}: {} turns", guard.len());
            }
        }

        Ok(guard)
    }

    /// `(key, turn_count)` for every tenant, sorted by key.
    pub async fn summaries(&self) -> Vec<(TenantKey, usize)> {
        let entries: Vec<(TenantKey, SharedConversation)> = {
            let conversations = self.conversations.lock().await;
            conversations
                .iter()
                .map(|(key, conversation)| (key.clone(), Arc::clone(conversation)))
                .collect()
        };

        let mut summaries = Vec::with_capacity(entries.len());
        for (key, conversation) in entries {
            let turn_count = conversation.lock().await.turn_count();
            summaries.push((key, turn_count));
        }
        summaries.sort_by(|a, b| a.0.cmp(&b.0));
        summaries
    }

    pub async fn len(&self) -> usize {
        self.conversations.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.conversations.lock().await.is_empty()
    }
}
