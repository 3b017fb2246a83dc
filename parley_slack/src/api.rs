//! Slack Web API calls and the conversation seams built on them.

use async_trait::async_trait;
use parley_core::{Conversation, OutboundChannel, Rehydrate, Role, Turn};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::{Result, SlackError};

const DEFAULT_BASE_URL: &str = "https://slack.com/api";

/// Most thread messages fetched when rebuilding a conversation.
const REPLIES_LIMIT: &str = "200";

/// One entry of a `conversations.replies` listing.
#[derive(Debug, Clone, Deserialize)]
pub struct SlackMessage {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub text: String,
    pub bot_id: Option<String>,
    pub subtype: Option<String>,
    pub ts: Option<String>,
}

impl SlackMessage {
    /// Turn for this message: bot posts are the assistant, the rest the
    /// user. Non-message entries and empty texts are skipped.
    #[must_use]
    pub fn to_turn(&self) -> Option<Turn> {
        if self.kind != "message" || self.text.trim().is_empty() {
            return None;
        }
        let role = if self.bot_id.is_some() {
            Role::Assistant
        } else {
            Role::User
        };
        Some(Turn::new(role, self.text.clone()))
    }
}

#[derive(Clone)]
pub struct SlackClient {
    http: Client,
    token: String,
    base_url: String,
}

impl SlackClient {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            token: token.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Every message of the thread rooted at `ts`, oldest first.
    pub async fn replies(&self, channel: &str, ts: &str) -> Result<Vec<SlackMessage>> {
        let url = url::Url::parse_with_params(
            &format!("{}/conversations.replies", self.base_url),
            &[("channel", channel), ("ts", ts), ("limit", REPLIES_LIMIT)],
        )
        .map_err(|e| SlackError::Api(format!("Invalid API URL: {e}")))?;

        let response = self
            .http
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await?;
        let body = check_ok(response.json().await?)?;

        serde_json::from_value(body["messages"].clone())
            .map_err(|e| SlackError::Payload(format!("conversations.replies: {e}")))
    }

    pub async fn post_message(&self, channel: &str, thread_ts: &str, text: &str) -> Result<()> {
        let response = self
            .http
            .post(format!("{}/chat.postMessage", self.base_url))
            .bearer_auth(&self.token)
            .json(&json!({
                "channel": channel,
                "thread_ts": thread_ts,
                "text": text,
            }))
            .send()
            .await?;
        check_ok(response.json().await?)?;
        Ok(())
    }

    /// Answer a slash command through its `response_url`.
    pub async fn respond(&self, response_url: &str, text: &str) -> Result<()> {
        let response = self
            .http
            .post(response_url)
            .json(&json!({
                "response_type": "ephemeral",
                "text": text,
            }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(SlackError::Api(format!(
                "response_url returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}

/// Web API bodies carry `ok` and, on failure, an `error` code.
fn check_ok(body: Value) -> Result<Value> {
    if body["ok"].as_bool().unwrap_or(false) {
        Ok(body)
    } else {
        Err(SlackError::Api(
            body["error"].as_str().unwrap_or("unknown_error").to_string(),
        ))
    }
}

/// A message thread: where replies go and where lost history comes from.
#[derive(Clone)]
pub struct SlackThread {
    client: SlackClient,
    channel: String,
    thread_ts: String,
}

impl SlackThread {
    #[must_use]
    pub fn new(client: SlackClient, channel: impl Into<String>, thread_ts: impl Into<String>) -> Self {
        Self {
            client,
            channel: channel.into(),
            thread_ts: thread_ts.into(),
        }
    }
}

#[async_trait]
impl OutboundChannel for SlackThread {
    async fn send(&self, chunk: &str) -> anyhow::Result<()> {
        self.client
            .post_message(&self.channel, &self.thread_ts, chunk)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl Rehydrate for SlackThread {
    /// The newest message is the one being answered, so it is skipped.
    async fn rehydrate(&self, conversation: &mut Conversation) -> anyhow::Result<()> {
        let history = self.client.replies(&self.channel, &self.thread_ts).await?;
        let added = conversation.replay(&history, true, SlackMessage::to_turn);

        if added > 0 {
            info!(
                "Reloaded {added} turns from thread {} in {}",
                self.thread_ts, self.channel
            );
        } else {
            debug!("No earlier messages in thread {}", self.thread_ts);
        }
        Ok(())
    }
}

/// Reply target of a slash command.
pub struct ResponseUrl {
    client: SlackClient,
    url: String,
}

impl ResponseUrl {
    #[must_use]
    pub fn new(client: SlackClient, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl OutboundChannel for ResponseUrl {
    async fn send(&self, chunk: &str) -> anyhow::Result<()> {
        self.client.respond(&self.url, chunk).await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn history() -> Vec<SlackMessage> {
        serde_json::from_value(json!([
            {"type": "message", "user": "U1", "text": "What is Rust?", "ts": "1.0"},
            {"type": "message", "bot_id": "B1", "text": "A systems language.", "ts": "2.0"},
            {"type": "message", "user": "U1", "text": "Is it fast?", "ts": "3.0"},
            {"type": "message", "user": "U1", "text": "Very fast?", "ts": "4.0"},
        ]))
        .unwrap()
    }

    #[test]
    fn classifies_bot_posts_as_assistant() {
        let turns: Vec<Turn> = history().iter().filter_map(SlackMessage::to_turn).collect();
        assert_eq!(turns[0].role(), Role::User);
        assert_eq!(turns[1].role(), Role::Assistant);
    }

    #[test]
    fn skips_non_messages_and_blank_text() {
        let entries: Vec<SlackMessage> = serde_json::from_value(json!([
            {"type": "channel_join", "text": "joined"},
            {"type": "message", "text": "  "},
            {"type": "message"},
        ]))
        .unwrap();
        assert!(entries.iter().all(|entry| entry.to_turn().is_none()));
    }

    #[test]
    fn replay_skips_latest_message() {
        let mut conversation = Conversation::with_system_role("You are terse");
        let added = conversation.replay(&history(), true, SlackMessage::to_turn);

        assert_eq!(added, 3);
        assert_eq!(conversation.len(), 4);
        assert_eq!(conversation.get_entry(3).content, "Is it fast?");
    }

    #[test]
    fn check_ok_surfaces_error_code() {
        let err = check_ok(json!({"ok": false, "error": "channel_not_found"})).unwrap_err();
        assert_eq!(err.to_string(), "Slack API error: channel_not_found");
        assert!(check_ok(json!({"ok": true})).is_ok());
    }

    #[test]
    fn base_url_is_normalized() {
        let client = SlackClient::new("xoxb-test").with_base_url("http://localhost:9999/api/");
        assert_eq!(client.base_url, "http://localhost:9999/api");
    }
}
