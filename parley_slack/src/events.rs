//! Events API and slash command endpoints.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use parley_core::{OutboundChannel, TenantKey, split_lines};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error, info, warn};

use crate::{ResponseUrl, Result, SlackBot, SlackError, SlackThread};

const TIMESTAMP_HEADER: &str = "x-slack-request-timestamp";
const SIGNATURE_HEADER: &str = "x-slack-signature";
const RETRY_HEADER: &str = "x-slack-retry-num";

/// Appended to slash command replies that act on a conversation.
pub const CHANNEL_SCOPE_NOTE: &str =
    "(applies to new channel-level chats only; threads keep their own conversation)";

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventEnvelope {
    UrlVerification { challenge: String },
    EventCallback { event: MessageEvent },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub user: Option<String>,
    pub channel: Option<String>,
    pub text: Option<String>,
    pub ts: Option<String>,
    pub thread_ts: Option<String>,
    pub bot_id: Option<String>,
    pub subtype: Option<String>,
}

impl MessageEvent {
    /// Thread the message belongs to; a top-level message starts its own.
    #[must_use]
    pub fn thread_ts(&self) -> Option<&str> {
        self.thread_ts.as_deref().or(self.ts.as_deref())
    }

    /// Plain user text message: no bot, no edits or joins, something to say.
    #[must_use]
    pub fn is_user_message(&self) -> bool {
        self.kind == "message"
            && self.bot_id.is_none()
            && self.subtype.is_none()
            && self.user.is_some()
            && self.channel.is_some()
            && self.thread_ts().is_some()
            && self.text.as_deref().is_some_and(|text| !text.trim().is_empty())
    }

    /// `(user, channel, thread)`
    #[must_use]
    pub fn tenant_key(&self) -> TenantKey {
        TenantKey::from_optional([
            self.user.as_deref(),
            self.channel.as_deref(),
            self.thread_ts(),
        ])
    }
}

/// Form body of a slash command request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlashCommand {
    pub command: String,
    pub text: String,
    pub user_id: String,
    pub channel_id: String,
    pub response_url: String,
}

impl SlashCommand {
    pub fn parse(body: &[u8]) -> Result<Self> {
        let mut command = Self::default();
        for (key, value) in url::form_urlencoded::parse(body) {
            let field = match &*key {
                "command" => &mut command.command,
                "text" => &mut command.text,
                "user_id" => &mut command.user_id,
                "channel_id" => &mut command.channel_id,
                "response_url" => &mut command.response_url,
                _ => continue,
            };
            *field = value.into_owned();
        }

        if command.command.is_empty() || command.response_url.is_empty() {
            return Err(SlackError::Payload(
                "slash command without command or response_url".to_string(),
            ));
        }
        Ok(command)
    }

    /// Slash commands carry no thread, so they address the channel-level
    /// conversation `(user, channel, "-")`.
    #[must_use]
    pub fn tenant_key(&self) -> TenantKey {
        TenantKey::from_optional([
            Some(self.user_id.as_str()),
            Some(self.channel_id.as_str()),
            None,
        ])
    }
}

pub fn router(bot: SlackBot) -> Router {
    Router::new()
        .route("/slack/events", post(events))
        .route("/slack/commands", post(commands))
        .with_state(bot)
}

fn header<'a>(headers: &'a HeaderMap, name: &'static str) -> Result<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .ok_or(SlackError::MissingHeader(name))
}

fn authenticate(bot: &SlackBot, headers: &HeaderMap, body: &[u8]) -> Result<()> {
    let timestamp = header(headers, TIMESTAMP_HEADER)?;
    let signature = header(headers, SIGNATURE_HEADER)?;
    bot.verify(timestamp, body, signature)
}

async fn events(
    State(bot): State<SlackBot>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response> {
    authenticate(&bot, &headers, &body)?;

    if let Some(retry) = headers.get(RETRY_HEADER) {
        debug!("Dropping Slack retry {retry:?}");
        return Ok(StatusCode::OK.into_response());
    }

    let envelope: EventEnvelope =
        serde_json::from_slice(&body).map_err(|e| SlackError::Payload(e.to_string()))?;

    match envelope {
        EventEnvelope::UrlVerification { challenge } => {
            info!("Answering Slack URL verification");
            Ok(Json(json!({ "challenge": challenge })).into_response())
        }
        EventEnvelope::EventCallback { event } if event.is_user_message() => {
            tokio::spawn(async move { answer_message(bot, event).await });
            Ok(StatusCode::OK.into_response())
        }
        EventEnvelope::EventCallback { event } => {
            debug!(
                "Ignoring {} event (subtype {:?}, bot {:?})",
                event.kind, event.subtype, event.bot_id
            );
            Ok(StatusCode::OK.into_response())
        }
        EventEnvelope::Unknown => Ok(StatusCode::OK.into_response()),
    }
}

async fn answer_message(bot: SlackBot, event: MessageEvent) {
    let key = event.tenant_key();
    let (Some(channel), Some(thread_ts), Some(text)) =
        (event.channel.as_deref(), event.thread_ts(), event.text.as_deref())
    else {
        return;
    };
    let thread = SlackThread::new(bot.client.clone(), channel, thread_ts);

    let chunks = match bot.chat.converse(&key, text, Some(&thread)).await {
        Ok(chunks) => chunks,
        Err(e) => {
            warn!("[{key}] Turn failed: {e:#}");
            vec![format!("Error: {e}")]
        }
    };
    if let Err(e) = thread.send_chunks(&chunks).await {
        error!("[{key}] Failed to post reply: {e:#}");
    }
}

async fn commands(
    State(bot): State<SlackBot>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode> {
    authenticate(&bot, &headers, &body)?;
    let command = SlashCommand::parse(&body)?;

    tokio::spawn(async move {
        let target = ResponseUrl::new(bot.client.clone(), command.response_url.clone());
        let chunks = match run_command(&bot, &command).await {
            Ok(chunks) => chunks,
            Err(e) => {
                warn!("{} failed: {e:#}", command.command);
                vec![format!("Error: {e}")]
            }
        };
        if let Err(e) = target.send_chunks(&chunks).await {
            error!("Failed to answer {}: {e:#}", command.command);
        }
    });

    Ok(StatusCode::OK)
}

async fn run_command(bot: &SlackBot, command: &SlashCommand) -> anyhow::Result<Vec<String>> {
    let key = command.tenant_key();
    let args = command.text.trim();
    info!("[{key}] Command: {} {args}", command.command);

    let reply = match command.command.as_str() {
        "/new" => {
            bot.chat.reset(&key, None).await?;
            format!("Starting a new conversation {CHANNEL_SCOPE_NOTE}")
        }
        "/role" if args.is_empty() => {
            format!(
                "System role: {}\n{CHANNEL_SCOPE_NOTE}",
                bot.chat.system_role(&key).await?
            )
        }
        "/role" => {
            let role = bot.chat.reset(&key, Some(args)).await?;
            format!("Starting a new conversation {CHANNEL_SCOPE_NOTE}\nSystem role: {role}")
        }
        "/report" => {
            let mut chunks = bot.chat.report(&key).await?;
            chunks.push(CHANNEL_SCOPE_NOTE.to_string());
            return Ok(chunks);
        }
        "/chats" => {
            let mut lines = bot.chat.chat_summaries().await;
            lines.push("End of chats".to_string());
            lines.join("\n")
        }
        "/save" => {
            let path = bot.chat.save(&key).await?;
            format!("Chat written to {} {CHANNEL_SCOPE_NOTE}", path.display())
        }
        other => format!("Unknown command {other}"),
    };

    Ok(split_lines(reply.trim_end(), bot.chunk_limit()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::SlackClient;
    use parley_conversation::{ChatService, ChatStore, TurnTaker};
    use parley_core::{ChatMessage, LLMProvider, LLMResponse};
    use std::sync::Arc;

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

    fn bot() -> SlackBot {
        let provider: Arc<dyn LLMProvider> = Arc::new(Silent);
        let chat = Arc::new(ChatService::new(
            TurnTaker::new(provider, "silent", 0.6),
            ChatStore::new("slack_chats"),
            "You are a helpful assistant",
            1900,
        ));
        SlackBot::new(SlackClient::new("xoxb-test".to_string()), chat, "secret", 1900)
    }

    fn slash(command: &str, text: &str) -> SlashCommand {
        SlashCommand {
            command: command.to_string(),
            text: text.to_string(),
            user_id: "U1".to_string(),
            channel_id: "C1".to_string(),
            response_url: "https://hooks.slack.com/commands/1".to_string(),
        }
    }

    #[tokio::test]
    async fn conversation_commands_name_their_scope() {
        let bot = bot();

        let reply = run_command(&bot, &slash("/role", "You are a pirate"))
            .await
            .unwrap()
            .join("\n");
        assert!(reply.contains(CHANNEL_SCOPE_NOTE));
        assert!(reply.contains("System role: You are a pirate"));

        let reply = run_command(&bot, &slash("/role", "")).await.unwrap().join("\n");
        assert!(reply.contains("System role: You are a pirate"));
        assert!(reply.contains(CHANNEL_SCOPE_NOTE));

        let reply = run_command(&bot, &slash("/new", "")).await.unwrap().join("\n");
        assert!(reply.contains(CHANNEL_SCOPE_NOTE));

        let chunks = run_command(&bot, &slash("/report", "")).await.unwrap();
        assert_eq!(chunks.last().map(String::as_str), Some(CHANNEL_SCOPE_NOTE));
    }

    #[tokio::test]
    async fn chat_listing_is_not_scoped() {
        let reply = run_command(&bot(), &slash("/chats", "")).await.unwrap().join("\n");
        assert!(reply.ends_with("End of chats"));
        assert!(!reply.contains(CHANNEL_SCOPE_NOTE));
    }

    #[test]
    fn parses_url_verification() {
        let envelope: EventEnvelope = serde_json::from_str(
            r#"{"token": "t", "challenge": "3eZbrw1aBm2rZgRNFdxV2595E9CY3gmdALWMmHkvFXO7tYXAYM8P", "type": "url_verification"}"#,
        )
        .unwrap();
        assert!(matches!(
            envelope,
            EventEnvelope::UrlVerification { challenge } if challenge.starts_with("3eZbrw")
        ));
    }

    #[test]
    fn parses_threaded_message() {
        let envelope: EventEnvelope = serde_json::from_str(
            r#"{
                "type": "event_callback",
                "team_id": "T1",
                "event": {
                    "type": "message",
                    "user": "U1",
                    "channel": "C1",
                    "text": "hello",
                    "ts": "1700000001.000200",
                    "thread_ts": "1700000000.000100"
                }
            }"#,
        )
        .unwrap();
        let EventEnvelope::EventCallback { event } = envelope else {
            panic!("expected event callback");
        };
        assert!(event.is_user_message());
        assert_eq!(event.thread_ts(), Some("1700000000.000100"));
        assert_eq!(
            event.tenant_key().to_string(),
            "U1/C1/1700000000.000100"
        );
    }

    #[test]
    fn top_level_message_starts_its_own_thread() {
        let event: MessageEvent = serde_json::from_str(
            r#"{"type": "message", "user": "U1", "channel": "C1", "text": "hi", "ts": "42.1"}"#,
        )
        .unwrap();
        assert_eq!(event.thread_ts(), Some("42.1"));
        assert_eq!(event.tenant_key().to_string(), "U1/C1/42.1");
    }

    #[test]
    fn ignores_bot_and_subtyped_messages() {
        let bot: MessageEvent = serde_json::from_str(
            r#"{"type": "message", "bot_id": "B1", "user": "U2", "channel": "C1", "text": "reply", "ts": "1.0"}"#,
        )
        .unwrap();
        let edited: MessageEvent = serde_json::from_str(
            r#"{"type": "message", "subtype": "message_changed", "channel": "C1", "ts": "1.0"}"#,
        )
        .unwrap();
        let blank: MessageEvent = serde_json::from_str(
            r#"{"type": "message", "user": "U1", "channel": "C1", "text": "  ", "ts": "1.0"}"#,
        )
        .unwrap();
        assert!(!bot.is_user_message());
        assert!(!edited.is_user_message());
        assert!(!blank.is_user_message());
    }

    #[test]
    fn unknown_envelopes_are_tolerated() {
        let envelope: EventEnvelope =
            serde_json::from_str(r#"{"type": "app_rate_limited", "minute_rate_limited": 1}"#)
                .unwrap();
        assert!(matches!(envelope, EventEnvelope::Unknown));
    }

    #[test]
    fn parses_slash_command_form() {
        let body = b"command=%2Frole&text=You+are+a+pirate&user_id=U1&channel_id=C1&response_url=https%3A%2F%2Fhooks.slack.com%2Fcommands%2F1";
        let command = SlashCommand::parse(body).unwrap();
        assert_eq!(command.command, "/role");
        assert_eq!(command.text, "You are a pirate");
        assert_eq!(command.response_url, "https://hooks.slack.com/commands/1");
        assert_eq!(command.tenant_key().to_string(), "U1/C1/-");
    }

    #[test]
    fn slash_command_needs_response_url() {
        assert!(matches!(
            SlashCommand::parse(b"command=%2Fnew&user_id=U1"),
            Err(SlackError::Payload(_))
        ));
    }
}
