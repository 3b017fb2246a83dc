use crate::{Command, Error, Result, TelegramBot, TelegramChannel};
use parley_core::{OutboundChannel, TenantKey, split_lines};
use teloxide::{
    requests::Requester,
    types::{ChatAction, Message},
};
use tracing::{debug, info, warn};

/// Conversation key for a message: `(chat id, topic id or "-")`.
#[must_use]
pub fn tenant_key(chat_id: i64, thread_id: Option<i32>) -> TenantKey {
    TenantKey::from_optional([Some(chat_id.to_string()), thread_id.map(|id| id.to_string())])
}

fn key_for(msg: &Message) -> TenantKey {
    let thread_id = if msg.is_topic_message {
        msg.thread_id.map(|thread| thread.0.0)
    } else {
        None
    };
    tenant_key(msg.chat.id.0, thread_id)
}

async fn send_text(channel: &TelegramChannel, text: &str) -> Result<()> {
    channel
        .send_chunks(&split_lines(text.trim_end(), parley_core::DEFAULT_CHUNK_LIMIT))
        .await
        .map_err(Error::Chat)
}

/// Handle bot commands
pub async fn handle_command(bot: TelegramBot, msg: Message, cmd: Command) -> Result<()> {
    let key = key_for(&msg);
    let channel = TelegramChannel::reply_to(bot.bot.clone(), &msg);
    info!("[{key}] Command: {cmd:?}");

    match cmd {
        Command::Start => send_text(&channel, Command::welcome_text()).await?,
        Command::Help => send_text(&channel, Command::help_text()).await?,
        Command::New => {
            let role = bot.chat.reset(&key, None).await.map_err(Error::Chat)?;
            send_text(&channel, &format!("New conversation started\nSystem role: {role}")).await?;
        }
        Command::Role(None) => {
            let role = bot.chat.system_role(&key).await.map_err(Error::Chat)?;
            send_text(&channel, &format!("System role: {role}")).await?;
        }
        Command::Role(Some(text)) => {
            let role = bot
                .chat
                .reset(&key, Some(&text))
                .await
                .map_err(Error::Chat)?;
            send_text(
                &channel,
                &format!("New conversation started\nSystem role: {role}"),
            )
            .await?;
        }
        Command::Save => {
            let path = bot.chat.save(&key).await.map_err(Error::Chat)?;
            send_text(&channel, &format!("Chat saved as {}", path.display())).await?;
        }
        Command::Report => {
            let chunks = bot.chat.report(&key).await.map_err(Error::Chat)?;
            channel.send_chunks(&chunks).await.map_err(Error::Chat)?;
        }
        Command::Chats => {
            let summaries = bot.chat.chat_summaries().await;
            let text = if summaries.is_empty() {
                "No active chats".to_string()
            } else {
                summaries.join("\n")
            };
            send_text(&channel, &text).await?;
        }
    }

    Ok(())
}

/// Handle any message (commands or regular text)
pub async fn handle_message(bot: TelegramBot, msg: Message) -> Result<()> {
    let chat_id = msg.chat.id.0;

    if msg.from.as_ref().is_some_and(|user| user.is_bot) {
        debug!("Ignoring message from bot in chat {chat_id}");
        return Ok(());
    }
    let Some(text) = msg.text() else {
        debug!("Ignoring non-text message in chat {chat_id}");
        return Ok(());
    };
    if !bot.is_allowed(chat_id) {
        return Err(Error::Unauthorized(chat_id));
    }

    if let Some(cmd) = Command::parse_from_text(text, bot.username()) {
        return handle_command(bot, msg, cmd).await;
    }

    let key = key_for(&msg);
    let channel = TelegramChannel::reply_to(bot.bot.clone(), &msg);

    if let Err(e) = bot
        .bot
        .send_chat_action(msg.chat.id, ChatAction::Typing)
        .await
    {
        debug!("Failed to send typing indicator: {e}");
    }

    match bot.chat.converse(&key, text, None).await {
        Ok(chunks) => channel.send_chunks(&chunks).await.map_err(Error::Chat)?,
        Err(e) => {
            warn!("[{key}] Turn failed: {e:#}");
            send_text(&channel, &format!("Error: {e}")).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_uses_placeholder_outside_topics() {
        assert_eq!(tenant_key(-1001, None).to_string(), "-1001/-");
        assert_eq!(tenant_key(-1001, Some(7)).to_string(), "-1001/7");
    }

    #[test]
    fn topics_in_one_chat_are_distinct() {
        assert_ne!(tenant_key(5, Some(1)), tenant_key(5, Some(2)));
        assert_ne!(tenant_key(5, None), tenant_key(5, Some(1)));
        assert_eq!(tenant_key(5, None).depth(), tenant_key(5, Some(1)).depth());
    }
}
