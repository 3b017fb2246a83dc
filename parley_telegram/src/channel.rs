use async_trait::async_trait;
use parley_core::OutboundChannel;
use teloxide::payloads::SendMessageSetters;
use teloxide::prelude::*;
use teloxide::types::ThreadId;

/// A chat, or one forum topic inside it.
#[derive(Clone)]
pub struct TelegramChannel {
    bot: Bot,
    chat_id: ChatId,
    thread_id: Option<ThreadId>,
}

impl TelegramChannel {
    #[must_use]
    pub const fn new(bot: Bot, chat_id: ChatId, thread_id: Option<ThreadId>) -> Self {
        Self {
            bot,
            chat_id,
            thread_id,
        }
    }

    /// Reply target for `msg`: its chat, and its topic when it was posted
    /// in one.
    #[must_use]
    pub fn reply_to(bot: Bot, msg: &Message) -> Self {
        let thread_id = if msg.is_topic_message {
            msg.thread_id
        } else {
            None
        };
        Self::new(bot, msg.chat.id, thread_id)
    }
}

#[async_trait]
impl OutboundChannel for TelegramChannel {
    async fn send(&self, chunk: &str) -> anyhow::Result<()> {
        let request = self.bot.send_message(self.chat_id, chunk);
        match self.thread_id {
            Some(thread_id) => request.message_thread_id(thread_id).await?,
            None => request.await?,
        };
        Ok(())
    }
}
