//! Terminal chat session.
//!
//! The loop ends on an end marker, end of input, or Ctrl-C. Whatever the
//! reason (including an I/O error) the chat is persisted exactly once
//! afterwards.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Local};
use parley_core::{ChatMessage, Conversation, ConversationError, LLMProvider};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::{ChatStore, TurnTaker};

/// Inputs that end the chat, compared case-insensitively.
pub const END_MARKERS: [&str; 5] = ["stop", "end", "finish", "done", "complete"];

const WRAP_WIDTH: usize = 80;

/// Lines of input in arrival order; a closed channel is end of input.
pub type LineReceiver = mpsc::Receiver<io::Result<String>>;

#[derive(Debug, Clone, Default)]
pub struct ReplOptions {
    /// Print token usage after each reply
    pub show_usage: bool,
    /// Print the message list before each call
    pub debug: bool,
    /// Where to save the chat on exit; `None` disables saving
    pub store: Option<ChatStore>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    EndMarker,
    EndOfInput,
    Interrupted,
}

enum Step {
    Continue,
    Exit(ExitReason),
}

pub struct ReplSession<P = Arc<dyn LLMProvider>>
where
    P: Send + Sync,
{
    turn_taker: TurnTaker<P>,
    conversation: Conversation,
    options: ReplOptions,
    started_at: DateTime<Local>,
}

impl<P> ReplSession<P>
where
    P: LLMProvider + Send + Sync,
{
    pub fn new(turn_taker: TurnTaker<P>, conversation: Conversation, options: ReplOptions) -> Self {
        Self {
            turn_taker,
            conversation,
            options,
            started_at: Local::now(),
        }
    }

    #[must_use]
    pub const fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Chat on the terminal until the user leaves, then save. Returns the
    /// saved file, if any.
    pub async fn run(self) -> anyhow::Result<Option<PathBuf>> {
        self.run_with(stdin_lines()).await
    }

    /// Chat over `input` until it ends, then save.
    pub async fn run_with(mut self, mut input: LineReceiver) -> anyhow::Result<Option<PathBuf>> {
        println!(
            "System role: {}",
            self.conversation.system_role().unwrap_or_default()
        );

        let outcome = self.run_loop(&mut input).await;
        let saved = self.persist();

        match outcome {
            Ok(reason) => {
                info!(
                    "Chat ended ({reason:?}) after {} turns",
                    self.conversation.turn_count()
                );
                saved
            }
            Err(e) => {
                if let Err(save_err) = &saved {
                    warn!("Failed to save chat: {save_err:#}");
                }
                Err(e)
            }
        }
    }

    async fn run_loop(&mut self, input: &mut LineReceiver) -> anyhow::Result<ExitReason> {
        let interrupted = tokio::signal::ctrl_c();
        tokio::pin!(interrupted);

        loop {
            tokio::select! {
                step = self.step(input) => {
                    if let Step::Exit(reason) = step? {
                        return Ok(reason);
                    }
                }
                _ = &mut interrupted => {
                    println!("\nexiting");
                    return Ok(ExitReason::Interrupted);
                }
            }
        }
    }

    async fn step(&mut self, input: &mut LineReceiver) -> anyhow::Result<Step> {
        print!("parley> ");
        std::io::stdout().flush()?;

        let Some(line) = input.recv().await.transpose()? else {
            println!("\nexiting");
            return Ok(Step::Exit(ExitReason::EndOfInput));
        };
        let prompt = line.trim();

        if prompt.is_empty() {
            return Ok(Step::Continue);
        }
        if is_end_marker(prompt) {
            println!("Chat finished");
            return Ok(Step::Exit(ExitReason::EndMarker));
        }

        if self.options.debug {
            let messages = request_preview(&self.conversation, prompt)?;
            println!("{}", serde_json::to_string(&messages)?);
        }

        match self.turn_taker.take_turn(&mut self.conversation, prompt).await {
            Ok(reply) => {
                for paragraph in reply.text.lines() {
                    for line in wrap(paragraph, WRAP_WIDTH) {
                        println!("{line}");
                    }
                    println!();
                }
                if self.options.show_usage {
                    if let Some(usage) = reply.usage {
                        println!(
                            "[Prompt tokens: {} Completion tokens: {} Total tokens: {}]",
                            usage.prompt_tokens, usage.completion_tokens, usage.total_tokens
                        );
                    }
                }
            }
            Err(e) => eprintln!("Error: {e}"),
        }

        Ok(Step::Continue)
    }

    fn persist(&self) -> anyhow::Result<Option<PathBuf>> {
        let Some(store) = &self.options.store else {
            debug!("Chat storage disabled");
            return Ok(None);
        };
        let path = store.write(&self.conversation, self.started_at)?;
        println!("stored chat as {}", path.display());
        Ok(Some(path))
    }
}

/// Terminal lines, read on a plain thread. A blocking read parked there
/// does not hold up runtime shutdown after Ctrl-C.
#[must_use]
pub fn stdin_lines() -> LineReceiver {
    let (tx, rx) = mpsc::channel(1);
    std::thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let failed = line.is_err();
            if tx.blocking_send(line).is_err() || failed {
                break;
            }
        }
    });
    rx
}

/// Lines from any buffered async reader, forwarded by a spawned task.
pub fn reader_lines<R>(reader: R) -> LineReceiver
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(1);
    tokio::spawn(async move {
        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await.transpose() {
            let failed = line.is_err();
            if tx.send(line).await.is_err() || failed {
                break;
            }
        }
    });
    rx
}

/// Message list the next turn would send for `prompt`, with the same
/// coalescing into an unanswered user turn.
fn request_preview(
    conversation: &Conversation,
    prompt: &str,
) -> Result<Vec<ChatMessage>, ConversationError> {
    let mut next = conversation.clone();
    next.push_user_message(prompt)?;
    Ok(next.to_message_list())
}

#[must_use]
pub fn is_end_marker(input: &str) -> bool {
    END_MARKERS
        .iter()
        .any(|marker| marker.eq_ignore_ascii_case(input.trim()))
}

/// Greedy word wrap; words wider than `width` are broken.
fn wrap(paragraph: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0_usize;

    for word in paragraph.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();

        if current_len > 0 && current_len + 1 + word.len() > width {
            lines.push(std::mem::take(&mut current));
            current_len = 0;
        }
        while current_len == 0 && word.len() > width {
            let rest = word.split_off(width);
            lines.push(word.into_iter().collect());
            word = rest;
        }
        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current_len += word.len();
        current.extend(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }

    lines
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use parley_core::Role;

    #[test]
    fn end_markers_are_case_insensitive() {
        assert!(is_end_marker("stop"));
        assert!(is_end_marker("DONE"));
        assert!(is_end_marker("  Finish "));
        assert!(!is_end_marker("stop it"));
        assert!(!is_end_marker("halt"));
    }

    #[test]
    fn wrap_respects_width() {
        let text = "the quick brown fox jumps over the lazy dog ".repeat(5);
        let lines = wrap(&text, 20);
        assert!(lines.len() > 1);
        assert!(lines.iter().all(|line| line.chars().count() <= 20));
        assert_eq!(
            lines.join(" "),
            text.split_whitespace().collect::<Vec<_>>().join(" ")
        );
    }

    #[test]
    fn wrap_breaks_long_words() {
        let lines = wrap(&format!("ab {}", "x".repeat(25)), 10);
        assert_eq!(lines, vec!["ab", "xxxxxxxxxx", "xxxxxxxxxx", "xxxxx"]);
    }

    #[test]
    fn wrap_empty_paragraph() {
        assert!(wrap("", 80).is_empty());
    }

    #[test]
    fn request_preview_folds_into_pending_turn() {
        let mut conversation = Conversation::with_system_role("persona");
        conversation.add_turn(Role::User, "first").unwrap();

        let messages = request_preview(&conversation, "second").unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].role, Role::User);
        assert_eq!(messages[1].content, "first\nsecond");
        assert_eq!(conversation.len(), 2);
    }

    #[test]
    fn request_preview_appends_after_reply() {
        let mut conversation = Conversation::with_system_role("persona");
        conversation.add_turn(Role::User, "first").unwrap();
        conversation.add_turn(Role::Assistant, "answer").unwrap();

        let messages = request_preview(&conversation, "second").unwrap();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[3].content, "second");
    }
}
