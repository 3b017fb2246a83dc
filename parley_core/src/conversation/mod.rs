//! Conversations: an ordered, role-alternating sequence of turns led by a
//! single persona-defining system turn.
//!
//! Every mutator keeps the invariant that, when non-empty, index 0 is the
//! only `system` turn and the remaining turns alternate `user`, `assistant`,
//! `user`, ... Conversations are never expired; they live until the process
//! exits or a caller clears them.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::{ChatMessage, Role};

mod turn;

pub use turn::{Entry, Turn};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConversationError {
    #[error("conversation has no system role; set one before adding turns")]
    MissingSystemRole,

    #[error("system turns may only be set through set_system_role")]
    SystemTurnMisplaced,

    #[error("expected a {expected} turn, got {found}")]
    OutOfOrder { expected: Role, found: Role },
}

/// On-disk envelope for a saved chat: `{"chat": [{role, content}, ...]}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatRecord {
    pub chat: Vec<ChatMessage>,
}

#[derive(Debug, Clone)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    /// Create an empty conversation with no persona.
    #[must_use]
    pub const fn new() -> Self {
        Self { turns: Vec::new() }
    }

    #[must_use]
    pub fn with_system_role(role: impl Into<String>) -> Self {
        let mut conversation = Self::new();
        conversation.set_system_role(role);
        conversation
    }

    /// Rebuild a conversation from persisted records, enforcing the same
    /// invariants as live mutation.
    pub fn from_messages(
        messages: impl IntoIterator<Item = ChatMessage>,
    ) -> Result<Self, ConversationError> {
        let mut messages = messages.into_iter();
        let mut conversation = Self::new();

        match messages.next() {
            Some(ChatMessage {
                role: Role::System,
                content,
            }) => conversation.set_system_role(content),
            _ => return Err(ConversationError::MissingSystemRole),
        }

        for message in messages {
            conversation.add_turn(message.role, message.content)?;
        }

        Ok(conversation)
    }

    /// Establish or replace the persona.
    ///
    /// There is never more than one system turn: an existing persona is
    /// replaced in place at index 0.
    pub fn set_system_role(&mut self, role: impl Into<String>) {
        let turn = Turn::new(Role::System, role);
        match self.turns.first() {
            Some(first) if first.role() == Role::System => self.turns[0] = turn,
            _ => self.turns.insert(0, turn),
        }
    }

    #[must_use]
    pub fn system_role(&self) -> Option<&str> {
        self.turns
            .first()
            .filter(|turn| turn.role() == Role::System)
            .map(Turn::content)
    }

    /// Append a user or assistant turn, rejecting anything that would break
    /// strict alternation.
    pub fn add_turn(
        &mut self,
        role: Role,
        content: impl Into<String>,
    ) -> Result<(), ConversationError> {
        if role == Role::System {
            return Err(ConversationError::SystemTurnMisplaced);
        }
        let expected = self
            .next_role()
            .ok_or(ConversationError::MissingSystemRole)?;
        if role != expected {
            return Err(ConversationError::OutOfOrder {
                expected,
                found: role,
            });
        }

        self.turns.push(Turn::new(role, content));
        Ok(())
    }

    /// Append a user message.
    ///
    /// If the previous user turn never got a reply, the new text is folded
    /// into that pending turn instead of creating a second user turn.
    pub fn push_user_message(&mut self, content: &str) -> Result<(), ConversationError> {
        if self.pending_reply() {
            if let Some(pending) = self.turns.pop() {
                debug!("Coalescing message into unanswered user turn");
                self.turns
                    .push(Turn::user(format!("{}\n{content}", pending.content())));
            }
            return Ok(());
        }
        self.add_turn(Role::User, content)
    }

    /// Remove every turn, including the persona.
    pub fn clear(&mut self) {
        self.turns.clear();
    }

    /// Start a new conversation with the given persona.
    pub fn reset(&mut self, role: impl Into<String>) {
        self.clear();
        self.set_system_role(role);
    }

    /// Replay a platform's stored history into this conversation.
    ///
    /// `classify` maps each foreign message to a turn, or `None` to ignore
    /// it. With `skip_latest` the newest message is left out so the caller
    /// can append it as the new user turn. Consecutive messages of the same
    /// role are folded into one turn and a leading assistant message is
    /// dropped, so the result always alternates. Returns the number of turns
    /// added.
    pub fn replay<T, F>(&mut self, history: &[T], skip_latest: bool, mut classify: F) -> usize
    where
        F: FnMut(&T) -> Option<Turn>,
    {
        let history = if skip_latest {
            &history[..history.len().saturating_sub(1)]
        } else {
            history
        };

        let mut added = 0_usize;
        for turn in history.iter().filter_map(&mut classify) {
            let Some(expected) = self.next_role() else {
                break;
            };
            if turn.role() == expected {
                self.turns.push(turn);
                added += 1;
                continue;
            }

            let same_role = self
                .turns
                .last()
                .is_some_and(|last| last.role() == turn.role() && last.role() != Role::System);
            if !same_role {
                continue;
            }
            if let Some(last) = self.turns.pop() {
                self.turns.push(Turn::new(
                    last.role(),
                    format!("{}\n{}", last.content(), turn.content()),
                ));
            }
        }

        added
    }

    /// Completed user/assistant exchanges: `(len - 1) / 2`.
    ///
    /// An unanswered trailing user turn is floored away.
    #[must_use]
    pub fn turn_count(&self) -> usize {
        self.turns.len().saturating_sub(1) / 2
    }

    /// Whether the last turn is a user message still waiting for a reply.
    #[must_use]
    pub fn pending_reply(&self) -> bool {
        self.turns
            .last()
            .is_some_and(|turn| turn.role() == Role::User)
    }

    /// The turn at `index`, or [`Entry::EMPTY`] when out of range.
    #[must_use]
    pub fn get_entry(&self, index: usize) -> Entry<'_> {
        self.turns.get(index).map_or(Entry::EMPTY, Entry::from)
    }

    #[must_use]
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// True when nothing but the persona is present.
    #[must_use]
    pub fn is_fresh(&self) -> bool {
        self.turns.len() <= 1
    }

    #[must_use]
    pub fn to_message_list(&self) -> Vec<ChatMessage> {
        self.turns.iter().map(Turn::to_message).collect()
    }

    #[must_use]
    pub fn to_persistable(&self) -> ChatRecord {
        ChatRecord {
            chat: self.to_message_list(),
        }
    }

    fn next_role(&self) -> Option<Role> {
        self.turns.last().map(|last| match last.role() {
            Role::System | Role::Assistant => Role::User,
            Role::User => Role::Assistant,
        })
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const PERSONA: &str = "You are a helpful assistant";

    fn with_exchanges(count: usize) -> Conversation {
        let mut conversation = Conversation::with_system_role(PERSONA);
        for i in 0..count {
            conversation
                .add_turn(Role::User, format!("question {i}"))
                .unwrap();
            conversation
                .add_turn(Role::Assistant, format!("answer {i}"))
                .unwrap();
        }
        conversation
    }

    fn assert_alternates(conversation: &Conversation) {
        let turns = conversation.turns();
        assert_eq!(turns[0].role(), Role::System);
        for (i, turn) in turns.iter().enumerate().skip(1) {
            let expected = if i % 2 == 1 {
                Role::User
            } else {
                Role::Assistant
            };
            assert_eq!(turn.role(), expected, "turn {i}");
        }
    }

    #[test]
    fn test_turn_count_floors_incomplete_pair() {
        assert_eq!(Conversation::new().turn_count(), 0);
        assert_eq!(Conversation::with_system_role(PERSONA).turn_count(), 0);

        let mut conversation = with_exchanges(3);
        assert_eq!(conversation.len(), 7);
        assert_eq!(conversation.turn_count(), 3);

        conversation.add_turn(Role::User, "one more").unwrap();
        assert_eq!(conversation.turn_count(), 3);
        assert!(conversation.pending_reply());
    }

    #[test]
    fn test_alternation_enforced() {
        let mut conversation = Conversation::with_system_role(PERSONA);

        assert_eq!(
            conversation.add_turn(Role::Assistant, "too early"),
            Err(ConversationError::OutOfOrder {
                expected: Role::User,
                found: Role::Assistant,
            })
        );
        conversation.add_turn(Role::User, "hi").unwrap();
        assert_eq!(
            conversation.add_turn(Role::User, "hi again"),
            Err(ConversationError::OutOfOrder {
                expected: Role::Assistant,
                found: Role::User,
            })
        );
        assert_eq!(
            conversation.add_turn(Role::System, "new persona"),
            Err(ConversationError::SystemTurnMisplaced)
        );
        assert_eq!(conversation.len(), 2);
    }

    #[test]
    fn test_add_turn_requires_persona() {
        let mut conversation = with_exchanges(1);
        conversation.clear();
        assert!(conversation.is_empty());
        assert_eq!(
            conversation.add_turn(Role::User, "hello"),
            Err(ConversationError::MissingSystemRole)
        );
    }

    #[test]
    fn test_set_system_role_never_duplicates() {
        let mut conversation = with_exchanges(2);
        conversation.set_system_role("You are a pirate");
        conversation.set_system_role("You are a poet");

        let systems = conversation
            .turns()
            .iter()
            .filter(|turn| turn.role() == Role::System)
            .count();
        assert_eq!(systems, 1);
        assert_eq!(conversation.system_role(), Some("You are a poet"));
        assert_eq!(conversation.len(), 5);
        assert_alternates(&conversation);
    }

    #[test]
    fn test_reset_starts_over_with_new_persona() {
        let mut conversation = with_exchanges(2);
        conversation.reset("You are terse");

        assert_eq!(conversation.len(), 1);
        assert_eq!(conversation.system_role(), Some("You are terse"));
        assert!(conversation.is_fresh());
    }

    #[test]
    fn test_get_entry_out_of_range_is_sentinel() {
        let conversation = with_exchanges(1);

        let entry = conversation.get_entry(1);
        assert_eq!(entry.role, "user");
        assert_eq!(entry.content, "question 0");

        let missing = conversation.get_entry(42);
        assert!(missing.is_empty());
        assert_eq!(missing, Entry::EMPTY);
        assert_eq!(Conversation::new().get_entry(0), Entry::EMPTY);
    }

    #[test]
    fn test_message_list_matches_insertion_order() {
        let conversation = with_exchanges(2);
        let messages = conversation.to_message_list();

        assert_eq!(messages.len(), 5);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[0].content, PERSONA);
        assert_eq!(messages[3].role, Role::User);
        assert_eq!(messages[3].content, "question 1");
        assert_eq!(messages[4].content, "answer 1");

        let rebuilt = Conversation::from_messages(messages.clone()).unwrap();
        assert_eq!(rebuilt.to_message_list(), messages);
    }

    #[test]
    fn test_persistable_envelope_shape() {
        let conversation = with_exchanges(1);
        let json = serde_json::to_value(conversation.to_persistable()).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "chat": [
                    {"role": "system", "content": PERSONA},
                    {"role": "user", "content": "question 0"},
                    {"role": "assistant", "content": "answer 0"},
                ]
            })
        );
    }

    #[test]
    fn test_from_messages_rejects_missing_persona() {
        let messages = vec![ChatMessage {
            role: Role::User,
            content: "hello".to_string(),
        }];
        assert_eq!(
            Conversation::from_messages(messages).unwrap_err(),
            ConversationError::MissingSystemRole
        );
    }

    #[test]
    fn test_push_user_message_coalesces_pending_turn() {
        let mut conversation = with_exchanges(1);
        conversation.push_user_message("first try").unwrap();
        conversation.push_user_message("second try").unwrap();

        assert_eq!(conversation.len(), 4);
        assert_eq!(conversation.get_entry(3).content, "first try\nsecond try");
        assert_alternates(&conversation);
    }

    struct Foreign {
        from_bot: bool,
        text: &'static str,
    }

    fn classify(message: &Foreign) -> Option<Turn> {
        let turn = if message.from_bot {
            Turn::assistant(message.text)
        } else {
            Turn::user(message.text)
        };
        Some(turn)
    }

    fn thread() -> Vec<Foreign> {
        vec![
            Foreign {
                from_bot: true,
                text: "bot greeting",
            },
            Foreign {
                from_bot: false,
                text: "hello",
            },
            Foreign {
                from_bot: false,
                text: "are you there?",
            },
            Foreign {
                from_bot: true,
                text: "yes",
            },
            Foreign {
                from_bot: false,
                text: "latest",
            },
        ]
    }

    #[test]
    fn test_replay_skips_latest_and_keeps_alternation() {
        let mut conversation = Conversation::with_system_role(PERSONA);
        let added = conversation.replay(&thread(), true, classify);

        assert_eq!(added, 2);
        assert_eq!(conversation.len(), 3);
        assert_eq!(conversation.get_entry(1).content, "hello\nare you there?");
        assert_eq!(conversation.get_entry(2).content, "yes");
        assert!(!conversation.pending_reply());
        assert_alternates(&conversation);
    }

    #[test]
    fn test_replay_is_deterministic() {
        let history = thread();
        let mut first = Conversation::with_system_role(PERSONA);
        let mut second = Conversation::with_system_role(PERSONA);
        first.replay(&history, false, classify);
        second.replay(&history, false, classify);

        assert_eq!(first.turns(), second.turns());
        assert!(first.pending_reply());
    }

    #[test]
    fn test_replay_without_persona_adds_nothing() {
        let mut conversation = Conversation::new();
        assert_eq!(conversation.replay(&thread(), false, classify), 0);
        assert!(conversation.is_empty());
    }
}
