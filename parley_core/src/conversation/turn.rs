use crate::{ChatMessage, Role};

/// One role-tagged message within a conversation.
///
/// Turns are immutable; a conversation replaces a turn wholesale when it
/// needs a different one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    role: Role,
    content: String,
}

impl Turn {
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    #[must_use]
    pub const fn role(&self) -> Role {
        self.role
    }

    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    #[must_use]
    pub fn to_message(&self) -> ChatMessage {
        ChatMessage {
            role: self.role,
            content: self.content.clone(),
        }
    }
}

impl From<ChatMessage> for Turn {
    fn from(message: ChatMessage) -> Self {
        Self::new(message.role, message.content)
    }
}

/// Borrowed `{role, content}` view returned by [`Conversation::get_entry`].
///
/// An out-of-range lookup yields [`Entry::EMPTY`], whose role and content
/// are both empty strings.
///
/// [`Conversation::get_entry`]: super::Conversation::get_entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry<'a> {
    pub role: &'a str,
    pub content: &'a str,
}

impl Entry<'_> {
    pub const EMPTY: Self = Self {
        role: "",
        content: "",
    };

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.role.is_empty()
    }
}

impl<'a> From<&'a Turn> for Entry<'a> {
    fn from(turn: &'a Turn) -> Self {
        Self {
            role: turn.role.as_str(),
            content: &turn.content,
        }
    }
}
