use teloxide::types::BotCommand;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    /// Forget the conversation, keep the persona default
    New,
    /// Show the persona, or start over with a new one
    Role(Option<String>),
    Save,
    Report,
    Chats,
}

impl Command {
    fn all() -> Vec<BotCommand> {
        [
            ("start", "Start using the bot"),
            ("help", "Show the command list"),
            ("new", "Start a new conversation"),
            ("role", "Show or set the system role"),
            ("save", "Save this conversation"),
            ("report", "Dump this conversation as JSON"),
            ("chats", "List active conversations"),
        ]
        .into_iter()
        .map(|(command, description)| BotCommand {
            command: command.to_string(),
            description: description.to_string(),
        })
        .collect()
    }

    #[must_use]
    pub fn bot_commands() -> Vec<BotCommand> {
        Self::all()
    }

    /// Parse `/command[@bot_name] [args]`. Commands addressed to a different
    /// bot are not ours and yield `None`.
    #[must_use]
    pub fn parse_from_text(text: &str, bot_name: &str) -> Option<Self> {
        let text = text.trim();
        let rest = text.strip_prefix('/')?;
        let (head, args) = rest
            .split_once(char::is_whitespace)
            .map_or((rest, ""), |(head, args)| (head, args.trim()));

        let (name, mention) = head.split_once('@').unwrap_or((head, ""));
        if !mention.is_empty() && !bot_name.is_empty() && !mention.eq_ignore_ascii_case(bot_name)
        {
            return None;
        }

        let args = (!args.is_empty()).then(|| args.to_string());
        match name.to_lowercase().as_str() {
            "start" => Some(Self::Start),
            "help" => Some(Self::Help),
            "new" | "clear" | "reset" | "newconv" => Some(Self::New),
            "role" | "system_role" | "sysrole" | "system" => Some(Self::Role(args)),
            "save" | "store" | "record" => Some(Self::Save),
            "report" => Some(Self::Report),
            "chats" => Some(Self::Chats),
            _ => None,
        }
    }

    #[must_use]
    pub const fn help_text() -> &'static str {
        r"
Parley Telegram Bot

Commands:
/start  - show the welcome message
/new    - start a new conversation (also /clear, /reset, /newconv)
/role   - show the system role
/role <text> - start a new conversation with <text> as system role
/save   - save this conversation to disk
/report - dump this conversation as JSON
/chats  - list active conversations
/help   - show this help

Any other message is sent to the assistant.
"
    }

    #[must_use]
    pub const fn welcome_text() -> &'static str {
        r"
Hello! I am a chat assistant.

Every chat, and every topic in a forum, gets its own conversation.
Send /help to see the command list.
"
    }
}
