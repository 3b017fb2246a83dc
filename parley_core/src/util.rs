//! Shared defaults and small text helpers.

/// Persona given to every new conversation unless configured otherwise.
pub const DEFAULT_SYSTEM_ROLE: &str = "You are a helpful assistant";

pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

pub const DEFAULT_TEMPERATURE: f32 = 0.6;

/// First `max_chars` characters of `text`, with an ellipsis when cut.
#[must_use]
pub fn preview(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_short_text_untouched() {
        assert_eq!(preview("hello", 20), "hello");
    }

    #[test]
    fn preview_cuts_on_char_boundary() {
        assert_eq!(preview("héllo wörld", 4), "héll...");
    }
}
