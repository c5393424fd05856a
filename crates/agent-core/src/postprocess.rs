//! Display extraction for a finished turn.
//!
//! Order of preference:
//! 1. content of the first message produced by a registered tool, reduced
//!    to the number when it reads like `... is <number>`;
//! 2. the final assistant message;
//! 3. [`NO_RESPONSE`] when the assistant said nothing useful.

use std::sync::LazyLock;

use regex::Regex;

use crate::message::{Role, Turn};
use crate::tool::ToolRegistry;

/// Reply some models give when they have nothing to add
pub const PLACEHOLDER_REPLY: &str = "How can I assist you further?";

/// Shown when neither a tool nor the model produced usable text
pub const NO_RESPONSE: &str = "No response generated";

static IS_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bis\s+(-?\d+(?:\.\d+)?)\b").expect("static regex is valid")
});

/// Reduce calculator-style output ("The result of 2+3 is 5") to the number
pub fn extract_number(text: &str) -> Option<&str> {
    IS_NUMBER
        .captures_iter(text)
        .last()
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Turn a completed message sequence into the string shown to the user.
///
/// Never fails and never returns an empty string.
pub fn display_text(turn: &Turn, tools: &ToolRegistry) -> String {
    let tool_output = turn
        .messages()
        .iter()
        .filter(|m| m.role == Role::Tool)
        .find(|m| m.producer.as_deref().is_some_and(|p| tools.contains(p)))
        .map(|m| m.content.trim())
        .filter(|content| !content.is_empty());

    if let Some(candidate) = tool_output {
        return extract_number(candidate).unwrap_or(candidate).to_string();
    }

    let reply = turn.final_assistant().map_or("", |m| m.content.trim());
    if reply.is_empty() || reply == PLACEHOLDER_REPLY {
        NO_RESPONSE.to_string()
    } else {
        reply.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;
    use crate::toolkit::default_registry;

    fn turn(messages: Vec<Message>) -> Turn {
        Turn::from(messages)
    }

    #[test]
    fn test_calculator_result_reduced_to_number() {
        let tools = default_registry().unwrap();
        let t = turn(vec![
            Message::human("what is 2+3"),
            Message::assistant(""),
            Message::tool("calculator", "The result of 2+3 is 5", None),
            Message::assistant("2 + 3 equals 5."),
        ]);
        assert_eq!(display_text(&t, &tools), "5");
    }

    #[test]
    fn test_negative_and_decimal_numbers() {
        assert_eq!(extract_number("The result of 1-3 is -2"), Some("-2"));
        assert_eq!(extract_number("The sum of 2 and 3.5 is 5.5"), Some("5.5"));
        assert_eq!(extract_number("Hello Ada, I hope you are well today"), None);
        assert_eq!(extract_number("This is fine"), None);
    }

    #[test]
    fn test_non_numeric_tool_output_verbatim() {
        let tools = default_registry().unwrap();
        let t = turn(vec![
            Message::human("greet Ada"),
            Message::tool("say_hello", "Hello Ada, I hope you are well today", None),
            Message::assistant("Done."),
        ]);
        assert_eq!(display_text(&t, &tools), "Hello Ada, I hope you are well today");

        let t = turn(vec![
            Message::tool("calculator", "Error calculating 1/0: division by zero", None),
            Message::assistant("Oops"),
        ]);
        assert_eq!(display_text(&t, &tools), "Error calculating 1/0: division by zero");
    }

    #[test]
    fn test_unregistered_producer_ignored() {
        let tools = default_registry().unwrap();
        let t = turn(vec![
            Message::tool("weather", "Error: Tool not found: weather", None),
            Message::assistant("I cannot check the weather."),
        ]);
        assert_eq!(display_text(&t, &tools), "I cannot check the weather.");
    }

    #[test]
    fn test_assistant_fallback() {
        let tools = default_registry().unwrap();
        let t = turn(vec![Message::human("hi"), Message::assistant("Hello! How are you?")]);
        assert_eq!(display_text(&t, &tools), "Hello! How are you?");
    }

    #[test]
    fn test_placeholder_and_empty_reply() {
        let tools = default_registry().unwrap();
        let t = turn(vec![Message::human("hi"), Message::assistant(PLACEHOLDER_REPLY)]);
        assert_eq!(display_text(&t, &tools), NO_RESPONSE);

        let t = turn(vec![Message::human("hi"), Message::assistant("   ")]);
        assert_eq!(display_text(&t, &tools), NO_RESPONSE);

        assert_eq!(display_text(&Turn::new(), &tools), NO_RESPONSE);
    }

    #[test]
    fn test_empty_tool_output_falls_back() {
        let tools = default_registry().unwrap();
        let t = turn(vec![
            Message::tool("say_hello", "", None),
            Message::assistant("Hi there"),
        ]);
        assert_eq!(display_text(&t, &tools), "Hi there");
    }
}
