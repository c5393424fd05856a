//! Conversation Messages
//!
//! Standard message format exchanged with model endpoints, and the `Turn`
//! that collects every message produced for one user input.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::tool::ToolCall;

/// Role of a message sender
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System prompt/instructions
    System,
    /// User input
    Human,
    /// Tool result
    Tool,
    /// Assistant (LLM) response
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::Human => write!(f, "human"),
            Self::Tool => write!(f, "tool"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// A single message in a conversation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
    /// Message role
    pub role: Role,

    /// Text content
    pub content: String,

    /// Name of the tool that produced this message (tool messages only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub producer: Option<String>,

    /// Timestamp
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,

    /// Optional metadata
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MessageMetadata>,
}

/// Additional message metadata
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MessageMetadata {
    /// Tool call ID (for tool messages)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,

    /// Tool-call directive carried by an assistant message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call: Option<ToolCall>,

    /// Model that generated this (for assistant messages)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl Message {
    /// Create a new message
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            producer: None,
            timestamp: Utc::now(),
            metadata: None,
        }
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Create a human message
    pub fn human(content: impl Into<String>) -> Self {
        Self::new(Role::Human, content)
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Create a tool result message attributed to `producer`
    pub fn tool(
        producer: impl Into<String>,
        content: impl Into<String>,
        tool_call_id: Option<String>,
    ) -> Self {
        let mut msg = Self::new(Role::Tool, content);
        msg.producer = Some(producer.into());
        if tool_call_id.is_some() {
            msg.metadata = Some(MessageMetadata {
                tool_call_id,
                ..Default::default()
            });
        }
        msg
    }

    /// Attach the tool-call directive this assistant message emitted
    #[must_use]
    pub fn with_tool_call(mut self, call: ToolCall) -> Self {
        self.metadata.get_or_insert_with(Default::default).tool_call = Some(call);
        self
    }

    /// Record which model produced the message
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.metadata.get_or_insert_with(Default::default).model = Some(model.into());
        self
    }

    /// The tool-call directive, if this is an assistant message that requested one
    pub fn tool_call(&self) -> Option<&ToolCall> {
        self.metadata.as_ref().and_then(|m| m.tool_call.as_ref())
    }

    /// The tool call this message answers, if it is a tool result
    pub fn tool_call_id(&self) -> Option<&str> {
        self.metadata.as_ref().and_then(|m| m.tool_call_id.as_deref())
    }
}

/// Every message exchanged for one user input, in order.
///
/// Append-only: messages are pushed as the exchange progresses and never
/// reordered or removed.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Turn {
    messages: Vec<Message>,
}

impl Turn {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a message
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Get all messages
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// The final assistant message, i.e. the last one in the turn
    pub fn final_assistant(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.role == Role::Assistant)
    }

    /// Tool result messages in order
    pub fn tool_results(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter().filter(|m| m.role == Role::Tool)
    }

    /// Number of messages
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl From<Vec<Message>> for Turn {
    fn from(messages: Vec<Message>) -> Self {
        Self { messages }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_creation() {
        let msg = Message::human("Hello");
        assert_eq!(msg.role, Role::Human);
        assert_eq!(msg.content, "Hello");
        assert!(msg.producer.is_none());
    }

    #[test]
    fn test_tool_message_carries_producer() {
        let msg = Message::tool("say_hello", "Hello Ada", Some("call-1".into()));
        assert_eq!(msg.role, Role::Tool);
        assert_eq!(msg.producer.as_deref(), Some("say_hello"));
        assert_eq!(msg.tool_call_id(), Some("call-1"));
    }

    #[test]
    fn test_turn_final_assistant() {
        let mut turn = Turn::new();
        turn.push(Message::system("You are helpful."));
        turn.push(Message::human("Hi"));
        turn.push(Message::assistant("first"));
        turn.push(Message::tool("calculator", "The result of 1+1 is 2", None));
        turn.push(Message::assistant("Hello!"));

        assert_eq!(turn.len(), 5);
        assert_eq!(turn.final_assistant().unwrap().content, "Hello!");
        assert_eq!(turn.tool_results().count(), 1);
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_string(&Role::Human).unwrap();
        assert_eq!(json, "\"human\"");
    }
}
