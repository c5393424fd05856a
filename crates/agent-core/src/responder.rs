//! Responder
//!
//! Sends one user message to the model together with the tool catalogue.
//! If the model asks for a tool, exactly that one tool is executed, its
//! output is appended as a tool message, and the model gets one more call
//! to produce the final answer. No chained or parallel tool calls.

use std::sync::Arc;

use crate::error::Result;
use crate::message::{Message, Turn};
use crate::provider::{Completion, GenerationOptions, LlmProvider};
use crate::tool::{ToolCall, ToolRegistry, ToolResult};

/// Responder configuration
#[derive(Clone, Debug, Default)]
pub struct ResponderConfig {
    /// Fixed system instructions sent ahead of every user message
    pub instructions: Option<String>,

    /// Generation options
    pub generation: GenerationOptions,

    /// Whether to append tool descriptions to the system prompt, for
    /// endpoints without native tool calling
    pub inject_tool_descriptions: bool,
}

/// Single-tool-per-turn dispatcher in front of an `LlmProvider`
pub struct Responder {
    provider: Arc<dyn LlmProvider>,
    tools: Arc<ToolRegistry>,
    config: ResponderConfig,
}

impl Responder {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        tools: Arc<ToolRegistry>,
        config: ResponderConfig,
    ) -> Self {
        Self {
            provider,
            tools,
            config,
        }
    }

    /// Build the system prompt, if any, including tool descriptions when requested
    fn system_prompt(&self) -> Option<String> {
        let catalogue = (self.config.inject_tool_descriptions && !self.tools.is_empty())
            .then(|| self.tools.generate_prompt_section());

        match (&self.config.instructions, catalogue) {
            (Some(instructions), Some(catalogue)) => Some(format!("{instructions}\n\n{catalogue}")),
            (Some(instructions), None) => Some(instructions.clone()),
            (None, catalogue) => catalogue,
        }
    }

    /// Run one turn: `[system?, human]` in, the full exchanged sequence out
    pub async fn invoke(&self, input: &str) -> Result<Turn> {
        let mut turn = Turn::new();
        if let Some(prompt) = self.system_prompt() {
            turn.push(Message::system(prompt));
        }
        turn.push(Message::human(input));

        let schemas = self.tools.schemas();
        let options = &self.config.generation;

        let completion = self.provider.complete(turn.messages(), &schemas, options).await?;

        let Some(call) = self.select_tool_call(&completion) else {
            turn.push(Message::assistant(completion.content).with_model(completion.model));
            return Ok(turn);
        };

        tracing::debug!(tool = %call.name, "Executing tool");
        let directive = Message::assistant(completion.content)
            .with_model(completion.model)
            .with_tool_call(call.clone());
        turn.push(directive);

        let result = self.execute_tool(&call).await;
        turn.push(Message::tool(call.name.clone(), result.output, call.id.clone()));

        let follow_up = self.provider.complete(turn.messages(), &schemas, options).await?;
        if !follow_up.tool_calls.is_empty() || parse_tool_call(&follow_up.content).is_some() {
            tracing::warn!("Ignoring tool call in follow-up completion; one tool per turn");
        }
        turn.push(Message::assistant(follow_up.content).with_model(follow_up.model));

        Ok(turn)
    }

    /// Pick the single tool call for this turn: native directives first,
    /// then a directive embedded in the text
    fn select_tool_call(&self, completion: &Completion) -> Option<ToolCall> {
        if completion.tool_calls.len() > 1 {
            tracing::warn!(
                count = completion.tool_calls.len(),
                "Model requested several tools; only the first is executed"
            );
        }

        let mut call = completion
            .tool_calls
            .first()
            .cloned()
            .or_else(|| parse_tool_call(&completion.content))?;

        if call.id.is_none() {
            call.id = Some(uuid::Uuid::new_v4().to_string());
        }
        if !self.tools.contains(&call.name) {
            tracing::warn!(tool = %call.name, "Model requested an unregistered tool");
        }
        Some(call)
    }

    /// Execute a tool call; failures become the tool's output
    async fn execute_tool(&self, call: &ToolCall) -> ToolResult {
        match self.tools.execute(call).await {
            Ok(mut result) => {
                result.id.clone_from(&call.id);
                result
            }
            Err(e) => {
                tracing::warn!(tool = %call.name, error = %e, "Tool call rejected");
                ToolResult {
                    name: call.name.clone(),
                    id: call.id.clone(),
                    success: false,
                    output: format!("Error: {e}"),
                }
            }
        }
    }

    /// Get the tool registry
    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Get the provider
    pub fn provider(&self) -> &dyn LlmProvider {
        self.provider.as_ref()
    }
}

/// Parse a tool call embedded in model text: a fenced ```tool block, or a
/// reply that is nothing but a JSON object with a "tool" or "name" key
pub fn parse_tool_call(content: &str) -> Option<ToolCall> {
    let tool_start = "```tool";
    let tool_end = "```";

    if let Some(start_idx) = content.find(tool_start) {
        let after_marker = &content[start_idx + tool_start.len()..];
        if let Some(end_idx) = after_marker.find(tool_end) {
            let json_str = after_marker[..end_idx].trim();
            if let Ok(call) = serde_json::from_str::<ToolCall>(json_str) {
                return Some(call);
            }
        }
    }

    let trimmed = content.trim();
    if trimmed.starts_with('{') && trimmed.ends_with('}') {
        return serde_json::from_str::<ToolCall>(trimmed).ok();
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fenced_tool_call() {
        let content = r#"Let me check that for you.
```tool
{"tool": "calculator", "arguments": {"expression": "2 + 2"}}
```"#;

        let call = parse_tool_call(content).unwrap();
        assert_eq!(call.name, "calculator");
        assert_eq!(call.arguments["expression"], "2 + 2");
    }

    #[test]
    fn test_parse_bare_json_tool_call() {
        let call = parse_tool_call(r#" {"name": "say_hello", "arguments": {"name": "Ada"}} "#).unwrap();
        assert_eq!(call.name, "say_hello");
    }

    #[test]
    fn test_plain_text_is_not_a_tool_call() {
        assert!(parse_tool_call("The answer is {probably} 4").is_none());
        assert!(parse_tool_call("Hello there!").is_none());
        assert!(parse_tool_call(r#"{"answer": 4}"#).is_none());
    }
}
