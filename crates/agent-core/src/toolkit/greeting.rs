//! Greeting Tool

use async_trait::async_trait;

use crate::error::Result;
use crate::tool::{ParameterSchema, Tool, ToolCall, ToolResult, ToolSchema};

/// Greets a user by name
pub struct SayHelloTool;

impl SayHelloTool {
    pub const NAME: &'static str = "say_hello";

    pub fn greet(name: &str) -> String {
        format!("Hello {name}, I hope you are well today")
    }
}

#[async_trait]
impl Tool for SayHelloTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: Self::NAME.into(),
            description: "Useful for greeting a user".into(),
            parameters: vec![
                ParameterSchema::new("name", "string", "Name of the person to greet").required(),
            ],
        }
    }

    async fn execute(&self, call: &ToolCall) -> Result<ToolResult> {
        let name = match call.arguments.get("name") {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => return Ok(ToolResult::failure(Self::NAME, "Missing required parameter: name")),
        };

        tracing::info!(tool = Self::NAME, "tool called");
        Ok(ToolResult::success(Self::NAME, Self::greet(&name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_greets_by_name() {
        let call = ToolCall::new("say_hello").arg("name", serde_json::json!("Ada"));
        let result = SayHelloTool.execute(&call).await.unwrap();
        assert!(result.success);
        assert_eq!(result.output, "Hello Ada, I hope you are well today");
    }

    #[tokio::test]
    async fn test_name_kept_verbatim() {
        let call = ToolCall::new("say_hello").arg("name", serde_json::json!("  Dr. O'Neil "));
        let result = SayHelloTool.execute(&call).await.unwrap();
        assert!(result.output.contains("  Dr. O'Neil "));
    }
}
