//! Ollama LLM Provider
//!
//! Implementation of `LlmProvider` for a local Ollama server through
//! `ollama-rs`, with native tool calling on non-streaming chat requests.

use std::collections::HashMap;
use std::time::Duration;

use agent_core::{
    error::{AgentError, Result},
    message::{Message, Role},
    provider::{Completion, FinishReason, GenerationOptions, LlmProvider, ModelInfo, TokenUsage},
    tool::{ToolCall, ToolSchema},
};
use async_trait::async_trait;
use ollama_rs::{
    Ollama,
    generation::{
        chat::{ChatMessage, ChatMessageResponse, MessageRole, request::ChatMessageRequest},
        tools::ToolInfo,
    },
    models::ModelOptions,
};

use crate::config::OllamaConfig;

const NAME: &str = "ollama";

/// Ollama LLM provider
pub struct OllamaProvider {
    client: Ollama,
    base_url: String,
}

impl OllamaProvider {
    /// Create a new Ollama provider with custom host/port
    pub fn new(host: impl Into<String>, port: u16) -> Result<Self> {
        Self::from_config(OllamaConfig {
            host: host.into(),
            port,
            ..Default::default()
        })
    }

    /// Create from configuration; a host that is not a URL is a configuration error
    pub fn from_config(config: OllamaConfig) -> Result<Self> {
        let base_url = config.base_url();
        let url = reqwest::Url::parse(&base_url)
            .map_err(|e| AgentError::Config(format!("invalid OLLAMA_HOST '{}': {e}", config.host)))?;
        let host = url
            .host_str()
            .ok_or_else(|| AgentError::Config(format!("OLLAMA_HOST '{}' has no host", config.host)))?;
        let port = url.port_or_known_default().unwrap_or(config.port);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AgentError::Config(format!("cannot build HTTP client: {e}")))?;

        let host = format!("{}://{host}", url.scheme());
        Ok(Self {
            client: Ollama::new_with_client(&host, port, http),
            base_url,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Convert agent messages to Ollama format
    fn convert_messages(messages: &[Message]) -> Result<Vec<ChatMessage>> {
        messages
            .iter()
            .map(|m| {
                let role = match m.role {
                    Role::System => MessageRole::System,
                    Role::Human => MessageRole::User,
                    Role::Assistant => MessageRole::Assistant,
                    Role::Tool => MessageRole::Tool,
                };
                let mut message = ChatMessage::new(role, m.content.clone());
                if let Some(call) = m.tool_call() {
                    message.tool_calls = vec![serde_json::from_value(serde_json::json!({
                        "function": {"name": call.name, "arguments": call.arguments}
                    }))?];
                }
                Ok(message)
            })
            .collect()
    }

    fn convert_tools(tools: &[ToolSchema]) -> Result<Vec<ToolInfo>> {
        tools
            .iter()
            .map(|tool| Ok(serde_json::from_value(tool.function_definition())?))
            .collect()
    }

    fn build_options(opts: &GenerationOptions) -> ModelOptions {
        ModelOptions::default()
            .temperature(opts.temperature)
            .top_p(opts.top_p)
            .num_predict(i32::try_from(opts.max_tokens).unwrap_or(i32::MAX))
    }

    /// Convert Ollama response to agent completion
    fn convert_completion(response: ChatMessageResponse, requested_model: &str) -> Completion {
        let tool_calls: Vec<ToolCall> = response
            .message
            .tool_calls
            .into_iter()
            .map(|tc| {
                let call = ToolCall::new(tc.function.name);
                match serde_json::from_value::<HashMap<String, serde_json::Value>>(tc.function.arguments) {
                    Ok(arguments) => ToolCall { arguments, ..call },
                    Err(e) => {
                        tracing::warn!(tool = %call.name, error = %e, "Tool arguments are not an object");
                        call.with_argument_error(e.to_string())
                    }
                }
            })
            .collect();

        let finish_reason = if tool_calls.is_empty() {
            FinishReason::Stop
        } else {
            FinishReason::ToolUse
        };

        Completion {
            content: response.message.content,
            model: if response.model.is_empty() {
                requested_model.to_string()
            } else {
                response.model
            },
            usage: response
                .final_data
                .as_ref()
                .map(|d| token_usage(d.prompt_eval_count, d.eval_count)),
            tool_calls,
            finish_reason: Some(finish_reason),
        }
    }
}

/// Token counts as reported by Ollama, clamped to `u32`
fn token_usage(prompt: impl Into<Option<u64>>, completion: impl Into<Option<u64>>) -> TokenUsage {
    let clamp = |count: Option<u64>| u32::try_from(count.unwrap_or(0)).unwrap_or(u32::MAX);
    let prompt_tokens = clamp(prompt.into());
    let completion_tokens = clamp(completion.into());

    TokenUsage {
        prompt_tokens,
        completion_tokens,
        total_tokens: prompt_tokens.saturating_add(completion_tokens),
    }
}

/// Map an `ollama-rs` failure onto the agent taxonomy. Connection and
/// timeout failures anywhere in the source chain mean the endpoint is
/// unreachable.
fn classify(err: &(dyn std::error::Error + 'static)) -> AgentError {
    let mut source = Some(err);
    while let Some(e) = source {
        let unreachable = e
            .downcast_ref::<reqwest::Error>()
            .is_some_and(|re| re.is_connect() || re.is_timeout())
            || e.downcast_ref::<std::io::Error>().is_some_and(|io| {
                matches!(
                    io.kind(),
                    std::io::ErrorKind::ConnectionRefused
                        | std::io::ErrorKind::ConnectionReset
                        | std::io::ErrorKind::ConnectionAborted
                        | std::io::ErrorKind::TimedOut
                )
            });
        if unreachable {
            return AgentError::ProviderUnavailable(format!("{NAME}: {err}"));
        }
        source = e.source();
    }
    AgentError::Provider(format!("{NAME}: {err}"))
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    fn name(&self) -> &str {
        NAME
    }

    async fn health_check(&self) -> Result<bool> {
        match self.client.list_local_models().await {
            Ok(_) => Ok(true),
            Err(e) => {
                tracing::warn!("Ollama health check failed: {}", e);
                Ok(false)
            }
        }
    }

    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolSchema],
        options: &GenerationOptions,
    ) -> Result<Completion> {
        let mut request =
            ChatMessageRequest::new(options.model.clone(), Self::convert_messages(messages)?)
                .options(Self::build_options(options));
        if !tools.is_empty() {
            request = request.tools(Self::convert_tools(tools)?);
        }

        tracing::debug!(model = %options.model, messages = messages.len(), tools = tools.len(), "Ollama chat");

        let response = self
            .client
            .send_chat_messages(request)
            .await
            .map_err(|e| classify(&e))?;

        Ok(Self::convert_completion(response, &options.model))
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let local = self
            .client
            .list_local_models()
            .await
            .map_err(|e| classify(&e))?;

        let mut models: Vec<ModelInfo> = local
            .into_iter()
            .map(|m| ModelInfo {
                id: m.name.clone(),
                name: m.name,
                size_bytes: m.size.into(),
                modified_at: m.modified_at.into(),
                family: None,
            })
            .collect();
        models.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(models)
    }

    fn troubleshooting_hint(&self) -> &str {
        "Please check if Ollama is running and the model is available."
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = OllamaConfig::default();
        assert_eq!(config.host, "http://localhost");
        assert_eq!(config.port, 11434);
        let provider = OllamaProvider::from_config(config).unwrap();
        assert_eq!(provider.base_url(), "http://localhost:11434");
    }

    #[test]
    fn test_invalid_host_is_config_error() {
        let err = OllamaProvider::new("not a url", 11434).err().unwrap();
        assert!(matches!(err, AgentError::Config(_)));
    }

    #[test]
    fn test_message_conversion() {
        let call = ToolCall::new("calculator").arg("expression", serde_json::json!("1+1"));
        let messages = vec![
            Message::system("You are helpful."),
            Message::human("Hello"),
            Message::assistant("").with_tool_call(call),
            Message::tool("calculator", "The result of 1+1 is 2", Some("c1".into())),
        ];

        let converted = OllamaProvider::convert_messages(&messages).unwrap();
        let wire: Vec<serde_json::Value> = converted
            .iter()
            .map(|m| serde_json::to_value(m).unwrap())
            .collect();
        assert_eq!(wire.len(), 4);
        assert_eq!(wire[1]["role"], "user");
        assert_eq!(wire[2]["tool_calls"][0]["function"]["name"], "calculator");
        assert_eq!(wire[2]["tool_calls"][0]["function"]["arguments"]["expression"], "1+1");
        assert_eq!(wire[3]["role"], "tool");
    }

    #[test]
    fn test_completion_with_tool_call() {
        let body = r#"{
            "model": "llama3.2:1b",
            "created_at": "2024-06-01T10:00:00Z",
            "message": {
                "role": "assistant",
                "content": "",
                "tool_calls": [{"function": {"name": "say_hello", "arguments": {"name": "Ada"}}}]
            },
            "done": true
        }"#;
        let response: ChatMessageResponse = serde_json::from_str(body).unwrap();
        let completion = OllamaProvider::convert_completion(response, "llama3.2:1b");

        assert_eq!(completion.finish_reason, Some(FinishReason::ToolUse));
        assert_eq!(completion.tool_calls[0].name, "say_hello");
        assert_eq!(completion.tool_calls[0].arguments["name"], "Ada");
    }

    #[test]
    fn test_non_object_arguments_kept_as_error() {
        let body = r#"{
            "model": "llama3.2:1b",
            "created_at": "2024-06-01T10:00:00Z",
            "message": {
                "role": "assistant",
                "content": "",
                "tool_calls": [{"function": {"name": "calculator", "arguments": "2+3"}}]
            },
            "done": true
        }"#;
        let response: ChatMessageResponse = serde_json::from_str(body).unwrap();
        let completion = OllamaProvider::convert_completion(response, "llama3.2:1b");

        let call = &completion.tool_calls[0];
        assert!(call.arguments.is_empty());
        assert!(call.argument_error.is_some());
    }

    #[test]
    fn test_token_usage_saturates() {
        let usage = token_usage(Some(u64::from(u32::MAX) - 1), Some(10));
        assert_eq!(usage.prompt_tokens, u32::MAX - 1);
        assert_eq!(usage.total_tokens, u32::MAX);

        let usage = token_usage(u64::MAX, None);
        assert_eq!(usage.prompt_tokens, u32::MAX);
        assert_eq!(usage.completion_tokens, 0);
    }

    #[test]
    fn test_tool_schemas_convert() {
        let registry = agent_core::toolkit::default_registry().unwrap();
        let infos = OllamaProvider::convert_tools(&registry.schemas()).unwrap();
        assert_eq!(infos.len(), 2);
    }

    #[test]
    fn test_classify_connection_refused() {
        let refused = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        assert!(matches!(classify(&refused), AgentError::ProviderUnavailable(_)));

        let other = std::io::Error::new(std::io::ErrorKind::InvalidData, "garbage");
        assert!(matches!(classify(&other), AgentError::Provider(_)));
    }
}
