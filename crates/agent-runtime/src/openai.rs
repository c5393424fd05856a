//! OpenAI-compatible Provider
//!
//! Talks to `/chat/completions` with bearer auth and native function
//! calling. A custom root certificate can be trusted for TLS-intercepting
//! corporate proxies.

use std::time::Duration;

use agent_core::{
    error::{AgentError, Result},
    message::{Message, Role},
    provider::{Completion, FinishReason, GenerationOptions, LlmProvider, ModelInfo, TokenUsage},
    tool::{ToolCall, ToolSchema},
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::OpenAiConfig;
use crate::http;

const NAME: &str = "openai";

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<serde_json::Value>,
    temperature: f32,
    top_p: f32,
    max_tokens: u32,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct WireMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<WireToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireToolCall {
    #[serde(default)]
    id: Option<String>,
    #[serde(rename = "type", default = "function_type")]
    kind: String,
    function: WireFunction,
}

fn function_type() -> String {
    "function".into()
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunction {
    name: String,
    /// JSON-encoded argument object
    #[serde(default)]
    arguments: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: String,
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<TokenUsage>,
}

#[derive(Deserialize)]
struct Choice {
    message: WireMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ModelsResponse {
    #[serde(default)]
    data: Vec<ModelEntry>,
}

#[derive(Deserialize)]
struct ModelEntry {
    id: String,
    #[serde(default)]
    owned_by: Option<String>,
}

/// OpenAI-compatible chat provider
pub struct OpenAiProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl OpenAiProvider {
    /// Create from configuration; an unreadable CA certificate is a configuration error
    pub fn from_config(config: OpenAiConfig) -> Result<Self> {
        let mut builder =
            reqwest::Client::builder().timeout(Duration::from_secs(config.timeout_secs));

        if let Some(path) = &config.ca_cert_path {
            let pem = std::fs::read(path).map_err(|e| {
                AgentError::Config(format!("cannot read CA certificate {}: {e}", path.display()))
            })?;
            let cert = reqwest::Certificate::from_pem(&pem).map_err(|e| {
                AgentError::Config(format!("invalid CA certificate {}: {e}", path.display()))
            })?;
            tracing::info!(path = %path.display(), "Using custom CA certificate");
            builder = builder.add_root_certificate(cert);
        }

        if config.accept_invalid_certs {
            tracing::warn!("TLS certificate verification disabled for the OpenAI endpoint");
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder
            .build()
            .map_err(|e| AgentError::Config(format!("cannot build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key,
        })
    }

    fn convert_messages(messages: &[Message]) -> Vec<WireMessage> {
        messages
            .iter()
            .map(|m| match m.role {
                Role::System => WireMessage {
                    role: "system".into(),
                    content: Some(m.content.clone()),
                    ..Default::default()
                },
                Role::Human => WireMessage {
                    role: "user".into(),
                    content: Some(m.content.clone()),
                    ..Default::default()
                },
                Role::Assistant => WireMessage {
                    role: "assistant".into(),
                    content: (!m.content.is_empty() || m.tool_call().is_none())
                        .then(|| m.content.clone()),
                    tool_calls: m
                        .tool_call()
                        .map(|call| vec![Self::wire_call(call)])
                        .unwrap_or_default(),
                    tool_call_id: None,
                },
                Role::Tool => WireMessage {
                    role: "tool".into(),
                    content: Some(m.content.clone()),
                    tool_calls: Vec::new(),
                    tool_call_id: m
                        .tool_call_id()
                        .map(String::from)
                        .or_else(|| m.producer.clone()),
                },
            })
            .collect()
    }

    fn wire_call(call: &ToolCall) -> WireToolCall {
        WireToolCall {
            id: call.id.clone().or_else(|| Some(call.name.clone())),
            kind: function_type(),
            function: WireFunction {
                name: call.name.clone(),
                arguments: serde_json::to_string(&call.arguments).unwrap_or_else(|_| "{}".into()),
            },
        }
    }

    fn parse_call(call: WireToolCall) -> ToolCall {
        let mut parsed = ToolCall::new(call.function.name);
        parsed.id = call.id;

        let raw = call.function.arguments.trim();
        if raw.is_empty() {
            return parsed;
        }
        match serde_json::from_str(raw) {
            Ok(arguments) => {
                parsed.arguments = arguments;
                parsed
            }
            Err(e) => {
                tracing::warn!(tool = %parsed.name, error = %e, "Unparseable tool arguments");
                parsed.with_argument_error(e.to_string())
            }
        }
    }

    fn convert_completion(response: ChatResponse, requested_model: &str) -> Result<Completion> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AgentError::Parse("openai response has no choices".into()))?;

        let tool_calls: Vec<ToolCall> = choice
            .message
            .tool_calls
            .into_iter()
            .map(Self::parse_call)
            .collect();

        let finish_reason = match choice.finish_reason.as_deref() {
            Some("length") => FinishReason::Length,
            Some("tool_calls" | "function_call") => FinishReason::ToolUse,
            Some("content_filter") => FinishReason::ContentFilter,
            _ if !tool_calls.is_empty() => FinishReason::ToolUse,
            _ => FinishReason::Stop,
        };

        Ok(Completion {
            content: choice.message.content.unwrap_or_default(),
            model: if response.model.is_empty() {
                requested_model.to_string()
            } else {
                response.model
            },
            usage: response.usage,
            tool_calls,
            finish_reason: Some(finish_reason),
        })
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        NAME
    }

    async fn health_check(&self) -> Result<bool> {
        match self.list_models().await {
            Ok(_) => Ok(true),
            Err(e) => {
                tracing::warn!("OpenAI health check failed: {}", e);
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
        let request = ChatRequest {
            model: &options.model,
            messages: Self::convert_messages(messages),
            tools: tools.iter().map(ToolSchema::function_definition).collect(),
            temperature: options.temperature,
            top_p: options.top_p,
            max_tokens: options.max_tokens,
        };

        tracing::debug!(model = %options.model, messages = messages.len(), "POST /chat/completions");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| http::send_error(NAME, &e))?;
        let response = http::ensure_success(NAME, response).await?;
        let body: ChatResponse = http::decode(NAME, response).await?;

        Self::convert_completion(body, &options.model)
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let response = self
            .client
            .get(format!("{}/models", self.base_url))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| http::send_error(NAME, &e))?;
        let response = http::ensure_success(NAME, response).await?;
        let body: ModelsResponse = http::decode(NAME, response).await?;

        let mut models: Vec<ModelInfo> = body
            .data
            .into_iter()
            .map(|m| ModelInfo {
                name: m.id.clone(),
                id: m.id,
                family: m.owned_by,
                ..Default::default()
            })
            .collect();
        models.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(models)
    }

    fn troubleshooting_hint(&self) -> &str {
        "Please check your API key and network connection."
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_exchange_conversion() {
        let call = ToolCall::new("say_hello")
            .arg("name", serde_json::json!("Ada"))
            .with_id("call_1");
        let messages = vec![
            Message::human("greet Ada"),
            Message::assistant("").with_tool_call(call),
            Message::tool("say_hello", "Hello Ada, I hope you are well today", Some("call_1".into())),
        ];

        let wire = OpenAiProvider::convert_messages(&messages);
        assert_eq!(wire[0].role, "user");
        assert!(wire[1].content.is_none());
        assert_eq!(wire[1].tool_calls[0].id.as_deref(), Some("call_1"));
        assert_eq!(wire[1].tool_calls[0].function.arguments, r#"{"name":"Ada"}"#);
        assert_eq!(wire[2].tool_call_id.as_deref(), Some("call_1"));
    }

    #[test]
    fn test_completion_with_tool_call() {
        let body = r#"{
            "model": "gpt-4o",
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_9",
                        "type": "function",
                        "function": {"name": "calculator", "arguments": "{\"expression\": \"2+3\"}"}
                    }]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": {"prompt_tokens": 12, "completion_tokens": 8, "total_tokens": 20}
        }"#;
        let response: ChatResponse = serde_json::from_str(body).unwrap();
        let completion = OpenAiProvider::convert_completion(response, "gpt-4o").unwrap();

        assert_eq!(completion.content, "");
        assert_eq!(completion.finish_reason, Some(FinishReason::ToolUse));
        assert_eq!(completion.tool_calls[0].id.as_deref(), Some("call_9"));
        assert_eq!(completion.tool_calls[0].arguments["expression"], "2+3");
    }

    #[test]
    fn test_malformed_arguments_kept_as_error() {
        let call = OpenAiProvider::parse_call(WireToolCall {
            id: Some("call_3".into()),
            kind: function_type(),
            function: WireFunction {
                name: "calculator".into(),
                arguments: r#"{"expression": "2+"#.into(),
            },
        });

        assert_eq!(call.name, "calculator");
        assert_eq!(call.id.as_deref(), Some("call_3"));
        assert!(call.arguments.is_empty());
        assert!(call.argument_error.as_deref().unwrap().contains("EOF"));
    }

    #[test]
    fn test_no_choices_is_parse_error() {
        let response: ChatResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        let err = OpenAiProvider::convert_completion(response, "gpt-4o").unwrap_err();
        assert!(matches!(err, AgentError::Parse(_)));
    }

    #[test]
    fn test_missing_ca_certificate_is_config_error() {
        let config = OpenAiConfig {
            api_key: "sk-test".into(),
            base_url: "https://api.openai.com/v1".into(),
            ca_cert_path: Some("/nonexistent/corp-ca.pem".into()),
            accept_invalid_certs: false,
            timeout_secs: 5,
        };
        let err = OpenAiProvider::from_config(config).err().unwrap();
        assert!(matches!(err, AgentError::Config(_)));
    }
}
