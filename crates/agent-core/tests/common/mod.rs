#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use agent_core::provider::{Completion, GenerationOptions, LlmProvider, ModelInfo};
use agent_core::{AgentError, Message, Result, ToolSchema};
use async_trait::async_trait;

/// Mock provider that replays scripted completions in order
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<Result<Completion>>>,
    requests: Mutex<Vec<(Vec<Message>, usize)>>,
}

impl ScriptedProvider {
    pub fn new(replies: Vec<Result<Completion>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Messages and tool count of every `complete` call so far
    pub fn requests(&self) -> Vec<(Vec<Message>, usize)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolSchema],
        _options: &GenerationOptions,
    ) -> Result<Completion> {
        self.requests
            .lock()
            .unwrap()
            .push((messages.to_vec(), tools.len()));
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AgentError::Other("script exhausted".into())))
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        Ok(Vec::new())
    }

    fn troubleshooting_hint(&self) -> &str {
        "Please check the scripted endpoint."
    }
}

pub fn text(content: &str) -> Result<Completion> {
    Ok(Completion::text(content, "scripted-model"))
}

pub fn tool_call(call: agent_core::ToolCall) -> Result<Completion> {
    Ok(Completion {
        model: "scripted-model".into(),
        tool_calls: vec![call],
        ..Default::default()
    })
}

pub fn unreachable() -> Result<Completion> {
    Err(AgentError::ProviderUnavailable("connection refused".into()))
}
