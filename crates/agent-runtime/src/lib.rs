//! # agent-runtime
//!
//! Runtime providers and startup configuration for agent-chat.
//!
//! ## Providers
//!
//! - **Ollama** (default): local inference through `/api/chat`
//! - **OpenAI**: any OpenAI-compatible `/chat/completions` endpoint
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agent_runtime::{RuntimeConfig, build_provider};
//!
//! let config = RuntimeConfig::from_env()?;
//! let provider = build_provider(&config)?;
//! let responder = Responder::new(provider, tools, config.responder_config());
//! ```

pub mod config;

#[cfg(feature = "openai")]
mod http;

#[cfg(feature = "ollama")]
pub mod ollama;

#[cfg(feature = "openai")]
pub mod openai;

use std::sync::Arc;

pub use config::{ProviderKind, RuntimeConfig};

#[cfg(feature = "ollama")]
pub use ollama::OllamaProvider;

#[cfg(feature = "openai")]
pub use openai::OpenAiProvider;

// Re-export core types for convenience
pub use agent_core::{AgentError, LlmProvider, Message, Result, Role, Session, Tool, ToolRegistry};

/// Construct the provider selected by `config`
pub fn build_provider(config: &RuntimeConfig) -> Result<Arc<dyn LlmProvider>> {
    match config.provider {
        #[cfg(feature = "ollama")]
        ProviderKind::Ollama => Ok(Arc::new(OllamaProvider::from_config(config.ollama.clone())?)),
        #[cfg(feature = "openai")]
        ProviderKind::OpenAi => {
            let openai = config.openai.clone().ok_or_else(|| {
                AgentError::Config("OPENAI_API_KEY must be set for the openai provider".into())
            })?;
            Ok(Arc::new(OpenAiProvider::from_config(openai)?))
        }
        #[allow(unreachable_patterns)]
        other => Err(AgentError::Config(format!(
            "provider '{other}' is not compiled into this build"
        ))),
    }
}
