//! # agent-core
//!
//! Chat session loop with a single-tool-per-turn responder and a
//! post-processor that turns a finished turn into one display string.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Session                               │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────┐  │
//! │  │  Responder  │  │    Tools    │  │   LlmProvider       │  │
//! │  │  (1 tool)   │──│   Registry  │──│   (Strategy)        │  │
//! │  └─────────────┘  └─────────────┘  └─────────────────────┘  │
//! │         │                                                    │
//! │         ▼                                                    │
//! │  ┌─────────────┐                                             │
//! │  │ Postprocess │ ──▶ "Assistant: <display text>"             │
//! │  └─────────────┘                                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `LlmProvider` trait hides the model endpoint (Ollama, any
//! OpenAI-compatible API, or a scripted test double) from the loop.

pub mod error;
pub mod message;
pub mod postprocess;
pub mod provider;
pub mod responder;
pub mod session;
pub mod tool;
pub mod toolkit;

pub use error::{AgentError, Result};
pub use message::{Message, Role, Turn};
pub use provider::LlmProvider;
pub use responder::{Responder, ResponderConfig};
pub use session::Session;
pub use tool::{Tool, ToolCall, ToolRegistry, ToolResult, ToolSchema};
