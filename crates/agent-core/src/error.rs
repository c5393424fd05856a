//! Error Types

use thiserror::Error;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Agent error types
#[derive(Error, Debug)]
pub enum AgentError {
    /// The endpoint answered with an error status or payload
    #[error("Provider error: {0}")]
    Provider(String),

    /// Endpoint unreachable or timed out
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Tool not found in registry
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Tool validation failed
    #[error("Tool validation error: {0}")]
    ToolValidation(String),

    /// Parse error (e.g., malformed endpoint response)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Missing or invalid startup configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other/unknown error
    #[error("{0}")]
    Other(String),
}

impl AgentError {
    /// Only configuration problems are allowed to stop a session.
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}
