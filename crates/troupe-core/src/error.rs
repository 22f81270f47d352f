//! Error types for agent operations.

use thiserror::Error;

/// Result type for agent operations.
pub type AgentResult<T> = Result<T, AgentError>;

/// Errors that can occur while an agent processes work.
#[derive(Error, Debug)]
pub enum AgentError {
    /// Task processing failed
    #[error("task failed: {0}")]
    TaskFailed(String),

    /// LLM call failed
    #[error("llm call failed: {0}")]
    LlmCall(String),

    /// Agent produced structured output that could not be interpreted
    #[error("malformed agent output: {0}")]
    MalformedOutput(String),

    /// Payload serialization failed
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Message handling failed
    #[error("message handling failed: {0}")]
    MessageHandling(String),
}
