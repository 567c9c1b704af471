//! Error types for agents module.

use forge_llm::LlmError;
use thiserror::Error;

/// Result type alias for agent operations.
pub type AgentResult<T> = Result<T, AgentError>;

/// Errors that can occur during agent operations.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Operation {operation} failed: {source}")]
    Invocation {
        operation: String,
        #[source]
        source: LlmError,
    },

    #[error("Unusable technical plan: {0}")]
    InvalidPlan(String),

    #[error("LLM not available: {0}")]
    LlmUnavailable(String),
}

impl AgentError {
    /// Wrap a model failure for the named operation.
    pub fn invocation(operation: impl Into<String>, source: LlmError) -> Self {
        Self::Invocation {
            operation: operation.into(),
            source,
        }
    }
}
