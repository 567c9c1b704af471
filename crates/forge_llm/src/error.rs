//! Error types for the LLM layer.

use std::fmt;

/// LLM layer errors
#[derive(Debug)]
pub enum LlmError {
    /// No credentials for the selected provider
    NotConfigured(String),
    /// Request failed at the transport or API level
    Request(String),
    /// The provider answered with something we cannot use
    InvalidResponse(String),
    /// File system error
    IoError(std::io::Error),
    /// Serialization error
    SerializationError(String),
}

impl fmt::Display for LlmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConfigured(provider) => write!(
                f,
                "LLM not configured for provider '{}'. Set OPENAI_API_KEY or ANTHROPIC_API_KEY",
                provider
            ),
            Self::Request(msg) => write!(f, "LLM request failed: {}", msg),
            Self::InvalidResponse(msg) => write!(f, "Invalid LLM response: {}", msg),
            Self::IoError(e) => write!(f, "I/O error: {}", e),
            Self::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl std::error::Error for LlmError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for LlmError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError(err)
    }
}

impl From<serde_json::Error> for LlmError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

/// Result type for LLM operations
pub type LlmResult<T> = Result<T, LlmError>;
