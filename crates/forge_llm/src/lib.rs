//! # forge_llm
//!
//! Provider adapters for chat completions.
//!
//! Every operation in the generation pipeline talks to a model through the
//! [`ChatModel`] trait. [`LlmAdapter`] implements it over HTTP for OpenAI,
//! Anthropic and Ollama (through its OpenAI-compatible endpoint), including
//! tool calling. [`MockChatModel`] scripts responses for tests.

pub mod adapter;
pub mod error;
pub mod mock;
pub mod settings;
pub mod types;

pub use adapter::{default_model, ChatModel, LlmAdapter};
pub use error::{LlmError, LlmResult};
pub use mock::MockChatModel;
pub use settings::LlmSettings;
pub use types::{CompletionRequest, LlmResponse, Message, MessageRole, ToolCall, ToolSpec};
