//! Scripted chat model for tests.
//!
//! Responses are returned in the order they were queued. Once the queue is
//! empty every call answers with an empty text response. Every request is
//! captured for later inspection.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::adapter::ChatModel;
use crate::error::{LlmError, LlmResult};
use crate::types::{CompletionRequest, LlmResponse};

/// Mock chat model with queued responses.
#[derive(Clone)]
pub struct MockChatModel {
    model: String,
    responses: Arc<RwLock<VecDeque<LlmResponse>>>,
    captured: Arc<RwLock<Vec<CompletionRequest>>>,
    simulate_failure: Arc<RwLock<Option<String>>>,
}

impl Default for MockChatModel {
    fn default() -> Self {
        Self::new()
    }
}

impl MockChatModel {
    pub fn new() -> Self {
        Self {
            model: "mock-model".to_string(),
            responses: Arc::new(RwLock::new(VecDeque::new())),
            captured: Arc::new(RwLock::new(Vec::new())),
            simulate_failure: Arc::new(RwLock::new(None)),
        }
    }

    /// Queue a plain text response.
    pub fn add_text(self, content: impl Into<String>) -> Self {
        self.add_response(LlmResponse::text(content))
    }

    /// Queue an arbitrary response.
    pub fn add_response(self, response: LlmResponse) -> Self {
        self.responses.write().push_back(response);
        self
    }

    /// Fail every call with a request error.
    pub fn simulate_failure(self, message: impl Into<String>) -> Self {
        *self.simulate_failure.write() = Some(message.into());
        self
    }

    /// All captured requests, oldest first.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.captured.read().clone()
    }

    pub fn call_count(&self) -> usize {
        self.captured.read().len()
    }

    /// Responses still waiting in the queue.
    pub fn remaining(&self) -> usize {
        self.responses.read().len()
    }
}

#[async_trait]
impl ChatModel for MockChatModel {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &CompletionRequest) -> LlmResult<LlmResponse> {
        self.captured.write().push(request.clone());

        if let Some(message) = self.simulate_failure.read().clone() {
            return Err(LlmError::Request(message));
        }

        let mut response = self.responses.write().pop_front().unwrap_or_default();
        response.model = self.model.clone();
        Ok(response)
    }
}
