//! LLM adapter for chat completions.
//!
//! Supports OpenAI, Anthropic and Ollama. Ollama is reached through its
//! OpenAI-compatible endpoint, so both share the same wire format.

use std::time::Duration;

use async_trait::async_trait;
use forge_core::Provider;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::error::{LlmError, LlmResult};
use crate::types::{CompletionRequest, LlmResponse, MessageRole, ToolCall};

const OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";
const ANTHROPIC_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Retry ceiling for transient errors (5xx, rate limits, network issues)
const MAX_RETRIES: u32 = 3;

/// A chat model that can complete a conversation.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Model identifier used for requests
    fn model(&self) -> &str;

    /// Complete a conversation
    async fn complete(&self, request: &CompletionRequest) -> LlmResult<LlmResponse>;
}

/// Default model for a provider
pub fn default_model(provider: Provider) -> &'static str {
    match provider {
        Provider::OpenAi => "gpt-4o",
        Provider::Anthropic => "claude-3-5-sonnet-latest",
        Provider::Ollama => "llama3.1",
    }
}

/// LLM adapter that handles API calls
pub struct LlmAdapter {
    provider: Provider,
    api_key: String,
    model: String,
    endpoint: String,
    client: reqwest::Client,
}

impl LlmAdapter {
    /// Create a new LLM adapter with explicit configuration
    pub fn new(provider: Provider, api_key: impl Into<String>, model: Option<String>) -> Self {
        let endpoint = match provider {
            Provider::OpenAi => OPENAI_URL.to_string(),
            Provider::Anthropic => ANTHROPIC_URL.to_string(),
            Provider::Ollama => "http://localhost:11434/v1/chat/completions".to_string(),
        };

        Self {
            provider,
            api_key: api_key.into(),
            model: model.unwrap_or_else(|| default_model(provider).to_string()),
            endpoint,
            client: reqwest::Client::new(),
        }
    }

    /// Ollama adapter rooted at `base_url` (e.g. `http://localhost:11434`)
    pub fn ollama(base_url: &str, model: Option<String>) -> Self {
        Self::new(Provider::Ollama, String::new(), model)
            .with_endpoint(format!("{}/v1/chat/completions", base_url.trim_end_matches('/')))
    }

    /// Override the API endpoint (proxies, compatible gateways)
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Get the current provider
    pub fn provider(&self) -> Provider {
        self.provider
    }

    /// Get the endpoint requests are sent to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    // POST with retries on transient failures; exponential backoff 1s, 2s
    async fn post_json(&self, headers: &[(&str, String)], body: &Value) -> LlmResult<Value> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1));
                tokio::time::sleep(delay).await;
            }

            let mut builder = self
                .client
                .post(&self.endpoint)
                .header("Content-Type", "application/json");
            for (name, value) in headers {
                builder = builder.header(*name, value);
            }

            let response = match builder.json(body).send().await {
                Ok(resp) => resp,
                Err(e) => {
                    warn!("{} network error (attempt {}/{}): {}", self.provider, attempt + 1, MAX_RETRIES, e);
                    last_error = Some(LlmError::Request(format!("Network error: {}", e)));
                    continue;
                }
            };

            let status = response.status();

            if status.is_server_error() || status.as_u16() == 429 {
                let body = response.text().await.unwrap_or_default();
                last_error = Some(LlmError::Request(format!(
                    "{} API error {} (attempt {}/{}): {}",
                    self.provider,
                    status,
                    attempt + 1,
                    MAX_RETRIES,
                    body
                )));
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(LlmError::Request(format!(
                    "{} API error {}: {}",
                    self.provider, status, body
                )));
            }

            return response
                .json::<Value>()
                .await
                .map_err(|e| LlmError::InvalidResponse(format!("Failed to parse response: {}", e)));
        }

        Err(last_error.unwrap_or_else(|| LlmError::Request("Max retries exceeded".to_string())))
    }

    // OpenAI-compatible chat completion (OpenAI and Ollama)
    async fn complete_openai(&self, request: &CompletionRequest) -> LlmResult<LlmResponse> {
        let body = openai_body(&self.model, self.provider, request);
        let mut headers = Vec::new();
        if !self.api_key.is_empty() {
            headers.push(("Authorization", format!("Bearer {}", self.api_key)));
        }

        let raw = self.post_json(&headers, &body).await?;
        let mut response = parse_openai_response(raw)?;
        response.model = self.model.clone();
        Ok(response)
    }

    // Anthropic messages API
    async fn complete_anthropic(&self, request: &CompletionRequest) -> LlmResult<LlmResponse> {
        let body = anthropic_body(&self.model, request);
        let headers = vec![
            ("x-api-key", self.api_key.clone()),
            ("anthropic-version", ANTHROPIC_VERSION.to_string()),
        ];

        let raw = self.post_json(&headers, &body).await?;
        let mut response = parse_anthropic_response(raw)?;
        response.model = self.model.clone();
        Ok(response)
    }
}

#[async_trait]
impl ChatModel for LlmAdapter {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &CompletionRequest) -> LlmResult<LlmResponse> {
        debug!(
            provider = %self.provider,
            model = %self.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "Sending completion request"
        );
        match self.provider {
            Provider::OpenAi | Provider::Ollama => self.complete_openai(request).await,
            Provider::Anthropic => self.complete_anthropic(request).await,
        }
    }
}

fn role_name(role: MessageRole) -> &'static str {
    match role {
        MessageRole::System => "system",
        MessageRole::User => "user",
        MessageRole::Assistant => "assistant",
        MessageRole::Tool => "tool",
    }
}

fn openai_body(model: &str, provider: Provider, request: &CompletionRequest) -> Value {
    let messages: Vec<Value> = request
        .messages
        .iter()
        .map(|m| {
            let mut message = json!({ "role": role_name(m.role), "content": m.content });
            if !m.tool_calls.is_empty() {
                let calls: Vec<Value> = m
                    .tool_calls
                    .iter()
                    .map(|c| {
                        json!({
                            "id": c.id,
                            "type": "function",
                            "function": { "name": c.name, "arguments": c.arguments.to_string() }
                        })
                    })
                    .collect();
                message["tool_calls"] = Value::Array(calls);
            }
            if let Some(id) = &m.tool_call_id {
                message["tool_call_id"] = json!(id);
            }
            message
        })
        .collect();

    let mut body = json!({
        "model": model,
        "messages": messages,
        "temperature": request.temperature,
    });
    match provider {
        Provider::Ollama => body["max_tokens"] = json!(request.max_tokens),
        _ => body["max_completion_tokens"] = json!(request.max_tokens),
    }

    if !request.tools.is_empty() {
        let tools: Vec<Value> = request
            .tools
            .iter()
            .map(|t| {
                json!({
                    "type": "function",
                    "function": {
                        "name": t.name,
                        "description": t.description,
                        "parameters": t.parameters,
                    }
                })
            })
            .collect();
        body["tools"] = Value::Array(tools);
    }

    body
}

fn anthropic_body(model: &str, request: &CompletionRequest) -> Value {
    // Anthropic requires the system message to be separate, and tool results
    // travel as content blocks of a user turn.
    let mut messages: Vec<Value> = Vec::new();
    for m in request.messages.iter().filter(|m| m.role != MessageRole::System) {
        match m.role {
            MessageRole::Tool => {
                let block = json!({
                    "type": "tool_result",
                    "tool_use_id": m.tool_call_id.clone().unwrap_or_default(),
                    "content": m.content,
                });
                let merged = messages.last_mut().and_then(|last| {
                    let is_result_turn = last["role"] == "user"
                        && last["content"]
                            .as_array()
                            .map(|blocks| blocks.iter().all(|b| b["type"] == "tool_result"))
                            .unwrap_or(false);
                    if is_result_turn {
                        last["content"].as_array_mut()
                    } else {
                        None
                    }
                });
                match merged {
                    Some(blocks) => blocks.push(block),
                    None => messages.push(json!({ "role": "user", "content": [block] })),
                }
            }
            MessageRole::Assistant if !m.tool_calls.is_empty() => {
                let mut blocks = Vec::new();
                if !m.content.trim().is_empty() {
                    blocks.push(json!({ "type": "text", "text": m.content }));
                }
                for call in &m.tool_calls {
                    blocks.push(json!({
                        "type": "tool_use",
                        "id": call.id,
                        "name": call.name,
                        "input": call.arguments,
                    }));
                }
                messages.push(json!({ "role": "assistant", "content": blocks }));
            }
            role => messages.push(json!({ "role": role_name(role), "content": m.content })),
        }
    }

    let mut body = json!({
        "model": model,
        "max_tokens": request.max_tokens,
        "temperature": request.temperature,
        "messages": messages,
    });
    if let Some(system) = request.system_prompt() {
        body["system"] = json!(system);
    }
    if !request.tools.is_empty() {
        let tools: Vec<Value> = request
            .tools
            .iter()
            .map(|t| json!({ "name": t.name, "description": t.description, "input_schema": t.parameters }))
            .collect();
        body["tools"] = Value::Array(tools);
    }
    body
}

// OpenAI API types
#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<OpenAIToolCall>,
}

#[derive(Debug, Deserialize)]
struct OpenAIToolCall {
    id: String,
    function: OpenAIFunctionCall,
}

#[derive(Debug, Deserialize)]
struct OpenAIFunctionCall {
    name: String,
    arguments: String,
}

fn parse_openai_response(raw: Value) -> LlmResult<LlmResponse> {
    let result: OpenAIResponse = serde_json::from_value(raw)
        .map_err(|e| LlmError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

    let message = result
        .choices
        .into_iter()
        .next()
        .map(|c| c.message)
        .ok_or_else(|| LlmError::InvalidResponse("No choices in response".to_string()))?;

    let tool_calls = message
        .tool_calls
        .into_iter()
        .map(|c| {
            let arguments = serde_json::from_str(&c.function.arguments)
                .unwrap_or_else(|_| json!({ "raw": c.function.arguments }));
            ToolCall::new(c.id, c.function.name, arguments)
        })
        .collect();

    let (input_tokens, output_tokens) = result
        .usage
        .map(|u| (u.prompt_tokens, u.completion_tokens))
        .unwrap_or((0, 0));

    Ok(LlmResponse {
        content: message.content.unwrap_or_default(),
        tool_calls,
        input_tokens,
        output_tokens,
        model: String::new(),
    })
}

// Anthropic API types
#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
    usage: Option<AnthropicUsage>,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u64,
    output_tokens: u64,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicContent {
    Text { text: String },
    ToolUse { id: String, name: String, input: Value },
    #[serde(other)]
    Other,
}

fn parse_anthropic_response(raw: Value) -> LlmResult<LlmResponse> {
    let result: AnthropicResponse = serde_json::from_value(raw)
        .map_err(|e| LlmError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

    let mut content = String::new();
    let mut tool_calls = Vec::new();
    for block in result.content {
        match block {
            AnthropicContent::Text { text } => content.push_str(&text),
            AnthropicContent::ToolUse { id, name, input } => {
                tool_calls.push(ToolCall::new(id, name, input))
            }
            AnthropicContent::Other => {}
        }
    }

    if content.is_empty() && tool_calls.is_empty() {
        return Err(LlmError::InvalidResponse("No response from Anthropic".to_string()));
    }

    let (input_tokens, output_tokens) = result
        .usage
        .map(|u| (u.input_tokens, u.output_tokens))
        .unwrap_or((0, 0));

    Ok(LlmResponse {
        content,
        tool_calls,
        input_tokens,
        output_tokens,
        model: String::new(),
    })
}
