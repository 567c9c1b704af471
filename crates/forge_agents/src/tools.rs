//! Tools the implementation operations may call.

use std::sync::Arc;

use forge_llm::{ToolCall, ToolSpec};
use forge_rag::RetrievalService;
use serde_json::json;
use tracing::debug;

use crate::operation::{ToolKind, ToolSet};
use crate::prompts::API_CONVENTIONS;

/// Documents returned per knowledge base search.
const SEARCH_RESULTS: usize = 1;

/// Executes tool calls against the injected retrieval service.
#[derive(Clone, Default)]
pub struct ToolBox {
    retrieval: Option<Arc<dyn RetrievalService>>,
}

impl ToolBox {
    /// Tool box without a knowledge base; searches report that.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retrieval(retrieval: Arc<dyn RetrievalService>) -> Self {
        Self {
            retrieval: Some(retrieval),
        }
    }

    pub fn has_retrieval(&self) -> bool {
        self.retrieval.is_some()
    }

    /// Function specs for the tools in `set`.
    pub fn specs(&self, set: &ToolSet) -> Vec<ToolSpec> {
        set.iter().map(tool_spec).collect()
    }

    /// Run one call. Tool failures come back as text for the model.
    pub async fn execute(&self, allowed: &ToolSet, call: &ToolCall) -> String {
        debug!("Tool call {}({})", call.name, call.arguments);

        let tool = match ToolKind::from_name(&call.name) {
            Some(tool) if allowed.contains(tool) => tool,
            _ => return format!("Unknown tool: {}", call.name),
        };

        match tool {
            ToolKind::ApiConventions => API_CONVENTIONS.to_string(),
            ToolKind::KnowledgeBaseSearch => {
                let query = match call.str_arg("query") {
                    Some(q) if !q.trim().is_empty() => q,
                    _ => return "Missing required argument 'query'.".to_string(),
                };
                match &self.retrieval {
                    Some(retrieval) => retrieval.query(query, SEARCH_RESULTS).await,
                    None => "Knowledge base is not configured.".to_string(),
                }
            }
        }
    }
}

fn tool_spec(tool: ToolKind) -> ToolSpec {
    match tool {
        ToolKind::ApiConventions => ToolSpec {
            name: tool.name().to_string(),
            description: "Get mandatory API rules and legacy signatures for Arcade 2.x. \
                          Call this to verify drawing, rendering or texture calls."
                .to_string(),
            parameters: json!({ "type": "object", "properties": {} }),
        },
        ToolKind::KnowledgeBaseSearch => ToolSpec {
            name: tool.name().to_string(),
            description: "Search the Arcade 2.6 knowledge base for implementation details, \
                          code examples or patterns (collision, movement, grids)."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string", "description": "What to look up" }
                },
                "required": ["query"]
            }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingRetrieval {
        queries: Mutex<Vec<(String, usize)>>,
    }

    #[async_trait]
    impl RetrievalService for RecordingRetrieval {
        async fn query(&self, text: &str, top_k: usize) -> String {
            self.queries.lock().push((text.to_string(), top_k));
            format!("docs for {}", text)
        }
    }

    #[tokio::test]
    async fn test_search_uses_injected_retrieval() {
        let retrieval = Arc::new(RecordingRetrieval::default());
        let tools = ToolBox::with_retrieval(retrieval.clone());
        let call = ToolCall::new("1", "search_knowledge_base", json!({"query": "collision"}));

        let result = tools.execute(&ToolSet::implementation(), &call).await;
        assert_eq!(result, "docs for collision");
        assert_eq!(retrieval.queries.lock().as_slice(), &[("collision".to_string(), 1)]);
    }

    #[tokio::test]
    async fn test_conventions_are_static() {
        let tools = ToolBox::new();
        let call = ToolCall::new("1", "get_api_conventions", json!({}));
        let result = tools.execute(&ToolSet::implementation(), &call).await;
        assert!(result.contains("start_render"));
    }

    #[tokio::test]
    async fn test_undeclared_tool_is_refused() {
        let tools = ToolBox::new();
        let call = ToolCall::new("1", "get_api_conventions", json!({}));
        let result = tools.execute(&ToolSet::none(), &call).await;
        assert_eq!(result, "Unknown tool: get_api_conventions");
    }

    #[tokio::test]
    async fn test_search_without_knowledge_base_or_query() {
        let tools = ToolBox::new();
        let set = ToolSet::implementation();

        let call = ToolCall::new("1", "search_knowledge_base", json!({"query": "sprites"}));
        assert_eq!(tools.execute(&set, &call).await, "Knowledge base is not configured.");

        let call = ToolCall::new("2", "search_knowledge_base", json!({}));
        assert!(tools.execute(&set, &call).await.starts_with("Missing"));
    }

    #[test]
    fn test_specs_follow_tool_set() {
        let tools = ToolBox::new();
        assert!(tools.specs(&ToolSet::none()).is_empty());

        let names: Vec<String> = tools
            .specs(&ToolSet::implementation())
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["get_api_conventions", "search_knowledge_base"]);
    }
}
