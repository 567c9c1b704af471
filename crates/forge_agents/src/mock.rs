//! Scripted operations for testing pipeline stages.
//!
//! Replies are queued per operation and consumed in order. When an
//! operation's queue is empty a neutral default is returned: reviews pass,
//! fixes echo the code back, plans are empty.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use forge_core::{FileSkeleton, ReviewVerdict, TechnicalPlan};
use forge_llm::LlmError;
use parking_lot::RwLock;

use crate::chains::parse_plan;
use crate::error::{AgentError, AgentResult};
use crate::operation::OperationKind;
use crate::traits::AgentOperations;

/// A scripted reply.
#[derive(Debug, Clone)]
pub enum MockReply {
    Text(String),
    Fail(String),
}

/// Captured call information for verification.
#[derive(Debug, Clone, PartialEq)]
pub struct MockCall {
    pub kind: OperationKind,
    /// Arguments in declaration order
    pub inputs: Vec<String>,
}

/// Mock operations for testing.
#[derive(Clone, Default)]
pub struct MockAgents {
    replies: Arc<RwLock<HashMap<OperationKind, VecDeque<MockReply>>>>,
    calls: Arc<RwLock<Vec<MockCall>>>,
}

impl MockAgents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a text reply for `kind`.
    pub fn reply(self, kind: OperationKind, text: impl Into<String>) -> Self {
        self.push(kind, MockReply::Text(text.into()))
    }

    /// Queue an invocation failure for `kind`.
    pub fn fail(self, kind: OperationKind, message: impl Into<String>) -> Self {
        self.push(kind, MockReply::Fail(message.into()))
    }

    /// Queue a plan reply, serialized the way a model would answer.
    pub fn with_plan(self, plan: &TechnicalPlan) -> Self {
        let json = serde_json::to_string_pretty(plan).unwrap_or_default();
        self.reply(OperationKind::Plan, format!("```json\n{}\n```", json))
    }

    fn push(self, kind: OperationKind, reply: MockReply) -> Self {
        self.replies.write().entry(kind).or_default().push_back(reply);
        self
    }

    /// Get all captured calls.
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.read().clone()
    }

    /// Calls to one operation.
    pub fn calls_to(&self, kind: OperationKind) -> Vec<MockCall> {
        self.calls
            .read()
            .iter()
            .filter(|c| c.kind == kind)
            .cloned()
            .collect()
    }

    pub fn call_count(&self, kind: OperationKind) -> usize {
        self.calls.read().iter().filter(|c| c.kind == kind).count()
    }

    /// Operation kinds in call order.
    pub fn call_sequence(&self) -> Vec<OperationKind> {
        self.calls.read().iter().map(|c| c.kind).collect()
    }

    fn respond(&self, kind: OperationKind, inputs: Vec<String>, default: String) -> AgentResult<String> {
        self.calls.write().push(MockCall { kind, inputs });

        let reply = self
            .replies
            .write()
            .get_mut(&kind)
            .and_then(|queue| queue.pop_front());
        match reply {
            Some(MockReply::Text(text)) => Ok(text),
            Some(MockReply::Fail(message)) => {
                Err(AgentError::invocation(kind.as_str(), LlmError::Request(message)))
            }
            None => Ok(default),
        }
    }
}

#[async_trait]
impl AgentOperations for MockAgents {
    async fn analyze(&self, idea: &str) -> AgentResult<String> {
        self.respond(
            OperationKind::Analyze,
            vec![idea.to_string()],
            format!("Analysis of {}", idea),
        )
    }

    async fn draft(&self, idea: &str, analysis: &str, feedback: &str) -> AgentResult<String> {
        self.respond(
            OperationKind::Draft,
            vec![idea.to_string(), analysis.to_string(), feedback.to_string()],
            format!("Design document for {}", idea),
        )
    }

    async fn critique(&self, document: &str) -> AgentResult<String> {
        self.respond(
            OperationKind::Critique,
            vec![document.to_string()],
            "No further changes".to_string(),
        )
    }

    async fn plan(&self, design: &str, assets: &str) -> AgentResult<TechnicalPlan> {
        let text = self.respond(
            OperationKind::Plan,
            vec![design.to_string(), assets.to_string()],
            r#"{"architecture": "", "files": [], "constraints": []}"#.to_string(),
        )?;
        parse_plan(&text)
    }

    async fn implement_file(&self, skeleton: &FileSkeleton, constraints: &str) -> AgentResult<String> {
        self.respond(
            OperationKind::ImplementFile,
            vec![skeleton.filename.clone(), constraints.to_string()],
            format!("```python\n# {}\n```", skeleton.filename),
        )
    }

    async fn implement_consolidated(
        &self,
        plan_context: &str,
        filename: &str,
        constraints: &str,
    ) -> AgentResult<String> {
        self.respond(
            OperationKind::ImplementConsolidated,
            vec![plan_context.to_string(), filename.to_string(), constraints.to_string()],
            format!("```python\n# {}\n```", filename),
        )
    }

    async fn fix_runtime(&self, code: &str, error: &str) -> AgentResult<String> {
        self.respond(
            OperationKind::FixRuntime,
            vec![code.to_string(), error.to_string()],
            code.to_string(),
        )
    }

    async fn review_logic(&self, code: &str) -> AgentResult<ReviewVerdict> {
        self.respond(OperationKind::ReviewLogic, vec![code.to_string()], "PASS".to_string())
            .map(ReviewVerdict::new)
    }

    async fn fix_logic(&self, code: &str, findings: &str) -> AgentResult<String> {
        self.respond(
            OperationKind::FixLogic,
            vec![code.to_string(), findings.to_string()],
            code.to_string(),
        )
    }

    async fn design_assets(&self, design: &str) -> AgentResult<String> {
        self.respond(
            OperationKind::DesignAssets,
            vec![design.to_string()],
            "{}".to_string(),
        )
    }
}
