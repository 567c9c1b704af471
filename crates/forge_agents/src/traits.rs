//! Operation interface used by the pipeline stages.

use std::sync::Arc;

use async_trait::async_trait;
use forge_core::{FileSkeleton, Provider, ReviewVerdict, TechnicalPlan};

use crate::error::AgentResult;

/// The named operations a generation run needs.
///
/// Each call is independent: implementations keep no conversation state
/// between calls and contain no pipeline retry logic.
#[async_trait]
pub trait AgentOperations: Send + Sync {
    /// High-level analysis of a raw game idea.
    async fn analyze(&self, idea: &str) -> AgentResult<String>;

    /// Draft a design document; `feedback` is `"None"` on the first round.
    async fn draft(&self, idea: &str, analysis: &str, feedback: &str) -> AgentResult<String>;

    /// Critique a design document.
    async fn critique(&self, document: &str) -> AgentResult<String>;

    /// Structured technical plan for a design and its asset metadata.
    async fn plan(&self, design: &str, assets: &str) -> AgentResult<TechnicalPlan>;

    /// Implement one planned file. May use tools.
    async fn implement_file(&self, skeleton: &FileSkeleton, constraints: &str) -> AgentResult<String>;

    /// Implement the whole plan as a single file. May use tools.
    async fn implement_consolidated(
        &self,
        plan_context: &str,
        filename: &str,
        constraints: &str,
    ) -> AgentResult<String>;

    /// Repair code that crashed at runtime.
    async fn fix_runtime(&self, code: &str, error: &str) -> AgentResult<String>;

    /// Static logic review.
    async fn review_logic(&self, code: &str) -> AgentResult<ReviewVerdict>;

    /// Repair code according to review findings.
    async fn fix_logic(&self, code: &str, findings: &str) -> AgentResult<String>;

    /// Asset metadata for a design (raw model text).
    async fn design_assets(&self, design: &str) -> AgentResult<String>;
}

/// Creates operation bindings for a provider and model.
pub trait AgentFactory: Send + Sync {
    fn agents_for(&self, provider: Provider, model: Option<&str>) -> AgentResult<Arc<dyn AgentOperations>>;
}
