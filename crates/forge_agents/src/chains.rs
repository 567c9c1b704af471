//! Operation registry backed by a chat model.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use forge_core::{FileSkeleton, Provider, ReviewVerdict, TechnicalPlan};
use forge_llm::{ChatModel, CompletionRequest, LlmSettings, Message};
use tracing::{debug, info, warn};

use crate::error::{AgentError, AgentResult};
use crate::operation::{OperationKind, OperationSpec, DEFAULT_TEMPERATURE};
use crate::prompts;
use crate::tools::ToolBox;
use crate::traits::{AgentFactory, AgentOperations};

/// Maximum model turns that may request tools before a final answer is forced.
pub const MAX_TOOL_ROUNDS: usize = 4;

/// Binds every [`OperationKind`] to a prompt, temperature and tool set over one model.
pub struct AgentChainRegistry {
    model: Arc<dyn ChatModel>,
    tools: ToolBox,
    specs: BTreeMap<OperationKind, OperationSpec>,
}

impl AgentChainRegistry {
    pub fn new(model: Arc<dyn ChatModel>, tools: ToolBox) -> Self {
        Self::with_temperature(model, tools, DEFAULT_TEMPERATURE)
    }

    /// Registry whose operations sample at `temperature` (asset design keeps its own).
    pub fn with_temperature(model: Arc<dyn ChatModel>, tools: ToolBox, temperature: f32) -> Self {
        let specs = OperationKind::all()
            .iter()
            .map(|kind| (*kind, OperationSpec::for_kind(*kind, temperature)))
            .collect();
        Self { model, tools, specs }
    }

    pub fn spec(&self, kind: OperationKind) -> OperationSpec {
        self.specs
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| OperationSpec::for_kind(kind, DEFAULT_TEMPERATURE))
    }

    pub fn model_name(&self) -> &str {
        self.model.model()
    }

    /// Run one operation and return the model's final text.
    pub async fn invoke(&self, kind: OperationKind, user_prompt: String) -> AgentResult<String> {
        let spec = self.spec(kind);
        debug!(operation = %kind, temperature = spec.temperature, "Invoking {}", kind.role());

        let mut messages = vec![Message::system(spec.system_prompt), Message::user(user_prompt)];
        let tool_specs = self.tools.specs(&spec.tools);

        for round in 0..MAX_TOOL_ROUNDS {
            let request = CompletionRequest::new(messages.clone())
                .temperature(spec.temperature)
                .tools(tool_specs.clone());
            let response = self
                .model
                .complete(&request)
                .await
                .map_err(|e| AgentError::invocation(kind.as_str(), e))?;

            if !response.wants_tools() || tool_specs.is_empty() {
                return Ok(response.content);
            }

            debug!(
                operation = %kind,
                round = round + 1,
                "Model requested {} tool call(s)",
                response.tool_calls.len()
            );
            messages.push(Message::assistant_tool_calls(
                response.content.clone(),
                response.tool_calls.clone(),
            ));
            for call in &response.tool_calls {
                let result = self.tools.execute(&spec.tools, call).await;
                messages.push(Message::tool_result(call.id.clone(), result));
            }
        }

        // Out of tool rounds: ask once more without tools.
        warn!(operation = %kind, "Tool round limit reached, forcing a final answer");
        let request = CompletionRequest::new(messages).temperature(spec.temperature);
        let response = self
            .model
            .complete(&request)
            .await
            .map_err(|e| AgentError::invocation(kind.as_str(), e))?;
        Ok(response.content)
    }
}

#[async_trait]
impl AgentOperations for AgentChainRegistry {
    async fn analyze(&self, idea: &str) -> AgentResult<String> {
        self.invoke(OperationKind::Analyze, prompts::analyze_prompt(idea)).await
    }

    async fn draft(&self, idea: &str, analysis: &str, feedback: &str) -> AgentResult<String> {
        self.invoke(OperationKind::Draft, prompts::draft_prompt(idea, analysis, feedback))
            .await
    }

    async fn critique(&self, document: &str) -> AgentResult<String> {
        self.invoke(OperationKind::Critique, prompts::critique_prompt(document))
            .await
    }

    async fn plan(&self, design: &str, assets: &str) -> AgentResult<TechnicalPlan> {
        let raw = self
            .invoke(OperationKind::Plan, prompts::plan_prompt(design, assets))
            .await?;
        let plan = parse_plan(&raw)?;
        info!("Plan parsed: {} file(s)", plan.files.len());
        Ok(plan)
    }

    async fn implement_file(&self, skeleton: &FileSkeleton, constraints: &str) -> AgentResult<String> {
        self.invoke(
            OperationKind::ImplementFile,
            prompts::implement_file_prompt(skeleton, constraints),
        )
        .await
    }

    async fn implement_consolidated(
        &self,
        plan_context: &str,
        filename: &str,
        constraints: &str,
    ) -> AgentResult<String> {
        self.invoke(
            OperationKind::ImplementConsolidated,
            prompts::implement_consolidated_prompt(plan_context, filename, constraints),
        )
        .await
    }

    async fn fix_runtime(&self, code: &str, error: &str) -> AgentResult<String> {
        self.invoke(OperationKind::FixRuntime, prompts::fix_runtime_prompt(code, error))
            .await
    }

    async fn review_logic(&self, code: &str) -> AgentResult<ReviewVerdict> {
        let text = self
            .invoke(OperationKind::ReviewLogic, prompts::review_logic_prompt(code))
            .await?;
        Ok(ReviewVerdict::new(text))
    }

    async fn fix_logic(&self, code: &str, findings: &str) -> AgentResult<String> {
        self.invoke(OperationKind::FixLogic, prompts::fix_logic_prompt(code, findings))
            .await
    }

    async fn design_assets(&self, design: &str) -> AgentResult<String> {
        self.invoke(OperationKind::DesignAssets, prompts::design_assets_prompt(design))
            .await
    }
}

/// Parse a technical plan from model output.
///
/// Accepts bare JSON, fenced JSON, or JSON surrounded by prose: the span
/// from the first `{` to the last `}` is decoded.
pub fn parse_plan(raw: &str) -> AgentResult<TechnicalPlan> {
    let start = raw.find('{');
    let end = raw.rfind('}');
    let json = match (start, end) {
        (Some(start), Some(end)) if start < end => &raw[start..=end],
        _ => return Err(AgentError::InvalidPlan("no JSON object in plan output".to_string())),
    };
    serde_json::from_str(json).map_err(|e| AgentError::InvalidPlan(e.to_string()))
}

/// Builds registries from LLM settings, sharing one tool box.
pub struct ChainFactory {
    settings: LlmSettings,
    tools: ToolBox,
}

impl ChainFactory {
    pub fn new(settings: LlmSettings, tools: ToolBox) -> Self {
        Self { settings, tools }
    }
}

impl AgentFactory for ChainFactory {
    fn agents_for(&self, provider: Provider, model: Option<&str>) -> AgentResult<Arc<dyn AgentOperations>> {
        let adapter = self
            .settings
            .adapter_for(provider, model)
            .map_err(|e| AgentError::LlmUnavailable(e.to_string()))?;
        info!("Using {} model {}", provider, adapter.model());

        Ok(Arc::new(AgentChainRegistry::with_temperature(
            Arc::new(adapter),
            self.tools.clone(),
            self.settings.temperature,
        )))
    }
}
