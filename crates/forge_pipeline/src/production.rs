//! Production stage: plan once, then implement.

use forge_agents::AgentOperations;
use forge_core::{CodeSanitizer, DesignDocument, ProgressSink, ProjectFileSet, TechnicalPlan};
use tracing::{info, warn};

use crate::error::PipelineResult;

/// File name used for single-file output unless configured otherwise.
pub const DEFAULT_CONSOLIDATED_FILE: &str = "game.py";

/// How the plan is turned into source files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ProductionMode {
    /// One implementation call per planned file, in plan order.
    #[default]
    MultiFile,
    /// A single implementation call producing one file.
    Consolidated { filename: String },
}

impl ProductionMode {
    pub fn consolidated() -> Self {
        Self::Consolidated {
            filename: DEFAULT_CONSOLIDATED_FILE.to_string(),
        }
    }
}

/// Runs the architect and programmer operations.
#[derive(Debug, Clone, Default)]
pub struct ProductionStage {
    mode: ProductionMode,
    sanitizer: CodeSanitizer,
}

impl ProductionStage {
    pub fn new(mode: ProductionMode) -> Self {
        Self {
            mode,
            sanitizer: CodeSanitizer::default(),
        }
    }

    pub fn with_sanitizer(mut self, sanitizer: CodeSanitizer) -> Self {
        self.sanitizer = sanitizer;
        self
    }

    pub fn mode(&self) -> &ProductionMode {
        &self.mode
    }

    /// Produce the project's files.
    ///
    /// A planning failure yields an empty set. Implementation failures
    /// propagate.
    pub async fn run(
        &self,
        agents: &dyn AgentOperations,
        design: &DesignDocument,
        asset_metadata: &str,
        progress: &dyn ProgressSink,
    ) -> PipelineResult<ProjectFileSet> {
        progress.notify("[Production] Architect planning file structure...");
        let plan = match agents.plan(design.as_str(), asset_metadata).await {
            Ok(plan) => plan,
            Err(e) => {
                warn!("Planning failed, no files produced: {}", e);
                progress.notify("[Production] Architect returned no usable plan");
                return Ok(ProjectFileSet::new());
            }
        };
        info!("Plan has {} file(s)", plan.files.len());

        match &self.mode {
            ProductionMode::MultiFile => self.implement_files(agents, &plan, progress).await,
            ProductionMode::Consolidated { filename } => {
                self.implement_consolidated(agents, &plan, filename, progress)
                    .await
            }
        }
    }

    async fn implement_files(
        &self,
        agents: &dyn AgentOperations,
        plan: &TechnicalPlan,
        progress: &dyn ProgressSink,
    ) -> PipelineResult<ProjectFileSet> {
        let constraints = plan.constraints_text();
        let mut files = ProjectFileSet::new();

        for skeleton in &plan.files {
            progress.notify(&format!("[Production] Implementing {}...", skeleton.filename));
            let raw = agents.implement_file(skeleton, &constraints).await?;
            if files.contains(&skeleton.filename) {
                warn!("{} planned twice, keeping the later implementation", skeleton.filename);
            }
            files.insert(skeleton.filename.clone(), self.sanitizer.sanitize(&raw));
        }

        Ok(files)
    }

    async fn implement_consolidated(
        &self,
        agents: &dyn AgentOperations,
        plan: &TechnicalPlan,
        filename: &str,
        progress: &dyn ProgressSink,
    ) -> PipelineResult<ProjectFileSet> {
        progress.notify(&format!("[Production] Implementing {} as a single file...", filename));
        let raw = agents
            .implement_consolidated(&plan.context(), filename, &plan.constraints_text())
            .await?;

        let mut files = ProjectFileSet::new();
        files.insert(filename, self.sanitizer.sanitize(&raw));
        Ok(files)
    }
}

/// Run the production stage with the default sanitizer.
pub async fn run_production(
    agents: &dyn AgentOperations,
    design: &DesignDocument,
    asset_metadata: &str,
    mode: &ProductionMode,
    progress: &dyn ProgressSink,
) -> PipelineResult<ProjectFileSet> {
    ProductionStage::new(mode.clone())
        .run(agents, design, asset_metadata, progress)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_agents::{MockAgents, OperationKind};
    use forge_core::{FileSkeleton, NullProgress};

    fn skeleton(name: &str) -> FileSkeleton {
        FileSkeleton {
            filename: name.to_string(),
            purpose: format!("{} purpose", name),
            skeleton_code: "pass".to_string(),
        }
    }

    fn plan(names: &[&str]) -> TechnicalPlan {
        TechnicalPlan {
            architecture: "MVC".to_string(),
            files: names.iter().map(|n| skeleton(n)).collect(),
            constraints: vec!["use arcade".to_string(), "use arcade".to_string(), "60 fps".to_string()],
        }
    }

    #[tokio::test]
    async fn test_multi_file_in_plan_order() {
        let agents = MockAgents::new()
            .with_plan(&plan(&["logic.py", "main.py"]))
            .reply(OperationKind::ImplementFile, "Here:\n```python\nclass Board:\n    pass\n```")
            .reply(OperationKind::ImplementFile, "import arcade\narcade.run()");
        let design = DesignDocument::new("gdd");

        let files = run_production(&agents, &design, "{}", &ProductionMode::MultiFile, &NullProgress)
            .await
            .unwrap();

        assert_eq!(files.filenames(), vec!["logic.py", "main.py"]);
        assert_eq!(files.get("logic.py"), Some("class Board:\n    pass"));
        assert_eq!(files.get("main.py"), Some("import arcade\narcade.run()"));

        let calls = agents.calls_to(OperationKind::ImplementFile);
        assert_eq!(calls[0].inputs, vec!["logic.py", "use arcade\n60 fps"]);
        assert_eq!(calls[1].inputs[0], "main.py");
    }

    #[tokio::test]
    async fn test_plan_failure_yields_empty_set() {
        let agents = MockAgents::new().reply(OperationKind::Plan, "I cannot plan this.");
        let files = run_production(
            &agents,
            &DesignDocument::new("gdd"),
            "{}",
            &ProductionMode::MultiFile,
            &NullProgress,
        )
        .await
        .unwrap();

        assert!(files.is_empty());
        assert_eq!(agents.call_count(OperationKind::ImplementFile), 0);
    }

    #[tokio::test]
    async fn test_duplicate_filename_keeps_later() {
        let agents = MockAgents::new()
            .with_plan(&plan(&["main.py", "main.py"]))
            .reply(OperationKind::ImplementFile, "import first")
            .reply(OperationKind::ImplementFile, "import second");

        let files = run_production(
            &agents,
            &DesignDocument::new("gdd"),
            "{}",
            &ProductionMode::MultiFile,
            &NullProgress,
        )
        .await
        .unwrap();

        assert_eq!(files.len(), 1);
        assert_eq!(files.get("main.py"), Some("import second"));
    }

    #[tokio::test]
    async fn test_consolidated_single_call() {
        let agents = MockAgents::new()
            .with_plan(&plan(&["logic.py", "main.py"]))
            .reply(OperationKind::ImplementConsolidated, "```py\nimport arcade\n```");

        let files = run_production(
            &agents,
            &DesignDocument::new("gdd"),
            "{}",
            &ProductionMode::consolidated(),
            &NullProgress,
        )
        .await
        .unwrap();

        assert_eq!(files.filenames(), vec!["game.py"]);
        assert_eq!(files.get("game.py"), Some("import arcade"));
        assert_eq!(agents.call_count(OperationKind::ImplementFile), 0);

        let call = &agents.calls_to(OperationKind::ImplementConsolidated)[0];
        assert!(call.inputs[0].contains("## logic.py"));
        assert_eq!(call.inputs[1], "game.py");
    }

    #[tokio::test]
    async fn test_implementation_failure_propagates() {
        let agents = MockAgents::new()
            .with_plan(&plan(&["main.py"]))
            .fail(OperationKind::ImplementFile, "timeout");

        let result = run_production(
            &agents,
            &DesignDocument::new("gdd"),
            "{}",
            &ProductionMode::MultiFile,
            &NullProgress,
        )
        .await;
        assert!(result.is_err());
    }
}
