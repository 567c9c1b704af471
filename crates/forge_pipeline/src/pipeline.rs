//! End-to-end generation: design, assets, production, self-healing, save.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use forge_agents::{generate_assets, AgentFactory};
use forge_core::{DesignDocument, GenerationRequest, ProgressSink, TracingProgress};
use forge_runner::FuzzRunner;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::config::PipelineConfig;
use crate::design::run_design;
use crate::error::PipelineResult;
use crate::healing::{HealingReport, SelfHealingStage};
use crate::persistence::{create_run_dir, write_files, RunManifest};
use crate::production::ProductionStage;

/// Final state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationStatus {
    Success,
    Failure,
}

/// What the caller of [`GamePipeline::generate`] gets back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationOutcome {
    pub status: GenerationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<String>,
}

impl GenerationOutcome {
    pub fn success(path: PathBuf, files: Vec<String>) -> Self {
        Self {
            status: GenerationStatus::Success,
            path: Some(path),
            error: None,
            files,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            status: GenerationStatus::Failure,
            path: None,
            error: Some(error.into()),
            files: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == GenerationStatus::Success
    }
}

/// Everything a successful run produced.
#[derive(Debug, Clone)]
pub struct GenerationRun {
    pub path: PathBuf,
    pub design: DesignDocument,
    pub assets: String,
    pub report: HealingReport,
}

/// Composes the stages for one request at a time.
///
/// Holds no state between runs; operations are bound per request through
/// the agent factory.
pub struct GamePipeline {
    factory: Arc<dyn AgentFactory>,
    runner: Arc<dyn FuzzRunner>,
    progress: Arc<dyn ProgressSink>,
    config: PipelineConfig,
}

impl GamePipeline {
    pub fn new(factory: Arc<dyn AgentFactory>, runner: Arc<dyn FuzzRunner>, config: PipelineConfig) -> Self {
        Self {
            factory,
            runner,
            progress: Arc::new(TracingProgress),
            config,
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the whole pipeline. Errors become a failure outcome.
    pub async fn generate(&self, request: &GenerationRequest) -> GenerationOutcome {
        match self.run(request).await {
            Ok(run) => GenerationOutcome::success(run.path, run.report.files.filenames()),
            Err(e) => {
                error!("Generation failed: {}", e);
                self.progress.notify(&format!("Error: {}", e));
                GenerationOutcome::failure(e.to_string())
            }
        }
    }

    /// Run the whole pipeline, propagating the first fatal error.
    pub async fn run(&self, request: &GenerationRequest) -> PipelineResult<GenerationRun> {
        let agents = self
            .factory
            .agents_for(request.provider, request.model.as_deref())?;
        let progress = self.progress.as_ref();

        info!("Generation started with {}", request.provider);
        progress.notify(&format!(
            "Starting game generation using {} for: {}",
            request.provider.as_str().to_uppercase(),
            request.idea
        ));

        let design = run_design(agents.as_ref(), &request.idea, progress).await?;

        progress.notify("[Assets] Generating asset metadata...");
        let assets = generate_assets(agents.as_ref(), design.as_str()).await;

        let files = ProductionStage::new(self.config.production_mode())
            .run(agents.as_ref(), &design, &assets, progress)
            .await?;
        if files.is_empty() {
            warn!("Production produced no files");
            progress.notify("[Production] No files were produced");
        }

        let run_dir = create_run_dir(&self.config.output_dir, &request.idea, Utc::now()).await?;
        let report = SelfHealingStage::new(agents, self.runner.clone(), self.config.healing_config())
            .with_progress(self.progress.clone())
            .run(files, &run_dir)
            .await?;

        progress.notify("[Save] Saving final files...");
        write_files(&run_dir, &report.files).await?;
        RunManifest::new(request.clone(), self.config.mode.to_string(), report.clone())
            .write(&run_dir)
            .await?;

        info!("Game saved at {}", run_dir.display());
        progress.notify(&format!("Done! Game saved at: {}", run_dir.display()));

        Ok(GenerationRun {
            path: run_dir,
            design,
            assets,
            report,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_json_shape() {
        let ok = GenerationOutcome::success(PathBuf::from("out/pong"), vec!["main.py".to_string()]);
        let json = serde_json::to_value(&ok).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["path"], "out/pong");
        assert!(json.get("error").is_none());

        let failed = GenerationOutcome::failure("LLM unavailable");
        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(json["status"], "failure");
        assert_eq!(json["error"], "LLM unavailable");
        assert!(json.get("path").is_none());
        assert!(!failed.is_success());
    }
}
