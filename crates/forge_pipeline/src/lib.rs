//! # forge_pipeline
//!
//! The iterative self-healing generation pipeline.
//!
//! A run flows through fixed stages, each bounded:
//!
//! 1. [`design`]: one analysis, then two draft/critique rounds
//! 2. asset metadata (never fatal)
//! 3. [`production`]: plan once, implement per file or as one file
//! 4. [`healing`]: materialize, fuzz test and repair the entry point,
//!    then review and repair the entry point and logic file once each
//! 5. [`persistence`]: one directory per run plus a manifest
//!
//! [`GamePipeline`] composes the stages; each stage is also usable on its
//! own with any [`forge_agents::AgentOperations`] implementation.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use forge_agents::{ChainFactory, ToolBox};
//! use forge_core::{GenerationRequest, Provider};
//! use forge_llm::LlmSettings;
//! use forge_pipeline::{GamePipeline, PipelineConfig};
//! use forge_runner::{ProcessFuzzRunner, RunnerConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let factory = ChainFactory::new(LlmSettings::from_env(), ToolBox::new());
//!     let runner = ProcessFuzzRunner::new(RunnerConfig::default());
//!     let pipeline = GamePipeline::new(Arc::new(factory), Arc::new(runner), PipelineConfig::default());
//!
//!     let outcome = pipeline
//!         .generate(&GenerationRequest::new("a snake game", Provider::Ollama))
//!         .await;
//!     println!("{}", serde_json::to_string(&outcome).unwrap());
//! }
//! ```

pub mod config;
pub mod design;
pub mod error;
pub mod healing;
pub mod persistence;
pub mod pipeline;
pub mod production;

pub use config::{ModeSetting, PipelineConfig};
pub use design::{run_design, DESIGN_ROUNDS, NO_FEEDBACK};
pub use error::{PipelineError, PipelineResult};
pub use healing::{
    DynamicAttempt, DynamicResult, HealingConfig, HealingPhase, HealingReport, ReviewRecord,
    SelfHealingStage,
};
pub use persistence::{create_run_dir, slugify, write_files, write_project_file, RunManifest, MANIFEST_FILE};
pub use pipeline::{GamePipeline, GenerationOutcome, GenerationRun, GenerationStatus};
pub use production::{run_production, ProductionMode, ProductionStage, DEFAULT_CONSOLIDATED_FILE};
