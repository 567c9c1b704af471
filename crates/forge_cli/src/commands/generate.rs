//! Generate command - Run the whole pipeline for one idea.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use forge_agents::{ChainFactory, ToolBox};
use forge_core::{ChannelProgress, GenerationRequest, NullProgress, ProgressSink, Provider};
use forge_pipeline::{GamePipeline, GenerationOutcome, ModeSetting};
use forge_rag::{ClientType, RetrievalService};
use forge_runner::{FuzzRunner, ProcessFuzzRunner};
use thiserror::Error;
use tracing::{info, warn};

use super::GlobalArgs;
use crate::knowledge;
use crate::settings::ForgeSettings;

/// The pipeline ran but reported a failure outcome.
#[derive(Error, Debug)]
#[error("Generation failed: {0}")]
pub struct GenerationFailed(pub String);

#[derive(Args)]
pub struct GenerateArgs {
    /// Natural-language game idea
    #[arg(short, long)]
    idea: String,

    /// LLM provider (openai, anthropic, ollama)
    #[arg(short, long)]
    provider: Option<Provider>,

    /// Model override for every operation
    #[arg(short, long)]
    model: Option<String>,

    /// Production mode (multi or single)
    #[arg(long)]
    mode: Option<ModeSetting>,

    /// Parent directory for the run directory
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Documentation to load into the knowledge base before generating
    #[arg(long = "docs")]
    docs: Vec<PathBuf>,

    /// Print the outcome as JSON
    #[arg(long)]
    json: bool,
}

pub async fn execute(args: GenerateArgs, global: &GlobalArgs) -> Result<()> {
    let mut settings = ForgeSettings::load(global.config.as_deref())?;
    if let Some(mode) = args.mode {
        settings.pipeline.mode = mode;
    }
    if let Some(output) = args.output {
        settings.pipeline.output_dir = output;
    }
    let provider = args.provider.unwrap_or(settings.llm.provider);
    let mut request = GenerationRequest::new(args.idea.trim(), provider);
    if let Some(model) = args.model.or_else(|| settings.llm.model.clone()) {
        request = request.with_model(model);
    }
    if request.idea.is_empty() {
        anyhow::bail!("Invalid argument: --idea must not be empty");
    }

    let tools = match build_retrieval(&settings, &args.docs).await? {
        Some(retrieval) => ToolBox::with_retrieval(retrieval),
        None => ToolBox::new(),
    };
    let factory = ChainFactory::new(settings.llm.clone(), tools);

    let runner = ProcessFuzzRunner::new(settings.runner.clone());
    if !runner.is_available().await {
        warn!(
            "Interpreter '{}' not found; runtime checks will be skipped",
            settings.runner.interpreter
        );
    }

    let mut printer = None;
    let progress: Arc<dyn ProgressSink> = if global.quiet {
        Arc::new(NullProgress)
    } else {
        let (sink, mut receiver) = ChannelProgress::new();
        printer = Some(tokio::spawn(async move {
            while let Some(message) = receiver.recv().await {
                eprintln!("{}", message);
            }
        }));
        Arc::new(sink)
    };

    info!("Generating '{}' with {}", request.idea, request.provider);
    let pipeline = GamePipeline::new(Arc::new(factory), Arc::new(runner), settings.pipeline.clone())
        .with_progress(progress);
    let outcome = pipeline.generate(&request).await;

    // Closing the last sender ends the printer task.
    drop(pipeline);
    if let Some(printer) = printer {
        let _ = printer.await;
    }

    print_outcome(&outcome, args.json)?;
    if outcome.is_success() {
        Ok(())
    } else {
        Err(GenerationFailed(outcome.error.unwrap_or_default()).into())
    }
}

/// Knowledge base for the tool box, if one is configured or seeded.
async fn build_retrieval(
    settings: &ForgeSettings,
    docs: &[PathBuf],
) -> Result<Option<Arc<dyn RetrievalService>>> {
    if settings.rag.client_type == ClientType::Memory && docs.is_empty() {
        return Ok(None);
    }

    let service = match knowledge::open(&settings.rag).await {
        Ok(service) => service,
        Err(e) => {
            warn!("Continuing without knowledge base: {:#}", e);
            return Ok(None);
        }
    };

    if !docs.is_empty() {
        let documents = knowledge::collect_documents(docs)?;
        knowledge::ingest(&service, &documents)
            .await
            .context("Failed to load documentation")?;
    }
    Ok(Some(Arc::new(service)))
}

fn print_outcome(outcome: &GenerationOutcome, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(outcome)?);
        return Ok(());
    }

    if let Some(path) = &outcome.path {
        println!();
        println!("Game saved at: {}", path.display());
        for file in &outcome.files {
            println!("   - {}", file);
        }
        if outcome.files.is_empty() {
            println!("   (no files were produced)");
        }
    }
    Ok(())
}
