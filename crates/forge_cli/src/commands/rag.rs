//! Rag command - Ingest into and query the knowledge base.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use forge_rag::{ClientType, RetrievalService};
use tracing::warn;

use super::GlobalArgs;
use crate::knowledge;
use crate::settings::ForgeSettings;

#[derive(Args)]
pub struct RagArgs {
    #[command(subcommand)]
    command: RagCommand,
}

#[derive(Subcommand)]
enum RagCommand {
    /// Add documentation files or directories
    Ingest {
        /// Files or directories to ingest
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Search the knowledge base
    Query {
        /// Search text
        text: String,

        /// Number of documents to return
        #[arg(short = 'k', long, default_value_t = 1)]
        top_k: usize,

        /// Documentation to load first (for the in-memory store)
        #[arg(long = "docs")]
        docs: Vec<PathBuf>,
    },
}

pub async fn execute(args: RagArgs, global: &GlobalArgs) -> Result<()> {
    let settings = ForgeSettings::load(global.config.as_deref())?;

    match args.command {
        RagCommand::Ingest { paths } => ingest(&settings, &paths).await,
        RagCommand::Query { text, top_k, docs } => query(&settings, &text, top_k, &docs).await,
    }
}

async fn ingest(settings: &ForgeSettings, paths: &[PathBuf]) -> Result<()> {
    if settings.rag.client_type == ClientType::Memory {
        warn!("client_type is 'memory': documents are kept only for this process");
    }

    let documents = knowledge::collect_documents(paths)?;
    if documents.is_empty() {
        println!("No documents found.");
        return Ok(());
    }

    let service = knowledge::open(&settings.rag).await?;
    let count = knowledge::ingest(&service, &documents)
        .await
        .context("Failed to ingest documents")?;
    let total = service.count().await.context("Failed to count documents")?;

    println!("Ingested {} document(s) into '{}' ({} total)", count, settings.rag.collection, total);
    Ok(())
}

async fn query(settings: &ForgeSettings, text: &str, top_k: usize, docs: &[PathBuf]) -> Result<()> {
    let service = knowledge::open(&settings.rag).await?;
    if !docs.is_empty() {
        let documents = knowledge::collect_documents(docs)?;
        knowledge::ingest(&service, &documents)
            .await
            .context("Failed to load documentation")?;
    }

    println!("{}", service.query(text, top_k).await);
    Ok(())
}
