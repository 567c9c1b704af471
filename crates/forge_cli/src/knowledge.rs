//! Knowledge base helpers shared by `generate` and `rag`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use forge_rag::{RagConfig, RagService, RagResult};
use serde_json::{Map, Value};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Extensions picked up when a directory is ingested.
pub const DOC_EXTENSIONS: &[&str] = &["md", "txt", "rst", "py"];

/// A documentation file ready for insertion.
#[derive(Debug, Clone)]
pub struct Document {
    pub source: PathBuf,
    pub content: String,
}

/// Connect to the configured store.
pub async fn open(config: &RagConfig) -> Result<RagService> {
    RagService::from_config(config)
        .await
        .context("Failed to open knowledge base")
}

/// Read every documentation file under `paths`.
///
/// Files named directly are always read; inside directories only
/// [`DOC_EXTENSIONS`] are. Empty files are skipped.
pub fn collect_documents(paths: &[PathBuf]) -> Result<Vec<Document>> {
    let mut documents = Vec::new();

    for root in paths {
        if !root.exists() {
            anyhow::bail!("Path not found: {}", root.display());
        }

        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry.with_context(|| format!("Failed to walk {}", root.display()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if entry.depth() > 0 && !has_doc_extension(path) {
                continue;
            }

            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            if content.trim().is_empty() {
                debug!("Skipping empty file {}", path.display());
                continue;
            }
            documents.push(Document {
                source: path.to_path_buf(),
                content,
            });
        }
    }

    Ok(documents)
}

fn has_doc_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| DOC_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Insert documents with their source path as metadata.
pub async fn ingest(service: &RagService, documents: &[Document]) -> RagResult<usize> {
    let contents: Vec<String> = documents.iter().map(|d| d.content.clone()).collect();
    let metadatas: Vec<Map<String, Value>> = documents
        .iter()
        .map(|d| {
            let mut meta = Map::new();
            meta.insert(
                "source".to_string(),
                Value::String(d.source.display().to_string()),
            );
            meta
        })
        .collect();

    let count = service.batch_insert(&contents, Some(&metadatas)).await?;
    info!("Ingested {} document(s)", count);
    Ok(count)
}
