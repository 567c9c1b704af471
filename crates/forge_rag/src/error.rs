//! Error types for the retrieval layer.

use thiserror::Error;

/// Result type alias for retrieval operations.
pub type RagResult<T> = Result<T, RagError>;

/// Errors raised while building or using the knowledge base.
///
/// Queries never surface these: [`RetrievalService::query`](crate::RetrievalService::query)
/// folds them into a sentinel string.
#[derive(Error, Debug)]
pub enum RagError {
    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("Vector store error: {0}")]
    Store(String),

    #[error("Could not connect to Chroma: {0}")]
    Connection(String),

    #[error("Invalid retrieval configuration: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
