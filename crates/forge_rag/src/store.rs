//! Vector stores.

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::RagResult;

/// A document with its embedding, keyed by content id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDocument {
    pub id: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
    pub embedding: Vec<f32>,
}

/// Storage and nearest-neighbour search over embedded documents.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or overwrite documents by id.
    async fn upsert(&self, documents: Vec<StoredDocument>) -> RagResult<()>;

    /// Contents of the `top_k` nearest documents, best first.
    async fn query(&self, embedding: &[f32], top_k: usize) -> RagResult<Vec<String>>;

    /// Number of stored documents.
    async fn count(&self) -> RagResult<usize>;
}

/// Process-local store using cosine similarity.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    documents: RwLock<BTreeMap<String, StoredDocument>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorStore for InMemoryStore {
    async fn upsert(&self, documents: Vec<StoredDocument>) -> RagResult<()> {
        let mut stored = self.documents.write();
        for doc in documents {
            stored.insert(doc.id.clone(), doc);
        }
        Ok(())
    }

    async fn query(&self, embedding: &[f32], top_k: usize) -> RagResult<Vec<String>> {
        let stored = self.documents.read();
        let mut scored: Vec<(f32, &StoredDocument)> = stored
            .values()
            .map(|doc| (cosine_similarity(embedding, &doc.embedding), doc))
            .collect();
        // Ties keep id order, so results are stable.
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        Ok(scored
            .into_iter()
            .take(top_k)
            .map(|(_, doc)| doc.content.clone())
            .collect())
    }

    async fn count(&self) -> RagResult<usize> {
        Ok(self.documents.read().len())
    }
}

/// Cosine similarity; zero when either vector is all zeros or lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}
