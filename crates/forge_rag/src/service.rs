//! Knowledge base facade used by the agents and the CLI.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::chroma::ChromaStore;
use crate::config::{ClientType, RagConfig};
use crate::embedder::{embedder_from_config, Embedder};
use crate::error::{RagError, RagResult};
use crate::store::{InMemoryStore, StoredDocument, VectorStore};

/// Returned when a query matches nothing.
pub const NO_RESULTS: &str = "No relevant documentation found.";

/// Prefix of the text returned when a query fails.
pub const QUERY_ERROR_PREFIX: &str = "RAG Query Error: ";

/// Documents per upsert request.
pub const BATCH_SIZE: usize = 100;

/// Separator between hits when more than one is requested.
const HIT_SEPARATOR: &str = "\n\n---\n\n";

/// Documentation lookup as seen by tools.
///
/// `query` never fails: misses and errors come back as text the model can
/// read ([`NO_RESULTS`] or a message starting with [`QUERY_ERROR_PREFIX`]).
#[async_trait]
pub trait RetrievalService: Send + Sync {
    async fn query(&self, text: &str, top_k: usize) -> String;
}

/// SHA-256 hex of the content; identical documents share an id.
pub fn content_id(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

/// Embedder plus vector store.
#[derive(Clone)]
pub struct RagService {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
}

impl RagService {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>) -> Self {
        Self { embedder, store }
    }

    /// In-memory store with the given embedder.
    pub fn in_memory(embedder: Arc<dyn Embedder>) -> Self {
        Self::new(embedder, Arc::new(InMemoryStore::new()))
    }

    /// Build the embedder and connect the store described by `config`.
    pub async fn from_config(config: &RagConfig) -> RagResult<Self> {
        let embedder = embedder_from_config(&config.embedding)?;
        info!(
            "Knowledge base: collection '{}', embeddings {} ({:?})",
            config.collection,
            config.embedding.model_name(),
            config.embedding.provider
        );

        let store: Arc<dyn VectorStore> = match config.client_type {
            ClientType::Memory => Arc::new(InMemoryStore::new()),
            ClientType::Http => Arc::new(ChromaStore::connect(config).await?),
        };
        Ok(Self::new(embedder, store))
    }

    /// Insert one document; returns its content id.
    pub async fn insert(&self, content: &str, metadata: Option<Map<String, Value>>) -> RagResult<String> {
        let id = content_id(content);
        let embedding = self.embed_single(content).await?;
        self.store
            .upsert(vec![StoredDocument {
                id: id.clone(),
                content: content.to_string(),
                metadata,
                embedding,
            }])
            .await?;
        debug!("Inserted document {}", &id[..12]);
        Ok(id)
    }

    /// Insert many documents in batches of [`BATCH_SIZE`]; returns the count.
    ///
    /// `metadatas`, when given, must line up with `contents`.
    pub async fn batch_insert(
        &self,
        contents: &[String],
        metadatas: Option<&[Map<String, Value>]>,
    ) -> RagResult<usize> {
        if contents.is_empty() {
            return Ok(0);
        }
        if let Some(metadatas) = metadatas {
            if metadatas.len() != contents.len() {
                return Err(RagError::Store(format!(
                    "{} documents but {} metadata entries",
                    contents.len(),
                    metadatas.len()
                )));
            }
        }

        for (batch_index, chunk) in contents.chunks(BATCH_SIZE).enumerate() {
            let offset = batch_index * BATCH_SIZE;
            let embeddings = self.embedder.embed(chunk).await?;
            if embeddings.len() != chunk.len() {
                return Err(RagError::Embedding(format!(
                    "expected {} embeddings, got {}",
                    chunk.len(),
                    embeddings.len()
                )));
            }

            let documents = chunk
                .iter()
                .zip(embeddings)
                .enumerate()
                .map(|(i, (content, embedding))| StoredDocument {
                    id: content_id(content),
                    content: content.clone(),
                    metadata: metadatas.map(|m| m[offset + i].clone()),
                    embedding,
                })
                .collect();
            self.store.upsert(documents).await?;
        }

        info!("Batch insert complete ({} documents)", contents.len());
        Ok(contents.len())
    }

    /// Number of stored documents.
    pub async fn count(&self) -> RagResult<usize> {
        self.store.count().await
    }

    async fn embed_single(&self, text: &str) -> RagResult<Vec<f32>> {
        self.embedder
            .embed(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RagError::Embedding("embedder returned no vector".to_string()))
    }

    async fn try_query(&self, text: &str, top_k: usize) -> RagResult<Vec<String>> {
        let embedding = self.embed_single(text).await?;
        self.store.query(&embedding, top_k.max(1)).await
    }
}

#[async_trait]
impl RetrievalService for RagService {
    async fn query(&self, text: &str, top_k: usize) -> String {
        match self.try_query(text, top_k).await {
            Ok(hits) if hits.is_empty() => NO_RESULTS.to_string(),
            Ok(hits) => hits.join(HIT_SEPARATOR),
            Err(e) => {
                warn!("Knowledge base query failed: {}", e);
                format!("{}{}", QUERY_ERROR_PREFIX, e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedder::{HashingEmbedder, MockEmbedder};

    fn hashing_service() -> RagService {
        RagService::in_memory(Arc::new(HashingEmbedder::default()))
    }

    #[test]
    fn test_content_id_is_sha256_hex() {
        assert_eq!(
            content_id("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[tokio::test]
    async fn test_empty_store_reports_no_results() {
        let service = hashing_service();
        assert_eq!(service.query("sprites", 1).await, NO_RESULTS);
    }

    #[tokio::test]
    async fn test_insert_is_idempotent_by_content() {
        let service = hashing_service();
        let a = service.insert("arcade.draw_text renders text", None).await.unwrap();
        let b = service.insert("arcade.draw_text renders text", None).await.unwrap();

        assert_eq!(a, b);
        assert_eq!(service.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_query_returns_best_match() {
        let service = hashing_service();
        service
            .batch_insert(
                &[
                    "Use arcade.SpriteList to draw many sprites efficiently".to_string(),
                    "arcade.play_sound plays a loaded sound".to_string(),
                    "arcade.check_for_collision_with_list tests sprite collisions".to_string(),
                ],
                None,
            )
            .await
            .unwrap();

        let hit = service.query("how do I play a sound", 1).await;
        assert!(hit.contains("play_sound"), "unexpected hit: {}", hit);
    }

    #[tokio::test]
    async fn test_batch_insert_splits_into_batches() {
        let mut embedder = MockEmbedder::new();
        embedder
            .expect_embed()
            .times(3)
            .returning(|texts| Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect()));
        let service = RagService::in_memory(Arc::new(embedder));

        let contents: Vec<String> = (0..250).map(|i| format!("doc {}", i)).collect();
        assert_eq!(service.batch_insert(&contents, None).await.unwrap(), 250);
        assert_eq!(service.count().await.unwrap(), 250);
    }

    #[tokio::test]
    async fn test_metadata_length_mismatch_is_rejected() {
        let service = hashing_service();
        let contents = vec!["a".to_string(), "b".to_string()];
        let metadatas = vec![Map::new()];
        assert!(service.batch_insert(&contents, Some(&metadatas)).await.is_err());
    }

    #[tokio::test]
    async fn test_embedding_failure_becomes_error_text() {
        let mut embedder = MockEmbedder::new();
        embedder
            .expect_embed()
            .returning(|_| Err(RagError::Embedding("server down".to_string())));
        let service = RagService::in_memory(Arc::new(embedder));

        let text = service.query("sprites", 1).await;
        assert!(text.starts_with(QUERY_ERROR_PREFIX));
        assert!(text.contains("server down"));
    }

    #[tokio::test]
    async fn test_multiple_hits_are_joined() {
        let service = hashing_service();
        service.insert("sprite one", None).await.unwrap();
        service.insert("sprite two", None).await.unwrap();

        let text = service.query("sprite", 2).await;
        assert!(text.contains("sprite one"));
        assert!(text.contains("sprite two"));
        assert!(text.contains("---"));
    }
}
