//! # forge_rag
//!
//! Documentation retrieval for the code-writing agents.
//!
//! Documents are embedded by an [`Embedder`] and kept in a [`VectorStore`]:
//! either process-local ([`InMemoryStore`]) or a Chroma server
//! ([`ChromaStore`]). Agents only see the [`RetrievalService`] trait, whose
//! `query` always answers with text.

pub mod chroma;
pub mod config;
pub mod embedder;
pub mod error;
pub mod service;
pub mod store;

pub use chroma::{connection_plan, ChromaStore, ConnectionStrategy};
pub use config::{ClientType, EmbeddingConfig, EmbeddingProvider, RagConfig, DEFAULT_DATABASE};
pub use embedder::{embedder_from_config, Embedder, HashingEmbedder, OllamaEmbedder, OpenAiEmbedder};
pub use error::{RagError, RagResult};
pub use service::{content_id, RagService, RetrievalService, BATCH_SIZE, NO_RESULTS, QUERY_ERROR_PREFIX};
pub use store::{cosine_similarity, InMemoryStore, StoredDocument, VectorStore};
