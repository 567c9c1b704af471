//! Text embedding providers.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::config::{EmbeddingConfig, EmbeddingProvider};
use crate::error::{RagError, RagResult};

/// Turns documents and queries into vectors of a fixed dimension.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed each text; the output has one vector per input, in order.
    async fn embed(&self, texts: &[String]) -> RagResult<Vec<Vec<f32>>>;
}

/// Build the embedder selected by `config`.
pub fn embedder_from_config(config: &EmbeddingConfig) -> RagResult<Arc<dyn Embedder>> {
    match config.provider {
        EmbeddingProvider::Default => Ok(Arc::new(HashingEmbedder::default())),
        EmbeddingProvider::Ollama => {
            let url = config.server_url().ok_or_else(|| {
                RagError::Config("ollama embeddings need LLM_EMBEDDING_SERVER_ADDRESS".to_string())
            })?;
            Ok(Arc::new(OllamaEmbedder::new(url, config.model_name(), config.token.clone())))
        }
        EmbeddingProvider::OpenAi => {
            let token = config.token.clone().ok_or_else(|| {
                RagError::Config("openai embeddings need LLM_EMBEDDING_CLIENT_TOKEN".to_string())
            })?;
            let mut embedder = OpenAiEmbedder::new(token, config.model_name());
            if let Some(url) = config.server_url() {
                embedder = embedder.with_base_url(url);
            }
            Ok(Arc::new(embedder))
        }
    }
}

/// Local embedder based on feature hashing of word unigrams and bigrams.
///
/// Needs no model download or network; good enough to find the right
/// section of a small documentation set by shared vocabulary.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: usize,
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(384)
    }
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Embed one text. Deterministic across runs and platforms.
    pub fn embed_one(&self, text: &str) -> Vec<f32> {
        let lowered = text.to_lowercase();
        let words: Vec<&str> = lowered
            .split(|c: char| !c.is_alphanumeric() && c != '_')
            .filter(|w| !w.is_empty())
            .collect();

        let mut vector = vec![0.0f32; self.dimension];
        for word in &words {
            self.add_feature(&mut vector, word, 1.0);
        }
        for pair in words.windows(2) {
            self.add_feature(&mut vector, &format!("{} {}", pair[0], pair[1]), 0.5);
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|v| *v /= norm);
        }
        vector
    }

    fn add_feature(&self, vector: &mut [f32], feature: &str, weight: f32) {
        let digest = Sha256::digest(feature.as_bytes());
        let bucket = u32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]]) as usize;
        let sign = if digest[4] & 1 == 0 { 1.0 } else { -1.0 };
        vector[bucket % self.dimension] += sign * weight;
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    async fn embed(&self, texts: &[String]) -> RagResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

/// Ollama `/api/embeddings`, one request per text.
pub struct OllamaEmbedder {
    endpoint: String,
    model: String,
    token: Option<String>,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct OllamaEmbedding {
    embedding: Vec<f32>,
}

impl OllamaEmbedder {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, token: Option<String>) -> Self {
        let base_url = base_url.into();
        Self {
            endpoint: format!("{}/api/embeddings", base_url.trim_end_matches('/')),
            model: model.into(),
            token,
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(120))
                .build()
                .unwrap_or_default(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    async fn embed(&self, texts: &[String]) -> RagResult<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            let mut request = self
                .client
                .post(&self.endpoint)
                .json(&json!({ "model": self.model, "prompt": text }));
            if let Some(token) = &self.token {
                request = request.bearer_auth(token);
            }

            let response = request.send().await?;
            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(RagError::Embedding(format!("Ollama {}: {}", status, body)));
            }
            let parsed: OllamaEmbedding = response.json().await?;
            vectors.push(parsed.embedding);
        }
        debug!("Embedded {} texts with Ollama model {}", texts.len(), self.model);
        Ok(vectors)
    }
}

/// OpenAI `/v1/embeddings`, batched.
pub struct OpenAiEmbedder {
    base_url: String,
    model: String,
    api_key: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct OpenAiEmbeddingResponse {
    data: Vec<OpenAiEmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct OpenAiEmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

impl OpenAiEmbedder {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: "https://api.openai.com".to_string(),
            model: model.into(),
            api_key: api_key.into(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, texts: &[String]) -> RagResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .post(format!("{}/v1/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&json!({ "model": self.model, "input": texts }))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RagError::Embedding(format!("OpenAI {}: {}", status, body)));
        }

        let mut parsed: OpenAiEmbeddingResponse = response.json().await?;
        if parsed.data.len() != texts.len() {
            return Err(RagError::Embedding(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                parsed.data.len()
            )));
        }
        parsed.data.sort_by_key(|d| d.index);
        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[test]
    fn test_hashing_is_deterministic_and_normalized() {
        let embedder = HashingEmbedder::default();
        let a = embedder.embed_one("arcade.SpriteList draws many sprites");
        let b = embedder.embed_one("arcade.SpriteList draws many sprites");

        assert_eq!(a, b);
        assert_eq!(a.len(), 384);
        let norm: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_shared_vocabulary_scores_higher() {
        let embedder = HashingEmbedder::default();
        let query = embedder.embed_one("how to draw sprites");
        let related = embedder.embed_one("Use a SpriteList to draw sprites in batches");
        let unrelated = embedder.embed_one("Sound playback volume and looping");

        assert!(cosine(&query, &related) > cosine(&query, &unrelated));
    }

    #[test]
    fn test_empty_text_is_zero_vector() {
        let embedder = HashingEmbedder::new(8);
        assert_eq!(embedder.embed_one("  ...  "), vec![0.0; 8]);
    }

    #[test]
    fn test_factory_requires_provider_settings() {
        let config = EmbeddingConfig {
            provider: EmbeddingProvider::Ollama,
            ..Default::default()
        };
        assert!(matches!(embedder_from_config(&config), Err(RagError::Config(_))));

        let config = EmbeddingConfig {
            provider: EmbeddingProvider::Ollama,
            base_url: Some("http://gpu-box".to_string()),
            port: Some(11434),
            ..Default::default()
        };
        assert!(embedder_from_config(&config).is_ok());
    }

    #[test]
    fn test_ollama_endpoint() {
        let embedder = OllamaEmbedder::new("http://gpu-box:11434/", "nomic-embed-text", None);
        assert_eq!(embedder.endpoint(), "http://gpu-box:11434/api/embeddings");
    }
}
