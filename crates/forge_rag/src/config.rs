//! Knowledge base configuration.
//!
//! Loaded from the `[rag]` section of `forge.toml` and overlaid by
//! `CHROMA_*`, `CF_ACCESS_*` and `LLM_EMBEDDING_*` environment variables.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RagError;

/// Database Chroma always provides for a tenant.
pub const DEFAULT_DATABASE: &str = "default_database";

/// Where vectors are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientType {
    /// Process-local index, lost on exit
    #[default]
    Memory,
    /// Remote Chroma server over its HTTP API
    Http,
}

impl FromStr for ClientType {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "memory" | "in-memory" => Ok(Self::Memory),
            "http" => Ok(Self::Http),
            other => Err(RagError::Config(format!("unsupported client type '{}'", other))),
        }
    }
}

/// Which service turns text into vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// Local feature hashing, no network
    #[default]
    Default,
    Ollama,
    OpenAi,
}

impl FromStr for EmbeddingProvider {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "default" => Ok(Self::Default),
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAi),
            other => Err(RagError::Config(format!("unsupported embedding provider '{}'", other))),
        }
    }
}

/// Embedding settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProvider,
    /// Server address, e.g. `http://gpu-box`
    pub base_url: Option<String>,
    /// Appended to `base_url` as `:port` when set
    pub port: Option<u16>,
    /// Model name; each provider has its own default
    pub model: Option<String>,
    #[serde(skip_serializing)]
    pub token: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::Default,
            base_url: None,
            port: None,
            model: None,
            token: None,
        }
    }
}

impl EmbeddingConfig {
    /// Model name with the provider default filled in.
    pub fn model_name(&self) -> String {
        if let Some(model) = &self.model {
            return model.clone();
        }
        match self.provider {
            EmbeddingProvider::Default => "feature-hash-384".to_string(),
            EmbeddingProvider::Ollama => "nomic-embed-text".to_string(),
            EmbeddingProvider::OpenAi => "text-embedding-3-small".to_string(),
        }
    }

    /// Server root with the port applied, if any.
    pub fn server_url(&self) -> Option<String> {
        let base = self.base_url.as_deref()?.trim_end_matches('/');
        Some(match self.port {
            Some(port) => format!("{}:{}", base, port),
            None => base.to_string(),
        })
    }
}

/// Retrieval configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    pub client_type: ClientType,
    pub host: String,
    pub port: u16,
    pub ssl: bool,
    pub tenant: String,
    pub database: String,
    pub collection: String,
    /// Chroma server token, sent as `X-Chroma-Token` and bearer auth
    #[serde(skip_serializing)]
    pub auth_token: Option<String>,
    /// Cloudflare Access service token in front of the server
    #[serde(skip_serializing)]
    pub cf_client_id: Option<String>,
    #[serde(skip_serializing)]
    pub cf_client_secret: Option<String>,
    pub embedding: EmbeddingConfig,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            client_type: ClientType::Memory,
            host: "localhost".to_string(),
            port: 8000,
            ssl: false,
            tenant: "default_tenant".to_string(),
            database: DEFAULT_DATABASE.to_string(),
            collection: "arcade_docs".to_string(),
            auth_token: None,
            cf_client_id: None,
            cf_client_secret: None,
            embedding: EmbeddingConfig::default(),
        }
    }
}

impl RagConfig {
    /// Defaults overlaid by the process environment.
    pub fn from_env() -> Result<Self, RagError> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    pub fn apply_env(&mut self) -> Result<(), RagError> {
        self.apply_lookup(|key| std::env::var(key).ok())
    }

    /// Overlay values from `lookup`; empty values are ignored.
    pub fn apply_lookup<F>(&mut self, lookup: F) -> Result<(), RagError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(v) = get("CHROMA_CLIENT_TYPE") {
            self.client_type = v.parse()?;
        }
        if let Some(v) = get("CHROMA_HOST") {
            self.host = v;
        }
        if let Some(v) = get("CHROMA_PORT") {
            self.port = v
                .parse()
                .map_err(|_| RagError::Config(format!("CHROMA_PORT is not a port: '{}'", v)))?;
        }
        if let Some(v) = get("CHROMA_SSL") {
            self.ssl = matches!(v.to_lowercase().as_str(), "1" | "true" | "yes");
        }
        if let Some(v) = get("CHROMA_TENANT") {
            self.tenant = v;
        }
        if let Some(v) = get("CHROMA_DATABASE") {
            self.database = v;
        }
        if let Some(v) = get("CHROMA_COLLECTION") {
            self.collection = v;
        }
        if let Some(v) = get("CHROMA_SERVER_AUTH_CREDENTIALS").or_else(|| get("CHROMA_TOKEN")) {
            self.auth_token = Some(v);
        }
        if let Some(v) = get("CF_ACCESS_CLIENT_ID") {
            self.cf_client_id = Some(v);
        }
        if let Some(v) = get("CF_ACCESS_CLIENT_SECRET") {
            self.cf_client_secret = Some(v);
        }
        if let Some(v) = get("LLM_EMBEDDING_PROVIDER") {
            self.embedding.provider = v.parse()?;
        }
        if let Some(v) = get("LLM_EMBEDDING_SERVER_ADDRESS") {
            self.embedding.base_url = Some(v);
        }
        if let Some(v) = get("LLM_EMBEDDING_SERVER_PORT") {
            self.embedding.port = Some(v.parse().map_err(|_| {
                RagError::Config(format!("LLM_EMBEDDING_SERVER_PORT is not a port: '{}'", v))
            })?);
        }
        if let Some(v) = get("LLM_EMBEDDING_MODEL_TYPE") {
            self.embedding.model = Some(v);
        }
        if let Some(v) = get("LLM_EMBEDDING_CLIENT_TOKEN") {
            self.embedding.token = Some(v);
        }
        Ok(())
    }

    /// Base URL of the Chroma server.
    pub fn server_url(&self) -> String {
        let scheme = if self.ssl { "https" } else { "http" };
        format!("{}://{}:{}", scheme, self.host, self.port)
    }
}
