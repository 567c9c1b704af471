//! Chroma HTTP backend.
//!
//! Talks to the server's v1 REST API with precomputed embeddings, so the
//! server never needs an embedding function of its own.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::config::{RagConfig, DEFAULT_DATABASE};
use crate::error::{RagError, RagResult};
use crate::store::{StoredDocument, VectorStore};

/// Timeout for probing a non-default database.
const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Timeout for the guaranteed fallback connection.
const FALLBACK_TIMEOUT: Duration = Duration::from_secs(30);

/// One way of reaching a Chroma database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionStrategy {
    pub database: String,
    pub timeout: Duration,
    /// Probed strategies are verified (heartbeat) and skipped on failure
    pub probe: bool,
}

/// Ordered connection attempts for `preferred`.
///
/// The last entry always targets [`DEFAULT_DATABASE`] and is not probed.
pub fn connection_plan(preferred: &str) -> Vec<ConnectionStrategy> {
    let mut plan = Vec::new();
    let preferred = preferred.trim();
    if !preferred.is_empty() && preferred != DEFAULT_DATABASE {
        plan.push(ConnectionStrategy {
            database: preferred.to_string(),
            timeout: PROBE_TIMEOUT,
            probe: true,
        });
    }
    plan.push(ConnectionStrategy {
        database: DEFAULT_DATABASE.to_string(),
        timeout: FALLBACK_TIMEOUT,
        probe: false,
    });
    plan
}

#[derive(Debug, Deserialize)]
struct CollectionInfo {
    id: String,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    documents: Option<Vec<Vec<Option<String>>>>,
}

/// Collection handle on a Chroma server.
pub struct ChromaStore {
    base_url: String,
    tenant: String,
    database: String,
    collection_id: String,
    client: reqwest::Client,
}

impl ChromaStore {
    /// Connect following [`connection_plan`] for the configured database.
    pub async fn connect(config: &RagConfig) -> RagResult<Self> {
        let headers = auth_headers(config)?;
        let base_url = config.server_url();
        info!("Connecting to Chroma HTTP ({})", base_url);

        let mut last_error = None;
        for strategy in connection_plan(&config.database) {
            let client = reqwest::Client::builder()
                .default_headers(headers.clone())
                .timeout(strategy.timeout)
                .build()?;

            let attempt = Self::open(client, &base_url, config, &strategy).await;
            match attempt {
                Ok(store) => {
                    info!("Connected to database '{}'", store.database);
                    return Ok(store);
                }
                Err(e) if strategy.probe => {
                    warn!(
                        "Could not connect to '{}' ({}), falling back",
                        strategy.database, e
                    );
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| RagError::Connection("empty connection plan".to_string())))
    }

    async fn open(
        client: reqwest::Client,
        base_url: &str,
        config: &RagConfig,
        strategy: &ConnectionStrategy,
    ) -> RagResult<Self> {
        if strategy.probe {
            // Creating may be refused (exists, not allowed); the heartbeat decides.
            let _ = client
                .post(format!("{}/api/v1/databases", base_url))
                .query(&[("tenant", config.tenant.as_str())])
                .json(&json!({ "name": strategy.database }))
                .send()
                .await;

            let heartbeat = client
                .get(format!("{}/api/v1/heartbeat", base_url))
                .send()
                .await?;
            if !heartbeat.status().is_success() {
                return Err(RagError::Connection(format!(
                    "heartbeat returned {}",
                    heartbeat.status()
                )));
            }
        }

        let response = client
            .post(format!("{}/api/v1/collections", base_url))
            .query(&[
                ("tenant", config.tenant.as_str()),
                ("database", strategy.database.as_str()),
            ])
            .json(&json!({
                "name": config.collection,
                "metadata": { "hnsw:space": "cosine" },
                "get_or_create": true,
            }))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RagError::Connection(format!(
                "collection '{}' in '{}': {} {}",
                config.collection, strategy.database, status, body
            )));
        }
        let collection: CollectionInfo = response.json().await?;

        Ok(Self {
            base_url: base_url.to_string(),
            tenant: config.tenant.clone(),
            database: strategy.database.clone(),
            collection_id: collection.id,
            client,
        })
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn tenant(&self) -> &str {
        &self.tenant
    }

    fn collection_url(&self, action: &str) -> String {
        format!(
            "{}/api/v1/collections/{}/{}",
            self.base_url, self.collection_id, action
        )
    }

    async fn post(&self, action: &str, body: Value) -> RagResult<reqwest::Response> {
        let response = self.client.post(self.collection_url(action)).json(&body).send().await?;
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(RagError::Store(format!("{} failed: {} {}", action, status, body)))
        }
    }
}

#[async_trait]
impl VectorStore for ChromaStore {
    async fn upsert(&self, documents: Vec<StoredDocument>) -> RagResult<()> {
        if documents.is_empty() {
            return Ok(());
        }
        let has_metadata = documents.iter().any(|d| d.metadata.is_some());

        let mut body = json!({
            "ids": documents.iter().map(|d| d.id.as_str()).collect::<Vec<_>>(),
            "documents": documents.iter().map(|d| d.content.as_str()).collect::<Vec<_>>(),
            "embeddings": documents.iter().map(|d| &d.embedding).collect::<Vec<_>>(),
        });
        if has_metadata {
            let metadatas: Vec<Value> = documents
                .iter()
                .map(|d| Value::Object(d.metadata.clone().unwrap_or_default()))
                .collect();
            body["metadatas"] = Value::Array(metadatas);
        }

        self.post("upsert", body).await?;
        Ok(())
    }

    async fn query(&self, embedding: &[f32], top_k: usize) -> RagResult<Vec<String>> {
        let response = self
            .post(
                "query",
                json!({
                    "query_embeddings": [embedding],
                    "n_results": top_k,
                    "include": ["documents"],
                }),
            )
            .await?;
        let parsed: QueryResponse = response.json().await?;

        Ok(parsed
            .documents
            .and_then(|mut rows| if rows.is_empty() { None } else { Some(rows.remove(0)) })
            .unwrap_or_default()
            .into_iter()
            .flatten()
            .collect())
    }

    async fn count(&self) -> RagResult<usize> {
        let response = self.client.get(self.collection_url("count")).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RagError::Store(format!("count failed: {}", status)));
        }
        Ok(response.json::<usize>().await?)
    }
}

fn auth_headers(config: &RagConfig) -> RagResult<HeaderMap> {
    let mut headers = HeaderMap::new();
    let mut put = |name: &'static str, value: &str| -> RagResult<()> {
        let value = HeaderValue::from_str(value)
            .map_err(|_| RagError::Config(format!("invalid value for header {}", name)))?;
        headers.insert(HeaderName::from_static(name), value);
        Ok(())
    };

    if let (Some(id), Some(secret)) = (&config.cf_client_id, &config.cf_client_secret) {
        put("cf-access-client-id", id)?;
        put("cf-access-client-secret", secret)?;
    }
    if let Some(token) = &config.auth_token {
        put("x-chroma-token", token)?;
        put("authorization", &format!("Bearer {}", token))?;
    }
    Ok(headers)
}
