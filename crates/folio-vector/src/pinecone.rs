//! Pinecone vector index over the REST API
//!
//! The control plane (`api.pinecone.io`) resolves an index name to its
//! data-plane host; upserts, queries and stats then go to that host.
//! Each record stores the chunk text as `metadata.text`.
//!
//! Author: hephaex@gmail.com

use async_trait::async_trait;
use folio_core::{FolioError, IndexStats, Result, ScoredChunk, VectorConfig, VectorRecord};
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::VectorIndex;

const CONTROL_PLANE_URL: &str = "https://api.pinecone.io";
const API_VERSION: &str = "2024-07";

/// Pinecone rejects upsert requests above 1000 records / 2MB
const UPSERT_BATCH_SIZE: usize = 100;

// ============================================================================
// Wire Types
// ============================================================================

/// Index description returned by the control plane
#[derive(Debug, Clone, Deserialize)]
pub struct IndexDescription {
    pub name: String,
    pub dimension: Option<usize>,
    pub metric: Option<String>,
    pub host: String,
}

#[derive(Debug, Deserialize)]
struct IndexList {
    #[serde(default)]
    indexes: Vec<IndexDescription>,
}

#[derive(Debug, Serialize)]
struct PineconeVector<'a> {
    id: &'a str,
    values: &'a [f32],
    metadata: &'a folio_core::RecordMetadata,
}

#[derive(Debug, Serialize)]
struct UpsertRequest<'a> {
    vectors: Vec<PineconeVector<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    include_values: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Debug, Deserialize)]
struct QueryMatch {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Option<serde_json::Value>,
}

impl QueryMatch {
    fn into_scored(self) -> ScoredChunk {
        let text = self
            .metadata
            .as_ref()
            .and_then(|m| m.get("text"))
            .and_then(|t| t.as_str())
            .map(str::to_string);
        ScoredChunk::new(self.id, self.score, text)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatsResponse {
    dimension: Option<usize>,
    #[serde(default)]
    total_vector_count: u64,
}

// ============================================================================
// Control Plane
// ============================================================================

/// Client for index management calls
pub struct PineconeControl {
    client: Client,
    api_key: String,
    base_url: String,
}

impl PineconeControl {
    pub fn new(api_key: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout_secs)?,
            api_key: api_key.into(),
            base_url: CONTROL_PLANE_URL.to_string(),
        })
    }

    pub fn from_config(config: &VectorConfig) -> Result<Self> {
        let api_key = config
            .pinecone_api_key
            .as_ref()
            .ok_or_else(|| FolioError::Config("PINECONE_API_KEY is required".to_string()))?;
        Self::new(api_key.clone(), config.timeout_secs)
    }

    /// List every index in the project
    pub async fn list_indexes(&self) -> Result<Vec<IndexDescription>> {
        let request = self.client.get(format!("{}/indexes", self.base_url));
        let list: IndexList = send_json(authorize(request, &self.api_key)).await?;
        Ok(list.indexes)
    }

    /// Describe one index by name
    pub async fn describe_index(&self, name: &str) -> Result<IndexDescription> {
        let request = self.client.get(format!("{}/indexes/{}", self.base_url, name));
        send_json(authorize(request, &self.api_key)).await
    }
}

// ============================================================================
// Data Plane
// ============================================================================

/// Pinecone index client
pub struct PineconeIndex {
    client: Client,
    api_key: String,
    host: String,
    namespace: Option<String>,
}

impl PineconeIndex {
    /// Create a client for a known data-plane host
    pub fn new(
        api_key: impl Into<String>,
        host: &str,
        namespace: Option<String>,
        timeout_secs: u64,
    ) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout_secs)?,
            api_key: api_key.into(),
            host: normalize_host(host),
            namespace: namespace.filter(|n| !n.is_empty()),
        })
    }

    /// Connect using config, resolving the host from the index name when
    /// no host is configured
    pub async fn connect(config: &VectorConfig) -> Result<Self> {
        let api_key = config
            .pinecone_api_key
            .clone()
            .ok_or_else(|| FolioError::Config("PINECONE_API_KEY is required".to_string()))?;

        let host = match &config.pinecone_host {
            Some(host) => host.clone(),
            None => {
                let name = config.pinecone_index.as_ref().ok_or_else(|| {
                    FolioError::Config(
                        "PINECONE_INDEX or PINECONE_HOST is required".to_string(),
                    )
                })?;
                let description = PineconeControl::from_config(config)?
                    .describe_index(name)
                    .await?;
                if let Some(dimension) = description.dimension {
                    if dimension != config.dimension {
                        return Err(FolioError::DimensionMismatch {
                            expected: config.dimension,
                            actual: dimension,
                        });
                    }
                }
                description.host
            }
        };

        tracing::info!("Connected to Pinecone host {}", host);
        Self::new(
            api_key,
            &host,
            config.pinecone_namespace.clone(),
            config.timeout_secs,
        )
    }

    fn post(&self, path: &str) -> RequestBuilder {
        authorize(
            self.client.post(format!("{}{}", self.host, path)),
            &self.api_key,
        )
    }
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    async fn upsert(&self, records: &[VectorRecord]) -> Result<usize> {
        let mut total = 0;

        for body in upsert_bodies(records, self.namespace.as_deref()) {
            let response: UpsertResponse =
                send_json(self.post("/vectors/upsert").json(&body)).await?;
            tracing::debug!("Upserted {} vectors", response.upserted_count);
            total += response.upserted_count;
        }

        Ok(total)
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<ScoredChunk>> {
        let body = QueryRequest {
            vector,
            top_k,
            include_metadata: true,
            include_values: false,
            namespace: self.namespace.as_deref(),
        };

        let response: QueryResponse = send_json(self.post("/query").json(&body)).await?;
        Ok(response
            .matches
            .into_iter()
            .map(QueryMatch::into_scored)
            .collect())
    }

    async fn stats(&self) -> Result<IndexStats> {
        let response: StatsResponse =
            send_json(self.post("/describe_index_stats").json(&serde_json::json!({}))).await?;
        Ok(IndexStats {
            dimension: response.dimension,
            vector_count: response.total_vector_count,
        })
    }

    fn name(&self) -> &str {
        "pinecone"
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Split records into upsert requests of at most `UPSERT_BATCH_SIZE` vectors
fn upsert_bodies<'a>(
    records: &'a [VectorRecord],
    namespace: Option<&'a str>,
) -> Vec<UpsertRequest<'a>> {
    records
        .chunks(UPSERT_BATCH_SIZE)
        .map(|batch| UpsertRequest {
            vectors: batch
                .iter()
                .map(|r| PineconeVector {
                    id: &r.id,
                    values: &r.embedding,
                    metadata: &r.metadata,
                })
                .collect(),
            namespace,
        })
        .collect()
}

fn build_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| FolioError::VectorStore(format!("Failed to build HTTP client: {e}")))
}

fn authorize(request: RequestBuilder, api_key: &str) -> RequestBuilder {
    request
        .header("Api-Key", api_key)
        .header("X-Pinecone-API-Version", API_VERSION)
}

/// The control plane reports bare hostnames
fn normalize_host(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{host}")
    }
}

async fn send_json<T: serde::de::DeserializeOwned>(request: RequestBuilder) -> Result<T> {
    let response = request
        .send()
        .await
        .map_err(|e| FolioError::VectorStore(format!("Pinecone request failed: {e}")))?;

    if !response.status().is_success() {
        let status = response.status();
        let error_text = response.text().await.unwrap_or_default();
        return Err(FolioError::VectorStore(format!(
            "Pinecone error {status}: {error_text}"
        )));
    }

    response
        .json()
        .await
        .map_err(|e| FolioError::VectorStore(format!("Failed to parse Pinecone response: {e}")))
}
