//! Qdrant implementation for vector storage
//!
//! Alternative to the hosted Pinecone index for self-hosted deployments.
//! Qdrant point ids must be integers or UUIDs, so each chunk id is mapped
//! to a deterministic UUIDv5 and the chunk id itself travels in the payload.
//!
//! Author: hephaex@gmail.com

use async_trait::async_trait;
use folio_core::{FolioError, IndexStats, Result, ScoredChunk, VectorConfig, VectorRecord};
use qdrant_client::qdrant::vectors_config::Config;
use qdrant_client::qdrant::{
    CreateCollectionBuilder, Distance, PointStruct, SearchPointsBuilder, UpsertPointsBuilder,
    VectorParamsBuilder,
};
use qdrant_client::Qdrant;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::VectorIndex;

/// Qdrant vector store implementation
pub struct QdrantIndex {
    client: Qdrant,
    collection: String,
    dimension: usize,
}

impl QdrantIndex {
    /// Create a new Qdrant connection
    pub fn new(config: &VectorConfig) -> Result<Self> {
        let client = Qdrant::from_url(&config.qdrant_url)
            .api_key(config.qdrant_api_key.clone())
            .build()
            .map_err(|e| FolioError::VectorStore(format!("Qdrant connection failed: {e}")))?;

        Ok(Self {
            client,
            collection: config.qdrant_collection.clone(),
            dimension: config.dimension,
        })
    }

    /// Create the collection when it does not exist yet
    pub async fn init_collection(&self) -> Result<()> {
        let exists = self
            .client
            .collection_exists(&self.collection)
            .await
            .map_err(|e| FolioError::VectorStore(format!("Failed to list collections: {e}")))?;

        if !exists {
            tracing::info!(
                "Creating collection {} ({} dimensions)",
                self.collection,
                self.dimension
            );
            self.client
                .create_collection(
                    CreateCollectionBuilder::new(&self.collection).vectors_config(
                        VectorParamsBuilder::new(self.dimension as u64, Distance::Cosine),
                    ),
                )
                .await
                .map_err(|e| {
                    FolioError::VectorStore(format!("Failed to create collection: {e}"))
                })?;
        }

        Ok(())
    }
}

/// Deterministic point id for a chunk id
pub fn point_id(chunk_id: &str) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, chunk_id.as_bytes()).to_string()
}

/// Payload stored with each vector
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChunkPayload {
    chunk_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

fn to_payload(payload: &ChunkPayload) -> HashMap<String, qdrant_client::qdrant::Value> {
    serde_json::to_value(payload)
        .unwrap_or_default()
        .as_object()
        .cloned()
        .unwrap_or_default()
        .into_iter()
        .map(|(k, v)| (k, v.into()))
        .collect()
}

#[async_trait]
impl VectorIndex for QdrantIndex {
    async fn upsert(&self, records: &[VectorRecord]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let points: Vec<PointStruct> = records
            .iter()
            .map(|record| {
                let payload = ChunkPayload {
                    chunk_id: record.id.clone(),
                    text: record.metadata.text.clone(),
                };
                PointStruct::new(
                    point_id(&record.id),
                    record.embedding.clone(),
                    to_payload(&payload),
                )
            })
            .collect();

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, points).wait(true))
            .await
            .map_err(|e| FolioError::VectorStore(format!("Failed to upsert vectors: {e}")))?;

        Ok(records.len())
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<ScoredChunk>> {
        let results = self
            .client
            .search_points(
                SearchPointsBuilder::new(&self.collection, vector.to_vec(), top_k as u64)
                    .with_payload(true),
            )
            .await
            .map_err(|e| FolioError::VectorStore(format!("Vector search failed: {e}")))?;

        Ok(results
            .result
            .into_iter()
            .map(|point| {
                let payload = point.payload;
                let chunk_id = payload
                    .get("chunk_id")
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string())
                    .unwrap_or_default();
                let text = payload
                    .get("text")
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string());

                ScoredChunk::new(chunk_id, point.score, text)
            })
            .collect())
    }

    async fn stats(&self) -> Result<IndexStats> {
        let info = self
            .client
            .collection_info(&self.collection)
            .await
            .map_err(|e| FolioError::VectorStore(format!("Failed to describe collection: {e}")))?;

        let result = info.result.unwrap_or_default();
        let dimension = result
            .config
            .and_then(|c| c.params)
            .and_then(|p| p.vectors_config)
            .and_then(|v| v.config)
            .and_then(|config| match config {
                Config::Params(params) => Some(params.size as usize),
                Config::ParamsMap(_) => None,
            });

        Ok(IndexStats {
            dimension,
            vector_count: result.points_count.unwrap_or(0),
        })
    }

    fn name(&self) -> &str {
        "qdrant"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_id_is_stable() {
        assert_eq!(point_id("chunk-1"), point_id("chunk-1"));
        assert_ne!(point_id("chunk-1"), point_id("chunk-2"));
        assert!(Uuid::parse_str(&point_id("chunk-1")).is_ok());
    }

    #[test]
    fn test_payload_carries_chunk_id_and_text() {
        let payload = to_payload(&ChunkPayload {
            chunk_id: "chunk-3".to_string(),
            text: Some("Built FixMyIoT".to_string()),
        });

        assert_eq!(
            payload
                .get("chunk_id")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string()),
            Some("chunk-3".to_string())
        );
        assert!(payload.contains_key("text"));

        let without_text = to_payload(&ChunkPayload {
            chunk_id: "chunk-4".to_string(),
            text: None,
        });
        assert!(!without_text.contains_key("text"));
    }
}
