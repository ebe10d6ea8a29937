//! In-process vector index
//!
//! Brute-force cosine search over a map of records. Used for local
//! development without a hosted index, and by the test suites.

use async_trait::async_trait;
use folio_core::{FolioError, IndexStats, Result, ScoredChunk, VectorRecord};
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::VectorIndex;

/// Vector index held in memory
pub struct InMemoryIndex {
    dimension: usize,
    records: RwLock<HashMap<String, VectorRecord>>,
}

impl InMemoryIndex {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            records: RwLock::new(HashMap::new()),
        }
    }
}

/// Cosine similarity; zero when either vector has no magnitude
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    async fn upsert(&self, records: &[VectorRecord]) -> Result<usize> {
        // Validate everything before writing anything
        for record in records {
            if record.embedding.len() != self.dimension {
                return Err(FolioError::DimensionMismatch {
                    expected: self.dimension,
                    actual: record.embedding.len(),
                });
            }
        }

        let mut map = self.records.write().await;
        for record in records {
            map.insert(record.id.clone(), record.clone());
        }
        Ok(records.len())
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<ScoredChunk>> {
        if vector.len() != self.dimension {
            return Err(FolioError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }

        let map = self.records.read().await;
        let mut scored: Vec<(f32, &VectorRecord)> = map
            .values()
            .map(|record| (cosine_similarity(vector, &record.embedding), record))
            .collect();

        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.1.id.cmp(&b.1.id))
        });

        Ok(scored
            .into_iter()
            .take(top_k)
            .map(|(score, record)| {
                ScoredChunk::new(record.id.clone(), score, record.metadata.text.clone())
            })
            .collect())
    }

    async fn stats(&self) -> Result<IndexStats> {
        Ok(IndexStats {
            dimension: Some(self.dimension),
            vector_count: self.records.read().await.len() as u64,
        })
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::{Chunk, RecordMetadata, NO_TEXT_AVAILABLE};

    fn unit(dim: usize, hot: usize) -> Vec<f32> {
        let mut v = vec![0.0; dim];
        v[hot] = 1.0;
        v
    }

    #[tokio::test]
    async fn test_query_orders_by_similarity() {
        let index = InMemoryIndex::new(4);
        index
            .upsert(&[
                VectorRecord::from_chunk(&Chunk::new("chunk-1", "a"), vec![1.0, 0.0, 0.0, 0.0]),
                VectorRecord::from_chunk(&Chunk::new("chunk-2", "b"), vec![0.7, 0.7, 0.0, 0.0]),
                VectorRecord::from_chunk(&Chunk::new("chunk-3", "c"), vec![0.0, 0.0, 1.0, 0.0]),
            ])
            .await
            .unwrap();

        let results = index.query(&unit(4, 0), 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, "chunk-1");
        assert_eq!(results[1].id, "chunk-2");
        assert!(results[0].score >= results[1].score);
    }

    #[tokio::test]
    async fn test_missing_text_uses_placeholder() {
        let index = InMemoryIndex::new(2);
        let record = VectorRecord {
            id: "chunk-9".to_string(),
            embedding: vec![1.0, 0.0],
            metadata: RecordMetadata { text: None },
        };
        index.upsert(&[record]).await.unwrap();

        let results = index.query(&[1.0, 0.0], 5).await.unwrap();
        assert_eq!(results[0].text, NO_TEXT_AVAILABLE);
    }

    #[tokio::test]
    async fn test_wrong_dimension_rejected() {
        let index = InMemoryIndex::new(384);
        let record = VectorRecord::from_chunk(&Chunk::new("chunk-1", "a"), vec![0.5; 768]);

        assert!(matches!(
            index.upsert(&[record]).await,
            Err(FolioError::DimensionMismatch {
                expected: 384,
                actual: 768
            })
        ));
        assert!(index.query(&[0.5; 768], 5).await.is_err());
    }

    #[tokio::test]
    async fn test_empty_index_returns_nothing() {
        let index = InMemoryIndex::new(3);
        assert!(index.query(&[1.0, 0.0, 0.0], 5).await.unwrap().is_empty());
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }
}
