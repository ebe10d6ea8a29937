//! Folio Vector - Embeddings and vector index abstraction
//!
//! Provides the embedding models that turn résumé chunks and visitor
//! questions into 384-dimension vectors, and the vector indexes
//! (Pinecone, Qdrant, in-memory) that store and search them.
//!
//! Author: hephaex@gmail.com

use async_trait::async_trait;
use folio_core::{
    AppConfig, Chunk, FolioError, IndexStats, Result, ScoredChunk, VectorProvider, VectorRecord,
};
use std::sync::Arc;

pub mod cache;
pub mod embedding;
pub mod memory;
pub mod pinecone;
pub mod qdrant_store;

pub use cache::{CacheStats, CachedEmbedder};
pub use embedding::{create_embedder, DimensionGuard, Embedder};
pub use memory::InMemoryIndex;
pub use pinecone::PineconeIndex;
pub use qdrant_store::QdrantIndex;

/// Chunks embedded per model call during upload
const UPLOAD_BATCH_SIZE: usize = 32;

/// Trait for vector index operations
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Write records; a record with an existing id overwrites it
    async fn upsert(&self, records: &[VectorRecord]) -> Result<usize>;

    /// Nearest records to `vector`, best first, at most `top_k`
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<ScoredChunk>>;

    /// Dimension and size of the index
    async fn stats(&self) -> Result<IndexStats>;

    /// Backend name, for logging
    fn name(&self) -> &str;
}

/// Create the configured vector index
pub async fn create_vector_index(config: &AppConfig) -> Result<Arc<dyn VectorIndex>> {
    let vector = &config.vector;
    let index: Arc<dyn VectorIndex> = match vector.provider {
        VectorProvider::Pinecone => Arc::new(PineconeIndex::connect(vector).await?),
        VectorProvider::Qdrant => {
            let store = QdrantIndex::new(vector)?;
            store.init_collection().await?;
            Arc::new(store)
        }
        VectorProvider::Memory => Arc::new(InMemoryIndex::new(vector.dimension)),
    };

    tracing::info!("Vector index ready: {}", index.name());
    Ok(index)
}

/// Embed chunks and upsert them into the index.
///
/// Upload is idempotent: chunk ids are the record ids, so re-running it
/// with the same chunk file overwrites the same records.
pub async fn upload_chunks(
    embedder: &dyn Embedder,
    index: &dyn VectorIndex,
    chunks: &[Chunk],
) -> Result<usize> {
    if chunks.is_empty() {
        return Err(FolioError::Validation("No chunks to upload".to_string()));
    }

    let mut records = Vec::with_capacity(chunks.len());

    for batch in chunks.chunks(UPLOAD_BATCH_SIZE) {
        let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
        let embeddings = embedder.embed_batch(&texts).await?;

        if embeddings.len() != batch.len() {
            return Err(FolioError::Embedding(format!(
                "Expected {} embeddings, got {}",
                batch.len(),
                embeddings.len()
            )));
        }

        for (chunk, embedding) in batch.iter().zip(embeddings) {
            tracing::debug!("Embedded {}", chunk.id);
            records.push(VectorRecord::from_chunk(chunk, embedding));
        }
    }

    tracing::info!("Uploading {} records to {}", records.len(), index.name());
    index.upsert(&records).await
}

/// Embed a question and return its nearest chunks
pub async fn search(
    embedder: &dyn Embedder,
    index: &dyn VectorIndex,
    question: &str,
    top_k: usize,
) -> Result<Vec<ScoredChunk>> {
    let vector = embedder.embed(question).await?;
    index.query(&vector, top_k).await
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Deterministic bag-of-words embedder for tests
    pub struct KeywordEmbedder {
        pub vocabulary: Vec<&'static str>,
        pub dimension: usize,
    }

    impl KeywordEmbedder {
        pub fn new(dimension: usize) -> Self {
            Self {
                vocabulary: vec!["react", "node", "rust", "python", "cricket", "football"],
                dimension,
            }
        }

        pub fn vector(&self, text: &str) -> Vec<f32> {
            let lower = text.to_lowercase();
            let mut v = vec![0.0; self.dimension];
            for (i, word) in self.vocabulary.iter().enumerate() {
                if lower.contains(word) {
                    v[i] = 1.0;
                }
            }
            // Shared component so every pair of vectors has some similarity
            v[self.dimension - 1] = 0.1;
            v
        }
    }

    #[async_trait]
    impl Embedder for KeywordEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            Ok(self.vector(text))
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|t| self.vector(t)).collect())
        }

        fn dimension(&self) -> usize {
            self.dimension
        }

        fn model_name(&self) -> &str {
            "keyword-test"
        }
    }
}
