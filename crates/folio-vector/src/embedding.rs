//! Embedding clients for generating vector representations
//!
//! The default model is all-MiniLM-L6-v2 running in-process (mean-pooled,
//! normalized, 384 dimensions). Ollama and OpenAI are available as
//! alternatives. Every client is wrapped in a [`DimensionGuard`]: a vector
//! of the wrong length is a fatal error, never silently coerced.
//!
//! Author: hephaex@gmail.com

use async_trait::async_trait;
use folio_core::{EmbeddingConfig, EmbeddingProvider, FolioError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::cache::CachedEmbedder;

// ============================================================================
// Embedding Trait
// ============================================================================

/// Trait for embedding generation
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate embedding for a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts (batch)
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Get embedding dimension
    fn dimension(&self) -> usize;

    /// Model identifier
    fn model_name(&self) -> &str;
}

fn http_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| FolioError::Embedding(format!("Failed to build HTTP client: {e}")))
}

// ============================================================================
// Dimension Guard
// ============================================================================

/// Fail when a vector does not have the expected length
pub fn check_dimension(vector: &[f32], expected: usize) -> Result<()> {
    if vector.len() != expected {
        return Err(FolioError::DimensionMismatch {
            expected,
            actual: vector.len(),
        });
    }
    Ok(())
}

/// Wrapper enforcing a fixed embedding dimension on every vector
pub struct DimensionGuard {
    inner: Arc<dyn Embedder>,
    expected: usize,
}

impl DimensionGuard {
    pub fn new(inner: Arc<dyn Embedder>, expected: usize) -> Self {
        Self { inner, expected }
    }
}

#[async_trait]
impl Embedder for DimensionGuard {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let vector = self.inner.embed(text).await?;
        check_dimension(&vector, self.expected)?;
        Ok(vector)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let vectors = self.inner.embed_batch(texts).await?;
        for vector in &vectors {
            check_dimension(vector, self.expected)?;
        }
        Ok(vectors)
    }

    fn dimension(&self) -> usize {
        self.expected
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
}

// ============================================================================
// Local Embedding Model
// ============================================================================

#[cfg(feature = "local-embeddings")]
pub use local::LocalEmbedder;

#[cfg(feature = "local-embeddings")]
mod local {
    use super::*;
    use std::sync::Mutex;

    /// In-process sentence-transformer model via fastembed.
    ///
    /// The model is downloaded on first use and cached on disk. Inference
    /// runs on tokio's blocking pool, one call at a time.
    pub struct LocalEmbedder {
        model: Arc<Mutex<fastembed::TextEmbedding>>,
        model_name: String,
        dimension: usize,
    }

    fn resolve_model(name: &str) -> Result<(fastembed::EmbeddingModel, usize)> {
        match name {
            "all-minilm-l6-v2" => Ok((fastembed::EmbeddingModel::AllMiniLML6V2, 384)),
            "bge-small-en-v1.5" => Ok((fastembed::EmbeddingModel::BGESmallENV15, 384)),
            "multilingual-e5-small" => Ok((fastembed::EmbeddingModel::MultilingualE5Small, 384)),
            "bge-base-en-v1.5" => Ok((fastembed::EmbeddingModel::BGEBaseENV15, 768)),
            other => Err(FolioError::Config(format!(
                "Unknown local embedding model: '{other}'. Supported models: \
                 all-minilm-l6-v2, bge-small-en-v1.5, multilingual-e5-small, bge-base-en-v1.5"
            ))),
        }
    }

    impl LocalEmbedder {
        /// Load the configured model
        pub async fn load(config: &EmbeddingConfig) -> Result<Self> {
            let model_name = config.model_name();
            let (model, dimension) = resolve_model(&model_name)?;
            let cache_dir = config.cache_dir.clone();

            tracing::info!("Loading embedding model {}", model_name);
            let embedding = tokio::task::spawn_blocking(move || {
                let mut options =
                    fastembed::InitOptions::new(model).with_show_download_progress(false);
                if let Some(dir) = cache_dir {
                    options = options.with_cache_dir(dir);
                }
                fastembed::TextEmbedding::try_new(options)
            })
            .await
            .map_err(|e| FolioError::Embedding(format!("Model loader task failed: {e}")))?
            .map_err(|e| {
                FolioError::Embedding(format!("Failed to initialize local embedding model: {e}"))
            })?;
            tracing::info!("Embedding model loaded ({} dimensions)", dimension);

            Ok(Self {
                model: Arc::new(Mutex::new(embedding)),
                model_name,
                dimension,
            })
        }
    }

    #[async_trait]
    impl Embedder for LocalEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            self.embed_batch(&[text.to_string()])
                .await?
                .into_iter()
                .next()
                .ok_or_else(|| FolioError::Embedding("No embedding returned".to_string()))
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            if texts.is_empty() {
                return Ok(Vec::new());
            }

            let model = Arc::clone(&self.model);
            let texts = texts.to_vec();

            tokio::task::spawn_blocking(move || {
                let mut model = model
                    .lock()
                    .map_err(|_| FolioError::Embedding("Embedding model lock poisoned".to_string()))?;
                model
                    .embed(texts, None)
                    .map_err(|e| FolioError::Embedding(format!("Local embedding failed: {e}")))
            })
            .await
            .map_err(|e| FolioError::Embedding(format!("Embedding task failed: {e}")))?
        }

        fn dimension(&self) -> usize {
            self.dimension
        }

        fn model_name(&self) -> &str {
            &self.model_name
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_resolve_model() {
            let (_, dims) = resolve_model("all-minilm-l6-v2").unwrap();
            assert_eq!(dims, 384);
            assert!(matches!(
                resolve_model("word2vec"),
                Err(FolioError::Config(_))
            ));
        }
    }
}

// ============================================================================
// OpenAI Embedding Client
// ============================================================================

/// OpenAI embedding API client
///
/// text-embedding-3 models accept a `dimensions` parameter, so the index
/// dimension is requested explicitly.
pub struct OpenAiEmbedding {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    dimension: usize,
}

#[derive(Debug, Serialize)]
struct OpenAiEmbeddingRequest {
    input: Vec<String>,
    model: String,
    dimensions: usize,
}

#[derive(Debug, Deserialize)]
struct OpenAiEmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

impl OpenAiEmbedding {
    /// Create a new OpenAI embedding client
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        dimension: usize,
        timeout_secs: u64,
    ) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout_secs)?,
            api_key: api_key.into(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: model.into(),
            dimension,
        })
    }

    /// Create from config
    pub fn from_config(config: &EmbeddingConfig, dimension: usize) -> Result<Self> {
        let api_key = config
            .openai_api_key
            .as_ref()
            .ok_or_else(|| FolioError::Config("OpenAI API key required".to_string()))?;

        Self::new(
            api_key.clone(),
            config.model_name(),
            dimension,
            config.timeout_secs,
        )
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let results = self.embed_batch(&[text.to_string()]).await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| FolioError::Embedding("No embedding returned".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = OpenAiEmbeddingRequest {
            input: texts.to_vec(),
            model: self.model.clone(),
            dimensions: self.dimension,
        };

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| FolioError::Embedding(format!("Embedding request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(FolioError::Embedding(format!(
                "OpenAI embedding error {status}: {error_text}"
            )));
        }

        let result: OpenAiEmbeddingResponse = response.json().await.map_err(|e| {
            FolioError::Embedding(format!("Failed to parse embedding response: {e}"))
        })?;

        // Sort by index and extract embeddings
        let mut embeddings = result.data;
        embeddings.sort_by_key(|e| e.index);

        Ok(embeddings.into_iter().map(|e| e.embedding).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

// ============================================================================
// Ollama Embedding Client
// ============================================================================

/// Ollama embedding API client
pub struct OllamaEmbedding {
    client: Client,
    base_url: String,
    model: String,
    dimension: usize,
}

#[derive(Debug, Serialize)]
struct OllamaEmbeddingRequest {
    model: String,
    prompt: String,
}

#[derive(Debug, Deserialize)]
struct OllamaEmbeddingResponse {
    embedding: Vec<f32>,
}

impl OllamaEmbedding {
    /// Create a new Ollama embedding client
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        let model = model.into();
        let dimension = match model.as_str() {
            "all-minilm" | "all-minilm:l6-v2" => 384,
            "nomic-embed-text" => 768,
            "mxbai-embed-large" => 1024,
            _ => 384,
        };

        Ok(Self {
            client: http_client(timeout_secs)?,
            base_url: base_url.into(),
            model,
            dimension,
        })
    }

    /// Create from config
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self> {
        Self::new(
            config.ollama_url.clone(),
            config.model_name(),
            config.timeout_secs,
        )
    }
}

#[async_trait]
impl Embedder for OllamaEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = OllamaEmbeddingRequest {
            model: self.model.clone(),
            prompt: text.to_string(),
        };

        let response = self
            .client
            .post(format!("{}/api/embeddings", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| FolioError::Embedding(format!("Ollama embedding request failed: {e}")))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(FolioError::Embedding(format!(
                "Ollama embedding error: {error_text}"
            )));
        }

        let result: OllamaEmbeddingResponse = response.json().await.map_err(|e| {
            FolioError::Embedding(format!("Failed to parse embedding response: {e}"))
        })?;

        Ok(result.embedding)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        // Ollama doesn't have native batch embedding, so we process sequentially
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

// ============================================================================
// Factory function
// ============================================================================

/// Create the configured embedder: backend, query cache, dimension guard.
///
/// A backend whose native dimension differs from the index dimension is
/// rejected here, before any request is served.
pub async fn create_embedder(
    config: &EmbeddingConfig,
    dimension: usize,
) -> Result<Arc<dyn Embedder>> {
    let backend: Arc<dyn Embedder> = match config.provider {
        #[cfg(feature = "local-embeddings")]
        EmbeddingProvider::Local => Arc::new(LocalEmbedder::load(config).await?),
        #[cfg(not(feature = "local-embeddings"))]
        EmbeddingProvider::Local => {
            return Err(FolioError::Config(
                "Local embeddings require the local-embeddings feature".to_string(),
            ))
        }
        EmbeddingProvider::Ollama => Arc::new(OllamaEmbedding::from_config(config)?),
        EmbeddingProvider::OpenAI => Arc::new(OpenAiEmbedding::from_config(config, dimension)?),
    };

    if backend.dimension() != dimension {
        return Err(FolioError::DimensionMismatch {
            expected: dimension,
            actual: backend.dimension(),
        });
    }

    let cached = CachedEmbedder::new(backend, config.cache_capacity, config.cache_ttl_secs);
    Ok(Arc::new(DimensionGuard::new(Arc::new(cached), dimension)))
}

// ============================================================================
// Tests
// ============================================================================
