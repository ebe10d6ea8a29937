//! Folio Core - Domain models, traits, and shared types
//!
//! This crate defines the core abstractions shared by the avatar backend:
//! - Résumé chunks and vector records
//! - Retrieval results and avatar replies
//! - Common error types
//! - Service traits for text generation and speech synthesis
//! - Configuration management

pub mod config;

pub use config::{
    AppConfig, ConfigError, EmbeddingConfig, EmbeddingProvider, LlmConfig, LlmProvider,
    MailConfig, PersonaConfig, RagConfig, Section, TtsConfig, TtsProvider, VectorConfig,
    VectorProvider,
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Dimension of the default embedding model (all-MiniLM-L6-v2)
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 384;

/// Text reported for a retrieval hit whose record carries no text metadata
pub const NO_TEXT_AVAILABLE: &str = "No text available";

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for Folio operations
#[derive(Error, Debug)]
pub enum FolioError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Embedding dimension mismatch: got {actual}, expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Speech synthesis error: {0}")]
    Speech(String),

    #[error("Mail error: {0}")]
    Mail(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<ConfigError> for FolioError {
    fn from(err: ConfigError) -> Self {
        FolioError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, FolioError>;

// ============================================================================
// Chunks and Vector Records
// ============================================================================

/// A fixed-size slice of extracted résumé text
///
/// Chunks are the unit of retrieval. They are created once at ingestion
/// time and never mutated; the on-disk chunk file is a JSON array of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Sequential identifier (`chunk-1`, `chunk-2`, ...)
    pub id: String,

    /// Chunk text
    pub text: String,
}

impl Chunk {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }

    /// Number of whitespace-separated words in the chunk
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

/// Metadata stored alongside each vector
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// An embedded chunk as written to the vector index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    /// Chunk id; upserts overwrite records with the same id
    pub id: String,

    /// Embedding vector
    pub embedding: Vec<f32>,

    /// Record metadata
    pub metadata: RecordMetadata,
}

impl VectorRecord {
    /// Build a record for an embedded chunk
    pub fn from_chunk(chunk: &Chunk, embedding: Vec<f32>) -> Self {
        Self {
            id: chunk.id.clone(),
            embedding,
            metadata: RecordMetadata {
                text: Some(chunk.text.clone()),
            },
        }
    }
}

/// A vector index hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    /// Chunk id
    pub id: String,

    /// Similarity score as reported by the index
    pub score: f32,

    /// Chunk text, or [`NO_TEXT_AVAILABLE`] when the record has none
    pub text: String,
}

impl ScoredChunk {
    /// Build a hit from raw index output, substituting the placeholder
    /// for missing or empty text
    pub fn new(id: impl Into<String>, score: f32, text: Option<String>) -> Self {
        let text = text
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| NO_TEXT_AVAILABLE.to_string());

        Self {
            id: id.into(),
            score,
            text,
        }
    }

    /// Whether the hit carries real chunk text
    pub fn has_text(&self) -> bool {
        self.text != NO_TEXT_AVAILABLE
    }
}

/// Summary statistics for a vector index
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexStats {
    /// Vector dimension the index was created with, if reported
    pub dimension: Option<usize>,

    /// Number of stored vectors
    pub vector_count: u64,
}

// ============================================================================
// Avatar Replies
// ============================================================================

/// Encoded audio returned by a speech synthesizer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesizedAudio {
    /// Raw audio bytes
    pub bytes: Vec<u8>,

    /// MIME type of `bytes` (e.g. `audio/mpeg`)
    pub mime_type: String,
}

impl SynthesizedAudio {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }

    /// Empty audio, used when there is nothing to speak
    pub fn silent() -> Self {
        Self::new(Vec::new(), "audio/mpeg")
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// The avatar's answer to one visitor question
#[derive(Debug, Clone)]
pub struct AvatarReply {
    /// Generated reply text
    pub text: String,

    /// Spoken version of `text`
    pub audio: SynthesizedAudio,

    /// Chunks used as context
    pub sources: Vec<ScoredChunk>,

    /// End-to-end processing time
    pub processing_time_ms: u64,
}

// ============================================================================
// Service Traits
// ============================================================================

/// Trait for hosted text-generation backends
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generate a single reply for a prompt; each call is stateless
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Model identifier, for logging
    fn model_name(&self) -> &str;
}

/// Trait for speech synthesis backends
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Turn reply text into audio
    async fn synthesize(&self, text: &str) -> Result<SynthesizedAudio>;

    /// Backend name, for logging
    fn name(&self) -> &str;
}

// ============================================================================
// Tests
// ============================================================================
