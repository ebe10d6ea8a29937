//! Folio Configuration Management
//!
//! Handles configuration from environment variables and TOML files
//! with sensible defaults for development. Secrets are only ever read
//! from the environment or the config file, never compiled in.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::DEFAULT_EMBEDDING_DIMENSION;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,

    /// Hosted vector index
    pub vector: VectorConfig,

    /// Embedding model
    pub embedding: EmbeddingConfig,

    /// Text generation provider
    pub llm: LlmConfig,

    /// Speech synthesis provider
    pub tts: TtsConfig,

    /// Contact form mail relay
    pub mail: MailConfig,

    /// RAG pipeline configuration
    pub rag: RagConfig,

    /// Avatar persona used in prompts
    pub persona: PersonaConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Configuration sections that can be required by a component
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    VectorIndex,
    Embedding,
    Llm,
    Speech,
    Mail,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().apply_overrides(|key| std::env::var(key).ok())
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })
    }

    /// Merge with environment variables (env takes precedence)
    pub fn with_env_override(self) -> Result<Self, ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Load the file if one is given, then apply the environment on top
    pub fn load(path: Option<PathBuf>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path)?.with_env_override(),
            None => Self::from_env(),
        }
    }

    /// Apply overrides from a key lookup (the environment in production)
    pub fn apply_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        // Server
        if let Some(host) = get("API_HOST") {
            self.server.host = host;
        }
        // PORT is what most hosting platforms inject
        if let Some((key, port)) = get("API_PORT")
            .map(|p| ("API_PORT", p))
            .or_else(|| get("PORT").map(|p| ("PORT", p)))
        {
            self.server.port = port.parse().map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value: port,
            })?;
        }
        if let Some(origins) = get("CORS_ORIGINS") {
            self.server.cors_origins = origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        // Vector index
        if let Some(provider) = get("VECTOR_PROVIDER") {
            self.vector.provider = provider.parse()?;
        }
        if let Some(key) = get("PINECONE_API_KEY") {
            self.vector.pinecone_api_key = Some(key);
        }
        if let Some(index) = get("PINECONE_INDEX") {
            self.vector.pinecone_index = Some(index);
        }
        if let Some(host) = get("PINECONE_HOST") {
            self.vector.pinecone_host = Some(host);
        }
        if let Some(namespace) = get("PINECONE_NAMESPACE") {
            self.vector.pinecone_namespace = Some(namespace);
        }
        if let Some(url) = get("QDRANT_URL") {
            self.vector.qdrant_url = url;
        }
        if let Some(key) = get("QDRANT_API_KEY") {
            self.vector.qdrant_api_key = Some(key);
        }
        if let Some(collection) = get("QDRANT_COLLECTION") {
            self.vector.qdrant_collection = collection;
        }

        // Embedding
        if let Some(provider) = get("EMBEDDING_PROVIDER") {
            self.embedding.provider = provider.parse()?;
        }
        if let Some(model) = get("EMBEDDING_MODEL") {
            self.embedding.model = Some(model);
        }
        if let Some(dir) = get("EMBEDDING_CACHE_DIR") {
            self.embedding.cache_dir = Some(PathBuf::from(dir));
        }

        // LLM
        if let Some(provider) = get("LLM_PROVIDER") {
            self.llm.provider = provider.parse()?;
        }
        if let Some(key) = get("GEMINI_API_KEY") {
            self.llm.gemini_api_key = Some(key);
        }
        if let Some(model) = get("LLM_MODEL") {
            self.llm.model = Some(model);
        }
        if let Some(url) = get("OPENAI_BASE_URL") {
            self.llm.openai_base_url = Some(url);
        }

        // TTS
        if let Some(provider) = get("TTS_PROVIDER") {
            self.tts.provider = provider.parse()?;
        }
        if let Some(key) = get("GOOGLE_TTS_API_KEY") {
            self.tts.google_api_key = Some(key);
        }
        if let Some(voice) = get("TTS_VOICE") {
            self.tts.voice = Some(voice);
        }
        // Split on whitespace; a program path containing spaces has to be
        // set through `tts.command` in the config file instead
        if let Some(command) = get("TTS_COMMAND") {
            let mut parts = command.split_whitespace().map(str::to_string);
            self.tts.command = parts.next();
            self.tts.command_args = parts.collect();
        }

        // Keys shared by several providers
        if let Some(key) = get("OPENAI_API_KEY") {
            self.llm.openai_api_key = Some(key.clone());
            self.embedding.openai_api_key = Some(key.clone());
            self.tts.openai_api_key = Some(key);
        }
        if let Some(url) = get("OLLAMA_URL") {
            self.llm.ollama_url = url.clone();
            self.embedding.ollama_url = url;
        }

        // Mail
        if let Some(host) = get("SMTP_HOST") {
            self.mail.smtp_host = host;
        }
        if let Some(port) = get("SMTP_PORT") {
            self.mail.smtp_port = Some(port.parse().map_err(|_| ConfigError::InvalidValue {
                key: "SMTP_PORT".to_string(),
                value: port,
            })?);
        }
        if let Some(user) = get("SMTP_USERNAME") {
            self.mail.smtp_username = Some(user);
        }
        if let Some(pass) = get("SMTP_PASSWORD") {
            self.mail.smtp_password = Some(pass);
        }
        if let Some(recipient) = get("CONTACT_RECIPIENT") {
            self.mail.recipient = Some(recipient);
        }

        // RAG / persona
        if let Some(top_k) = get("RAG_TOP_K") {
            self.rag.default_top_k = top_k.parse().map_err(|_| ConfigError::InvalidValue {
                key: "RAG_TOP_K".to_string(),
                value: top_k,
            })?;
        }
        if let Some(size) = get("RAG_CHUNK_SIZE") {
            self.rag.chunk_size = size.parse().map_err(|_| ConfigError::InvalidValue {
                key: "RAG_CHUNK_SIZE".to_string(),
                value: size,
            })?;
        }
        if let Some(name) = get("PERSONA_NAME") {
            self.persona.name = name;
        }

        // Logging
        if let Some(level) = get("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = get("LOG_FORMAT") {
            self.logging.json_format = format.eq_ignore_ascii_case("json");
        }

        Ok(self)
    }

    /// Check that every value a component needs is present.
    ///
    /// Missing values are fatal at startup; the caller is expected to
    /// abort with the returned error.
    pub fn require(&self, sections: &[Section]) -> Result<(), ConfigError> {
        for section in sections {
            match section {
                Section::VectorIndex => self.vector.validate()?,
                Section::Embedding => self.embedding.validate()?,
                Section::Llm => self.llm.validate()?,
                Section::Speech => self.tts.validate()?,
                Section::Mail => self.mail.validate()?,
            }
        }

        self.rag.validate()
    }
}

fn required<'a>(value: &'a Option<String>, key: &str) -> Result<&'a str, ConfigError> {
    value
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingRequired(key.to_string()))
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Maximum request body size in bytes
    pub max_body_size: usize,

    /// Allowed origins for CORS
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            max_body_size: 1024 * 1024,
            // Empty by default - set via CORS_ORIGINS env var
            cors_origins: vec![],
        }
    }
}

/// Supported vector index backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorProvider {
    Pinecone,
    Qdrant,
    Memory,
}

impl std::str::FromStr for VectorProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pinecone" => Ok(Self::Pinecone),
            "qdrant" => Ok(Self::Qdrant),
            "memory" => Ok(Self::Memory),
            _ => Err(ConfigError::InvalidValue {
                key: "VECTOR_PROVIDER".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Vector index configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorConfig {
    /// Index backend
    pub provider: VectorProvider,

    /// Pinecone API key
    pub pinecone_api_key: Option<String>,

    /// Pinecone index name
    pub pinecone_index: Option<String>,

    /// Pinecone data-plane host (resolved from the index name when unset)
    pub pinecone_host: Option<String>,

    /// Pinecone namespace
    pub pinecone_namespace: Option<String>,

    /// Qdrant gRPC URL
    pub qdrant_url: String,

    /// Qdrant API key
    pub qdrant_api_key: Option<String>,

    /// Qdrant collection name
    pub qdrant_collection: String,

    /// Vector dimension (must match embedding model)
    pub dimension: usize,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self {
            provider: VectorProvider::Pinecone,
            pinecone_api_key: None,
            pinecone_index: None,
            pinecone_host: None,
            pinecone_namespace: None,
            qdrant_url: "http://localhost:6334".to_string(),
            qdrant_api_key: None,
            qdrant_collection: "resume_chunks".to_string(),
            dimension: DEFAULT_EMBEDDING_DIMENSION,
            timeout_secs: 30,
        }
    }
}

impl VectorConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.dimension == 0 {
            return Err(ConfigError::InvalidValue {
                key: "vector.dimension".to_string(),
                value: "0".to_string(),
            });
        }
        if self.provider == VectorProvider::Pinecone {
            required(&self.pinecone_api_key, "PINECONE_API_KEY")?;
            required(&self.pinecone_index, "PINECONE_INDEX")?;
        }
        Ok(())
    }
}

/// Supported embedding backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    Local,
    Ollama,
    OpenAI,
}

impl std::str::FromStr for EmbeddingProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAI),
            _ => Err(ConfigError::InvalidValue {
                key: "EMBEDDING_PROVIDER".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Embedding model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Embedding backend
    pub provider: EmbeddingProvider,

    /// Model name (provider default when unset)
    pub model: Option<String>,

    /// Ollama server URL
    pub ollama_url: String,

    /// OpenAI API key
    pub openai_api_key: Option<String>,

    /// Directory for downloaded local model files
    pub cache_dir: Option<PathBuf>,

    /// Maximum number of cached query embeddings
    pub cache_capacity: u64,

    /// Time-to-live for cached query embeddings (seconds)
    pub cache_ttl_secs: u64,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::Local,
            model: None,
            ollama_url: "http://localhost:11434".to_string(),
            openai_api_key: None,
            cache_dir: None,
            cache_capacity: 1_000,
            cache_ttl_secs: 3600,
            timeout_secs: 60,
        }
    }
}

impl EmbeddingConfig {
    /// Model name, falling back to the provider's 384-dimension default
    pub fn model_name(&self) -> String {
        self.model.clone().unwrap_or_else(|| {
            match self.provider {
                EmbeddingProvider::Local => "all-minilm-l6-v2",
                EmbeddingProvider::Ollama => "all-minilm",
                EmbeddingProvider::OpenAI => "text-embedding-3-small",
            }
            .to_string()
        })
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.provider == EmbeddingProvider::OpenAI {
            required(&self.openai_api_key, "OPENAI_API_KEY")?;
        }
        Ok(())
    }
}

/// Supported LLM providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    Gemini,
    OpenAI,
    Ollama,
}

impl std::str::FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gemini" => Ok(Self::Gemini),
            "openai" => Ok(Self::OpenAI),
            "ollama" => Ok(Self::Ollama),
            _ => Err(ConfigError::InvalidValue {
                key: "LLM_PROVIDER".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// LLM provider to use
    pub provider: LlmProvider,

    /// Gemini API key
    pub gemini_api_key: Option<String>,

    /// OpenAI API key
    pub openai_api_key: Option<String>,

    /// OpenAI API base URL (for compatible APIs)
    pub openai_base_url: Option<String>,

    /// Ollama server URL
    pub ollama_url: String,

    /// Model name (provider default when unset)
    pub model: Option<String>,

    /// Maximum tokens for completion
    pub max_tokens: u32,

    /// Temperature for generation
    pub temperature: f32,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::Gemini,
            gemini_api_key: None,
            openai_api_key: None,
            openai_base_url: None,
            ollama_url: "http://localhost:11434".to_string(),
            model: None,
            max_tokens: 512,
            temperature: 0.7,
            timeout_secs: 60,
        }
    }
}

impl LlmConfig {
    /// Model name, falling back to the provider default
    pub fn model_name(&self) -> String {
        self.model.clone().unwrap_or_else(|| {
            match self.provider {
                LlmProvider::Gemini => "gemini-2.5-flash",
                LlmProvider::OpenAI => "gpt-4o-mini",
                LlmProvider::Ollama => "llama3.2",
            }
            .to_string()
        })
    }

    fn validate(&self) -> Result<(), ConfigError> {
        match self.provider {
            LlmProvider::Gemini => required(&self.gemini_api_key, "GEMINI_API_KEY").map(|_| ()),
            LlmProvider::OpenAI => required(&self.openai_api_key, "OPENAI_API_KEY").map(|_| ()),
            LlmProvider::Ollama => Ok(()),
        }
    }
}

/// Supported speech synthesis backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TtsProvider {
    Google,
    OpenAI,
    Command,
}

impl std::str::FromStr for TtsProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "google" => Ok(Self::Google),
            "openai" => Ok(Self::OpenAI),
            "command" => Ok(Self::Command),
            _ => Err(ConfigError::InvalidValue {
                key: "TTS_PROVIDER".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Speech synthesis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TtsConfig {
    /// Synthesis backend
    pub provider: TtsProvider,

    /// Google Cloud Text-to-Speech API key
    pub google_api_key: Option<String>,

    /// OpenAI API key
    pub openai_api_key: Option<String>,

    /// BCP-47 language code
    pub language_code: String,

    /// Voice name (provider default when unset)
    pub voice: Option<String>,

    /// Helper program for the command backend.
    ///
    /// `TTS_COMMAND` is split on whitespace into program and arguments, so
    /// a path with spaces must be set here rather than in the environment.
    pub command: Option<String>,

    /// Extra arguments passed before `<text> <out-file>`
    pub command_args: Vec<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            provider: TtsProvider::Google,
            google_api_key: None,
            openai_api_key: None,
            language_code: "en-US".to_string(),
            voice: None,
            command: None,
            command_args: Vec::new(),
            timeout_secs: 60,
        }
    }
}

impl TtsConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        match self.provider {
            TtsProvider::Google => required(&self.google_api_key, "GOOGLE_TTS_API_KEY").map(|_| ()),
            TtsProvider::OpenAI => required(&self.openai_api_key, "OPENAI_API_KEY").map(|_| ()),
            TtsProvider::Command => required(&self.command, "TTS_COMMAND").map(|_| ()),
        }
    }
}

/// SMTP relay used by the contact form
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    /// SMTP relay host (implicit TLS)
    pub smtp_host: String,

    /// Port override
    pub smtp_port: Option<u16>,

    /// SMTP username
    pub smtp_username: Option<String>,

    /// SMTP password (an app password for Gmail)
    pub smtp_password: Option<String>,

    /// Sender address; defaults to the SMTP username
    pub sender: Option<String>,

    /// Address that receives contact form messages
    pub recipient: Option<String>,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            smtp_host: "smtp.gmail.com".to_string(),
            smtp_port: None,
            smtp_username: None,
            smtp_password: None,
            sender: None,
            recipient: None,
        }
    }
}

impl MailConfig {
    /// Sender address, falling back to the SMTP username
    pub fn sender_address(&self) -> Option<&str> {
        self.sender.as_deref().or(self.smtp_username.as_deref())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        required(&self.smtp_username, "SMTP_USERNAME")?;
        required(&self.smtp_password, "SMTP_PASSWORD")?;
        required(&self.recipient, "CONTACT_RECIPIENT")?;
        Ok(())
    }
}

/// RAG pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Number of chunks retrieved when the request does not say
    pub default_top_k: usize,

    /// Upper bound accepted from requests
    pub max_top_k: usize,

    /// Words per chunk at ingestion
    pub chunk_size: usize,

    /// Maximum context length (characters)
    pub max_context_length: usize,
}

impl RagConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_top_k == 0 {
            return Err(ConfigError::InvalidValue {
                key: "rag.max_top_k".to_string(),
                value: "0".to_string(),
            });
        }
        if !(1..=self.max_top_k).contains(&self.default_top_k) {
            return Err(ConfigError::InvalidValue {
                key: "RAG_TOP_K".to_string(),
                value: self.default_top_k.to_string(),
            });
        }
        Ok(())
    }
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            default_top_k: 5,
            max_top_k: 50,
            chunk_size: 200,
            max_context_length: 8000,
        }
    }
}

/// Avatar persona rendered into every prompt
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonaConfig {
    /// Name the avatar speaks as
    pub name: String,

    /// Where the avatar lives
    pub description: String,

    /// Style rules, one bullet each
    pub style: Vec<String>,

    /// Reply for questions outside the résumé
    pub off_topic_reply: String,
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            name: "the site owner".to_string(),
            description: "an AI avatar on my portfolio website".to_string(),
            style: vec![
                "Speak in first person (\"I\", \"me\")".to_string(),
                "Be concise: 2-3 complete sentences max".to_string(),
                "Be warm, confident, and slightly witty".to_string(),
                "If the user gives their name, use it naturally in your reply".to_string(),
                "Never sound robotic; avoid generic filler like \"As an AI language model\""
                    .to_string(),
                "Do not include * in any answer".to_string(),
            ],
            off_topic_reply: "I don't have that information. Sorry!".to_string(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}
