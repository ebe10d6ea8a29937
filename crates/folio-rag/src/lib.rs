//! Folio RAG - Avatar question answering
//!
//! This crate implements the avatar's request pipeline:
//! embed the question → query the vector index → build the persona
//! prompt → generate a reply → synthesize speech.
//!
//! Every service is injected as a trait object, built once at startup.
//!
//! Author: hephaex@gmail.com

use folio_core::{
    AppConfig, AvatarReply, FolioError, LlmClient, PersonaConfig, RagConfig, Result, ScoredChunk,
    SpeechSynthesizer, SynthesizedAudio,
};
use folio_vector::{Embedder, VectorIndex};
use std::sync::Arc;
use std::time::Instant;

pub mod llm;
pub mod prompt;
pub mod tts;

pub use llm::{create_llm_client, GeminiClient, OllamaClient, OpenAiClient};
pub use prompt::PromptBuilder;
pub use tts::{create_synthesizer, CommandTts, GoogleTts, OpenAiTts};

// ============================================================================
// Avatar Pipeline
// ============================================================================

/// The avatar's query service
pub struct AvatarPipeline {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    llm: Arc<dyn LlmClient>,
    tts: Arc<dyn SpeechSynthesizer>,
    config: RagConfig,
    persona: PersonaConfig,
}

impl AvatarPipeline {
    /// Create a new pipeline from already-built services
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        llm: Arc<dyn LlmClient>,
        tts: Arc<dyn SpeechSynthesizer>,
        config: RagConfig,
        persona: PersonaConfig,
    ) -> Self {
        Self {
            embedder,
            index,
            llm,
            tts,
            config,
            persona,
        }
    }

    /// Build every service from configuration
    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        let embedder =
            folio_vector::create_embedder(&config.embedding, config.vector.dimension).await?;
        let index = folio_vector::create_vector_index(config).await?;
        let llm = create_llm_client(&config.llm)?;
        let tts = create_synthesizer(&config.tts)?;

        Ok(Self::new(
            embedder,
            index,
            llm,
            tts,
            config.rag.clone(),
            config.persona.clone(),
        ))
    }

    /// Resolve a requested result count: default when absent, rejected
    /// outside `1..=max_top_k`
    pub fn resolve_top_k(&self, requested: Option<usize>) -> Result<usize> {
        match requested {
            None => Ok(self.config.default_top_k),
            Some(k) if k >= 1 && k <= self.config.max_top_k => Ok(k),
            Some(k) => Err(FolioError::Validation(format!(
                "topK must be between 1 and {}, got {k}",
                self.config.max_top_k
            ))),
        }
    }

    /// Nearest résumé chunks for a question
    pub async fn retrieve(&self, question: &str, top_k: Option<usize>) -> Result<Vec<ScoredChunk>> {
        let question = validate_question(question)?;
        let top_k = self.resolve_top_k(top_k)?;

        let results =
            folio_vector::search(self.embedder.as_ref(), self.index.as_ref(), question, top_k)
                .await?;
        tracing::info!("Retrieved {} chunks for \"{}\"", results.len(), question);
        Ok(results)
    }

    /// Build the persona prompt for a question and its retrieved context
    pub fn build_prompt(&self, question: &str, context: &[ScoredChunk]) -> String {
        PromptBuilder::for_persona(&self.persona)
            .add_chunks(context, self.config.max_context_length)
            .question(question)
            .build()
    }

    /// Answer a question with text and speech
    pub async fn chat(&self, question: &str, top_k: Option<usize>) -> Result<AvatarReply> {
        let start = Instant::now();

        let sources = self.retrieve(question, top_k).await?;
        let prompt = self.build_prompt(question.trim(), &sources);

        let text = self.llm.generate(&prompt).await?.trim().to_string();
        tracing::debug!("{} reply: {}", self.llm.model_name(), text);

        let audio = if text.is_empty() {
            tracing::warn!("Empty reply from {}, skipping speech", self.llm.model_name());
            SynthesizedAudio::silent()
        } else {
            self.tts.synthesize(&text).await?
        };

        let processing_time_ms = start.elapsed().as_millis() as u64;
        tracing::info!(
            "Reply ready in {}ms ({} audio bytes via {})",
            processing_time_ms,
            audio.bytes.len(),
            self.tts.name()
        );

        Ok(AvatarReply {
            text,
            audio,
            sources,
            processing_time_ms,
        })
    }

    /// The vector index behind this pipeline
    pub fn index(&self) -> &Arc<dyn VectorIndex> {
        &self.index
    }

    /// The embedder behind this pipeline
    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }
}

fn validate_question(question: &str) -> Result<&str> {
    let question = question.trim();
    if question.is_empty() {
        return Err(FolioError::Validation("Query is required".to_string()));
    }
    Ok(question)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use folio_core::Chunk;
    use folio_vector::InMemoryIndex;
    use std::sync::Mutex;

    struct LetterEmbedder;

    #[async_trait]
    impl Embedder for LetterEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            let lower = text.to_lowercase();
            Ok(vec![
                if lower.contains("react") || lower.contains("language") { 1.0 } else { 0.0 },
                if lower.contains("cricket") { 1.0 } else { 0.0 },
                0.1,
            ])
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            let mut out = Vec::new();
            for text in texts {
                out.push(self.embed(text).await?);
            }
            Ok(out)
        }

        fn dimension(&self) -> usize {
            3
        }

        fn model_name(&self) -> &str {
            "letters"
        }
    }

    #[derive(Default)]
    struct RecordingLlm {
        reply: String,
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl LlmClient for RecordingLlm {
        async fn generate(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(self.reply.clone())
        }

        fn model_name(&self) -> &str {
            "recording"
        }
    }

    #[derive(Default)]
    struct CountingTts {
        calls: Mutex<usize>,
    }

    #[async_trait]
    impl SpeechSynthesizer for CountingTts {
        async fn synthesize(&self, text: &str) -> Result<SynthesizedAudio> {
            *self.calls.lock().unwrap() += 1;
            Ok(SynthesizedAudio::new(text.as_bytes().to_vec(), "audio/mpeg"))
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    async fn pipeline(reply: &str) -> (AvatarPipeline, Arc<RecordingLlm>, Arc<CountingTts>) {
        let embedder: Arc<dyn Embedder> = Arc::new(LetterEmbedder);
        let index = Arc::new(InMemoryIndex::new(3));
        folio_vector::upload_chunks(
            embedder.as_ref(),
            index.as_ref(),
            &[
                Chunk::new("chunk-1", "Skilled in React and Node"),
                Chunk::new("chunk-2", "Plays cricket on weekends"),
            ],
        )
        .await
        .unwrap();

        let llm = Arc::new(RecordingLlm {
            reply: reply.to_string(),
            ..Default::default()
        });
        let tts = Arc::new(CountingTts::default());
        let pipeline = AvatarPipeline::new(
            embedder,
            index,
            llm.clone(),
            tts.clone(),
            RagConfig::default(),
            PersonaConfig::default(),
        );
        (pipeline, llm, tts)
    }

    #[tokio::test]
    async fn test_chat_grounds_prompt_in_retrieved_chunks() {
        let (pipeline, llm, tts) = pipeline("I work mostly in React and Node.").await;

        let reply = pipeline
            .chat("What languages does he know?", Some(1))
            .await
            .unwrap();

        assert_eq!(reply.text, "I work mostly in React and Node.");
        assert_eq!(reply.audio.bytes, b"I work mostly in React and Node.");
        assert_eq!(reply.sources.len(), 1);
        assert_eq!(reply.sources[0].id, "chunk-1");

        let prompts = llm.prompts.lock().unwrap();
        assert!(prompts[0].contains("Context:\nSkilled in React and Node"));
        assert!(prompts[0].contains("Question:\nWhat languages does he know?"));
        assert!(!prompts[0].contains("cricket"));
        assert_eq!(*tts.calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_empty_reply_skips_speech() {
        let (pipeline, _llm, tts) = pipeline("   ").await;

        let reply = pipeline.chat("Tell me about cricket", None).await.unwrap();

        assert!(reply.text.is_empty());
        assert!(reply.audio.is_empty());
        assert_eq!(*tts.calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_top_k_bounds() {
        let (pipeline, _, _) = pipeline("ok").await;

        assert_eq!(pipeline.resolve_top_k(None).unwrap(), 5);
        assert_eq!(pipeline.resolve_top_k(Some(50)).unwrap(), 50);
        assert!(matches!(
            pipeline.resolve_top_k(Some(0)),
            Err(FolioError::Validation(_))
        ));
        assert!(matches!(
            pipeline.resolve_top_k(Some(51)),
            Err(FolioError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_blank_question_rejected() {
        let (pipeline, llm, _) = pipeline("ok").await;

        assert!(matches!(
            pipeline.chat("   ", None).await,
            Err(FolioError::Validation(_))
        ));
        assert!(llm.prompts.lock().unwrap().is_empty());
    }
}
