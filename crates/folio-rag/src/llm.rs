//! LLM Client implementations
//!
//! Provides abstraction for the Gemini, OpenAI and Ollama text-generation
//! APIs. Each call is a single stateless request; the avatar keeps no
//! conversation history server-side.
//!
//! Author: hephaex@gmail.com

use async_trait::async_trait;
use folio_core::{FolioError, LlmClient, LlmConfig, LlmProvider, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

fn http_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| FolioError::Llm(format!("Failed to build HTTP client: {e}")))
}

// ============================================================================
// Gemini Client
// ============================================================================

/// Google Gemini `generateContent` client
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

impl GeminiResponse {
    /// Text of the first candidate, parts concatenated
    fn into_text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
        Some(text)
    }
}

impl GeminiClient {
    /// Create a new Gemini client
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        max_tokens: u32,
        temperature: f32,
        timeout_secs: u64,
    ) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout_secs)?,
            api_key: api_key.into(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: model.into(),
            max_tokens,
            temperature,
        })
    }

    /// Create from config
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let api_key = config
            .gemini_api_key
            .as_ref()
            .ok_or_else(|| FolioError::Config("GEMINI_API_KEY not set".to_string()))?;

        Self::new(
            api_key.clone(),
            config.model_name(),
            config.max_tokens,
            config.temperature,
            config.timeout_secs,
        )
    }

    fn request(&self, prompt: &str) -> GeminiRequest {
        GeminiRequest {
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart {
                    text: Some(prompt.to_string()),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_tokens,
            },
        }
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let response = self
            .client
            .post(format!(
                "{}/models/{}:generateContent",
                self.base_url, self.model
            ))
            .query(&[("key", &self.api_key)])
            .json(&self.request(prompt))
            .send()
            .await
            .map_err(|e| FolioError::Llm(format!("Gemini request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(FolioError::Llm(format!("Gemini error {status}: {error_text}")));
        }

        let result: GeminiResponse = response
            .json()
            .await
            .map_err(|e| FolioError::Llm(format!("Failed to parse Gemini response: {e}")))?;

        result
            .into_text()
            .ok_or_else(|| FolioError::Llm("No response generated".to_string()))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

// ============================================================================
// OpenAI Client
// ============================================================================

/// OpenAI API client
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<Message>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

impl OpenAiClient {
    /// Create a new OpenAI client
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        max_tokens: u32,
        temperature: f32,
        timeout_secs: u64,
    ) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout_secs)?,
            api_key: api_key.into(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: model.into(),
            max_tokens,
            temperature,
        })
    }

    /// Create from config
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let api_key = config
            .openai_api_key
            .as_ref()
            .ok_or_else(|| FolioError::Config("OpenAI API key required".to_string()))?;

        let client = Self::new(
            api_key.clone(),
            config.model_name(),
            config.max_tokens,
            config.temperature,
            config.timeout_secs,
        )?;

        Ok(match &config.openai_base_url {
            Some(url) => client.with_base_url(url.clone()),
            None => client,
        })
    }

    /// Set custom base URL (for Azure or compatible APIs)
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let request = OpenAiRequest {
            model: self.model.clone(),
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| FolioError::Llm(format!("Request failed: {e}")))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(FolioError::Llm(format!("OpenAI error: {error_text}")));
        }

        let result: OpenAiResponse = response
            .json()
            .await
            .map_err(|e| FolioError::Llm(format!("Failed to parse response: {e}")))?;

        result
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| FolioError::Llm("No response generated".to_string()))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

// ============================================================================
// Ollama Client
// ============================================================================

/// Ollama API client
pub struct OllamaClient {
    client: Client,
    base_url: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
}

impl OllamaClient {
    /// Create a new Ollama client
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout_secs)?,
            base_url: base_url.into(),
            model: model.into(),
        })
    }

    /// Create from config
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        Self::new(
            config.ollama_url.clone(),
            config.model_name(),
            config.timeout_secs,
        )
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let request = OllamaRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            stream: false,
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| FolioError::Llm(format!("Ollama request failed: {e}")))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(FolioError::Llm(format!("Ollama error: {error_text}")));
        }

        let result: OllamaResponse = response
            .json()
            .await
            .map_err(|e| FolioError::Llm(format!("Failed to parse Ollama response: {e}")))?;

        Ok(result.response)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

// ============================================================================
// Factory function
// ============================================================================

/// Create an LLM client from config
pub fn create_llm_client(config: &LlmConfig) -> Result<Arc<dyn LlmClient>> {
    let client: Arc<dyn LlmClient> = match config.provider {
        LlmProvider::Gemini => Arc::new(GeminiClient::from_config(config)?),
        LlmProvider::OpenAI => Arc::new(OpenAiClient::from_config(config)?),
        LlmProvider::Ollama => Arc::new(OllamaClient::from_config(config)?),
    };
    tracing::info!("LLM client ready: {}", client.model_name());
    Ok(client)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gemini_request_shape() {
        let client = GeminiClient::new("test-key", "gemini-2.5-flash", 512, 0.7, 5).unwrap();
        let json = serde_json::to_value(client.request("Hi")).unwrap();

        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][0]["parts"][0]["text"], "Hi");
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 512);
    }

    #[test]
    fn test_gemini_response_joins_parts() {
        let response: GeminiResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"role":"model","parts":[
                {"text":"I build IoT tools. "},{"text":"FixMyIoT is my favorite."}
            ]},"finishReason":"STOP"}]}"#,
        )
        .unwrap();

        assert_eq!(
            response.into_text().unwrap(),
            "I build IoT tools. FixMyIoT is my favorite."
        );
    }

    #[test]
    fn test_gemini_response_without_candidates() {
        let response: GeminiResponse =
            serde_json::from_str(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#).unwrap();
        assert!(response.into_text().is_none());
    }

    #[test]
    fn test_factory_requires_key() {
        let config = LlmConfig::default();
        assert!(matches!(
            create_llm_client(&config),
            Err(FolioError::Config(_))
        ));
    }

    #[test]
    fn test_openai_client_creation() {
        let client = OpenAiClient::new("test-key", "gpt-4o-mini", 2048, 0.1, 5)
            .unwrap()
            .with_base_url("http://localhost:8080/v1");
        assert_eq!(client.model, "gpt-4o-mini");
        assert_eq!(client.base_url, "http://localhost:8080/v1");
    }

    #[test]
    fn test_ollama_client_creation() {
        let client = OllamaClient::new("http://localhost:11434", "llama3.2", 5).unwrap();
        assert_eq!(client.model_name(), "llama3.2");
    }
}
