//! Speech synthesis backends
//!
//! Turns the avatar's reply text into audio. Google Cloud Text-to-Speech
//! is the default; OpenAI speech and an external helper command are
//! alternatives selected by configuration.
//!
//! Author: hephaex@gmail.com

use async_trait::async_trait;
use base64::Engine;
use folio_core::{FolioError, Result, SpeechSynthesizer, SynthesizedAudio, TtsConfig, TtsProvider};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

fn http_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| FolioError::Speech(format!("Failed to build HTTP client: {e}")))
}

/// MIME type for an audio file, from its extension
pub fn mime_for_path(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("mp3") => "audio/mpeg",
        Some("ogg") | Some("opus") => "audio/ogg",
        Some("flac") => "audio/flac",
        _ => "audio/wav",
    }
}

// ============================================================================
// Google Cloud Text-to-Speech
// ============================================================================

/// Google Cloud Text-to-Speech REST client
pub struct GoogleTts {
    client: Client,
    api_key: String,
    base_url: String,
    language_code: String,
    voice: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GoogleSynthesizeRequest<'a> {
    input: GoogleInput<'a>,
    voice: GoogleVoice<'a>,
    audio_config: GoogleAudioConfig,
}

#[derive(Debug, Serialize)]
struct GoogleInput<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GoogleVoice<'a> {
    language_code: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GoogleAudioConfig {
    audio_encoding: &'static str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleSynthesizeResponse {
    audio_content: String,
}

impl GoogleTts {
    pub fn new(
        api_key: impl Into<String>,
        language_code: impl Into<String>,
        voice: Option<String>,
        timeout_secs: u64,
    ) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout_secs)?,
            api_key: api_key.into(),
            base_url: "https://texttospeech.googleapis.com/v1".to_string(),
            language_code: language_code.into(),
            voice,
        })
    }

    /// Create from config
    pub fn from_config(config: &TtsConfig) -> Result<Self> {
        let api_key = config
            .google_api_key
            .as_ref()
            .ok_or_else(|| FolioError::Config("GOOGLE_TTS_API_KEY not set".to_string()))?;

        Self::new(
            api_key.clone(),
            config.language_code.clone(),
            config.voice.clone(),
            config.timeout_secs,
        )
    }

    fn request<'a>(&'a self, text: &'a str) -> GoogleSynthesizeRequest<'a> {
        GoogleSynthesizeRequest {
            input: GoogleInput { text },
            voice: GoogleVoice {
                language_code: &self.language_code,
                name: self.voice.as_deref(),
            },
            audio_config: GoogleAudioConfig {
                audio_encoding: "MP3",
            },
        }
    }
}

fn decode_audio_content(content: &str) -> Result<Vec<u8>> {
    base64::engine::general_purpose::STANDARD
        .decode(content)
        .map_err(|e| FolioError::Speech(format!("Invalid audio content: {e}")))
}

#[async_trait]
impl SpeechSynthesizer for GoogleTts {
    async fn synthesize(&self, text: &str) -> Result<SynthesizedAudio> {
        let response = self
            .client
            .post(format!("{}/text:synthesize", self.base_url))
            .query(&[("key", &self.api_key)])
            .json(&self.request(text))
            .send()
            .await
            .map_err(|e| FolioError::Speech(format!("TTS request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(FolioError::Speech(format!(
                "Google TTS error {status}: {error_text}"
            )));
        }

        let result: GoogleSynthesizeResponse = response
            .json()
            .await
            .map_err(|e| FolioError::Speech(format!("Failed to parse TTS response: {e}")))?;

        let bytes = decode_audio_content(&result.audio_content)?;
        Ok(SynthesizedAudio::new(bytes, "audio/mpeg"))
    }

    fn name(&self) -> &str {
        "google"
    }
}

// ============================================================================
// OpenAI Speech
// ============================================================================

/// OpenAI `/audio/speech` client
pub struct OpenAiTts {
    client: Client,
    api_key: String,
    base_url: String,
    voice: String,
}

#[derive(Debug, Serialize)]
struct OpenAiSpeechRequest<'a> {
    model: &'static str,
    input: &'a str,
    voice: &'a str,
    response_format: &'static str,
}

impl OpenAiTts {
    pub fn new(
        api_key: impl Into<String>,
        voice: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout_secs)?,
            api_key: api_key.into(),
            base_url: "https://api.openai.com/v1".to_string(),
            voice: voice.into(),
        })
    }

    /// Create from config
    pub fn from_config(config: &TtsConfig) -> Result<Self> {
        let api_key = config
            .openai_api_key
            .as_ref()
            .ok_or_else(|| FolioError::Config("OpenAI API key required".to_string()))?;

        Self::new(
            api_key.clone(),
            config.voice.clone().unwrap_or_else(|| "alloy".to_string()),
            config.timeout_secs,
        )
    }
}

#[async_trait]
impl SpeechSynthesizer for OpenAiTts {
    async fn synthesize(&self, text: &str) -> Result<SynthesizedAudio> {
        let request = OpenAiSpeechRequest {
            model: "tts-1",
            input: text,
            voice: &self.voice,
            response_format: "mp3",
        };

        let response = self
            .client
            .post(format!("{}/audio/speech", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| FolioError::Speech(format!("Speech request failed: {e}")))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(FolioError::Speech(format!("OpenAI speech error: {error_text}")));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FolioError::Speech(format!("Failed to read audio: {e}")))?;

        Ok(SynthesizedAudio::new(bytes.to_vec(), "audio/mpeg"))
    }

    fn name(&self) -> &str {
        "openai"
    }
}

// ============================================================================
// Helper Command
// ============================================================================

/// Runs an external program as `<program> [args..] <text> <out-file>`.
///
/// The helper prints the path of the audio file it wrote on stdout; when it
/// prints nothing the out-file is used. Both the out-file and the printed
/// file are removed once the call returns, whether or not it succeeded.
pub struct CommandTts {
    program: String,
    args: Vec<String>,
    output_dir: PathBuf,
    timeout: Duration,
}

impl CommandTts {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout_secs: u64) -> Self {
        Self {
            program: program.into(),
            args,
            output_dir: std::env::temp_dir(),
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    /// Create from config
    pub fn from_config(config: &TtsConfig) -> Result<Self> {
        let program = config
            .command
            .as_ref()
            .ok_or_else(|| FolioError::Config("TTS_COMMAND not set".to_string()))?;

        Ok(Self::new(
            program.clone(),
            config.command_args.clone(),
            config.timeout_secs,
        ))
    }

    /// Write helper output under `dir` instead of the system temp dir
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }
}

#[async_trait]
impl SpeechSynthesizer for CommandTts {
    async fn synthesize(&self, text: &str) -> Result<SynthesizedAudio> {
        let out_file = self
            .output_dir
            .join(format!("folio-tts-{}.wav", uuid::Uuid::new_v4()));
        let _out_guard = tempfile::TempPath::from_path(&out_file);

        let run = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .arg(text)
            .arg(&out_file)
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, run)
            .await
            .map_err(|_| FolioError::Speech(format!("{} timed out", self.program)))?
            .map_err(|e| FolioError::Speech(format!("Failed to run {}: {e}", self.program)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(FolioError::Speech(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let audio_path = match stdout.lines().last().map(str::trim) {
            Some(line) if !line.is_empty() => PathBuf::from(line),
            _ => out_file.clone(),
        };

        let bytes = tokio::fs::read(&audio_path).await.map_err(|e| {
            FolioError::Speech(format!(
                "Audio file not generated at {}: {e}",
                audio_path.display()
            ))
        })?;

        if audio_path != out_file {
            if let Err(e) = tokio::fs::remove_file(&audio_path).await {
                tracing::warn!("Could not remove {}: {}", audio_path.display(), e);
            }
        }

        Ok(SynthesizedAudio::new(bytes, mime_for_path(&audio_path)))
    }

    fn name(&self) -> &str {
        "command"
    }
}

// ============================================================================
// Factory function
// ============================================================================

/// Create the configured speech synthesizer
pub fn create_synthesizer(config: &TtsConfig) -> Result<Arc<dyn SpeechSynthesizer>> {
    let tts: Arc<dyn SpeechSynthesizer> = match config.provider {
        TtsProvider::Google => Arc::new(GoogleTts::from_config(config)?),
        TtsProvider::OpenAI => Arc::new(OpenAiTts::from_config(config)?),
        TtsProvider::Command => Arc::new(CommandTts::from_config(config)?),
    };
    tracing::info!("Speech synthesizer ready: {}", tts.name());
    Ok(tts)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_google_request_shape() {
        let tts = GoogleTts::new("key", "en-US", Some("en-US-Neural2-D".to_string()), 5).unwrap();
        let json = serde_json::to_value(tts.request("Hello there")).unwrap();

        assert_eq!(json["input"]["text"], "Hello there");
        assert_eq!(json["voice"]["languageCode"], "en-US");
        assert_eq!(json["voice"]["name"], "en-US-Neural2-D");
        assert_eq!(json["audioConfig"]["audioEncoding"], "MP3");
    }

    #[test]
    fn test_decode_audio_content() {
        let encoded = base64::engine::general_purpose::STANDARD.encode([1u8, 2, 3, 255]);
        assert_eq!(decode_audio_content(&encoded).unwrap(), vec![1, 2, 3, 255]);
        assert!(matches!(
            decode_audio_content("not base64!!"),
            Err(FolioError::Speech(_))
        ));
    }

    #[test]
    fn test_mime_for_path() {
        assert_eq!(mime_for_path(Path::new("/tmp/out.wav")), "audio/wav");
        assert_eq!(mime_for_path(Path::new("/tmp/out.MP3")), "audio/mpeg");
        assert_eq!(mime_for_path(Path::new("/tmp/out")), "audio/wav");
    }

    #[test]
    fn test_factory_requires_command() {
        let config = TtsConfig {
            provider: TtsProvider::Command,
            ..Default::default()
        };
        assert!(matches!(
            create_synthesizer(&config),
            Err(FolioError::Config(_))
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_reads_printed_path() {
        let dir = tempfile::tempdir().unwrap();
        let script = r#"printf 'RIFF' > "$2"; echo "$2""#;
        let tts = CommandTts::new(
            "sh",
            vec!["-c".to_string(), script.to_string(), "tts".to_string()],
            10,
        )
        .with_output_dir(dir.path());

        let audio = tts.synthesize("Hi, I'm the avatar").await.unwrap();

        assert_eq!(audio.bytes, b"RIFF");
        assert_eq!(audio.mime_type, "audio/wav");
        // Helper output is cleaned up
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_failure_is_speech_error() {
        let dir = tempfile::tempdir().unwrap();
        let script = r#"printf 'RIFF' > "$2"; exit 3"#;
        let tts = CommandTts::new(
            "sh",
            vec!["-c".to_string(), script.to_string(), "tts".to_string()],
            10,
        )
        .with_output_dir(dir.path());

        assert!(matches!(
            tts.synthesize("text").await,
            Err(FolioError::Speech(_))
        ));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_out_file_removed_when_other_path_printed() {
        let dir = tempfile::tempdir().unwrap();
        let script = r#"printf 'x' > "$2"; other="$(dirname "$2")/reply.mp3"; printf 'ID3' > "$other"; echo "$other""#;
        let tts = CommandTts::new(
            "sh",
            vec!["-c".to_string(), script.to_string(), "tts".to_string()],
            10,
        )
        .with_output_dir(dir.path());

        let audio = tts.synthesize("text").await.unwrap();

        assert_eq!(audio.bytes, b"ID3");
        assert_eq!(audio.mime_type, "audio/mpeg");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_timeout_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let script = r#"printf 'RIFF' > "$2"; sleep 5"#;
        let tts = CommandTts::new(
            "sh",
            vec!["-c".to_string(), script.to_string(), "tts".to_string()],
            1,
        )
        .with_output_dir(dir.path());

        assert!(matches!(
            tts.synthesize("text").await,
            Err(FolioError::Speech(_))
        ));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
