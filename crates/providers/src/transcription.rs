//! Speech-to-text for annotation recordings.
//!
//! [`FireworksTranscriber`] posts the audio file to a Whisper-compatible
//! `audio/transcriptions` endpoint as multipart form data.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{ensure_success, ProviderError};

pub const DEFAULT_TRANSCRIPTION_URL: &str =
    "https://audio-turbo.us-virginia-1.direct.fireworks.ai/v1/audio/transcriptions";
pub const DEFAULT_TRANSCRIPTION_MODEL: &str = "whisper-v3-turbo";
const DEFAULT_TEMPERATURE: &str = "0";
const DEFAULT_VAD_MODEL: &str = "silero";

/// HTTP timeout for a single transcription request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Recognized speech for one recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    pub text: String,
    pub language: String,
    #[serde(default)]
    pub segments: Vec<serde_json::Value>,
    #[serde(default)]
    pub duration: f64,
}

/// Turns an audio file into text.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio_path: &Path) -> Result<Transcript, ProviderError>;
}

#[derive(Debug, Clone)]
pub struct TranscriptionConfig {
    pub api_url: String,
    pub api_key: String,
    pub model: String,
    pub temperature: String,
    pub vad_model: String,
    /// Forces the recognition language when set; otherwise it is detected.
    pub language: Option<String>,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_TRANSCRIPTION_URL.to_string(),
            api_key: String::new(),
            model: DEFAULT_TRANSCRIPTION_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE.to_string(),
            vad_model: DEFAULT_VAD_MODEL.to_string(),
            language: None,
        }
    }
}

/// Raw response body; every field may be absent.
#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    #[serde(default)]
    text: String,
    language: Option<String>,
    #[serde(default)]
    segments: Vec<serde_json::Value>,
    duration: Option<f64>,
}

impl From<TranscriptionResponse> for Transcript {
    fn from(raw: TranscriptionResponse) -> Self {
        Self {
            text: raw.text.trim().to_string(),
            language: raw.language.unwrap_or_else(|| "unknown".to_string()),
            segments: raw.segments,
            duration: raw.duration.unwrap_or(0.0),
        }
    }
}

pub struct FireworksTranscriber {
    client: reqwest::Client,
    config: TranscriptionConfig,
}

impl FireworksTranscriber {
    pub fn new(config: TranscriptionConfig) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client, config })
    }

    pub fn is_configured(&self) -> bool {
        !self.config.api_key.is_empty()
    }
}

#[async_trait]
impl Transcriber for FireworksTranscriber {
    async fn transcribe(&self, audio_path: &Path) -> Result<Transcript, ProviderError> {
        if !tokio::fs::try_exists(audio_path).await.unwrap_or(false) {
            return Err(ProviderError::MissingFile(audio_path.display().to_string()));
        }
        if !self.is_configured() {
            return Err(ProviderError::Config("FIREWORKS_API_KEY is not set".into()));
        }

        let bytes = tokio::fs::read(audio_path).await?;
        let file_name = audio_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio.wav".to_string());

        let mut form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(bytes).file_name(file_name),
            )
            .text("model", self.config.model.clone())
            .text("temperature", self.config.temperature.clone())
            .text("vad_model", self.config.vad_model.clone());
        if let Some(language) = &self.config.language {
            form = form.text("language", language.clone());
        }

        tracing::info!(path = %audio_path.display(), "Requesting transcription");

        let response = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(&self.config.api_key)
            .multipart(form)
            .send()
            .await?;
        let raw: TranscriptionResponse = ensure_success(response).await?.json().await?;
        let transcript = Transcript::from(raw);

        tracing::info!(
            language = %transcript.language,
            chars = transcript.text.len(),
            "Transcription completed",
        );
        Ok(transcript)
    }
}
