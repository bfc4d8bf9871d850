//! Extended transcript generation through a text-completion endpoint.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{ensure_success, ProviderError};
use crate::prompt::{build_prompt, PromptLanguage, STOP_SEQUENCES};

pub const DEFAULT_ENRICHMENT_URL: &str = "https://api.fireworks.ai/inference/v1/completions";
pub const DEFAULT_ENRICHMENT_MODEL: &str = "accounts/fireworks/models/llama-v3p3-70b-instruct";
pub const DEFAULT_MAX_TOKENS: u32 = 360;
pub const DEFAULT_TEMPERATURE: f64 = 0.9;

const TOP_P: f64 = 0.9;
const FREQUENCY_PENALTY: f64 = 0.5;
const PRESENCE_PENALTY: f64 = 0.3;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Expands a transcription into a richer narrative.
#[async_trait]
pub trait Enricher: Send + Sync {
    /// Returns [`ProviderError::EmptyResult`] when nothing usable was produced.
    async fn enrich(&self, transcription: &str) -> Result<String, ProviderError>;
}

#[derive(Debug, Clone)]
pub struct EnrichmentConfig {
    pub api_url: String,
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f64,
    pub language: PromptLanguage,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_ENRICHMENT_URL.to_string(),
            api_key: String::new(),
            model: DEFAULT_ENRICHMENT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            language: PromptLanguage::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Option<Vec<CompletionChoice>>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    #[serde(default)]
    text: String,
}

/// Pull the first choice's trimmed text out of a completion response.
fn extract_text(response: CompletionResponse) -> Result<String, ProviderError> {
    let choices = response.choices.unwrap_or_default();
    let first = choices
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::UnexpectedResponse("no choices in completion".into()))?;
    let text = first.text.trim();
    if text.is_empty() {
        return Err(ProviderError::EmptyResult);
    }
    Ok(text.to_string())
}

pub struct FireworksEnricher {
    client: reqwest::Client,
    config: EnrichmentConfig,
}

impl FireworksEnricher {
    pub fn new(config: EnrichmentConfig) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client, config })
    }

    fn request_body(&self, transcription: &str) -> serde_json::Value {
        serde_json::json!({
            "model": self.config.model,
            "prompt": build_prompt(self.config.language, transcription),
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
            "top_p": TOP_P,
            "frequency_penalty": FREQUENCY_PENALTY,
            "presence_penalty": PRESENCE_PENALTY,
            "stop": STOP_SEQUENCES,
        })
    }
}

#[async_trait]
impl Enricher for FireworksEnricher {
    async fn enrich(&self, transcription: &str) -> Result<String, ProviderError> {
        if self.config.api_key.is_empty() {
            return Err(ProviderError::Config("FIREWORKS_API_KEY is not set".into()));
        }
        if transcription.trim().is_empty() {
            return Err(ProviderError::EmptyResult);
        }

        tracing::info!(model = %self.config.model, "Requesting extended transcript");

        let response = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(&self.config.api_key)
            .json(&self.request_body(transcription))
            .send()
            .await?;
        let body: CompletionResponse = ensure_success(response).await?.json().await?;
        extract_text(body)
    }
}
