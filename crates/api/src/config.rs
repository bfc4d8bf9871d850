use std::path::{Path, PathBuf};

use elicit_providers::drive::DEFAULT_DRIVE_API_BASE;
use elicit_providers::enrichment::{
    DEFAULT_ENRICHMENT_MODEL, DEFAULT_ENRICHMENT_URL, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE,
};
use elicit_providers::prompt::PromptLanguage;
use elicit_providers::transcription::{DEFAULT_TRANSCRIPTION_MODEL, DEFAULT_TRANSCRIPTION_URL};
use elicit_providers::{EnrichmentConfig, TranscriptionConfig};

const VIDEOS_SUBDIR: &str = "videos";
const AUDIO_SUBDIR: &str = "audio";
const EXPORTS_SUBDIR: &str = "exports";

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `8005`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Root of the `videos/`, `audio/` and `exports/` directories.
    pub data_dir: PathBuf,
    /// Largest accepted video upload, in bytes.
    pub max_upload_bytes: u64,
    pub transcription: TranscriptionConfig,
    pub enrichment: EnrichmentConfig,
    pub drive_api_base: String,
    /// Default key for remote folder access; callers may pass their own.
    pub google_drive_api_key: Option<String>,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                  | Default                                     |
    /// |--------------------------|---------------------------------------------|
    /// | `HOST`                   | `0.0.0.0`                                   |
    /// | `PORT`                   | `8005`                                      |
    /// | `CORS_ORIGINS`           | `http://localhost:8005,http://127.0.0.1:8005` |
    /// | `REQUEST_TIMEOUT_SECS`   | `30`                                        |
    /// | `DATA_DIR`               | `data`                                      |
    /// | `MAX_UPLOAD_MB`          | `5000`                                      |
    /// | `FIREWORKS_API_KEY`      | empty                                       |
    /// | `TRANSCRIPTION_API_URL`  | Fireworks audio transcription endpoint      |
    /// | `TRANSCRIPTION_MODEL`    | `whisper-v3-turbo`                          |
    /// | `TRANSCRIPTION_LANGUAGE` | unset (detected)                            |
    /// | `ENRICHMENT_API_URL`     | Fireworks completions endpoint              |
    /// | `ENRICHMENT_MODEL`       | `accounts/fireworks/models/llama-v3p3-70b-instruct` |
    /// | `ENRICHMENT_MAX_TOKENS`  | `360`                                       |
    /// | `ENRICHMENT_TEMPERATURE` | `0.9`                                       |
    /// | `ENRICHMENT_LANGUAGE`    | `fr`                                        |
    /// | `DRIVE_API_BASE`         | `https://www.googleapis.com/drive/v3`       |
    /// | `GOOGLE_DRIVE_API_KEY`   | unset                                       |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "8005".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:8005,http://127.0.0.1:8005".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let data_dir = PathBuf::from(std::env::var("DATA_DIR").unwrap_or_else(|_| "data".into()));

        let max_upload_mb: u64 = std::env::var("MAX_UPLOAD_MB")
            .unwrap_or_else(|_| "5000".into())
            .parse()
            .expect("MAX_UPLOAD_MB must be a valid u64");

        let api_key = std::env::var("FIREWORKS_API_KEY").unwrap_or_default();

        let transcription = TranscriptionConfig {
            api_url: std::env::var("TRANSCRIPTION_API_URL")
                .unwrap_or_else(|_| DEFAULT_TRANSCRIPTION_URL.into()),
            api_key: api_key.clone(),
            model: std::env::var("TRANSCRIPTION_MODEL")
                .unwrap_or_else(|_| DEFAULT_TRANSCRIPTION_MODEL.into()),
            language: optional_var("TRANSCRIPTION_LANGUAGE"),
            ..TranscriptionConfig::default()
        };

        let enrichment = EnrichmentConfig {
            api_url: std::env::var("ENRICHMENT_API_URL")
                .unwrap_or_else(|_| DEFAULT_ENRICHMENT_URL.into()),
            api_key,
            model: std::env::var("ENRICHMENT_MODEL")
                .unwrap_or_else(|_| DEFAULT_ENRICHMENT_MODEL.into()),
            max_tokens: std::env::var("ENRICHMENT_MAX_TOKENS")
                .map(|v| v.parse().expect("ENRICHMENT_MAX_TOKENS must be a valid u32"))
                .unwrap_or(DEFAULT_MAX_TOKENS),
            temperature: std::env::var("ENRICHMENT_TEMPERATURE")
                .map(|v| v.parse().expect("ENRICHMENT_TEMPERATURE must be a number"))
                .unwrap_or(DEFAULT_TEMPERATURE),
            language: std::env::var("ENRICHMENT_LANGUAGE")
                .map(|v| {
                    v.parse::<PromptLanguage>()
                        .unwrap_or_else(|e| panic!("ENRICHMENT_LANGUAGE: {e}"))
                })
                .unwrap_or_default(),
        };

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            data_dir,
            max_upload_bytes: max_upload_mb * 1024 * 1024,
            transcription,
            enrichment,
            drive_api_base: std::env::var("DRIVE_API_BASE")
                .unwrap_or_else(|_| DEFAULT_DRIVE_API_BASE.into()),
            google_drive_api_key: optional_var("GOOGLE_DRIVE_API_KEY"),
        }
    }

    pub fn videos_dir(&self) -> PathBuf {
        self.data_dir.join(VIDEOS_SUBDIR)
    }

    pub fn audio_dir(&self) -> PathBuf {
        self.data_dir.join(AUDIO_SUBDIR)
    }

    pub fn exports_dir(&self) -> PathBuf {
        self.data_dir.join(EXPORTS_SUBDIR)
    }

    /// Create the data directories if they do not exist yet.
    pub async fn ensure_data_dirs(&self) -> std::io::Result<()> {
        for dir in [self.videos_dir(), self.audio_dir(), self.exports_dir()] {
            tokio::fs::create_dir_all(&dir).await?;
        }
        Ok(())
    }

    /// Whether `path` lies inside the service's video directory.
    pub fn is_in_videos_dir(&self, path: &Path) -> bool {
        path.starts_with(self.videos_dir())
    }
}

fn optional_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
