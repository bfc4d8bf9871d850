#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::ws::Message;
use axum::http::{header, Method, Request, Response};
use axum::Router;
use futures::stream::{self, StreamExt};
use http_body_util::BodyExt;
use sqlx::PgPool;
use tempfile::TempDir;
use tokio::sync::mpsc::UnboundedReceiver;
use tower::ServiceExt;

use elicit_api::config::ServerConfig;
use elicit_api::engine::{AnnotationPipeline, PgTrackStore};
use elicit_api::router::build_app_router;
use elicit_api::state::AppState;
use elicit_api::ws::WsManager;
use elicit_providers::drive::DriveClient;
use elicit_providers::{
    EnrichmentConfig, Enricher, ProviderError, Transcriber, Transcript, TranscriptionConfig,
};

/// Largest upload accepted by the test app.
pub const TEST_MAX_UPLOAD_BYTES: u64 = 64 * 1024;

/// Text returned by the fake transcriber.
pub const FAKE_TRANSCRIPT: &str = "on serre la pièce dans l'étau";

/// Transcriber that answers with [`FAKE_TRANSCRIPT`] when the recording exists.
pub struct FakeTranscriber;

#[async_trait]
impl Transcriber for FakeTranscriber {
    async fn transcribe(&self, audio_path: &Path) -> Result<Transcript, ProviderError> {
        if !audio_path.exists() {
            return Err(ProviderError::MissingFile(audio_path.display().to_string()));
        }
        Ok(Transcript {
            text: FAKE_TRANSCRIPT.to_string(),
            language: "fr".to_string(),
            segments: Vec::new(),
            duration: 3.0,
        })
    }
}

/// Enricher that prefixes the transcription.
pub struct FakeEnricher;

#[async_trait]
impl Enricher for FakeEnricher {
    async fn enrich(&self, transcription: &str) -> Result<String, ProviderError> {
        Ok(format!("Expert: {transcription}"))
    }
}

/// Build a test `ServerConfig` rooted at `data_dir`.
pub fn test_config(data_dir: &Path) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:8005".to_string()],
        request_timeout_secs: 30,
        data_dir: data_dir.to_path_buf(),
        max_upload_bytes: TEST_MAX_UPLOAD_BYTES,
        transcription: TranscriptionConfig::default(),
        enrichment: EnrichmentConfig::default(),
        // Nothing listens here; remote media requests fail fast.
        drive_api_base: "http://127.0.0.1:9".to_string(),
        google_drive_api_key: None,
    }
}

/// A router over a fresh data directory, with fake providers.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    /// Keeps the data directory alive for the test's duration.
    pub data_dir: TempDir,
}

impl TestApp {
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn videos_dir(&self) -> PathBuf {
        self.state.config.videos_dir()
    }

    pub fn audio_dir(&self) -> PathBuf {
        self.state.config.audio_dir()
    }

    pub fn exports_dir(&self) -> PathBuf {
        self.state.config.exports_dir()
    }

    /// Register a WebSocket observer directly with the manager.
    pub async fn observe(&self) -> UnboundedReceiver<Message> {
        self.state
            .ws_manager
            .add(format!("observer-{}", uuid::Uuid::new_v4()))
            .await
    }
}

/// Build the full application router, using the given database pool.
///
/// Uses the same middleware stack as `main.rs` via `build_app_router`.
pub fn build_test_app(pool: PgPool) -> TestApp {
    build_test_app_with(pool, |_| {})
}

/// Like [`build_test_app`], adjusting the config first.
pub fn build_test_app_with(pool: PgPool, configure: impl FnOnce(&mut ServerConfig)) -> TestApp {
    let data_dir = tempfile::tempdir().expect("create data dir");
    let mut config = test_config(data_dir.path());
    configure(&mut config);
    let ws_manager = Arc::new(WsManager::new());

    let pipeline = Arc::new(AnnotationPipeline::new(
        Arc::new(PgTrackStore::new(pool.clone())),
        Arc::new(FakeTranscriber),
        Arc::new(FakeEnricher),
        Arc::clone(&ws_manager),
    ));
    let drive = Arc::new(DriveClient::new(config.drive_api_base.clone(), None));

    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        ws_manager,
        pipeline,
        drive,
    };
    let router = build_app_router(state.clone(), &config);

    TestApp {
        router,
        state,
        data_dir,
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn send(app: Router, request: Request<Body>) -> Response<Body> {
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn get_with_range(app: Router, uri: &str, range: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .header(header::RANGE, range)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

async fn json_request(
    app: Router,
    method: Method,
    uri: &str,
    body: serde_json::Value,
) -> Response<Body> {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    json_request(app, Method::POST, uri, body).await
}

pub async fn put_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    json_request(app, Method::PUT, uri, body).await
}

pub async fn patch_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    json_request(app, Method::PATCH, uri, body).await
}

pub async fn post_empty(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn delete(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::DELETE)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

// ---------------------------------------------------------------------------
// Multipart
// ---------------------------------------------------------------------------

const BOUNDARY: &str = "elicit-test-boundary";

/// One part of a multipart form.
pub enum Part<'a> {
    Text(&'a str, &'a str),
    File {
        name: &'a str,
        filename: &'a str,
        content_type: &'a str,
        data: &'a [u8],
    },
}

fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                        .as_bytes(),
                );
            }
            Part::File {
                name,
                filename,
                content_type,
                data,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; \
                         filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
                body.extend_from_slice(b"\r\n");
            }
        }
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub async fn post_multipart(app: Router, uri: &str, parts: &[Part<'_>]) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap();
    send(app, request).await
}

/// Stream `body` in two halves with `pause` in between, like a slow client.
pub fn slow_body(body: Vec<u8>, pause: Duration) -> Body {
    let tail = body[body.len() / 2..].to_vec();
    let head = body[..body.len() / 2].to_vec();
    let chunks = stream::once(async move { head }).chain(stream::once(async move {
        tokio::time::sleep(pause).await;
        tail
    }));
    Body::from_stream(chunks.map(Ok::<_, std::io::Error>))
}

/// Like [`post_multipart`], sending the form through [`slow_body`].
pub async fn post_multipart_slowly(
    app: Router,
    uri: &str,
    parts: &[Part<'_>],
    pause: Duration,
) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(slow_body(multipart_body(parts), pause))
        .unwrap();
    send(app, request).await
}

/// Deterministic test payload of `len` bytes.
pub fn sample_bytes(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/// Upload `data` as `filename` and return the created video JSON.
pub async fn upload_video(app: &TestApp, filename: &str, data: &[u8]) -> serde_json::Value {
    let response = post_multipart(
        app.router(),
        "/api/v1/videos/upload",
        &[Part::File {
            name: "file",
            filename,
            content_type: "video/mp4",
            data,
        }],
    )
    .await;
    assert_eq!(response.status(), axum::http::StatusCode::CREATED);
    body_json(response).await["data"].clone()
}

/// Send an annotation create request over `[start, end]` with a small recording.
pub async fn create_annotation(
    app: &TestApp,
    video_id: i64,
    start: &str,
    end: &str,
) -> Response<Body> {
    let video_id = video_id.to_string();
    post_multipart(
        app.router(),
        "/api/v1/annotations",
        &[
            Part::Text("video_id", &video_id),
            Part::Text("start_time", start),
            Part::Text("end_time", end),
            Part::File {
                name: "audio",
                filename: "recording.wav",
                content_type: "audio/wav",
                data: b"RIFF....WAVEfmt ",
            },
        ],
    )
    .await
}

/// Poll an annotation until `check` accepts it or five seconds pass.
pub async fn wait_for_annotation(
    app: &TestApp,
    id: i64,
    check: impl Fn(&serde_json::Value) -> bool,
) -> serde_json::Value {
    let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(5);
    loop {
        let json = body_json(get(app.router(), &format!("/api/v1/annotations/{id}")).await).await;
        let annotation = json["data"].clone();
        if check(&annotation) {
            return annotation;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "annotation {id} did not reach the expected state: {annotation}"
        );
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }
}

/// Drain every text event currently queued for an observer.
pub fn drain_events(rx: &mut UnboundedReceiver<Message>) -> Vec<serde_json::Value> {
    let mut events = Vec::new();
    while let Ok(message) = rx.try_recv() {
        if let Message::Text(text) = message {
            events.push(serde_json::from_str(text.as_str()).unwrap());
        }
    }
    events
}
