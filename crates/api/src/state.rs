use std::sync::Arc;

use elicit_providers::drive::DriveClient;

use crate::config::ServerConfig;
use crate::engine::AnnotationPipeline;
use crate::ws::WsManager;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: elicit_db::DbPool,
    /// Server configuration (data directories, upload limits).
    pub config: Arc<ServerConfig>,
    /// WebSocket connection manager (live event observers).
    pub ws_manager: Arc<WsManager>,
    /// Transcription and enrichment of new annotations.
    pub pipeline: Arc<AnnotationPipeline>,
    /// Remote folder listing and media proxy.
    pub drive: Arc<DriveClient>,
}
