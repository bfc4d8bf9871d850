//! Per-video JSON export of annotations.

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::Response;
use chrono::{DateTime, Utc};
use elicit_core::error::CoreError;
use elicit_core::types::{DbId, Timestamp};
use elicit_db::models::annotation::Annotation;
use elicit_db::repositories::{AnnotationRepo, VideoRepo};
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ExportDocument {
    pub video_file: String,
    pub video_duration: Option<f64>,
    pub annotation_count: usize,
    pub export_timestamp: Timestamp,
    pub annotations: Vec<ExportedAnnotation>,
}

#[derive(Debug, Serialize)]
pub struct ExportedAnnotation {
    pub id: DbId,
    pub start_time: f64,
    pub end_time: f64,
    pub duration: f64,
    pub transcription: Option<String>,
    pub extended_transcript: Option<String>,
    pub feedback: Option<i16>,
    pub feedback_choices: Option<Vec<i16>>,
    pub audio_file: String,
    pub created_at: Timestamp,
}

impl From<Annotation> for ExportedAnnotation {
    fn from(a: Annotation) -> Self {
        Self {
            id: a.id,
            start_time: a.start_time,
            end_time: a.end_time,
            duration: a.duration(),
            transcription: a.transcription,
            extended_transcript: a.extended_transcript,
            feedback: a.feedback,
            feedback_choices: a.feedback_choices,
            audio_file: a.audio_filename,
            created_at: a.created_at,
        }
    }
}

/// `export_<video file>_<YYYYmmdd_HHMMSS>.json`, restricted to characters
/// that are safe in a path and a header.
fn export_file_name(video_filename: &str, at: DateTime<Utc>) -> String {
    let safe: String = video_filename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("export_{safe}_{}.json", at.format("%Y%m%d_%H%M%S"))
}

/// GET /api/v1/export/{video_id}
///
/// Builds the export document, keeps a copy in the exports directory, and
/// returns it as a JSON attachment.
pub async fn export_video(
    State(state): State<AppState>,
    Path(video_id): Path<DbId>,
) -> AppResult<Response> {
    let video = VideoRepo::find_by_id(&state.pool, video_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Video",
            id: video_id,
        }))?;
    let annotations = AnnotationRepo::list_by_video(&state.pool, video_id).await?;

    let now = Utc::now();
    let document = ExportDocument {
        video_file: video.filename.clone(),
        video_duration: video.duration_seconds,
        annotation_count: annotations.len(),
        export_timestamp: now,
        annotations: annotations.into_iter().map(ExportedAnnotation::from).collect(),
    };
    let body = serde_json::to_vec_pretty(&document)
        .map_err(|e| AppError::InternalError(format!("Failed to serialize export: {e}")))?;

    let exports_dir = state.config.exports_dir();
    tokio::fs::create_dir_all(&exports_dir)
        .await
        .map_err(|e| AppError::InternalError(format!("Failed to create exports dir: {e}")))?;
    let filename = export_file_name(&video.filename, now);
    tokio::fs::write(exports_dir.join(&filename), &body)
        .await
        .map_err(|e| AppError::InternalError(format!("Failed to write export: {e}")))?;
    tracing::info!(video_id, filename = %filename, count = document.annotation_count, "Export created");

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/json")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        )
        .body(body.into())
        .map_err(|e| AppError::InternalError(e.to_string()))
}
