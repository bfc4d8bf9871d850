//! Handlers for remote storage folders.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use elicit_core::error::CoreError;
use elicit_core::live_events::LiveEvent;
use elicit_core::types::DbId;
use elicit_core::video_formats::content_type_for_extension;
use elicit_core::video_sources::{remote_path, VideoSource};
use elicit_db::models::video::{CreateVideo, Video};
use elicit_db::repositories::VideoRepo;
use elicit_providers::drive::RemoteVideo;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct FolderParams {
    /// Overrides the configured key for this request.
    pub api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRemoteVideo {
    pub file_id: String,
    pub name: String,
    pub size: Option<i64>,
    pub mime_type: Option<String>,
    pub duration_seconds: Option<f64>,
    pub project_id: Option<DbId>,
    pub batch_position: Option<i32>,
}

/// GET /api/v1/remote/folders/{folder_id}/videos
pub async fn list_folder(
    State(state): State<AppState>,
    Path(folder_id): Path<String>,
    Query(params): Query<FolderParams>,
) -> AppResult<Json<DataResponse<Vec<RemoteVideo>>>> {
    let videos = state
        .drive
        .list_videos(&folder_id, params.api_key.as_deref())
        .await?;
    Ok(Json(DataResponse { data: videos }))
}

/// POST /api/v1/remote/register
///
/// Records a remote file as a video. Its bytes stay remote and are proxied
/// on playback.
pub async fn register(
    State(state): State<AppState>,
    Json(input): Json<RegisterRemoteVideo>,
) -> AppResult<(StatusCode, Json<DataResponse<Video>>)> {
    let file_id = input.file_id.trim();
    if file_id.is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "file_id must not be empty".into(),
        )));
    }
    let name = input.name.trim();
    if name.is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "name must not be empty".into(),
        )));
    }
    if input.size.is_some_and(|s| s < 0) {
        return Err(AppError::Core(CoreError::Validation(
            "size must not be negative".into(),
        )));
    }

    let filepath = remote_path(file_id);
    if VideoRepo::find_by_filepath(&state.pool, &filepath).await?.is_some() {
        return Err(AppError::Core(CoreError::Conflict(format!(
            "Remote file {file_id} is already registered"
        ))));
    }

    let video = VideoRepo::create(
        &state.pool,
        &CreateVideo {
            project_id: input.project_id,
            filename: name.to_string(),
            filepath,
            file_size: input.size,
            mime_type: input
                .mime_type
                .or_else(|| Some(content_type_for_extension(name).to_string())),
            duration_seconds: input.duration_seconds,
            batch_position: input.batch_position,
            source: VideoSource::Remote,
        },
    )
    .await?;
    tracing::info!(video_id = video.id, file_id, "Remote video registered");

    state
        .ws_manager
        .broadcast_event(&LiveEvent::VideoCreated {
            video_id: video.id,
            source_type: video.source_type.clone(),
        })
        .await;
    Ok((StatusCode::CREATED, Json(DataResponse { data: video })))
}
