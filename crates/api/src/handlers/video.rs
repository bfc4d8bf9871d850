//! Handlers for the `/videos` resource.
//!
//! Videos arrive three ways (see [`VideoSource`]): uploaded into the data
//! directory, registered in place from a local directory, or registered as
//! a remote file. Only uploaded files are ever deleted from disk.

use std::path::Path as FsPath;

use axum::extract::{Multipart, Path, Query, State};
use axum::http::header::HeaderMap;
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use elicit_core::error::CoreError;
use elicit_core::live_events::LiveEvent;
use elicit_core::types::DbId;
use elicit_core::video_formats::{
    content_type_for_extension, is_supported_video, supported_extensions_display,
};
use elicit_core::video_sources::{remote_file_id, VideoSource};
use elicit_db::models::video::{CreateVideo, UpdateVideo, Video, VideoListFilter, VideoWithCount};
use elicit_db::repositories::VideoRepo;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::handlers::files::{
    client_file_name, parse_optional_field, remove_file_quietly, save_field, PartialFile,
};
use crate::media;
use crate::query::VideoListParams;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct BrowseParams {
    pub directory: String,
}

/// A supported video file found while browsing a local directory.
#[derive(Debug, Serialize)]
pub struct LocalVideoEntry {
    pub filename: String,
    pub filepath: String,
    pub file_size: u64,
    /// Whether a video row already points at this path.
    pub registered: bool,
}

#[derive(Debug, Deserialize)]
pub struct RegisterLocalVideo {
    pub filepath: String,
    pub project_id: Option<DbId>,
    pub batch_position: Option<i32>,
}

/// A file received by the upload handler, already on disk.
struct StoredUpload {
    filename: String,
    file: PartialFile,
    size: u64,
    mime_type: Option<String>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn video_not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "Video",
        id,
    })
}

fn ensure_supported(name: &str) -> AppResult<()> {
    if is_supported_video(name) {
        Ok(())
    } else {
        Err(AppError::BadRequest(format!(
            "Unsupported video format. Supported: {}",
            supported_extensions_display()
        )))
    }
}

/// Announce a new video and answer 201.
async fn created(
    state: &AppState,
    video: Video,
) -> (StatusCode, Json<DataResponse<Video>>) {
    state
        .ws_manager
        .broadcast_event(&LiveEvent::VideoCreated {
            video_id: video.id,
            source_type: video.source_type.clone(),
        })
        .await;
    (StatusCode::CREATED, Json(DataResponse { data: video }))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/videos
///
/// Newest first, optionally restricted to `?project_id=`.
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<VideoListParams>,
) -> AppResult<Json<DataResponse<Vec<VideoWithCount>>>> {
    let page = params.page();
    let filter = VideoListFilter {
        project_id: params.project_id,
        limit: page.limit(),
        offset: page.offset(),
    };
    let videos = VideoRepo::list(&state.pool, &filter).await?;
    Ok(Json(DataResponse { data: videos }))
}

/// POST /api/v1/videos/upload
///
/// Multipart fields: `file` (required), `project_id`, `batch_position`.
/// The file is streamed to disk as `<uuid>_<name>` under the videos
/// directory.
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<DataResponse<Video>>)> {
    let videos_dir = state.config.videos_dir();
    tokio::fs::create_dir_all(&videos_dir)
        .await
        .map_err(|e| AppError::InternalError(format!("Failed to create videos dir: {e}")))?;

    let mut stored: Option<StoredUpload> = None;
    let mut project_id: Option<DbId> = None;
    let mut batch_position: Option<i32> = None;

    let received: AppResult<()> = async {
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?
        {
            let name = field.name().unwrap_or("").to_string();
            match name.as_str() {
                "file" => {
                    if stored.is_some() {
                        return Err(AppError::BadRequest("Only one file may be uploaded".into()));
                    }
                    let filename = field
                        .file_name()
                        .and_then(client_file_name)
                        .ok_or_else(|| AppError::BadRequest("Uploaded file has no name".into()))?;
                    ensure_supported(&filename)?;

                    let mime_type = field.content_type().map(str::to_string);
                    let path = videos_dir.join(format!(
                        "{}_{filename}",
                        uuid::Uuid::new_v4().simple()
                    ));
                    tracing::info!(filename = %filename, "Receiving video upload");
                    let (file, size) =
                        save_field(field, path, Some(state.config.max_upload_bytes)).await?;
                    stored = Some(StoredUpload {
                        filename,
                        file,
                        size,
                        mime_type,
                    });
                }
                "project_id" => project_id = parse_optional_field(field, "project_id").await?,
                "batch_position" => {
                    batch_position = parse_optional_field(field, "batch_position").await?
                }
                _ => {}
            }
        }
        Ok(())
    }
    .await;

    received?;
    let upload =
        stored.ok_or_else(|| AppError::BadRequest("Missing required 'file' field".into()))?;

    let input = CreateVideo {
        project_id,
        filename: upload.filename.clone(),
        filepath: upload.file.path().to_string_lossy().into_owned(),
        file_size: Some(upload.size as i64),
        mime_type: upload
            .mime_type
            .or_else(|| Some(content_type_for_extension(&upload.filename).to_string())),
        duration_seconds: None,
        batch_position,
        source: VideoSource::Uploaded,
    };
    let video = VideoRepo::create(&state.pool, &input).await?;
    upload.file.keep();
    tracing::info!(video_id = video.id, size = upload.size, "Video uploaded");

    Ok(created(&state, video).await)
}

/// GET /api/v1/videos/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Video>>> {
    let video = VideoRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| video_not_found(id))?;
    Ok(Json(DataResponse { data: video }))
}

/// PATCH /api/v1/videos/{id}
///
/// Rename, move to a project, or reorder. Only the supplied fields change.
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateVideo>,
) -> AppResult<Json<DataResponse<Video>>> {
    if input.filename.as_deref().is_some_and(|f| f.trim().is_empty()) {
        return Err(AppError::Core(CoreError::Validation(
            "filename must not be empty".into(),
        )));
    }
    let video = VideoRepo::update(&state.pool, id, &input)
        .await?
        .ok_or_else(|| video_not_found(id))?;
    Ok(Json(DataResponse { data: video }))
}

/// DELETE /api/v1/videos/{id}
///
/// Deletes the video with its annotations and their recordings. The video
/// file itself is removed only for uploads stored in the videos directory.
pub async fn delete(State(state): State<AppState>, Path(id): Path<DbId>) -> AppResult<StatusCode> {
    let deleted = VideoRepo::delete(&state.pool, id)
        .await?
        .ok_or_else(|| video_not_found(id))?;

    for audio in &deleted.audio_filepaths {
        remove_file_quietly(FsPath::new(audio)).await;
    }

    let video_path = FsPath::new(&deleted.video.filepath);
    if deleted.video.source().owns_file() && state.config.is_in_videos_dir(video_path) {
        remove_file_quietly(video_path).await;
    }
    tracing::info!(
        video_id = id,
        annotations = deleted.audio_filepaths.len(),
        source = %deleted.video.source_type,
        "Video deleted",
    );

    state
        .ws_manager
        .broadcast_event(&LiveEvent::VideoDeleted { video_id: id })
        .await;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/videos/{id}/file
///
/// Streams the video bytes, honouring a single `Range: bytes=START-END`.
pub async fn serve_file(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    headers: HeaderMap,
) -> AppResult<Response> {
    let video = VideoRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| video_not_found(id))?;
    let content_type = video
        .mime_type
        .clone()
        .unwrap_or_else(|| content_type_for_extension(&video.filename).to_string());

    match video.source() {
        VideoSource::Remote => {
            let file_id = remote_file_id(&video.filepath).ok_or_else(|| {
                AppError::InternalError(format!("Video {id} has no remote file id"))
            })?;
            // Without a recorded size the range cannot be validated; serve it all.
            let total = video.file_size.filter(|s| *s > 0).map(|s| s as u64);
            let range = match total {
                Some(total) => media::requested_range(&headers, total)?,
                None => None,
            };
            let upstream = state.drive.open_media(file_id).await?;
            media::remote_media_response(upstream, range, total.unwrap_or(0), &content_type)
        }
        VideoSource::Uploaded | VideoSource::Local => {
            let path = FsPath::new(&video.filepath);
            if !tokio::fs::try_exists(path).await.unwrap_or(false) {
                return Err(AppError::Core(CoreError::NotFound {
                    entity: "VideoFile",
                    id,
                }));
            }
            media::local_file_response(path, &headers, &content_type).await
        }
    }
}

/// GET /api/v1/videos/local/browse?directory=
///
/// Lists the supported video files directly inside `directory`, by name.
pub async fn browse_local(
    State(state): State<AppState>,
    Query(params): Query<BrowseParams>,
) -> AppResult<Json<DataResponse<Vec<LocalVideoEntry>>>> {
    let directory = tokio::fs::canonicalize(&params.directory)
        .await
        .map_err(|_| AppError::BadRequest(format!("Directory not found: {}", params.directory)))?;
    let is_dir = tokio::fs::metadata(&directory)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false);
    if !is_dir {
        return Err(AppError::BadRequest(format!(
            "Not a directory: {}",
            params.directory
        )));
    }

    let mut read_dir = tokio::fs::read_dir(&directory)
        .await
        .map_err(|e| AppError::BadRequest(format!("Cannot read {}: {e}", params.directory)))?;

    let mut entries = Vec::new();
    while let Some(entry) = read_dir
        .next_entry()
        .await
        .map_err(|e| AppError::InternalError(e.to_string()))?
    {
        let Ok(filename) = entry.file_name().into_string() else {
            continue;
        };
        if !is_supported_video(&filename) {
            continue;
        }
        let Ok(metadata) = entry.metadata().await else {
            continue;
        };
        if !metadata.is_file() {
            continue;
        }
        let filepath = entry.path().to_string_lossy().into_owned();
        let registered = VideoRepo::find_by_filepath(&state.pool, &filepath)
            .await?
            .is_some();
        entries.push(LocalVideoEntry {
            filename,
            filepath,
            file_size: metadata.len(),
            registered,
        });
    }
    entries.sort_by(|a, b| a.filename.cmp(&b.filename));

    tracing::debug!(directory = %directory.display(), count = entries.len(), "Browsed local directory");
    Ok(Json(DataResponse { data: entries }))
}

/// POST /api/v1/videos/local/register
///
/// Records a local file in place, without copying it.
pub async fn register_local(
    State(state): State<AppState>,
    Json(input): Json<RegisterLocalVideo>,
) -> AppResult<(StatusCode, Json<DataResponse<Video>>)> {
    let path = tokio::fs::canonicalize(&input.filepath)
        .await
        .map_err(|_| AppError::BadRequest(format!("File not found: {}", input.filepath)))?;
    let metadata = tokio::fs::metadata(&path)
        .await
        .map_err(|e| AppError::InternalError(e.to_string()))?;
    if !metadata.is_file() {
        return Err(AppError::BadRequest(format!("Not a file: {}", input.filepath)));
    }

    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| AppError::BadRequest(format!("Invalid file name: {}", input.filepath)))?;
    ensure_supported(&filename)?;

    let filepath = path.to_string_lossy().into_owned();
    if VideoRepo::find_by_filepath(&state.pool, &filepath).await?.is_some() {
        return Err(AppError::Core(CoreError::Conflict(format!(
            "Video already registered: {filepath}"
        ))));
    }

    let video = VideoRepo::create(
        &state.pool,
        &CreateVideo {
            project_id: input.project_id,
            mime_type: Some(content_type_for_extension(&filename).to_string()),
            filename,
            filepath,
            file_size: Some(metadata.len() as i64),
            duration_seconds: None,
            batch_position: input.batch_position,
            source: VideoSource::Local,
        },
    )
    .await?;
    tracing::info!(video_id = video.id, filepath = %video.filepath, "Local video registered");

    Ok(created(&state, video).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_extensions_are_rejected() {
        assert!(ensure_supported("clip.mp4").is_ok());
        assert!(ensure_supported("CLIP.MOV").is_ok());
        let err = ensure_supported("clip.mkv").unwrap_err();
        assert!(err.to_string().contains(".mp4, .webm, .ogg, .avi, .mov"));
    }
}
