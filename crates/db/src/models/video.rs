//! Video entity model and DTOs.

use elicit_core::types::{DbId, Timestamp};
use elicit_core::video_sources::VideoSource;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A video row from the `videos` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Video {
    pub id: DbId,
    pub project_id: Option<DbId>,
    pub filename: String,
    pub filepath: String,
    pub file_size: Option<i64>,
    pub mime_type: Option<String>,
    pub duration_seconds: Option<f64>,
    pub batch_position: Option<i32>,
    pub source_type: String,
    pub created_at: Timestamp,
}

impl Video {
    /// How the video's bytes arrived. Unknown values are treated as `local`
    /// so the service never deletes a file it cannot account for.
    pub fn source(&self) -> VideoSource {
        VideoSource::parse(&self.source_type).unwrap_or(VideoSource::Local)
    }
}

/// A video with the number of annotations recorded against it.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct VideoWithCount {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub video: Video,
    pub annotation_count: i64,
}

/// DTO for inserting a video row.
#[derive(Debug, Clone)]
pub struct CreateVideo {
    pub project_id: Option<DbId>,
    pub filename: String,
    pub filepath: String,
    pub file_size: Option<i64>,
    pub mime_type: Option<String>,
    pub duration_seconds: Option<f64>,
    pub batch_position: Option<i32>,
    pub source: VideoSource,
}

/// DTO for updating a video. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateVideo {
    pub filename: Option<String>,
    pub project_id: Option<DbId>,
    pub batch_position: Option<i32>,
}

/// Filters for listing videos.
#[derive(Debug, Clone, Default)]
pub struct VideoListFilter {
    pub project_id: Option<DbId>,
    pub limit: i64,
    pub offset: i64,
}
