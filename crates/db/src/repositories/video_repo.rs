//! Repository for the `videos` table.

use elicit_core::types::DbId;
use sqlx::PgPool;

use crate::models::video::{CreateVideo, UpdateVideo, Video, VideoListFilter, VideoWithCount};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, project_id, filename, filepath, file_size, mime_type, \
                       duration_seconds, batch_position, source_type, created_at";

/// Same columns qualified with the `v` alias, for joins.
const V_COLUMNS: &str = "v.id, v.project_id, v.filename, v.filepath, v.file_size, v.mime_type, \
                         v.duration_seconds, v.batch_position, v.source_type, v.created_at";

/// A deleted video together with the audio files of its cascaded annotations.
#[derive(Debug)]
pub struct DeletedVideo {
    pub video: Video,
    pub audio_filepaths: Vec<String>,
}

/// Provides CRUD operations for videos.
pub struct VideoRepo;

impl VideoRepo {
    /// Insert a new video, returning the created row.
    ///
    /// A duplicate `filepath` violates `uq_videos_filepath`.
    pub async fn create(pool: &PgPool, input: &CreateVideo) -> Result<Video, sqlx::Error> {
        let query = format!(
            "INSERT INTO videos
                (project_id, filename, filepath, file_size, mime_type,
                 duration_seconds, batch_position, source_type)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Video>(&query)
            .bind(input.project_id)
            .bind(&input.filename)
            .bind(&input.filepath)
            .bind(input.file_size)
            .bind(&input.mime_type)
            .bind(input.duration_seconds)
            .bind(input.batch_position)
            .bind(input.source.as_str())
            .fetch_one(pool)
            .await
    }

    /// Find a video by its internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Video>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM videos WHERE id = $1");
        sqlx::query_as::<_, Video>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a video by its storage path.
    pub async fn find_by_filepath(
        pool: &PgPool,
        filepath: &str,
    ) -> Result<Option<Video>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM videos WHERE filepath = $1");
        sqlx::query_as::<_, Video>(&query)
            .bind(filepath)
            .fetch_optional(pool)
            .await
    }

    /// List videos newest first with their annotation counts.
    pub async fn list(
        pool: &PgPool,
        filter: &VideoListFilter,
    ) -> Result<Vec<VideoWithCount>, sqlx::Error> {
        let query = format!(
            "SELECT {V_COLUMNS}, COUNT(a.id) AS annotation_count
             FROM videos v
             LEFT JOIN annotations a ON a.video_id = v.id
             WHERE ($1::BIGINT IS NULL OR v.project_id = $1)
             GROUP BY v.id
             ORDER BY v.created_at DESC, v.id DESC
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, VideoWithCount>(&query)
            .bind(filter.project_id)
            .bind(filter.limit)
            .bind(filter.offset)
            .fetch_all(pool)
            .await
    }

    /// List a project's videos in batch order. Unpositioned videos come last.
    pub async fn list_by_project(
        pool: &PgPool,
        project_id: DbId,
    ) -> Result<Vec<VideoWithCount>, sqlx::Error> {
        let query = format!(
            "SELECT {V_COLUMNS}, COUNT(a.id) AS annotation_count
             FROM videos v
             LEFT JOIN annotations a ON a.video_id = v.id
             WHERE v.project_id = $1
             GROUP BY v.id
             ORDER BY v.batch_position ASC NULLS LAST, v.id ASC"
        );
        sqlx::query_as::<_, VideoWithCount>(&query)
            .bind(project_id)
            .fetch_all(pool)
            .await
    }

    /// Update a video. Only non-`None` fields in `input` are applied.
    ///
    /// Returns `None` if no row with the given `id` exists.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateVideo,
    ) -> Result<Option<Video>, sqlx::Error> {
        let query = format!(
            "UPDATE videos SET
                filename = COALESCE($2, filename),
                project_id = COALESCE($3, project_id),
                batch_position = COALESCE($4, batch_position)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Video>(&query)
            .bind(id)
            .bind(&input.filename)
            .bind(input.project_id)
            .bind(input.batch_position)
            .fetch_optional(pool)
            .await
    }

    /// Delete a video and, through the cascade, its annotations.
    ///
    /// Returns the removed row and the audio paths of the removed annotations,
    /// or `None` if no row with the given `id` exists.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<Option<DeletedVideo>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let audio_filepaths: Vec<String> =
            sqlx::query_scalar("SELECT audio_filepath FROM annotations WHERE video_id = $1")
                .bind(id)
                .fetch_all(&mut *tx)
                .await?;

        let query = format!("DELETE FROM videos WHERE id = $1 RETURNING {COLUMNS}");
        let video = sqlx::query_as::<_, Video>(&query)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(video.map(|video| DeletedVideo {
            video,
            audio_filepaths,
        }))
    }
}
