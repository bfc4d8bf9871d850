//! Repository for the `annotations` table.
//!
//! Track transitions are conditional updates: each one names the status it
//! expects to find, so a transition the state machine forbids touches no row.

use elicit_core::pipeline::{Track, TrackStatus};
use elicit_core::types::DbId;
use sqlx::PgPool;

use crate::models::annotation::{Annotation, CreateAnnotation, UpdateAnnotation};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, video_id, start_time, end_time, audio_filename, audio_filepath, \
                       transcription, transcription_status, extended_transcript, \
                       extended_transcript_status, feedback, feedback_choices, \
                       created_at, updated_at";

/// `(text column, status column)` holding a track's output and status.
fn track_columns(track: Track) -> (&'static str, &'static str) {
    match track {
        Track::Transcription => ("transcription", "transcription_status"),
        Track::Enrichment => ("extended_transcript", "extended_transcript_status"),
    }
}

/// Provides CRUD and track-transition operations for annotations.
pub struct AnnotationRepo;

impl AnnotationRepo {
    /// Insert a new annotation with both tracks `pending`.
    pub async fn create(
        pool: &PgPool,
        input: &CreateAnnotation,
    ) -> Result<Annotation, sqlx::Error> {
        let query = format!(
            "INSERT INTO annotations
                (video_id, start_time, end_time, audio_filename, audio_filepath)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Annotation>(&query)
            .bind(input.video_id)
            .bind(input.start_time)
            .bind(input.end_time)
            .bind(&input.audio_filename)
            .bind(&input.audio_filepath)
            .fetch_one(pool)
            .await
    }

    /// Find an annotation by its internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Annotation>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM annotations WHERE id = $1");
        sqlx::query_as::<_, Annotation>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List a video's annotations in timeline order.
    pub async fn list_by_video(
        pool: &PgPool,
        video_id: DbId,
    ) -> Result<Vec<Annotation>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM annotations
             WHERE video_id = $1
             ORDER BY start_time ASC, id ASC"
        );
        sqlx::query_as::<_, Annotation>(&query)
            .bind(video_id)
            .fetch_all(pool)
            .await
    }

    /// Update an annotation. Only non-`None` fields in `input` are applied.
    ///
    /// The row is only written while its statuses still equal `expected`
    /// (transcription, enrichment), the pair the caller validated `input`
    /// against. Returns `None` if no such row exists.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateAnnotation,
        expected: (TrackStatus, TrackStatus),
    ) -> Result<Option<Annotation>, sqlx::Error> {
        let query = format!(
            "UPDATE annotations SET
                start_time = COALESCE($2, start_time),
                end_time = COALESCE($3, end_time),
                transcription = COALESCE($4, transcription),
                transcription_status = COALESCE($5, transcription_status),
                extended_transcript = COALESCE($6, extended_transcript),
                extended_transcript_status = COALESCE($7, extended_transcript_status),
                feedback = COALESCE($8, feedback),
                feedback_choices = COALESCE($9, feedback_choices)
             WHERE id = $1
               AND transcription_status = $10
               AND extended_transcript_status = $11
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Annotation>(&query)
            .bind(id)
            .bind(input.start_time)
            .bind(input.end_time)
            .bind(&input.transcription)
            .bind(&input.transcription_status)
            .bind(&input.extended_transcript)
            .bind(&input.extended_transcript_status)
            .bind(input.feedback)
            .bind(&input.feedback_choices)
            .bind(expected.0.as_str())
            .bind(expected.1.as_str())
            .fetch_optional(pool)
            .await
    }

    /// Store feedback verbatim. Returns `None` if the annotation does not exist.
    pub async fn set_feedback(
        pool: &PgPool,
        id: DbId,
        feedback: i16,
        feedback_choices: &[i16],
    ) -> Result<Option<Annotation>, sqlx::Error> {
        let query = format!(
            "UPDATE annotations SET feedback = $2, feedback_choices = $3
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Annotation>(&query)
            .bind(id)
            .bind(feedback)
            .bind(feedback_choices)
            .fetch_optional(pool)
            .await
    }

    /// Delete an annotation, returning the removed row.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<Option<Annotation>, sqlx::Error> {
        let query = format!("DELETE FROM annotations WHERE id = $1 RETURNING {COLUMNS}");
        sqlx::query_as::<_, Annotation>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Move `track` from `pending` to `processing`.
    ///
    /// Enrichment additionally requires a completed transcription. Returns
    /// `false` when the row is missing or not in the expected state.
    pub async fn begin_track(pool: &PgPool, id: DbId, track: Track) -> Result<bool, sqlx::Error> {
        let (_, status_col) = track_columns(track);
        let precondition = match track {
            Track::Transcription => "",
            Track::Enrichment => " AND transcription_status = 'completed'",
        };
        let query = format!(
            "UPDATE annotations SET {status_col} = 'processing'
             WHERE id = $1 AND {status_col} = 'pending'{precondition}"
        );
        let result = sqlx::query(&query).bind(id).execute(pool).await?;
        Ok(result.rows_affected() > 0)
    }

    /// Store a track's output and move it from `processing` to `completed`.
    pub async fn complete_track(
        pool: &PgPool,
        id: DbId,
        track: Track,
        text: &str,
    ) -> Result<bool, sqlx::Error> {
        let (text_col, status_col) = track_columns(track);
        let query = format!(
            "UPDATE annotations SET {text_col} = $2, {status_col} = 'completed'
             WHERE id = $1 AND {status_col} = 'processing'"
        );
        let result = sqlx::query(&query).bind(id).bind(text).execute(pool).await?;
        Ok(result.rows_affected() > 0)
    }

    /// Move a track from `processing` to `failed`.
    pub async fn fail_track(pool: &PgPool, id: DbId, track: Track) -> Result<bool, sqlx::Error> {
        let (_, status_col) = track_columns(track);
        let query = format!(
            "UPDATE annotations SET {status_col} = 'failed'
             WHERE id = $1 AND {status_col} = 'processing'"
        );
        let result = sqlx::query(&query).bind(id).execute(pool).await?;
        Ok(result.rows_affected() > 0)
    }

    /// Reset every `failed` track of an annotation to `pending`.
    ///
    /// Returns the updated row, or `None` when the annotation is missing or
    /// has no failed track.
    pub async fn reset_failed_tracks(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<Annotation>, sqlx::Error> {
        let query = format!(
            "UPDATE annotations SET
                transcription_status = CASE WHEN transcription_status = 'failed'
                    THEN 'pending' ELSE transcription_status END,
                extended_transcript_status = CASE WHEN extended_transcript_status = 'failed'
                    THEN 'pending' ELSE extended_transcript_status END
             WHERE id = $1
               AND (transcription_status = 'failed' OR extended_transcript_status = 'failed')
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Annotation>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}
