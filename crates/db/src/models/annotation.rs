//! Annotation entity model and DTOs.

use elicit_core::error::CoreError;
use elicit_core::pipeline::{Track, TrackStatus};
use elicit_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// An annotation row from the `annotations` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Annotation {
    pub id: DbId,
    pub video_id: DbId,
    pub start_time: f64,
    pub end_time: f64,
    pub audio_filename: String,
    pub audio_filepath: String,
    pub transcription: Option<String>,
    pub transcription_status: String,
    pub extended_transcript: Option<String>,
    pub extended_transcript_status: String,
    pub feedback: Option<i16>,
    pub feedback_choices: Option<Vec<i16>>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Annotation {
    /// Current status of `track`, parsed from its column.
    pub fn status_of(&self, track: Track) -> Result<TrackStatus, CoreError> {
        match track {
            Track::Transcription => TrackStatus::parse(&self.transcription_status),
            Track::Enrichment => TrackStatus::parse(&self.extended_transcript_status),
        }
    }

    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }
}

/// DTO for inserting an annotation. Both tracks start `pending`.
#[derive(Debug, Clone)]
pub struct CreateAnnotation {
    pub video_id: DbId,
    pub start_time: f64,
    pub end_time: f64,
    pub audio_filename: String,
    pub audio_filepath: String,
}

/// DTO for updating an annotation. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateAnnotation {
    pub start_time: Option<f64>,
    pub end_time: Option<f64>,
    pub transcription: Option<String>,
    pub transcription_status: Option<String>,
    pub extended_transcript: Option<String>,
    pub extended_transcript_status: Option<String>,
    pub feedback: Option<i16>,
    pub feedback_choices: Option<Vec<i16>>,
}

/// Feedback submitted for an annotation.
#[derive(Debug, Clone, Deserialize)]
pub struct AnnotationFeedback {
    pub feedback: i16,
    pub feedback_choices: Vec<i16>,
}
