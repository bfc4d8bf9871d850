//! Messages pushed to connected WebSocket observers.
//!
//! Serialized as flat JSON objects with a `type` discriminator, e.g.
//! `{"type":"transcription_status","annotation_id":7,"track":"transcription","status":"processing"}`.

use serde::Serialize;

use crate::pipeline::{Track, TrackStatus};
use crate::types::DbId;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LiveEvent {
    AnnotationCreated {
        annotation_id: DbId,
        video_id: DbId,
    },
    AnnotationUpdated {
        annotation_id: DbId,
        video_id: DbId,
    },
    AnnotationDeleted {
        annotation_id: DbId,
        video_id: DbId,
    },

    TranscriptionStatus {
        annotation_id: DbId,
        track: Track,
        status: TrackStatus,
    },
    TranscriptionComplete {
        annotation_id: DbId,
        track: Track,
        status: TrackStatus,
        transcription: String,
    },
    TranscriptionError {
        annotation_id: DbId,
        track: Track,
        status: TrackStatus,
        error: String,
    },

    ExtendedTranscriptStatus {
        annotation_id: DbId,
        track: Track,
        status: TrackStatus,
    },
    ExtendedTranscriptComplete {
        annotation_id: DbId,
        track: Track,
        status: TrackStatus,
        extended_transcript: String,
    },
    ExtendedTranscriptError {
        annotation_id: DbId,
        track: Track,
        status: TrackStatus,
        error: String,
    },

    VideoCreated {
        video_id: DbId,
        source_type: String,
    },
    VideoDeleted {
        video_id: DbId,
    },

    ProjectCreated {
        project_id: DbId,
    },
    ProjectUpdated {
        project_id: DbId,
    },
    ProjectDeleted {
        project_id: DbId,
    },
}

impl LiveEvent {
    /// A track entered a non-terminal status (`pending` or `processing`).
    pub fn track_status(track: Track, annotation_id: DbId, status: TrackStatus) -> Self {
        match track {
            Track::Transcription => LiveEvent::TranscriptionStatus {
                annotation_id,
                track,
                status,
            },
            Track::Enrichment => LiveEvent::ExtendedTranscriptStatus {
                annotation_id,
                track,
                status,
            },
        }
    }

    /// A track completed with its output text.
    pub fn track_completed(track: Track, annotation_id: DbId, text: String) -> Self {
        let status = TrackStatus::Completed;
        match track {
            Track::Transcription => LiveEvent::TranscriptionComplete {
                annotation_id,
                track,
                status,
                transcription: text,
            },
            Track::Enrichment => LiveEvent::ExtendedTranscriptComplete {
                annotation_id,
                track,
                status,
                extended_transcript: text,
            },
        }
    }

    /// A track failed.
    pub fn track_failed(track: Track, annotation_id: DbId, error: String) -> Self {
        let status = TrackStatus::Failed;
        match track {
            Track::Transcription => LiveEvent::TranscriptionError {
                annotation_id,
                track,
                status,
                error,
            },
            Track::Enrichment => LiveEvent::ExtendedTranscriptError {
                annotation_id,
                track,
                status,
                error,
            },
        }
    }

    /// The `type` discriminator, for logging.
    pub fn event_type(&self) -> &'static str {
        match self {
            LiveEvent::AnnotationCreated { .. } => "annotation_created",
            LiveEvent::AnnotationUpdated { .. } => "annotation_updated",
            LiveEvent::AnnotationDeleted { .. } => "annotation_deleted",
            LiveEvent::TranscriptionStatus { .. } => "transcription_status",
            LiveEvent::TranscriptionComplete { .. } => "transcription_complete",
            LiveEvent::TranscriptionError { .. } => "transcription_error",
            LiveEvent::ExtendedTranscriptStatus { .. } => "extended_transcript_status",
            LiveEvent::ExtendedTranscriptComplete { .. } => "extended_transcript_complete",
            LiveEvent::ExtendedTranscriptError { .. } => "extended_transcript_error",
            LiveEvent::VideoCreated { .. } => "video_created",
            LiveEvent::VideoDeleted { .. } => "video_deleted",
            LiveEvent::ProjectCreated { .. } => "project_created",
            LiveEvent::ProjectUpdated { .. } => "project_updated",
            LiveEvent::ProjectDeleted { .. } => "project_deleted",
        }
    }

    /// JSON text sent over the wire.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            serde_json::json!({ "type": self.event_type() }).to_string()
        })
    }
}
