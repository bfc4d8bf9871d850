//! Persistence seam for track transitions.

use async_trait::async_trait;
use elicit_core::pipeline::Track;
use elicit_core::types::DbId;
use elicit_db::repositories::AnnotationRepo;
use sqlx::PgPool;

/// What a track needs to run.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackInputs {
    pub audio_filepath: String,
    pub transcription: Option<String>,
}

/// Conditional track transitions. Each returns `false` when the annotation
/// is missing or not in the state the transition requires.
#[async_trait]
pub trait TrackStore: Send + Sync {
    async fn inputs(&self, annotation_id: DbId) -> Result<Option<TrackInputs>, sqlx::Error>;

    /// `pending -> processing`. Enrichment also requires a completed transcription.
    async fn begin(&self, annotation_id: DbId, track: Track) -> Result<bool, sqlx::Error>;

    /// `processing -> completed`, storing the track output.
    async fn complete(
        &self,
        annotation_id: DbId,
        track: Track,
        text: &str,
    ) -> Result<bool, sqlx::Error>;

    /// `processing -> failed`.
    async fn fail(&self, annotation_id: DbId, track: Track) -> Result<bool, sqlx::Error>;
}

pub struct PgTrackStore {
    pool: PgPool,
}

impl PgTrackStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TrackStore for PgTrackStore {
    async fn inputs(&self, annotation_id: DbId) -> Result<Option<TrackInputs>, sqlx::Error> {
        Ok(AnnotationRepo::find_by_id(&self.pool, annotation_id)
            .await?
            .map(|a| TrackInputs {
                audio_filepath: a.audio_filepath,
                transcription: a.transcription,
            }))
    }

    async fn begin(&self, annotation_id: DbId, track: Track) -> Result<bool, sqlx::Error> {
        AnnotationRepo::begin_track(&self.pool, annotation_id, track).await
    }

    async fn complete(
        &self,
        annotation_id: DbId,
        track: Track,
        text: &str,
    ) -> Result<bool, sqlx::Error> {
        AnnotationRepo::complete_track(&self.pool, annotation_id, track, text).await
    }

    async fn fail(&self, annotation_id: DbId, track: Track) -> Result<bool, sqlx::Error> {
        AnnotationRepo::fail_track(&self.pool, annotation_id, track).await
    }
}
