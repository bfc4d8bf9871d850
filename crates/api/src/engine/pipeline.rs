//! Two-track annotation pipeline.
//!
//! A run starts at a given track and advances to [`Track::next`] only when
//! the current track completes. A failed track ends the run and stays
//! failed until re-triggered, as does a track whose store or provider call
//! errors or panics. Every transition is broadcast as a
//! [`LiveEvent`].

use std::convert::Infallible;
use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::sync::Arc;

use elicit_core::live_events::LiveEvent;
use elicit_core::pipeline::{Track, TrackStatus};
use elicit_core::types::DbId;
use elicit_providers::{Enricher, ProviderError, Transcriber};
use futures::FutureExt;

use crate::engine::store::{TrackInputs, TrackStore};
use crate::engine::tasks::spawn_detached;
use crate::ws::WsManager;

/// How a single track run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackOutcome {
    Completed,
    Failed,
    /// The track was not in a state that allowed it to start.
    Skipped,
}

pub struct AnnotationPipeline {
    store: Arc<dyn TrackStore>,
    transcriber: Arc<dyn Transcriber>,
    enricher: Arc<dyn Enricher>,
    ws_manager: Arc<WsManager>,
}

impl AnnotationPipeline {
    pub fn new(
        store: Arc<dyn TrackStore>,
        transcriber: Arc<dyn Transcriber>,
        enricher: Arc<dyn Enricher>,
        ws_manager: Arc<WsManager>,
    ) -> Self {
        Self {
            store,
            transcriber,
            enricher,
            ws_manager,
        }
    }

    /// Start processing `annotation_id` from `from` in the background.
    pub fn enqueue(self: &Arc<Self>, annotation_id: DbId, from: Track) {
        let pipeline = Arc::clone(self);
        tracing::info!(annotation_id, track = from.as_str(), "Annotation pipeline enqueued");
        spawn_detached("annotation_pipeline", async move {
            pipeline.run(annotation_id, from).await;
            Ok::<(), Infallible>(())
        });
    }

    /// Run tracks in order starting at `from`, stopping at the first one
    /// that does not complete.
    pub async fn run(&self, annotation_id: DbId, from: Track) {
        let mut current = Some(from);
        while let Some(track) = current {
            match self.run_track(annotation_id, track).await {
                TrackOutcome::Completed => current = track.next(),
                TrackOutcome::Failed | TrackOutcome::Skipped => break,
            }
        }
    }

    /// Run one track through `processing` to `completed` or `failed`.
    ///
    /// Once the track may have entered `processing`, every error and any
    /// provider panic ends it as `failed`.
    pub async fn run_track(&self, annotation_id: DbId, track: Track) -> TrackOutcome {
        match self.store.begin(annotation_id, track).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!(
                    annotation_id,
                    track = track.as_str(),
                    "Track not startable, skipping",
                );
                return TrackOutcome::Skipped;
            }
            Err(e) => {
                // The status write may have landed before the error.
                self.mark_failed(annotation_id, track, format!("Failed to start track: {e}"))
                    .await;
                return TrackOutcome::Failed;
            }
        }
        self.notify(LiveEvent::track_status(
            track,
            annotation_id,
            TrackStatus::Processing,
        ))
        .await;

        let inputs = match self.store.inputs(annotation_id).await {
            Ok(Some(inputs)) => inputs,
            Ok(None) => {
                tracing::debug!(annotation_id, "Annotation gone while processing");
                return TrackOutcome::Skipped;
            }
            Err(e) => {
                self.mark_failed(annotation_id, track, format!("Failed to load inputs: {e}"))
                    .await;
                return TrackOutcome::Failed;
            }
        };

        let text = match self.call_provider(track, &inputs).await {
            Ok(text) => text,
            Err(error) => {
                self.mark_failed(annotation_id, track, error).await;
                return TrackOutcome::Failed;
            }
        };

        match self.store.complete(annotation_id, track, &text).await {
            Ok(true) => {
                tracing::info!(annotation_id, track = track.as_str(), "Track completed");
                self.notify(LiveEvent::track_completed(track, annotation_id, text))
                    .await;
                TrackOutcome::Completed
            }
            Ok(false) => {
                tracing::warn!(
                    annotation_id,
                    track = track.as_str(),
                    "Track left processing while running, result discarded",
                );
                TrackOutcome::Skipped
            }
            Err(e) => {
                self.mark_failed(annotation_id, track, format!("Failed to store result: {e}"))
                    .await;
                TrackOutcome::Failed
            }
        }
    }

    /// Produce the text of `track`, turning a provider panic into an error.
    async fn call_provider(&self, track: Track, inputs: &TrackInputs) -> Result<String, String> {
        let call = async {
            match track {
                Track::Transcription => self.transcribe(inputs).await,
                Track::Enrichment => {
                    self.enricher
                        .enrich(inputs.transcription.as_deref().unwrap_or_default())
                        .await
                }
            }
        };
        match AssertUnwindSafe(call).catch_unwind().await {
            Ok(result) => result.map_err(|e| e.to_string()),
            Err(panic) => {
                let detail = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                Err(format!("{} provider panicked: {detail}", track.as_str()))
            }
        }
    }

    async fn transcribe(&self, inputs: &TrackInputs) -> Result<String, ProviderError> {
        let transcript = self
            .transcriber
            .transcribe(Path::new(&inputs.audio_filepath))
            .await?;
        Ok(transcript.text)
    }

    /// Record a failure. Errors from this step are logged and dropped.
    async fn mark_failed(&self, annotation_id: DbId, track: Track, error: String) {
        tracing::warn!(annotation_id, track = track.as_str(), error = %error, "Track failed");
        if let Err(e) = self.store.fail(annotation_id, track).await {
            tracing::error!(annotation_id, error = %e, "Failed to record track failure");
        }
        self.notify(LiveEvent::track_failed(track, annotation_id, error))
            .await;
    }

    async fn notify(&self, event: LiveEvent) {
        self.ws_manager.broadcast_event(&event).await;
    }
}
