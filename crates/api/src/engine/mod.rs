//! Annotation processing engine.
//!
//! Each annotation runs two tracks in order (transcription, then
//! enrichment) in a detached background task. Progress is persisted through
//! a [`store::TrackStore`] and announced to WebSocket observers.

pub mod pipeline;
pub mod store;
pub mod tasks;

pub use pipeline::{AnnotationPipeline, TrackOutcome};
pub use store::{PgTrackStore, TrackInputs, TrackStore};
