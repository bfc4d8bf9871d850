//! Clients for the external services the annotation pipeline and the remote
//! video source depend on.
//!
//! - [`transcription`]: speech-to-text for recorded annotation audio
//! - [`enrichment`]: LLM expansion of a transcription into an expert narrative
//! - [`drive`]: remote folder listing and media streaming

pub mod drive;
pub mod enrichment;
pub mod error;
pub mod prompt;
pub mod transcription;

pub use enrichment::{Enricher, EnrichmentConfig, FireworksEnricher};
pub use error::ProviderError;
pub use transcription::{FireworksTranscriber, Transcriber, Transcript, TranscriptionConfig};
