//! Domain logic shared by the database, provider, and API crates.
//!
//! Nothing in this crate performs I/O.

pub mod annotation;
pub mod error;
pub mod live_events;
pub mod pipeline;
pub mod range;
pub mod types;
pub mod video_formats;
pub mod video_sources;
