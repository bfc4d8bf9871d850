pub mod annotation;
pub mod export;
mod files;
pub mod project;
pub mod remote;
pub mod video;
