//! How a video's bytes reached the service.
//!
//! Only `uploaded` videos are owned: deleting any other kind leaves the
//! backing file alone.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Path prefix used for videos proxied from remote storage.
pub const REMOTE_PATH_PREFIX: &str = "remote://";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoSource {
    /// Copied into the service's video directory.
    Uploaded,
    /// Registered in place from a local directory.
    Local,
    /// Streamed from the remote storage provider.
    Remote,
}

impl VideoSource {
    pub fn as_str(self) -> &'static str {
        match self {
            VideoSource::Uploaded => "uploaded",
            VideoSource::Local => "local",
            VideoSource::Remote => "remote",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "uploaded" => Ok(VideoSource::Uploaded),
            "local" => Ok(VideoSource::Local),
            "remote" => Ok(VideoSource::Remote),
            other => Err(CoreError::Validation(format!(
                "Invalid source_type '{other}'. Expected one of: uploaded, local, remote"
            ))),
        }
    }

    /// Whether the service created the backing file and may delete it.
    pub fn owns_file(self) -> bool {
        self == VideoSource::Uploaded
    }
}

/// Storage path recorded for a remote file.
pub fn remote_path(file_id: &str) -> String {
    format!("{REMOTE_PATH_PREFIX}{file_id}")
}

/// Extract the remote file id from a storage path, if it is a remote path.
pub fn remote_file_id(path: &str) -> Option<&str> {
    path.strip_prefix(REMOTE_PATH_PREFIX).filter(|id| !id.is_empty())
}
