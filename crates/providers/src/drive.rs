//! Remote video folder listing and media streaming over the Drive v3 API.
//!
//! Folders are read with an API key (or anonymously for public folders).
//! Media is fetched with `alt=media` as a single forward-only stream.

use bytes::Bytes;
use elicit_core::video_formats::REMOTE_VIDEO_EXTENSIONS;
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};

use crate::error::{ensure_success, ProviderError};

pub const DEFAULT_DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";

/// Maximum number of entries returned by one folder listing.
const PAGE_SIZE: u32 = 100;

/// A video file found in a remote folder.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RemoteVideo {
    pub id: String,
    pub name: String,
    pub size: u64,
    pub mime_type: String,
    /// `m:ss` or `h:mm:ss`, when the provider reports it.
    pub duration: Option<String>,
    pub duration_seconds: Option<f64>,
}

/// An open media download.
pub struct MediaStream {
    pub content_length: Option<u64>,
    pub content_type: Option<String>,
    pub body: BoxStream<'static, Result<Bytes, ProviderError>>,
}

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    id: String,
    name: String,
    /// Sent as a decimal string.
    size: Option<String>,
    #[serde(default)]
    mime_type: String,
    video_media_metadata: Option<VideoMediaMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoMediaMetadata {
    duration_millis: Option<String>,
}

/// Format a millisecond duration as `m:ss`, or `h:mm:ss` past an hour.
pub fn format_duration(duration_millis: &str) -> Option<String> {
    let total_seconds = duration_millis.trim().parse::<u64>().ok()? / 1000;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    Some(if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes}:{seconds:02}")
    })
}

fn is_video_entry(file: &DriveFile) -> bool {
    if file.mime_type.starts_with("video/") {
        return true;
    }
    let name = file.name.to_ascii_lowercase();
    REMOTE_VIDEO_EXTENSIONS
        .iter()
        .any(|ext| name.ends_with(&format!(".{ext}")))
}

/// Keep only entries that look like videos.
fn filter_videos(files: Vec<DriveFile>) -> Vec<RemoteVideo> {
    files
        .into_iter()
        .filter(is_video_entry)
        .map(|file| {
            let millis = file
                .video_media_metadata
                .and_then(|m| m.duration_millis);
            RemoteVideo {
                size: file
                    .size
                    .as_deref()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(0),
                duration: millis.as_deref().and_then(format_duration),
                duration_seconds: millis
                    .as_deref()
                    .and_then(|m| m.parse::<f64>().ok())
                    .map(|ms| ms / 1000.0),
                id: file.id,
                name: file.name,
                mime_type: file.mime_type,
            }
        })
        .collect()
}

/// Client for a remote storage provider's folder and media endpoints.
pub struct DriveClient {
    client: reqwest::Client,
    api_base: String,
    api_key: Option<String>,
}

impl DriveClient {
    /// * `api_key` - Default key, used when a call does not supply its own.
    pub fn new(api_base: String, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base,
            api_key: api_key.filter(|k| !k.is_empty()),
        }
    }

    fn key<'a>(&'a self, override_key: Option<&'a str>) -> Option<&'a str> {
        override_key
            .filter(|k| !k.is_empty())
            .or(self.api_key.as_deref())
    }

    /// List the video files directly inside `folder_id`, ordered by name.
    pub async fn list_videos(
        &self,
        folder_id: &str,
        api_key: Option<&str>,
    ) -> Result<Vec<RemoteVideo>, ProviderError> {
        let query = format!(
            "'{folder_id}' in parents and (mimeType contains 'video/' or \
             mimeType='application/octet-stream')"
        );
        let page_size = PAGE_SIZE.to_string();
        let mut params = vec![
            ("q", query.as_str()),
            ("fields", "files(id, name, size, mimeType, videoMediaMetadata)"),
            ("orderBy", "name"),
            ("pageSize", page_size.as_str()),
        ];
        if let Some(key) = self.key(api_key) {
            params.push(("key", key));
        }

        let response = self
            .client
            .get(format!("{}/files", self.api_base))
            .query(&params)
            .send()
            .await?;

        match response.status() {
            reqwest::StatusCode::FORBIDDEN => {
                return Err(ProviderError::AccessDenied(
                    "Folder may be private or the API key is invalid".into(),
                ))
            }
            reqwest::StatusCode::NOT_FOUND => {
                return Err(ProviderError::NotFound(format!("Folder {folder_id}")))
            }
            _ => {}
        }

        let list: FileList = ensure_success(response).await?.json().await?;
        let videos = filter_videos(list.files);
        tracing::info!(folder_id, count = videos.len(), "Listed remote videos");
        Ok(videos)
    }

    /// Open the media of `file_id` as a byte stream.
    pub async fn open_media(&self, file_id: &str) -> Result<MediaStream, ProviderError> {
        let mut request = self
            .client
            .get(format!("{}/files/{file_id}", self.api_base))
            .query(&[("alt", "media")]);
        if let Some(key) = self.key(None) {
            request = request.query(&[("key", key)]);
        }

        let response = request.send().await?;
        match response.status() {
            reqwest::StatusCode::FORBIDDEN => {
                return Err(ProviderError::AccessDenied(format!("File {file_id}")))
            }
            reqwest::StatusCode::NOT_FOUND => {
                return Err(ProviderError::NotFound(format!("File {file_id}")))
            }
            _ => {}
        }
        let response = ensure_success(response).await?;

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        Ok(MediaStream {
            content_length: response.content_length(),
            content_type,
            body: response.bytes_stream().map_err(ProviderError::from).boxed(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, mime: &str, millis: Option<&str>) -> DriveFile {
        DriveFile {
            id: format!("id-{name}"),
            name: name.to_string(),
            size: Some("2048".to_string()),
            mime_type: mime.to_string(),
            video_media_metadata: millis.map(|m| VideoMediaMetadata {
                duration_millis: Some(m.to_string()),
            }),
        }
    }

    #[test]
    fn duration_formats() {
        assert_eq!(format_duration("83000").as_deref(), Some("1:23"));
        assert_eq!(format_duration("3754000").as_deref(), Some("1:02:34"));
        assert_eq!(format_duration("999").as_deref(), Some("0:00"));
        assert_eq!(format_duration("abc"), None);
    }

    #[test]
    fn keeps_video_mime_types_and_known_extensions() {
        let videos = filter_videos(vec![
            file("a.bin", "video/mp4", Some("83000")),
            file("B.MKV", "application/octet-stream", None),
            file("notes.txt", "application/octet-stream", None),
        ]);

        let names: Vec<&str> = videos.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["a.bin", "B.MKV"]);
        assert_eq!(videos[0].size, 2048);
        assert_eq!(videos[0].duration.as_deref(), Some("1:23"));
        assert_eq!(videos[0].duration_seconds, Some(83.0));
        assert_eq!(videos[1].duration, None);
    }

    #[test]
    fn listing_body_parses_camel_case() {
        let list: FileList = serde_json::from_str(
            r#"{"files": [{"id": "f1", "name": "demo.mov", "mimeType": "video/quicktime",
                           "size": "10", "videoMediaMetadata": {"durationMillis": "5000"}}]}"#,
        )
        .unwrap();
        let videos = filter_videos(list.files);
        assert_eq!(videos.len(), 1);
        assert_eq!(videos[0].id, "f1");
        assert_eq!(videos[0].duration.as_deref(), Some("0:05"));
    }

    #[test]
    fn call_key_overrides_default() {
        let client = DriveClient::new("http://drive".into(), Some("default".into()));
        assert_eq!(client.key(Some("mine")), Some("mine"));
        assert_eq!(client.key(Some("")), Some("default"));
        assert_eq!(client.key(None), Some("default"));

        let anonymous = DriveClient::new("http://drive".into(), Some(String::new()));
        assert_eq!(anonymous.key(None), None);
    }
}
