//! File plumbing shared by the upload and delete handlers.

use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use axum::extract::multipart::Field;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, AppResult};

const BYTES_PER_MB: u64 = 1024 * 1024;

/// A file written from a request body that is deleted when dropped, unless
/// [`PartialFile::keep`] was called.
///
/// Covers handler futures dropped mid-request (client disconnect) as well as
/// early returns after the file landed on disk.
#[derive(Debug)]
pub(crate) struct PartialFile {
    path: PathBuf,
    kept: bool,
}

impl PartialFile {
    pub(crate) fn new(path: PathBuf) -> Self {
        Self { path, kept: false }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Keep the file on disk and hand back its path.
    pub(crate) fn keep(mut self) -> PathBuf {
        self.kept = true;
        std::mem::take(&mut self.path)
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if self.kept {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "Partial file removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to remove partial file")
            }
        }
    }
}

/// Stream a multipart field to `dest`, returning the file and the number of
/// bytes written.
///
/// Fails with 400 once more than `max_bytes` have arrived. The file is
/// removed on failure, and later on unless the caller keeps it.
pub(crate) async fn save_field(
    mut field: Field<'_>,
    dest: PathBuf,
    max_bytes: Option<u64>,
) -> AppResult<(PartialFile, u64)> {
    let file = PartialFile::new(dest);
    let written = write_field(&mut field, file.path(), max_bytes).await?;
    Ok((file, written))
}

async fn write_field(field: &mut Field<'_>, dest: &Path, max_bytes: Option<u64>) -> AppResult<u64> {
    let mut file = tokio::fs::File::create(dest)
        .await
        .map_err(|e| AppError::InternalError(format!("Failed to create {}: {e}", dest.display())))?;

    let mut written: u64 = 0;
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        written += chunk.len() as u64;
        if let Some(max) = max_bytes {
            if written > max {
                return Err(AppError::BadRequest(format!(
                    "File too large. Maximum size: {} MB",
                    max / BYTES_PER_MB
                )));
            }
        }
        file.write_all(&chunk)
            .await
            .map_err(|e| AppError::InternalError(e.to_string()))?;
    }
    file.flush()
        .await
        .map_err(|e| AppError::InternalError(e.to_string()))?;
    Ok(written)
}

/// Parse a required text field.
pub(crate) async fn parse_field<T>(field: Field<'_>, name: &str) -> AppResult<T>
where
    T: FromStr,
    T::Err: Display,
{
    let text = field
        .text()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    text.trim()
        .parse()
        .map_err(|e| AppError::BadRequest(format!("Invalid {name} '{}': {e}", text.trim())))
}

/// Parse an optional text field; an empty value means absent.
pub(crate) async fn parse_optional_field<T>(field: Field<'_>, name: &str) -> AppResult<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    let text = field
        .text()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    text.parse()
        .map(Some)
        .map_err(|e| AppError::BadRequest(format!("Invalid {name} '{text}': {e}")))
}

/// The final path component of a client-supplied file name.
pub(crate) fn client_file_name(raw: &str) -> Option<String> {
    Path::new(raw)
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
}

/// Remove a file, logging anything other than "already gone".
pub(crate) async fn remove_file_quietly(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => tracing::debug!(path = %path.display(), "File removed"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "Failed to remove file"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_file_name_strips_directories() {
        assert_eq!(client_file_name("clip.mp4").as_deref(), Some("clip.mp4"));
        assert_eq!(client_file_name("../../etc/passwd").as_deref(), Some("passwd"));
        assert_eq!(client_file_name("/tmp/a b.webm").as_deref(), Some("a b.webm"));
        assert_eq!(client_file_name(""), None);
        assert_eq!(client_file_name(".."), None);
    }

    #[test]
    fn partial_file_is_removed_unless_kept() {
        let dir = tempfile::tempdir().unwrap();
        let dropped = dir.path().join("dropped.mp4");
        let kept = dir.path().join("kept.mp4");
        std::fs::write(&dropped, b"half").unwrap();
        std::fs::write(&kept, b"whole").unwrap();

        drop(PartialFile::new(dropped.clone()));
        assert!(!dropped.exists());

        assert_eq!(PartialFile::new(kept.clone()).keep(), kept);
        assert!(kept.exists());

        // Nothing was ever written.
        drop(PartialFile::new(dir.path().join("never.mp4")));
    }

    #[tokio::test]
    async fn abandoned_write_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cut.webm");
        let write = {
            let path = path.clone();
            async move {
                let file = PartialFile::new(path);
                tokio::fs::write(file.path(), b"first chunk").await.unwrap();
                std::future::pending::<()>().await;
                file.keep()
            }
        };
        let timed_out = tokio::time::timeout(std::time::Duration::from_millis(20), write).await;
        assert!(timed_out.is_err());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn removing_a_missing_file_is_silent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gone.wav");
        remove_file_quietly(&path).await;

        tokio::fs::write(&path, b"x").await.unwrap();
        remove_file_quietly(&path).await;
        assert!(!path.exists());
    }
}
