//! Range-request video delivery.
//!
//! Local files are served by seeking to the range start and reading at most
//! the range length in [`STREAM_CHUNK_SIZE`] chunks. Remote media cannot be
//! seeked, so a ranged request skips the leading bytes of the upstream
//! stream and stops once the range is exhausted.

use std::path::Path;

use axum::body::Body;
use axum::http::header::{self, HeaderMap};
use axum::http::StatusCode;
use axum::response::Response;
use bytes::Bytes;
use elicit_core::range::{ByteRange, STREAM_CHUNK_SIZE};
use elicit_providers::drive::MediaStream;
use futures::{stream, Stream, StreamExt};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;

use crate::error::{AppError, AppResult};

/// Value of the `Accept-Ranges` header on every media response.
const ACCEPT_RANGES_BYTES: &str = "bytes";

/// Read the `Range` header and validate it against a resource of `total` bytes.
pub fn requested_range(headers: &HeaderMap, total: u64) -> AppResult<Option<ByteRange>> {
    let header = headers
        .get(header::RANGE)
        .map(|value| {
            value
                .to_str()
                .map_err(|_| AppError::BadRequest("Invalid Range header".into()))
        })
        .transpose()?;
    Ok(ByteRange::from_header(header, total)?)
}

/// Serve a file on local disk, honouring a `Range` header.
pub async fn local_file_response(
    path: &Path,
    headers: &HeaderMap,
    content_type: &str,
) -> AppResult<Response> {
    let mut file = tokio::fs::File::open(path)
        .await
        .map_err(|e| AppError::InternalError(format!("Failed to open {}: {e}", path.display())))?;
    let total = file
        .metadata()
        .await
        .map_err(|e| AppError::InternalError(e.to_string()))?
        .len();

    match requested_range(headers, total)? {
        Some(range) => {
            file.seek(std::io::SeekFrom::Start(range.start))
                .await
                .map_err(|e| AppError::InternalError(e.to_string()))?;
            let limited = file.take(range.len());
            let stream = ReaderStream::with_capacity(limited, STREAM_CHUNK_SIZE);
            partial_response(range, total, content_type, Body::from_stream(stream))
        }
        None => {
            let stream = ReaderStream::with_capacity(file, STREAM_CHUNK_SIZE);
            full_response(Some(total), content_type, Body::from_stream(stream))
        }
    }
}

/// Proxy an open remote media stream.
///
/// `range` must already be validated against the recorded size `total`.
pub fn remote_media_response(
    media: MediaStream,
    range: Option<ByteRange>,
    total: u64,
    content_type: &str,
) -> AppResult<Response> {
    let content_type = media.content_type.as_deref().unwrap_or(content_type);
    match range {
        Some(range) => {
            let body = Body::from_stream(slice_stream(media.body, range));
            partial_response(range, total, content_type, body)
        }
        None => {
            let length = media.content_length.or((total > 0).then_some(total));
            full_response(length, content_type, Body::from_stream(media.body))
        }
    }
}

/// Restrict a byte stream to `range`, counting offsets from the stream start.
///
/// The upstream stream is not polled again once the last byte of the range
/// has been yielded.
pub fn slice_stream<S, E>(body: S, range: ByteRange) -> impl Stream<Item = Result<Bytes, E>>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
{
    let end = range.end + 1;
    stream::unfold((body, 0u64), move |(mut upstream, mut offset)| async move {
        while offset < end {
            let chunk = match upstream.next().await? {
                Ok(chunk) => chunk,
                Err(e) => return Some((Err(e), (upstream, end))),
            };
            let chunk_start = offset;
            offset += chunk.len() as u64;

            let from = range.start.saturating_sub(chunk_start).min(chunk.len() as u64) as usize;
            let to = (end.min(offset) - chunk_start) as usize;
            if from < to {
                return Some((Ok(chunk.slice(from..to)), (upstream, offset)));
            }
        }
        None
    })
}

fn partial_response(
    range: ByteRange,
    total: u64,
    content_type: &str,
    body: Body,
) -> AppResult<Response> {
    Response::builder()
        .status(StatusCode::PARTIAL_CONTENT)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, range.len().to_string())
        .header(header::CONTENT_RANGE, range.content_range(total))
        .header(header::ACCEPT_RANGES, ACCEPT_RANGES_BYTES)
        .body(body)
        .map_err(|e| AppError::InternalError(e.to_string()))
}

fn full_response(length: Option<u64>, content_type: &str, body: Body) -> AppResult<Response> {
    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::ACCEPT_RANGES, ACCEPT_RANGES_BYTES);
    if let Some(length) = length {
        builder = builder.header(header::CONTENT_LENGTH, length.to_string());
    }
    builder
        .body(body)
        .map_err(|e| AppError::InternalError(e.to_string()))
}
