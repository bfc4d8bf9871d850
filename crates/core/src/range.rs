//! Single-range `Range: bytes=START-END` parsing and validation.
//!
//! Only one contiguous range is supported. Either bound may be omitted: a
//! missing start means `0` and a missing end means `total - 1`. Note that
//! `bytes=-N` is therefore read as `0..=N`, not as an RFC 7233 suffix range.

/// Unit prefix of a byte range specifier.
const BYTES_UNIT: &str = "bytes=";

/// Fixed read size used when streaming a slice of a resource.
pub const STREAM_CHUNK_SIZE: usize = 8 * 1024;

/// An inclusive byte range validated against a resource size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

/// Why a range specifier could not be served.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RangeError {
    /// The specifier is not of the form `bytes=START-END`.
    #[error("Malformed range '{0}'")]
    Malformed(String),

    /// The range falls outside a resource of `total` bytes.
    #[error("Requested range not satisfiable for a resource of {total} bytes")]
    NotSatisfiable { total: u64 },
}

impl ByteRange {
    /// Parse `spec` and validate it against a resource of `total` bytes.
    pub fn parse(spec: &str, total: u64) -> Result<Self, RangeError> {
        let malformed = || RangeError::Malformed(spec.to_string());

        let body = spec.trim().strip_prefix(BYTES_UNIT).ok_or_else(malformed)?;
        if body.contains(',') {
            return Err(malformed());
        }

        let (start_str, end_str) = body.split_once('-').ok_or_else(malformed)?;
        let (start_str, end_str) = (start_str.trim(), end_str.trim());
        if start_str.is_empty() && end_str.is_empty() {
            return Err(malformed());
        }

        let start = parse_bound(start_str).map_err(|_| malformed())?;
        let end = parse_bound(end_str).map_err(|_| malformed())?;

        if total == 0 {
            return Err(RangeError::NotSatisfiable { total });
        }

        let start = start.unwrap_or(0);
        let end = end.unwrap_or(total - 1);

        if start >= total || end >= total || start > end {
            return Err(RangeError::NotSatisfiable { total });
        }

        Ok(Self { start, end })
    }

    /// Interpret an optional `Range` header value.
    ///
    /// `Ok(None)` means no header was sent and the full resource is served.
    pub fn from_header(header: Option<&str>, total: u64) -> Result<Option<Self>, RangeError> {
        header.map(|spec| Self::parse(spec, total)).transpose()
    }

    /// Number of bytes covered by the range.
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Always false: a validated range covers at least one byte.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// `Content-Range` header value for a partial response.
    pub fn content_range(&self, total: u64) -> String {
        format!("bytes {}-{}/{total}", self.start, self.end)
    }
}

/// `Content-Range` header value for a 416 response.
pub fn unsatisfied_content_range(total: u64) -> String {
    format!("bytes */{total}")
}

fn parse_bound(s: &str) -> Result<Option<u64>, std::num::ParseIntError> {
    if s.is_empty() {
        Ok(None)
    } else {
        s.parse::<u64>().map(Some)
    }
}
