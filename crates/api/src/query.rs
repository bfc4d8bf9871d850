//! Shared query parameter types for API handlers.

use elicit_core::types::DbId;
use serde::Deserialize;

/// Default page size for list endpoints.
pub const DEFAULT_LIMIT: i64 = 100;

/// Largest page size a client may request.
pub const MAX_LIMIT: i64 = 1000;

/// Generic pagination parameters (`?limit=&offset=`).
#[derive(Debug, Default, Deserialize)]
pub struct PaginationParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl PaginationParams {
    /// Requested limit clamped to `1..=MAX_LIMIT`.
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }

    /// Requested offset, never negative.
    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

/// `?project_id=&limit=&offset=` for the video list.
#[derive(Debug, Deserialize)]
pub struct VideoListParams {
    pub project_id: Option<DbId>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl VideoListParams {
    pub fn page(&self) -> PaginationParams {
        PaginationParams {
            limit: self.limit,
            offset: self.offset,
        }
    }
}

/// `?video_id=` for the annotation list.
#[derive(Debug, Deserialize)]
pub struct AnnotationListParams {
    pub video_id: DbId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_is_clamped() {
        let page = PaginationParams {
            limit: Some(5000),
            offset: Some(-3),
        };
        assert_eq!(page.limit(), MAX_LIMIT);
        assert_eq!(page.offset(), 0);
        assert_eq!(PaginationParams::default().limit(), DEFAULT_LIMIT);
    }
}
