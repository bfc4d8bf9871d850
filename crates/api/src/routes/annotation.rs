//! Route definitions for the `/annotations` resource.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;

use crate::handlers::annotation;
use crate::state::AppState;

/// Largest accepted annotation request (audio recording included).
const MAX_ANNOTATION_BODY_BYTES: usize = 100 * 1024 * 1024;

/// Routes mounted at `/annotations`, under the request timeout.
///
/// ```text
/// GET    /                  -> list (?video_id=)
/// GET    /{id}              -> get_by_id
/// PUT    /{id}              -> update
/// DELETE /{id}              -> delete
/// POST   /{id}/feedback     -> submit_feedback
/// POST   /{id}/retry        -> retry
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(annotation::list))
        .route(
            "/{id}",
            get(annotation::get_by_id)
                .put(annotation::update)
                .delete(annotation::delete),
        )
        .route("/{id}/feedback", post(annotation::submit_feedback))
        .route("/{id}/retry", post(annotation::retry))
        .layer(DefaultBodyLimit::max(MAX_ANNOTATION_BODY_BYTES))
}

/// Upload routes mounted at `/annotations`, outside the request timeout.
///
/// ```text
/// POST   /                  -> create (multipart)
/// ```
pub fn upload_router() -> Router<AppState> {
    Router::new()
        .route("/", post(annotation::create))
        .layer(DefaultBodyLimit::max(MAX_ANNOTATION_BODY_BYTES))
}
