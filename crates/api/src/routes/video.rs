//! Route definitions for the `/videos` resource.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;

use crate::handlers::video;
use crate::state::AppState;

/// Routes mounted at `/videos`, under the request timeout.
///
/// ```text
/// GET    /                  -> list
/// GET    /local/browse      -> browse_local
/// POST   /local/register    -> register_local
/// GET    /{id}              -> get_by_id
/// PATCH  /{id}              -> update
/// DELETE /{id}              -> delete
/// GET    /{id}/file         -> serve_file
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(video::list))
        .route("/local/browse", get(video::browse_local))
        .route("/local/register", post(video::register_local))
        .route(
            "/{id}",
            get(video::get_by_id)
                .patch(video::update)
                .delete(video::delete),
        )
        .route("/{id}/file", get(video::serve_file))
}

/// Upload routes mounted at `/videos`, outside the request timeout.
///
/// ```text
/// POST   /upload            -> upload (multipart, size checked while streaming)
/// ```
pub fn upload_router() -> Router<AppState> {
    Router::new().route(
        "/upload",
        post(video::upload).layer(DefaultBodyLimit::disable()),
    )
}
