use axum::routing::get;
use axum::Router;

use crate::handlers::export;
use crate::state::AppState;

/// Routes mounted at `/export`.
///
/// ```text
/// GET    /{video_id}        -> export_video
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/{video_id}", get(export::export_video))
}
