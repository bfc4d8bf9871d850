//! Route definitions for remote storage folders.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::remote;
use crate::state::AppState;

/// Routes mounted at `/remote`.
///
/// ```text
/// GET    /folders/{folder_id}/videos   -> list_folder
/// POST   /register                     -> register
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/folders/{folder_id}/videos", get(remote::list_folder))
        .route("/register", post(remote::register))
}
