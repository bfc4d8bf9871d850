pub mod annotation;
pub mod export;
pub mod health;
pub mod project;
pub mod remote;
pub mod video;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;
use crate::ws;

/// Build the `/api/v1` route tree. Multipart uploads live in
/// [`upload_routes`].
///
/// Route hierarchy:
///
/// ```text
/// /ws                                              WebSocket
///
/// /projects                                        list, create
/// /projects/{id}                                   get, update, delete
/// /projects/{id}/videos                            videos in batch order
///
/// /videos                                          list
/// /videos/upload                                   multipart upload (POST)
/// /videos/local/browse                             browse a local directory (GET)
/// /videos/local/register                           register a local file (POST)
/// /videos/{id}                                     get, patch, delete
/// /videos/{id}/file                                range-request delivery
///
/// /remote/folders/{folder_id}/videos               list a remote folder
/// /remote/register                                 register a remote file (POST)
///
/// /annotations                                     list (?video_id=), create (multipart)
/// /annotations/{id}                                get, update, delete
/// /annotations/{id}/feedback                       submit feedback (POST)
/// /annotations/{id}/retry                          re-run failed tracks (POST)
///
/// /export/{video_id}                               JSON export
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // WebSocket live events.
        .route("/ws", get(ws::ws_handler))
        // Video groupings.
        .nest("/projects", project::router())
        // Upload, registration, and delivery.
        .nest("/videos", video::router())
        // Remote storage folders.
        .nest("/remote", remote::router())
        // Annotations and their processing tracks.
        .nest("/annotations", annotation::router())
        // Export.
        .nest("/export", export::router())
}

/// Build the `/api/v1` routes that receive files.
///
/// Mounted outside the request timeout: their duration depends on the size
/// of the upload and the client's bandwidth.
///
/// ```text
/// /videos/upload                                   multipart upload (POST)
/// /annotations                                     create (multipart POST)
/// ```
pub fn upload_routes() -> Router<AppState> {
    Router::new()
        .nest("/videos", video::upload_router())
        .nest("/annotations", annotation::upload_router())
}
