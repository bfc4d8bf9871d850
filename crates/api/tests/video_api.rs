//! HTTP-level tests for the `/api/v1/videos` and `/api/v1/remote` resources.

mod common;

use std::time::Duration;

use axum::http::{header, Method, Request, StatusCode};
use serde_json::json;

// ---------------------------------------------------------------------------
// Upload
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn upload_stores_file_and_announces_it(pool: sqlx::PgPool) {
    let app = common::build_test_app(pool);
    let mut observer = app.observe().await;
    let data = common::sample_bytes(2048);

    let video = common::upload_video(&app, "tour à bois.mp4", &data).await;

    assert_eq!(video["filename"], "tour à bois.mp4");
    assert_eq!(video["source_type"], "uploaded");
    assert_eq!(video["file_size"], 2048);
    assert_eq!(video["mime_type"], "video/mp4");

    let filepath = std::path::PathBuf::from(video["filepath"].as_str().unwrap());
    assert!(filepath.starts_with(app.videos_dir()));
    assert!(filepath
        .file_name()
        .unwrap()
        .to_string_lossy()
        .ends_with("_tour à bois.mp4"));
    assert_eq!(std::fs::read(&filepath).unwrap(), data);

    let events = common::drain_events(&mut observer);
    assert_eq!(events[0]["type"], "video_created");
    assert_eq!(events[0]["video_id"], video["id"]);
    assert_eq!(events[0]["source_type"], "uploaded");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn same_name_uploads_do_not_collide(pool: sqlx::PgPool) {
    let app = common::build_test_app(pool);

    let first = common::upload_video(&app, "clip.webm", b"first").await;
    let second = common::upload_video(&app, "clip.webm", b"second").await;

    assert_ne!(first["filepath"], second["filepath"]);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn unsupported_format_is_rejected(pool: sqlx::PgPool) {
    let app = common::build_test_app(pool);

    let response = common::post_multipart(
        app.router(),
        "/api/v1/videos/upload",
        &[common::Part::File {
            name: "file",
            filename: "notes.txt",
            content_type: "text/plain",
            data: b"hello",
        }],
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = common::body_json(response).await;
    assert!(json["error"].as_str().unwrap().contains(".mp4"));
}

#[sqlx::test(migrations = "../db/migrations")]
async fn oversized_upload_is_rejected_and_cleaned_up(pool: sqlx::PgPool) {
    let app = common::build_test_app(pool);
    let data = common::sample_bytes(common::TEST_MAX_UPLOAD_BYTES as usize + 1);

    let response = common::post_multipart(
        app.router(),
        "/api/v1/videos/upload",
        &[common::Part::File {
            name: "file",
            filename: "big.mp4",
            content_type: "video/mp4",
            data: &data,
        }],
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = common::body_json(response).await;
    assert!(json["error"].as_str().unwrap().starts_with("File too large"));

    let leftovers = std::fs::read_dir(app.videos_dir()).unwrap().count();
    assert_eq!(leftovers, 0);
    let list = common::body_json(common::get(app.router(), "/api/v1/videos").await).await;
    assert!(list["data"].as_array().unwrap().is_empty());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn upload_without_file_is_rejected(pool: sqlx::PgPool) {
    let app = common::build_test_app(pool);

    let response = common::post_multipart(
        app.router(),
        "/api/v1/videos/upload",
        &[common::Part::Text("batch_position", "1")],
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn slow_uploads_outlive_the_request_timeout(pool: sqlx::PgPool) {
    let app = common::build_test_app_with(pool, |config| config.request_timeout_secs = 1);
    let pause = Duration::from_millis(1500);
    let data = common::sample_bytes(4096);

    let response = common::post_multipart_slowly(
        app.router(),
        "/api/v1/videos/upload",
        &[common::Part::File {
            name: "file",
            filename: "lent.mp4",
            content_type: "video/mp4",
            data: &data,
        }],
        pause,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let video = common::body_json(response).await;
    assert_eq!(video["data"]["file_size"], 4096);

    // Ordinary routes still time out.
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/projects")
        .header(header::CONTENT_TYPE, "application/json")
        .body(common::slow_body(
            json!({ "name": "Atelier" }).to_string().into_bytes(),
            pause,
        ))
        .unwrap();
    let response = common::send(app.router(), request).await;
    assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
}

// ---------------------------------------------------------------------------
// List / update / delete
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn list_filters_by_project(pool: sqlx::PgPool) {
    let app = common::build_test_app(pool);
    let project = common::body_json(
        common::post_json(app.router(), "/api/v1/projects", json!({ "name": "Atelier" })).await,
    )
    .await;
    let project_id = project["data"]["id"].as_i64().unwrap();

    let inside = common::upload_video(&app, "a.mp4", b"aaaa").await;
    common::upload_video(&app, "b.mp4", b"bbbb").await;
    let response = common::patch_json(
        app.router(),
        &format!("/api/v1/videos/{}", inside["id"]),
        json!({ "project_id": project_id, "batch_position": 2 }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let all = common::body_json(common::get(app.router(), "/api/v1/videos").await).await;
    assert_eq!(all["data"].as_array().unwrap().len(), 2);

    let filtered = common::body_json(
        common::get(app.router(), &format!("/api/v1/videos?project_id={project_id}")).await,
    )
    .await;
    let filtered = filtered["data"].as_array().unwrap();
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0]["id"], inside["id"]);
    assert_eq!(filtered[0]["batch_position"], 2);
    assert_eq!(filtered[0]["annotation_count"], 0);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn rename_rejects_blank_filename(pool: sqlx::PgPool) {
    let app = common::build_test_app(pool);
    let video = common::upload_video(&app, "a.mp4", b"aaaa").await;
    let uri = format!("/api/v1/videos/{}", video["id"]);

    let response = common::patch_json(app.router(), &uri, json!({ "filename": " " })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = common::patch_json(app.router(), &uri, json!({ "filename": "renamed.mp4" })).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = common::body_json(response).await;
    assert_eq!(json["data"]["filename"], "renamed.mp4");
    assert_eq!(json["data"]["filepath"], video["filepath"]);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn delete_removes_file_annotations_and_recordings(pool: sqlx::PgPool) {
    let app = common::build_test_app(pool);
    let video = common::upload_video(&app, "a.mp4", b"aaaa").await;
    let video_id = video["id"].as_i64().unwrap();
    let response = common::create_annotation(&app, video_id, "1.0", "2.5").await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let annotation = common::body_json(response).await["data"].clone();
    let audio = std::path::PathBuf::from(annotation["audio_filepath"].as_str().unwrap());
    assert!(audio.exists());
    let mut observer = app.observe().await;

    let response = common::delete(app.router(), &format!("/api/v1/videos/{video_id}")).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    assert!(!std::path::Path::new(video["filepath"].as_str().unwrap()).exists());
    assert!(!audio.exists());
    let response = common::get(
        app.router(),
        &format!("/api/v1/annotations/{}", annotation["id"]),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let events = common::drain_events(&mut observer);
    assert!(events
        .iter()
        .any(|e| e["type"] == "video_deleted" && e["video_id"] == video_id));
}

#[sqlx::test(migrations = "../db/migrations")]
async fn missing_video_returns_404(pool: sqlx::PgPool) {
    let app = common::build_test_app(pool);

    for response in [
        common::get(app.router(), "/api/v1/videos/999999").await,
        common::delete(app.router(), "/api/v1/videos/999999").await,
        common::patch_json(app.router(), "/api/v1/videos/999999", json!({ "filename": "x.mp4" }))
            .await,
    ] {
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}

// ---------------------------------------------------------------------------
// Local files
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn browse_lists_supported_files_and_registration_state(pool: sqlx::PgPool) {
    let app = common::build_test_app(pool);
    let library = tempfile::tempdir().unwrap();
    std::fs::write(library.path().join("b.mov"), b"bbb").unwrap();
    std::fs::write(library.path().join("a.mp4"), b"aaaa").unwrap();
    std::fs::write(library.path().join("readme.txt"), b"skip").unwrap();
    std::fs::create_dir(library.path().join("nested.mp4")).unwrap();
    let directory = library.path().canonicalize().unwrap();
    let browse_uri = format!("/api/v1/videos/local/browse?directory={}", directory.display());

    let json = common::body_json(common::get(app.router(), &browse_uri).await).await;
    let entries = json["data"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["filename"], "a.mp4");
    assert_eq!(entries[0]["file_size"], 4);
    assert_eq!(entries[0]["registered"], false);
    assert_eq!(entries[1]["filename"], "b.mov");

    let response = common::post_json(
        app.router(),
        "/api/v1/videos/local/register",
        json!({ "filepath": entries[0]["filepath"] }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let video = common::body_json(response).await["data"].clone();
    assert_eq!(video["source_type"], "local");
    assert_eq!(video["file_size"], 4);

    let json = common::body_json(common::get(app.router(), &browse_uri).await).await;
    assert_eq!(json["data"][0]["registered"], true);
    assert_eq!(json["data"][1]["registered"], false);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn local_registration_rules(pool: sqlx::PgPool) {
    let app = common::build_test_app(pool);
    let library = tempfile::tempdir().unwrap();
    let clip = library.path().join("clip.mp4");
    std::fs::write(&clip, common::sample_bytes(300)).unwrap();
    std::fs::write(library.path().join("notes.txt"), b"x").unwrap();
    let register = |path: std::path::PathBuf| {
        let router = app.router();
        async move {
            common::post_json(
                router,
                "/api/v1/videos/local/register",
                json!({ "filepath": path.display().to_string() }),
            )
            .await
        }
    };

    let response = register(clip.clone()).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let video = common::body_json(response).await["data"].clone();

    assert_eq!(register(clip.clone()).await.status(), StatusCode::CONFLICT);
    assert_eq!(
        register(library.path().join("notes.txt")).await.status(),
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        register(library.path().join("absent.mp4")).await.status(),
        StatusCode::BAD_REQUEST
    );

    // Local files are played in place and survive deletion of the record.
    let response = common::get_with_range(
        app.router(),
        &format!("/api/v1/videos/{}/file", video["id"]),
        "bytes=100-199",
    )
    .await;
    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(common::body_bytes(response).await, &common::sample_bytes(300)[100..200]);

    let response = common::delete(app.router(), &format!("/api/v1/videos/{}", video["id"])).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(clip.exists());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn browse_rejects_missing_directory(pool: sqlx::PgPool) {
    let app = common::build_test_app(pool);

    let response = common::get(
        app.router(),
        "/api/v1/videos/local/browse?directory=/definitely/not/here",
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Remote files
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn remote_registration_and_duplicates(pool: sqlx::PgPool) {
    let app = common::build_test_app(pool);
    let body = json!({
        "file_id": "1AbCdEf",
        "name": "session-3.mp4",
        "size": 123456,
        "duration_seconds": 61.5,
    });

    let response = common::post_json(app.router(), "/api/v1/remote/register", body.clone()).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let video = common::body_json(response).await["data"].clone();
    assert_eq!(video["source_type"], "remote");
    assert_eq!(video["mime_type"], "video/mp4");
    assert_eq!(video["duration_seconds"], 61.5);

    let response = common::post_json(app.router(), "/api/v1/remote/register", body).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn remote_registration_validates_input(pool: sqlx::PgPool) {
    let app = common::build_test_app(pool);

    for body in [
        json!({ "file_id": " ", "name": "a.mp4" }),
        json!({ "file_id": "abc", "name": "" }),
        json!({ "file_id": "abc", "name": "a.mp4", "size": -1 }),
    ] {
        let response = common::post_json(app.router(), "/api/v1/remote/register", body).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

#[sqlx::test(migrations = "../db/migrations")]
async fn remote_range_is_validated_before_contacting_upstream(pool: sqlx::PgPool) {
    let app = common::build_test_app(pool);
    let response = common::post_json(
        app.router(),
        "/api/v1/remote/register",
        json!({ "file_id": "xyz", "name": "r.mp4", "size": 1000 }),
    )
    .await;
    let video = common::body_json(response).await["data"].clone();
    let uri = format!("/api/v1/videos/{}/file", video["id"]);

    let response = common::get_with_range(app.router(), &uri, "bytes=990-2000").await;
    assert_eq!(response.status(), StatusCode::RANGE_NOT_SATISFIABLE);
    assert_eq!(
        response.headers()[axum::http::header::CONTENT_RANGE],
        "bytes */1000"
    );

    // The configured upstream is unreachable.
    let response = common::get_with_range(app.router(), &uri, "bytes=0-99").await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn unreachable_remote_folder_is_a_gateway_error(pool: sqlx::PgPool) {
    let app = common::build_test_app(pool);

    let response = common::get(app.router(), "/api/v1/remote/folders/folder123/videos").await;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let json = common::body_json(response).await;
    assert_eq!(json["code"], "UPSTREAM_ERROR");
}
