//! Handlers for the `/annotations` resource.
//!
//! Creating an annotation stores its audio recording and starts the
//! transcription pipeline in the background; the response does not wait
//! for it.

use std::path::Path as FsPath;

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use elicit_core::annotation::{
    audio_filename, validate_feedback, validate_feedback_choices, validate_segment,
};
use elicit_core::error::CoreError;
use elicit_core::live_events::LiveEvent;
use elicit_core::pipeline::{check_manual_edit, resume_point, Track, TrackStatus};
use elicit_core::types::DbId;
use elicit_db::models::annotation::{
    Annotation, AnnotationFeedback, CreateAnnotation, UpdateAnnotation,
};
use elicit_db::repositories::{AnnotationRepo, VideoRepo};

use crate::error::{AppError, AppResult};
use crate::handlers::files::{parse_field, remove_file_quietly, save_field, PartialFile};
use crate::query::AnnotationListParams;
use crate::response::DataResponse;
use crate::state::AppState;

fn annotation_not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "Annotation",
        id,
    })
}

fn parse_status(requested: Option<&str>) -> AppResult<Option<TrackStatus>> {
    Ok(requested.map(TrackStatus::parse).transpose()?)
}

/// GET /api/v1/annotations?video_id=
///
/// Ordered by segment start.
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<AnnotationListParams>,
) -> AppResult<Json<DataResponse<Vec<Annotation>>>> {
    let annotations = AnnotationRepo::list_by_video(&state.pool, params.video_id).await?;
    Ok(Json(DataResponse { data: annotations }))
}

/// POST /api/v1/annotations
///
/// Multipart fields: `video_id`, `start_time`, `end_time` and the recording
/// as `audio`. Answers 201 as soon as the row exists; transcription and
/// enrichment progress is reported over the WebSocket channel.
pub async fn create(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<DataResponse<Annotation>>)> {
    let audio_dir = state.config.audio_dir();
    tokio::fs::create_dir_all(&audio_dir)
        .await
        .map_err(|e| AppError::InternalError(format!("Failed to create audio dir: {e}")))?;

    let mut video_id: Option<DbId> = None;
    let mut start_time: Option<f64> = None;
    let mut end_time: Option<f64> = None;
    let mut audio: Option<(String, PartialFile)> = None;

    let received: AppResult<()> = async {
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?
        {
            let name = field.name().unwrap_or("").to_string();
            match name.as_str() {
                "video_id" => video_id = Some(parse_field(field, "video_id").await?),
                "start_time" => start_time = Some(parse_field(field, "start_time").await?),
                "end_time" => end_time = Some(parse_field(field, "end_time").await?),
                "audio" | "audio_blob" => {
                    if audio.is_some() {
                        return Err(AppError::BadRequest(
                            "Only one audio recording may be sent".into(),
                        ));
                    }
                    let filename = audio_filename(&uuid::Uuid::new_v4().simple().to_string());
                    let (file, _) = save_field(field, audio_dir.join(&filename), None).await?;
                    audio = Some((filename, file));
                }
                _ => {}
            }
        }
        Ok(())
    }
    .await;

    received?;
    let (input, audio) = validate_create(&state, video_id, start_time, end_time, audio).await?;
    let annotation = AnnotationRepo::create(&state.pool, &input).await?;
    audio.keep();
    let video_id = annotation.video_id;
    tracing::info!(
        annotation_id = annotation.id,
        video_id,
        start_time = annotation.start_time,
        end_time = annotation.end_time,
        "Annotation created",
    );

    state
        .ws_manager
        .broadcast_event(&LiveEvent::AnnotationCreated {
            annotation_id: annotation.id,
            video_id,
        })
        .await;
    state.pipeline.enqueue(annotation.id, Track::Transcription);

    Ok((StatusCode::CREATED, Json(DataResponse { data: annotation })))
}

/// Check the received fields and build the row to insert, handing back the
/// recording it points at.
async fn validate_create(
    state: &AppState,
    video_id: Option<DbId>,
    start_time: Option<f64>,
    end_time: Option<f64>,
    audio: Option<(String, PartialFile)>,
) -> AppResult<(CreateAnnotation, PartialFile)> {
    let missing = |field: &str| AppError::BadRequest(format!("Missing required '{field}' field"));
    let video_id = video_id.ok_or_else(|| missing("video_id"))?;
    let start_time = start_time.ok_or_else(|| missing("start_time"))?;
    let end_time = end_time.ok_or_else(|| missing("end_time"))?;
    let (audio_filename, audio) = audio.ok_or_else(|| missing("audio"))?;

    VideoRepo::find_by_id(&state.pool, video_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Video",
            id: video_id,
        }))?;
    validate_segment(start_time, end_time)?;

    let input = CreateAnnotation {
        video_id,
        start_time,
        end_time,
        audio_filename,
        audio_filepath: audio.path().to_string_lossy().into_owned(),
    };
    Ok((input, audio))
}

/// GET /api/v1/annotations/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Annotation>>> {
    let annotation = AnnotationRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| annotation_not_found(id))?;
    Ok(Json(DataResponse { data: annotation }))
}

/// PUT /api/v1/annotations/{id}
///
/// Partial update: omitted fields are left untouched. Status changes must
/// follow the track state machine, and `processing` is reserved for the
/// pipeline. Answers 409 if the statuses change before the write lands.
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateAnnotation>,
) -> AppResult<Json<DataResponse<Annotation>>> {
    let current = AnnotationRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| annotation_not_found(id))?;

    if input.start_time.is_some() || input.end_time.is_some() {
        validate_segment(
            input.start_time.unwrap_or(current.start_time),
            input.end_time.unwrap_or(current.end_time),
        )?;
    }
    let statuses = (
        current.status_of(Track::Transcription)?,
        current.status_of(Track::Enrichment)?,
    );
    check_manual_edit(
        statuses,
        parse_status(input.transcription_status.as_deref())?,
        parse_status(input.extended_transcript_status.as_deref())?,
    )?;
    if let Some(feedback) = input.feedback {
        validate_feedback(feedback)?;
    }
    if let Some(choices) = &input.feedback_choices {
        validate_feedback_choices(choices)?;
    }

    let Some(annotation) = AnnotationRepo::update(&state.pool, id, &input, statuses).await? else {
        // Either deleted or moved on by the pipeline since it was read.
        AnnotationRepo::find_by_id(&state.pool, id)
            .await?
            .ok_or_else(|| annotation_not_found(id))?;
        return Err(AppError::Core(CoreError::Conflict(format!(
            "Annotation {id} changed while it was being updated; reload and retry"
        ))));
    };

    state
        .ws_manager
        .broadcast_event(&LiveEvent::AnnotationUpdated {
            annotation_id: id,
            video_id: annotation.video_id,
        })
        .await;
    Ok(Json(DataResponse { data: annotation }))
}

/// DELETE /api/v1/annotations/{id}
///
/// Also removes the audio recording.
pub async fn delete(State(state): State<AppState>, Path(id): Path<DbId>) -> AppResult<StatusCode> {
    let annotation = AnnotationRepo::delete(&state.pool, id)
        .await?
        .ok_or_else(|| annotation_not_found(id))?;
    remove_file_quietly(FsPath::new(&annotation.audio_filepath)).await;
    tracing::info!(annotation_id = id, "Annotation deleted");

    state
        .ws_manager
        .broadcast_event(&LiveEvent::AnnotationDeleted {
            annotation_id: id,
            video_id: annotation.video_id,
        })
        .await;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/annotations/{id}/feedback
pub async fn submit_feedback(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<AnnotationFeedback>,
) -> AppResult<Json<DataResponse<Annotation>>> {
    validate_feedback(input.feedback)?;
    validate_feedback_choices(&input.feedback_choices)?;

    let annotation =
        AnnotationRepo::set_feedback(&state.pool, id, input.feedback, &input.feedback_choices)
            .await?
            .ok_or_else(|| annotation_not_found(id))?;
    tracing::info!(
        annotation_id = id,
        feedback = if input.feedback == 1 { "positive" } else { "negative" },
        "Feedback submitted",
    );

    state
        .ws_manager
        .broadcast_event(&LiveEvent::AnnotationUpdated {
            annotation_id: id,
            video_id: annotation.video_id,
        })
        .await;
    Ok(Json(DataResponse { data: annotation }))
}

/// POST /api/v1/annotations/{id}/retry
///
/// Resets failed tracks to `pending` and restarts the pipeline from the
/// first unfinished track. 409 when no track has failed.
pub async fn retry(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<(StatusCode, Json<DataResponse<Annotation>>)> {
    let before = AnnotationRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| annotation_not_found(id))?;
    let no_failure = || {
        AppError::Core(CoreError::Conflict(format!(
            "Annotation {id} has no failed track to retry"
        )))
    };

    let annotation = AnnotationRepo::reset_failed_tracks(&state.pool, id)
        .await?
        .ok_or_else(no_failure)?;

    for track in Track::ORDER {
        if before.status_of(track)? == TrackStatus::Failed {
            state
                .ws_manager
                .broadcast_event(&LiveEvent::track_status(track, id, TrackStatus::Pending))
                .await;
        }
    }

    let from = resume_point(
        annotation.status_of(Track::Transcription)?,
        annotation.status_of(Track::Enrichment)?,
    )
    .ok_or_else(no_failure)?;
    tracing::info!(annotation_id = id, track = from.as_str(), "Retrying annotation");
    state.pipeline.enqueue(id, from);

    Ok((StatusCode::ACCEPTED, Json(DataResponse { data: annotation })))
}
