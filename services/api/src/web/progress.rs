//! services/api/src/web/progress.rs
//!
//! Lesson-progress endpoints. The acting user always comes from the
//! session, never from the request body.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use courseware_core::{progress, view};

use crate::web::middleware::CurrentUser;
use crate::web::products::ProductResponse;
use crate::web::state::AppState;
use crate::web::{port_error_response, ErrorResponse, Message};

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct RecordProgressRequest {
    pub lesson: Uuid,
    /// Seconds watched so far; negative values are rejected at parse time.
    pub time_watched: u32,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateProgressRequest {
    pub time_watched: u32,
}

#[derive(Serialize, ToSchema)]
pub struct ProgressResponse {
    pub id: Uuid,
    pub user: Uuid,
    pub lesson: Uuid,
    pub time_watched: u32,
    pub completed: bool,
    pub products: Vec<ProductResponse>,
}

impl From<view::ProgressView> for ProgressResponse {
    fn from(v: view::ProgressView) -> Self {
        Self {
            id: v.id,
            user: v.user_id,
            lesson: v.lesson_id,
            time_watched: v.time_watched_secs,
            completed: v.completed,
            products: v.products.into_iter().map(ProductResponse::from).collect(),
        }
    }
}

//=========================================================================================
// Handlers
//=========================================================================================

/// GET /lesson-progress - The caller's progress records
#[utoipa::path(
    get,
    path = "/lesson-progress",
    responses(
        (status = 200, description = "The caller's progress records", body = [ProgressResponse]),
        (status = 401, description = "Not logged in")
    )
)]
pub async fn list_progress_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ErrorResponse> {
    let records = state
        .db
        .list_progress(user_id)
        .await
        .map_err(port_error_response)?;

    let mut responses = Vec::with_capacity(records.len());
    for record in &records {
        let shaped = view::progress_view(state.db.as_ref(), record)
            .await
            .map_err(port_error_response)?;
        responses.push(ProgressResponse::from(shaped));
    }
    Ok(Json(responses))
}

/// POST /lesson-progress - Record watched time for a lesson (creation only)
#[utoipa::path(
    post,
    path = "/lesson-progress",
    request_body = RecordProgressRequest,
    responses(
        (status = 201, description = "Progress recorded", body = ProgressResponse),
        (status = 400, description = "Progress already recorded for this lesson", body = Message),
        (status = 404, description = "Unknown lesson", body = Message),
        (status = 401, description = "Not logged in")
    )
)]
pub async fn record_progress_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Json(req): Json<RecordProgressRequest>,
) -> Result<impl IntoResponse, ErrorResponse> {
    let record = progress::record_progress(state.db.as_ref(), user_id, req.lesson, req.time_watched)
        .await
        .map_err(port_error_response)?;
    let shaped = view::progress_view(state.db.as_ref(), &record)
        .await
        .map_err(port_error_response)?;
    Ok((StatusCode::CREATED, Json(ProgressResponse::from(shaped))))
}

/// PUT /lesson-progress/{lesson} - Update watched time for a lesson
#[utoipa::path(
    put,
    path = "/lesson-progress/{lesson}",
    params(("lesson" = Uuid, Path, description = "Lesson id")),
    request_body = UpdateProgressRequest,
    responses(
        (status = 200, description = "Progress updated", body = ProgressResponse),
        (status = 404, description = "No progress recorded for this lesson", body = Message),
        (status = 401, description = "Not logged in")
    )
)]
pub async fn update_progress_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path(lesson): Path<Uuid>,
    Json(req): Json<UpdateProgressRequest>,
) -> Result<impl IntoResponse, ErrorResponse> {
    let record = progress::update_progress(state.db.as_ref(), user_id, lesson, req.time_watched)
        .await
        .map_err(port_error_response)?;
    let shaped = view::progress_view(state.db.as_ref(), &record)
        .await
        .map_err(port_error_response)?;
    Ok(Json(ProgressResponse::from(shaped)))
}
