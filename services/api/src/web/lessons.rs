//! services/api/src/web/lessons.rs
//!
//! Lesson endpoints: the caller's reachable lessons with watch state, and
//! lesson creation.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use courseware_core::view;

use crate::web::middleware::CurrentUser;
use crate::web::state::AppState;
use crate::web::{bad_request, port_error_response, ErrorResponse, Message};

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct CreateLessonRequest {
    pub name: String,
    pub video_url: String,
    /// Lesson length in seconds.
    pub duration: u32,
}

/// A lesson with the viewer's watch state folded in.
#[derive(Serialize, ToSchema)]
pub struct LessonResponse {
    pub id: Uuid,
    pub name: String,
    pub video_url: String,
    pub duration: u32,
    pub time_watched: u32,
    pub completed: bool,
}

impl From<view::LessonView> for LessonResponse {
    fn from(v: view::LessonView) -> Self {
        Self {
            id: v.id,
            name: v.name,
            video_url: v.video_url,
            duration: v.duration_secs,
            time_watched: v.time_watched_secs,
            completed: v.completed,
        }
    }
}

//=========================================================================================
// Handlers
//=========================================================================================

/// GET /lessons - Lessons reachable through the caller's accessible products
#[utoipa::path(
    get,
    path = "/lessons",
    responses(
        (status = 200, description = "Accessible lessons", body = [LessonResponse]),
        (status = 401, description = "Not logged in")
    )
)]
pub async fn list_lessons_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ErrorResponse> {
    let views = view::accessible_lesson_views(state.db.as_ref(), user_id)
        .await
        .map_err(port_error_response)?;
    Ok(Json(
        views.into_iter().map(LessonResponse::from).collect::<Vec<_>>(),
    ))
}

/// POST /lessons - Create a lesson
#[utoipa::path(
    post,
    path = "/lessons",
    request_body = CreateLessonRequest,
    responses(
        (status = 201, description = "Lesson created", body = LessonResponse),
        (status = 400, description = "Invalid lesson fields", body = Message),
        (status = 401, description = "Not logged in")
    )
)]
pub async fn create_lesson_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(_user_id)): Extension<CurrentUser>,
    Json(req): Json<CreateLessonRequest>,
) -> Result<impl IntoResponse, ErrorResponse> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(bad_request("Lesson name must not be empty"));
    }
    let video_url = req.video_url.trim();
    if video_url.is_empty() {
        return Err(bad_request("Lesson video URL must not be empty"));
    }

    let lesson = state
        .db
        .create_lesson(name, video_url, req.duration)
        .await
        .map_err(port_error_response)?;

    // A brand-new lesson has no watch state for anyone yet.
    let shaped = view::shape_lesson(&lesson, None);
    Ok((StatusCode::CREATED, Json(LessonResponse::from(shaped))))
}
