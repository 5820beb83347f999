pub mod auth;
pub mod lessons;
pub mod middleware;
pub mod products;
pub mod progress;
pub mod state;

pub use middleware::require_auth;

use axum::{http::StatusCode, Json};
use courseware_core::ports::PortError;
use serde::Serialize;
use tracing::error;
use utoipa::{OpenApi, ToSchema};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::register_handler,
        auth::login_handler,
        auth::logout_handler,
        products::list_products_handler,
        products::create_product_handler,
        products::get_product_handler,
        products::rename_product_handler,
        products::delete_product_handler,
        products::grant_access_handler,
        products::attach_lesson_handler,
        lessons::list_lessons_handler,
        lessons::create_lesson_handler,
        progress::list_progress_handler,
        progress::record_progress_handler,
        progress::update_progress_handler,
    ),
    components(
        schemas(
            Message,
            auth::RegisterRequest,
            auth::LoginRequest,
            products::CreateProductRequest,
            products::RenameProductRequest,
            products::GrantAccessRequest,
            products::AttachLessonRequest,
            products::UserResponse,
            products::ProductResponse,
            lessons::CreateLessonRequest,
            lessons::LessonResponse,
            progress::RecordProgressRequest,
            progress::UpdateProgressRequest,
            progress::ProgressResponse,
        )
    ),
    tags(
        (name = "Courseware API", description = "Course products, lessons and progress tracking.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Shared Response Plumbing
//=========================================================================================

/// The `{"message": ...}` body every error (and a few successes) carries.
#[derive(Serialize, ToSchema)]
pub struct Message {
    pub message: String,
}

impl Message {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

pub(crate) type ErrorResponse = (StatusCode, Json<Message>);

pub(crate) fn bad_request(message: impl Into<String>) -> ErrorResponse {
    (StatusCode::BAD_REQUEST, Json(Message::new(message)))
}

/// Maps core errors onto the HTTP taxonomy: validation failures are 400,
/// denied mutations 403, missing or hidden entities 404. Unexpected errors
/// are logged and reported without internal detail.
pub(crate) fn port_error_response(err: PortError) -> ErrorResponse {
    match &err {
        PortError::Validation(_) => (StatusCode::BAD_REQUEST, Json(Message::new(err.to_string()))),
        PortError::PermissionDenied => {
            (StatusCode::FORBIDDEN, Json(Message::new(err.to_string())))
        }
        PortError::NotFound(_) => (StatusCode::NOT_FOUND, Json(Message::new(err.to_string()))),
        PortError::Unexpected(_) => {
            error!("Request failed: {:?}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(Message::new("An internal error occurred")),
            )
        }
    }
}
