//! services/api/src/web/products.rs
//!
//! Product endpoints: listing and reading what the caller may see,
//! creation with the owner's self-grant, and owner-only mutations.

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

use courseware_core::{access, view};

use crate::web::lessons::LessonResponse;
use crate::web::middleware::CurrentUser;
use crate::web::state::AppState;
use crate::web::{port_error_response, ErrorResponse, Message};

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct CreateProductRequest {
    pub name: String,
}

#[derive(Deserialize, ToSchema)]
pub struct RenameProductRequest {
    pub name: String,
}

#[derive(Deserialize, ToSchema)]
pub struct GrantAccessRequest {
    pub username: String,
}

#[derive(Deserialize, ToSchema)]
pub struct AttachLessonRequest {
    pub lesson: Uuid,
}

/// The minimal owner identity embedded in product responses.
#[derive(Serialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
}

impl From<view::UserView> for UserResponse {
    fn from(v: view::UserView) -> Self {
        Self {
            id: v.id,
            username: v.username,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct ProductResponse {
    pub id: Uuid,
    pub name: String,
    pub owner: UserResponse,
    pub lessons: Vec<LessonResponse>,
}

impl From<view::ProductView> for ProductResponse {
    fn from(v: view::ProductView) -> Self {
        Self {
            id: v.id,
            name: v.name,
            owner: v.owner.into(),
            lessons: v.lessons.into_iter().map(LessonResponse::from).collect(),
        }
    }
}

//=========================================================================================
// Handlers
//=========================================================================================

/// GET /products - Products visible to the caller, shaped with watch state
#[utoipa::path(
    get,
    path = "/products",
    responses(
        (status = 200, description = "Accessible products", body = [ProductResponse]),
        (status = 401, description = "Not logged in")
    )
)]
pub async fn list_products_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ErrorResponse> {
    let views = view::accessible_product_views(state.db.as_ref(), user_id)
        .await
        .map_err(port_error_response)?;
    Ok(Json(
        views.into_iter().map(ProductResponse::from).collect::<Vec<_>>(),
    ))
}

/// POST /products - Create a product owned by the caller
#[utoipa::path(
    post,
    path = "/products",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created", body = ProductResponse),
        (status = 400, description = "Invalid product name", body = Message),
        (status = 401, description = "Not logged in")
    )
)]
pub async fn create_product_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Json(req): Json<CreateProductRequest>,
) -> Result<impl IntoResponse, ErrorResponse> {
    let product = access::create_product(state.db.as_ref(), user_id, &req.name)
        .await
        .map_err(port_error_response)?;
    let shaped = view::product_view(state.db.as_ref(), user_id, product)
        .await
        .map_err(port_error_response)?;
    Ok((StatusCode::CREATED, Json(ProductResponse::from(shaped))))
}

/// GET /products/{id} - One accessible product
#[utoipa::path(
    get,
    path = "/products/{id}",
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 200, description = "The product", body = ProductResponse),
        (status = 404, description = "Unknown or inaccessible product", body = Message),
        (status = 401, description = "Not logged in")
    )
)]
pub async fn get_product_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ErrorResponse> {
    let product = access::require_access(state.db.as_ref(), user_id, id)
        .await
        .map_err(port_error_response)?;
    let shaped = view::product_view(state.db.as_ref(), user_id, product)
        .await
        .map_err(port_error_response)?;
    Ok(Json(ProductResponse::from(shaped)))
}

/// PUT /products/{id} - Rename a product (owner only)
#[utoipa::path(
    put,
    path = "/products/{id}",
    params(("id" = Uuid, Path, description = "Product id")),
    request_body = RenameProductRequest,
    responses(
        (status = 200, description = "Renamed product", body = ProductResponse),
        (status = 400, description = "Invalid product name", body = Message),
        (status = 403, description = "Caller does not own the product", body = Message),
        (status = 404, description = "Unknown product", body = Message)
    )
)]
pub async fn rename_product_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<RenameProductRequest>,
) -> Result<impl IntoResponse, ErrorResponse> {
    let product = state
        .db
        .get_product(id)
        .await
        .map_err(port_error_response)?;
    access::authorize_product_mutation(&product, user_id).map_err(port_error_response)?;

    let renamed = access::rename_product(state.db.as_ref(), id, &req.name)
        .await
        .map_err(port_error_response)?;
    let shaped = view::product_view(state.db.as_ref(), user_id, renamed)
        .await
        .map_err(port_error_response)?;
    Ok(Json(ProductResponse::from(shaped)))
}

/// DELETE /products/{id} - Delete a product (owner only)
#[utoipa::path(
    delete,
    path = "/products/{id}",
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 204, description = "Product deleted"),
        (status = 403, description = "Caller does not own the product", body = Message),
        (status = 404, description = "Unknown product", body = Message)
    )
)]
pub async fn delete_product_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ErrorResponse> {
    let product = state
        .db
        .get_product(id)
        .await
        .map_err(port_error_response)?;
    access::authorize_product_mutation(&product, user_id).map_err(port_error_response)?;

    state
        .db
        .delete_product(id)
        .await
        .map_err(port_error_response)?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /products/{id}/access - Grant another user access (owner only)
#[utoipa::path(
    post,
    path = "/products/{id}/access",
    params(("id" = Uuid, Path, description = "Product id")),
    request_body = GrantAccessRequest,
    responses(
        (status = 201, description = "Access granted", body = Message),
        (status = 403, description = "Caller does not own the product", body = Message),
        (status = 404, description = "Unknown product or user", body = Message)
    )
)]
pub async fn grant_access_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<GrantAccessRequest>,
) -> Result<impl IntoResponse, ErrorResponse> {
    let product = state
        .db
        .get_product(id)
        .await
        .map_err(port_error_response)?;
    access::authorize_product_mutation(&product, user_id).map_err(port_error_response)?;

    let grantee = state
        .db
        .get_user_by_username(&req.username)
        .await
        .map_err(port_error_response)?;

    // Re-granting is a no-op, so this endpoint is safe to retry.
    access::grant_access(state.db.as_ref(), grantee.id, product.id)
        .await
        .map_err(port_error_response)?;
    Ok((StatusCode::CREATED, Json(Message::new("Access granted"))))
}

/// POST /products/{id}/lessons - Attach an existing lesson (owner only)
#[utoipa::path(
    post,
    path = "/products/{id}/lessons",
    params(("id" = Uuid, Path, description = "Product id")),
    request_body = AttachLessonRequest,
    responses(
        (status = 204, description = "Lesson attached"),
        (status = 403, description = "Caller does not own the product", body = Message),
        (status = 404, description = "Unknown product or lesson", body = Message)
    )
)]
pub async fn attach_lesson_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<AttachLessonRequest>,
) -> Result<impl IntoResponse, ErrorResponse> {
    let product = state
        .db
        .get_product(id)
        .await
        .map_err(port_error_response)?;
    access::authorize_product_mutation(&product, user_id).map_err(port_error_response)?;

    state
        .db
        .get_lesson(req.lesson)
        .await
        .map_err(port_error_response)?;
    state
        .db
        .attach_lesson(product.id, req.lesson)
        .await
        .map_err(port_error_response)?;
    Ok(StatusCode::NO_CONTENT)
}
