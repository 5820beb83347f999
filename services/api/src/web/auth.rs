//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for user registration, login, and logout.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::{Duration, Utc};
use serde::Deserialize;
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::middleware::session_id_from_headers;
use crate::web::state::AppState;
use crate::web::{bad_request, port_error_response, ErrorResponse, Message};

//=========================================================================================
// Request Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub username: String,
    pub password1: String,
    pub password2: String,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

//=========================================================================================
// Password and Session Helpers
//=========================================================================================

/// The two strength rules registration enforces.
fn validate_password(password: &str) -> Result<(), String> {
    if password.chars().count() < 8 {
        return Err(
            "This password is too short. It must contain at least 8 characters.".to_string(),
        );
    }
    if password.chars().all(|c| c.is_ascii_digit()) {
        return Err("This password is entirely numeric.".to_string());
    }
    Ok(())
}

/// Opens a DB-backed login session and returns the Set-Cookie value for it.
async fn start_session(state: &AppState, user_id: Uuid) -> Result<String, ErrorResponse> {
    let session_id = Uuid::new_v4().to_string();
    let ttl = Duration::days(state.config.session_ttl_days);
    let expires_at = Utc::now() + ttl;

    state
        .db
        .create_auth_session(&session_id, user_id, expires_at)
        .await
        .map_err(|e| {
            error!("Failed to create auth session: {:?}", e);
            port_error_response(e)
        })?;

    Ok(format!(
        "session={}; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age={}",
        session_id,
        ttl.num_seconds()
    ))
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /register - Create a new user account and log it in
#[utoipa::path(
    post,
    path = "/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registration successful", body = Message),
        (status = 400, description = "Taken username, mismatched passwords or weak password", body = Message),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ErrorResponse> {
    let username = req.username.trim();
    if username.is_empty() {
        return Err(bad_request("Username must not be empty"));
    }
    if req.password1 != req.password2 {
        return Err(bad_request("Passwords do not match"));
    }
    validate_password(&req.password1).map_err(bad_request)?;

    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password1.as_bytes(), &salt)
        .map_err(|e| {
            error!("Failed to hash password: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(Message::new("Failed to hash password")),
            )
        })?
        .to_string();

    // "Username already taken" surfaces here as a validation error.
    let user = state
        .db
        .create_user(username, &password_hash)
        .await
        .map_err(port_error_response)?;

    // Registration logs the new user in right away.
    let cookie = start_session(&state, user.id).await?;

    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, cookie)],
        Json(Message::new("Registration successful")),
    ))
}

/// POST /login - Login with existing account
#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = Message),
        (status = 400, description = "Invalid credentials", body = Message),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ErrorResponse> {
    // An unknown username and a wrong password are indistinguishable to the caller.
    let invalid_credentials = || bad_request("Invalid credentials");

    let user_creds = state
        .db
        .get_user_by_username(&req.username)
        .await
        .map_err(|_| invalid_credentials())?;

    let parsed_hash = PasswordHash::new(&user_creds.password_hash).map_err(|e| {
        error!("Failed to parse password hash: {:?}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(Message::new("Authentication error")),
        )
    })?;

    let valid = Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .is_ok();
    if !valid {
        return Err(invalid_credentials());
    }

    let cookie = start_session(&state, user_creds.id).await?;

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(Message::new("Login successful")),
    ))
}

/// POST /logout - Invalidate the current session, if any
#[utoipa::path(
    post,
    path = "/logout",
    responses(
        (status = 200, description = "Logout successful", body = Message)
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ErrorResponse> {
    // Logout succeeds whether or not a session exists.
    if let Some(session_id) = session_id_from_headers(&headers) {
        state
            .db
            .delete_auth_session(session_id)
            .await
            .map_err(|e| {
                error!("Failed to delete auth session: {:?}", e);
                port_error_response(e)
            })?;
    }

    let cookie = "session=; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age=0";
    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie.to_string())],
        Json(Message::new("Logout successful")),
    ))
}

#[cfg(test)]
mod tests {
    use super::validate_password;

    #[test]
    fn short_passwords_are_rejected() {
        assert!(validate_password("abc1234").is_err());
        assert!(validate_password("abcd1234").is_ok());
    }

    #[test]
    fn entirely_numeric_passwords_are_rejected() {
        assert!(validate_password("12345678").is_err());
        assert!(validate_password("12345678a").is_ok());
    }
}
