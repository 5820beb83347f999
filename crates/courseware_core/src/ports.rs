//! crates/courseware_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or APIs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{Lesson, LessonProgress, Product, ProductAccess, User, UserCredentials};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Validation(String),
    #[error("Permission denied")]
    PermissionDenied,
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- User Management ---

    /// Fails with `PortError::Validation` when the username is already taken.
    async fn create_user(&self, username: &str, password_hash: &str) -> PortResult<User>;

    async fn get_user_by_username(&self, username: &str) -> PortResult<UserCredentials>;

    /// Batched lookup used when shaping product owners.
    async fn users_by_ids(&self, ids: &[Uuid]) -> PortResult<Vec<User>>;

    // --- Auth Methods ---
    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    /// Resolves a session id to its user, rejecting unknown or expired sessions.
    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;

    // --- Lesson Management ---
    async fn create_lesson(
        &self,
        name: &str,
        video_url: &str,
        duration_secs: u32,
    ) -> PortResult<Lesson>;

    async fn get_lesson(&self, lesson_id: Uuid) -> PortResult<Lesson>;

    /// All (product_id, lesson) pairs for the given products, in one query.
    /// A lesson attached to several of the products appears once per product.
    async fn lessons_by_product(&self, product_ids: &[Uuid]) -> PortResult<Vec<(Uuid, Lesson)>>;

    // --- Product Management ---

    /// Creates the product AND the owner's access grant in a single
    /// transaction: either both rows persist or neither does.
    async fn create_product(&self, owner_id: Uuid, name: &str) -> PortResult<Product>;

    async fn get_product(&self, product_id: Uuid) -> PortResult<Product>;

    async fn rename_product(&self, product_id: Uuid, name: &str) -> PortResult<Product>;

    async fn delete_product(&self, product_id: Uuid) -> PortResult<()>;

    /// Attaches an existing lesson to a product. Idempotent.
    async fn attach_lesson(&self, product_id: Uuid, lesson_id: Uuid) -> PortResult<()>;

    // --- Access Grants ---

    /// Inserts an access grant. Idempotent: re-granting returns the
    /// existing grant instead of creating a duplicate row.
    async fn insert_access(&self, user_id: Uuid, product_id: Uuid) -> PortResult<ProductAccess>;

    /// Every product the user holds a grant for, each exactly once.
    async fn products_accessible_to(&self, user_id: Uuid) -> PortResult<Vec<Product>>;

    async fn has_access(&self, user_id: Uuid, product_id: Uuid) -> PortResult<bool>;

    // --- Lesson Progress ---

    /// Fails with `PortError::Validation` when a record for the
    /// (user, lesson) pair already exists.
    async fn insert_progress(
        &self,
        user_id: Uuid,
        lesson_id: Uuid,
        time_watched_secs: u32,
        completed: bool,
    ) -> PortResult<LessonProgress>;

    async fn get_progress(
        &self,
        user_id: Uuid,
        lesson_id: Uuid,
    ) -> PortResult<Option<LessonProgress>>;

    /// The user's progress for the given lessons, in one query.
    async fn progress_for_lessons(
        &self,
        user_id: Uuid,
        lesson_ids: &[Uuid],
    ) -> PortResult<Vec<LessonProgress>>;

    async fn list_progress(&self, user_id: Uuid) -> PortResult<Vec<LessonProgress>>;

    async fn set_progress(
        &self,
        progress_id: Uuid,
        time_watched_secs: u32,
        completed: bool,
    ) -> PortResult<LessonProgress>;

    /// Products denormalized onto a progress record for reporting.
    /// No workflow populates the relation; this is usually empty.
    async fn products_for_progress(&self, progress_id: Uuid) -> PortResult<Vec<Product>>;
}
