//! crates/courseware_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use uuid::Uuid;

// Represents a user - used throughout app
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub username: String,
}

// Only used internally for login/signup - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
}

// Represents a browser login session (auth cookie)
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub id: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// A single lesson: a named video with a known duration.
/// Lessons are immutable after creation.
#[derive(Debug, Clone)]
pub struct Lesson {
    pub id: Uuid,
    pub name: String,
    pub video_url: String,
    pub duration_secs: u32,
}

/// A purchasable bundle of lessons with exactly one owning user.
/// The lesson set is many-to-many: a lesson may belong to several products.
#[derive(Debug, Clone)]
pub struct Product {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
}

/// A grant giving one user viewing rights to one product.
#[derive(Debug, Clone)]
pub struct ProductAccess {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// A user's cumulative watch state for one lesson.
/// At most one record exists per (user, lesson) pair.
#[derive(Debug, Clone)]
pub struct LessonProgress {
    pub id: Uuid,
    pub user_id: Uuid,
    pub lesson_id: Uuid,
    pub time_watched_secs: u32,
    pub completed: bool,
}
