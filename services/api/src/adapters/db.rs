//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use courseware_core::domain::{Lesson, LessonProgress, Product, ProductAccess, User, UserCredentials};
use courseware_core::ports::{DatabaseService, PortError, PortResult};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

//=========================================================================================
// Error Mapping Helpers
//=========================================================================================

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

fn not_found(e: sqlx::Error, what: String) -> PortError {
    match e {
        sqlx::Error::RowNotFound => PortError::NotFound(what),
        _ => unexpected(e),
    }
}

/// Maps a violation of the named unique constraint to a validation error
/// with a caller-facing message; everything else stays unexpected.
fn unique_violation(e: sqlx::Error, constraint: &str, message: &str) -> PortError {
    match &e {
        sqlx::Error::Database(db) if db.constraint() == Some(constraint) => {
            PortError::Validation(message.to_string())
        }
        _ => unexpected(e),
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    id: Uuid,
    username: String,
}
impl UserRecord {
    fn to_domain(self) -> User {
        User {
            id: self.id,
            username: self.username,
        }
    }
}

#[derive(FromRow)]
struct UserCredentialsRecord {
    id: Uuid,
    username: String,
    password_hash: String,
}
impl UserCredentialsRecord {
    fn to_domain(self) -> UserCredentials {
        UserCredentials {
            id: self.id,
            username: self.username,
            password_hash: self.password_hash,
        }
    }
}

#[derive(FromRow)]
struct LessonRecord {
    id: Uuid,
    name: String,
    video_url: String,
    duration_secs: i32,
}
impl LessonRecord {
    fn to_domain(self) -> Lesson {
        Lesson {
            id: self.id,
            name: self.name,
            video_url: self.video_url,
            duration_secs: self.duration_secs as u32,
        }
    }
}

#[derive(FromRow)]
struct ProductLessonRecord {
    product_id: Uuid,
    id: Uuid,
    name: String,
    video_url: String,
    duration_secs: i32,
}
impl ProductLessonRecord {
    fn to_domain(self) -> (Uuid, Lesson) {
        (
            self.product_id,
            Lesson {
                id: self.id,
                name: self.name,
                video_url: self.video_url,
                duration_secs: self.duration_secs as u32,
            },
        )
    }
}

#[derive(FromRow)]
struct ProductRecord {
    id: Uuid,
    owner_id: Uuid,
    name: String,
}
impl ProductRecord {
    fn to_domain(self) -> Product {
        Product {
            id: self.id,
            owner_id: self.owner_id,
            name: self.name,
        }
    }
}

#[derive(FromRow)]
struct AccessRecord {
    id: Uuid,
    user_id: Uuid,
    product_id: Uuid,
    created_at: DateTime<Utc>,
}
impl AccessRecord {
    fn to_domain(self) -> ProductAccess {
        ProductAccess {
            id: self.id,
            user_id: self.user_id,
            product_id: self.product_id,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct ProgressRecord {
    id: Uuid,
    user_id: Uuid,
    lesson_id: Uuid,
    time_watched_secs: i32,
    completed: bool,
}
impl ProgressRecord {
    fn to_domain(self) -> LessonProgress {
        LessonProgress {
            id: self.id,
            user_id: self.user_id,
            lesson_id: self.lesson_id,
            time_watched_secs: self.time_watched_secs as u32,
            completed: self.completed,
        }
    }
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn create_user(&self, username: &str, password_hash: &str) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "INSERT INTO users (id, username, password_hash) VALUES ($1, $2, $3) \
             RETURNING id, username",
        )
        .bind(Uuid::new_v4())
        .bind(username)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| unique_violation(e, "users_username_key", "Username already taken"))?;
        Ok(record.to_domain())
    }

    async fn get_user_by_username(&self, username: &str) -> PortResult<UserCredentials> {
        let record = sqlx::query_as::<_, UserCredentialsRecord>(
            "SELECT id, username, password_hash FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found(e, format!("User {username} not found")))?;
        Ok(record.to_domain())
    }

    async fn users_by_ids(&self, ids: &[Uuid]) -> PortResult<Vec<User>> {
        let records = sqlx::query_as::<_, UserRecord>(
            "SELECT id, username FROM users WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(session_id)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        let user_id = sqlx::query_scalar::<_, Uuid>(
            "SELECT user_id FROM auth_sessions WHERE id = $1 AND expires_at > now()",
        )
        .bind(session_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::PermissionDenied,
            _ => unexpected(e),
        })?;
        Ok(user_id)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn create_lesson(
        &self,
        name: &str,
        video_url: &str,
        duration_secs: u32,
    ) -> PortResult<Lesson> {
        let record = sqlx::query_as::<_, LessonRecord>(
            "INSERT INTO lessons (id, name, video_url, duration_secs) VALUES ($1, $2, $3, $4) \
             RETURNING id, name, video_url, duration_secs",
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(video_url)
        .bind(duration_secs as i32)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn get_lesson(&self, lesson_id: Uuid) -> PortResult<Lesson> {
        let record = sqlx::query_as::<_, LessonRecord>(
            "SELECT id, name, video_url, duration_secs FROM lessons WHERE id = $1",
        )
        .bind(lesson_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found(e, format!("Lesson {lesson_id} not found")))?;
        Ok(record.to_domain())
    }

    async fn lessons_by_product(&self, product_ids: &[Uuid]) -> PortResult<Vec<(Uuid, Lesson)>> {
        let records = sqlx::query_as::<_, ProductLessonRecord>(
            "SELECT pl.product_id, l.id, l.name, l.video_url, l.duration_secs \
             FROM product_lessons pl \
             JOIN lessons l ON l.id = pl.lesson_id \
             WHERE pl.product_id = ANY($1)",
        )
        .bind(product_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn create_product(&self, owner_id: Uuid, name: &str) -> PortResult<Product> {
        // The product row and the owner's self-grant must both persist or
        // neither: one transaction around the pair.
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        let record = sqlx::query_as::<_, ProductRecord>(
            "INSERT INTO products (id, owner_id, name) VALUES ($1, $2, $3) \
             RETURNING id, owner_id, name",
        )
        .bind(Uuid::new_v4())
        .bind(owner_id)
        .bind(name)
        .fetch_one(&mut *tx)
        .await
        .map_err(unexpected)?;

        sqlx::query(
            "INSERT INTO product_access (id, user_id, product_id) VALUES ($1, $2, $3)",
        )
        .bind(Uuid::new_v4())
        .bind(owner_id)
        .bind(record.id)
        .execute(&mut *tx)
        .await
        .map_err(unexpected)?;

        tx.commit().await.map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn get_product(&self, product_id: Uuid) -> PortResult<Product> {
        let record = sqlx::query_as::<_, ProductRecord>(
            "SELECT id, owner_id, name FROM products WHERE id = $1",
        )
        .bind(product_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found(e, format!("Product {product_id} not found")))?;
        Ok(record.to_domain())
    }

    async fn rename_product(&self, product_id: Uuid, name: &str) -> PortResult<Product> {
        let record = sqlx::query_as::<_, ProductRecord>(
            "UPDATE products SET name = $1 WHERE id = $2 RETURNING id, owner_id, name",
        )
        .bind(name)
        .bind(product_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found(e, format!("Product {product_id} not found")))?;
        Ok(record.to_domain())
    }

    async fn delete_product(&self, product_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(product_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Product {product_id} not found")));
        }
        Ok(())
    }

    async fn attach_lesson(&self, product_id: Uuid, lesson_id: Uuid) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO product_lessons (product_id, lesson_id) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(product_id)
        .bind(lesson_id)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn insert_access(&self, user_id: Uuid, product_id: Uuid) -> PortResult<ProductAccess> {
        sqlx::query(
            "INSERT INTO product_access (id, user_id, product_id) VALUES ($1, $2, $3) \
             ON CONFLICT (user_id, product_id) DO NOTHING",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(product_id)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;

        let record = sqlx::query_as::<_, AccessRecord>(
            "SELECT id, user_id, product_id, created_at FROM product_access \
             WHERE user_id = $1 AND product_id = $2",
        )
        .bind(user_id)
        .bind(product_id)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn products_accessible_to(&self, user_id: Uuid) -> PortResult<Vec<Product>> {
        let records = sqlx::query_as::<_, ProductRecord>(
            "SELECT p.id, p.owner_id, p.name \
             FROM products p \
             JOIN product_access a ON a.product_id = p.id \
             WHERE a.user_id = $1 \
             ORDER BY a.created_at ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn has_access(&self, user_id: Uuid, product_id: Uuid) -> PortResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM product_access WHERE user_id = $1 AND product_id = $2)",
        )
        .bind(user_id)
        .bind(product_id)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(exists)
    }

    async fn insert_progress(
        &self,
        user_id: Uuid,
        lesson_id: Uuid,
        time_watched_secs: u32,
        completed: bool,
    ) -> PortResult<LessonProgress> {
        let record = sqlx::query_as::<_, ProgressRecord>(
            "INSERT INTO lesson_progress (id, user_id, lesson_id, time_watched_secs, completed) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, user_id, lesson_id, time_watched_secs, completed",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(lesson_id)
        .bind(time_watched_secs as i32)
        .bind(completed)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            unique_violation(
                e,
                "lesson_progress_user_id_lesson_id_key",
                "Progress for this lesson has already been recorded",
            )
        })?;
        Ok(record.to_domain())
    }

    async fn get_progress(
        &self,
        user_id: Uuid,
        lesson_id: Uuid,
    ) -> PortResult<Option<LessonProgress>> {
        let record = sqlx::query_as::<_, ProgressRecord>(
            "SELECT id, user_id, lesson_id, time_watched_secs, completed \
             FROM lesson_progress WHERE user_id = $1 AND lesson_id = $2",
        )
        .bind(user_id)
        .bind(lesson_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.map(|r| r.to_domain()))
    }

    async fn progress_for_lessons(
        &self,
        user_id: Uuid,
        lesson_ids: &[Uuid],
    ) -> PortResult<Vec<LessonProgress>> {
        let records = sqlx::query_as::<_, ProgressRecord>(
            "SELECT id, user_id, lesson_id, time_watched_secs, completed \
             FROM lesson_progress WHERE user_id = $1 AND lesson_id = ANY($2)",
        )
        .bind(user_id)
        .bind(lesson_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn list_progress(&self, user_id: Uuid) -> PortResult<Vec<LessonProgress>> {
        let records = sqlx::query_as::<_, ProgressRecord>(
            "SELECT id, user_id, lesson_id, time_watched_secs, completed \
             FROM lesson_progress WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn set_progress(
        &self,
        progress_id: Uuid,
        time_watched_secs: u32,
        completed: bool,
    ) -> PortResult<LessonProgress> {
        let record = sqlx::query_as::<_, ProgressRecord>(
            "UPDATE lesson_progress SET time_watched_secs = $1, completed = $2 WHERE id = $3 \
             RETURNING id, user_id, lesson_id, time_watched_secs, completed",
        )
        .bind(time_watched_secs as i32)
        .bind(completed)
        .bind(progress_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found(e, format!("Progress {progress_id} not found")))?;
        Ok(record.to_domain())
    }

    async fn products_for_progress(&self, progress_id: Uuid) -> PortResult<Vec<Product>> {
        let records = sqlx::query_as::<_, ProductRecord>(
            "SELECT p.id, p.owner_id, p.name \
             FROM products p \
             JOIN lesson_progress_products lpp ON lpp.product_id = p.id \
             WHERE lpp.progress_id = $1",
        )
        .bind(progress_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }
}
