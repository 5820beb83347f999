//! crates/courseware_core/src/test_support.rs
//!
//! An in-memory `DatabaseService` so the policy modules can be tested
//! without a running database.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{AuthSession, Lesson, LessonProgress, Product, ProductAccess, User, UserCredentials};
use crate::ports::{DatabaseService, PortError, PortResult};

#[derive(Default)]
struct Inner {
    users: Vec<UserCredentials>,
    sessions: Vec<AuthSession>,
    lessons: Vec<Lesson>,
    products: Vec<Product>,
    product_lessons: Vec<(Uuid, Uuid)>,
    access: Vec<ProductAccess>,
    progress: Vec<LessonProgress>,
    progress_products: Vec<(Uuid, Uuid)>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_user(&self, username: &str) -> User {
        self.create_user(username, "hash").await.unwrap()
    }

    pub async fn add_lesson(&self, name: &str, duration_secs: u32) -> Lesson {
        self.create_lesson(name, "https://videos.example/l", duration_secs)
            .await
            .unwrap()
    }
}

#[async_trait]
impl DatabaseService for MemoryStore {
    async fn create_user(&self, username: &str, password_hash: &str) -> PortResult<User> {
        let mut inner = self.inner.lock().unwrap();
        if inner.users.iter().any(|u| u.username == username) {
            return Err(PortError::Validation("Username already taken".to_string()));
        }
        let user = UserCredentials {
            id: Uuid::new_v4(),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
        };
        inner.users.push(user.clone());
        Ok(User {
            id: user.id,
            username: user.username,
        })
    }

    async fn get_user_by_username(&self, username: &str) -> PortResult<UserCredentials> {
        let inner = self.inner.lock().unwrap();
        inner
            .users
            .iter()
            .find(|u| u.username == username)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("User {username} not found")))
    }

    async fn users_by_ids(&self, ids: &[Uuid]) -> PortResult<Vec<User>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .users
            .iter()
            .filter(|u| ids.contains(&u.id))
            .map(|u| User {
                id: u.id,
                username: u.username.clone(),
            })
            .collect())
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.sessions.push(AuthSession {
            id: session_id.to_string(),
            user_id,
            expires_at,
        });
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        let inner = self.inner.lock().unwrap();
        inner
            .sessions
            .iter()
            .find(|s| s.id == session_id && s.expires_at > Utc::now())
            .map(|s| s.user_id)
            .ok_or(PortError::PermissionDenied)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.sessions.retain(|s| s.id != session_id);
        Ok(())
    }

    async fn create_lesson(
        &self,
        name: &str,
        video_url: &str,
        duration_secs: u32,
    ) -> PortResult<Lesson> {
        let mut inner = self.inner.lock().unwrap();
        let lesson = Lesson {
            id: Uuid::new_v4(),
            name: name.to_string(),
            video_url: video_url.to_string(),
            duration_secs,
        };
        inner.lessons.push(lesson.clone());
        Ok(lesson)
    }

    async fn get_lesson(&self, lesson_id: Uuid) -> PortResult<Lesson> {
        let inner = self.inner.lock().unwrap();
        inner
            .lessons
            .iter()
            .find(|l| l.id == lesson_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Lesson {lesson_id} not found")))
    }

    async fn lessons_by_product(&self, product_ids: &[Uuid]) -> PortResult<Vec<(Uuid, Lesson)>> {
        let inner = self.inner.lock().unwrap();
        let mut pairs = Vec::new();
        for (product_id, lesson_id) in &inner.product_lessons {
            if product_ids.contains(product_id) {
                if let Some(lesson) = inner.lessons.iter().find(|l| l.id == *lesson_id) {
                    pairs.push((*product_id, lesson.clone()));
                }
            }
        }
        Ok(pairs)
    }

    async fn create_product(&self, owner_id: Uuid, name: &str) -> PortResult<Product> {
        let mut inner = self.inner.lock().unwrap();
        let product = Product {
            id: Uuid::new_v4(),
            owner_id,
            name: name.to_string(),
        };
        inner.products.push(product.clone());
        // Owner self-grant, mirroring the adapter's transactional insert.
        inner.access.push(ProductAccess {
            id: Uuid::new_v4(),
            user_id: owner_id,
            product_id: product.id,
            created_at: Utc::now(),
        });
        Ok(product)
    }

    async fn get_product(&self, product_id: Uuid) -> PortResult<Product> {
        let inner = self.inner.lock().unwrap();
        inner
            .products
            .iter()
            .find(|p| p.id == product_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Product {product_id} not found")))
    }

    async fn rename_product(&self, product_id: Uuid, name: &str) -> PortResult<Product> {
        let mut inner = self.inner.lock().unwrap();
        let product = inner
            .products
            .iter_mut()
            .find(|p| p.id == product_id)
            .ok_or_else(|| PortError::NotFound(format!("Product {product_id} not found")))?;
        product.name = name.to_string();
        Ok(product.clone())
    }

    async fn delete_product(&self, product_id: Uuid) -> PortResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.products.retain(|p| p.id != product_id);
        inner.product_lessons.retain(|(pid, _)| *pid != product_id);
        inner.access.retain(|a| a.product_id != product_id);
        Ok(())
    }

    async fn attach_lesson(&self, product_id: Uuid, lesson_id: Uuid) -> PortResult<()> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.product_lessons.contains(&(product_id, lesson_id)) {
            inner.product_lessons.push((product_id, lesson_id));
        }
        Ok(())
    }

    async fn insert_access(&self, user_id: Uuid, product_id: Uuid) -> PortResult<ProductAccess> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(existing) = inner
            .access
            .iter()
            .find(|a| a.user_id == user_id && a.product_id == product_id)
        {
            return Ok(existing.clone());
        }
        let grant = ProductAccess {
            id: Uuid::new_v4(),
            user_id,
            product_id,
            created_at: Utc::now(),
        };
        inner.access.push(grant.clone());
        Ok(grant)
    }

    async fn products_accessible_to(&self, user_id: Uuid) -> PortResult<Vec<Product>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .products
            .iter()
            .filter(|p| {
                inner
                    .access
                    .iter()
                    .any(|a| a.user_id == user_id && a.product_id == p.id)
            })
            .cloned()
            .collect())
    }

    async fn has_access(&self, user_id: Uuid, product_id: Uuid) -> PortResult<bool> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .access
            .iter()
            .any(|a| a.user_id == user_id && a.product_id == product_id))
    }

    async fn insert_progress(
        &self,
        user_id: Uuid,
        lesson_id: Uuid,
        time_watched_secs: u32,
        completed: bool,
    ) -> PortResult<LessonProgress> {
        let mut inner = self.inner.lock().unwrap();
        if inner
            .progress
            .iter()
            .any(|p| p.user_id == user_id && p.lesson_id == lesson_id)
        {
            return Err(PortError::Validation(
                "Progress for this lesson has already been recorded".to_string(),
            ));
        }
        let record = LessonProgress {
            id: Uuid::new_v4(),
            user_id,
            lesson_id,
            time_watched_secs,
            completed,
        };
        inner.progress.push(record.clone());
        Ok(record)
    }

    async fn get_progress(
        &self,
        user_id: Uuid,
        lesson_id: Uuid,
    ) -> PortResult<Option<LessonProgress>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .progress
            .iter()
            .find(|p| p.user_id == user_id && p.lesson_id == lesson_id)
            .cloned())
    }

    async fn progress_for_lessons(
        &self,
        user_id: Uuid,
        lesson_ids: &[Uuid],
    ) -> PortResult<Vec<LessonProgress>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .progress
            .iter()
            .filter(|p| p.user_id == user_id && lesson_ids.contains(&p.lesson_id))
            .cloned()
            .collect())
    }

    async fn list_progress(&self, user_id: Uuid) -> PortResult<Vec<LessonProgress>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .progress
            .iter()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn set_progress(
        &self,
        progress_id: Uuid,
        time_watched_secs: u32,
        completed: bool,
    ) -> PortResult<LessonProgress> {
        let mut inner = self.inner.lock().unwrap();
        let record = inner
            .progress
            .iter_mut()
            .find(|p| p.id == progress_id)
            .ok_or_else(|| PortError::NotFound(format!("Progress {progress_id} not found")))?;
        record.time_watched_secs = time_watched_secs;
        record.completed = completed;
        Ok(record.clone())
    }

    async fn products_for_progress(&self, progress_id: Uuid) -> PortResult<Vec<Product>> {
        let inner = self.inner.lock().unwrap();
        let mut products = Vec::new();
        for (pid, product_id) in &inner.progress_products {
            if *pid == progress_id {
                if let Some(product) = inner.products.iter().find(|p| p.id == *product_id) {
                    products.push(product.clone());
                }
            }
        }
        Ok(products)
    }
}
