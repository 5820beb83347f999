//! crates/courseware_core/src/view.rs
//!
//! The presentation component: read-time projections of persisted entities
//! into plain value objects, with the viewer's per-lesson progress folded
//! in. Progress is looked up once per request for all lessons involved,
//! never per field.

use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use crate::access;
use crate::domain::{Lesson, LessonProgress, Product, User};
use crate::ports::{DatabaseService, PortError, PortResult};

//=========================================================================================
// Value Objects
//=========================================================================================

/// A minimal user identity, as embedded in shaped products.
#[derive(Debug, Clone)]
pub struct UserView {
    pub id: Uuid,
    pub username: String,
}

/// A lesson together with the viewer's watch state.
#[derive(Debug, Clone)]
pub struct LessonView {
    pub id: Uuid,
    pub name: String,
    pub video_url: String,
    pub duration_secs: u32,
    pub time_watched_secs: u32,
    pub completed: bool,
}

#[derive(Debug, Clone)]
pub struct ProductView {
    pub id: Uuid,
    pub name: String,
    pub owner: UserView,
    pub lessons: Vec<LessonView>,
}

#[derive(Debug, Clone)]
pub struct ProgressView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub lesson_id: Uuid,
    pub time_watched_secs: u32,
    pub completed: bool,
    pub products: Vec<ProductView>,
}

//=========================================================================================
// Batched Progress Lookup
//=========================================================================================

/// One viewer's progress records, indexed by lesson, loaded in a single
/// query for all lessons a request touches.
pub struct ProgressIndex {
    by_lesson: HashMap<Uuid, LessonProgress>,
}

impl ProgressIndex {
    pub async fn load(
        store: &dyn DatabaseService,
        viewer_id: Uuid,
        lesson_ids: &[Uuid],
    ) -> PortResult<Self> {
        let records = store.progress_for_lessons(viewer_id, lesson_ids).await?;
        Ok(Self {
            by_lesson: records.into_iter().map(|r| (r.lesson_id, r)).collect(),
        })
    }

    pub fn for_lesson(&self, lesson_id: Uuid) -> Option<&LessonProgress> {
        self.by_lesson.get(&lesson_id)
    }
}

//=========================================================================================
// Projections
//=========================================================================================

/// Lesson attributes plus the viewer's watch state, defaulting to
/// zero / not-completed when the viewer has no record for the lesson.
pub fn shape_lesson(lesson: &Lesson, progress: Option<&LessonProgress>) -> LessonView {
    LessonView {
        id: lesson.id,
        name: lesson.name.clone(),
        video_url: lesson.video_url.clone(),
        duration_secs: lesson.duration_secs,
        time_watched_secs: progress.map_or(0, |p| p.time_watched_secs),
        completed: progress.is_some_and(|p| p.completed),
    }
}

/// Shapes a batch of products for one viewer: owners, lessons and the
/// viewer's progress are each fetched with one query for the whole batch.
async fn shape_products(
    store: &dyn DatabaseService,
    viewer_id: Uuid,
    products: Vec<Product>,
) -> PortResult<Vec<ProductView>> {
    if products.is_empty() {
        return Ok(Vec::new());
    }

    let product_ids: Vec<Uuid> = products.iter().map(|p| p.id).collect();
    let pairs = store.lessons_by_product(&product_ids).await?;

    let mut seen = HashSet::new();
    let mut lesson_ids = Vec::new();
    for (_, lesson) in &pairs {
        if seen.insert(lesson.id) {
            lesson_ids.push(lesson.id);
        }
    }
    let index = ProgressIndex::load(store, viewer_id, &lesson_ids).await?;

    let mut owner_ids: Vec<Uuid> = products.iter().map(|p| p.owner_id).collect();
    owner_ids.sort_unstable();
    owner_ids.dedup();
    let owners: HashMap<Uuid, User> = store
        .users_by_ids(&owner_ids)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();

    let mut lessons_by_product: HashMap<Uuid, Vec<Lesson>> = HashMap::new();
    for (product_id, lesson) in pairs {
        lessons_by_product.entry(product_id).or_default().push(lesson);
    }

    products
        .into_iter()
        .map(|product| {
            let owner = owners.get(&product.owner_id).ok_or_else(|| {
                PortError::NotFound(format!("User {} not found", product.owner_id))
            })?;
            let lessons = lessons_by_product.remove(&product.id).unwrap_or_default();
            Ok(ProductView {
                id: product.id,
                name: product.name,
                owner: UserView {
                    id: owner.id,
                    username: owner.username.clone(),
                },
                lessons: lessons
                    .iter()
                    .map(|l| shape_lesson(l, index.for_lesson(l.id)))
                    .collect(),
            })
        })
        .collect()
}

/// All products the viewer can see, fully shaped.
pub async fn accessible_product_views(
    store: &dyn DatabaseService,
    viewer_id: Uuid,
) -> PortResult<Vec<ProductView>> {
    let products = access::accessible_products(store, viewer_id).await?;
    shape_products(store, viewer_id, products).await
}

/// One product shaped for the viewer.
pub async fn product_view(
    store: &dyn DatabaseService,
    viewer_id: Uuid,
    product: Product,
) -> PortResult<ProductView> {
    let product_id = product.id;
    shape_products(store, viewer_id, vec![product])
        .await?
        .pop()
        .ok_or_else(|| PortError::Unexpected(format!("Product {product_id} vanished while shaping")))
}

/// All lessons reachable through the viewer's accessible products, shaped.
pub async fn accessible_lesson_views(
    store: &dyn DatabaseService,
    viewer_id: Uuid,
) -> PortResult<Vec<LessonView>> {
    let lessons = access::accessible_lessons(store, viewer_id).await?;
    let lesson_ids: Vec<Uuid> = lessons.iter().map(|l| l.id).collect();
    let index = ProgressIndex::load(store, viewer_id, &lesson_ids).await?;
    Ok(lessons
        .iter()
        .map(|l| shape_lesson(l, index.for_lesson(l.id)))
        .collect())
}

/// A progress record with its denormalized products, each shaped for the
/// record's user.
pub async fn progress_view(
    store: &dyn DatabaseService,
    record: &LessonProgress,
) -> PortResult<ProgressView> {
    let products = store.products_for_progress(record.id).await?;
    let products = shape_products(store, record.user_id, products).await?;
    Ok(ProgressView {
        id: record.id,
        user_id: record.user_id,
        lesson_id: record.lesson_id,
        time_watched_secs: record.time_watched_secs,
        completed: record.completed,
        products,
    })
}
