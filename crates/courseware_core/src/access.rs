//! crates/courseware_core/src/access.rs
//!
//! The access-control component: computes the visibility scope of a user
//! from explicit `ProductAccess` grant records, and gates product mutations
//! to the owner.

use std::collections::HashSet;

use uuid::Uuid;

use crate::domain::{Lesson, Product, ProductAccess};
use crate::ports::{DatabaseService, PortError, PortResult};

/// Every product the user holds an access grant for. Empty when the user
/// has no grants; each product appears exactly once.
pub async fn accessible_products(
    store: &dyn DatabaseService,
    user_id: Uuid,
) -> PortResult<Vec<Product>> {
    store.products_accessible_to(user_id).await
}

/// Every lesson belonging to any accessible product. A lesson reachable
/// through two permitted products appears once.
pub async fn accessible_lessons(
    store: &dyn DatabaseService,
    user_id: Uuid,
) -> PortResult<Vec<Lesson>> {
    let products = store.products_accessible_to(user_id).await?;
    let product_ids: Vec<Uuid> = products.iter().map(|p| p.id).collect();

    let mut seen = HashSet::new();
    let mut lessons = Vec::new();
    for (_, lesson) in store.lessons_by_product(&product_ids).await? {
        if seen.insert(lesson.id) {
            lessons.push(lesson);
        }
    }
    Ok(lessons)
}

/// Grants `user_id` viewing rights to the product. The product must exist.
/// Idempotent: granting twice leaves a single grant record.
pub async fn grant_access(
    store: &dyn DatabaseService,
    user_id: Uuid,
    product_id: Uuid,
) -> PortResult<ProductAccess> {
    store.get_product(product_id).await?;
    store.insert_access(user_id, product_id).await
}

/// Owner-only gate for product update/delete/attach operations.
pub fn authorize_product_mutation(product: &Product, user_id: Uuid) -> PortResult<()> {
    if product.owner_id == user_id {
        Ok(())
    } else {
        Err(PortError::PermissionDenied)
    }
}

/// Fetches a product for reading on behalf of `user_id`. A product the
/// user holds no grant for reads as NotFound, hiding its existence.
pub async fn require_access(
    store: &dyn DatabaseService,
    user_id: Uuid,
    product_id: Uuid,
) -> PortResult<Product> {
    let product = store.get_product(product_id).await?;
    if store.has_access(user_id, product.id).await? {
        Ok(product)
    } else {
        Err(PortError::NotFound(format!("Product {product_id} not found")))
    }
}

/// Creates a product owned by `owner_id` and the owner's self-grant, so the
/// creator immediately sees their own product. The two writes happen in one
/// transaction behind `DatabaseService::create_product`.
pub async fn create_product(
    store: &dyn DatabaseService,
    owner_id: Uuid,
    name: &str,
) -> PortResult<Product> {
    let name = name.trim();
    if name.is_empty() {
        return Err(PortError::Validation(
            "Product name must not be empty".to_string(),
        ));
    }
    store.create_product(owner_id, name).await
}

/// Renames a product. Name rules match creation; the caller authorizes
/// the mutation beforehand via [`authorize_product_mutation`].
pub async fn rename_product(
    store: &dyn DatabaseService,
    product_id: Uuid,
    name: &str,
) -> PortResult<Product> {
    let name = name.trim();
    if name.is_empty() {
        return Err(PortError::Validation(
            "Product name must not be empty".to_string(),
        ));
    }
    store.rename_product(product_id, name).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MemoryStore;

    #[tokio::test]
    async fn user_without_grant_sees_nothing() {
        let store = MemoryStore::new();
        let owner = store.add_user("owner").await;
        let outsider = store.add_user("outsider").await;
        create_product(&store, owner.id, "Rust Course").await.unwrap();

        let visible = accessible_products(&store, outsider.id).await.unwrap();
        assert!(visible.is_empty());
    }

    #[tokio::test]
    async fn granted_product_appears_exactly_once_after_regrant() {
        let store = MemoryStore::new();
        let owner = store.add_user("owner").await;
        let viewer = store.add_user("viewer").await;
        let product = create_product(&store, owner.id, "Rust Course").await.unwrap();

        grant_access(&store, viewer.id, product.id).await.unwrap();
        grant_access(&store, viewer.id, product.id).await.unwrap();

        let visible = accessible_products(&store, viewer.id).await.unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, product.id);
    }

    #[tokio::test]
    async fn creator_immediately_sees_their_product() {
        let store = MemoryStore::new();
        let owner = store.add_user("owner").await;
        let product = create_product(&store, owner.id, "Rust Course").await.unwrap();

        let visible = accessible_products(&store, owner.id).await.unwrap();
        assert!(visible.iter().any(|p| p.id == product.id));
    }

    #[tokio::test]
    async fn empty_product_name_is_rejected() {
        let store = MemoryStore::new();
        let owner = store.add_user("owner").await;

        let err = create_product(&store, owner.id, "  ").await.unwrap_err();
        assert!(matches!(err, PortError::Validation(_)));
    }

    #[tokio::test]
    async fn only_the_owner_may_mutate() {
        let store = MemoryStore::new();
        let owner = store.add_user("owner").await;
        let other = store.add_user("other").await;
        let product = create_product(&store, owner.id, "Rust Course").await.unwrap();

        assert!(authorize_product_mutation(&product, owner.id).is_ok());
        let err = authorize_product_mutation(&product, other.id).unwrap_err();
        assert!(matches!(err, PortError::PermissionDenied));
    }

    #[tokio::test]
    async fn shared_lesson_listed_once() {
        let store = MemoryStore::new();
        let owner = store.add_user("owner").await;
        let first = create_product(&store, owner.id, "Course A").await.unwrap();
        let second = create_product(&store, owner.id, "Course B").await.unwrap();
        let lesson = store.add_lesson("Intro", 120).await;
        store.attach_lesson(first.id, lesson.id).await.unwrap();
        store.attach_lesson(second.id, lesson.id).await.unwrap();

        let lessons = accessible_lessons(&store, owner.id).await.unwrap();
        assert_eq!(lessons.len(), 1);
        assert_eq!(lessons[0].id, lesson.id);
    }

    #[tokio::test]
    async fn granting_on_a_missing_product_fails() {
        let store = MemoryStore::new();
        let user = store.add_user("user").await;

        let err = grant_access(&store, user.id, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, PortError::NotFound(_)));
    }

    #[tokio::test]
    async fn reading_without_grant_reads_as_not_found() {
        let store = MemoryStore::new();
        let owner = store.add_user("owner").await;
        let outsider = store.add_user("outsider").await;
        let product = create_product(&store, owner.id, "Rust Course").await.unwrap();

        let err = require_access(&store, outsider.id, product.id).await.unwrap_err();
        assert!(matches!(err, PortError::NotFound(_)));

        let found = require_access(&store, owner.id, product.id).await.unwrap();
        assert_eq!(found.id, product.id);
    }
}
