//! crates/courseware_core/src/progress.rs
//!
//! The progress-tracking component. Each (user, lesson) pair moves through
//! two states, Incomplete and Completed; Completed is terminal.

use uuid::Uuid;

use crate::domain::LessonProgress;
use crate::ports::{DatabaseService, PortError, PortResult};

/// Whether `time_watched_secs` reaches 80% of the lesson duration.
///
/// Computed in integers (`5*t >= 4*d`), which is exact where a float
/// comparison against `0.8 * duration` can round.
pub fn meets_completion_threshold(time_watched_secs: u32, duration_secs: u32) -> bool {
    u64::from(time_watched_secs) * 5 >= u64::from(duration_secs) * 4
}

/// Records a user's watched time for a lesson. Creation only: a second
/// record for the same (user, lesson) pair fails with a validation error.
/// The record is created completed iff the 80% threshold is already met.
pub async fn record_progress(
    store: &dyn DatabaseService,
    user_id: Uuid,
    lesson_id: Uuid,
    time_watched_secs: u32,
) -> PortResult<LessonProgress> {
    let lesson = store.get_lesson(lesson_id).await?;

    if store.get_progress(user_id, lesson_id).await?.is_some() {
        return Err(PortError::Validation(
            "Progress for this lesson has already been recorded".to_string(),
        ));
    }

    let completed = meets_completion_threshold(time_watched_secs, lesson.duration_secs);
    store
        .insert_progress(user_id, lesson_id, time_watched_secs, completed)
        .await
}

/// Updates the watched time on an existing record. The 80% threshold is
/// re-evaluated on every update; a record that already completed stays
/// completed even if the reported time drops.
pub async fn update_progress(
    store: &dyn DatabaseService,
    user_id: Uuid,
    lesson_id: Uuid,
    time_watched_secs: u32,
) -> PortResult<LessonProgress> {
    let lesson = store.get_lesson(lesson_id).await?;
    let existing = store
        .get_progress(user_id, lesson_id)
        .await?
        .ok_or_else(|| PortError::NotFound(format!("No progress for lesson {lesson_id}")))?;

    let completed = existing.completed
        || meets_completion_threshold(time_watched_secs, lesson.duration_secs);
    store
        .set_progress(existing.id, time_watched_secs, completed)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MemoryStore;

    #[tokio::test]
    async fn watching_80_of_100_completes() {
        let store = MemoryStore::new();
        let user = store.add_user("user").await;
        let lesson = store.add_lesson("Ownership", 100).await;

        let record = record_progress(&store, user.id, lesson.id, 80).await.unwrap();
        assert!(record.completed);
        assert_eq!(record.time_watched_secs, 80);
    }

    #[tokio::test]
    async fn watching_79_of_100_does_not_complete() {
        let store = MemoryStore::new();
        let user = store.add_user("user").await;
        let lesson = store.add_lesson("Ownership", 100).await;

        let record = record_progress(&store, user.id, lesson.id, 79).await.unwrap();
        assert!(!record.completed);
    }

    #[tokio::test]
    async fn second_record_for_the_same_lesson_fails() {
        let store = MemoryStore::new();
        let user = store.add_user("user").await;
        let lesson = store.add_lesson("Ownership", 100).await;

        record_progress(&store, user.id, lesson.id, 10).await.unwrap();
        let err = record_progress(&store, user.id, lesson.id, 20).await.unwrap_err();
        assert!(matches!(err, PortError::Validation(_)));
    }

    #[tokio::test]
    async fn recording_against_a_missing_lesson_fails() {
        let store = MemoryStore::new();
        let user = store.add_user("user").await;

        let err = record_progress(&store, user.id, Uuid::new_v4(), 10).await.unwrap_err();
        assert!(matches!(err, PortError::NotFound(_)));
    }

    #[tokio::test]
    async fn update_applies_the_threshold() {
        let store = MemoryStore::new();
        let user = store.add_user("user").await;
        let lesson = store.add_lesson("Ownership", 100).await;

        let record = record_progress(&store, user.id, lesson.id, 10).await.unwrap();
        assert!(!record.completed);

        let updated = update_progress(&store, user.id, lesson.id, 85).await.unwrap();
        assert!(updated.completed);
        assert_eq!(updated.time_watched_secs, 85);
    }

    #[tokio::test]
    async fn completion_never_reverts() {
        let store = MemoryStore::new();
        let user = store.add_user("user").await;
        let lesson = store.add_lesson("Ownership", 100).await;

        record_progress(&store, user.id, lesson.id, 90).await.unwrap();
        let updated = update_progress(&store, user.id, lesson.id, 5).await.unwrap();
        assert!(updated.completed);
        assert_eq!(updated.time_watched_secs, 5);
    }

    #[tokio::test]
    async fn updating_without_a_record_fails() {
        let store = MemoryStore::new();
        let user = store.add_user("user").await;
        let lesson = store.add_lesson("Ownership", 100).await;

        let err = update_progress(&store, user.id, lesson.id, 10).await.unwrap_err();
        assert!(matches!(err, PortError::NotFound(_)));
    }

    #[test]
    fn threshold_is_exact_at_the_boundary() {
        assert!(meets_completion_threshold(80, 100));
        assert!(!meets_completion_threshold(79, 100));
        // A zero-length lesson is complete from the first report.
        assert!(meets_completion_threshold(0, 0));
        // Large durations must not overflow.
        assert!(meets_completion_threshold(u32::MAX, u32::MAX));
    }
}
