//! Lesson repository for the maintenance jobs.

use chrono::{DateTime, Utc};
use domain::models::{Lesson, VideoAssetKey};
use domain::stores::{LessonStore, StoreError};
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::{LessonEntity, LessonVideoEntity};
use crate::metrics::QueryTimer;

/// Repository for lesson database operations.
#[derive(Clone)]
pub struct LessonRepository {
    pool: PgPool,
}

impl LessonRepository {
    /// Creates a new LessonRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a lesson by ID regardless of its soft-delete state.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<LessonEntity>, sqlx::Error> {
        sqlx::query_as::<_, LessonEntity>(
            r#"
            SELECT id, course_id, is_deleted, deleted_at, bunny_library_id, bunny_video_id
            FROM lessons
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }
}

#[async_trait::async_trait]
impl LessonStore for LessonRepository {
    async fn find_soft_deleted_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Lesson>, StoreError> {
        let timer = QueryTimer::new("find_soft_deleted_lessons");
        let result = sqlx::query_as::<_, LessonEntity>(
            r#"
            SELECT id, course_id, is_deleted, deleted_at, bunny_library_id, bunny_video_id
            FROM lessons
            WHERE is_deleted = TRUE
              AND deleted_at < $1
            "#,
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await;
        timer.finish(&result);

        let entities = result.map_err(|e| StoreError::database("find_soft_deleted_lessons", e))?;
        Ok(entities.into_iter().map(Lesson::from).collect())
    }

    async fn hard_delete(&self, ids: &[Uuid], cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        if ids.is_empty() {
            return Ok(0);
        }

        let timer = QueryTimer::new("hard_delete_lessons");
        let result = sqlx::query(
            r#"
            DELETE FROM lessons
            WHERE id = ANY($1)
              AND is_deleted = TRUE
              AND deleted_at < $2
            "#,
        )
        .bind(ids)
        .bind(cutoff)
        .execute(&self.pool)
        .await;
        timer.finish(&result);

        let result = result.map_err(|e| StoreError::database("hard_delete_lessons", e))?;
        Ok(result.rows_affected())
    }

    async fn find_live_video_references(&self) -> Result<Vec<VideoAssetKey>, StoreError> {
        let timer = QueryTimer::new("find_live_video_references");
        let result = sqlx::query_as::<_, LessonVideoEntity>(
            r#"
            SELECT DISTINCT bunny_library_id, bunny_video_id
            FROM lessons
            WHERE is_deleted = FALSE
              AND bunny_library_id IS NOT NULL AND btrim(bunny_library_id) <> ''
              AND bunny_video_id IS NOT NULL AND btrim(bunny_video_id) <> ''
            "#,
        )
        .fetch_all(&self.pool)
        .await;
        timer.finish(&result);

        let entities = result.map_err(|e| StoreError::database("find_live_video_references", e))?;
        Ok(entities.into_iter().map(VideoAssetKey::from).collect())
    }
}
