//! Course access grant repository for expiry revocation and retention cleanup.

use chrono::{DateTime, Utc};
use domain::stores::{AccessGrantStore, StoreError};
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::CourseAccessGrantEntity;
use crate::metrics::QueryTimer;

/// Repository for course access grant database operations.
#[derive(Clone)]
pub struct CourseAccessGrantRepository {
    pool: PgPool,
}

impl CourseAccessGrantRepository {
    /// Creates a new CourseAccessGrantRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a grant by ID.
    pub async fn find_by_id(
        &self,
        id: Uuid,
    ) -> Result<Option<CourseAccessGrantEntity>, sqlx::Error> {
        sqlx::query_as::<_, CourseAccessGrantEntity>(
            r#"
            SELECT id, student_id, course_id, category_id, purchased_at, expires_at, revoked_at
            FROM course_access_grants
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }
}

#[async_trait::async_trait]
impl AccessGrantStore for CourseAccessGrantRepository {
    async fn revoke_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let timer = QueryTimer::new("revoke_expired_grants");
        let result = sqlx::query(
            r#"
            UPDATE course_access_grants
            SET revoked_at = $1
            WHERE revoked_at IS NULL
              AND expires_at < $1
            "#,
        )
        .bind(now)
        .execute(&self.pool)
        .await;
        timer.finish(&result);

        let result = result.map_err(|e| StoreError::database("revoke_expired_grants", e))?;
        Ok(result.rows_affected())
    }

    async fn delete_stale(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        let timer = QueryTimer::new("delete_stale_grants");
        let result = sqlx::query(
            r#"
            DELETE FROM course_access_grants
            WHERE (revoked_at IS NOT NULL AND revoked_at < $1)
               OR expires_at < $1
            "#,
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await;
        timer.finish(&result);

        let result = result.map_err(|e| StoreError::database("delete_stale_grants", e))?;
        Ok(result.rows_affected())
    }
}
