//! Video library credential lookups against the categories table.

use domain::models::LibraryCredential;
use domain::stores::{StoreError, VideoLibraryStore};
use sqlx::PgPool;

use crate::entities::VideoLibraryCredentialEntity;
use crate::metrics::QueryTimer;

/// Repository for category-owned video library credentials.
#[derive(Clone)]
pub struct VideoLibraryRepository {
    pool: PgPool,
}

impl VideoLibraryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl VideoLibraryStore for VideoLibraryRepository {
    async fn find_credentials(
        &self,
        library_ids: &[String],
    ) -> Result<Vec<LibraryCredential>, StoreError> {
        if library_ids.is_empty() {
            return Ok(Vec::new());
        }

        // Several categories may point at the same library; the oldest one wins.
        let timer = QueryTimer::new("find_library_credentials");
        let result = sqlx::query_as::<_, VideoLibraryCredentialEntity>(
            r#"
            SELECT DISTINCT ON (bunny_library_id) bunny_library_id, bunny_api_key
            FROM categories
            WHERE bunny_library_id = ANY($1)
              AND bunny_api_key IS NOT NULL
              AND bunny_api_key <> ''
            ORDER BY bunny_library_id, created_at ASC
            "#,
        )
        .bind(library_ids)
        .fetch_all(&self.pool)
        .await;
        timer.finish(&result);

        let entities = result.map_err(|e| StoreError::database("find_library_credentials", e))?;
        Ok(entities.into_iter().map(LibraryCredential::from).collect())
    }
}
