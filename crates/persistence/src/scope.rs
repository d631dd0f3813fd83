//! PostgreSQL-backed store scopes.

use std::sync::Arc;

use domain::stores::{StoreProvider, StoreScope};
use sqlx::PgPool;

use crate::metrics::record_pool_metrics;
use crate::repositories::{CourseAccessGrantRepository, LessonRepository, VideoLibraryRepository};

/// Builds fresh repositories over the shared pool for every job iteration.
///
/// Each repository checks a connection out of the pool per statement, so no
/// session outlives the iteration that opened the scope.
#[derive(Clone)]
pub struct PgStoreProvider {
    pool: PgPool,
}

impl PgStoreProvider {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl StoreProvider for PgStoreProvider {
    fn open_scope(&self) -> StoreScope {
        record_pool_metrics(&self.pool);
        StoreScope {
            lessons: Arc::new(LessonRepository::new(self.pool.clone())),
            access_grants: Arc::new(CourseAccessGrantRepository::new(self.pool.clone())),
            video_libraries: Arc::new(VideoLibraryRepository::new(self.pool.clone())),
        }
    }
}
