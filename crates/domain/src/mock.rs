//! In-memory store and video host for tests.
//!
//! Only compiled for this crate's tests or with the `test-support` feature.
//! Both support failure and panic injection so tests can exercise the error
//! paths of the jobs and the scheduler.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::models::{CourseAccessGrant, Lesson, LibraryCredential, VideoAssetKey};
use crate::services::retention::{grant_is_stale, grant_needs_revocation, lesson_is_purgeable};
use crate::stores::{
    AccessGrantStore, LessonStore, StoreError, StoreProvider, StoreScope, VideoHost,
    VideoHostError, VideoLibraryStore,
};

/// Operation names used for failure injection and call counting.
pub mod ops {
    pub const FIND_SOFT_DELETED_LESSONS: &str = "find_soft_deleted_lessons";
    pub const HARD_DELETE_LESSONS: &str = "hard_delete_lessons";
    pub const FIND_LIVE_VIDEO_REFERENCES: &str = "find_live_video_references";
    pub const REVOKE_EXPIRED_GRANTS: &str = "revoke_expired_grants";
    pub const DELETE_STALE_GRANTS: &str = "delete_stale_grants";
    pub const FIND_LIBRARY_CREDENTIALS: &str = "find_library_credentials";
}

#[derive(Default)]
struct StoreState {
    lessons: Vec<Lesson>,
    grants: Vec<CourseAccessGrant>,
    credentials: HashMap<String, String>,
    failing: HashSet<&'static str>,
    panicking: HashSet<&'static str>,
    calls: HashMap<&'static str, usize>,
    scopes_opened: usize,
}

/// Shared in-memory lesson, grant and credential tables.
///
/// Clones share the same tables.
#[derive(Clone, Default)]
pub struct InMemoryLmsStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryLmsStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Count the call and apply any injected failure.
    fn enter(&self, operation: &'static str) -> Result<(), StoreError> {
        let (fail, panic) = {
            let mut state = self.lock();
            *state.calls.entry(operation).or_insert(0) += 1;
            (
                state.failing.contains(operation),
                state.panicking.contains(operation),
            )
        };
        if panic {
            panic!("injected panic in {}", operation);
        }
        if fail {
            return Err(StoreError::database(operation, "injected failure"));
        }
        Ok(())
    }

    pub fn insert_lesson(&self, lesson: Lesson) {
        self.lock().lessons.push(lesson);
    }

    pub fn insert_grant(&self, grant: CourseAccessGrant) {
        self.lock().grants.push(grant);
    }

    pub fn insert_credential(&self, library_id: impl Into<String>, api_key: impl Into<String>) {
        self.lock()
            .credentials
            .insert(library_id.into(), api_key.into());
    }

    /// Undo a soft delete, the way the LMS restores a lesson.
    pub fn restore_lesson(&self, id: Uuid) {
        if let Some(lesson) = self.lock().lessons.iter_mut().find(|l| l.id == id) {
            lesson.is_deleted = false;
            lesson.deleted_at = None;
        }
    }

    pub fn lessons(&self) -> Vec<Lesson> {
        self.lock().lessons.clone()
    }

    pub fn grants(&self) -> Vec<CourseAccessGrant> {
        self.lock().grants.clone()
    }

    pub fn grant(&self, id: Uuid) -> Option<CourseAccessGrant> {
        self.lock().grants.iter().find(|g| g.id == id).cloned()
    }

    /// Make `operation` return an error until [`Self::clear_failures`].
    pub fn fail_on(&self, operation: &'static str) {
        self.lock().failing.insert(operation);
    }

    /// Make `operation` panic until [`Self::clear_failures`].
    pub fn panic_on(&self, operation: &'static str) {
        self.lock().panicking.insert(operation);
    }

    pub fn clear_failures(&self) {
        let mut state = self.lock();
        state.failing.clear();
        state.panicking.clear();
    }

    pub fn call_count(&self, operation: &'static str) -> usize {
        self.lock().calls.get(operation).copied().unwrap_or(0)
    }

    pub fn scopes_opened(&self) -> usize {
        self.lock().scopes_opened
    }
}

#[async_trait::async_trait]
impl LessonStore for InMemoryLmsStore {
    async fn find_soft_deleted_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Lesson>, StoreError> {
        self.enter(ops::FIND_SOFT_DELETED_LESSONS)?;
        Ok(self
            .lock()
            .lessons
            .iter()
            .filter(|lesson| lesson_is_purgeable(lesson, cutoff))
            .cloned()
            .collect())
    }

    async fn hard_delete(&self, ids: &[Uuid], cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        self.enter(ops::HARD_DELETE_LESSONS)?;
        let mut state = self.lock();
        let before = state.lessons.len();
        state
            .lessons
            .retain(|lesson| !(ids.contains(&lesson.id) && lesson_is_purgeable(lesson, cutoff)));
        Ok((before - state.lessons.len()) as u64)
    }

    async fn find_live_video_references(&self) -> Result<Vec<VideoAssetKey>, StoreError> {
        self.enter(ops::FIND_LIVE_VIDEO_REFERENCES)?;
        Ok(self
            .lock()
            .lessons
            .iter()
            .filter_map(|lesson| lesson.live_video().cloned())
            .collect())
    }
}

#[async_trait::async_trait]
impl AccessGrantStore for InMemoryLmsStore {
    async fn revoke_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        self.enter(ops::REVOKE_EXPIRED_GRANTS)?;
        let mut state = self.lock();
        let mut revoked = 0;
        for grant in state.grants.iter_mut() {
            if grant_needs_revocation(grant, now) {
                grant.revoked_at = Some(now);
                revoked += 1;
            }
        }
        Ok(revoked)
    }

    async fn delete_stale(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        self.enter(ops::DELETE_STALE_GRANTS)?;
        let mut state = self.lock();
        let before = state.grants.len();
        state.grants.retain(|grant| !grant_is_stale(grant, cutoff));
        Ok((before - state.grants.len()) as u64)
    }
}

#[async_trait::async_trait]
impl VideoLibraryStore for InMemoryLmsStore {
    async fn find_credentials(
        &self,
        library_ids: &[String],
    ) -> Result<Vec<LibraryCredential>, StoreError> {
        self.enter(ops::FIND_LIBRARY_CREDENTIALS)?;
        let state = self.lock();
        Ok(library_ids
            .iter()
            .filter_map(|id| {
                state
                    .credentials
                    .get(id)
                    .map(|key| LibraryCredential::new(id.clone(), key.clone()))
            })
            .collect())
    }
}

impl StoreProvider for InMemoryLmsStore {
    fn open_scope(&self) -> StoreScope {
        self.lock().scopes_opened += 1;
        StoreScope {
            lessons: Arc::new(self.clone()),
            access_grants: Arc::new(self.clone()),
            video_libraries: Arc::new(self.clone()),
        }
    }
}

#[derive(Default)]
struct HostState {
    libraries: HashMap<String, Vec<String>>,
    failing_listings: HashSet<String>,
    failing_deletes: HashSet<VideoAssetKey>,
    delete_attempts: Vec<VideoAssetKey>,
    api_keys_seen: Vec<String>,
}

/// Video host backed by a map of library id to asset ids.
#[derive(Clone, Default)]
pub struct MockVideoHost {
    state: Arc<Mutex<HostState>>,
}

impl MockVideoHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HostState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn with_assets(self, library_id: &str, asset_ids: &[&str]) -> Self {
        self.lock().libraries.insert(
            library_id.to_string(),
            asset_ids.iter().map(|id| id.to_string()).collect(),
        );
        self
    }

    pub fn fail_listing(&self, library_id: &str) {
        self.lock().failing_listings.insert(library_id.to_string());
    }

    pub fn fail_delete(&self, library_id: &str, asset_id: &str) {
        self.lock()
            .failing_deletes
            .insert(VideoAssetKey::new(library_id, asset_id));
    }

    /// Assets still stored under `library_id`.
    pub fn assets(&self, library_id: &str) -> Vec<String> {
        self.lock()
            .libraries
            .get(library_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Every delete call made, successful or not, in order.
    pub fn delete_attempts(&self) -> Vec<VideoAssetKey> {
        self.lock().delete_attempts.clone()
    }

    pub fn api_keys_seen(&self) -> Vec<String> {
        self.lock().api_keys_seen.clone()
    }
}

#[async_trait::async_trait]
impl VideoHost for MockVideoHost {
    async fn list_asset_ids(
        &self,
        credential: &LibraryCredential,
    ) -> Result<Vec<String>, VideoHostError> {
        let mut state = self.lock();
        state.api_keys_seen.push(credential.api_key.clone());
        if state.failing_listings.contains(&credential.library_id) {
            return Err(VideoHostError::Request(format!(
                "injected listing failure for library {}",
                credential.library_id
            )));
        }
        Ok(state
            .libraries
            .get(&credential.library_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn delete_asset(
        &self,
        credential: &LibraryCredential,
        asset_id: &str,
    ) -> Result<(), VideoHostError> {
        let key = VideoAssetKey::new(credential.library_id.clone(), asset_id);
        let mut state = self.lock();
        state.delete_attempts.push(key.clone());
        if state.failing_deletes.contains(&key) {
            return Err(VideoHostError::UnexpectedStatus {
                status: 500,
                message: format!("injected delete failure for {}", key),
            });
        }
        if let Some(assets) = state.libraries.get_mut(&credential.library_id) {
            assets.retain(|id| id != asset_id);
        }
        debug!(asset = %key, "Mock: deleted remote asset");
        Ok(())
    }
}
