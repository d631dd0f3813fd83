//! Contracts for the data store and the remote video host.
//!
//! The persistence crate implements the store traits on PostgreSQL; the
//! maintenance crate implements [`VideoHost`] on Bunny Stream. In-memory
//! versions for tests live in the `mock` module behind the `test-support`
//! feature.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Lesson, LibraryCredential, VideoAssetKey};

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failure talking to the relational store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error during {operation}: {source}")]
    Database {
        operation: &'static str,
        #[source]
        source: BoxError,
    },
}

impl StoreError {
    pub fn database(operation: &'static str, source: impl Into<BoxError>) -> Self {
        StoreError::Database {
            operation,
            source: source.into(),
        }
    }
}

/// Failure talking to the remote video host.
#[derive(Debug, Error)]
pub enum VideoHostError {
    #[error("request to video host failed: {0}")]
    Request(String),

    #[error("video host returned status {status}: {message}")]
    UnexpectedStatus { status: u16, message: String },

    #[error("invalid response from video host: {0}")]
    InvalidResponse(String),
}

/// Lesson table operations used by the maintenance jobs.
#[async_trait::async_trait]
pub trait LessonStore: Send + Sync {
    /// Lessons with `is_deleted = true AND deleted_at < cutoff`, bypassing any
    /// default soft-delete filtering.
    async fn find_soft_deleted_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Lesson>, StoreError>;

    /// Permanently remove the given lessons in one all-or-nothing batch.
    ///
    /// Only rows that are still soft-deleted before `cutoff` are removed, so a
    /// lesson restored after it was selected survives.
    async fn hard_delete(&self, ids: &[Uuid], cutoff: DateTime<Utc>) -> Result<u64, StoreError>;

    /// Video references of every non-deleted lesson that has both ids set.
    async fn find_live_video_references(&self) -> Result<Vec<VideoAssetKey>, StoreError>;
}

/// Course access grant table operations.
#[async_trait::async_trait]
pub trait AccessGrantStore: Send + Sync {
    /// Set `revoked_at = now` on every unrevoked grant whose expiry has passed.
    async fn revoke_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError>;

    /// Delete grants revoked before `cutoff` or expired before `cutoff`.
    async fn delete_stale(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError>;
}

/// Category-owned video library credentials.
#[async_trait::async_trait]
pub trait VideoLibraryStore: Send + Sync {
    /// Credentials for the requested libraries. Libraries without a
    /// configured key are simply absent from the result.
    async fn find_credentials(
        &self,
        library_ids: &[String],
    ) -> Result<Vec<LibraryCredential>, StoreError>;
}

/// Remote video host API.
#[async_trait::async_trait]
pub trait VideoHost: Send + Sync {
    /// Every asset id stored under the credential's library.
    async fn list_asset_ids(
        &self,
        credential: &LibraryCredential,
    ) -> Result<Vec<String>, VideoHostError>;

    /// Delete one asset from the credential's library.
    async fn delete_asset(
        &self,
        credential: &LibraryCredential,
        asset_id: &str,
    ) -> Result<(), VideoHostError>;
}

/// Store handles for a single job iteration.
#[derive(Clone)]
pub struct StoreScope {
    pub lessons: Arc<dyn LessonStore>,
    pub access_grants: Arc<dyn AccessGrantStore>,
    pub video_libraries: Arc<dyn VideoLibraryStore>,
}

/// Hands out a fresh [`StoreScope`] per job iteration.
pub trait StoreProvider: Send + Sync {
    fn open_scope(&self) -> StoreScope;
}
