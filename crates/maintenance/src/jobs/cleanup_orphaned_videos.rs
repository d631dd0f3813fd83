//! Deletes hosted videos that no live lesson references anymore.
//!
//! The keep-set is every (library, video) pair referenced by a lesson that is
//! not soft-deleted. Only libraries appearing in the keep-set are listed at
//! the host, each with its own API key taken from the owning category. A
//! library that cannot be listed, or whose key is unknown, is skipped and
//! recorded; one failed deletion never stops the others.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use domain::models::{LibraryCredential, VideoAssetKey};
use domain::services::{KeepSet, OrphanCleanupSummary, SkipReason};
use domain::stores::VideoHost;
use metrics::counter;
use tracing::{debug, info, warn};

use super::job::{JobContext, JobError};

/// Background job that reconciles the video host against lesson references.
pub struct CleanupOrphanedVideosJob {
    interval: Duration,
    host: Arc<dyn VideoHost>,
}

impl CleanupOrphanedVideosJob {
    pub fn new(interval: Duration, host: Arc<dyn VideoHost>) -> Self {
        Self { interval, host }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub async fn run(&self, ctx: &JobContext) -> Result<OrphanCleanupSummary, JobError> {
        let references = ctx
            .cancellable(ctx.scope.lessons.find_live_video_references())
            .await?;
        let keep_set: KeepSet = references.into_iter().collect();

        let mut summary = OrphanCleanupSummary {
            keep_set_size: keep_set.len(),
            ..Default::default()
        };

        if keep_set.is_empty() {
            debug!("No live lesson references a video, nothing to reconcile");
            return Ok(summary);
        }

        let library_ids = keep_set.library_ids();
        let credentials: HashMap<String, LibraryCredential> = ctx
            .cancellable(ctx.scope.video_libraries.find_credentials(&library_ids))
            .await?
            .into_iter()
            .map(|credential| (credential.library_id.clone(), credential))
            .collect();

        for library_id in &library_ids {
            if ctx.is_cancelled() {
                info!(progress = %summary, "Orphan cleanup interrupted by shutdown");
                return Err(JobError::Cancelled);
            }

            match credentials.get(library_id) {
                Some(credential) => {
                    self.reconcile_library(ctx, &keep_set, credential, &mut summary)
                        .await?;
                }
                None => {
                    warn!(
                        library_id = %library_id,
                        "No API key configured for video library, skipping"
                    );
                    summary.record_skip(library_id, SkipReason::MissingCredential);
                }
            }
        }

        if summary.is_clean() {
            info!(summary = %summary, "Orphaned video cleanup finished");
        } else {
            warn!(summary = %summary, "Orphaned video cleanup finished with failures");
        }

        Ok(summary)
    }

    async fn reconcile_library(
        &self,
        ctx: &JobContext,
        keep_set: &KeepSet,
        credential: &LibraryCredential,
        summary: &mut OrphanCleanupSummary,
    ) -> Result<(), JobError> {
        let library_id = credential.library_id.as_str();

        let remote_ids = match ctx
            .unless_cancelled(self.host.list_asset_ids(credential))
            .await?
        {
            Ok(ids) => ids,
            Err(e) => {
                warn!(
                    library_id = %library_id,
                    error = %e,
                    "Failed to list hosted videos, skipping library"
                );
                summary.record_skip(library_id, SkipReason::ListingFailed(e.to_string()));
                return Ok(());
            }
        };

        let orphans = keep_set.orphans_in(library_id, &remote_ids);
        summary.libraries_reconciled += 1;
        summary.assets_listed += remote_ids.len();
        summary.orphans_found += orphans.len();

        debug!(
            library_id = %library_id,
            listed = remote_ids.len(),
            orphans = orphans.len(),
            "Reconciled video library"
        );

        for asset_id in orphans {
            if ctx.is_cancelled() {
                info!(progress = %summary, "Orphan cleanup interrupted by shutdown");
                return Err(JobError::Cancelled);
            }

            let key = VideoAssetKey::new(library_id, asset_id.as_str());
            let result = ctx
                .unless_cancelled(self.host.delete_asset(credential, &asset_id))
                .await?;

            match &result {
                Ok(()) => {
                    info!(video = %key, "Deleted orphaned video");
                    counter!("maintenance_orphan_deletions_total", "outcome" => "deleted")
                        .increment(1);
                }
                Err(e) => {
                    warn!(video = %key, error = %e, "Failed to delete orphaned video");
                    counter!("maintenance_orphan_deletions_total", "outcome" => "failed")
                        .increment(1);
                }
            }

            summary.record_deletion(key, result);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use domain::mock::{ops, InMemoryLmsStore, MockVideoHost};
    use domain::models::Lesson;
    use domain::stores::{StoreProvider, VideoHostError};
    use domain::FixedClock;
    use tokio_util::sync::CancellationToken;
    use uuid::Uuid;

    fn lesson_with_video(library: &str, asset: &str) -> Lesson {
        Lesson::new(Uuid::new_v4(), Uuid::new_v4()).with_video(VideoAssetKey::new(library, asset))
    }

    fn context(store: &InMemoryLmsStore) -> JobContext {
        JobContext::new(
            store.open_scope(),
            Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap())),
            CancellationToken::new(),
        )
    }

    fn job(host: &MockVideoHost) -> CleanupOrphanedVideosJob {
        CleanupOrphanedVideosJob::new(Duration::from_secs(21600), Arc::new(host.clone()))
    }

    /// Host whose listing, or else whose deletes, never answer.
    struct StalledHost {
        stall_listing: bool,
    }

    #[async_trait::async_trait]
    impl VideoHost for StalledHost {
        async fn list_asset_ids(
            &self,
            _credential: &LibraryCredential,
        ) -> Result<Vec<String>, VideoHostError> {
            if self.stall_listing {
                std::future::pending::<()>().await;
            }
            Ok(vec!["A".to_string(), "B".to_string()])
        }

        async fn delete_asset(
            &self,
            _credential: &LibraryCredential,
            _asset_id: &str,
        ) -> Result<(), VideoHostError> {
            std::future::pending::<()>().await;
            Ok(())
        }
    }

    async fn run_against_stalled_host(stall_listing: bool) -> Result<OrphanCleanupSummary, JobError> {
        let store = InMemoryLmsStore::new();
        store.insert_lesson(lesson_with_video("lib1", "A"));
        store.insert_credential("lib1", "key-1");
        let ctx = context(&store);
        let job = CleanupOrphanedVideosJob::new(
            Duration::from_secs(21600),
            Arc::new(StalledHost { stall_listing }),
        );

        let token = ctx.cancellation.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            token.cancel();
        });

        tokio::time::timeout(Duration::from_secs(1), job.run(&ctx))
            .await
            .expect("job did not stop after cancellation")
    }

    #[tokio::test]
    async fn test_deletes_only_unreferenced_assets() {
        let store = InMemoryLmsStore::new();
        store.insert_lesson(lesson_with_video("lib1", "A"));
        store.insert_lesson(lesson_with_video("lib1", "B"));
        store.insert_credential("lib1", "key-1");
        let host = MockVideoHost::new().with_assets("lib1", &["A", "B", "C"]);

        let summary = job(&host).run(&context(&store)).await.unwrap();

        assert_eq!(summary.keep_set_size, 2);
        assert_eq!(summary.deleted, vec![VideoAssetKey::new("lib1", "C")]);
        assert_eq!(host.assets("lib1"), vec!["A", "B"]);
        assert_eq!(host.api_keys_seen(), vec!["key-1"]);
        assert!(summary.is_clean());
    }

    #[tokio::test]
    async fn test_soft_deleted_lesson_does_not_protect_its_video() {
        let store = InMemoryLmsStore::new();
        store.insert_lesson(lesson_with_video("lib1", "A"));
        store.insert_lesson(lesson_with_video("lib1", "B").soft_deleted_at(Utc::now()));
        store.insert_credential("lib1", "key-1");
        let host = MockVideoHost::new().with_assets("lib1", &["A", "B"]);

        let summary = job(&host).run(&context(&store)).await.unwrap();

        assert_eq!(summary.deleted, vec![VideoAssetKey::new("lib1", "B")]);
        assert_eq!(host.assets("lib1"), vec!["A"]);
    }

    #[tokio::test]
    async fn test_empty_keep_set_touches_no_library() {
        let store = InMemoryLmsStore::new();
        store.insert_credential("lib1", "key-1");
        let host = MockVideoHost::new().with_assets("lib1", &["A", "B"]);

        let summary = job(&host).run(&context(&store)).await.unwrap();

        assert_eq!(summary, OrphanCleanupSummary::default());
        assert!(host.api_keys_seen().is_empty());
        assert_eq!(store.call_count(ops::FIND_LIBRARY_CREDENTIALS), 0);
        assert_eq!(host.assets("lib1").len(), 2);
    }

    #[tokio::test]
    async fn test_listing_failure_skips_only_that_library() {
        let store = InMemoryLmsStore::new();
        store.insert_lesson(lesson_with_video("lib1", "A"));
        store.insert_lesson(lesson_with_video("lib2", "X"));
        store.insert_credential("lib1", "key-1");
        store.insert_credential("lib2", "key-2");
        let host = MockVideoHost::new()
            .with_assets("lib1", &["A", "old"])
            .with_assets("lib2", &["X", "stale"]);
        host.fail_listing("lib1");

        let summary = job(&host).run(&context(&store)).await.unwrap();

        assert_eq!(summary.skipped_count(), 1);
        assert_eq!(summary.skipped_libraries[0].library_id, "lib1");
        assert!(matches!(
            summary.skipped_libraries[0].reason,
            SkipReason::ListingFailed(_)
        ));
        assert_eq!(summary.deleted, vec![VideoAssetKey::new("lib2", "stale")]);
        assert_eq!(host.assets("lib1"), vec!["A", "old"]);
    }

    #[tokio::test]
    async fn test_failed_delete_does_not_stop_others() {
        let store = InMemoryLmsStore::new();
        store.insert_lesson(lesson_with_video("lib1", "A"));
        store.insert_credential("lib1", "key-1");
        let host = MockVideoHost::new().with_assets("lib1", &["A", "B", "C", "D"]);
        host.fail_delete("lib1", "C");

        let summary = job(&host).run(&context(&store)).await.unwrap();

        assert_eq!(host.delete_attempts().len(), 3);
        assert_eq!(summary.deleted_count(), 2);
        assert_eq!(summary.failed_count(), 1);
        assert_eq!(summary.failed_deletions[0].key, VideoAssetKey::new("lib1", "C"));
        assert_eq!(host.assets("lib1"), vec!["A", "C"]);
    }

    #[tokio::test]
    async fn test_library_without_credential_is_skipped() {
        let store = InMemoryLmsStore::new();
        store.insert_lesson(lesson_with_video("lib1", "A"));
        store.insert_lesson(lesson_with_video("lib9", "Z"));
        store.insert_credential("lib1", "key-1");
        let host = MockVideoHost::new()
            .with_assets("lib1", &["A"])
            .with_assets("lib9", &["Z", "orphan"]);

        let summary = job(&host).run(&context(&store)).await.unwrap();

        assert_eq!(summary.skipped_libraries[0].library_id, "lib9");
        assert_eq!(summary.skipped_libraries[0].reason, SkipReason::MissingCredential);
        assert_eq!(host.assets("lib9"), vec!["Z", "orphan"]);
    }

    #[tokio::test]
    async fn test_reference_lookup_failure_fails_run() {
        let store = InMemoryLmsStore::new();
        store.fail_on(ops::FIND_LIVE_VIDEO_REFERENCES);
        let host = MockVideoHost::new().with_assets("lib1", &["A"]);

        let err = job(&host).run(&context(&store)).await.unwrap_err();

        assert!(matches!(err, JobError::Store(_)));
        assert!(host.delete_attempts().is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_run_deletes_nothing() {
        let store = InMemoryLmsStore::new();
        store.insert_lesson(lesson_with_video("lib1", "A"));
        store.insert_credential("lib1", "key-1");
        let host = MockVideoHost::new().with_assets("lib1", &["A", "B"]);
        let ctx = context(&store);
        ctx.cancellation.cancel();

        let err = job(&host).run(&ctx).await.unwrap_err();

        assert!(matches!(err, JobError::Cancelled));
        assert!(host.delete_attempts().is_empty());
    }

    #[tokio::test]
    async fn test_cancellation_interrupts_stalled_listing() {
        let result = run_against_stalled_host(true).await;
        assert!(matches!(result, Err(JobError::Cancelled)));
    }

    #[tokio::test]
    async fn test_cancellation_interrupts_stalled_delete() {
        let result = run_against_stalled_host(false).await;
        assert!(matches!(result, Err(JobError::Cancelled)));
    }
}
