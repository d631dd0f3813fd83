//! Permanently removes lessons that stayed soft-deleted past the retention window.

use std::time::Duration;

use chrono::{DateTime, Utc};
use domain::services::RetentionWindow;
use tracing::{debug, info};
use uuid::Uuid;

use super::job::{JobContext, JobError};

/// Result of one lesson purge run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonPurgeReport {
    pub cutoff: DateTime<Utc>,
    pub candidates: u64,
    pub purged: u64,
}

/// Background job that hard-deletes long soft-deleted lessons.
pub struct PurgeDeletedLessonsJob {
    interval: Duration,
    retention: RetentionWindow,
}

impl PurgeDeletedLessonsJob {
    /// Create a new purge job.
    ///
    /// # Arguments
    /// * `interval` - Time between runs
    /// * `retention` - How long a soft-deleted lesson stays recoverable
    pub fn new(interval: Duration, retention: RetentionWindow) -> Self {
        Self {
            interval,
            retention,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub async fn run(&self, ctx: &JobContext) -> Result<LessonPurgeReport, JobError> {
        let cutoff = self.retention.cutoff(ctx.clock.now())?;

        let lessons = ctx
            .cancellable(ctx.scope.lessons.find_soft_deleted_before(cutoff))
            .await?;

        if lessons.is_empty() {
            debug!(cutoff = %cutoff, "No soft-deleted lessons past retention");
            return Ok(LessonPurgeReport {
                cutoff,
                candidates: 0,
                purged: 0,
            });
        }

        let ids: Vec<Uuid> = lessons.iter().map(|lesson| lesson.id).collect();
        let with_video = lessons.iter().filter(|lesson| lesson.video.is_some()).count();

        let purged = ctx.cancellable(ctx.scope.lessons.hard_delete(&ids, cutoff)).await?;

        info!(
            cutoff = %cutoff,
            retention_days = self.retention.as_days(),
            candidates = ids.len(),
            purged = purged,
            videos_released = with_video,
            "Purged soft-deleted lessons"
        );

        Ok(LessonPurgeReport {
            cutoff,
            candidates: ids.len() as u64,
            purged,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, TimeZone};
    use domain::mock::{ops, InMemoryLmsStore};
    use domain::models::{Lesson, VideoAssetKey};
    use domain::stores::StoreProvider;
    use domain::FixedClock;
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn job() -> PurgeDeletedLessonsJob {
        PurgeDeletedLessonsJob::new(Duration::from_secs(86400), RetentionWindow::days(30))
    }

    fn context(store: &InMemoryLmsStore) -> JobContext {
        JobContext::new(
            store.open_scope(),
            Arc::new(FixedClock::new(now())),
            CancellationToken::new(),
        )
    }

    fn lesson_deleted_days_ago(days: i64) -> Lesson {
        Lesson::new(Uuid::new_v4(), Uuid::new_v4())
            .soft_deleted_at(now() - ChronoDuration::days(days))
    }

    #[tokio::test]
    async fn test_purges_only_lessons_past_retention() {
        let store = InMemoryLmsStore::new();
        let old = lesson_deleted_days_ago(31);
        let recent = lesson_deleted_days_ago(5);
        let live = Lesson::new(Uuid::new_v4(), Uuid::new_v4());
        store.insert_lesson(old.clone());
        store.insert_lesson(recent.clone());
        store.insert_lesson(live.clone());

        let report = job().run(&context(&store)).await.unwrap();

        assert_eq!(report.candidates, 1);
        assert_eq!(report.purged, 1);
        assert_eq!(report.cutoff, now() - ChronoDuration::days(30));
        let remaining: Vec<Uuid> = store.lessons().iter().map(|l| l.id).collect();
        assert!(!remaining.contains(&old.id));
        assert!(remaining.contains(&recent.id));
        assert!(remaining.contains(&live.id));
    }

    #[tokio::test]
    async fn test_lesson_deleted_exactly_at_cutoff_is_kept() {
        let store = InMemoryLmsStore::new();
        store.insert_lesson(lesson_deleted_days_ago(30));

        let report = job().run(&context(&store)).await.unwrap();

        assert_eq!(report.purged, 0);
        assert_eq!(store.lessons().len(), 1);
    }

    #[tokio::test]
    async fn test_skips_delete_when_nothing_qualifies() {
        let store = InMemoryLmsStore::new();
        store.insert_lesson(lesson_deleted_days_ago(1));

        let report = job().run(&context(&store)).await.unwrap();

        assert_eq!(report.candidates, 0);
        assert_eq!(store.call_count(ops::HARD_DELETE_LESSONS), 0);
    }

    #[tokio::test]
    async fn test_purged_lesson_video_no_longer_referenced() {
        let store = InMemoryLmsStore::new();
        store.insert_lesson(
            lesson_deleted_days_ago(40).with_video(VideoAssetKey::new("lib1", "A")),
        );

        job().run(&context(&store)).await.unwrap();

        assert!(store.lessons().is_empty());
    }

    #[tokio::test]
    async fn test_listing_failure_deletes_nothing() {
        let store = InMemoryLmsStore::new();
        store.insert_lesson(lesson_deleted_days_ago(40));
        store.fail_on(ops::FIND_SOFT_DELETED_LESSONS);

        let err = job().run(&context(&store)).await.unwrap_err();

        assert!(matches!(err, JobError::Store(_)));
        assert_eq!(store.lessons().len(), 1);
        assert_eq!(store.call_count(ops::HARD_DELETE_LESSONS), 0);
    }

    #[tokio::test]
    async fn test_oversized_retention_fails_without_touching_store() {
        let store = InMemoryLmsStore::new();
        store.insert_lesson(lesson_deleted_days_ago(40));
        let job = PurgeDeletedLessonsJob::new(Duration::from_secs(60), RetentionWindow::days(u32::MAX));

        let err = job.run(&context(&store)).await.unwrap_err();

        assert!(matches!(err, JobError::Retention(_)));
        assert_eq!(store.call_count(ops::FIND_SOFT_DELETED_LESSONS), 0);
        assert_eq!(store.lessons().len(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let store = InMemoryLmsStore::new();
        store.insert_lesson(lesson_deleted_days_ago(40));
        let ctx = context(&store);
        ctx.cancellation.cancel();

        let err = job().run(&ctx).await.unwrap_err();

        assert!(matches!(err, JobError::Cancelled));
        assert_eq!(store.lessons().len(), 1);
    }
}
