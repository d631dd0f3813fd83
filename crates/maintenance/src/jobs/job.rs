//! The closed set of maintenance jobs and what one execution produces.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use domain::services::{OrphanCleanupSummary, RetentionOverflow};
use domain::stores::{StoreError, StoreScope};
use domain::Clock;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use super::cleanup_orphaned_videos::CleanupOrphanedVideosJob;
use super::purge_deleted_lessons::{LessonPurgeReport, PurgeDeletedLessonsJob};
use super::purge_stale_access::{AccessPurgeReport, PurgeStaleAccessJob};
use super::revoke_expired_access::{RevocationReport, RevokeExpiredAccessJob};

/// Errors that end one job iteration.
#[derive(Debug, Error)]
pub enum JobError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Retention(#[from] RetentionOverflow),

    #[error("job was cancelled")]
    Cancelled,

    #[error("job panicked: {0}")]
    Panicked(String),
}

/// Everything one iteration may touch.
///
/// Built fresh by the scheduler for every iteration and dropped afterwards.
#[derive(Clone)]
pub struct JobContext {
    pub scope: StoreScope,
    pub clock: Arc<dyn Clock>,
    pub cancellation: CancellationToken,
}

impl JobContext {
    pub fn new(scope: StoreScope, clock: Arc<dyn Clock>, cancellation: CancellationToken) -> Self {
        Self {
            scope,
            clock,
            cancellation,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Await a store call unless shutdown is requested first.
    pub async fn cancellable<T, E, F>(&self, call: F) -> Result<T, JobError>
    where
        F: Future<Output = Result<T, E>>,
        E: Into<JobError>,
    {
        tokio::select! {
            biased;
            _ = self.cancellation.cancelled() => Err(JobError::Cancelled),
            result = call => result.map_err(Into::into),
        }
    }

    /// Await a call whose own error is not fatal to the run, unless shutdown
    /// is requested first.
    pub async fn unless_cancelled<F: Future>(&self, call: F) -> Result<F::Output, JobError> {
        tokio::select! {
            biased;
            _ = self.cancellation.cancelled() => Err(JobError::Cancelled),
            output = call => Ok(output),
        }
    }
}

/// A maintenance job together with its polling interval.
pub enum MaintenanceJob {
    PurgeDeletedLessons(PurgeDeletedLessonsJob),
    RevokeExpiredAccess(RevokeExpiredAccessJob),
    PurgeStaleAccess(PurgeStaleAccessJob),
    CleanupOrphanedVideos(CleanupOrphanedVideosJob),
}

impl MaintenanceJob {
    /// Name used in logs and metric labels.
    pub fn name(&self) -> &'static str {
        match self {
            MaintenanceJob::PurgeDeletedLessons(_) => "purge_deleted_lessons",
            MaintenanceJob::RevokeExpiredAccess(_) => "revoke_expired_access",
            MaintenanceJob::PurgeStaleAccess(_) => "purge_stale_access",
            MaintenanceJob::CleanupOrphanedVideos(_) => "cleanup_orphaned_videos",
        }
    }

    pub fn interval(&self) -> Duration {
        match self {
            MaintenanceJob::PurgeDeletedLessons(job) => job.interval(),
            MaintenanceJob::RevokeExpiredAccess(job) => job.interval(),
            MaintenanceJob::PurgeStaleAccess(job) => job.interval(),
            MaintenanceJob::CleanupOrphanedVideos(job) => job.interval(),
        }
    }

    /// Run one iteration. Safe to repeat on unchanged data.
    pub async fn execute(&self, ctx: &JobContext) -> Result<JobOutcome, JobError> {
        match self {
            MaintenanceJob::PurgeDeletedLessons(job) => {
                job.run(ctx).await.map(JobOutcome::LessonsPurged)
            }
            MaintenanceJob::RevokeExpiredAccess(job) => {
                job.run(ctx).await.map(JobOutcome::AccessRevoked)
            }
            MaintenanceJob::PurgeStaleAccess(job) => {
                job.run(ctx).await.map(JobOutcome::AccessPurged)
            }
            MaintenanceJob::CleanupOrphanedVideos(job) => {
                job.run(ctx).await.map(JobOutcome::OrphansCleaned)
            }
        }
    }
}

/// Run report of a successful iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    LessonsPurged(LessonPurgeReport),
    AccessRevoked(RevocationReport),
    AccessPurged(AccessPurgeReport),
    OrphansCleaned(OrphanCleanupSummary),
}

impl JobOutcome {
    /// Local rows or remote assets changed by the run.
    pub fn items_affected(&self) -> u64 {
        match self {
            JobOutcome::LessonsPurged(report) => report.purged,
            JobOutcome::AccessRevoked(report) => report.revoked,
            JobOutcome::AccessPurged(report) => report.deleted,
            JobOutcome::OrphansCleaned(summary) => summary.deleted_count() as u64,
        }
    }
}

impl fmt::Display for JobOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobOutcome::LessonsPurged(report) => write!(
                f,
                "purged {} of {} lessons deleted before {}",
                report.purged,
                report.candidates,
                report.cutoff.to_rfc3339()
            ),
            JobOutcome::AccessRevoked(report) => write!(
                f,
                "revoked {} expired grants at {}",
                report.revoked,
                report.now.to_rfc3339()
            ),
            JobOutcome::AccessPurged(report) => write!(
                f,
                "deleted {} grants stale before {}",
                report.deleted,
                report.cutoff.to_rfc3339()
            ),
            JobOutcome::OrphansCleaned(summary) => write!(f, "{}", summary),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use domain::mock::InMemoryLmsStore;
    use domain::stores::StoreProvider;
    use domain::FixedClock;

    fn context(token: CancellationToken) -> JobContext {
        let store = InMemoryLmsStore::new();
        let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()));
        JobContext::new(store.open_scope(), clock, token)
    }

    #[tokio::test]
    async fn test_cancellable_passes_result_through() {
        let ctx = context(CancellationToken::new());
        let value = ctx
            .cancellable(async { Ok::<_, StoreError>(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_cancellable_maps_store_error() {
        let ctx = context(CancellationToken::new());
        let err = ctx
            .cancellable(async { Err::<u64, _>(StoreError::database("op", "down")) })
            .await
            .unwrap_err();
        assert!(matches!(err, JobError::Store(_)));
    }

    #[tokio::test]
    async fn test_cancellable_short_circuits_when_cancelled() {
        let token = CancellationToken::new();
        token.cancel();
        let ctx = context(token);
        let err = ctx
            .cancellable(std::future::pending::<Result<(), StoreError>>())
            .await
            .unwrap_err();
        assert!(matches!(err, JobError::Cancelled));
    }

    #[test]
    fn test_job_names_and_intervals() {
        let job = MaintenanceJob::RevokeExpiredAccess(RevokeExpiredAccessJob::new(
            Duration::from_secs(900),
        ));
        assert_eq!(job.name(), "revoke_expired_access");
        assert_eq!(job.interval(), Duration::from_secs(900));
    }

    #[test]
    fn test_outcome_items_affected() {
        let outcome = JobOutcome::AccessRevoked(RevocationReport {
            now: Utc::now(),
            revoked: 3,
        });
        assert_eq!(outcome.items_affected(), 3);
        assert!(outcome.to_string().starts_with("revoked 3 expired grants"));
    }
}
