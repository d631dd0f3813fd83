//! Assembles the scheduler from configuration.

use std::sync::Arc;
use std::time::Duration;

use domain::services::RetentionWindow;
use domain::stores::{StoreProvider, VideoHost};
use domain::Clock;
use tracing::info;

use crate::config::{Config, JobsConfig};
use crate::jobs::{
    CleanupOrphanedVideosJob, JobScheduler, MaintenanceJob, PurgeDeletedLessonsJob,
    PurgeStaleAccessJob, RetryPolicy, RevokeExpiredAccessJob,
};

/// Enabled jobs, in a fixed order.
pub fn build_jobs(config: &JobsConfig, host: Arc<dyn VideoHost>) -> Vec<MaintenanceJob> {
    let mut jobs = Vec::new();

    let lessons = &config.purge_deleted_lessons;
    if lessons.enabled {
        jobs.push(MaintenanceJob::PurgeDeletedLessons(PurgeDeletedLessonsJob::new(
            lessons.interval(),
            RetentionWindow::days(lessons.retention_days),
        )));
    }

    if config.revoke_expired_access.enabled {
        jobs.push(MaintenanceJob::RevokeExpiredAccess(RevokeExpiredAccessJob::new(
            config.revoke_expired_access.interval(),
        )));
    }

    let stale = &config.purge_stale_access;
    if stale.enabled {
        jobs.push(MaintenanceJob::PurgeStaleAccess(PurgeStaleAccessJob::new(
            stale.interval(),
            RetentionWindow::days(stale.retention_days),
        )));
    }

    if config.cleanup_orphaned_videos.enabled {
        jobs.push(MaintenanceJob::CleanupOrphanedVideos(CleanupOrphanedVideosJob::new(
            config.cleanup_orphaned_videos.interval(),
            host,
        )));
    }

    jobs
}

/// Create a scheduler with every enabled job registered. Not yet started.
pub fn create_scheduler(
    config: &Config,
    stores: Arc<dyn StoreProvider>,
    host: Arc<dyn VideoHost>,
    clock: Arc<dyn Clock>,
) -> JobScheduler {
    let retry = RetryPolicy::new(Duration::from_secs(config.scheduler.retry_initial_secs));
    let mut scheduler = JobScheduler::new(stores, clock, retry);

    for job in build_jobs(&config.jobs, host) {
        info!(
            job = job.name(),
            interval_secs = job.interval().as_secs(),
            "Registering job"
        );
        scheduler.register(job);
    }

    scheduler
}
