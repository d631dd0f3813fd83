//! Background maintenance jobs and the scheduler that drives them.

mod cleanup_orphaned_videos;
mod job;
mod purge_deleted_lessons;
mod purge_stale_access;
mod revoke_expired_access;
mod scheduler;

pub use cleanup_orphaned_videos::CleanupOrphanedVideosJob;
pub use job::{JobContext, JobError, JobOutcome, MaintenanceJob};
pub use purge_deleted_lessons::{LessonPurgeReport, PurgeDeletedLessonsJob};
pub use purge_stale_access::{AccessPurgeReport, PurgeStaleAccessJob};
pub use revoke_expired_access::{RevocationReport, RevokeExpiredAccessJob};
pub use scheduler::{JobScheduler, RetryPolicy};
