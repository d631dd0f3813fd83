//! Deletes access grants that have been revoked or expired for longer than
//! the retention window.

use std::time::Duration;

use chrono::{DateTime, Utc};
use domain::services::RetentionWindow;
use tracing::{debug, info};

use super::job::{JobContext, JobError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessPurgeReport {
    pub cutoff: DateTime<Utc>,
    pub deleted: u64,
}

/// Background job that removes stale access grant rows.
pub struct PurgeStaleAccessJob {
    interval: Duration,
    retention: RetentionWindow,
}

impl PurgeStaleAccessJob {
    pub fn new(interval: Duration, retention: RetentionWindow) -> Self {
        Self {
            interval,
            retention,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub async fn run(&self, ctx: &JobContext) -> Result<AccessPurgeReport, JobError> {
        let cutoff = self.retention.cutoff(ctx.clock.now())?;
        let deleted = ctx
            .cancellable(ctx.scope.access_grants.delete_stale(cutoff))
            .await?;

        if deleted > 0 {
            info!(
                cutoff = %cutoff,
                retention_days = self.retention.as_days(),
                deleted = deleted,
                "Purged stale course access"
            );
        } else {
            debug!(cutoff = %cutoff, "No stale course access to purge");
        }

        Ok(AccessPurgeReport { cutoff, deleted })
    }
}
