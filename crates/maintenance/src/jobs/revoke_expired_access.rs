//! Revokes course access whose expiry has passed.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::job::{JobContext, JobError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevocationReport {
    pub now: DateTime<Utc>,
    pub revoked: u64,
}

/// Background job that marks expired access grants revoked.
pub struct RevokeExpiredAccessJob {
    interval: Duration,
}

impl RevokeExpiredAccessJob {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub async fn run(&self, ctx: &JobContext) -> Result<RevocationReport, JobError> {
        let now = ctx.clock.now();
        let revoked = ctx
            .cancellable(ctx.scope.access_grants.revoke_expired(now))
            .await?;

        if revoked > 0 {
            info!(revoked = revoked, "Revoked expired course access");
        } else {
            debug!("No expired course access to revoke");
        }

        Ok(RevocationReport { now, revoked })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, TimeZone};
    use domain::mock::{ops, InMemoryLmsStore};
    use domain::models::CourseAccessGrant;
    use domain::stores::StoreProvider;
    use domain::FixedClock;
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    async fn run_job(store: &InMemoryLmsStore) -> Result<RevocationReport, JobError> {
        let ctx = JobContext::new(
            store.open_scope(),
            Arc::new(FixedClock::new(now())),
            CancellationToken::new(),
        );
        RevokeExpiredAccessJob::new(Duration::from_secs(900))
            .run(&ctx)
            .await
    }

    #[tokio::test]
    async fn test_revokes_expired_grants_with_current_time() {
        let store = InMemoryLmsStore::new();
        let expired = CourseAccessGrant::purchased(now() - ChronoDuration::days(60))
            .expiring_at(now() - ChronoDuration::hours(1));
        let current = CourseAccessGrant::purchased(now() - ChronoDuration::days(60))
            .expiring_at(now() + ChronoDuration::days(1));
        let lifetime = CourseAccessGrant::purchased(now() - ChronoDuration::days(60));
        store.insert_grant(expired.clone());
        store.insert_grant(current.clone());
        store.insert_grant(lifetime.clone());

        let report = run_job(&store).await.unwrap();

        assert_eq!(report.revoked, 1);
        assert_eq!(store.grant(expired.id).unwrap().revoked_at, Some(now()));
        assert_eq!(store.grant(current.id).unwrap().revoked_at, None);
        assert_eq!(store.grant(lifetime.id).unwrap().revoked_at, None);
    }

    #[tokio::test]
    async fn test_second_run_changes_nothing() {
        let store = InMemoryLmsStore::new();
        store.insert_grant(
            CourseAccessGrant::purchased(now() - ChronoDuration::days(60))
                .expiring_at(now() - ChronoDuration::days(1)),
        );

        assert_eq!(run_job(&store).await.unwrap().revoked, 1);
        assert_eq!(run_job(&store).await.unwrap().revoked, 0);
    }

    #[tokio::test]
    async fn test_earlier_revocation_is_preserved() {
        let store = InMemoryLmsStore::new();
        let first_revoked = now() - ChronoDuration::days(3);
        let grant = CourseAccessGrant::purchased(now() - ChronoDuration::days(60))
            .expiring_at(now() - ChronoDuration::days(5))
            .revoked(first_revoked);
        store.insert_grant(grant.clone());

        let report = run_job(&store).await.unwrap();

        assert_eq!(report.revoked, 0);
        assert_eq!(store.grant(grant.id).unwrap().revoked_at, Some(first_revoked));
    }

    #[tokio::test]
    async fn test_store_failure_is_reported() {
        let store = InMemoryLmsStore::new();
        store.fail_on(ops::REVOKE_EXPIRED_GRANTS);

        let err = run_job(&store).await.unwrap_err();
        assert!(matches!(err, JobError::Store(_)));
    }
}
