//! Retention rules shared by the SQL repositories and the in-memory store.
//!
//! Every predicate here mirrors a `WHERE` clause in the persistence crate.
//! A `None` timestamp never compares below a cutoff, matching SQL `NULL`
//! semantics.

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::models::{CourseAccessGrant, Lesson};

/// The window reaches past the earliest instant `chrono` can represent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("retention window of {days} days is out of range")]
pub struct RetentionOverflow {
    pub days: u32,
}

/// A retention window expressed in whole days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionWindow {
    days: u32,
}

impl RetentionWindow {
    pub fn days(days: u32) -> Self {
        Self { days }
    }

    pub fn as_days(&self) -> u32 {
        self.days
    }

    /// Instant before which records fall out of the window.
    pub fn cutoff(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>, RetentionOverflow> {
        now.checked_sub_signed(Duration::days(i64::from(self.days)))
            .ok_or(RetentionOverflow { days: self.days })
    }
}

/// Soft-deleted for longer than the window allows.
pub fn lesson_is_purgeable(lesson: &Lesson, cutoff: DateTime<Utc>) -> bool {
    lesson.is_deleted && lesson.deleted_at.is_some_and(|at| at < cutoff)
}

/// Expired but not yet revoked.
pub fn grant_needs_revocation(grant: &CourseAccessGrant, now: DateTime<Utc>) -> bool {
    grant.revoked_at.is_none() && grant.expires_at.is_some_and(|at| at < now)
}

/// Revoked long ago, or expired long ago whether or not it was ever revoked.
pub fn grant_is_stale(grant: &CourseAccessGrant, cutoff: DateTime<Utc>) -> bool {
    let revoked_long_ago = grant.revoked_at.is_some_and(|at| at < cutoff);
    let expired_long_ago = grant.expires_at.is_some_and(|at| at < cutoff);
    revoked_long_ago || expired_long_ago
}
