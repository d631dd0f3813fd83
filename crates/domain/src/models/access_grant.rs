//! Course access grant domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Permission for a student to access a course within a category.
///
/// `revoked_at` is write-once: after it is set the grant stays revoked until
/// the row itself is purged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CourseAccessGrant {
    pub id: Uuid,
    pub student_id: Uuid,
    pub course_id: Uuid,
    pub category_id: Uuid,
    pub purchased_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl CourseAccessGrant {
    /// Build a fresh grant with random identifiers, purchased at `purchased_at`.
    pub fn purchased(purchased_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            student_id: Uuid::new_v4(),
            course_id: Uuid::new_v4(),
            category_id: Uuid::new_v4(),
            purchased_at,
            expires_at: None,
            revoked_at: None,
        }
    }

    pub fn expiring_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn revoked(mut self, revoked_at: DateTime<Utc>) -> Self {
        self.revoked_at = Some(revoked_at);
        self
    }

    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }

    /// Whether the grant currently allows access.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        !self.is_revoked() && self.expires_at.map_or(true, |expiry| expiry >= now)
    }
}
