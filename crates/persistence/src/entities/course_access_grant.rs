//! Course access grant entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::CourseAccessGrant;
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the course_access_grants table.
#[derive(Debug, Clone, FromRow)]
pub struct CourseAccessGrantEntity {
    pub id: Uuid,
    pub student_id: Uuid,
    pub course_id: Uuid,
    pub category_id: Uuid,
    pub purchased_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl From<CourseAccessGrantEntity> for CourseAccessGrant {
    fn from(entity: CourseAccessGrantEntity) -> Self {
        Self {
            id: entity.id,
            student_id: entity.student_id,
            course_id: entity.course_id,
            category_id: entity.category_id,
            purchased_at: entity.purchased_at,
            expires_at: entity.expires_at,
            revoked_at: entity.revoked_at,
        }
    }
}
