//! Lesson entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::{Lesson, VideoAssetKey};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the lessons table, limited to the columns the
/// maintenance jobs read.
#[derive(Debug, Clone, FromRow)]
pub struct LessonEntity {
    pub id: Uuid,
    pub course_id: Uuid,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub bunny_library_id: Option<String>,
    pub bunny_video_id: Option<String>,
}

impl From<LessonEntity> for Lesson {
    fn from(entity: LessonEntity) -> Self {
        Self {
            id: entity.id,
            course_id: entity.course_id,
            is_deleted: entity.is_deleted,
            deleted_at: entity.deleted_at,
            video: VideoAssetKey::from_parts(entity.bunny_library_id, entity.bunny_video_id),
        }
    }
}

/// Video reference columns of a live lesson.
#[derive(Debug, Clone, FromRow)]
pub struct LessonVideoEntity {
    pub bunny_library_id: String,
    pub bunny_video_id: String,
}

impl From<LessonVideoEntity> for VideoAssetKey {
    fn from(entity: LessonVideoEntity) -> Self {
        VideoAssetKey::new(entity.bunny_library_id, entity.bunny_video_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(library: Option<&str>, video: Option<&str>) -> LessonEntity {
        LessonEntity {
            id: Uuid::new_v4(),
            course_id: Uuid::new_v4(),
            is_deleted: false,
            deleted_at: None,
            bunny_library_id: library.map(str::to_string),
            bunny_video_id: video.map(str::to_string),
        }
    }

    #[test]
    fn test_entity_with_video_maps_reference() {
        let lesson: Lesson = entity(Some("1234"), Some("guid-1")).into();
        assert_eq!(lesson.video, Some(VideoAssetKey::new("1234", "guid-1")));
    }

    #[test]
    fn test_entity_with_partial_video_has_no_reference() {
        let lesson: Lesson = entity(Some("1234"), None).into();
        assert!(lesson.video.is_none());
    }

    #[test]
    fn test_video_entity_to_key() {
        let key: VideoAssetKey = LessonVideoEntity {
            bunny_library_id: "1234".to_string(),
            bunny_video_id: "guid-1".to_string(),
        }
        .into();
        assert_eq!(key.to_string(), "1234:guid-1");
    }
}
