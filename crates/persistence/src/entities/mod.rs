//! Database entity definitions.
//!
//! Entities are direct mappings to database rows.

pub mod course_access_grant;
pub mod lesson;
pub mod video_library;

pub use course_access_grant::CourseAccessGrantEntity;
pub use lesson::{LessonEntity, LessonVideoEntity};
pub use video_library::VideoLibraryCredentialEntity;
