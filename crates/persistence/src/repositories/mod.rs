//! Repository implementations for database operations.

pub mod course_access_grant;
pub mod lesson;
pub mod video_library;

pub use course_access_grant::CourseAccessGrantRepository;
pub use lesson::LessonRepository;
pub use video_library::VideoLibraryRepository;
