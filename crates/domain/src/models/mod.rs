//! Domain models for the LMS maintenance worker.

pub mod access_grant;
pub mod lesson;
pub mod video;

pub use access_grant::CourseAccessGrant;
pub use lesson::Lesson;
pub use video::{LibraryCredential, VideoAssetKey};
