//! Lesson domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::video::VideoAssetKey;

/// A lesson as seen by the maintenance jobs.
///
/// Only the columns the jobs need are carried: identity, the parent course,
/// the soft-delete state and the remote video reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Lesson {
    pub id: Uuid,
    pub course_id: Uuid,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    /// Remote video reference, present only when both library and asset ids are set.
    pub video: Option<VideoAssetKey>,
}

impl Lesson {
    /// Build a live (not deleted) lesson without a video.
    pub fn new(id: Uuid, course_id: Uuid) -> Self {
        Self {
            id,
            course_id,
            is_deleted: false,
            deleted_at: None,
            video: None,
        }
    }

    /// Attach a remote video reference.
    pub fn with_video(mut self, video: VideoAssetKey) -> Self {
        self.video = Some(video);
        self
    }

    /// Mark the lesson as soft-deleted at the given instant.
    pub fn soft_deleted_at(mut self, at: DateTime<Utc>) -> Self {
        self.is_deleted = true;
        self.deleted_at = Some(at);
        self
    }

    /// A lesson flagged deleted must carry a deletion timestamp.
    pub fn has_consistent_deletion_state(&self) -> bool {
        !self.is_deleted || self.deleted_at.is_some()
    }

    /// The video reference if the lesson is live.
    pub fn live_video(&self) -> Option<&VideoAssetKey> {
        if self.is_deleted {
            None
        } else {
            self.video.as_ref()
        }
    }
}
