//! Common test utilities for the maintenance integration tests.
//!
//! Jobs run against the in-memory store and video host with a fixed clock,
//! so every scenario is deterministic.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use domain::mock::{InMemoryLmsStore, MockVideoHost};
use domain::models::{Lesson, VideoAssetKey};
use domain::stores::StoreProvider;
use domain::FixedClock;
use lms_maintenance::jobs::{JobContext, JobError, JobOutcome, MaintenanceJob};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Reference "now" used by every scenario.
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 15, 0, 0, 0).unwrap()
}

pub fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
}

pub fn days_before_now(days: i64) -> DateTime<Utc> {
    now() - chrono::Duration::days(days)
}

pub const DAY: Duration = Duration::from_secs(86400);

/// Store, host and clock shared by one scenario.
pub struct Harness {
    pub store: InMemoryLmsStore,
    pub host: MockVideoHost,
    pub clock: Arc<FixedClock>,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            store: InMemoryLmsStore::new(),
            host: MockVideoHost::new(),
            clock: Arc::new(FixedClock::new(now())),
        }
    }

    pub fn with_host(mut self, host: MockVideoHost) -> Self {
        self.host = host;
        self
    }

    pub fn context(&self) -> JobContext {
        JobContext::new(
            self.store.open_scope(),
            self.clock.clone(),
            CancellationToken::new(),
        )
    }

    /// One iteration in a fresh scope, as the scheduler would run it.
    pub async fn run(&self, job: &MaintenanceJob) -> Result<JobOutcome, JobError> {
        job.execute(&self.context()).await
    }

    pub fn insert_live_lesson_with_video(&self, library_id: &str, asset_id: &str) -> Lesson {
        let lesson =
            Lesson::new(Uuid::new_v4(), Uuid::new_v4()).with_video(VideoAssetKey::new(library_id, asset_id));
        self.store.insert_lesson(lesson.clone());
        lesson
    }

    pub fn insert_deleted_lesson(&self, deleted_at: DateTime<Utc>) -> Lesson {
        let lesson = Lesson::new(Uuid::new_v4(), Uuid::new_v4()).soft_deleted_at(deleted_at);
        self.store.insert_lesson(lesson.clone());
        lesson
    }

    pub fn lesson_ids(&self) -> Vec<Uuid> {
        self.store.lessons().iter().map(|lesson| lesson.id).collect()
    }
}
