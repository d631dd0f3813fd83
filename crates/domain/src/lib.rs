//! Domain layer for the LMS maintenance worker.
//!
//! This crate contains:
//! - Domain models (Lesson, CourseAccessGrant, video identifiers)
//! - Store and video host contracts
//! - Retention and orphan reconciliation rules
//! - In-memory implementations for tests (`test-support` feature)

pub mod clock;
#[cfg(any(test, feature = "test-support"))]
pub mod mock;
pub mod models;
pub mod services;
pub mod stores;

pub use clock::{Clock, FixedClock, SystemClock};
