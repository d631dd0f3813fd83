//! Domain services for the LMS maintenance worker.
//!
//! Services contain business logic that operates on domain models.

pub mod orphan_reconciliation;
pub mod retention;

pub use orphan_reconciliation::{
    DeletionFailure, KeepSet, LibrarySkip, OrphanCleanupSummary, SkipReason,
};
pub use retention::{
    grant_is_stale, grant_needs_revocation, lesson_is_purgeable, RetentionOverflow, RetentionWindow,
};
