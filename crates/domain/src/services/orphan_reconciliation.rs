//! Keep-set construction and per-run bookkeeping for orphaned video cleanup.

use std::collections::{BTreeSet, HashSet};
use std::fmt;

use crate::models::VideoAssetKey;

/// Remote assets that must survive because a live lesson references them.
#[derive(Debug, Clone, Default)]
pub struct KeepSet {
    keys: HashSet<VideoAssetKey>,
}

impl KeepSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: VideoAssetKey) -> bool {
        self.keys.insert(key)
    }

    pub fn contains(&self, library_id: &str, asset_id: &str) -> bool {
        self.keys.contains(&VideoAssetKey::new(library_id, asset_id))
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Distinct library ids referenced by the set, in a stable order.
    pub fn library_ids(&self) -> Vec<String> {
        self.keys
            .iter()
            .map(|key| key.library_id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Remote ids of `library_id` that nothing in the set references.
    ///
    /// Order follows `remote_ids`; duplicates reported by the host are
    /// collapsed.
    pub fn orphans_in(&self, library_id: &str, remote_ids: &[String]) -> Vec<String> {
        let mut seen = HashSet::new();
        remote_ids
            .iter()
            .filter(|id| !self.contains(library_id, id))
            .filter(|id| seen.insert(id.as_str()))
            .cloned()
            .collect()
    }
}

impl FromIterator<VideoAssetKey> for KeepSet {
    fn from_iter<I: IntoIterator<Item = VideoAssetKey>>(iter: I) -> Self {
        Self {
            keys: iter.into_iter().collect(),
        }
    }
}

/// Why a library was left out of a reconciliation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// No category carries an API key for the library.
    MissingCredential,
    /// The host could not list the library's assets.
    ListingFailed(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingCredential => write!(f, "missing credential"),
            SkipReason::ListingFailed(msg) => write!(f, "listing failed: {}", msg),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibrarySkip {
    pub library_id: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionFailure {
    pub key: VideoAssetKey,
    pub error: String,
}

/// Aggregate of one orphan cleanup run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrphanCleanupSummary {
    pub keep_set_size: usize,
    pub libraries_reconciled: usize,
    pub assets_listed: usize,
    pub orphans_found: usize,
    pub deleted: Vec<VideoAssetKey>,
    pub skipped_libraries: Vec<LibrarySkip>,
    pub failed_deletions: Vec<DeletionFailure>,
}

impl OrphanCleanupSummary {
    pub fn record_skip(&mut self, library_id: &str, reason: SkipReason) {
        self.skipped_libraries.push(LibrarySkip {
            library_id: library_id.to_string(),
            reason,
        });
    }

    /// Fold the result of one deletion attempt into the summary.
    pub fn record_deletion<E: fmt::Display>(&mut self, key: VideoAssetKey, result: Result<(), E>) {
        match result {
            Ok(()) => self.deleted.push(key),
            Err(e) => self.failed_deletions.push(DeletionFailure {
                key,
                error: e.to_string(),
            }),
        }
    }

    pub fn deleted_count(&self) -> usize {
        self.deleted.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed_deletions.len()
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped_libraries.len()
    }

    /// True when every library was reconciled and every deletion succeeded.
    pub fn is_clean(&self) -> bool {
        self.skipped_libraries.is_empty() && self.failed_deletions.is_empty()
    }
}

impl fmt::Display for OrphanCleanupSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "libraries reconciled={} skipped={}, orphans found={} deleted={} failed={}",
            self.libraries_reconciled,
            self.skipped_count(),
            self.orphans_found,
            self.deleted_count(),
            self.failed_count()
        )
    }
}
