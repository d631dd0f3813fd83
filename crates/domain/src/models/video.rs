//! Remote video host identifiers and credentials.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one asset stored at the video host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VideoAssetKey {
    pub library_id: String,
    pub asset_id: String,
}

impl VideoAssetKey {
    pub fn new(library_id: impl Into<String>, asset_id: impl Into<String>) -> Self {
        Self {
            library_id: library_id.into(),
            asset_id: asset_id.into(),
        }
    }

    /// Build a key from nullable columns. Both ids must be present and non-blank.
    pub fn from_parts(library_id: Option<String>, asset_id: Option<String>) -> Option<Self> {
        match (library_id, asset_id) {
            (Some(library_id), Some(asset_id))
                if !library_id.trim().is_empty() && !asset_id.trim().is_empty() =>
            {
                Some(Self::new(library_id, asset_id))
            }
            _ => None,
        }
    }
}

impl fmt::Display for VideoAssetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.library_id, self.asset_id)
    }
}

/// API credential for one video library, owned by a course category.
#[derive(Clone, PartialEq, Eq)]
pub struct LibraryCredential {
    pub library_id: String,
    pub api_key: String,
}

impl LibraryCredential {
    pub fn new(library_id: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            library_id: library_id.into(),
            api_key: api_key.into(),
        }
    }
}

impl fmt::Debug for LibraryCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LibraryCredential")
            .field("library_id", &self.library_id)
            .field("api_key", &"<redacted>")
            .finish()
    }
}
