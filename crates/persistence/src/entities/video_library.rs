//! Video library credential entity, read from the categories table.

use domain::models::LibraryCredential;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct VideoLibraryCredentialEntity {
    pub bunny_library_id: String,
    pub bunny_api_key: String,
}

impl From<VideoLibraryCredentialEntity> for LibraryCredential {
    fn from(entity: VideoLibraryCredentialEntity) -> Self {
        LibraryCredential::new(entity.bunny_library_id, entity.bunny_api_key)
    }
}
