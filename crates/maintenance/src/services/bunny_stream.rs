//! Bunny Stream video host client.
//!
//! Implements [`VideoHost`] on top of the Bunny Stream library API. Every
//! request authenticates with the library's own API key in the `AccessKey`
//! header.

use domain::models::LibraryCredential;
use domain::stores::{VideoHost, VideoHostError};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::BunnyConfig;

/// Longest error body kept in an error message.
const MAX_ERROR_BODY_LEN: usize = 512;

/// One page of `GET /library/{libraryId}/videos`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoListPage {
    total_items: u64,
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
struct VideoItem {
    guid: String,
}

/// HTTP client for the Bunny Stream API.
#[derive(Clone)]
pub struct BunnyStreamClient {
    client: Client,
    base_url: String,
    page_size: u32,
}

impl BunnyStreamClient {
    /// Create a client from configuration.
    pub fn new(config: &BunnyConfig) -> Result<Self, VideoHostError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| VideoHostError::Request(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            page_size: config.page_size.max(1),
        })
    }

    fn videos_url(&self, library_id: &str) -> String {
        format!("{}/library/{}/videos", self.base_url, library_id)
    }

    async fn fetch_page(
        &self,
        credential: &LibraryCredential,
        page: u32,
    ) -> Result<VideoListPage, VideoHostError> {
        let response = self
            .client
            .get(self.videos_url(&credential.library_id))
            .header("AccessKey", &credential.api_key)
            .query(&[("page", page), ("itemsPerPage", self.page_size)])
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(unexpected_status(status, response).await);
        }

        response
            .json::<VideoListPage>()
            .await
            .map_err(|e| VideoHostError::InvalidResponse(e.to_string()))
    }
}

#[async_trait::async_trait]
impl VideoHost for BunnyStreamClient {
    async fn list_asset_ids(
        &self,
        credential: &LibraryCredential,
    ) -> Result<Vec<String>, VideoHostError> {
        let mut ids = Vec::new();
        let mut page = 1;

        loop {
            let listing = self.fetch_page(credential, page).await?;
            let received = listing.items.len();
            ids.extend(listing.items.into_iter().map(|item| item.guid));

            debug!(
                library_id = %credential.library_id,
                page = page,
                received = received,
                total = listing.total_items,
                "Fetched video listing page"
            );

            if received == 0 || ids.len() as u64 >= listing.total_items {
                break;
            }
            page += 1;
        }

        Ok(ids)
    }

    async fn delete_asset(
        &self,
        credential: &LibraryCredential,
        asset_id: &str,
    ) -> Result<(), VideoHostError> {
        let url = format!("{}/{}", self.videos_url(&credential.library_id), asset_id);
        let response = self
            .client
            .delete(url)
            .header("AccessKey", &credential.api_key)
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            warn!(
                library_id = %credential.library_id,
                asset_id = asset_id,
                "Video already gone at host, treating as deleted"
            );
            return Ok(());
        }
        if !status.is_success() {
            return Err(unexpected_status(status, response).await);
        }

        Ok(())
    }
}

fn request_error(error: reqwest::Error) -> VideoHostError {
    if error.is_timeout() {
        VideoHostError::Request(format!("timed out: {}", error))
    } else {
        VideoHostError::Request(error.to_string())
    }
}

async fn unexpected_status(status: StatusCode, response: reqwest::Response) -> VideoHostError {
    let mut message = response.text().await.unwrap_or_default();
    if message.len() > MAX_ERROR_BODY_LEN {
        let mut end = MAX_ERROR_BODY_LEN;
        while !message.is_char_boundary(end) {
            end -= 1;
        }
        message.truncate(end);
    }
    VideoHostError::UnexpectedStatus {
        status: status.as_u16(),
        message,
    }
}
