//! Reference HTTP implementation of [`TileFetcher`]

use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;

use super::fetch::{FetchError, TileFetcher, TileImage};
use super::size::TileSizeSource;
use super::source::{OpenStreetMapSource, TileSource};
use crate::core::constants::{HTTP_TIMEOUT_SECS, USER_AGENT};

/// Shared async HTTP client. Public tile servers (e.g. OpenStreetMap) reject
/// requests without a User-Agent, and building the client once avoids TLS
/// and connection pool setup for every tile.
pub(crate) static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(|| {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
        .pool_max_idle_per_host(16)
        .build()
        .unwrap_or_else(|e| {
            log::warn!("falling back to default HTTP client: {}", e);
            reqwest::Client::new()
        })
});

/// Fetches tiles over HTTP from the URLs of a [`TileSource`]
pub struct HttpTileFetcher {
    source: Box<dyn TileSource>,
    client: reqwest::Client,
}

impl HttpTileFetcher {
    pub fn new(source: Box<dyn TileSource>) -> Self {
        Self::with_client(source, HTTP_CLIENT.clone())
    }

    pub fn with_client(source: Box<dyn TileSource>, client: reqwest::Client) -> Self {
        Self { source, client }
    }

    pub fn openstreetmap() -> Self {
        Self::new(Box::new(OpenStreetMapSource::new()))
    }

    /// Tile size as advertised by the source
    pub fn tile_size_source(&self) -> TileSizeSource {
        TileSizeSource::fixed(self.source.tile_size())
    }
}

#[async_trait]
impl TileFetcher for HttpTileFetcher {
    async fn fetch_tile(&self, zoom: u8, x: u32, y: u32) -> Result<TileImage, FetchError> {
        let url = self.source.url(zoom, x, y);
        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status().as_u16()));
        }

        let bytes = response.bytes().await?;
        log::debug!("downloaded tile {}/{}/{} ({} bytes)", zoom, x, y, bytes.len());
        Ok(TileImage::from(bytes.to_vec()))
    }
}
