//! The tile fetch capability and what a fetch produces

use std::fmt;

use async_trait::async_trait;

use super::descriptor::{TileDescriptor, TileGrid};
use crate::prelude::Arc;

/// Raw image bytes of one tile, never decoded by this crate
#[derive(Clone, PartialEq, Eq)]
pub struct TileImage {
    data: Arc<[u8]>,
}

impl TileImage {
    pub fn new(data: impl Into<Arc<[u8]>>) -> Self {
        Self { data: data.into() }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl From<Vec<u8>> for TileImage {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}

impl fmt::Debug for TileImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TileImage({} bytes)", self.data.len())
    }
}

/// Why a single tile could not be fetched
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP status {0}")]
    Status(u16),

    #[cfg(feature = "http")]
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Fetch panicked")]
    Panicked,

    #[error("{0}")]
    Other(String),
}

impl From<String> for FetchError {
    fn from(message: String) -> Self {
        Self::Other(message)
    }
}

impl From<&str> for FetchError {
    fn from(message: &str) -> Self {
        Self::Other(message.to_string())
    }
}

/// Asynchronous per-tile image fetch
///
/// Implementations decide on transport, timeouts and threading; completion
/// may happen on any executor thread.
#[async_trait]
pub trait TileFetcher: Send + Sync {
    async fn fetch_tile(&self, zoom: u8, x: u32, y: u32) -> Result<TileImage, FetchError>;
}

/// Outcome of loading one tile
///
/// `image` is `None` when the fetch failed. `generation` is the generation of
/// the grid the tile came from; results of superseded grids are still
/// delivered and can be told apart with [`TileLoadResult::is_from`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileLoadResult {
    pub tile: TileDescriptor,
    pub image: Option<TileImage>,
    pub generation: u64,
}

impl TileLoadResult {
    pub fn loaded(tile: TileDescriptor, image: TileImage, generation: u64) -> Self {
        Self {
            tile,
            image: Some(image),
            generation,
        }
    }

    pub fn failed(tile: TileDescriptor, generation: u64) -> Self {
        Self {
            tile,
            image: None,
            generation,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.image.is_some()
    }

    /// Whether this result belongs to `grid` rather than an older one
    pub fn is_from(&self, grid: &TileGrid) -> bool {
        self.generation == grid.generation()
    }
}
