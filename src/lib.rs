//! # tileview
//!
//! The reactive core of a map-tile viewer.
//!
//! A [`MapViewModel`] combines the current zoom level, the viewport size and
//! the tile pixel size into the grid of visible tiles, and loads every tile of
//! every grid through an asynchronous [`TileFetcher`]. Both the grid and the
//! per-tile load results are observable as streams delivered on a single
//! [`DeliveryContext`].

pub mod core;
pub mod prelude;
pub mod reactive;
pub mod runtime;
pub mod tiles;
pub use crate::core::constants;

// Re-export public API
pub use core::{
    builder::MapViewModelBuilder,
    config::TileViewConfig,
    view_model::MapViewModel,
    viewport::{ViewportSize, ViewportSizeChannel},
    zoom::ZoomLevel,
};

pub use reactive::{
    scheduler::{DeliveryContext, ImmediateContext, PolledContext, SerialContext},
    subject::{BehaviorSubject, PublishSubject, Subscription},
};

pub use runtime::{AsyncHandle, AsyncSpawner, TokioSpawner};

pub use tiles::{
    combinator::TileGridCombinator,
    descriptor::{TileDescriptor, TileGrid},
    fetch::{FetchError, TileFetcher, TileImage, TileLoadResult},
    pipeline::TileLoadPipeline,
    size::TileSizeSource,
    source::{OpenStreetMapSource, TileSource, UrlTemplateSource},
};

#[cfg(feature = "http")]
pub use tiles::http::HttpTileFetcher;

/// Result type used throughout the library
pub type Result<T, E = MapError> = std::result::Result<T, E>;

/// Common error types
///
/// Errors are `Clone` because a terminal error is replayed to every late
/// subscriber of a failed stream.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MapError {
    #[error("Tile size source failed: {0}")]
    TileSize(String),

    #[error("Tile size source finished without producing a tile size")]
    TileSizeUnavailable,

    #[error("Tile grid of {columns}x{rows} tiles is too large")]
    GridTooLarge { columns: u32, rows: u32 },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Runtime error: {0}")]
    Runtime(String),

    #[error("Stream closed")]
    Closed,
}

/// Error type alias for convenience
pub type Error = MapError;
