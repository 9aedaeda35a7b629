//! Prelude module for common tileview types and traits
//!
//! This module re-exports the most commonly used types, traits, and functions
//! for easy importing with `use tileview::prelude::*;`

pub use crate::core::{
    builder::MapViewModelBuilder,
    config::TileViewConfig,
    constants::{MAX_ZOOM, MIN_ZOOM, TILE_SIZE},
    view_model::MapViewModel,
    viewport::{ViewportSize, ViewportSizeChannel},
    zoom::ZoomLevel,
};

pub use crate::reactive::{
    scheduler::{forward_on, DeliveryContext, ImmediateContext, PolledContext, SerialContext},
    subject::{BehaviorSubject, Observer, PublishSubject, Subscription},
};

pub use crate::runtime::{AsyncHandle, AsyncSpawner, SpawnerExt, TokioSpawner};

pub use crate::tiles::{
    combinator::{CombineInput, CombineState, TileGridCombinator},
    descriptor::{TileDescriptor, TileGrid},
    fetch::{FetchError, TileFetcher, TileImage, TileLoadResult},
    pipeline::TileLoadPipeline,
    size::TileSizeSource,
    source::{OpenStreetMapSource, TileSource, UrlTemplateSource},
};

#[cfg(feature = "http")]
pub use crate::tiles::http::HttpTileFetcher;

pub use crate::{Error as MapError, Result};

pub use std::{
    pin::Pin,
    sync::{Arc, Mutex},
    task::{Context, Poll},
    time::Duration,
};

pub use futures::{Future, Stream, StreamExt};
