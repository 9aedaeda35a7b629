//! Fluent construction of a [`MapViewModel`]
//!
//! Only the fetcher is mandatory. Everything else falls back to a default:
//! the standard 256 px tile size, the current Tokio runtime and a serial
//! delivery context on that runtime.

use crate::core::config::TileViewConfig;
use crate::core::constants::TILE_SIZE;
use crate::core::view_model::MapViewModel;
use crate::prelude::Arc;
use crate::reactive::scheduler::{DeliveryContext, SerialContext};
use crate::runtime::{AsyncSpawner, TokioSpawner};
use crate::tiles::fetch::TileFetcher;
use crate::tiles::size::TileSizeSource;
use crate::{MapError, Result};

/// Builder for creating and configuring MapViewModel instances
#[derive(Default)]
pub struct MapViewModelBuilder {
    fetcher: Option<Arc<dyn TileFetcher>>,
    tile_size: Option<TileSizeSource>,
    context: Option<Arc<dyn DeliveryContext>>,
    spawner: Option<Arc<dyn AsyncSpawner>>,
    config: TileViewConfig,
}

impl MapViewModelBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the fetcher every tile is loaded through
    pub fn with_fetcher<F: TileFetcher + 'static>(self, fetcher: F) -> Self {
        self.with_shared_fetcher(Arc::new(fetcher))
    }

    pub fn with_shared_fetcher(mut self, fetcher: Arc<dyn TileFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Set where the tile pixel size comes from
    pub fn with_tile_size(mut self, tile_size: TileSizeSource) -> Self {
        self.tile_size = Some(tile_size);
        self
    }

    /// Use a constant tile pixel size
    pub fn with_tile_size_px(self, tile_size_px: u32) -> Self {
        self.with_tile_size(TileSizeSource::fixed(tile_size_px))
    }

    /// Set the context grids and load results are delivered on
    pub fn with_delivery_context<C: DeliveryContext>(self, context: C) -> Self {
        self.with_shared_context(Arc::new(context))
    }

    pub fn with_shared_context(mut self, context: Arc<dyn DeliveryContext>) -> Self {
        self.context = Some(context);
        self
    }

    pub fn with_spawner<S: AsyncSpawner>(mut self, spawner: S) -> Self {
        self.spawner = Some(Arc::new(spawner));
        self
    }

    pub fn with_config(mut self, config: TileViewConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_initial_zoom(mut self, zoom: u8) -> Self {
        self.config.initial_zoom = zoom;
        self
    }

    pub fn with_max_concurrent_fetches(mut self, limit: Option<usize>) -> Self {
        self.config.max_concurrent_fetches = limit;
        self
    }

    /// Build the view model and start its tasks
    ///
    /// Fails without a fetcher, with an invalid configuration, or when no
    /// spawner was given and there is no current Tokio runtime.
    pub fn build(self) -> Result<MapViewModel> {
        let fetcher = self
            .fetcher
            .ok_or_else(|| MapError::Config("No tile fetcher specified".to_string()))?;
        self.config.validate()?;

        let spawner: Arc<dyn AsyncSpawner> = match self.spawner {
            Some(spawner) => spawner,
            None => Arc::new(TokioSpawner::current()?),
        };
        let context: Arc<dyn DeliveryContext> = match self.context {
            Some(context) => context,
            None => Arc::new(SerialContext::new(spawner.as_ref())),
        };
        let tile_size = self
            .tile_size
            .unwrap_or_else(|| TileSizeSource::fixed(TILE_SIZE));

        Ok(MapViewModel::start(
            fetcher, tile_size, spawner, context, self.config,
        ))
    }
}

/// Convenience presets
impl MapViewModelBuilder {
    /// Bounded fetch concurrency and quiet input logging
    pub fn low_resource() -> Self {
        Self::new().with_config(TileViewConfig::low_resource())
    }
}
