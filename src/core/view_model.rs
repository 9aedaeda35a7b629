//! The map view model
//!
//! Wires the zoom cell and the viewport channel into a
//! [`TileGridCombinator`] and feeds its grids to a [`TileLoadPipeline`],
//! which delivers each grid and then its per-tile results to observers on
//! the delivery context.

use crate::core::builder::MapViewModelBuilder;
use crate::core::config::TileViewConfig;
use crate::core::constants::{MAX_ZOOM, MIN_ZOOM};
use crate::core::viewport::{ViewportSize, ViewportSizeChannel};
use crate::core::zoom::ZoomLevel;
use crate::prelude::Arc;
use crate::reactive::scheduler::DeliveryContext;
use crate::reactive::subject::Subscription;
use crate::runtime::AsyncSpawner;
use crate::tiles::combinator::TileGridCombinator;
use crate::tiles::descriptor::TileGrid;
use crate::tiles::fetch::{TileFetcher, TileLoadResult};
use crate::tiles::pipeline::TileLoadPipeline;
use crate::tiles::size::TileSizeSource;
use crate::Result;

pub struct MapViewModel {
    config: TileViewConfig,
    zoom: ZoomLevel,
    viewport: ViewportSizeChannel,
    combinator: TileGridCombinator,
    pipeline: TileLoadPipeline,
}

impl MapViewModel {
    pub fn builder() -> MapViewModelBuilder {
        MapViewModelBuilder::new()
    }

    /// View model with default configuration, delivering on a serial context
    /// of the current Tokio runtime
    pub fn new(fetcher: Arc<dyn TileFetcher>, tile_size: TileSizeSource) -> Result<Self> {
        MapViewModelBuilder::new()
            .with_shared_fetcher(fetcher)
            .with_tile_size(tile_size)
            .build()
    }

    pub(crate) fn start(
        fetcher: Arc<dyn TileFetcher>,
        tile_size: TileSizeSource,
        spawner: Arc<dyn AsyncSpawner>,
        context: Arc<dyn DeliveryContext>,
        config: TileViewConfig,
    ) -> Self {
        let zoom = ZoomLevel::new(config.clamped_initial_zoom());
        let viewport = ViewportSizeChannel::new();

        // Both subscriptions exist before the first viewport size can be
        // published, so no input is lost
        let combinator = TileGridCombinator::spawn(
            zoom.subscribe(),
            viewport.subscribe(),
            tile_size,
            spawner.as_ref(),
            config.log_inputs,
        );

        let pipeline = TileLoadPipeline::spawn(
            combinator.subscribe(),
            fetcher,
            spawner,
            context,
            config.max_concurrent_fetches,
        );

        log::debug!(
            "map view model started at zoom {} with {:?}",
            zoom.get(),
            config
        );

        Self {
            config,
            zoom,
            viewport,
            combinator,
            pipeline,
        }
    }

    /// Increase the zoom level by one, up to the maximum
    pub fn zoom_in(&self) {
        let changed = self
            .zoom
            .update(|level| level.saturating_add(1).min(MAX_ZOOM));
        if let Some((from, to)) = changed {
            log::debug!("zoom in: {} -> {}", from, to);
        }
    }

    /// Decrease the zoom level by one, down to the minimum
    pub fn zoom_out(&self) {
        let changed = self
            .zoom
            .update(|level| level.saturating_sub(1).max(MIN_ZOOM));
        if let Some((from, to)) = changed {
            log::debug!("zoom out: {} -> {}", from, to);
        }
    }

    pub fn zoom_level(&self) -> u8 {
        self.zoom.get()
    }

    /// Publish a new viewport size. Negative dimensions are clamped to zero.
    pub fn set_viewport_size(&self, width: i32, height: i32) {
        self.viewport.publish(ViewportSize::new(width, height));
    }

    /// Grid stream, starting with the most recently delivered grid
    ///
    /// A grid is always delivered before any of its load results.
    pub fn tile_grid(&self) -> Subscription<Arc<TileGrid>> {
        self.pipeline.subscribe_grids()
    }

    /// Most recently delivered grid, if any
    pub fn latest_grid(&self) -> Option<Arc<TileGrid>> {
        self.pipeline.latest_grid()
    }

    /// Per-tile load results from now on
    ///
    /// Ends after [`MapViewModel::shutdown`] once the fetches already
    /// running have delivered.
    pub fn tile_load_results(&self) -> Subscription<TileLoadResult> {
        self.pipeline.subscribe()
    }

    pub fn config(&self) -> &TileViewConfig {
        &self.config
    }

    /// Stop combining inputs and loading new grids
    ///
    /// Fetches already running still deliver their results. Also called on
    /// drop.
    pub fn shutdown(&self) {
        self.combinator.cancel();
        self.pipeline.cancel();
    }

    pub fn is_running(&self) -> bool {
        !self.combinator.is_finished()
    }
}

impl Drop for MapViewModel {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::scheduler::ImmediateContext;
    use crate::tiles::fetch::{FetchError, TileImage};
    use async_trait::async_trait;

    struct NoTiles;

    #[async_trait]
    impl TileFetcher for NoTiles {
        async fn fetch_tile(&self, _zoom: u8, _x: u32, _y: u32) -> Result<TileImage, FetchError> {
            Err(FetchError::Status(404))
        }
    }

    fn view_model(initial_zoom: u8) -> MapViewModel {
        MapViewModel::builder()
            .with_fetcher(NoTiles)
            .with_delivery_context(ImmediateContext)
            .with_config(TileViewConfig::for_testing().with_initial_zoom(initial_zoom))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_zoom_in_stops_at_max() {
        let vm = view_model(MAX_ZOOM - 1);
        vm.zoom_in();
        assert_eq!(vm.zoom_level(), MAX_ZOOM);
        vm.zoom_in();
        assert_eq!(vm.zoom_level(), MAX_ZOOM);
    }

    #[tokio::test]
    async fn test_zoom_out_stops_at_min() {
        let vm = view_model(1);
        vm.zoom_out();
        assert_eq!(vm.zoom_level(), MIN_ZOOM);
        vm.zoom_out();
        assert_eq!(vm.zoom_level(), MIN_ZOOM);
    }

    #[tokio::test]
    async fn test_concurrent_zoom_in_loses_no_step() {
        let vm = view_model(0);
        std::thread::scope(|scope| {
            for _ in 0..MAX_ZOOM {
                scope.spawn(|| vm.zoom_in());
            }
        });
        assert_eq!(vm.zoom_level(), MAX_ZOOM);

        std::thread::scope(|scope| {
            for _ in 0..5 {
                scope.spawn(|| vm.zoom_out());
            }
        });
        assert_eq!(vm.zoom_level(), MAX_ZOOM - 5);
    }

    #[tokio::test]
    async fn test_initial_zoom_is_clamped() {
        let vm = view_model(99);
        assert_eq!(vm.zoom_level(), MAX_ZOOM);
    }

    #[tokio::test]
    async fn test_no_grid_before_viewport() {
        let vm = view_model(3);
        tokio::task::yield_now().await;
        assert!(vm.latest_grid().is_none());
        assert!(vm.is_running());
    }
}
