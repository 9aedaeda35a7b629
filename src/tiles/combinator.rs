//! Latest-value combination of zoom, viewport size and tile size
//!
//! Each of the three inputs ticks independently. Every tick updates
//! [`CombineState`], and once all three have been seen every later tick
//! produces a fresh [`TileGrid`] from the newest value of each input. Grids
//! are cached in a [`BehaviorSubject`], so a late subscriber starts from the
//! current grid instead of waiting for the next tick.

use std::panic::AssertUnwindSafe;

use futures::stream::{self, BoxStream};
use futures::{FutureExt, StreamExt};

use super::descriptor::TileGrid;
use super::size::TileSizeSource;
use crate::core::viewport::ViewportSize;
use crate::prelude::Arc;
use crate::reactive::subject::{BehaviorSubject, Subscription};
use crate::runtime::{AsyncHandle, AsyncSpawner, SpawnerExt};
use crate::{MapError, Result};

/// A tick from one of the combined inputs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombineInput {
    Zoom(u8),
    Viewport(ViewportSize),
    TileSize(u32),
}

/// Latest known value of every input
///
/// Owned by the combinator task alone.
#[derive(Debug, Default)]
pub struct CombineState {
    zoom: Option<u8>,
    viewport: Option<ViewportSize>,
    tile_size_px: Option<u32>,
    generation: u64,
}

impl CombineState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `input` and recompute, if every input has a value by now
    ///
    /// Fails when the resulting grid would be too large; the input is kept.
    pub fn apply(&mut self, input: CombineInput) -> Result<Option<TileGrid>> {
        match input {
            CombineInput::Zoom(zoom) => self.zoom = Some(zoom),
            CombineInput::Viewport(viewport) => self.viewport = Some(viewport),
            CombineInput::TileSize(px) => self.tile_size_px = Some(px),
        }
        self.evaluate()
    }

    pub fn has_all(&self) -> bool {
        self.zoom.is_some() && self.viewport.is_some() && self.tile_size_px.is_some()
    }

    pub fn has_tile_size(&self) -> bool {
        self.tile_size_px.is_some()
    }

    /// Generation of the most recently produced grid, 0 before the first
    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn evaluate(&mut self) -> Result<Option<TileGrid>> {
        let (Some(zoom), Some(viewport), Some(tile_size_px)) =
            (self.zoom, self.viewport, self.tile_size_px)
        else {
            return Ok(None);
        };

        let grid = TileGrid::compute(zoom, viewport, tile_size_px)?;
        self.generation += 1;
        Ok(Some(grid.with_generation(self.generation)))
    }
}

enum Tick {
    Input(CombineInput),
    TileSizeFailed(String),
    TileSizeExhausted,
    Upstream(MapError),
}

/// Running combination of the three grid inputs
pub struct TileGridCombinator {
    grids: BehaviorSubject<Arc<TileGrid>>,
    handle: Box<dyn AsyncHandle>,
}

impl TileGridCombinator {
    /// Start combining on `spawner`
    ///
    /// The subscriptions must be taken before any value is published that
    /// should count, since the viewport channel does not replay.
    pub fn spawn(
        zoom: Subscription<u8>,
        viewport: Subscription<ViewportSize>,
        tile_size: TileSizeSource,
        spawner: &dyn AsyncSpawner,
        log_inputs: bool,
    ) -> Self {
        let grids = BehaviorSubject::empty();
        let ticks = merge_inputs(zoom, viewport, tile_size);
        let task_grids = grids.clone();
        let handle = spawner.spawn(async move {
            let combining = AssertUnwindSafe(run(ticks, task_grids.clone(), log_inputs));
            if combining.catch_unwind().await.is_err() {
                log::error!("tile grid combinator panicked");
                task_grids.error(MapError::Runtime(
                    "tile grid combinator panicked".to_string(),
                ));
            }
        });
        Self { grids, handle }
    }

    /// Grid stream, starting with the current grid if there is one
    pub fn subscribe(&self) -> Subscription<Arc<TileGrid>> {
        self.grids.subscribe()
    }

    pub fn latest(&self) -> Option<Arc<TileGrid>> {
        self.grids.value()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub fn cancel(&self) {
        self.handle.cancel();
    }
}

fn merge_inputs(
    zoom: Subscription<u8>,
    viewport: Subscription<ViewportSize>,
    tile_size: TileSizeSource,
) -> BoxStream<'static, Tick> {
    let zoom = zoom
        .map(|event| match event {
            Ok(level) => Tick::Input(CombineInput::Zoom(level)),
            Err(e) => Tick::Upstream(e),
        })
        .boxed();

    let viewport = viewport
        .map(|event| match event {
            Ok(size) => Tick::Input(CombineInput::Viewport(size)),
            Err(e) => Tick::Upstream(e),
        })
        .boxed();

    let tile_size = tile_size
        .into_stream()
        .map(|event| match event {
            Ok(px) => Tick::Input(CombineInput::TileSize(px)),
            Err(e) => Tick::TileSizeFailed(e.to_string()),
        })
        .chain(stream::once(async { Tick::TileSizeExhausted }))
        .boxed();

    stream::select_all([zoom, viewport, tile_size]).boxed()
}

fn log_input(input: &CombineInput) {
    match input {
        CombineInput::Zoom(level) => log::debug!("zoom_level: {}", level),
        CombineInput::Viewport(size) => log::debug!("viewport_size: {}", size),
        CombineInput::TileSize(px) => log::debug!("tile_size_px: {}", px),
    }
}

async fn run(
    mut ticks: BoxStream<'static, Tick>,
    grids: BehaviorSubject<Arc<TileGrid>>,
    log_inputs: bool,
) {
    let mut state = CombineState::new();

    while let Some(tick) = ticks.next().await {
        match tick {
            Tick::Input(input) => {
                if log_inputs {
                    log_input(&input);
                }
                match state.apply(input) {
                    Ok(Some(grid)) => {
                        log::debug!(
                            "tile grid generation {}: {} tiles at zoom {}",
                            grid.generation(),
                            grid.len(),
                            grid.zoom()
                        );
                        grids.next(Arc::new(grid));
                    }
                    Ok(None) => {}
                    Err(e) => {
                        log::error!("cannot build tile grid: {}", e);
                        grids.error(e);
                        return;
                    }
                }
            }
            Tick::TileSizeExhausted => {
                if !state.has_tile_size() {
                    log::error!("tile size source finished without a tile size");
                    grids.error(MapError::TileSizeUnavailable);
                    return;
                }
            }
            Tick::TileSizeFailed(message) => {
                log::error!("tile size source failed: {}", message);
                grids.error(MapError::TileSize(message));
                return;
            }
            Tick::Upstream(error) => {
                log::error!("grid input failed: {}", error);
                grids.error(error);
                return;
            }
        }
    }

    log::debug!("all grid inputs finished");
    grids.complete();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::viewport::ViewportSizeChannel;
    use crate::core::zoom::ZoomLevel;
    use crate::runtime::TokioSpawner;
    use std::time::Duration;

    fn viewport(width: u32, height: u32) -> CombineInput {
        CombineInput::Viewport(ViewportSize::from_pixels(width, height))
    }

    fn feed(state: &mut CombineState, inputs: &[CombineInput]) {
        for input in inputs {
            state.apply(*input).unwrap();
        }
    }

    fn grid_after(state: &mut CombineState, input: CombineInput) -> TileGrid {
        state
            .apply(input)
            .unwrap()
            .expect("all inputs are known")
    }

    #[test]
    fn test_no_grid_until_every_input_is_known() {
        let mut state = CombineState::new();
        assert!(state.apply(CombineInput::Zoom(2)).unwrap().is_none());
        assert!(state.apply(viewport(320, 480)).unwrap().is_none());
        assert!(!state.has_all());

        let grid = grid_after(&mut state, CombineInput::TileSize(100));
        assert!(state.has_all());
        assert_eq!(grid.len(), 12);
        assert_eq!(grid.generation(), 1);
    }

    #[test]
    fn test_viewport_change_reuses_last_zoom_and_tile_size() {
        let mut state = CombineState::new();
        feed(
            &mut state,
            &[
                CombineInput::TileSize(100),
                CombineInput::Zoom(7),
                viewport(300, 300),
            ],
        );

        let grid = grid_after(&mut state, viewport(500, 200));
        assert_eq!(grid.zoom(), 7);
        assert_eq!(grid.tile_size_px(), 100);
        assert_eq!(grid.len(), 10);
        assert_eq!(state.generation(), 2);
    }

    #[test]
    fn test_repeated_input_recomputes_equal_grid() {
        let mut state = CombineState::new();
        feed(&mut state, &[CombineInput::TileSize(256), CombineInput::Zoom(1)]);

        let first = grid_after(&mut state, viewport(1024, 768));
        let second = grid_after(&mut state, viewport(1024, 768));
        assert_eq!(first, second);
        assert!(second.generation() > first.generation());
    }

    #[test]
    fn test_tile_size_change_recomputes() {
        let mut state = CombineState::new();
        feed(&mut state, &[CombineInput::Zoom(0), viewport(512, 512)]);
        assert_eq!(grid_after(&mut state, CombineInput::TileSize(256)).len(), 4);
        assert_eq!(grid_after(&mut state, CombineInput::TileSize(128)).len(), 16);
        assert!(grid_after(&mut state, CombineInput::TileSize(0)).is_empty());
    }

    #[test]
    fn test_oversized_grid_fails_without_new_generation() {
        let mut state = CombineState::new();
        feed(&mut state, &[CombineInput::Zoom(0), CombineInput::TileSize(1)]);
        grid_after(&mut state, viewport(10, 10));

        let result = state.apply(viewport(u32::MAX, u32::MAX));
        assert!(matches!(result, Err(MapError::GridTooLarge { .. })));
        assert_eq!(state.generation(), 1);
    }

    fn failing_lookup() -> u32 {
        panic!("tile size lookup blew up")
    }

    async fn first_event(combinator: &TileGridCombinator) -> Option<Result<Arc<TileGrid>>> {
        let mut grids = combinator.subscribe();
        tokio::time::timeout(Duration::from_secs(2), grids.next())
            .await
            .expect("grid stream stayed silent")
    }

    #[tokio::test]
    async fn test_oversized_viewport_ends_grid_stream_with_error() {
        let spawner = TokioSpawner::current().unwrap();
        let zoom = ZoomLevel::new(0);
        let viewports = ViewportSizeChannel::new();
        let combinator = TileGridCombinator::spawn(
            zoom.subscribe(),
            viewports.subscribe(),
            TileSizeSource::fixed(1),
            &spawner,
            false,
        );

        viewports.publish(ViewportSize::new(i32::MAX, i32::MAX));

        let event = first_event(&combinator).await;
        assert!(matches!(event, Some(Err(MapError::GridTooLarge { .. }))));
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(combinator.is_finished());
    }

    #[tokio::test]
    async fn test_panic_in_inputs_ends_grid_stream_with_error() {
        let spawner = TokioSpawner::current().unwrap();
        let zoom = ZoomLevel::new(0);
        let viewports = ViewportSizeChannel::new();
        let exploding = TileSizeSource::from_future(async { Ok(failing_lookup()) });
        let combinator = TileGridCombinator::spawn(
            zoom.subscribe(),
            viewports.subscribe(),
            exploding,
            &spawner,
            false,
        );

        let event = first_event(&combinator).await;
        assert!(matches!(event, Some(Err(MapError::Runtime(_)))));
    }
}
