//! Fan-out/fan-in loading of every tile of every grid
//!
//! Each tile is fetched on its own task. The fetch outcome, failure and
//! panic included, is turned into a [`TileLoadResult`] inside that task, so
//! nothing but plain values ever reaches the shared result subject.
//!
//! Grids and results share one path to the delivery context: a grid is
//! posted before any of its fetches is spawned, so observers always see a
//! grid before the results that belong to it.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use futures::{FutureExt, StreamExt};
use tokio::sync::Semaphore;

use super::descriptor::{TileDescriptor, TileGrid};
use super::fetch::{FetchError, TileFetcher, TileLoadResult};
use crate::prelude::Arc;
use crate::reactive::scheduler::DeliveryContext;
use crate::reactive::subject::{BehaviorSubject, PublishSubject, Subscription};
use crate::runtime::{AsyncHandle, AsyncSpawner, SpawnerExt};

/// Everything a per-tile task needs, shared across all of them
struct LoadShared {
    fetcher: Arc<dyn TileFetcher>,
    spawner: Arc<dyn AsyncSpawner>,
    context: Arc<dyn DeliveryContext>,
    grids: BehaviorSubject<Arc<TileGrid>>,
    results: PublishSubject<TileLoadResult>,
    limiter: Option<Arc<Semaphore>>,
    in_flight: AtomicUsize,
    accepting: AtomicBool,
}

impl LoadShared {
    /// Complete the result stream once no grid can arrive and no fetch is left
    fn complete_if_idle(&self) {
        if !self.accepting.load(Ordering::SeqCst) && self.in_flight.load(Ordering::SeqCst) == 0 {
            let results = self.results.clone();
            self.context.post(Box::new(move || results.complete()));
        }
    }
}

/// Ends the grid stream and stops accepting grids when the run loop exits,
/// whether it finished or was cancelled
struct StopAccepting(Arc<LoadShared>);

impl Drop for StopAccepting {
    fn drop(&mut self) {
        let shared = &self.0;
        shared.accepting.store(false, Ordering::SeqCst);

        // No-op when the grid stream already failed
        let grids = shared.grids.clone();
        shared.context.post(Box::new(move || grids.complete()));
        shared.complete_if_idle();
    }
}

/// Running tile load pipeline
pub struct TileLoadPipeline {
    grids: BehaviorSubject<Arc<TileGrid>>,
    results: PublishSubject<TileLoadResult>,
    handle: Box<dyn AsyncHandle>,
}

impl TileLoadPipeline {
    /// Start loading the tiles of every grid received on `grids`
    ///
    /// Grids and results are published from `context`. With `max_concurrent`
    /// set, at most that many fetches run at once; the rest wait their turn.
    pub fn spawn(
        grids: Subscription<Arc<TileGrid>>,
        fetcher: Arc<dyn TileFetcher>,
        spawner: Arc<dyn AsyncSpawner>,
        context: Arc<dyn DeliveryContext>,
        max_concurrent: Option<usize>,
    ) -> Self {
        let delivered = BehaviorSubject::empty();
        let results = PublishSubject::new();
        let shared = Arc::new(LoadShared {
            fetcher,
            spawner: spawner.clone(),
            context,
            grids: delivered.clone(),
            results: results.clone(),
            limiter: max_concurrent.map(|permits| Arc::new(Semaphore::new(permits))),
            in_flight: AtomicUsize::new(0),
            accepting: AtomicBool::new(true),
        });
        let handle = spawner.spawn(run(grids, shared));
        Self {
            grids: delivered,
            results,
            handle,
        }
    }

    /// Grids as delivered on the context, starting with the latest one
    pub fn subscribe_grids(&self) -> Subscription<Arc<TileGrid>> {
        self.grids.subscribe()
    }

    pub fn latest_grid(&self) -> Option<Arc<TileGrid>> {
        self.grids.value()
    }

    /// Per-tile results from now on; earlier results are not replayed
    ///
    /// The stream ends once the pipeline has stopped accepting grids and
    /// every fetch already started has delivered.
    pub fn subscribe(&self) -> Subscription<TileLoadResult> {
        self.results.subscribe()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Stop accepting grids. Fetches already started still deliver.
    pub fn cancel(&self) {
        self.handle.cancel();
    }
}

async fn run(mut grids: Subscription<Arc<TileGrid>>, shared: Arc<LoadShared>) {
    let _stop = StopAccepting(Arc::clone(&shared));

    while let Some(event) = grids.next().await {
        let grid = match event {
            Ok(grid) => grid,
            Err(e) => {
                log::error!("tile grid stream failed, no further tiles will be loaded: {}", e);
                let delivered = shared.grids.clone();
                shared.context.post(Box::new(move || delivered.error(e)));
                return;
            }
        };

        log::debug!(
            "loading {} tiles of grid generation {}",
            grid.len(),
            grid.generation()
        );

        let delivered = shared.grids.clone();
        let announced = Arc::clone(&grid);
        shared.context.post(Box::new(move || {
            delivered.next(announced);
        }));

        for tile in grid.iter().copied() {
            spawn_load(&shared, tile, grid.generation());
        }
    }
    log::debug!("tile grid stream finished");
}

fn spawn_load(shared: &Arc<LoadShared>, tile: TileDescriptor, generation: u64) {
    shared.in_flight.fetch_add(1, Ordering::SeqCst);
    let task_shared = Arc::clone(shared);
    // The handle is dropped on purpose: superseded grids never cancel fetches
    let _ = shared.spawner.spawn(async move {
        let _permit = match &task_shared.limiter {
            Some(limiter) => limiter.clone().acquire_owned().await.ok(),
            None => None,
        };

        let result = load_tile(task_shared.fetcher.as_ref(), tile, generation).await;

        let results = task_shared.results.clone();
        task_shared.context.post(Box::new(move || {
            results.next(result);
        }));

        if task_shared.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            task_shared.complete_if_idle();
        }
    });
}

/// Fetch one tile and fold any failure into the result
pub async fn load_tile(
    fetcher: &dyn TileFetcher,
    tile: TileDescriptor,
    generation: u64,
) -> TileLoadResult {
    log::debug!("fetching tile {}", tile);
    let outcome = AssertUnwindSafe(fetcher.fetch_tile(tile.zoom, tile.x, tile.y))
        .catch_unwind()
        .await
        .unwrap_or(Err(FetchError::Panicked));

    match outcome {
        Ok(image) => TileLoadResult::loaded(tile, image, generation),
        Err(e) => {
            log::warn!("tile {} failed to load: {}", tile, e);
            TileLoadResult::failed(tile, generation)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::viewport::ViewportSize;
    use crate::reactive::scheduler::ImmediateContext;
    use crate::runtime::TokioSpawner;
    use crate::tiles::fetch::TileImage;
    use crate::MapError;
    use async_trait::async_trait;

    struct OddTilesFail;

    #[async_trait]
    impl TileFetcher for OddTilesFail {
        async fn fetch_tile(&self, zoom: u8, x: u32, y: u32) -> Result<TileImage, FetchError> {
            if (x + y) % 2 == 1 {
                return Err(format!("no tile at {}/{}/{}", zoom, x, y).into());
            }
            if x == 2 {
                panic!("fetcher bug at column 2");
            }
            Ok(TileImage::from(vec![zoom, x as u8, y as u8]))
        }
    }

    #[tokio::test]
    async fn test_success_carries_image() {
        let tile = TileDescriptor::new(3, 0, 0, 256);
        let result = load_tile(&OddTilesFail, tile, 5).await;

        assert_eq!(result.tile, tile);
        assert_eq!(result.generation, 5);
        assert_eq!(result.image.unwrap().as_bytes(), &[3, 0, 0]);
    }

    #[tokio::test]
    async fn test_failure_becomes_absent_image() {
        let tile = TileDescriptor::new(3, 1, 0, 256);
        let result = load_tile(&OddTilesFail, tile, 1).await;

        assert_eq!(result, TileLoadResult::failed(tile, 1));
    }

    #[tokio::test]
    async fn test_panic_becomes_absent_image() {
        let tile = TileDescriptor::new(3, 2, 0, 256);
        let result = load_tile(&OddTilesFail, tile, 1).await;

        assert!(!result.is_loaded());
        assert_eq!(result.tile, tile);
    }

    async fn drain_until_end<T>(sub: &mut Subscription<T>) -> Vec<T> {
        let mut items = Vec::new();
        tokio::time::timeout(std::time::Duration::from_secs(2), async {
            while let Some(item) = sub.next().await {
                items.push(item.unwrap());
            }
        })
        .await
        .expect("stream did not end");
        items
    }

    #[tokio::test]
    async fn test_streams_end_after_last_grid_and_fetch() {
        let spawner: Arc<dyn AsyncSpawner> = Arc::new(TokioSpawner::current().unwrap());
        let source = PublishSubject::new();
        let pipeline = TileLoadPipeline::spawn(
            source.subscribe(),
            Arc::new(OddTilesFail),
            spawner,
            Arc::new(ImmediateContext),
            Some(2),
        );
        let mut grids = pipeline.subscribe_grids();
        let mut results = pipeline.subscribe();

        let grid = TileGrid::compute(1, ViewportSize::from_pixels(200, 300), 100)
            .unwrap()
            .with_generation(1);
        source.next(Arc::new(grid.clone()));
        source.complete();

        let delivered = drain_until_end(&mut grids).await;
        assert_eq!(delivered.len(), 1);
        assert_eq!(*delivered[0], grid);

        let loaded = drain_until_end(&mut results).await;
        assert_eq!(loaded.len(), grid.len());
        assert!(loaded.iter().all(|r| r.is_from(&grid)));
    }

    #[tokio::test]
    async fn test_grid_failure_is_delivered_after_earlier_grids() {
        let spawner: Arc<dyn AsyncSpawner> = Arc::new(TokioSpawner::current().unwrap());
        let source = PublishSubject::new();
        let pipeline = TileLoadPipeline::spawn(
            source.subscribe(),
            Arc::new(OddTilesFail),
            spawner,
            Arc::new(ImmediateContext),
            None,
        );
        let mut grids = pipeline.subscribe_grids();

        let grid = TileGrid::compute(0, ViewportSize::from_pixels(0, 0), 256).unwrap();
        source.next(Arc::new(grid));
        source.error(MapError::TileSizeUnavailable);

        let first = tokio::time::timeout(std::time::Duration::from_secs(2), grids.next())
            .await
            .unwrap();
        assert!(matches!(first, Some(Ok(_))));
        let second = tokio::time::timeout(std::time::Duration::from_secs(2), grids.next())
            .await
            .unwrap();
        assert_eq!(second, Some(Err(MapError::TileSizeUnavailable)));
    }
}
