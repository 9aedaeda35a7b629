use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context as _};
use async_trait::async_trait;
use clap::Parser;
use tileview::prelude::*;

/// Frame interval of the delivery loop
const FRAME: Duration = Duration::from_millis(16);

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// viewport width in pixels
    #[arg(long, default_value_t = 1024, allow_negative_numbers = true)]
    width: i32,

    /// viewport height in pixels
    #[arg(long, default_value_t = 768, allow_negative_numbers = true)]
    height: i32,

    /// zoom in this many times after the first grid
    #[arg(long, value_name = "int", default_value_t = 0)]
    zoom_in: u8,

    /// tile URL template with {z}, {x}, {y} and optional {s}
    #[arg(long, value_name = "url")]
    tile_url: Option<String>,

    /// serve generated tiles instead of downloading them
    #[arg(long)]
    offline: bool,

    /// JSON configuration file
    #[arg(long, value_name = "file")]
    config: Option<PathBuf>,

    /// give up after this many milliseconds
    #[arg(long, value_name = "int", default_value_t = 10_000)]
    timeout_ms: u64,
}

/// Generates a small placeholder payload per tile
struct SyntheticFetcher;

#[async_trait]
impl TileFetcher for SyntheticFetcher {
    async fn fetch_tile(&self, zoom: u8, x: u32, y: u32) -> Result<TileImage, FetchError> {
        tokio::time::sleep(Duration::from_millis(5 + u64::from((x + y) % 7) * 3)).await;
        Ok(TileImage::from(format!("tile {}/{}/{}", zoom, x, y).into_bytes()))
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            TileViewConfig::from_json_str(&json)?
        }
        None => TileViewConfig::default(),
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("starting the async runtime")?;

    let (fetcher, tile_size): (Arc<dyn TileFetcher>, TileSizeSource) = if cli.offline {
        (Arc::new(SyntheticFetcher), TileSizeSource::fixed(TILE_SIZE))
    } else {
        let fetcher = match &cli.tile_url {
            Some(template) => HttpTileFetcher::new(Box::new(UrlTemplateSource::new(template))),
            None => HttpTileFetcher::openstreetmap(),
        };
        let tile_size = fetcher.tile_size_source();
        (Arc::new(fetcher), tile_size)
    };

    let context = PolledContext::new();
    let view_model = MapViewModel::builder()
        .with_shared_fetcher(fetcher)
        .with_tile_size(tile_size)
        .with_spawner(TokioSpawner::new(runtime.handle().clone()))
        .with_delivery_context(context.clone())
        .with_config(config)
        .build()?;

    let mut grids = view_model.tile_grid();
    let mut results = view_model.tile_load_results();
    view_model.set_viewport_size(cli.width, cli.height);

    let deadline = Instant::now() + Duration::from_millis(cli.timeout_ms);
    let mut zooms_left = cli.zoom_in;
    let mut current: Option<Arc<TileGrid>> = None;
    let mut reported = 0usize;

    loop {
        context.run_pending();

        while let Some(event) = grids.try_recv() {
            let grid = event.context("tile grid failed")?;
            println!(
                "grid #{}: zoom {} viewport {} -> {}x{} tiles of {} px",
                grid.generation(),
                grid.zoom(),
                grid.viewport(),
                grid.columns(),
                grid.rows(),
                grid.tile_size_px()
            );
            reported = 0;
            current = Some(grid);

            if zooms_left > 0 {
                zooms_left -= 1;
                view_model.zoom_in();
            }
        }

        while let Some(event) = results.try_recv() {
            let result = event?;
            let stale = current.as_ref().map_or(true, |grid| !result.is_from(grid));
            match &result.image {
                Some(image) => println!(
                    "  {} loaded ({} bytes){}",
                    result.tile,
                    image.len(),
                    if stale { " [stale]" } else { "" }
                ),
                None => println!("  {} missing", result.tile),
            }
            if !stale {
                reported += 1;
            }
        }

        if let Some(grid) = &current {
            if zooms_left == 0 && reported >= grid.len() {
                println!("all {} tiles of grid #{} reported", grid.len(), grid.generation());
                break;
            }
        }

        if Instant::now() >= deadline {
            bail!("timed out after {} ms", cli.timeout_ms);
        }
        std::thread::sleep(FRAME);
    }

    view_model.shutdown();
    Ok(())
}
