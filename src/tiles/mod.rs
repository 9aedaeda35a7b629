//! Tile grid derivation and tile loading

pub mod combinator;
pub mod descriptor;
pub mod fetch;
#[cfg(feature = "http")]
pub mod http;
pub mod pipeline;
pub mod size;
pub mod source;

// Re-exports for convenience
pub use combinator::TileGridCombinator;
pub use descriptor::{TileDescriptor, TileGrid};
pub use fetch::{FetchError, TileFetcher, TileImage, TileLoadResult};
pub use pipeline::TileLoadPipeline;
pub use size::TileSizeSource;
pub use source::{OpenStreetMapSource, TileSource, UrlTemplateSource};
