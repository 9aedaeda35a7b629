//! Core constants shared by the view model, the combinator and the reference
//! HTTP adapter. Keeping them in a single place makes engine-wide magic
//! numbers easy to find.

/// Lowest zoom level.
pub const MIN_ZOOM: u8 = 0;

/// Highest zoom level; `zoom_in` saturates here.
pub const MAX_ZOOM: u8 = 20;

/// Default square tile size in pixels.
pub const TILE_SIZE: u32 = 256;

/// Most tiles a single grid may hold. Larger viewport / tile size ratios
/// end the grid stream with `MapError::GridTooLarge`.
pub const MAX_GRID_TILES: u64 = 1 << 20;

/// User agent sent by the HTTP adapter. Public tile servers reject
/// anonymous clients.
pub const USER_AGENT: &str = concat!("tileview/", env!("CARGO_PKG_VERSION"));

/// Per-request timeout of the HTTP adapter, in seconds.
pub const HTTP_TIMEOUT_SECS: u64 = 10;
