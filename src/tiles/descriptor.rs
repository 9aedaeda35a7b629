//! Tile descriptors and the grids they form

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::constants::MAX_GRID_TILES;
use crate::core::viewport::ViewportSize;
use crate::prelude::Arc;
use crate::{MapError, Result};

/// One grid cell at a zoom level, with its pixel origin in the viewport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileDescriptor {
    pub zoom: u8,
    pub x: u32,
    pub y: u32,
    pub pixel_x: u32,
    pub pixel_y: u32,
}

impl TileDescriptor {
    pub fn new(zoom: u8, x: u32, y: u32, tile_size_px: u32) -> Self {
        Self {
            zoom,
            x,
            y,
            pixel_x: x * tile_size_px,
            pixel_y: y * tile_size_px,
        }
    }
}

impl fmt::Display for TileDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.x, self.y)
    }
}

/// The visible tiles for one (zoom, viewport, tile size) combination
///
/// Immutable once built; cloning shares the descriptor storage. The
/// `generation` identifies the recomputation that produced the grid and is
/// ignored by equality, so grids recomputed from equal inputs compare equal.
#[derive(Debug, Clone)]
pub struct TileGrid {
    generation: u64,
    zoom: u8,
    viewport: ViewportSize,
    tile_size_px: u32,
    tiles: Arc<[TileDescriptor]>,
}

impl TileGrid {
    /// Lay out every whole tile that fits in `viewport`, column by column
    ///
    /// Fails with [`MapError::GridTooLarge`] above [`MAX_GRID_TILES`] tiles.
    pub fn compute(zoom: u8, viewport: ViewportSize, tile_size_px: u32) -> Result<Self> {
        let (columns, rows) = grid_dimensions(viewport, tile_size_px);
        let count = u64::from(columns) * u64::from(rows);
        if count > MAX_GRID_TILES {
            return Err(MapError::GridTooLarge { columns, rows });
        }

        let mut tiles = Vec::with_capacity(count as usize);
        for x in 0..columns {
            for y in 0..rows {
                tiles.push(TileDescriptor::new(zoom, x, y, tile_size_px));
            }
        }

        Ok(Self {
            generation: 0,
            zoom,
            viewport,
            tile_size_px,
            tiles: tiles.into(),
        })
    }

    pub(crate) fn with_generation(mut self, generation: u64) -> Self {
        self.generation = generation;
        self
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    pub fn viewport(&self) -> ViewportSize {
        self.viewport
    }

    pub fn tile_size_px(&self) -> u32 {
        self.tile_size_px
    }

    pub fn columns(&self) -> u32 {
        grid_dimensions(self.viewport, self.tile_size_px).0
    }

    pub fn rows(&self) -> u32 {
        grid_dimensions(self.viewport, self.tile_size_px).1
    }

    pub fn tiles(&self) -> &[TileDescriptor] {
        &self.tiles
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TileDescriptor> {
        self.tiles.iter()
    }

    /// Descriptor at column `x`, row `y`
    pub fn get(&self, x: u32, y: u32) -> Option<&TileDescriptor> {
        let (columns, rows) = grid_dimensions(self.viewport, self.tile_size_px);
        if x >= columns || y >= rows {
            return None;
        }
        self.tiles.get(x as usize * rows as usize + y as usize)
    }
}

fn grid_dimensions(viewport: ViewportSize, tile_size_px: u32) -> (u32, u32) {
    if tile_size_px == 0 {
        return (0, 0);
    }
    (viewport.width / tile_size_px, viewport.height / tile_size_px)
}

impl PartialEq for TileGrid {
    fn eq(&self, other: &Self) -> bool {
        self.zoom == other.zoom
            && self.viewport == other.viewport
            && self.tile_size_px == other.tile_size_px
            && self.tiles == other.tiles
    }
}

impl Eq for TileGrid {}

impl<'a> IntoIterator for &'a TileGrid {
    type Item = &'a TileDescriptor;
    type IntoIter = std::slice::Iter<'a, TileDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_reference_grid() {
        let grid = TileGrid::compute(2, ViewportSize::from_pixels(320, 480), 100).unwrap();

        assert_eq!(grid.columns(), 3);
        assert_eq!(grid.rows(), 4);
        assert_eq!(grid.len(), 12);

        let tile = grid.get(1, 2).unwrap();
        assert_eq!(
            *tile,
            TileDescriptor {
                zoom: 2,
                x: 1,
                y: 2,
                pixel_x: 100,
                pixel_y: 200
            }
        );
        assert!(grid.iter().all(|t| t.zoom == 2));
    }

    #[test]
    fn test_tile_count_and_uniqueness() {
        let cases = [
            (0, 0, 256),
            (255, 1000, 256),
            (1024, 768, 256),
            (999, 101, 10),
            (7, 7, 1),
        ];

        for (width, height, tile_size) in cases {
            let viewport = ViewportSize::from_pixels(width, height);
            let grid = TileGrid::compute(5, viewport, tile_size).unwrap();
            let expected = (width / tile_size) * (height / tile_size);
            assert_eq!(
                grid.len(),
                expected as usize,
                "{}x{} / {}",
                width,
                height,
                tile_size
            );

            let cells: HashSet<(u32, u32)> = grid.iter().map(|t| (t.x, t.y)).collect();
            assert_eq!(cells.len(), grid.len());
            assert!(grid
                .iter()
                .all(|t| t.x < width / tile_size && t.y < height / tile_size));
            assert!(grid
                .iter()
                .all(|t| t.pixel_x == t.x * tile_size && t.pixel_y == t.y * tile_size));
        }
    }

    #[test]
    fn test_zero_tile_size_yields_empty_grid() {
        let grid = TileGrid::compute(0, ViewportSize::from_pixels(800, 600), 0).unwrap();
        assert!(grid.is_empty());
        assert_eq!(grid.get(0, 0), None);
    }

    #[test]
    fn test_tiles_are_laid_out_column_by_column() {
        let grid = TileGrid::compute(1, ViewportSize::from_pixels(200, 200), 100).unwrap();
        let order: Vec<(u32, u32)> = grid.iter().map(|t| (t.x, t.y)).collect();
        assert_eq!(order, vec![(0, 0), (0, 1), (1, 0), (1, 1)]);
    }

    #[test]
    fn test_equality_ignores_generation() {
        let viewport = ViewportSize::from_pixels(512, 512);
        let first = TileGrid::compute(3, viewport, 256).unwrap().with_generation(1);
        let second = TileGrid::compute(3, viewport, 256).unwrap().with_generation(2);

        assert_eq!(first, second);
        assert_ne!(first.generation(), second.generation());
        assert_ne!(first, TileGrid::compute(4, viewport, 256).unwrap());
    }

    #[test]
    fn test_oversized_grid_is_rejected() {
        let huge = ViewportSize::new(i32::MAX, i32::MAX);
        let result = TileGrid::compute(0, huge, 1);
        assert_eq!(
            result,
            Err(MapError::GridTooLarge {
                columns: i32::MAX as u32,
                rows: i32::MAX as u32
            })
        );

        // Exactly at the limit is fine
        let at_limit = ViewportSize::from_pixels(1024, 1024);
        assert_eq!(TileGrid::compute(0, at_limit, 1).unwrap().len() as u64, MAX_GRID_TILES);
        let over = ViewportSize::from_pixels(1025, 1024);
        assert!(TileGrid::compute(0, over, 1).is_err());
    }

    #[test]
    fn test_descriptor_display() {
        assert_eq!(TileDescriptor::new(3, 4, 5, 256).to_string(), "3/4/5");
    }
}
