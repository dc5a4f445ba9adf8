//! Background tile maps and plane addressing.
//!
//! Two maps tile an unbounded scrolling plane in a checkerboard: for an
//! absolute pixel `(ax, ay)` the map-space offsets are `ax / 256` and
//! `ay / 256`, and the map whose number matches the parity of their sum is
//! active. Within a map, coordinates wrap modulo its 256×256 pixel size.
//!
//! Plane coordinates are `u16` and wrap at 65536, a multiple of the 512-pixel
//! checkerboard period, so wrapping never shows a seam.

use crate::tile::Flip;
use crate::{MAP_HEIGHT_TILES, MAP_WIDTH_TILES, TILE_SIZE};

/// Map width in pixels.
pub const MAP_PIXEL_WIDTH: u16 = (MAP_WIDTH_TILES * TILE_SIZE) as u16;
/// Map height in pixels.
pub const MAP_PIXEL_HEIGHT: u16 = (MAP_HEIGHT_TILES * TILE_SIZE) as u16;

/// One map cell: which tile, which background palette, and how it is flipped.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MapCell {
    /// Background tile reference.
    pub tile: u16,
    /// Background palette selector (0-7).
    pub palette: u8,
    pub flip: Flip,
}

impl MapCell {
    #[must_use]
    pub const fn new(tile: u16, palette: u8) -> Self {
        Self {
            tile,
            palette,
            flip: Flip::NONE,
        }
    }

    #[must_use]
    pub const fn with_flip(mut self, flip: Flip) -> Self {
        self.flip = flip;
        self
    }
}

/// A 32×32 grid of cells.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TileMap {
    cells: Vec<MapCell>,
}

impl TileMap {
    /// Map with every cell pointing at tile 0, palette 0.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cells: vec![MapCell::default(); MAP_WIDTH_TILES * MAP_HEIGHT_TILES],
        }
    }

    /// Cell at a tile coordinate. Coordinates wrap.
    #[inline]
    #[must_use]
    pub fn cell(&self, col: usize, row: usize) -> &MapCell {
        &self.cells[(row % MAP_HEIGHT_TILES) * MAP_WIDTH_TILES + (col % MAP_WIDTH_TILES)]
    }

    /// Replace a cell. Coordinates wrap.
    pub fn set(&mut self, col: usize, row: usize, cell: MapCell) {
        self.cells[(row % MAP_HEIGHT_TILES) * MAP_WIDTH_TILES + (col % MAP_WIDTH_TILES)] = cell;
    }

    /// Fill every cell.
    pub fn fill(&mut self, cell: MapCell) {
        self.cells.fill(cell);
    }

    pub(crate) fn len(&self) -> usize {
        self.cells.len()
    }
}

impl Default for TileMap {
    fn default() -> Self {
        Self::new()
    }
}

/// Which of the two maps covers an absolute plane pixel.
#[inline]
#[must_use]
pub fn active_map(ax: u16, ay: u16) -> usize {
    let mx = ax / MAP_PIXEL_WIDTH;
    let my = ay / MAP_PIXEL_HEIGHT;
    usize::from((mx + my) & 1)
}

/// A resolved plane position: the cell under a pixel plus the pixel's
/// offset inside that cell's tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaneHit<'a> {
    pub cell: &'a MapCell,
    /// Column within the tile (0-7), before flipping.
    pub fine_x: u8,
    /// Row within the tile (0-7), before flipping.
    pub fine_y: u8,
}

/// Resolve an absolute plane pixel against the pair of maps.
#[inline]
#[must_use]
pub fn locate(maps: &[TileMap; 2], ax: u16, ay: u16) -> PlaneHit<'_> {
    let map = &maps[active_map(ax, ay)];
    let lx = ax % MAP_PIXEL_WIDTH;
    let ly = ay % MAP_PIXEL_HEIGHT;
    PlaneHit {
        cell: map.cell(usize::from(lx) / TILE_SIZE, usize::from(ly) / TILE_SIZE),
        fine_x: (lx & 7) as u8,
        fine_y: (ly & 7) as u8,
    }
}
