//! Debug views of graphics memory: single tiles, palettes, whole tile sheets.
//!
//! These reuse the row sampler and the scalar resolver, so what they show is
//! exactly what the compositor would draw for an unflipped tile. Transparent
//! pixels show the backdrop colour.

use crate::color::ColorTable;
use crate::palette::{PaletteRam, resolve_scalar};
use crate::tile::{Flip, TileBank, TileSpace};
use crate::{PALETTE_SIZE, TILE_SIZE};

/// Tiles per row in a tile sheet.
pub const SHEET_COLUMNS: usize = 16;

/// Decode one tile to 64 ARGB32 pixels, row-major.
///
/// `palette` is the flat palette number (0-15), so sprite tiles are
/// normally shown with 8-15.
#[must_use]
pub fn decode_tile(bank: &TileBank, space: TileSpace, tile: u16, palette: u8, palettes: &PaletteRam) -> [u32; 64] {
    let mut keys = [0u8; 64];
    let t = bank.get(space, tile);
    for (row, chunk) in keys.chunks_exact_mut(TILE_SIZE).enumerate() {
        t.sample_row(row as u8, palette, Flip::NONE, 0..TILE_SIZE, chunk);
    }
    let mut pixels = [0u32; 64];
    resolve_scalar(&keys, palettes, ColorTable::global(), &mut pixels);
    pixels
}

/// The eight colours of flat palette `palette` (0-15).
#[must_use]
pub fn decode_palette(palettes: &PaletteRam, palette: u8) -> [u32; PALETTE_SIZE] {
    let base = (palette & 0x0F) << 3;
    let keys: [u8; PALETTE_SIZE] = std::array::from_fn(|entry| base | entry as u8);
    let mut colors = [0u32; PALETTE_SIZE];
    resolve_scalar(&keys, palettes, ColorTable::global(), &mut colors);
    colors
}

/// Width and height in pixels of the sheet for `space`.
#[must_use]
pub const fn sheet_size(space: TileSpace) -> (usize, usize) {
    let rows = space.count().div_ceil(SHEET_COLUMNS);
    (SHEET_COLUMNS * TILE_SIZE, rows * TILE_SIZE)
}

/// Every tile of `space` laid out [`SHEET_COLUMNS`] wide, row-major ARGB32.
#[must_use]
pub fn tile_sheet(bank: &TileBank, space: TileSpace, palette: u8, palettes: &PaletteRam) -> Vec<u32> {
    let (width, height) = sheet_size(space);
    let mut sheet = vec![0; width * height];
    for tile in 0..space.count() {
        let pixels = decode_tile(bank, space, tile as u16, palette, palettes);
        let x0 = (tile % SHEET_COLUMNS) * TILE_SIZE;
        let y0 = (tile / SHEET_COLUMNS) * TILE_SIZE;
        for (row, src) in pixels.chunks_exact(TILE_SIZE).enumerate() {
            let start = (y0 + row) * width + x0;
            sheet[start..start + TILE_SIZE].copy_from_slice(src);
        }
    }
    sheet
}
