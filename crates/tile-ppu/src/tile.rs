//! Tile graphics bank and the tile row sampler.
//!
//! A tile is 8×8 pixels stored as three bit-planes. Each plane is a `u64`:
//! row `r` lives in bits `8r..8r+8`, and within a row byte column 0 (the
//! leftmost pixel) is bit 7. A pixel's colour index is the 3-bit number
//! `p0 | p1 << 1 | p2 << 2`.
//!
//! Sampling turns a row into colour keys: 0 for index 0 (transparent),
//! otherwise `8 * palette + index`.

use std::ops::Range;

use crate::{BG_TILE_COUNT, SPRITE_TILE_COUNT, TILE_SIZE};

/// Flip flags shared by map cells and sprites.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Flip {
    /// Mirror columns.
    pub horizontal: bool,
    /// Mirror rows.
    pub vertical: bool,
}

impl Flip {
    pub const NONE: Self = Self {
        horizontal: false,
        vertical: false,
    };
    pub const HORIZONTAL: Self = Self {
        horizontal: true,
        vertical: false,
    };
    pub const VERTICAL: Self = Self {
        horizontal: false,
        vertical: true,
    };
}

/// One 8×8 tile as three packed bit-planes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tile {
    pub planes: [u64; 3],
}

impl Tile {
    /// All-transparent tile.
    pub const EMPTY: Self = Self { planes: [0; 3] };

    /// Build a tile from 64 colour indices in row-major order.
    ///
    /// Only the low three bits of each index are kept.
    #[must_use]
    pub fn from_indices(indices: &[u8; 64]) -> Self {
        let mut planes = [0u64; 3];
        for (i, &index) in indices.iter().enumerate() {
            let row = i / TILE_SIZE;
            let col = i % TILE_SIZE;
            let bit = row * 8 + (7 - col);
            for (plane, word) in planes.iter_mut().enumerate() {
                if (index >> plane) & 1 != 0 {
                    *word |= 1u64 << bit;
                }
            }
        }
        Self { planes }
    }

    /// A tile filled with a single colour index.
    #[must_use]
    pub fn solid(index: u8) -> Self {
        Self::from_indices(&[index; 64])
    }

    /// The three plane bytes for one row (0-7).
    #[inline]
    #[must_use]
    pub fn row_bytes(&self, row: u8) -> [u8; 3] {
        let shift = u32::from(row & 7) * 8;
        [
            (self.planes[0] >> shift) as u8,
            (self.planes[1] >> shift) as u8,
            (self.planes[2] >> shift) as u8,
        ]
    }

    /// Colour index (0-7) at a pixel, without flipping.
    #[must_use]
    pub fn index_at(&self, row: u8, col: u8) -> u8 {
        let [p0, p1, p2] = self.row_bytes(row);
        decode_column(p0, p1, p2, col)
    }

    /// Sample columns `cols` of one row into colour keys.
    ///
    /// `palette` is the flat palette number (0-15). `out` receives
    /// `cols.len()` bytes, each 0 (transparent) or `8 * palette + index`.
    /// Vertical flip picks the mirrored row; horizontal flip reverses the
    /// plane bytes before columns are read left to right.
    #[inline]
    pub fn sample_row(&self, row: u8, palette: u8, flip: Flip, cols: Range<usize>, out: &mut [u8]) {
        debug_assert!(cols.end <= TILE_SIZE && cols.start <= cols.end);
        debug_assert_eq!(out.len(), cols.len());

        let row = if flip.vertical { 7 - (row & 7) } else { row & 7 };
        let [mut p0, mut p1, mut p2] = self.row_bytes(row);
        if flip.horizontal {
            p0 = p0.reverse_bits();
            p1 = p1.reverse_bits();
            p2 = p2.reverse_bits();
        }

        let base = (palette & 0x0F) << 3;
        for (slot, col) in out.iter_mut().zip(cols) {
            let index = decode_column(p0, p1, p2, col as u8);
            *slot = if index == 0 { 0 } else { base | index };
        }
    }
}

#[inline]
fn decode_column(p0: u8, p1: u8, p2: u8, col: u8) -> u8 {
    let shift = 7 - (col & 7);
    ((p0 >> shift) & 1) | (((p1 >> shift) & 1) << 1) | (((p2 >> shift) & 1) << 2)
}

/// Which half of the bank a tile reference points into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum TileSpace {
    /// Tiles referenced by map cells.
    Background,
    /// Tiles referenced by sprites.
    Sprite,
}

impl TileSpace {
    /// Tiles in this space.
    #[must_use]
    pub const fn count(self) -> usize {
        match self {
            Self::Background => BG_TILE_COUNT,
            Self::Sprite => SPRITE_TILE_COUNT,
        }
    }
}

/// The tile graphics bank: background tiles and sprite tiles.
///
/// References are masked into range rather than bounds-checked, so a bad
/// reference draws the wrong tile instead of failing.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TileBank {
    background: Vec<Tile>,
    sprite: Vec<Tile>,
}

impl TileBank {
    /// Bank with every tile empty.
    #[must_use]
    pub fn new() -> Self {
        Self {
            background: vec![Tile::EMPTY; BG_TILE_COUNT],
            sprite: vec![Tile::EMPTY; SPRITE_TILE_COUNT],
        }
    }

    /// Background tile by reference.
    #[inline]
    #[must_use]
    pub fn background(&self, tile: u16) -> &Tile {
        &self.background[tile as usize & (BG_TILE_COUNT - 1)]
    }

    /// Sprite tile by reference.
    #[inline]
    #[must_use]
    pub fn sprite(&self, tile: u16) -> &Tile {
        &self.sprite[tile as usize & (SPRITE_TILE_COUNT - 1)]
    }

    /// Tile in either space.
    #[must_use]
    pub fn get(&self, space: TileSpace, tile: u16) -> &Tile {
        match space {
            TileSpace::Background => self.background(tile),
            TileSpace::Sprite => self.sprite(tile),
        }
    }

    /// Replace a tile. The reference wraps like a read does.
    pub fn set(&mut self, space: TileSpace, tile: u16, value: Tile) {
        let slot = match space {
            TileSpace::Background => &mut self.background[tile as usize & (BG_TILE_COUNT - 1)],
            TileSpace::Sprite => &mut self.sprite[tile as usize & (SPRITE_TILE_COUNT - 1)],
        };
        *slot = value;
    }

    /// Lengths of the background and sprite spaces as stored.
    pub(crate) fn lens(&self) -> (usize, usize) {
        (self.background.len(), self.sprite.len())
    }
}

impl Default for TileBank {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A tile where every pixel has a distinct-ish index pattern.
    fn gradient_tile() -> Tile {
        let mut indices = [0u8; 64];
        for (i, v) in indices.iter_mut().enumerate() {
            *v = ((i * 5 + i / 8) % 8) as u8;
        }
        Tile::from_indices(&indices)
    }

    fn sample(tile: &Tile, row: u8, palette: u8, flip: Flip) -> [u8; 8] {
        let mut out = [0u8; 8];
        tile.sample_row(row, palette, flip, 0..8, &mut out);
        out
    }

    #[test]
    fn from_indices_round_trips_through_index_at() {
        let tile = gradient_tile();
        for row in 0..8u8 {
            for col in 0..8u8 {
                let i = usize::from(row) * 8 + usize::from(col);
                assert_eq!(tile.index_at(row, col), ((i * 5 + i / 8) % 8) as u8);
            }
        }
    }

    #[test]
    fn plane_one_bit_zero_is_row_zero_last_column() {
        let tile = Tile {
            planes: [0, 1, 0],
        };
        let out = sample(&tile, 0, 2, Flip::NONE);
        assert_eq!(out, [0, 0, 0, 0, 0, 0, 0, 18]);
    }

    #[test]
    fn index_zero_is_transparent_regardless_of_palette() {
        let out = sample(&Tile::EMPTY, 3, 15, Flip::NONE);
        assert_eq!(out, [0; 8]);
    }

    #[test]
    fn keys_carry_palette_base() {
        let out = sample(&Tile::solid(5), 0, 9, Flip::NONE);
        assert_eq!(out, [77; 8]);
    }

    #[test]
    fn horizontal_flip_reverses_columns() {
        let tile = gradient_tile();
        for row in 0..8 {
            let plain = sample(&tile, row, 3, Flip::NONE);
            let mut flipped = sample(&tile, row, 3, Flip::HORIZONTAL);
            flipped.reverse();
            assert_eq!(plain, flipped, "row {row}");
        }
    }

    #[test]
    fn vertical_flip_mirrors_rows() {
        let tile = gradient_tile();
        for row in 0..8 {
            assert_eq!(
                sample(&tile, row, 1, Flip::VERTICAL),
                sample(&tile, 7 - row, 1, Flip::NONE)
            );
        }
    }

    #[test]
    fn sub_range_matches_full_row_slice() {
        let tile = gradient_tile();
        let flips = [
            Flip::NONE,
            Flip::HORIZONTAL,
            Flip::VERTICAL,
            Flip {
                horizontal: true,
                vertical: true,
            },
        ];
        for flip in flips {
            let full = sample(&tile, 6, 4, flip);
            for start in 0..=8 {
                for end in start..=8 {
                    let mut out = vec![0xAA; end - start];
                    tile.sample_row(6, 4, flip, start..end, &mut out);
                    assert_eq!(out, full[start..end], "{flip:?} {start}..{end}");
                }
            }
        }
    }

    #[test]
    fn bank_references_wrap() {
        let mut bank = TileBank::new();
        bank.set(TileSpace::Background, 3, Tile::solid(1));
        bank.set(TileSpace::Sprite, 3, Tile::solid(2));
        assert_eq!(*bank.background(3 + BG_TILE_COUNT as u16), Tile::solid(1));
        assert_eq!(*bank.sprite(3 + SPRITE_TILE_COUNT as u16), Tile::solid(2));
        assert_eq!(*bank.get(TileSpace::Background, 4), Tile::EMPTY);
    }
}
