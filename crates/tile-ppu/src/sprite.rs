//! Sprites and the per-frame sprite scanline index.
//!
//! Sprites are 8×8 and draw from the sprite tile space with a foreground
//! palette. Their position in the table is their priority: on overlap the
//! lower index wins.
//!
//! The scanline index is built once per frame, before rows are handed to
//! workers, and is read-only while they run. Each row records at most
//! [`MAX_SPRITES_PER_ROW`] sprites, taken in ascending index order; the rest
//! are dropped silently.

use crate::tile::Flip;
use crate::{FOREGROUND_PALETTE_BASE, MAX_SPRITES, MAX_SPRITES_PER_ROW, SCREEN_HEIGHT, TILE_SIZE};

/// One movable object.
///
/// Sprites draw above the background unless told otherwise, both from
/// [`Sprite::new`] and when the field is missing from a loaded scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Sprite {
    /// Left edge in screen pixels. May be off-screen.
    pub x: i16,
    /// Top edge in screen rows. May be off-screen.
    pub y: i16,
    /// Sprite tile reference.
    pub tile: u16,
    /// Foreground palette selector (0-7).
    pub palette: u8,
    /// Draw over opaque background pixels instead of behind them.
    pub above_background: bool,
    pub flip: Flip,
}

impl Sprite {
    #[must_use]
    pub const fn new(x: i16, y: i16, tile: u16, palette: u8) -> Self {
        Self {
            x,
            y,
            tile,
            palette,
            above_background: true,
            flip: Flip::NONE,
        }
    }

    #[must_use]
    pub const fn behind_background(mut self) -> Self {
        self.above_background = false;
        self
    }

    #[must_use]
    pub const fn with_flip(mut self, flip: Flip) -> Self {
        self.flip = flip;
        self
    }

    /// Flat palette number (8-15) used for colour keys.
    #[inline]
    #[must_use]
    pub const fn flat_palette(&self) -> u8 {
        FOREGROUND_PALETTE_BASE + (self.palette & 7)
    }

    /// Row within the sprite's tile that covers screen row `row`, if any.
    #[inline]
    #[must_use]
    pub fn tile_row(&self, row: usize) -> Option<u8> {
        let offset = row as i32 - i32::from(self.y);
        if (0..TILE_SIZE as i32).contains(&offset) {
            Some(offset as u8)
        } else {
            None
        }
    }
}

impl Default for Sprite {
    fn default() -> Self {
        Self::new(0, 0, 0, 0)
    }
}

/// Ordered, fixed-capacity sprite collection.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct SpriteTable {
    sprites: Vec<Sprite>,
}

impl SpriteTable {
    #[must_use]
    pub fn new() -> Self {
        Self {
            sprites: Vec::with_capacity(MAX_SPRITES),
        }
    }

    /// Append a sprite and return its index, or `None` when the table is full.
    pub fn push(&mut self, sprite: Sprite) -> Option<usize> {
        if self.sprites.len() >= MAX_SPRITES {
            return None;
        }
        self.sprites.push(sprite);
        Some(self.sprites.len() - 1)
    }

    pub fn clear(&mut self) {
        self.sprites.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sprites.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sprites.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Sprite> {
        self.sprites.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Sprite> {
        self.sprites.get_mut(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Sprite> {
        self.sprites.iter()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Sprite] {
        &self.sprites
    }
}

impl std::ops::Index<usize> for SpriteTable {
    type Output = Sprite;

    fn index(&self, index: usize) -> &Sprite {
        &self.sprites[index]
    }
}

impl<'a> IntoIterator for &'a SpriteTable {
    type Item = &'a Sprite;
    type IntoIter = std::slice::Iter<'a, Sprite>;

    fn into_iter(self) -> Self::IntoIter {
        self.sprites.iter()
    }
}

/// Which sprites touch each output row.
///
/// A flat arena: row `r` owns `entries[r * MAX_SPRITES_PER_ROW..]`, of which
/// the first `counts[r]` are valid, in ascending sprite index order.
pub struct SpriteScanlineIndex {
    entries: Vec<u16>,
    counts: Vec<u8>,
}

impl SpriteScanlineIndex {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: vec![0; SCREEN_HEIGHT * MAX_SPRITES_PER_ROW],
            counts: vec![0; SCREEN_HEIGHT],
        }
    }

    /// Rebuild from a sprite table, discarding the previous frame's lists.
    pub fn build(&mut self, sprites: &SpriteTable) {
        self.counts.fill(0);
        for (index, sprite) in sprites.iter().enumerate().take(MAX_SPRITES) {
            let top = i32::from(sprite.y).max(0);
            let bottom = (i32::from(sprite.y) + TILE_SIZE as i32).min(SCREEN_HEIGHT as i32);
            for row in top..bottom {
                let row = row as usize;
                let count = usize::from(self.counts[row]);
                if count == MAX_SPRITES_PER_ROW {
                    continue;
                }
                self.entries[row * MAX_SPRITES_PER_ROW + count] = index as u16;
                self.counts[row] += 1;
            }
        }
    }

    /// Sprite indices on `row`, ascending.
    #[inline]
    #[must_use]
    pub fn row(&self, row: usize) -> &[u16] {
        let start = row * MAX_SPRITES_PER_ROW;
        &self.entries[start..start + usize::from(self.counts[row])]
    }

    /// Total entries across all rows.
    #[must_use]
    pub fn total(&self) -> usize {
        self.counts.iter().map(|&c| usize::from(c)).sum()
    }
}

impl Default for SpriteScanlineIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SpriteScanlineIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpriteScanlineIndex")
            .field("total", &self.total())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(sprites: &[Sprite]) -> SpriteTable {
        let mut t = SpriteTable::new();
        for &s in sprites {
            t.push(s);
        }
        t
    }

    #[test]
    fn footprint_covers_eight_rows() {
        let sprites = table(&[Sprite::new(10, 20, 0, 0)]);
        let mut index = SpriteScanlineIndex::new();
        index.build(&sprites);
        assert!(index.row(19).is_empty());
        for row in 20..28 {
            assert_eq!(index.row(row), &[0]);
        }
        assert!(index.row(28).is_empty());
        assert_eq!(index.total(), 8);
    }

    #[test]
    fn partially_off_top_and_bottom_is_clipped() {
        let sprites = table(&[
            Sprite::new(0, -5, 0, 0),
            Sprite::new(0, SCREEN_HEIGHT as i16 - 2, 0, 0),
        ]);
        let mut index = SpriteScanlineIndex::new();
        index.build(&sprites);
        assert_eq!(index.row(0), &[0]);
        assert_eq!(index.row(2), &[0]);
        assert!(index.row(3).is_empty());
        assert_eq!(index.row(SCREEN_HEIGHT - 1), &[1]);
        assert_eq!(index.total(), 3 + 2);
    }

    #[test]
    fn fully_off_screen_sprites_are_not_indexed() {
        let sprites = table(&[
            Sprite::new(0, -8, 0, 0),
            Sprite::new(0, SCREEN_HEIGHT as i16, 0, 0),
            Sprite::new(0, i16::MIN, 0, 0),
            Sprite::new(0, i16::MAX, 0, 0),
        ]);
        let mut index = SpriteScanlineIndex::new();
        index.build(&sprites);
        assert_eq!(index.total(), 0);
    }

    #[test]
    fn row_cap_keeps_lowest_indices() {
        let sprites = table(&vec![Sprite::new(0, 100, 0, 0); MAX_SPRITES]);
        let mut index = SpriteScanlineIndex::new();
        index.build(&sprites);
        let row = index.row(100);
        assert_eq!(row.len(), MAX_SPRITES_PER_ROW);
        let expected: Vec<u16> = (0..MAX_SPRITES_PER_ROW as u16).collect();
        assert_eq!(row, expected.as_slice());
    }

    #[test]
    fn rebuild_discards_previous_frame() {
        let mut index = SpriteScanlineIndex::new();
        index.build(&table(&[Sprite::new(0, 0, 0, 0)]));
        index.build(&table(&[Sprite::new(0, 50, 0, 0)]));
        assert!(index.row(0).is_empty());
        assert_eq!(index.row(50), &[0]);
    }

    #[test]
    fn table_is_bounded() {
        let mut t = SpriteTable::new();
        for i in 0..MAX_SPRITES {
            assert_eq!(t.push(Sprite::default()), Some(i));
        }
        assert_eq!(t.push(Sprite::default()), None);
        assert_eq!(t.len(), MAX_SPRITES);
    }

    #[test]
    fn foreground_palette_offset() {
        assert_eq!(Sprite::new(0, 0, 0, 0).flat_palette(), 8);
        assert_eq!(Sprite::new(0, 0, 0, 7).flat_palette(), 15);
        assert_eq!(Sprite::new(0, 0, 0, 9).flat_palette(), 9);
    }

    #[test]
    fn default_sprite_matches_new() {
        assert_eq!(Sprite::default(), Sprite::new(0, 0, 0, 0));
        assert!(Sprite::default().above_background);
        assert_eq!(Sprite::default().flip, Flip::NONE);
    }

    #[test]
    fn tile_row_offsets() {
        let s = Sprite::new(0, -3, 0, 0);
        assert_eq!(s.tile_row(0), Some(3));
        assert_eq!(s.tile_row(4), Some(7));
        assert_eq!(s.tile_row(5), None);
    }
}
