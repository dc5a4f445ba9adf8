//! Scanline compositor.
//!
//! Produces one colour key per pixel for a range of rows. Each row takes two
//! passes:
//!
//! 1. Background. The row's scroll gives the plane coordinate of column 0.
//!    Columns go in three phases so the sampler runs once per tile rather
//!    than once per pixel: a partial left tile if the scroll isn't
//!    tile-aligned, then whole tiles, then whatever is left at the right edge.
//! 2. Sprites. The row's indexed sprites are visited highest index first.
//!    Each column remembers the lowest sprite index that has put an opaque
//!    pixel there, and a sprite only takes a column from a higher index.
//!    The lowest index therefore wins whatever order the sprites arrive in.
//!    The winning sprite shows if it is above the background or the
//!    background there is transparent. Otherwise the background shows.

use std::ops::Range;

use crate::nametable::locate;
use crate::scene::Scene;
use crate::sprite::SpriteScanlineIndex;
use crate::{SCREEN_WIDTH, TILE_SIZE};

/// Composite `rows` into `out`, which holds `rows.len()` full rows of keys.
pub fn compose_rows(scene: &Scene, index: &SpriteScanlineIndex, rows: Range<usize>, out: &mut [u8]) {
    debug_assert_eq!(out.len(), rows.len() * SCREEN_WIDTH);

    let mut background = [0u8; SCREEN_WIDTH];
    for (row, line) in rows.zip(out.chunks_exact_mut(SCREEN_WIDTH)) {
        background_row(scene, row, &mut background);
        line.copy_from_slice(&background);
        overlay_sprites(
            scene,
            row,
            index.row(row).iter().rev().copied(),
            &background,
            line,
        );
    }
}

/// Background keys for one full row.
pub fn background_row(scene: &Scene, row: usize, out: &mut [u8; SCREEN_WIDTH]) {
    let scroll = scene.scroll.row(row);
    let ay = (row as u16).wrapping_add(scroll.y);
    let mut ax = scroll.x;
    let mut x = 0;

    // Partial left tile
    let fine = usize::from(ax & 7);
    if fine != 0 {
        let n = TILE_SIZE - fine;
        sample_background_tile(scene, ax, ay, fine..TILE_SIZE, &mut out[..n]);
        x = n;
        ax = ax.wrapping_add(n as u16);
    }

    // Whole tiles
    while SCREEN_WIDTH - x >= TILE_SIZE {
        sample_background_tile(scene, ax, ay, 0..TILE_SIZE, &mut out[x..x + TILE_SIZE]);
        x += TILE_SIZE;
        ax = ax.wrapping_add(TILE_SIZE as u16);
    }

    // Partial right tile
    if x < SCREEN_WIDTH {
        let n = SCREEN_WIDTH - x;
        sample_background_tile(scene, ax, ay, 0..n, &mut out[x..]);
    }
}

/// Background key at a single screen pixel.
///
/// Same addressing as [`background_row`], one pixel at a time. Used by
/// inspection tools and as a reference in tests.
#[must_use]
pub fn background_pixel(scene: &Scene, x: usize, row: usize) -> u8 {
    let scroll = scene.scroll.row(row);
    let ax = (x as u16).wrapping_add(scroll.x);
    let ay = (row as u16).wrapping_add(scroll.y);
    let fine = usize::from(ax & 7);
    let mut key = [0u8; 1];
    sample_background_tile(scene, ax, ay, fine..fine + 1, &mut key);
    key[0]
}

#[inline]
fn sample_background_tile(scene: &Scene, ax: u16, ay: u16, cols: Range<usize>, out: &mut [u8]) {
    let hit = locate(&scene.maps, ax, ay);
    let cell = hit.cell;
    scene
        .tiles
        .background(cell.tile)
        .sample_row(hit.fine_y, cell.palette & 7, cell.flip, cols, out);
}

/// Overlay sprites on one row.
///
/// `order` is the sequence of sprite indices to visit; the result does not
/// depend on it. `background` is the row's background keys and `out` the
/// row being built (normally a copy of `background`). Columns no sprite
/// covers are left as they are.
///
/// The lowest-index opaque sprite owns a column whatever its priority flag.
/// If that sprite is behind the background and the background is opaque
/// there, the background shows, even when a higher-index sprite that is
/// above the background also covers the column.
pub fn overlay_sprites<I>(scene: &Scene, row: usize, order: I, background: &[u8], out: &mut [u8])
where
    I: IntoIterator<Item = u16>,
{
    debug_assert_eq!(background.len(), SCREEN_WIDTH);
    debug_assert_eq!(out.len(), SCREEN_WIDTH);

    let mut owner = [u16::MAX; SCREEN_WIDTH];
    let mut samples = [0u8; TILE_SIZE];

    for index in order {
        let Some(sprite) = scene.sprites.get(usize::from(index)) else {
            continue;
        };
        let Some(tile_row) = sprite.tile_row(row) else {
            continue;
        };

        // Visible sub-range of the sprite's eight columns
        let left = i32::from(sprite.x);
        let start = (-left).clamp(0, TILE_SIZE as i32) as usize;
        let end = (SCREEN_WIDTH as i32 - left).clamp(0, TILE_SIZE as i32) as usize;
        if start >= end {
            continue;
        }

        let samples = &mut samples[start..end];
        scene.tiles.sprite(sprite.tile).sample_row(
            tile_row,
            sprite.flat_palette(),
            sprite.flip,
            start..end,
            samples,
        );

        for (offset, &key) in (start..end).zip(samples.iter()) {
            if key == 0 {
                continue;
            }
            let col = (left + offset as i32) as usize;
            if index >= owner[col] {
                continue;
            }
            owner[col] = index;
            out[col] = if sprite.above_background || background[col] == 0 {
                key
            } else {
                background[col]
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nametable::MapCell;
    use crate::scene::Scroll;
    use crate::sprite::Sprite;
    use crate::tile::{Flip, Tile, TileSpace};
    use crate::{MAP_HEIGHT_TILES, MAP_WIDTH_TILES, SCREEN_HEIGHT};

    struct XorShift(u32);

    impl XorShift {
        fn next(&mut self) -> u32 {
            let mut x = self.0;
            x ^= x << 13;
            x ^= x >> 17;
            x ^= x << 5;
            self.0 = x;
            x
        }
    }

    fn busy_scene(seed: u32) -> Scene {
        let mut rng = XorShift(seed);
        let mut scene = Scene::new();
        for t in 0..64u16 {
            let tile = Tile {
                planes: [
                    u64::from(rng.next()) << 32 | u64::from(rng.next()),
                    u64::from(rng.next()) << 32 | u64::from(rng.next()),
                    u64::from(rng.next()) << 32 | u64::from(rng.next()),
                ],
            };
            scene.tiles.set(TileSpace::Background, t, tile);
        }
        for map in &mut scene.maps {
            for row in 0..MAP_HEIGHT_TILES {
                for col in 0..MAP_WIDTH_TILES {
                    let bits = rng.next();
                    let flip = Flip {
                        horizontal: bits & 0x100 != 0,
                        vertical: bits & 0x200 != 0,
                    };
                    map.set(col, row, MapCell::new((bits & 63) as u16, (bits >> 12) as u8 & 7).with_flip(flip));
                }
            }
        }
        scene
    }

    fn opaque_sprite_scene() -> Scene {
        let mut scene = Scene::new();
        scene.tiles.set(TileSpace::Sprite, 1, Tile::solid(1));
        scene.tiles.set(TileSpace::Sprite, 2, Tile::solid(2));
        scene
    }

    fn compose_row(scene: &Scene, row: usize) -> Vec<u8> {
        let mut index = SpriteScanlineIndex::new();
        index.build(&scene.sprites);
        let mut out = vec![0xEE; SCREEN_WIDTH];
        compose_rows(scene, &index, row..row + 1, &mut out);
        out
    }

    #[test]
    fn background_phases_match_per_pixel_addressing() {
        let mut scene = busy_scene(0xC0FF_EE01);
        let scrolls = [
            Scroll::new(0, 0),
            Scroll::new(3, 1),
            Scroll::new(7, 7),
            Scroll::new(8, 250),
            Scroll::new(253, 17),
            Scroll::new(256 + 5, 256 + 3),
            Scroll::new(u16::MAX - 2, u16::MAX - 100),
        ];
        for (i, row) in (0..SCREEN_HEIGHT).enumerate() {
            scene.scroll.set(row, scrolls[i % scrolls.len()]);
        }

        let mut line = [0u8; SCREEN_WIDTH];
        for row in 0..SCREEN_HEIGHT {
            background_row(&scene, row, &mut line);
            for (x, &key) in line.iter().enumerate() {
                assert_eq!(key, background_pixel(&scene, x, row), "row {row} x {x}");
            }
        }
    }

    #[test]
    fn plane_one_bit_zero_with_palette_two_is_key_18() {
        let mut scene = Scene::new();
        scene.tiles.set(TileSpace::Background, 5, Tile { planes: [0, 1, 0] });
        scene.maps[0].set(0, 0, MapCell::new(5, 2));

        let mut line = [0u8; SCREEN_WIDTH];
        background_row(&scene, 0, &mut line);
        assert_eq!(line[7], 18);
        assert_eq!(line[..7], [0; 7]);
        assert_eq!(line[8], 0);
    }

    #[test]
    fn per_row_scroll_is_independent() {
        let mut scene = Scene::new();
        scene.tiles.set(TileSpace::Background, 1, Tile::solid(3));
        scene.maps[0].set(1, 0, MapCell::new(1, 0));
        scene.scroll.set(1, Scroll::new(8, 0));

        let mut line = [0u8; SCREEN_WIDTH];
        background_row(&scene, 0, &mut line);
        assert_eq!(line[8..16], [3; 8]);
        assert_eq!(line[0], 0);
        background_row(&scene, 1, &mut line);
        assert_eq!(line[0..8], [3; 8]);
        assert_eq!(line[8], 0);
    }

    #[test]
    fn second_map_appears_past_first_map_edge() {
        let mut scene = Scene::new();
        scene.tiles.set(TileSpace::Background, 1, Tile::solid(1));
        scene.tiles.set(TileSpace::Background, 2, Tile::solid(2));
        scene.maps[0].fill(MapCell::new(1, 0));
        scene.maps[1].fill(MapCell::new(2, 0));
        scene.scroll.fill(Scroll::new(128, 0));

        let mut line = [0u8; SCREEN_WIDTH];
        background_row(&scene, 0, &mut line);
        assert_eq!(line[127], 1);
        assert_eq!(line[128], 2);
    }

    #[test]
    fn sprite_at_minus_four_writes_only_first_four_columns() {
        let mut scene = opaque_sprite_scene();
        scene.sprites.push(Sprite::new(-4, 10, 1, 0));
        let out = compose_row(&scene, 12);
        assert_eq!(out[..4], [65; 4]);
        assert!(out[4..].iter().all(|&k| k == 0));
    }

    #[test]
    fn sprite_at_right_edge_is_clipped() {
        let mut scene = opaque_sprite_scene();
        scene.sprites.push(Sprite::new(SCREEN_WIDTH as i16 - 3, 0, 1, 1));
        let out = compose_row(&scene, 0);
        assert_eq!(out[SCREEN_WIDTH - 3..], [73; 3]);
        assert!(out[..SCREEN_WIDTH - 3].iter().all(|&k| k == 0));
    }

    #[test]
    fn off_screen_sprites_contribute_nothing() {
        let mut scene = opaque_sprite_scene();
        let w = SCREEN_WIDTH as i16;
        let h = SCREEN_HEIGHT as i16;
        for (x, y) in [(-8, 0), (w, 0), (0, -8), (0, h), (-100, -100), (i16::MAX, i16::MAX), (i16::MIN, 5)] {
            scene.sprites.push(Sprite::new(x, y, 1, 0));
        }
        let mut index = SpriteScanlineIndex::new();
        index.build(&scene.sprites);
        let mut out = vec![0xEE; SCREEN_WIDTH * SCREEN_HEIGHT];
        compose_rows(&scene, &index, 0..SCREEN_HEIGHT, &mut out);
        assert!(out.iter().all(|&k| k == 0));
    }

    #[test]
    fn lowest_index_wins_in_either_visit_order() {
        let background = [0u8; SCREEN_WIDTH];
        for (above_a, above_b) in [(true, true), (true, false), (false, true), (false, false)] {
            let mut scene = opaque_sprite_scene();
            let mut a = Sprite::new(10, 0, 1, 0);
            let mut b = Sprite::new(14, 0, 2, 3);
            a.above_background = above_a;
            b.above_background = above_b;
            scene.sprites.push(a);
            scene.sprites.push(b);

            for order in [[1u16, 0], [0, 1]] {
                let mut out = [0u8; SCREEN_WIDTH];
                overlay_sprites(&scene, 0, order, &background, &mut out);
                assert_eq!(out[10..18], [65; 8], "{order:?} {above_a} {above_b}");
                assert_eq!(out[18..22], [90; 4], "{order:?} {above_a} {above_b}");
            }
        }
    }

    #[test]
    fn transparent_sprite_pixels_let_higher_index_through() {
        let mut scene = opaque_sprite_scene();
        let mut checker = [0u8; 64];
        for (i, v) in checker.iter_mut().enumerate() {
            *v = u8::from(i % 2 == 0);
        }
        scene.tiles.set(TileSpace::Sprite, 3, Tile::from_indices(&checker));
        scene.sprites.push(Sprite::new(0, 0, 3, 0));
        scene.sprites.push(Sprite::new(0, 0, 2, 0));

        let out = compose_row(&scene, 0);
        assert_eq!(out[..8], [65, 66, 65, 66, 65, 66, 65, 66]);
    }

    #[test]
    fn behind_background_sprite_shows_only_through_transparent_background() {
        let mut scene = opaque_sprite_scene();
        scene.tiles.set(TileSpace::Background, 1, Tile::solid(4));
        scene.maps[0].set(0, 0, MapCell::new(1, 1));
        scene.sprites.push(Sprite::new(4, 0, 1, 0).behind_background());

        let out = compose_row(&scene, 0);
        // Columns 4-7 are opaque background; 8-11 are transparent.
        assert_eq!(out[4..8], [12; 4]);
        assert_eq!(out[8..12], [65; 4]);
    }

    #[test]
    fn behind_background_winner_still_masks_higher_sprite() {
        let mut scene = opaque_sprite_scene();
        scene.tiles.set(TileSpace::Background, 1, Tile::solid(4));
        scene.maps[0].set(0, 0, MapCell::new(1, 1));
        scene.sprites.push(Sprite::new(0, 0, 1, 0).behind_background());
        scene.sprites.push(Sprite::new(0, 0, 2, 0));

        let out = compose_row(&scene, 0);
        assert_eq!(out[..8], [12; 8]);
    }

    #[test]
    fn sprite_flip_is_applied() {
        let mut scene = opaque_sprite_scene();
        let mut left_column = [0u8; 64];
        for row in 0..8 {
            left_column[row * 8] = 1;
        }
        scene.tiles.set(TileSpace::Sprite, 4, Tile::from_indices(&left_column));
        scene.sprites.push(Sprite::new(20, 0, 4, 0).with_flip(Flip::HORIZONTAL));

        let out = compose_row(&scene, 3);
        assert_eq!(out[20], 0);
        assert_eq!(out[27], 65);
    }
}
