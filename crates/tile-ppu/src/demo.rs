//! Built-in demo scene.
//!
//! A deterministic scene that exercises every feature of the compositor:
//! both maps, per-row raster scroll with a split status bar, flipped cells,
//! a ring of sprites with mixed priority and flips. `frame` animates the
//! scroll and the sprite ring.

use std::f32::consts::TAU;

use crate::color::color_id;
use crate::nametable::MapCell;
use crate::scene::{Scene, Scroll};
use crate::sprite::Sprite;
use crate::tile::{Flip, Tile, TileSpace};
use crate::{MAP_HEIGHT_TILES, MAP_WIDTH_TILES, SCREEN_HEIGHT};

/// First row of the status bar, which shows map 1 with no raster effect.
pub const STATUS_BAR_TOP: usize = 208;

const RING_SPRITES: usize = 24;
const RING_RADIUS: f32 = 72.0;

mod bg {
    pub const CHECKER: u16 = 1;
    pub const STRIPES: u16 = 2;
    pub const FRAME: u16 = 3;
    pub const DIAGONAL: u16 = 4;
}

mod obj {
    pub const BALL: u16 = 0;
    pub const DIAMOND: u16 = 1;
}

/// Build the demo scene for animation frame `frame`.
#[must_use]
pub fn demo_scene(frame: u32) -> Scene {
    let mut scene = Scene::new();
    load_tiles(&mut scene);
    load_palettes(&mut scene);
    load_maps(&mut scene);
    set_scroll(&mut scene, frame);
    place_sprites(&mut scene, frame);
    scene
}

fn tile_from_fn(f: impl Fn(usize, usize) -> u8) -> Tile {
    let mut indices = [0u8; 64];
    for (i, v) in indices.iter_mut().enumerate() {
        *v = f(i / 8, i % 8);
    }
    Tile::from_indices(&indices)
}

fn load_tiles(scene: &mut Scene) {
    let tiles = &mut scene.tiles;
    tiles.set(
        TileSpace::Background,
        bg::CHECKER,
        tile_from_fn(|r, c| if (r / 4 + c / 4) % 2 == 0 { 1 } else { 2 }),
    );
    tiles.set(TileSpace::Background, bg::STRIPES, tile_from_fn(|r, _| r as u8));
    tiles.set(
        TileSpace::Background,
        bg::FRAME,
        tile_from_fn(|r, c| if r == 0 || c == 0 || r == 7 || c == 7 { 3 } else { 5 }),
    );
    // Asymmetric, so flipped cells are visibly different.
    tiles.set(
        TileSpace::Background,
        bg::DIAGONAL,
        tile_from_fn(|r, c| if c <= r { 6 } else { 0 }),
    );

    tiles.set(
        TileSpace::Sprite,
        obj::BALL,
        tile_from_fn(|r, c| {
            let (dx, dy) = (2 * c as i32 - 7, 2 * r as i32 - 7);
            match dx * dx + dy * dy {
                0..=9 => 3,
                10..=29 => 2,
                30..=56 => 1,
                _ => 0,
            }
        }),
    );
    tiles.set(
        TileSpace::Sprite,
        obj::DIAMOND,
        tile_from_fn(|r, c| {
            let d = (2 * c as i32 - 7).abs() + (2 * r as i32 - 7).abs();
            if d <= 7 { 4 + (d as u8 / 3) } else { 0 }
        }),
    );
}

fn load_palettes(scene: &mut Scene) {
    let ram = &mut scene.palettes;
    // Backdrop
    ram.set_entry(0, 0, color_id(0, 1));
    for palette in 0..16u8 {
        let hue = 1 + (palette * 7) % 15;
        for entry in 1..8u8 {
            ram.set_entry(palette, entry, color_id(hue, entry));
        }
    }
}

fn load_maps(scene: &mut Scene) {
    for row in 0..MAP_HEIGHT_TILES {
        for col in 0..MAP_WIDTH_TILES {
            let tile = if (row + col) % 2 == 0 { bg::CHECKER } else { bg::STRIPES };
            let palette = ((row / 4 + col / 4) % 8) as u8;
            scene.maps[0].set(col, row, MapCell::new(tile, palette));

            let cell = match (row % 4, col % 4) {
                (0, _) | (_, 0) => MapCell::new(bg::FRAME, 7),
                (r, c) => {
                    let flip = Flip {
                        horizontal: c == 2,
                        vertical: r == 2,
                    };
                    MapCell::new(bg::DIAGONAL, (row % 8) as u8).with_flip(flip)
                }
            };
            scene.maps[1].set(col, row, cell);
        }
    }
}

fn set_scroll(scene: &mut Scene, frame: u32) {
    let base_x = frame.wrapping_mul(2) as u16;
    let base_y = frame as u16;
    for row in 0..STATUS_BAR_TOP {
        // Triangle wave, period 64 rows.
        let phase = (row as u32).wrapping_add(frame.wrapping_mul(3)) % 64;
        let wobble = phase.min(64 - phase) as u16;
        scene
            .scroll
            .set(row, Scroll::new(base_x.wrapping_add(wobble), base_y));
    }
    // Plane y 256.. with x < 256 is the map 1 quadrant of the checkerboard.
    let bar = Scroll::new(0, (256 - STATUS_BAR_TOP) as u16);
    scene.scroll.set_rows(STATUS_BAR_TOP..SCREEN_HEIGHT, bar);
}

fn place_sprites(scene: &mut Scene, frame: u32) {
    let (cx, cy) = (124.0f32, 100.0f32);
    let spin = frame as f32 * 0.03;
    for i in 0..RING_SPRITES {
        let angle = spin + TAU * i as f32 / RING_SPRITES as f32;
        let x = (cx + RING_RADIUS * angle.cos()).round() as i16;
        let y = (cy + RING_RADIUS * 0.8 * angle.sin()).round() as i16;
        let tile = if i % 2 == 0 { obj::BALL } else { obj::DIAMOND };
        let mut sprite = Sprite::new(x, y, tile, (i % 8) as u8);
        if i % 3 == 0 {
            sprite = sprite.behind_background();
        }
        if i % 4 == 1 {
            sprite = sprite.with_flip(Flip::HORIZONTAL);
        }
        scene.sprites.push(sprite);
    }

    // A pair sliding across the screen edges, overlapping each other.
    let slide = (frame % 280) as i16 - 12;
    scene.sprites.push(Sprite::new(slide, 180, obj::BALL, 2));
    scene.sprites.push(Sprite::new(slide + 4, 182, obj::DIAMOND, 5).with_flip(Flip::VERTICAL));
}
