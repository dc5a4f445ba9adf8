//! CPU-side tile and sprite picture processing unit.
//!
//! Renders one frame of a tile-mapped, sprite-overlaid scene into an ARGB32
//! framebuffer without any GPU rasterization. The pipeline per frame:
//!
//! 1. Build the sprite scanline index (which sprites touch which row).
//! 2. Partition the output rows across a fixed worker pool.
//! 3. Each worker composites its rows into colour keys (`8 * palette + index`)
//!    and resolves them through palette RAM and the global colour table.
//! 4. The caller blocks until every worker has drained.
//!
//! Every colour goes through exactly two indirections: colour key → palette
//! RAM → global colour id → [`ColorTable`] → ARGB32.

pub mod color;
pub mod compose;
mod config;
pub mod demo;
pub mod inspect;
pub mod nametable;
pub mod palette;
mod renderer;
pub mod scene;
pub mod scheduler;
pub mod sprite;
pub mod tile;

#[cfg(feature = "capture")]
pub mod capture;

pub use color::ColorTable;
pub use config::{RenderConfig, StrategyPreference};
pub use nametable::{MapCell, TileMap};
pub use palette::{PaletteRam, PaletteResolver, ResolverStrategy};
pub use renderer::Renderer;
pub use scene::{Scene, SceneError, Scroll, ScrollTable};
pub use sprite::{Sprite, SpriteScanlineIndex, SpriteTable};
pub use tile::{Flip, Tile, TileBank, TileSpace};

/// Output width in pixels.
pub const SCREEN_WIDTH: usize = 256;
/// Output height in rows.
pub const SCREEN_HEIGHT: usize = 240;
/// Pixels per framebuffer.
pub const SCREEN_PIXELS: usize = SCREEN_WIDTH * SCREEN_HEIGHT;

/// Tile edge length in pixels.
pub const TILE_SIZE: usize = 8;

/// Background tiles in the graphics bank.
pub const BG_TILE_COUNT: usize = 512;
/// Sprite tiles in the graphics bank (separate tile space).
pub const SPRITE_TILE_COUNT: usize = 512;

/// Map width in cells.
pub const MAP_WIDTH_TILES: usize = 32;
/// Map height in cells.
pub const MAP_HEIGHT_TILES: usize = 32;

/// Sprite table capacity.
pub const MAX_SPRITES: usize = 256;
/// Sprites recorded per output row; the rest are dropped.
pub const MAX_SPRITES_PER_ROW: usize = 64;

/// Palettes in palette RAM (8 background, then 8 foreground).
pub const PALETTE_COUNT: usize = 16;
/// Entries per palette.
pub const PALETTE_SIZE: usize = 8;
/// First foreground palette; sprite selectors are offset by this.
pub const FOREGROUND_PALETTE_BASE: u8 = 8;

/// Global colours.
pub const COLOR_COUNT: usize = 128;
