//! Scene description: everything one frame is rendered from.
//!
//! A scene is filled in by its producer between frames and only read while a
//! frame renders. [`crate::Renderer::render`] borrows it immutably for the
//! whole call, so it cannot change under the workers.

use std::fmt;

use crate::nametable::TileMap;
use crate::palette::PaletteRam;
use crate::sprite::SpriteTable;
use crate::tile::TileBank;
use crate::{BG_TILE_COUNT, MAP_HEIGHT_TILES, MAP_WIDTH_TILES, MAX_SPRITES, SCREEN_HEIGHT, SPRITE_TILE_COUNT};

/// Scroll offset applied to one output row.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Scroll {
    pub x: u16,
    pub y: u16,
}

impl Scroll {
    #[must_use]
    pub const fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }
}

/// One scroll vector per output row.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ScrollTable {
    rows: Vec<Scroll>,
}

impl ScrollTable {
    #[must_use]
    pub fn new() -> Self {
        Self {
            rows: vec![Scroll::default(); SCREEN_HEIGHT],
        }
    }

    /// Scroll for `row`.
    #[inline]
    #[must_use]
    pub fn row(&self, row: usize) -> Scroll {
        self.rows[row]
    }

    pub fn set(&mut self, row: usize, scroll: Scroll) {
        self.rows[row] = scroll;
    }

    /// Same scroll on every row.
    pub fn fill(&mut self, scroll: Scroll) {
        self.rows.fill(scroll);
    }

    /// Set a range of rows.
    pub fn set_rows(&mut self, rows: std::ops::Range<usize>, scroll: Scroll) {
        self.rows[rows].fill(scroll);
    }

    pub(crate) fn len(&self) -> usize {
        self.rows.len()
    }
}

impl Default for ScrollTable {
    fn default() -> Self {
        Self::new()
    }
}

/// A complete frame input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Scene {
    pub tiles: TileBank,
    pub maps: [TileMap; 2],
    pub scroll: ScrollTable,
    pub sprites: SpriteTable,
    pub palettes: PaletteRam,
}

impl Scene {
    /// All-zero scene: empty tiles, maps on tile 0, no scroll, no sprites.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check table sizes and selectors.
    ///
    /// Scenes built through the API are always valid; this catches
    /// deserialized scenes with short tables or out-of-range selectors.
    pub fn validate(&self) -> Result<(), SceneError> {
        let (bg, sp) = self.tiles.lens();
        check_len("tiles.background", BG_TILE_COUNT, bg)?;
        check_len("tiles.sprite", SPRITE_TILE_COUNT, sp)?;
        check_len("maps[0]", MAP_WIDTH_TILES * MAP_HEIGHT_TILES, self.maps[0].len())?;
        check_len("maps[1]", MAP_WIDTH_TILES * MAP_HEIGHT_TILES, self.maps[1].len())?;
        check_len("scroll", SCREEN_HEIGHT, self.scroll.len())?;

        if self.sprites.len() > MAX_SPRITES {
            return Err(SceneError::TooManySprites(self.sprites.len()));
        }
        for (index, sprite) in self.sprites.iter().enumerate() {
            if sprite.palette > 7 {
                return Err(SceneError::PaletteSelector {
                    what: "sprite",
                    index,
                    value: sprite.palette,
                });
            }
        }
        for (map, tiles) in self.maps.iter().enumerate() {
            for row in 0..MAP_HEIGHT_TILES {
                for col in 0..MAP_WIDTH_TILES {
                    let cell = tiles.cell(col, row);
                    if cell.palette > 7 {
                        return Err(SceneError::PaletteSelector {
                            what: if map == 0 { "maps[0] cell" } else { "maps[1] cell" },
                            index: row * MAP_WIDTH_TILES + col,
                            value: cell.palette,
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Parse and validate a JSON scene.
    ///
    /// Missing fields take their zero defaults.
    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> Result<Self, SceneError> {
        let scene: Self = serde_json::from_str(json).map_err(|e| SceneError::Json(e.to_string()))?;
        if let Err(e) = scene.validate() {
            log::warn!("rejecting scene: {e}");
            return Err(e);
        }
        Ok(scene)
    }

    /// Serialize to pretty JSON.
    #[cfg(feature = "serde")]
    pub fn to_json(&self) -> Result<String, SceneError> {
        serde_json::to_string_pretty(self).map_err(|e| SceneError::Json(e.to_string()))
    }
}

fn check_len(field: &'static str, expected: usize, actual: usize) -> Result<(), SceneError> {
    if expected == actual {
        Ok(())
    } else {
        Err(SceneError::Length {
            field,
            expected,
            actual,
        })
    }
}

/// Why a scene was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    /// The JSON could not be parsed.
    Json(String),
    /// A fixed-size table has the wrong length.
    Length {
        field: &'static str,
        expected: usize,
        actual: usize,
    },
    /// More sprites than the table holds.
    TooManySprites(usize),
    /// A palette selector outside 0-7.
    PaletteSelector {
        what: &'static str,
        index: usize,
        value: u8,
    },
}

impl fmt::Display for SceneError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(msg) => write!(f, "invalid scene JSON: {msg}"),
            Self::Length {
                field,
                expected,
                actual,
            } => write!(f, "{field}: expected {expected} entries, found {actual}"),
            Self::TooManySprites(n) => write!(f, "{n} sprites exceeds capacity of {MAX_SPRITES}"),
            Self::PaletteSelector { what, index, value } => {
                write!(f, "{what} {index}: palette selector {value} is not in 0-7")
            }
        }
    }
}

impl std::error::Error for SceneError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nametable::MapCell;
    use crate::sprite::Sprite;

    #[test]
    fn new_scene_is_valid() {
        assert_eq!(Scene::new().validate(), Ok(()));
    }

    #[test]
    fn sprite_palette_out_of_range_is_rejected() {
        let mut scene = Scene::new();
        scene.sprites.push(Sprite::new(0, 0, 0, 0));
        scene.sprites.push(Sprite::new(0, 0, 0, 8));
        assert_eq!(
            scene.validate(),
            Err(SceneError::PaletteSelector {
                what: "sprite",
                index: 1,
                value: 8
            })
        );
    }

    #[test]
    fn map_palette_out_of_range_is_rejected() {
        let mut scene = Scene::new();
        scene.maps[1].set(2, 1, MapCell::new(0, 12));
        let err = scene.validate().unwrap_err();
        assert_eq!(err.to_string(), "maps[1] cell 34: palette selector 12 is not in 0-7");
    }

    #[test]
    fn scroll_rows() {
        let mut table = ScrollTable::new();
        table.set_rows(10..20, Scroll::new(3, 4));
        assert_eq!(table.row(9), Scroll::default());
        assert_eq!(table.row(10), Scroll::new(3, 4));
        assert_eq!(table.row(19), Scroll::new(3, 4));
        assert_eq!(table.row(20), Scroll::default());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn short_scroll_table_is_rejected() {
        let json = r#"{ "scroll": [ { "x": 1, "y": 2 } ] }"#;
        match Scene::from_json(json) {
            Err(SceneError::Length { field, expected, actual }) => {
                assert_eq!(field, "scroll");
                assert_eq!(expected, SCREEN_HEIGHT);
                assert_eq!(actual, 1);
            }
            other => panic!("expected length error, got {other:?}"),
        }
    }

    #[cfg(feature = "serde")]
    #[test]
    fn malformed_json_is_reported() {
        assert!(matches!(Scene::from_json("{ nope"), Err(SceneError::Json(_))));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn sprite_without_priority_field_draws_above_background() {
        let json = r#"{ "sprites": [ { "x": 3, "y": 4, "tile": 1 } ] }"#;
        let scene = Scene::from_json(json).unwrap();
        assert_eq!(scene.sprites[0], Sprite::new(3, 4, 1, 0));
        assert!(scene.sprites[0].above_background);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn json_round_trip_preserves_scene() {
        let mut scene = Scene::new();
        scene.palettes.set_entry(2, 2, 42);
        scene.sprites.push(Sprite::new(-4, 7, 3, 1).behind_background());
        scene.scroll.set(5, Scroll::new(9, 1));
        let json = scene.to_json().unwrap();
        assert_eq!(Scene::from_json(&json).unwrap(), scene);
    }
}
