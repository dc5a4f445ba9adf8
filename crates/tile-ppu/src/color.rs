//! Global colour table.
//!
//! 128 colours as ARGB32, generated from a circular hue/brightness model.
//! A colour id is `hue << 3 | brightness`:
//! - hue 0 is the achromatic ramp (black to white),
//! - hues 1-15 sit at equal angles around the colour wheel,
//! - brightness 0-7 steps luminance from dark to light.
//!
//! The table is generated once per process and never changes afterwards.

use std::f64::consts::TAU;
use std::sync::OnceLock;

use crate::COLOR_COUNT;

/// Number of chromatic hues on the wheel (hue 0 is grey).
const WHEEL_HUES: u8 = 15;

/// Chroma amplitude in YIQ space.
const SATURATION: f64 = 0.22;

/// Luminance range used by chromatic hues, kept off the extremes so that
/// the chroma component survives clamping.
const CHROMA_LUMA_MIN: f64 = 0.12;
const CHROMA_LUMA_MAX: f64 = 0.86;

static GLOBAL: OnceLock<ColorTable> = OnceLock::new();

/// The fixed 128-entry ARGB32 table.
#[derive(Clone, PartialEq, Eq)]
pub struct ColorTable {
    colors: [u32; COLOR_COUNT],
}

impl ColorTable {
    /// Generate the table from the hue/brightness model.
    #[must_use]
    pub fn generate() -> Self {
        let mut colors = [0u32; COLOR_COUNT];
        for (id, slot) in colors.iter_mut().enumerate() {
            let hue = (id >> 3) as u8;
            let brightness = (id & 7) as u8;
            *slot = model_color(hue, brightness);
        }
        Self { colors }
    }

    /// The process-wide table, generated on first use.
    #[must_use]
    pub fn global() -> &'static Self {
        GLOBAL.get_or_init(|| {
            log::debug!("generating global colour table ({COLOR_COUNT} entries)");
            Self::generate()
        })
    }

    /// Colour for a global colour id. Ids wrap into 0-127.
    #[inline]
    #[must_use]
    pub fn color(&self, id: u8) -> u32 {
        self.colors[(id & 0x7F) as usize]
    }

    /// All 128 colours, indexed by id.
    #[must_use]
    pub fn as_array(&self) -> &[u32; COLOR_COUNT] {
        &self.colors
    }
}

impl std::fmt::Debug for ColorTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColorTable")
            .field("first", &format_args!("{:#010X}", self.colors[0]))
            .field("last", &format_args!("{:#010X}", self.colors[COLOR_COUNT - 1]))
            .finish()
    }
}

/// Colour id from a hue (0-15) and brightness (0-7).
#[must_use]
pub const fn color_id(hue: u8, brightness: u8) -> u8 {
    ((hue & 0x0F) << 3) | (brightness & 0x07)
}

fn model_color(hue: u8, brightness: u8) -> u32 {
    if hue == 0 {
        // Integer ramp so the greys are exact on every platform.
        let v = (u32::from(brightness) * 255 + 3) / 7;
        return 0xFF00_0000 | (v << 16) | (v << 8) | v;
    }

    let y = CHROMA_LUMA_MIN
        + (CHROMA_LUMA_MAX - CHROMA_LUMA_MIN) * f64::from(brightness) / 7.0;
    let angle = TAU * f64::from(hue - 1) / f64::from(WHEEL_HUES);
    let i = SATURATION * angle.cos();
    let q = SATURATION * angle.sin();

    // YIQ → RGB (FCC matrix)
    let r = y + 0.956 * i + 0.621 * q;
    let g = y - 0.272 * i - 0.647 * q;
    let b = y - 1.106 * i + 1.703 * q;

    0xFF00_0000 | (channel(r) << 16) | (channel(g) << 8) | channel(b)
}

fn channel(v: f64) -> u32 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u32
}
