//! Palette RAM and the palette resolver.
//!
//! A colour key (`8 * palette + index`, 0-127) indexes palette RAM directly:
//! the 16 palettes of 8 entries are one flat 128-byte table. The byte found
//! there is a global colour id, which indexes the [`ColorTable`].
//!
//! The resolver has two interchangeable paths:
//! - scalar: one key at a time,
//! - AVX2: eight keys per step using two gathers (palette bytes, then
//!   colours), with the scalar path finishing any remainder.
//!
//! Both must produce identical output for identical input.

#![allow(unsafe_code)]

use crate::color::ColorTable;
use crate::{COLOR_COUNT, PALETTE_COUNT, PALETTE_SIZE};

/// Bytes of palette RAM.
pub const PALETTE_BYTES: usize = PALETTE_COUNT * PALETTE_SIZE;

/// 16 palettes × 8 global colour ids.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct PaletteRam {
    palettes: [[u8; PALETTE_SIZE]; PALETTE_COUNT],
}

impl PaletteRam {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Entry `entry` of flat palette `palette` (0-15).
    #[must_use]
    pub fn entry(&self, palette: u8, entry: u8) -> u8 {
        self.palettes[usize::from(palette & 0x0F)][usize::from(entry & 7)]
    }

    /// Set one entry. Colour ids are masked to 0-127.
    pub fn set_entry(&mut self, palette: u8, entry: u8, color_id: u8) {
        self.palettes[usize::from(palette & 0x0F)][usize::from(entry & 7)] = color_id & 0x7F;
    }

    /// Replace a whole palette.
    pub fn set_palette(&mut self, palette: u8, ids: [u8; PALETTE_SIZE]) {
        self.palettes[usize::from(palette & 0x0F)] = ids.map(|id| id & 0x7F);
    }

    /// Palette RAM as the flat table that colour keys index.
    #[inline]
    #[must_use]
    pub fn as_flat(&self) -> &[u8] {
        self.palettes.as_flattened()
    }

    /// Global colour id for a colour key.
    #[inline]
    #[must_use]
    pub fn lookup(&self, key: u8) -> u8 {
        self.as_flat()[usize::from(key & 0x7F)] & 0x7F
    }
}

/// Which resolver path runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolverStrategy {
    /// One key at a time. Available everywhere.
    Scalar,
    /// AVX2 gathers, eight keys per step, scalar remainder.
    Avx2,
}

impl ResolverStrategy {
    /// Keys per vector step.
    #[must_use]
    pub const fn lanes(self) -> usize {
        match self {
            Self::Scalar => 1,
            Self::Avx2 => 8,
        }
    }

    /// Best strategy the running CPU supports.
    #[must_use]
    pub fn detect() -> Self {
        if avx2_available() {
            Self::Avx2
        } else {
            Self::Scalar
        }
    }
}

#[cfg(target_arch = "x86_64")]
fn avx2_available() -> bool {
    is_x86_feature_detected!("avx2")
}

#[cfg(not(target_arch = "x86_64"))]
fn avx2_available() -> bool {
    false
}

/// Converts colour keys to ARGB32 through palette RAM and the colour table.
///
/// The strategy is fixed at construction. [`PaletteResolver::new`] only
/// accepts `Avx2` on a CPU that has it, so the unsafe path is never reached
/// on one that doesn't.
#[derive(Debug, Clone, Copy)]
pub struct PaletteResolver {
    strategy: ResolverStrategy,
}

impl PaletteResolver {
    /// Resolver using `strategy`, or scalar if the CPU lacks it.
    #[must_use]
    pub fn new(strategy: ResolverStrategy) -> Self {
        let strategy = match strategy {
            ResolverStrategy::Avx2 if !avx2_available() => {
                log::warn!("AVX2 requested but not supported; using scalar resolver");
                ResolverStrategy::Scalar
            }
            s => s,
        };
        Self { strategy }
    }

    /// Resolver using the best detected strategy.
    #[must_use]
    pub fn detect() -> Self {
        Self::new(ResolverStrategy::detect())
    }

    #[must_use]
    pub fn strategy(&self) -> ResolverStrategy {
        self.strategy
    }

    /// Resolve `keys` into `out`, one colour per key, in order.
    pub fn resolve(&self, keys: &[u8], palettes: &PaletteRam, colors: &ColorTable, out: &mut [u32]) {
        assert_eq!(keys.len(), out.len(), "key and output runs differ in length");
        match self.strategy {
            ResolverStrategy::Scalar => resolve_scalar(keys, palettes, colors, out),
            ResolverStrategy::Avx2 => resolve_avx2(keys, palettes, colors, out),
        }
    }
}

#[cfg(target_arch = "x86_64")]
fn resolve_avx2(keys: &[u8], palettes: &PaletteRam, colors: &ColorTable, out: &mut [u32]) {
    // SAFETY: `PaletteResolver::new` only keeps `Avx2` when the CPU reports it.
    unsafe { avx2::resolve(keys, palettes, colors, out) }
}

#[cfg(not(target_arch = "x86_64"))]
fn resolve_avx2(keys: &[u8], palettes: &PaletteRam, colors: &ColorTable, out: &mut [u32]) {
    resolve_scalar(keys, palettes, colors, out);
}

/// Scalar two-stage lookup.
pub fn resolve_scalar(keys: &[u8], palettes: &PaletteRam, colors: &ColorTable, out: &mut [u32]) {
    let flat = palettes.as_flat();
    let table = colors.as_array();
    for (dst, &key) in out.iter_mut().zip(keys) {
        let id = flat[usize::from(key & 0x7F)] & 0x7F;
        *dst = table[usize::from(id)];
    }
}

#[cfg(target_arch = "x86_64")]
mod avx2 {
    use std::arch::x86_64::{
        __m256i, _mm_loadl_epi64, _mm256_and_si256, _mm256_cvtepu8_epi32, _mm256_i32gather_epi32,
        _mm256_set1_epi32, _mm256_storeu_si256,
    };

    use super::{COLOR_COUNT, ColorTable, PALETTE_BYTES, PaletteRam, resolve_scalar};

    const LANES: usize = 8;

    /// Palette bytes plus room for a 4-byte gather at the last key.
    const PADDED_BYTES: usize = PALETTE_BYTES + 4;

    /// # Safety
    ///
    /// The CPU must support AVX2.
    #[target_feature(enable = "avx2")]
    pub(super) unsafe fn resolve(keys: &[u8], palettes: &PaletteRam, colors: &ColorTable, out: &mut [u32]) {
        let mut padded = [0u8; PADDED_BYTES];
        padded[..PALETTE_BYTES].copy_from_slice(palettes.as_flat());
        let table: &[u32; COLOR_COUNT] = colors.as_array();

        let bulk = keys.len() - keys.len() % LANES;

        for (key_chunk, out_chunk) in keys[..bulk]
            .chunks_exact(LANES)
            .zip(out[..bulk].chunks_exact_mut(LANES))
        {
            // SAFETY: AVX2 is enabled for this function. The load reads
            // exactly 8 bytes from an 8-byte chunk. Keys are masked to
            // 0-127, so the palette gather reads at most bytes 127..131 of
            // the padded copy. Ids are masked to 0-127, so the colour gather
            // stays inside the 128-entry table. The store writes 8 u32s into
            // an 8-element chunk.
            unsafe {
                let mask = _mm256_set1_epi32(0x7F);
                let raw = _mm_loadl_epi64(key_chunk.as_ptr().cast());
                let keys32 = _mm256_and_si256(_mm256_cvtepu8_epi32(raw), mask);
                let words = _mm256_i32gather_epi32::<1>(padded.as_ptr().cast(), keys32);
                let ids = _mm256_and_si256(words, mask);
                let argb: __m256i = _mm256_i32gather_epi32::<4>(table.as_ptr().cast(), ids);
                _mm256_storeu_si256(out_chunk.as_mut_ptr().cast(), argb);
            }
        }

        resolve_scalar(&keys[bulk..], palettes, colors, &mut out[bulk..]);
    }
}
