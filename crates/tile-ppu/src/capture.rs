//! Headless capture: PNG screenshots and tile sheet dumps.

use std::error::Error;
use std::fs;
use std::io::BufWriter;
use std::path::Path;

use crate::inspect::{sheet_size, tile_sheet};
use crate::scene::Scene;
use crate::tile::TileSpace;

/// Save an ARGB32 buffer of `width * height` pixels as a PNG file.
///
/// # Errors
///
/// Returns an error if the buffer size doesn't match, or the file cannot be
/// created or written.
pub fn save_framebuffer(fb: &[u32], width: u32, height: u32, path: &Path) -> Result<(), Box<dyn Error>> {
    let expected = width as usize * height as usize;
    if fb.len() != expected {
        return Err(format!("buffer holds {} pixels, {width}x{height} needs {expected}", fb.len()).into());
    }

    let file = fs::File::create(path)?;
    let w = BufWriter::new(file);
    let mut encoder = png::Encoder::new(w, width, height);
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header()?;

    // Convert ARGB32 → RGBA bytes
    let mut rgba = Vec::with_capacity(expected * 4);
    for &pixel in fb {
        rgba.push(((pixel >> 16) & 0xFF) as u8);
        rgba.push(((pixel >> 8) & 0xFF) as u8);
        rgba.push((pixel & 0xFF) as u8);
        rgba.push((pixel >> 24) as u8);
    }

    writer.write_image_data(&rgba)?;
    log::debug!("wrote {width}x{height} PNG to {}", path.display());
    Ok(())
}

/// Save every tile of `space` as a sheet, drawn with flat palette `palette`.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn save_tile_sheet(scene: &Scene, space: TileSpace, palette: u8, path: &Path) -> Result<(), Box<dyn Error>> {
    let (width, height) = sheet_size(space);
    let sheet = tile_sheet(&scene.tiles, space, palette, &scene.palettes);
    save_framebuffer(&sheet, width as u32, height as u32, path)
}
