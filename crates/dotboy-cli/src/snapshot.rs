use anyhow::{Context, Result};
use dotboy_core::Frame;
use dotboy_core::ppu::{SCREEN_HEIGHT, SCREEN_WIDTH, TILE_DUMP_HEIGHT, TILE_DUMP_WIDTH};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

fn push_rgb(out: &mut Vec<u8>, px: u32) {
    out.extend_from_slice(&[(px >> 16) as u8, (px >> 8) as u8, px as u8]);
}

fn write_rgb_png(path: &Path, width: u32, height: u32, rgb: &[u8]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let w = BufWriter::new(file);
    let mut encoder = png::Encoder::new(w, width, height);
    encoder.set_color(png::ColorType::Rgb);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder
        .write_header()
        .with_context(|| format!("writing PNG header to {}", path.display()))?;
    writer
        .write_image_data(rgb)
        .with_context(|| format!("writing PNG data to {}", path.display()))?;
    Ok(())
}

/// Save a finished frame as an RGB PNG.
pub fn write_frame_png(path: &Path, frame: &Frame) -> Result<()> {
    let mut rgb = Vec::with_capacity(SCREEN_WIDTH * SCREEN_HEIGHT * 3);
    for &px in frame.pixels.iter() {
        push_rgb(&mut rgb, px);
    }
    write_rgb_png(path, SCREEN_WIDTH as u32, SCREEN_HEIGHT as u32, &rgb)
}

/// Save a tile data dump (2-bit color ids) as an RGB PNG, mapping ids
/// through `palette`.
pub fn write_tiles_png(path: &Path, tiles: &[u8], palette: [u32; 4]) -> Result<()> {
    let mut rgb = Vec::with_capacity(TILE_DUMP_WIDTH * TILE_DUMP_HEIGHT * 3);
    for &id in tiles {
        push_rgb(&mut rgb, palette[(id & 0x03) as usize]);
    }
    write_rgb_png(path, TILE_DUMP_WIDTH as u32, TILE_DUMP_HEIGHT as u32, &rgb)
}
