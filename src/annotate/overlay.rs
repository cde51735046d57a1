//! Structure and write-order overlays.
//!
//! Overlays are drawn on a 2x upscaled copy of the thumbnail so that chunk
//! boundaries which fall between thumbnail pixels still land close to where
//! they belong; the result is resampled back to the thumbnail's size.

use std::io::Cursor;

use bytes::Bytes;
use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, ImageFormat, Rgb, RgbImage};

use super::layout::ChunkLayout;
use crate::error::OverlayError;

/// Supersampling factor for drawing.
pub const RESCALE: u32 = 2;

/// Value XOR-ed into every channel of a grid line.
pub const GRID_XOR: u8 = 128;

/// Color of chunks with no data on disk.
pub const SKIPPED_COLOR: [u8; 3] = [255, 255, 0];

/// Which overlay to draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayMode {
    /// Chunk boundaries
    Grid,
    /// Chunks shaded by on-disk position
    Order,
}

impl OverlayMode {
    /// Title used for the image in the report.
    pub const fn label(self) -> &'static str {
        match self {
            OverlayMode::Grid => "Structure",
            OverlayMode::Order => "Order",
        }
    }
}

/// Draw `mode` onto a PNG thumbnail of a `width` x `height` directory.
///
/// `scale` maps source pixels to thumbnail pixels. Layouts with nothing to
/// draw return `png` untouched.
pub fn render_overlay(
    png: &Bytes,
    width: u32,
    height: u32,
    layout: &ChunkLayout,
    scale: f64,
    mode: OverlayMode,
) -> Result<Bytes, OverlayError> {
    if layout.is_none() {
        return Ok(png.clone());
    }

    let chunk_height = usable_chunk(layout.chunk_height, height);
    let chunk_width = usable_chunk(layout.chunk_width, width);
    if mode == OverlayMode::Grid && chunk_height.is_none() && chunk_width.is_none() {
        return Ok(png.clone());
    }

    let thumb = image::load_from_memory_with_format(png, ImageFormat::Png)
        .map_err(|e| OverlayError::Decode(e.to_string()))?;
    let (thumb_width, thumb_height) = thumb.dimensions();
    let mut canvas = imageops::resize(
        &thumb.to_rgb8(),
        thumb_width * RESCALE,
        thumb_height * RESCALE,
        FilterType::Triangle,
    );
    let factor = scale * RESCALE as f64;

    match mode {
        OverlayMode::Grid => {
            if let Some(step) = chunk_height {
                draw_rows(&mut canvas, height, step, factor);
            }
            if let Some(step) = chunk_width {
                draw_columns(&mut canvas, width, step, factor);
            }
        }
        OverlayMode::Order => draw_order(&mut canvas, width, height, layout, factor)?,
    }

    let annotated = imageops::resize(&canvas, thumb_width, thumb_height, FilterType::CatmullRom);
    let mut out = Vec::new();
    DynamicImage::ImageRgb8(annotated)
        .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
        .map_err(|e| OverlayError::Encode(e.to_string()))?;
    Ok(Bytes::from(out))
}

/// Chunk size worth drawing a grid line for.
fn usable_chunk(chunk: Option<u32>, extent: u32) -> Option<u32> {
    chunk.filter(|&c| c >= 2 && c < extent)
}

/// Canvas position of source coordinate `coord`, halves rounded to even.
fn scaled(coord: u64, factor: f64) -> u64 {
    (coord as f64 * factor).round_ties_even() as u64
}

/// Rows of the canvas that sit on the last source row of each chunk.
fn grid_lines(extent: u32, step: u32, factor: f64, limit: u32) -> Vec<u32> {
    let mut lines = Vec::new();
    let mut last = None;
    for coord in ((step - 1) as u64..extent as u64).step_by(step as usize) {
        let line = scaled(coord, factor);
        if last != Some(line) && line < limit as u64 {
            lines.push(line as u32);
        }
        last = Some(line);
    }
    lines
}

fn xor(pixel: &mut Rgb<u8>) {
    for channel in pixel.0.iter_mut() {
        *channel ^= GRID_XOR;
    }
}

fn draw_rows(canvas: &mut RgbImage, height: u32, step: u32, factor: f64) {
    let (cols, rows) = canvas.dimensions();
    for y in grid_lines(height, step, factor, rows) {
        for x in 0..cols {
            xor(canvas.get_pixel_mut(x, y));
        }
    }
}

fn draw_columns(canvas: &mut RgbImage, width: u32, step: u32, factor: f64) {
    let (cols, rows) = canvas.dimensions();
    for x in grid_lines(width, step, factor, cols) {
        for y in 0..rows {
            xor(canvas.get_pixel_mut(x, y));
        }
    }
}

/// Gray level per chunk by on-disk position; `None` for chunks without data.
///
/// Ties are broken by chunk index. The earliest written chunk is 0, the
/// latest 255.
pub fn order_shades(order: &[u64]) -> Vec<Option<u8>> {
    let mut written: Vec<(u64, usize)> = order
        .iter()
        .enumerate()
        .filter(|&(_, &offset)| offset != 0)
        .map(|(index, &offset)| (offset, index))
        .collect();
    written.sort_unstable();

    let span = written.len().saturating_sub(1).max(1) as f64;
    let mut shades = vec![None; order.len()];
    for (rank, &(_, index)) in written.iter().enumerate() {
        let shade = (rank as f64 / span * 256.0).floor().min(255.0);
        shades[index] = Some(shade as u8);
    }
    shades
}

fn draw_order(
    canvas: &mut RgbImage,
    width: u32,
    height: u32,
    layout: &ChunkLayout,
    factor: f64,
) -> Result<(), OverlayError> {
    let (cols, rows) = canvas.dimensions();
    let step_y = layout.chunk_height.filter(|&c| c > 0).unwrap_or(height).max(1);
    let step_x = layout.chunk_width.filter(|&c| c > 0).unwrap_or(width).max(1);

    let cells_down = height.div_ceil(step_y) as usize;
    let cells_across = width.div_ceil(step_x) as usize;
    let cells = cells_down * cells_across;
    if cells > layout.chunk_order.len() {
        return Err(OverlayError::ChunkCountMismatch {
            cells,
            chunks: layout.chunk_order.len(),
        });
    }

    let shades = order_shades(&layout.chunk_order);
    let clamp = |coord: u64, limit: u32| {
        scaled(coord, factor).min(limit.saturating_sub(1) as u64) as u32
    };

    for cell in 0..cells {
        let y = (cell / cells_across) as u64 * step_y as u64;
        let x = (cell % cells_across) as u64 * step_x as u64;
        let (x1, x2) = (clamp(x, cols), clamp(x + step_x as u64, cols));
        let (y1, y2) = (clamp(y, rows), clamp(y + step_y as u64, rows));
        if x2 <= x1 || y2 <= y1 {
            continue;
        }

        let color = match shades[cell] {
            Some(v) => Rgb([v, v, v]),
            None => Rgb(SKIPPED_COLOR),
        };
        for py in y1..y2 {
            for px in x1..x2 {
                canvas.put_pixel(px, py, color);
            }
        }
    }
    Ok(())
}
