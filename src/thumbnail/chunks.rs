use std::io::Cursor;

use image::{DynamicImage, ImageBuffer, Luma, LumaA, Rgb, Rgba};
use tiff::decoder::{Decoder, DecodingResult};
use tiff::ColorType;
use tracing::{debug, trace};

use super::canvas::ChunkCanvas;
use super::sampling::ChunkSample;
use super::{fit_dimensions, ThumbnailDecoder, DEFAULT_MAX_CHUNKS};
use crate::error::ThumbnailError;
use crate::format::tiff::{IsolatedImage, TiffTag};

const NAME: &str = "tiff-chunks";

/// Generic chunk decoder built on the `tiff` crate.
///
/// Handles whatever compression the crate supports (none, LZW, Deflate,
/// PackBits, ...). Chunks are decoded one at a time and shrunk straight
/// onto the canvas. Past `max_chunks`, only a stride sample is read.
#[derive(Debug, Clone)]
pub struct ChunkDecoder {
    max_chunks: usize,
}

impl ChunkDecoder {
    pub fn new(max_chunks: usize) -> Self {
        Self { max_chunks }
    }
}

impl Default for ChunkDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CHUNKS)
    }
}

fn decode_error(e: impl std::fmt::Display) -> ThumbnailError {
    ThumbnailError::Decode {
        decoder: NAME,
        message: e.to_string(),
    }
}

fn unsupported(reason: String) -> ThumbnailError {
    ThumbnailError::Unsupported {
        decoder: NAME,
        reason,
    }
}

/// Wrap decoded chunk samples in an image of the matching color type.
fn chunk_image(
    result: DecodingResult,
    color: ColorType,
    width: u32,
    height: u32,
) -> Result<DynamicImage, ThumbnailError> {
    let short = || decode_error(format!("chunk buffer too small for {}x{}", width, height));

    let image = match (color, result) {
        (ColorType::Gray(8), DecodingResult::U8(data)) => DynamicImage::ImageLuma8(
            ImageBuffer::<Luma<u8>, _>::from_raw(width, height, data).ok_or_else(short)?,
        ),
        (ColorType::Gray(16), DecodingResult::U16(data)) => DynamicImage::ImageLuma16(
            ImageBuffer::<Luma<u16>, _>::from_raw(width, height, data).ok_or_else(short)?,
        ),
        (ColorType::GrayA(8), DecodingResult::U8(data)) => DynamicImage::ImageLumaA8(
            ImageBuffer::<LumaA<u8>, _>::from_raw(width, height, data).ok_or_else(short)?,
        ),
        (ColorType::GrayA(16), DecodingResult::U16(data)) => DynamicImage::ImageLumaA16(
            ImageBuffer::<LumaA<u16>, _>::from_raw(width, height, data).ok_or_else(short)?,
        ),
        (ColorType::RGB(8), DecodingResult::U8(data)) => DynamicImage::ImageRgb8(
            ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, data).ok_or_else(short)?,
        ),
        (ColorType::RGB(16), DecodingResult::U16(data)) => DynamicImage::ImageRgb16(
            ImageBuffer::<Rgb<u16>, _>::from_raw(width, height, data).ok_or_else(short)?,
        ),
        (ColorType::RGBA(8), DecodingResult::U8(data)) => DynamicImage::ImageRgba8(
            ImageBuffer::<Rgba<u8>, _>::from_raw(width, height, data).ok_or_else(short)?,
        ),
        (ColorType::RGBA(16), DecodingResult::U16(data)) => DynamicImage::ImageRgba16(
            ImageBuffer::<Rgba<u16>, _>::from_raw(width, height, data).ok_or_else(short)?,
        ),
        (color, _) => return Err(unsupported(format!("color type {:?}", color))),
    };
    Ok(image)
}

impl ThumbnailDecoder for ChunkDecoder {
    fn name(&self) -> &'static str {
        NAME
    }

    fn decode(&self, image: &IsolatedImage, target: u32) -> Result<DynamicImage, ThumbnailError> {
        if image.directory.first_u64(TiffTag::PlanarConfiguration) == Some(2) {
            return Err(unsupported("planar configuration 2".to_string()));
        }

        let mut decoder = Decoder::new(Cursor::new(&image.data[..])).map_err(decode_error)?;
        let (width, height) = decoder.dimensions().map_err(decode_error)?;
        let color = decoder.colortype().map_err(decode_error)?;
        if width == 0 || height == 0 {
            return Err(unsupported("zero-sized directory".to_string()));
        }

        let (chunk_width, chunk_height) = decoder.chunk_dimensions();
        if chunk_width == 0 || chunk_height == 0 {
            return Err(unsupported("zero chunk size".to_string()));
        }
        let across = width.div_ceil(chunk_width);
        let down = height.div_ceil(chunk_height);

        let (canvas_width, canvas_height) = fit_dimensions(width, height, target);
        let sample = ChunkSample::new(across, down, canvas_width, canvas_height, self.max_chunks);
        if !sample.is_full() {
            debug!(
                directory = %image.directory.label(),
                chunks = across as u64 * down as u64,
                sampled = sample.len(),
                "Sampling chunks"
            );
        }

        let mut canvas = ChunkCanvas::new(width, height, canvas_width, canvas_height);
        let mut decoded = 0usize;
        let mut last_error = None;

        for sampled in sample.chunks() {
            let Ok(index) = u32::try_from(sampled.index) else {
                break;
            };
            let (data_width, data_height) = decoder.chunk_data_dimensions(index);
            let chunk = decoder
                .read_chunk(index)
                .map_err(decode_error)
                .and_then(|result| chunk_image(result, color, data_width, data_height));
            match chunk {
                Ok(chunk) => {
                    let x = sampled.col * chunk_width;
                    let y = sampled.row * chunk_height;
                    let span_w = chunk_width.saturating_mul(sampled.span_cols).min(width - x);
                    let span_h = chunk_height.saturating_mul(sampled.span_rows).min(height - y);
                    canvas.paste_span(&chunk, x, y, span_w, span_h);
                    decoded += 1;
                }
                // Unsupported color types fail every chunk the same way
                Err(e @ ThumbnailError::Unsupported { .. }) => return Err(e),
                Err(e) => {
                    trace!(chunk = index, "Chunk failed to decode: {}", e);
                    last_error = Some(e);
                }
            }
        }

        if decoded == 0 {
            return Err(last_error.unwrap_or_else(|| decode_error("no chunk holds data")));
        }
        Ok(canvas.into_image())
    }
}
