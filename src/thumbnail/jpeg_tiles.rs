use image::{DynamicImage, GenericImageView, ImageFormat};
use tracing::{debug, trace};

use super::canvas::ChunkCanvas;
use super::sampling::ChunkSample;
use super::{fit_dimensions, ThumbnailDecoder, DEFAULT_MAX_CHUNKS};
use crate::error::ThumbnailError;
use crate::format::prepare_chunk_jpeg;
use crate::format::tiff::{Compression, ImageDirectory, IsolatedImage, TiffTag};

const NAME: &str = "jpeg-tiles";

/// PhotometricInterpretation value for RGB.
const PHOTOMETRIC_RGB: u64 = 2;

/// Decodes JPEG-compressed directories chunk by chunk.
///
/// Each tile or strip is completed with the directory's `JPEGTables`,
/// decoded on its own and shrunk onto the thumbnail canvas. Directories
/// with more than `max_chunks` chunks are stride-sampled.
#[derive(Debug, Clone)]
pub struct JpegTileDecoder {
    max_chunks: usize,
}

impl JpegTileDecoder {
    pub fn new(max_chunks: usize) -> Self {
        Self { max_chunks }
    }
}

impl Default for JpegTileDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CHUNKS)
    }
}

/// Chunk geometry and locations of an isolated directory.
struct ChunkGrid {
    chunk_width: u32,
    chunk_height: u32,
    across: u32,
    down: u32,
    offsets: Vec<u64>,
    counts: Vec<u64>,
}

impl ChunkGrid {
    fn resolve(dir: &ImageDirectory) -> Result<Self, ThumbnailError> {
        let width = dir.width();
        let height = dir.height();
        let unsupported = |reason: &str| ThumbnailError::Unsupported {
            decoder: NAME,
            reason: reason.to_string(),
        };

        let tiled = (
            dir.first_u64(TiffTag::TileWidth),
            dir.first_u64(TiffTag::TileLength),
        );
        let (chunk_width, chunk_height, offset_tag, count_tag) = match tiled {
            (Some(tw), Some(th)) => (tw, th, TiffTag::TileOffsets, TiffTag::TileByteCounts),
            _ => {
                let rows = dir
                    .first_u64(TiffTag::RowsPerStrip)
                    .unwrap_or(height as u64)
                    .min(height as u64);
                (
                    width as u64,
                    rows,
                    TiffTag::StripOffsets,
                    TiffTag::StripByteCounts,
                )
            }
        };
        if chunk_width == 0 || chunk_height == 0 {
            return Err(unsupported("zero chunk size"));
        }

        let offsets = dir
            .u64_values(offset_tag)
            .ok_or_else(|| unsupported("no chunk offsets"))?;
        let counts = dir
            .u64_values(count_tag)
            .ok_or_else(|| unsupported("no chunk byte counts"))?;
        if offsets.len() != counts.len() {
            return Err(unsupported("chunk offsets and byte counts differ in length"));
        }

        let chunk_width = u32::try_from(chunk_width).map_err(|_| unsupported("chunk too wide"))?;
        let chunk_height =
            u32::try_from(chunk_height).map_err(|_| unsupported("chunk too tall"))?;

        Ok(Self {
            chunk_width,
            chunk_height,
            across: width.div_ceil(chunk_width).max(1),
            down: height.div_ceil(chunk_height).max(1),
            offsets,
            counts,
        })
    }

    /// Source pixel position of chunk `index`.
    fn origin(&self, index: usize) -> (u64, u64) {
        let index = index as u64;
        let across = self.across as u64;
        (
            (index % across) * self.chunk_width as u64,
            (index / across) * self.chunk_height as u64,
        )
    }
}

impl ThumbnailDecoder for JpegTileDecoder {
    fn name(&self) -> &'static str {
        NAME
    }

    fn decode(&self, image: &IsolatedImage, target: u32) -> Result<DynamicImage, ThumbnailError> {
        let dir = &image.directory;
        let unsupported = |reason: String| ThumbnailError::Unsupported {
            decoder: NAME,
            reason,
        };

        let compression = dir.first_u64(TiffTag::Compression).unwrap_or(1);
        if compression != Compression::Jpeg as u64 {
            return Err(unsupported(format!("compression {}", compression)));
        }
        if dir.first_u64(TiffTag::PlanarConfiguration) == Some(2) {
            return Err(unsupported("planar configuration 2".to_string()));
        }
        let (width, height) = (dir.width(), dir.height());
        if width == 0 || height == 0 {
            return Err(unsupported("zero-sized directory".to_string()));
        }

        let grid = ChunkGrid::resolve(dir)?;
        let tables = dir.get(TiffTag::JpegTables).map(|t| t.raw.clone());
        let rgb = dir.first_u64(TiffTag::PhotometricInterpretation) == Some(PHOTOMETRIC_RGB);

        let (canvas_width, canvas_height) = fit_dimensions(width, height, target);
        let sample = ChunkSample::new(
            grid.across,
            grid.down,
            canvas_width,
            canvas_height,
            self.max_chunks,
        );
        if !sample.is_full() {
            debug!(
                directory = %dir.label(),
                chunks = grid.offsets.len(),
                sampled = sample.len(),
                "Sampling chunks"
            );
        }

        let mut canvas = ChunkCanvas::new(width, height, canvas_width, canvas_height);
        let mut decoded = 0usize;
        let mut last_error = None;

        for sampled in sample.chunks() {
            let index = sampled.index;
            let (Some(&offset), Some(&count)) = (grid.offsets.get(index), grid.counts.get(index))
            else {
                continue;
            };
            let (x, y) = grid.origin(index);
            if offset == 0 || count == 0 || x >= width as u64 || y >= height as u64 {
                continue;
            }
            let Some(bytes) = usize::try_from(offset)
                .ok()
                .zip(usize::try_from(count).ok())
                .and_then(|(start, len)| image.data.get(start..start.checked_add(len)?))
            else {
                last_error = Some(format!("chunk {} lies outside the file", index));
                continue;
            };

            let jpeg = prepare_chunk_jpeg(tables.as_deref(), bytes, rgb);
            match image::load_from_memory_with_format(&jpeg, ImageFormat::Jpeg) {
                Ok(chunk) => {
                    let visible_w = (grid.chunk_width as u64).min(width as u64 - x) as u32;
                    let visible_h = (grid.chunk_height as u64).min(height as u64 - y) as u32;
                    let (cw, ch) = chunk.dimensions();
                    let chunk = if cw > visible_w || ch > visible_h {
                        chunk.crop_imm(0, 0, cw.min(visible_w), ch.min(visible_h))
                    } else {
                        chunk
                    };
                    let span_w = (grid.chunk_width as u64 * sampled.span_cols as u64)
                        .min(width as u64 - x) as u32;
                    let span_h = (grid.chunk_height as u64 * sampled.span_rows as u64)
                        .min(height as u64 - y) as u32;
                    canvas.paste_span(&chunk, x as u32, y as u32, span_w, span_h);
                    decoded += 1;
                }
                Err(e) => {
                    trace!(chunk = index, "JPEG chunk failed to decode: {}", e);
                    last_error = Some(e.to_string());
                }
            }
        }

        if decoded == 0 {
            return Err(ThumbnailError::Decode {
                decoder: NAME,
                message: last_error.unwrap_or_else(|| "no chunk holds data".to_string()),
            });
        }

        Ok(canvas.into_image())
    }
}
