//! Thumbnail decoding for single directories.
//!
//! A [`ThumbnailFetcher`] holds an ordered list of [`ThumbnailDecoder`]s and
//! asks each in turn to render an isolated directory at a target long edge.
//! The first success wins. Earlier failures are logged and swallowed; the
//! last decoder's error is returned so the caller can fall back to a
//! placeholder.
//!
//! Default order, most specialised first:
//!
//! 1. [`JpegTileDecoder`] - JPEG tiles/strips, tables merged per chunk
//! 2. [`ChunkDecoder`] - any chunk the `tiff` crate can decode
//! 3. [`RasterDecoder`] - whole-image decode through `image`

mod canvas;
mod chunks;
mod jpeg_tiles;
mod optimize;
mod raster;
mod sampling;

use std::io::Cursor;

use bytes::Bytes;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat};
use tracing::debug;

use crate::error::ThumbnailError;
use crate::format::tiff::{ImageDirectory, IsolatedImage};

pub use chunks::ChunkDecoder;
pub use jpeg_tiles::JpegTileDecoder;
pub use optimize::{ImageOptimizer, NoopOptimizer, OptipngOptimizer};
pub use raster::RasterDecoder;
pub use sampling::{ChunkSample, SampledChunk};

/// Directories with more chunks than this are stride-sampled.
pub const DEFAULT_MAX_CHUNKS: usize = 65_536;

/// An encoded thumbnail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
    /// PNG bytes
    pub data: Bytes,
    pub width: u32,
    pub height: u32,
}

impl Thumbnail {
    /// Always PNG.
    pub const fn format(&self) -> ImageFormat {
        ImageFormat::Png
    }
}

/// A strategy for turning an isolated directory into pixels.
pub trait ThumbnailDecoder: Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Decode `image` to an image whose long edge is about `target` pixels.
    ///
    /// The result does not have to match the target exactly; the fetcher
    /// resizes it.
    fn decode(&self, image: &IsolatedImage, target: u32) -> Result<DynamicImage, ThumbnailError>;
}

/// Ordered decoder chain.
pub struct ThumbnailFetcher {
    decoders: Vec<Box<dyn ThumbnailDecoder>>,
    max_chunks: usize,
}

impl ThumbnailFetcher {
    pub fn new(decoders: Vec<Box<dyn ThumbnailDecoder>>) -> Self {
        Self {
            decoders,
            max_chunks: DEFAULT_MAX_CHUNKS,
        }
    }

    /// JPEG tiles, then generic chunks, then whole-image raster.
    pub fn with_default_decoders() -> Self {
        Self::with_chunk_limit(DEFAULT_MAX_CHUNKS)
    }

    /// The default chain, sampling directories with more than `max_chunks`
    /// chunks.
    pub fn with_chunk_limit(max_chunks: usize) -> Self {
        Self {
            decoders: vec![
                Box::new(JpegTileDecoder::new(max_chunks)),
                Box::new(ChunkDecoder::new(max_chunks)),
                Box::new(RasterDecoder),
            ],
            max_chunks,
        }
    }

    /// Chunks of `dir` the chunk decoders read at `target`, or `None` when
    /// they read every chunk.
    pub fn chunk_sample(&self, dir: &ImageDirectory, target: u32) -> Option<ChunkSample> {
        ChunkSample::for_directory(dir, target, self.max_chunks)
    }

    /// Render `image` as a PNG whose long edge is `target` pixels.
    pub fn fetch(&self, image: &IsolatedImage, target: u32) -> Result<Thumbnail, ThumbnailError> {
        let (width, height) = fit_dimensions(
            image.directory.width(),
            image.directory.height(),
            target,
        );

        let last = self.decoders.len().saturating_sub(1);
        for (i, decoder) in self.decoders.iter().enumerate() {
            match decoder.decode(image, target) {
                Ok(decoded) => {
                    debug!(
                        directory = %image.directory.label(),
                        decoder = decoder.name(),
                        width,
                        height,
                        "Decoded thumbnail"
                    );
                    let resized = if decoded.dimensions() == (width, height) {
                        decoded
                    } else {
                        decoded.resize_exact(width, height, FilterType::Triangle)
                    };
                    let data = encode_png(&resized)?;
                    return Ok(Thumbnail {
                        data,
                        width,
                        height,
                    });
                }
                Err(e) if i < last => {
                    debug!(
                        directory = %image.directory.label(),
                        decoder = decoder.name(),
                        "Decoder failed, trying next: {}",
                        e
                    );
                }
                Err(e) => return Err(e),
            }
        }

        Err(ThumbnailError::NoDecoders)
    }
}

/// Dimensions with long edge `target` and the same aspect ratio as
/// `width` x `height`. Neither side is smaller than 1.
pub fn fit_dimensions(width: u32, height: u32, target: u32) -> (u32, u32) {
    let target = target.max(1);
    if width == 0 || height == 0 {
        return (target, target);
    }

    let ratio = width as f64 / height as f64;
    if width >= height {
        let new_height = (target as f64 / ratio).round() as u32;
        (target, new_height.max(1))
    } else {
        let new_width = (target as f64 * ratio).round() as u32;
        (new_width.max(1), target)
    }
}

/// Encode as PNG, keeping an alpha channel only when the image has one.
pub fn encode_png(image: &DynamicImage) -> Result<Bytes, ThumbnailError> {
    let normalized = if image.color().has_alpha() {
        DynamicImage::ImageRgba8(image.to_rgba8())
    } else {
        DynamicImage::ImageRgb8(image.to_rgb8())
    };

    let mut out = Vec::new();
    normalized
        .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
        .map_err(|e| ThumbnailError::Encode(e.to_string()))?;
    Ok(Bytes::from(out))
}
