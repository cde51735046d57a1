//! Chunk layout resolution.
//!
//! A directory stores its pixels in chunks: tiles, strips, or (for NDPI)
//! JPEG restart-interval macroblocks. The layout says how big the chunks are
//! and where each one starts on disk, which is all the overlays need.

use tracing::warn;

use crate::format::tiff::{ImageDirectory, TiffTag};

/// How a directory's pixels are divided on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkKind {
    Tiled,
    Strip,
    Macroblock,
    None,
}

/// Chunk geometry and on-disk start offsets of one directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkLayout {
    pub kind: ChunkKind,

    /// Chunk width in pixels, `None` when it cannot be determined
    pub chunk_width: Option<u32>,

    /// Chunk height in pixels, `None` when it cannot be determined
    pub chunk_height: Option<u32>,

    /// Start offset of each chunk, in chunk index (raster) order
    pub chunk_order: Vec<u64>,
}

impl ChunkLayout {
    /// A directory with no usable chunk layout.
    pub fn none() -> Self {
        Self {
            kind: ChunkKind::None,
            chunk_width: None,
            chunk_height: None,
            chunk_order: Vec::new(),
        }
    }

    fn new(kind: ChunkKind, width: u64, height: u64, order: Vec<u64>) -> Self {
        let size = |v: u64| u32::try_from(v).ok().filter(|&v| v >= 1);
        match (size(width), size(height)) {
            (Some(w), Some(h)) => Self {
                kind,
                chunk_width: Some(w),
                chunk_height: Some(h),
                chunk_order: order,
            },
            _ => Self::none(),
        }
    }

    /// Work out the layout from a directory's tags.
    ///
    /// First match wins:
    ///
    /// 1. `TileWidth` and `TileLength` present: tiles, ordered by `TileOffsets`
    /// 2. `NDPI_MCU_STARTS` present: macroblocks `8 * YCbCrSubsampling[1]`
    ///    wide, their height derived from the macroblock count
    /// 3. `RowsPerStrip` present: full-width strips, ordered by `StripOffsets`
    /// 4. otherwise no layout
    pub fn resolve(dir: &ImageDirectory) -> Self {
        let width = dir.width() as u64;
        let height = dir.height() as u64;
        let values = |tag| dir.u64_values(tag).unwrap_or_default();

        let layout = if let (Some(tile_width), Some(tile_length)) = (
            dir.first_u64(TiffTag::TileWidth),
            dir.first_u64(TiffTag::TileLength),
        ) {
            Self::new(
                ChunkKind::Tiled,
                tile_width,
                tile_length,
                values(TiffTag::TileOffsets),
            )
        } else if dir.has_tag(TiffTag::NdpiMcuStarts) {
            let starts = values(TiffTag::NdpiMcuStarts);
            let subsampling = dir
                .u64_values(TiffTag::YCbCrSubSampling)
                .and_then(|v| v.get(1).copied())
                .unwrap_or(1);
            let chunk_width = 8 * subsampling;
            let count = starts.len() as u64;
            let chunk_height = if chunk_width == 0 || count == 0 {
                0
            } else {
                width * height / chunk_width / count
            };
            Self::new(ChunkKind::Macroblock, chunk_width, chunk_height, starts)
        } else if let Some(rows) = dir.first_u64(TiffTag::RowsPerStrip) {
            Self::new(ChunkKind::Strip, width, rows, values(TiffTag::StripOffsets))
        } else {
            Self::none()
        };

        if let Some(expected) = layout.expected_chunk_count(dir.width(), dir.height()) {
            if expected != layout.chunk_order.len() as u64 {
                warn!(
                    directory = %dir.label(),
                    kind = ?layout.kind,
                    expected,
                    actual = layout.chunk_order.len(),
                    "Chunk count does not match the chunk grid"
                );
            }
        }

        layout
    }

    /// Number of chunks the grid implies for a `width` x `height` image.
    ///
    /// `None` for layouts without a fixed grid.
    pub fn expected_chunk_count(&self, width: u32, height: u32) -> Option<u64> {
        let (cw, ch) = (self.chunk_width? as u64, self.chunk_height? as u64);
        match self.kind {
            ChunkKind::Tiled => Some((width as u64).div_ceil(cw) * (height as u64).div_ceil(ch)),
            ChunkKind::Strip => Some((height as u64).div_ceil(ch)),
            ChunkKind::Macroblock | ChunkKind::None => None,
        }
    }

    pub fn is_none(&self) -> bool {
        self.kind == ChunkKind::None
    }
}
