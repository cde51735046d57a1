//! Choosing which chunks to decode when a directory has too many.
//!
//! Over the chunk budget, only every `stride_x`-th chunk column of every
//! `stride_y`-th chunk row is decoded. Each of those stands in for the whole
//! block of chunks up to the next sampled one.

use crate::format::tiff::{ImageDirectory, TiffTag};

use super::fit_dimensions;

/// One decoded chunk and the block of chunks it covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampledChunk {
    /// Chunk index in raster order
    pub index: usize,
    pub col: u32,
    pub row: u32,
    /// Chunk columns covered, this one included
    pub span_cols: u32,
    /// Chunk rows covered, this one included
    pub span_rows: u32,
}

/// A stride-sampled chunk grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSample {
    pub across: u32,
    pub down: u32,
    pub stride_x: u32,
    pub stride_y: u32,
}

impl ChunkSample {
    /// Sample an `across` x `down` chunk grid drawn onto a
    /// `canvas_width` x `canvas_height` canvas.
    ///
    /// Grids within `max_chunks` are kept whole. Larger grids are strided so
    /// that at most `max_chunks` chunks remain and no canvas pixel gets more
    /// than one chunk in either direction.
    pub fn new(
        across: u32,
        down: u32,
        canvas_width: u32,
        canvas_height: u32,
        max_chunks: usize,
    ) -> Self {
        let across = across.max(1);
        let down = down.max(1);
        let budget = max_chunks.max(1) as u64;
        let total = across as u64 * down as u64;
        if total <= budget {
            return Self {
                across,
                down,
                stride_x: 1,
                stride_y: 1,
            };
        }

        let stride = (total as f64 / budget as f64).sqrt().ceil() as u32;
        let mut stride_x = stride.max(across / canvas_width.max(1)).clamp(1, across);
        let mut stride_y = stride.max(down / canvas_height.max(1)).clamp(1, down);
        while across.div_ceil(stride_x) as u64 * down.div_ceil(stride_y) as u64 > budget {
            stride_x = (stride_x + 1).min(across);
            stride_y = (stride_y + 1).min(down);
        }

        Self {
            across,
            down,
            stride_x,
            stride_y,
        }
    }

    /// Sample for the chunk grid of `dir` at thumbnail long edge `target`.
    ///
    /// `None` when every chunk is decoded or the directory has no usable
    /// chunk grid.
    pub fn for_directory(dir: &ImageDirectory, target: u32, max_chunks: usize) -> Option<Self> {
        let (width, height) = (dir.width(), dir.height());
        if width == 0 || height == 0 {
            return None;
        }
        let (chunk_width, chunk_height) = match (
            dir.first_u64(TiffTag::TileWidth),
            dir.first_u64(TiffTag::TileLength),
        ) {
            (Some(tw), Some(th)) if dir.has_tag(TiffTag::TileOffsets) => (tw, th),
            _ => (
                width as u64,
                dir.first_u64(TiffTag::RowsPerStrip)
                    .unwrap_or(height as u64)
                    .min(height as u64),
            ),
        };
        let chunk_width = u32::try_from(chunk_width).ok().filter(|&c| c > 0)?;
        let chunk_height = u32::try_from(chunk_height).ok().filter(|&c| c > 0)?;

        let (canvas_width, canvas_height) = fit_dimensions(width, height, target);
        let sample = Self::new(
            width.div_ceil(chunk_width),
            height.div_ceil(chunk_height),
            canvas_width,
            canvas_height,
            max_chunks,
        );
        (!sample.is_full()).then_some(sample)
    }

    /// Whether every chunk is decoded.
    pub fn is_full(&self) -> bool {
        self.stride_x == 1 && self.stride_y == 1
    }

    /// Number of chunks decoded.
    pub fn len(&self) -> usize {
        self.across.div_ceil(self.stride_x) as usize * self.down.div_ceil(self.stride_y) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether chunk `index` is decoded.
    pub fn contains(&self, index: usize) -> bool {
        let across = self.across as usize;
        let (col, row) = (index % across, index / across);
        row < self.down as usize
            && col % self.stride_x as usize == 0
            && row % self.stride_y as usize == 0
    }

    /// The decoded chunks in raster order.
    pub fn chunks(&self) -> impl Iterator<Item = SampledChunk> + '_ {
        (0..self.down).step_by(self.stride_y as usize).flat_map(move |row| {
            (0..self.across)
                .step_by(self.stride_x as usize)
                .map(move |col| SampledChunk {
                    index: row as usize * self.across as usize + col as usize,
                    col,
                    row,
                    span_cols: self.stride_x.min(self.across - col),
                    span_rows: self.stride_y.min(self.down - row),
                })
        })
    }
}
