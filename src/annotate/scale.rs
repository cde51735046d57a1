//! Thumbnail scale planning.
//!
//! Directories in a pyramid span orders of magnitude in size. Scaling every
//! one to the same edge hides that; scaling them all by the same factor makes
//! the small ones vanish. The plan interpolates logarithmically instead: the
//! largest directory maps to `max_output`, the smallest to `min_output`, and
//! everything in between lands on the log-log line joining them.

use crate::format::tiff::TiffFile;

/// Default smallest thumbnail long edge, in pixels.
pub const DEFAULT_MIN_THUMB: u32 = 64;

/// Default largest thumbnail long edge, in pixels.
pub const DEFAULT_MAX_THUMB: u32 = 512;

/// Output size bounds for every directory of one file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScalePlan {
    /// Largest long edge among the directories
    pub max_dim: f64,
    /// Smallest long edge, halved when every directory has the same one
    pub min_max_dim: f64,
    pub min_output: f64,
    pub max_output: f64,
}

impl ScalePlan {
    /// Build a plan from `(width, height)` pairs.
    ///
    /// Zero-sized directories take no part. Returns `None` when nothing is
    /// left to plan for.
    pub fn new(dimensions: &[(u32, u32)], min_thumb: u32, max_thumb: u32) -> Option<Self> {
        let edges = dimensions
            .iter()
            .map(|&(w, h)| w.max(h))
            .filter(|&edge| edge > 0);

        let (min_edge, max_edge) = edges.fold(None, |acc, edge| match acc {
            None => Some((edge, edge)),
            Some((lo, hi)) => Some((edge.min(lo), edge.max(hi))),
        })?;

        let max_dim = max_edge as f64;
        let mut min_max_dim = min_edge as f64;
        if min_edge == max_edge {
            min_max_dim /= 2.0;
        }

        Some(Self {
            max_dim,
            min_max_dim,
            min_output: min_max_dim.min(min_thumb as f64),
            max_output: max_dim.min(max_thumb as f64),
        })
    }

    /// Plan over every directory of `file`, SubIFDs included.
    pub fn for_file(file: &TiffFile, min_thumb: u32, max_thumb: u32) -> Option<Self> {
        Self::new(&file.dimensions(), min_thumb, max_thumb)
    }

    /// Factor to apply to a directory whose long edge is `maxwh`.
    pub fn scale_for(&self, maxwh: u32) -> f64 {
        if self.max_dim <= 0.0 || self.min_max_dim <= 0.0 || maxwh == 0 {
            return 1.0;
        }
        if self.min_output <= 0.0 || self.max_output <= 0.0 {
            return 1.0;
        }

        let maxwh = maxwh as f64;
        let input_ratio = (self.min_max_dim / self.max_dim).ln();
        let output_ratio = (self.min_output / self.max_output).ln();

        let t = ((maxwh / self.max_dim).ln() - input_ratio) / -input_ratio;
        let scale = (t * -output_ratio + output_ratio).exp() * self.max_output / maxwh;
        if scale.is_finite() && scale > 0.0 {
            scale
        } else {
            1.0
        }
    }

    /// Long edge of the thumbnail for a directory whose long edge is `maxwh`.
    pub fn target_edge(&self, maxwh: u32) -> u32 {
        let edge = (maxwh as f64 * self.scale_for(maxwh)).round();
        (edge as u32).max(1)
    }
}
