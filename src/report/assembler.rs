//! Per-directory thumbnail generation for a report.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use tracing::{debug, info, warn};

use super::inject::{inject, Injection};
use crate::annotate::{render_overlay, ChunkLayout, OverlayMode, ScalePlan};
use crate::annotate::{DEFAULT_MAX_THUMB, DEFAULT_MIN_THUMB};
use crate::error::ReportError;
use crate::format::tiff::{isolate_chunks, ImageDirectory, TiffFile, TiffTag};
use crate::io::RangeReader;
use crate::thumbnail::{ImageOptimizer, NoopOptimizer, ThumbnailFetcher};

/// Which images to attach to each directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OverlaySelection {
    /// The plain thumbnail
    pub thumb: bool,
    /// Thumbnail with the chunk grid
    pub structure: bool,
    /// Thumbnail shaded by chunk write order
    pub order: bool,
}

impl OverlaySelection {
    pub fn any(&self) -> bool {
        self.thumb || self.structure || self.order
    }
}

/// A labeled, encoded image ready for the report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotatedImage {
    pub label: &'static str,
    pub data: Bytes,
}

impl AnnotatedImage {
    /// Inline image marker understood by the diagram renderer.
    pub fn marker(&self) -> String {
        format!("<img:data:image/png;base64,{}>", STANDARD.encode(&self.data))
    }
}

/// Builds the `Image Thumbnail` entries of a report.
pub struct ReportAssembler {
    fetcher: ThumbnailFetcher,
    optimizer: Box<dyn ImageOptimizer>,
    selection: OverlaySelection,
    min_thumb: u32,
    max_thumb: u32,
}

impl ReportAssembler {
    pub fn new(
        fetcher: ThumbnailFetcher,
        optimizer: Box<dyn ImageOptimizer>,
        selection: OverlaySelection,
    ) -> Self {
        Self {
            fetcher,
            optimizer,
            selection,
            min_thumb: DEFAULT_MIN_THUMB,
            max_thumb: DEFAULT_MAX_THUMB,
        }
    }

    /// Default decoders, no optimizer.
    pub fn with_selection(selection: OverlaySelection) -> Self {
        Self::new(
            ThumbnailFetcher::with_default_decoders(),
            Box::new(NoopOptimizer),
            selection,
        )
    }

    /// Bounds for the thumbnail long edge.
    pub fn with_thumb_range(mut self, min_thumb: u32, max_thumb: u32) -> Self {
        self.min_thumb = min_thumb;
        self.max_thumb = max_thumb;
        self
    }

    pub fn selection(&self) -> OverlaySelection {
        self.selection
    }

    /// Add thumbnails to `dump`, one entry per directory with an
    /// `ImageLength` tag, in document order.
    ///
    /// With nothing selected the dump is returned as is.
    pub async fn annotate<R: RangeReader + ?Sized>(
        &self,
        dump: &str,
        reader: &R,
        file: &TiffFile,
    ) -> Result<String, ReportError> {
        if !self.selection.any() {
            return Ok(dump.to_string());
        }
        let injections = self.injections(reader, file).await;
        inject(dump, &injections)
    }

    /// Entries for every directory, in document order.
    pub async fn injections<R: RangeReader + ?Sized>(
        &self,
        reader: &R,
        file: &TiffFile,
    ) -> Vec<Injection> {
        let plan = ScalePlan::for_file(file, self.min_thumb, self.max_thumb);
        if let Some(plan) = &plan {
            info!(
                max_dim = plan.max_dim,
                min_max_dim = plan.min_max_dim,
                min_output = plan.min_output,
                max_output = plan.max_output,
                "Planned thumbnail sizes"
            );
        }

        let mut injections = Vec::new();
        for dir in file.iter() {
            if !dir.has_tag(TiffTag::ImageLength) {
                debug!(directory = %dir.label(), "No ImageLength, skipping");
                continue;
            }
            let injection = match &plan {
                Some(plan) if dir.max_dimension() > 0 => {
                    self.annotate_directory(reader, file, dir, plan).await
                }
                _ => Injection::placeholder(dir.label()),
            };
            injections.push(injection);
        }
        injections
    }

    async fn annotate_directory<R: RangeReader + ?Sized>(
        &self,
        reader: &R,
        file: &TiffFile,
        dir: &ImageDirectory,
        plan: &ScalePlan,
    ) -> Injection {
        let label = dir.label();
        let maxwh = dir.max_dimension();
        let scale = plan.scale_for(maxwh);
        let target = plan.target_edge(maxwh);
        debug!(directory = %label, maxwh, scale, target, "Fetching thumbnail");

        let sample = self.fetcher.chunk_sample(dir, target);
        let keep = |index: usize| sample.as_ref().map_or(true, |s| s.contains(index));
        let isolated = match isolate_chunks(reader, &file.header, dir, keep).await {
            Ok(isolated) => isolated,
            Err(e) => {
                warn!(directory = %label, "Could not isolate directory: {}", e);
                return Injection::placeholder(label);
            }
        };
        let thumbnail = match self.fetcher.fetch(&isolated, target) {
            Ok(thumbnail) => thumbnail,
            Err(e) => {
                warn!(directory = %label, "Could not decode thumbnail: {}", e);
                return Injection::placeholder(label);
            }
        };

        let layout = ChunkLayout::resolve(dir);

        let mut images = Vec::new();
        if self.selection.thumb {
            images.push(AnnotatedImage {
                label: "Image",
                data: self.optimize(&label, thumbnail.data.clone()).await,
            });
        }
        for (selected, mode) in [
            (self.selection.structure, OverlayMode::Grid),
            (self.selection.order, OverlayMode::Order),
        ] {
            if !selected {
                continue;
            }
            match render_overlay(
                &thumbnail.data,
                dir.width(),
                dir.height(),
                &layout,
                scale,
                mode,
            ) {
                Ok(data) => images.push(AnnotatedImage {
                    label: mode.label(),
                    data: self.optimize(&label, data).await,
                }),
                Err(e) => {
                    warn!(directory = %label, overlay = mode.label(), "Dropping overlay: {}", e)
                }
            }
        }

        Injection {
            directory: label,
            title: images
                .iter()
                .map(|image| image.label)
                .collect::<Vec<_>>()
                .join(" | "),
            marker: images
                .iter()
                .map(AnnotatedImage::marker)
                .collect::<Vec<_>>()
                .join(" "),
        }
    }

    async fn optimize(&self, directory: &str, data: Bytes) -> Bytes {
        match self.optimizer.optimize(data.clone()).await {
            Ok(optimized) => optimized,
            Err(e) => {
                warn!(directory, "Optimizer failed, keeping original: {}", e);
                data
            }
        }
    }
}
