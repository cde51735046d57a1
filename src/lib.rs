//! # tiff-uml
//!
//! Structural reports and diagrams of TIFF files.
//!
//! Every Image File Directory (IFD) of a TIFF or BigTIFF file, SubIFDs
//! included, is listed with its tags in a YAML dump. Each directory can get a
//! thumbnail, a thumbnail with its tile or strip grid drawn on, and a
//! thumbnail shaded by the order its chunks were written to disk. The dump
//! can then be rendered as a PlantUML JSON diagram.
//!
//! ## Architecture
//!
//! - [`io`] - Range reads from local files or memory
//! - [`mod@format`] - TIFF parsing, directory isolation and JPEG handling
//! - [`thumbnail`] - Decoder chain producing PNG thumbnails
//! - [`annotate`] - Chunk layouts, thumbnail scale, overlays
//! - [`report`] - Metadata dumps, thumbnail injection, diagrams
//! - [`external`] - Running helper programs
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use tiff_uml::io::FileRangeReader;
//! use tiff_uml::report::{generate_report, NativeDumper, OverlaySelection, ReportAssembler};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let source = Path::new("slide.tif");
//!     let reader = FileRangeReader::open(source).await?;
//!     let assembler = ReportAssembler::with_selection(OverlaySelection {
//!         thumb: true,
//!         structure: true,
//!         order: false,
//!     });
//!
//!     let report = generate_report(source, &reader, &NativeDumper::default(), &assembler).await?;
//!     println!("{}", report);
//!     Ok(())
//! }
//! ```

pub mod annotate;
pub mod config;
pub mod error;
pub mod external;
pub mod format;
pub mod io;
pub mod report;
pub mod thumbnail;

// Re-export commonly used types
pub use annotate::{ChunkKind, ChunkLayout, OverlayMode, ScalePlan};
pub use config::{Cli, Command, DiagramConfig, DumpConfig, DumpFormat, ReportConfig};
pub use error::{ExternalError, IoError, OverlayError, ReportError, ThumbnailError, TiffError};
pub use format::tiff::{
    isolate_chunks, isolate_directory, ByteOrder, Compression, FieldType, ImageDirectory,
    IsolatedImage, TagData, TagValue, TiffFile, TiffHeader, TiffTag,
};
pub use io::{FileRangeReader, MemoryReader, RangeReader};
pub use report::{
    build_json_uml, generate_report, render_diagram, DiagramRenderer, MetadataDumper,
    NativeDumper, OverlaySelection, PlantUmlRenderer, ReportAssembler, TifftoolsDumper,
};
pub use thumbnail::{
    ChunkSample, ImageOptimizer, Thumbnail, ThumbnailDecoder, ThumbnailFetcher,
};
