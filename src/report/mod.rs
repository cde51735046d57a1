//! Report assembly.
//!
//! A report run is:
//!
//! 1. read the directory tree of the source
//! 2. dump its metadata as YAML ([`MetadataDumper`])
//! 3. add thumbnails and overlays per directory ([`ReportAssembler`])
//! 4. optionally turn the result into a diagram ([`build_json_uml`],
//!    [`DiagramRenderer`])

mod assembler;
mod diagram;
mod dump;
mod inject;

use std::path::Path;

use tracing::info;

use crate::error::ReportError;
use crate::format::tiff::TiffFile;
use crate::io::RangeReader;

pub use assembler::{AnnotatedImage, OverlaySelection, ReportAssembler};
pub use diagram::{
    build_json_uml, default_plantuml_args, parse_dump, to_json, yaml_to_json, DiagramRenderer,
    PlantUmlRenderer,
};
pub use dump::{
    default_tifftools_args, MetadataDumper, NativeDumper, TifftoolsDumper, DEFAULT_MAX_ITEMS,
    DEFAULT_MAX_TEXT,
};
pub use inject::{inject, Injection, ANCHOR_KEY, PLACEHOLDER, THUMBNAIL_KEY};

/// Dump `reader` and add the selected thumbnails.
///
/// `source` is the path handed to the dumper and used as the top-level key.
pub async fn generate_report<R: RangeReader + ?Sized>(
    source: &Path,
    reader: &R,
    dumper: &dyn MetadataDumper,
    assembler: &ReportAssembler,
) -> Result<String, ReportError> {
    let file = TiffFile::read(reader).await?;
    info!(
        source = %source.display(),
        directories = file.iter().count(),
        bigtiff = file.header.is_bigtiff,
        "Read directory tree"
    );

    let dump = dumper.dump(source, &file).await?;
    assembler.annotate(&dump, reader, &file).await
}

/// A rendered diagram and the document it was rendered from.
#[derive(Debug, Clone)]
pub struct Diagram {
    /// The `@startjson` document
    pub document: String,
    /// Renderer output
    pub rendered: Vec<u8>,
}

/// Convert a report to a diagram document and render it.
pub async fn render_diagram(
    report: &str,
    renderer: &dyn DiagramRenderer,
    pretty: bool,
) -> Result<Diagram, ReportError> {
    let document = build_json_uml(report, pretty)?;
    let rendered = renderer.render(&document).await?;
    info!(bytes = rendered.len(), "Rendered diagram");
    Ok(Diagram { document, rendered })
}
