//! Metadata dumps.
//!
//! The dump is the YAML text the report is built on. [`NativeDumper`] writes
//! it from the parsed directory tree; [`TifftoolsDumper`] asks
//! `tifftools dump --yaml` for it. Both produce the same shape: one
//! top-level key (the source path) holding the header and the `ifds` tree,
//! with every directory listing its tags by name.

use std::fmt::Write as _;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::ReportError;
use crate::external::run_process;
use crate::format::tiff::{
    tag_name, value_name, ByteOrder, ImageDirectory, TagData, TagValue, TiffFile, TiffTag,
};

/// Default number of array items shown before truncating.
pub const DEFAULT_MAX_ITEMS: usize = 6;

/// Default number of text characters shown before truncating.
pub const DEFAULT_MAX_TEXT: usize = 40;

/// Produces the YAML metadata dump of a TIFF file.
#[async_trait]
pub trait MetadataDumper: Send + Sync {
    /// Dump `file`, which was read from `source`.
    async fn dump(&self, source: &Path, file: &TiffFile) -> Result<String, ReportError>;
}

// =============================================================================
// Native dumper
// =============================================================================

/// Writes the dump from the already parsed directory tree.
#[derive(Debug, Clone, Copy)]
pub struct NativeDumper {
    pub max_items: usize,
    pub max_text: usize,
}

impl Default for NativeDumper {
    fn default() -> Self {
        Self {
            max_items: DEFAULT_MAX_ITEMS,
            max_text: DEFAULT_MAX_TEXT,
        }
    }
}

#[async_trait]
impl MetadataDumper for NativeDumper {
    async fn dump(&self, source: &Path, file: &TiffFile) -> Result<String, ReportError> {
        Ok(self.render(&source.display().to_string(), file))
    }
}

fn quote(text: &str) -> String {
    // A JSON string is a valid double-quoted YAML scalar
    serde_json::to_string(text).unwrap_or_else(|_| format!("\"{}\"", text.escape_default()))
}

fn header_line(file: &TiffFile) -> String {
    let (magic, order) = match file.header.byte_order {
        ByteOrder::LittleEndian => (0x4949, "little-endian"),
        ByteOrder::BigEndian => (0x4D4D, "big-endian"),
    };
    let variant = if file.header.is_bigtiff {
        "BigTIFF"
    } else {
        "ClassicTIFF"
    };
    format!("0x{:04X} <{}> <{}>", magic, order, variant)
}

impl NativeDumper {
    pub fn new(max_items: usize, max_text: usize) -> Self {
        Self {
            max_items: max_items.max(1),
            max_text: max_text.max(1),
        }
    }

    /// The dump text for `file`, keyed by `source`.
    pub fn render(&self, source: &str, file: &TiffFile) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}:", quote(source));
        let _ = writeln!(out, "  header: {}", quote(&header_line(file)));
        let _ = writeln!(out, "  size: {}", file.size);
        if file.directories.is_empty() {
            out.push_str("  ifds: {}\n");
            return out;
        }
        out.push_str("  ifds:\n");
        for dir in &file.directories {
            self.write_directory(&mut out, dir, 4);
        }
        out
    }

    fn write_directory(&self, out: &mut String, dir: &ImageDirectory, indent: usize) {
        let pad = " ".repeat(indent);
        let _ = writeln!(out, "{}{}:", pad, dir.label());
        let _ = writeln!(out, "{}  offset: {}", pad, dir.offset);

        for (&id, data) in &dir.tags {
            let key = tag_name(id)
                .map(str::to_string)
                .unwrap_or_else(|| id.to_string());

            if id == TiffTag::SubIfds.as_u16() && !dir.sub_directories.is_empty() {
                let _ = writeln!(out, "{}  {}:", pad, key);
                for (index, chain) in dir.sub_directories.iter().enumerate() {
                    let _ = writeln!(out, "{}    SubIFD {}:", pad, index);
                    for sub in chain {
                        self.write_directory(out, sub, indent + 6);
                    }
                }
                continue;
            }

            let _ = writeln!(out, "{}  {}: {}", pad, key, self.format_value(id, data));
        }
    }

    /// One tag value as a YAML scalar or flow sequence.
    pub fn format_value(&self, id: u16, data: &TagData) -> String {
        if let (Some(tag), Some(value)) = (TiffTag::from_u16(id), data.value.as_u64()) {
            if data.value.len() == 1 {
                if let Some(name) = value_name(tag, value) {
                    return quote(&format!("{} ({})", value, name));
                }
            }
        }

        match &data.value {
            TagValue::Ascii(text) => {
                let shown: String = text.chars().take(self.max_text).collect();
                if shown.len() < text.len() {
                    quote(&format!("{}...", shown))
                } else {
                    quote(text)
                }
            }
            TagValue::Bytes(bytes) if bytes.len() > self.max_items => {
                quote(&format!("<{} bytes>", bytes.len()))
            }
            TagValue::Bytes(bytes) => self.sequence(bytes.iter().map(u8::to_string), bytes.len()),
            TagValue::Unsigned(values) => {
                self.sequence(values.iter().map(u64::to_string), values.len())
            }
            TagValue::Signed(values) => {
                self.sequence(values.iter().map(i64::to_string), values.len())
            }
            TagValue::Rational(values) => self.sequence(
                values.iter().map(|(n, d)| quote(&format!("{}/{}", n, d))),
                values.len(),
            ),
            TagValue::SignedRational(values) => self.sequence(
                values.iter().map(|(n, d)| quote(&format!("{}/{}", n, d))),
                values.len(),
            ),
            TagValue::Float(values) => {
                self.sequence(values.iter().map(|&v| float(v)), values.len())
            }
        }
    }

    /// Single items stand alone; longer lists are truncated to `max_items`.
    fn sequence(&self, items: impl Iterator<Item = String>, len: usize) -> String {
        let mut items: Vec<String> = items.take(self.max_items).collect();
        if len == 1 {
            return items.pop().unwrap_or_default();
        }
        if len > self.max_items {
            items.push(quote(&format!("... {} values", len)));
        }
        format!("[{}]", items.join(", "))
    }
}

fn float(value: f64) -> String {
    if value.is_finite() {
        let text = value.to_string();
        if text.contains('.') || text.contains('e') {
            text
        } else {
            format!("{}.0", text)
        }
    } else {
        quote(&value.to_string())
    }
}

// =============================================================================
// tifftools dumper
// =============================================================================

/// Default arguments passed to `tifftools dump --yaml`.
pub fn default_tifftools_args() -> Vec<String> {
    ["--max", "6", "--max-text", "40"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Runs `tifftools dump --yaml <args> <source>`.
#[derive(Debug, Clone)]
pub struct TifftoolsDumper {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl TifftoolsDumper {
    /// Empty `args` selects [`default_tifftools_args`].
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        let args = if args.is_empty() {
            default_tifftools_args()
        } else {
            args
        };
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    /// The full argument list for `source`.
    pub fn command_args(&self, source: &Path) -> Vec<String> {
        let mut args = vec!["dump".to_string(), "--yaml".to_string()];
        args.extend(self.args.iter().cloned());
        args.push(source.display().to_string());
        args
    }
}

#[async_trait]
impl MetadataDumper for TifftoolsDumper {
    async fn dump(&self, source: &Path, _file: &TiffFile) -> Result<String, ReportError> {
        let output = run_process(&self.program, &self.command_args(source), None, self.timeout)
            .await?;
        String::from_utf8(output).map_err(|e| ReportError::Yaml(e.to_string()))
    }
}
