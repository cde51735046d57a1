//! Test utilities for integration tests.
//!
//! Builders for synthetic TIFF files (either byte order, classic or BigTIFF,
//! SubIFDs, chunks written in any order) and fakes for the external
//! collaborators.

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

use tiff_uml::error::ExternalError;
use tiff_uml::report::DiagramRenderer;
use tiff_uml::thumbnail::ImageOptimizer;

// =============================================================================
// Test Images
// =============================================================================

/// A solid RGB JPEG.
pub fn solid_jpeg(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb(color));
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, 90)
        .encode_image(&img)
        .unwrap();
    buf
}

/// A solid RGB PNG.
pub fn solid_png(width: u32, height: u32, color: [u8; 3]) -> Bytes {
    let img = RgbImage::from_pixel(width, height, Rgb(color));
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    Bytes::from(buf)
}

/// Decode a PNG into RGB pixels.
pub fn decode_png(data: &[u8]) -> RgbImage {
    image::load_from_memory_with_format(data, ImageFormat::Png)
        .unwrap()
        .to_rgb8()
}

// =============================================================================
// TIFF File Builders
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ByteOrderType {
    LittleEndian,
    BigEndian,
}

/// Field types used by the builders.
pub const BYTE: u16 = 1;
pub const ASCII: u16 = 2;
pub const SHORT: u16 = 3;
pub const LONG: u16 = 4;
pub const UNDEFINED: u16 = 7;
pub const LONG8: u16 = 16;

/// Builder for test TIFF files.
///
/// Layout: header, then all chunk data, then every IFD (SubIFDs before
/// their parent) each followed by its out-of-line values.
pub struct TiffBuilder {
    byte_order: ByteOrderType,
    is_bigtiff: bool,
    ifds: Vec<IfdBuilder>,
}

impl TiffBuilder {
    pub fn new() -> Self {
        Self {
            byte_order: ByteOrderType::LittleEndian,
            is_bigtiff: false,
            ifds: Vec::new(),
        }
    }

    pub fn with_byte_order(mut self, order: ByteOrderType) -> Self {
        self.byte_order = order;
        self
    }

    pub fn with_bigtiff(mut self, is_bigtiff: bool) -> Self {
        self.is_bigtiff = is_bigtiff;
        self
    }

    pub fn add_ifd(mut self, ifd: IfdBuilder) -> Self {
        self.ifds.push(ifd);
        self
    }

    /// Build the TIFF file data.
    pub fn build(self) -> Vec<u8> {
        let mut w = Writer {
            data: Vec::new(),
            byte_order: self.byte_order,
            is_bigtiff: self.is_bigtiff,
        };

        match self.byte_order {
            ByteOrderType::LittleEndian => w.data.extend_from_slice(b"II"),
            ByteOrderType::BigEndian => w.data.extend_from_slice(b"MM"),
        }
        let first_ifd_pos;
        if self.is_bigtiff {
            w.put(43, 2);
            w.put(8, 2);
            w.put(0, 2);
            first_ifd_pos = w.data.len();
            w.put(0, 8);
        } else {
            w.put(42, 2);
            first_ifd_pos = w.data.len();
            w.put(0, 4);
        }

        let mut ifds = self.ifds;
        for ifd in ifds.iter_mut() {
            ifd.write_chunks(&mut w);
        }

        let mut link_pos = first_ifd_pos;
        for ifd in &ifds {
            let (offset, next_pos) = ifd.write_ifd(&mut w);
            w.patch(link_pos, offset);
            link_pos = next_pos;
        }
        w.data
    }
}

impl Default for TiffBuilder {
    fn default() -> Self {
        Self::new()
    }
}

struct Writer {
    data: Vec<u8>,
    byte_order: ByteOrderType,
    is_bigtiff: bool,
}

impl Writer {
    fn put(&mut self, value: u64, size: usize) {
        write_value(&mut self.data, self.byte_order, value, size);
    }

    fn offset_size(&self) -> usize {
        if self.is_bigtiff {
            8
        } else {
            4
        }
    }

    fn patch(&mut self, pos: usize, value: u64) {
        let mut bytes = Vec::new();
        write_value(&mut bytes, self.byte_order, value, self.offset_size());
        self.data[pos..pos + bytes.len()].copy_from_slice(&bytes);
    }

    fn pad(&mut self) {
        if self.data.len() % 2 == 1 {
            self.data.push(0);
        }
    }
}

#[derive(Clone)]
enum EntryValue {
    Numbers(Vec<u64>),
    Raw(u32, Vec<u8>),
}

#[derive(Clone)]
struct EntrySpec {
    tag: u16,
    field_type: u16,
    value: EntryValue,
}

#[derive(Clone)]
struct ChunkSpec {
    offset_tag: u16,
    count_tag: u16,
    blobs: Vec<Option<Vec<u8>>>,
    write_order: Vec<usize>,
    offsets: Vec<u64>,
}

/// Builder for one IFD.
#[derive(Clone)]
pub struct IfdBuilder {
    entries: Vec<EntrySpec>,
    chunks: Option<ChunkSpec>,
    sub_ifds: Vec<IfdBuilder>,
}

impl IfdBuilder {
    pub fn new(width: u32, height: u32) -> Self {
        let mut builder = Self {
            entries: Vec::new(),
            chunks: None,
            sub_ifds: Vec::new(),
        };
        builder
            .add_entry(256, LONG, vec![width as u64])
            .add_entry(257, LONG, vec![height as u64]);
        builder
    }

    /// An IFD without dimension tags.
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
            chunks: None,
            sub_ifds: Vec::new(),
        }
    }

    /// A JPEG-compressed RGB IFD with one solid tile per color, row-major.
    pub fn tiled_jpeg(
        width: u32,
        height: u32,
        tile_width: u32,
        tile_height: u32,
        colors: &[[u8; 3]],
    ) -> Self {
        let tiles: Vec<Vec<u8>> = colors
            .iter()
            .map(|&c| solid_jpeg(tile_width, tile_height, c))
            .collect();
        let mut builder = Self::new(width, height);
        builder
            .add_entry(258, SHORT, vec![8, 8, 8])
            .add_entry(259, SHORT, vec![7])
            .add_entry(262, SHORT, vec![6])
            .add_entry(277, SHORT, vec![3])
            .add_entry(284, SHORT, vec![1])
            .with_tiles(tile_width, tile_height, tiles);
        builder
    }

    /// An uncompressed RGB IFD stored in strips of `rows`.
    pub fn rgb_strips(width: u32, height: u32, rows: u32, color: [u8; 3]) -> Self {
        let mut strips = Vec::new();
        let mut y = 0;
        while y < height {
            let n = rows.min(height - y);
            let pixels = (width * n) as usize;
            strips.push(color.iter().copied().cycle().take(pixels * 3).collect());
            y += n;
        }
        let mut builder = Self::new(width, height);
        builder
            .add_entry(258, SHORT, vec![8, 8, 8])
            .add_entry(259, SHORT, vec![1])
            .add_entry(262, SHORT, vec![2])
            .add_entry(277, SHORT, vec![3])
            .add_entry(278, LONG, vec![rows as u64])
            .add_entry(284, SHORT, vec![1])
            .with_strips(strips);
        builder
    }

    /// Add a numeric tag entry.
    pub fn add_entry(&mut self, tag: u16, field_type: u16, values: Vec<u64>) -> &mut Self {
        self.entries.retain(|e| e.tag != tag);
        self.entries.push(EntrySpec {
            tag,
            field_type,
            value: EntryValue::Numbers(values),
        });
        self
    }

    pub fn remove_entry(&mut self, tag: u16) -> &mut Self {
        self.entries.retain(|e| e.tag != tag);
        self
    }

    /// Add an ASCII tag entry.
    pub fn add_ascii(&mut self, tag: u16, text: &str) -> &mut Self {
        let mut bytes = text.as_bytes().to_vec();
        bytes.push(0);
        self.add_raw(tag, ASCII, bytes.len() as u32, bytes)
    }

    /// Add an entry from raw value bytes, already in file byte order.
    pub fn add_raw(&mut self, tag: u16, field_type: u16, count: u32, bytes: Vec<u8>) -> &mut Self {
        self.entries.retain(|e| e.tag != tag);
        self.entries.push(EntrySpec {
            tag,
            field_type,
            value: EntryValue::Raw(count, bytes),
        });
        self
    }

    pub fn with_tiles(&mut self, tile_width: u32, tile_height: u32, tiles: Vec<Vec<u8>>) -> &mut Self {
        self.add_entry(322, LONG, vec![tile_width as u64])
            .add_entry(323, LONG, vec![tile_height as u64]);
        self.set_chunks(324, 325, tiles.into_iter().map(Some).collect());
        self
    }

    pub fn with_strips(&mut self, strips: Vec<Vec<u8>>) -> &mut Self {
        self.set_chunks(273, 279, strips.into_iter().map(Some).collect());
        self
    }

    fn set_chunks(&mut self, offset_tag: u16, count_tag: u16, blobs: Vec<Option<Vec<u8>>>) {
        let write_order = (0..blobs.len()).collect();
        self.chunks = Some(ChunkSpec {
            offset_tag,
            count_tag,
            blobs,
            write_order,
            offsets: Vec::new(),
        });
    }

    /// Write chunks to disk in this order of chunk indices.
    pub fn with_write_order(&mut self, order: Vec<usize>) -> &mut Self {
        if let Some(chunks) = &mut self.chunks {
            chunks.write_order = order;
        }
        self
    }

    /// Leave chunk `index` without data (offset and byte count 0).
    pub fn with_missing_chunk(&mut self, index: usize) -> &mut Self {
        if let Some(chunks) = &mut self.chunks {
            chunks.blobs[index] = None;
        }
        self
    }

    pub fn add_sub_ifd(&mut self, ifd: IfdBuilder) -> &mut Self {
        self.sub_ifds.push(ifd);
        self
    }

    pub fn build_ifd(&mut self) -> Self {
        self.clone()
    }

    fn write_chunks(&mut self, w: &mut Writer) {
        if let Some(chunks) = &mut self.chunks {
            chunks.offsets = vec![0; chunks.blobs.len()];
            for &index in &chunks.write_order {
                if let Some(blob) = &chunks.blobs[index] {
                    w.pad();
                    chunks.offsets[index] = w.data.len() as u64;
                    w.data.extend_from_slice(blob);
                }
            }
        }
        for sub in self.sub_ifds.iter_mut() {
            sub.write_chunks(w);
        }
    }

    /// Write this IFD (SubIFDs first). Returns its offset and the position
    /// of its next-IFD field.
    fn write_ifd(&self, w: &mut Writer) -> (u64, usize) {
        let sub_offsets: Vec<u64> = self
            .sub_ifds
            .iter()
            .map(|sub| sub.write_ifd(w).0)
            .collect();

        let mut entries = self.entries.clone();
        let offset_type = if w.is_bigtiff { LONG8 } else { LONG };
        if let Some(chunks) = &self.chunks {
            let counts = chunks
                .blobs
                .iter()
                .map(|b| b.as_ref().map_or(0, |b| b.len() as u64))
                .collect();
            entries.push(EntrySpec {
                tag: chunks.offset_tag,
                field_type: offset_type,
                value: EntryValue::Numbers(chunks.offsets.clone()),
            });
            entries.push(EntrySpec {
                tag: chunks.count_tag,
                field_type: LONG,
                value: EntryValue::Numbers(counts),
            });
        }
        if !sub_offsets.is_empty() {
            entries.push(EntrySpec {
                tag: 330,
                field_type: offset_type,
                value: EntryValue::Numbers(sub_offsets),
            });
        }
        entries.sort_by_key(|e| e.tag);

        w.pad();
        let ifd_offset = w.data.len() as u64;
        let inline = w.offset_size();
        let (count_size, entry_size) = if w.is_bigtiff { (8, 20) } else { (2, 12) };
        let table_end = w.data.len() + count_size + entries.len() * entry_size + inline;
        let mut extra: Vec<u8> = Vec::new();

        w.put(entries.len() as u64, count_size);
        for entry in &entries {
            let (count, bytes) = match &entry.value {
                EntryValue::Numbers(values) => {
                    let size = field_type_size(entry.field_type);
                    let mut bytes = Vec::new();
                    for &v in values {
                        write_value(&mut bytes, w.byte_order, v, size);
                    }
                    (values.len() as u64, bytes)
                }
                EntryValue::Raw(count, bytes) => (*count as u64, bytes.clone()),
            };

            w.put(entry.tag as u64, 2);
            w.put(entry.field_type as u64, 2);
            w.put(count, if w.is_bigtiff { 8 } else { 4 });
            if bytes.len() <= inline {
                let mut field = bytes;
                field.resize(inline, 0);
                w.data.extend_from_slice(&field);
            } else {
                if extra.len() % 2 == 1 {
                    extra.push(0);
                }
                let at = (table_end + extra.len()) as u64;
                w.put(at, inline);
                extra.extend_from_slice(&bytes);
            }
        }
        let next_pos = w.data.len();
        w.put(0, inline);
        w.data.extend_from_slice(&extra);

        (ifd_offset, next_pos)
    }
}

fn field_type_size(field_type: u16) -> usize {
    match field_type {
        1 | 2 | 6 | 7 => 1,
        3 | 8 => 2,
        4 | 9 | 11 | 13 => 4,
        5 | 10 | 12 | 16 | 17 | 18 => 8,
        _ => 1,
    }
}

fn write_value(data: &mut Vec<u8>, byte_order: ByteOrderType, value: u64, size: usize) {
    match byte_order {
        ByteOrderType::LittleEndian => match size {
            1 => data.push(value as u8),
            2 => data.extend(&(value as u16).to_le_bytes()),
            4 => data.extend(&(value as u32).to_le_bytes()),
            8 => data.extend(&value.to_le_bytes()),
            _ => {}
        },
        ByteOrderType::BigEndian => match size {
            1 => data.push(value as u8),
            2 => data.extend(&(value as u16).to_be_bytes()),
            4 => data.extend(&(value as u32).to_be_bytes()),
            8 => data.extend(&value.to_be_bytes()),
            _ => {}
        },
    }
}

// =============================================================================
// Fake Collaborators
// =============================================================================

/// Records every document it is asked to render and returns a fixed SVG.
#[derive(Default, Clone)]
pub struct RecordingRenderer {
    pub documents: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl DiagramRenderer for RecordingRenderer {
    async fn render(&self, document: &str) -> Result<Vec<u8>, ExternalError> {
        self.documents.lock().unwrap().push(document.to_string());
        Ok(b"<svg/>".to_vec())
    }
}

/// Always fails, like a renderer that is not installed.
pub struct MissingRenderer;

#[async_trait]
impl DiagramRenderer for MissingRenderer {
    async fn render(&self, _document: &str) -> Result<Vec<u8>, ExternalError> {
        Err(ExternalError::Spawn {
            program: "plantuml".to_string(),
            message: "not found".to_string(),
        })
    }
}

/// Counts calls; fails every one of them.
#[derive(Default, Clone)]
pub struct FailingOptimizer {
    pub calls: Arc<AtomicUsize>,
}

#[async_trait]
impl ImageOptimizer for FailingOptimizer {
    async fn optimize(&self, _png: Bytes) -> Result<Bytes, ExternalError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(ExternalError::Timeout {
            program: "optipng".to_string(),
            seconds: 1,
        })
    }
}

/// Check for the TIFF magic bytes.
pub fn is_tiff_magic(data: &[u8]) -> bool {
    data.len() >= 4
        && ((data[0..2] == *b"II" && data[2] == 42 && data[3] == 0)
            || (data[0..2] == *b"MM" && data[2] == 0 && data[3] == 42))
}
