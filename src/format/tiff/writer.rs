//! Single-directory TIFF isolation.
//!
//! Thumbnail decoders work on standalone TIFF files. [`isolate_directory`]
//! copies one directory and its chunk data out of the source into a new
//! in-memory TIFF:
//!
//! ```text
//! header | chunk data ... | IFD | out-of-line tag values
//! ```
//!
//! The output keeps the source byte order so tag values can be copied as
//! raw bytes. It is a BigTIFF when the source is, or when the copied data
//! would not be addressable with 32-bit offsets.
//!
//! [`isolate_chunks`] copies only the chunks a predicate keeps; the rest are
//! written with offset and byte count 0.

use std::collections::BTreeMap;

use bytes::Bytes;
use tracing::debug;

use crate::error::TiffError;
use crate::io::RangeReader;

use super::directory::ImageDirectory;
use super::parser::{Ifd, TiffHeader, VERSION_BIGTIFF, VERSION_TIFF};
use super::tags::{FieldType, TiffTag};
use super::values::TagData;

/// A directory rewritten as a standalone TIFF.
#[derive(Debug, Clone)]
pub struct IsolatedImage {
    /// The complete TIFF file
    pub data: Bytes,

    /// Header of the new file
    pub header: TiffHeader,

    /// The directory as written, with chunk offsets relative to `data`
    pub directory: ImageDirectory,
}

/// Which offset/byte-count tag pair holds a directory's chunks.
fn chunk_tags(dir: &ImageDirectory) -> (TiffTag, TiffTag) {
    if dir.has_tag(TiffTag::TileWidth)
        && dir.has_tag(TiffTag::TileLength)
        && dir.has_tag(TiffTag::TileOffsets)
    {
        (TiffTag::TileOffsets, TiffTag::TileByteCounts)
    } else {
        (TiffTag::StripOffsets, TiffTag::StripByteCounts)
    }
}

/// Copy one directory and its chunk data into a standalone TIFF.
///
/// Tags that point elsewhere in the source (SubIFDs, EXIF, vendor offset
/// tables) are dropped; chunk offsets are rewritten. Chunks with a zero
/// offset or zero length keep offset 0.
///
/// # Errors
/// - `MissingTag` when the directory has no chunk offsets or byte counts
/// - `InvalidTagValue` when the two tables differ in length
/// - `Io` when a chunk lies outside the source
pub async fn isolate_directory<R: RangeReader + ?Sized>(
    reader: &R,
    source: &TiffHeader,
    dir: &ImageDirectory,
) -> Result<IsolatedImage, TiffError> {
    isolate_chunks(reader, source, dir, |_| true).await
}

/// Like [`isolate_directory`], copying only the chunks whose index `keep`
/// accepts.
pub async fn isolate_chunks<R, F>(
    reader: &R,
    source: &TiffHeader,
    dir: &ImageDirectory,
    keep: F,
) -> Result<IsolatedImage, TiffError>
where
    R: RangeReader + ?Sized,
    F: Fn(usize) -> bool,
{
    let (offset_tag, count_tag) = chunk_tags(dir);
    let offsets = dir
        .u64_values(offset_tag)
        .ok_or(TiffError::MissingTag(offset_tag.name()))?;
    let counts = dir
        .u64_values(count_tag)
        .ok_or(TiffError::MissingTag(count_tag.name()))?;
    if offsets.len() != counts.len() {
        return Err(TiffError::InvalidTagValue {
            tag: count_tag.name(),
            message: format!(
                "{} offsets but {} byte counts",
                offsets.len(),
                counts.len()
            ),
        });
    }

    let present = |i: usize, o: u64, c: u64| o != 0 && c != 0 && keep(i);
    let chunk_total: u64 = offsets
        .iter()
        .zip(&counts)
        .enumerate()
        .filter(|&(i, (&o, &c))| present(i, o, c))
        .map(|(_, (_, &c))| c)
        .sum();
    let tag_total: u64 = dir.tags.values().map(|t| t.raw.len() as u64 + 20).sum();
    let estimate = chunk_total + tag_total + offsets.len() as u64 * 8 + 64;

    let header = TiffHeader {
        byte_order: source.byte_order,
        is_bigtiff: source.is_bigtiff || estimate > u32::MAX as u64,
        first_ifd_offset: 0,
    };
    let order = header.byte_order;

    let mut buf = vec![0u8; header.header_size()];
    let mut new_offsets = Vec::with_capacity(offsets.len());
    let mut new_counts = Vec::with_capacity(counts.len());
    for (i, (&offset, &count)) in offsets.iter().zip(&counts).enumerate() {
        if !present(i, offset, count) {
            new_offsets.push(0);
            new_counts.push(if offset == 0 { count } else { 0 });
            continue;
        }
        let len = usize::try_from(count).map_err(|_| TiffError::InvalidTagValue {
            tag: count_tag.name(),
            message: format!("chunk of {} bytes is too large", count),
        })?;
        let chunk = reader.read_exact_at(offset, len).await?;
        new_offsets.push(buf.len() as u64);
        new_counts.push(count);
        buf.extend_from_slice(&chunk);
    }
    let copied = new_offsets.iter().filter(|&&o| o != 0).count();
    if buf.len() % 2 == 1 {
        buf.push(0);
    }

    let mut tags: BTreeMap<u16, TagData> = dir
        .tags
        .iter()
        .filter(|&(&id, _)| keep_tag(id, offset_tag, count_tag))
        .map(|(&id, data)| (id, data.clone()))
        .collect();
    let offset_type = if header.is_bigtiff {
        FieldType::Long8
    } else {
        FieldType::Long
    };
    if new_counts != counts {
        tags.insert(
            count_tag.as_u16(),
            TagData::unsigned(offset_type, new_counts, order),
        );
    }
    tags.insert(
        offset_tag.as_u16(),
        TagData::unsigned(offset_type, new_offsets, order),
    );

    let ifd_offset = buf.len() as u64;
    write_ifd(&mut buf, &header, &tags, ifd_offset);

    let header = TiffHeader {
        first_ifd_offset: ifd_offset,
        ..header
    };
    let head = encode_header(&header);
    buf[..head.len()].copy_from_slice(&head);

    debug!(
        directory = %dir.label(),
        chunks = offsets.len(),
        copied,
        bytes = buf.len(),
        bigtiff = header.is_bigtiff,
        "Isolated directory"
    );

    let mut directory = ImageDirectory::new(dir.path.clone(), ifd_offset);
    directory.tags = tags;

    Ok(IsolatedImage {
        data: Bytes::from(buf),
        header,
        directory,
    })
}

/// Whether a source tag is carried into the isolated file.
fn keep_tag(id: u16, offset_tag: TiffTag, count_tag: TiffTag) -> bool {
    match TiffTag::from_u16(id) {
        Some(tag) if tag == offset_tag || tag == count_tag => true,
        Some(tag) if tag.is_offset_pointer() => false,
        // The chunk pair not in use
        Some(TiffTag::StripByteCounts | TiffTag::TileByteCounts) => false,
        _ => true,
    }
}

fn encode_header(header: &TiffHeader) -> Vec<u8> {
    let order = header.byte_order;
    let mut out = Vec::with_capacity(header.header_size());
    out.extend_from_slice(&order.magic());
    if header.is_bigtiff {
        order.put_u16(&mut out, VERSION_BIGTIFF);
        order.put_u16(&mut out, 8);
        order.put_u16(&mut out, 0);
        order.put_u64(&mut out, header.first_ifd_offset);
    } else {
        order.put_u16(&mut out, VERSION_TIFF);
        order.put_u32(&mut out, header.first_ifd_offset as u32);
    }
    out
}

/// Append an IFD at `ifd_offset` (== `buf.len()`) followed by the values
/// that do not fit inline.
fn write_ifd(
    buf: &mut Vec<u8>,
    header: &TiffHeader,
    tags: &BTreeMap<u16, TagData>,
    ifd_offset: u64,
) {
    let order = header.byte_order;
    let field_size = header.value_offset_size();
    let values_base = ifd_offset + Ifd::calculate_size(tags.len() as u64, header) as u64;
    let mut values: Vec<u8> = Vec::new();

    put_offset(buf, header, tags.len() as u64, header.ifd_count_size());
    for (&id, data) in tags {
        order.put_u16(buf, id);
        order.put_u16(buf, data.field_type.as_u16());
        put_offset(buf, header, data.count, field_size);

        if data.raw.len() <= field_size {
            buf.extend_from_slice(&data.raw);
            buf.resize(buf.len() + field_size - data.raw.len(), 0);
        } else {
            put_offset(buf, header, values_base + values.len() as u64, field_size);
            values.extend_from_slice(&data.raw);
            if values.len() % 2 == 1 {
                values.push(0);
            }
        }
    }
    put_offset(buf, header, 0, header.ifd_next_offset_size());
    buf.extend_from_slice(&values);
}

/// Append `value` as a 2, 4 or 8 byte field.
fn put_offset(buf: &mut Vec<u8>, header: &TiffHeader, value: u64, width: usize) {
    let order = header.byte_order;
    match width {
        2 => order.put_u16(buf, value as u16),
        4 => order.put_u32(buf, value as u32),
        _ => order.put_u64(buf, value),
    }
}
