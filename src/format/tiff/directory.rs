//! Directory tree reading.
//!
//! A [`TiffFile`] holds the top-level IFD chain of a file together with every
//! SubIFD chain hanging off it. Each directory keeps all of its tags, decoded,
//! so the same structure feeds the metadata dump, the chunk layout resolver
//! and the directory isolator.

use std::collections::{BTreeMap, HashSet};
use std::future::Future;
use std::pin::Pin;

use tracing::{debug, warn};

use crate::error::TiffError;
use crate::io::RangeReader;

use super::parser::{Ifd, TiffHeader, BIGTIFF_HEADER_SIZE};
use super::tags::TiffTag;
use super::values::{TagData, TagValue, ValueReader};

/// Upper bound on directories read from one file, SubIFDs included.
pub const MAX_DIRECTORIES: usize = 1000;

/// SubIFD chains nested deeper than this are not followed.
pub const MAX_SUBIFD_DEPTH: usize = 8;

// =============================================================================
// ImageDirectory
// =============================================================================

/// One Image File Directory with its decoded tags.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageDirectory {
    /// Index path: `[2]` is the third top-level directory, `[0, 1]` the
    /// second SubIFD of the first.
    pub path: Vec<usize>,

    /// File offset of the IFD
    pub offset: u64,

    /// Tags keyed by numeric ID, in tag order
    pub tags: BTreeMap<u16, TagData>,

    /// SubIFD chains, one per offset listed in the SubIFD tag
    pub sub_directories: Vec<Vec<ImageDirectory>>,
}

impl ImageDirectory {
    pub fn new(path: Vec<usize>, offset: u64) -> Self {
        Self {
            path,
            offset,
            tags: BTreeMap::new(),
            sub_directories: Vec::new(),
        }
    }

    /// Set a tag, replacing any previous value.
    pub fn insert(&mut self, tag: TiffTag, data: TagData) {
        self.tags.insert(tag.as_u16(), data);
    }

    pub fn get(&self, tag: TiffTag) -> Option<&TagData> {
        self.tags.get(&tag.as_u16())
    }

    pub fn has_tag(&self, tag: TiffTag) -> bool {
        self.tags.contains_key(&tag.as_u16())
    }

    /// First value of an integer tag.
    pub fn first_u64(&self, tag: TiffTag) -> Option<u64> {
        self.get(tag).and_then(|t| t.value.as_u64())
    }

    /// All values of an integer tag.
    pub fn u64_values(&self, tag: TiffTag) -> Option<Vec<u64>> {
        self.get(tag).and_then(|t| t.value.as_u64_vec())
    }

    fn dimension(&self, tag: TiffTag) -> u32 {
        self.first_u64(tag)
            .map(|v| u32::try_from(v).unwrap_or(u32::MAX))
            .unwrap_or(0)
    }

    /// Pixel width, 0 when `ImageWidth` is absent.
    pub fn width(&self) -> u32 {
        self.dimension(TiffTag::ImageWidth)
    }

    /// Pixel height, 0 when `ImageLength` is absent.
    pub fn height(&self) -> u32 {
        self.dimension(TiffTag::ImageLength)
    }

    /// Longer of width and height.
    pub fn max_dimension(&self) -> u32 {
        self.width().max(self.height())
    }

    /// Name used in dumps and logs, e.g. `Directory 0,1`.
    pub fn label(&self) -> String {
        let path: Vec<String> = self.path.iter().map(|i| i.to_string()).collect();
        format!("Directory {}", path.join(","))
    }

    /// ASCII value of a tag, if it has one.
    pub fn ascii(&self, tag: TiffTag) -> Option<&str> {
        match self.get(tag).map(|t| &t.value) {
            Some(TagValue::Ascii(s)) => Some(s.as_str()),
            _ => None,
        }
    }
}

// =============================================================================
// TiffFile
// =============================================================================

/// A parsed TIFF file: header plus the full directory tree.
#[derive(Debug, Clone)]
pub struct TiffFile {
    /// Source name, as reported by the reader
    pub identifier: String,

    /// Source size in bytes
    pub size: u64,

    pub header: TiffHeader,

    /// Top-level IFD chain
    pub directories: Vec<ImageDirectory>,
}

/// Bookkeeping shared across every chain of one file.
#[derive(Default)]
struct ReadState {
    visited: HashSet<u64>,
    count: usize,
}

type ChainFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Vec<ImageDirectory>, TiffError>> + Send + 'a>>;

impl TiffFile {
    /// Read the header and every directory reachable from it.
    pub async fn read<R: RangeReader + ?Sized>(reader: &R) -> Result<Self, TiffError> {
        let size = reader.size();
        let header_len = (BIGTIFF_HEADER_SIZE as u64).min(size) as usize;
        let header_bytes = reader.read_exact_at(0, header_len).await?;
        let header = TiffHeader::parse(&header_bytes, size)?;

        debug!(
            source = reader.identifier(),
            bigtiff = header.is_bigtiff,
            byte_order = ?header.byte_order,
            "Reading TIFF directories"
        );

        let mut state = ReadState::default();
        let directories = read_chain(
            reader,
            &header,
            header.first_ifd_offset,
            Vec::new(),
            0,
            0,
            &mut state,
        )
        .await?;

        debug!(
            source = reader.identifier(),
            directories = state.count,
            "Read TIFF directories"
        );

        Ok(Self {
            identifier: reader.identifier().to_string(),
            size,
            header,
            directories,
        })
    }

    /// All directories, depth-first in pre-order: each directory is
    /// followed by its SubIFDs before its next sibling.
    pub fn iter(&self) -> DirectoryIter<'_> {
        DirectoryIter {
            stack: vec![self.directories.iter()],
        }
    }

    /// `(width, height)` of every directory in pre-order.
    pub fn dimensions(&self) -> Vec<(u32, u32)> {
        self.iter().map(|d| (d.width(), d.height())).collect()
    }
}

/// Pre-order iterator over a directory tree.
pub struct DirectoryIter<'a> {
    stack: Vec<std::slice::Iter<'a, ImageDirectory>>,
}

impl<'a> Iterator for DirectoryIter<'a> {
    type Item = &'a ImageDirectory;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let top = self.stack.last_mut()?;
            match top.next() {
                Some(dir) => {
                    for chain in dir.sub_directories.iter().rev() {
                        self.stack.push(chain.iter());
                    }
                    return Some(dir);
                }
                None => {
                    self.stack.pop();
                }
            }
        }
    }
}

/// Read one IFD chain starting at `offset`.
///
/// Directories get `prefix + [start_index + n]` as their path.
fn read_chain<'a, R: RangeReader + ?Sized>(
    reader: &'a R,
    header: &'a TiffHeader,
    offset: u64,
    prefix: Vec<usize>,
    start_index: usize,
    depth: usize,
    state: &'a mut ReadState,
) -> ChainFuture<'a> {
    Box::pin(async move {
        let mut chain = Vec::new();
        let mut offset = offset;

        while offset != 0 {
            if !state.visited.insert(offset) {
                return Err(TiffError::DirectoryLoop(offset));
            }
            if state.count >= MAX_DIRECTORIES {
                return Err(TiffError::TooManyDirectories(MAX_DIRECTORIES));
            }
            state.count += 1;

            let ifd = read_ifd(reader, header, offset).await?;

            let mut path = prefix.clone();
            path.push(start_index + chain.len());
            let mut dir = ImageDirectory::new(path, offset);

            let values = ValueReader::new(reader, header);
            for entry in &ifd.entries {
                if entry.field_type.is_none() {
                    debug!(
                        tag = entry.tag_id,
                        field_type = entry.field_type_raw,
                        "Skipping entry with unknown field type"
                    );
                    continue;
                }
                match values.read_tag(entry).await {
                    Ok(data) => {
                        dir.tags.insert(entry.tag_id, data);
                    }
                    Err(e) => {
                        warn!(tag = entry.tag_id, offset, "Skipping unreadable tag: {}", e);
                    }
                }
            }

            if let Some(sub_offsets) = dir.u64_values(TiffTag::SubIfds) {
                if depth + 1 > MAX_SUBIFD_DEPTH {
                    warn!(
                        directory = %dir.label(),
                        depth,
                        "SubIFDs nested too deeply, not following"
                    );
                } else {
                    let mut next_index = 0;
                    for sub_offset in sub_offsets {
                        if sub_offset == 0 || sub_offset >= reader.size() {
                            warn!(directory = %dir.label(), sub_offset, "Ignoring invalid SubIFD offset");
                            continue;
                        }
                        let sub_chain = read_chain(
                            reader,
                            header,
                            sub_offset,
                            dir.path.clone(),
                            next_index,
                            depth + 1,
                            &mut *state,
                        )
                        .await?;
                        next_index += sub_chain.len();
                        dir.sub_directories.push(sub_chain);
                    }
                }
            }

            offset = ifd.next_ifd_offset;
            if offset >= reader.size() {
                warn!(next = offset, "Next IFD offset is past the end of the file");
                offset = 0;
            }
            chain.push(dir);
        }

        Ok(chain)
    })
}

/// Read a raw IFD: the entry count first, then the whole table.
async fn read_ifd<R: RangeReader + ?Sized>(
    reader: &R,
    header: &TiffHeader,
    offset: u64,
) -> Result<Ifd, TiffError> {
    let count_bytes = reader.read_exact_at(offset, header.ifd_count_size()).await?;
    let entry_count = if header.is_bigtiff {
        header.byte_order.read_u64(&count_bytes)
    } else {
        header.byte_order.read_u16(&count_bytes) as u64
    };

    let available = reader.size().saturating_sub(offset);
    let required = header.ifd_count_size() as u64
        + entry_count.saturating_mul(header.ifd_entry_size() as u64)
        + header.ifd_next_offset_size() as u64;
    if required > available {
        return Err(TiffError::TruncatedIfd {
            offset,
            required,
            actual: available,
        });
    }

    let ifd_size = Ifd::calculate_size(entry_count, header);
    let ifd_bytes = reader.read_exact_at(offset, ifd_size).await?;
    Ifd::parse(offset, &ifd_bytes, header)
}
