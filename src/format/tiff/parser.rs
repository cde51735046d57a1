//! TIFF header and raw IFD parsing.
//!
//! This module handles the fixed-layout parts of a TIFF file: the header
//! and the entry table of each Image File Directory. Tag values that do not
//! fit inline are resolved later by [`super::values::ValueReader`].
//!
//! # TIFF Header Structure
//!
//! ## Classic TIFF (8 bytes)
//! ```text
//! Bytes 0-1: Byte order (0x4949 = little-endian "II", 0x4D4D = big-endian "MM")
//! Bytes 2-3: Version (42 = 0x002A)
//! Bytes 4-7: Offset to first IFD (4 bytes)
//! ```
//!
//! ## BigTIFF (16 bytes)
//! ```text
//! Bytes 0-1: Byte order
//! Bytes 2-3: Version (43 = 0x002B)
//! Bytes 4-5: Offset byte size (must be 8)
//! Bytes 6-7: Reserved (must be 0)
//! Bytes 8-15: Offset to first IFD (8 bytes)
//! ```
//!
//! # IFD Structure
//! ```text
//! entry count      (2 bytes classic, 8 bytes BigTIFF)
//! entries          (12 bytes classic, 20 bytes BigTIFF each)
//!   tag            (2)
//!   field type     (2)
//!   count          (4 / 8)
//!   value or offset(4 / 8)
//! next IFD offset  (4 / 8)
//! ```

use crate::error::TiffError;
use crate::io::{read_u16_be, read_u16_le, read_u32_be, read_u32_le, read_u64_be, read_u64_le};

use super::tags::{FieldType, TiffTag};

// =============================================================================
// Constants
// =============================================================================

/// Magic bytes indicating little-endian byte order ("II" for Intel)
const BYTE_ORDER_LITTLE_ENDIAN: u16 = 0x4949;

/// Magic bytes indicating big-endian byte order ("MM" for Motorola)
const BYTE_ORDER_BIG_ENDIAN: u16 = 0x4D4D;

/// Version number for classic TIFF
pub const VERSION_TIFF: u16 = 42;

/// Version number for BigTIFF
pub const VERSION_BIGTIFF: u16 = 43;

/// Size of classic TIFF header in bytes
pub const TIFF_HEADER_SIZE: usize = 8;

/// Size of BigTIFF header in bytes
pub const BIGTIFF_HEADER_SIZE: usize = 16;

// =============================================================================
// ByteOrder
// =============================================================================

/// Byte order (endianness) of a TIFF file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    /// Little-endian ("II" = Intel)
    LittleEndian,
    /// Big-endian ("MM" = Motorola)
    BigEndian,
}

impl ByteOrder {
    /// Read a u16 from a byte slice using this byte order.
    #[inline]
    pub fn read_u16(self, bytes: &[u8]) -> u16 {
        match self {
            ByteOrder::LittleEndian => read_u16_le(bytes),
            ByteOrder::BigEndian => read_u16_be(bytes),
        }
    }

    /// Read a u32 from a byte slice using this byte order.
    #[inline]
    pub fn read_u32(self, bytes: &[u8]) -> u32 {
        match self {
            ByteOrder::LittleEndian => read_u32_le(bytes),
            ByteOrder::BigEndian => read_u32_be(bytes),
        }
    }

    /// Read a u64 from a byte slice using this byte order.
    #[inline]
    pub fn read_u64(self, bytes: &[u8]) -> u64 {
        match self {
            ByteOrder::LittleEndian => read_u64_le(bytes),
            ByteOrder::BigEndian => read_u64_be(bytes),
        }
    }

    /// Append a u16 in this byte order.
    #[inline]
    pub fn put_u16(self, buf: &mut Vec<u8>, value: u16) {
        match self {
            ByteOrder::LittleEndian => buf.extend_from_slice(&value.to_le_bytes()),
            ByteOrder::BigEndian => buf.extend_from_slice(&value.to_be_bytes()),
        }
    }

    /// Append a u32 in this byte order.
    #[inline]
    pub fn put_u32(self, buf: &mut Vec<u8>, value: u32) {
        match self {
            ByteOrder::LittleEndian => buf.extend_from_slice(&value.to_le_bytes()),
            ByteOrder::BigEndian => buf.extend_from_slice(&value.to_be_bytes()),
        }
    }

    /// Append a u64 in this byte order.
    #[inline]
    pub fn put_u64(self, buf: &mut Vec<u8>, value: u64) {
        match self {
            ByteOrder::LittleEndian => buf.extend_from_slice(&value.to_le_bytes()),
            ByteOrder::BigEndian => buf.extend_from_slice(&value.to_be_bytes()),
        }
    }

    /// The two magic bytes that declare this byte order.
    pub const fn magic(self) -> [u8; 2] {
        match self {
            ByteOrder::LittleEndian => [b'I', b'I'],
            ByteOrder::BigEndian => [b'M', b'M'],
        }
    }
}

// =============================================================================
// TiffHeader
// =============================================================================

/// Parsed TIFF file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TiffHeader {
    /// Byte order for all multi-byte values in the file
    pub byte_order: ByteOrder,

    /// Whether this is a BigTIFF file (64-bit offsets)
    pub is_bigtiff: bool,

    /// Offset to the first IFD in the file
    pub first_ifd_offset: u64,
}

impl TiffHeader {
    /// Parse a TIFF header from raw bytes.
    ///
    /// `bytes` should hold 16 bytes when available so BigTIFF can be read;
    /// `file_size` bounds the first IFD offset.
    ///
    /// # Errors
    /// - `InvalidMagic` if byte order bytes are not II or MM
    /// - `InvalidVersion` if version is not 42 or 43
    /// - `InvalidBigTiffOffsetSize` if BigTIFF offset size is not 8
    /// - `FileTooSmall` if there aren't enough bytes for the header
    /// - `InvalidIfdOffset` if the first IFD offset is outside the file
    pub fn parse(bytes: &[u8], file_size: u64) -> Result<Self, TiffError> {
        if bytes.len() < TIFF_HEADER_SIZE {
            return Err(TiffError::FileTooSmall {
                required: TIFF_HEADER_SIZE as u64,
                actual: bytes.len() as u64,
            });
        }

        // Checked as raw bytes: the order is what we are trying to learn
        let magic = u16::from_le_bytes([bytes[0], bytes[1]]);
        let byte_order = match magic {
            BYTE_ORDER_LITTLE_ENDIAN => ByteOrder::LittleEndian,
            BYTE_ORDER_BIG_ENDIAN => ByteOrder::BigEndian,
            _ => return Err(TiffError::InvalidMagic(magic)),
        };

        let version = byte_order.read_u16(&bytes[2..4]);
        let (is_bigtiff, first_ifd_offset) = match version {
            VERSION_TIFF => (false, byte_order.read_u32(&bytes[4..8]) as u64),
            VERSION_BIGTIFF => {
                if bytes.len() < BIGTIFF_HEADER_SIZE {
                    return Err(TiffError::FileTooSmall {
                        required: BIGTIFF_HEADER_SIZE as u64,
                        actual: bytes.len() as u64,
                    });
                }
                let offset_size = byte_order.read_u16(&bytes[4..6]);
                if offset_size != 8 {
                    return Err(TiffError::InvalidBigTiffOffsetSize(offset_size));
                }
                (true, byte_order.read_u64(&bytes[8..16]))
            }
            _ => return Err(TiffError::InvalidVersion(version)),
        };

        if first_ifd_offset >= file_size {
            return Err(TiffError::InvalidIfdOffset(first_ifd_offset));
        }

        Ok(TiffHeader {
            byte_order,
            is_bigtiff,
            first_ifd_offset,
        })
    }

    /// Size of the header itself.
    #[inline]
    pub const fn header_size(&self) -> usize {
        if self.is_bigtiff {
            BIGTIFF_HEADER_SIZE
        } else {
            TIFF_HEADER_SIZE
        }
    }

    /// Size of an IFD entry in bytes (12 classic, 20 BigTIFF).
    #[inline]
    pub const fn ifd_entry_size(&self) -> usize {
        if self.is_bigtiff {
            20
        } else {
            12
        }
    }

    /// Size of the entry count field at the start of an IFD.
    #[inline]
    pub const fn ifd_count_size(&self) -> usize {
        if self.is_bigtiff {
            8
        } else {
            2
        }
    }

    /// Size of the next IFD offset field at the end of an IFD.
    #[inline]
    pub const fn ifd_next_offset_size(&self) -> usize {
        if self.is_bigtiff {
            8
        } else {
            4
        }
    }

    /// Size of the value/offset field in an IFD entry.
    #[inline]
    pub const fn value_offset_size(&self) -> usize {
        if self.is_bigtiff {
            8
        } else {
            4
        }
    }

    /// Read an offset-sized value (u32 classic, u64 BigTIFF).
    #[inline]
    pub fn read_offset(&self, bytes: &[u8]) -> u64 {
        if self.is_bigtiff {
            self.byte_order.read_u64(bytes)
        } else {
            self.byte_order.read_u32(bytes) as u64
        }
    }
}

// =============================================================================
// IfdEntry
// =============================================================================

/// One raw entry of an IFD's entry table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IfdEntry {
    /// Numeric tag ID
    pub tag_id: u16,

    /// Decoded field type, `None` when the type is not one we know
    pub field_type: Option<FieldType>,

    /// Field type exactly as stored
    pub field_type_raw: u16,

    /// Number of values
    pub count: u64,

    /// The value/offset field (4 or 8 bytes, file byte order)
    pub value_offset_bytes: Vec<u8>,

    /// Whether the value is stored in `value_offset_bytes` itself
    pub is_inline: bool,
}

impl IfdEntry {
    /// Parse one entry from exactly `header.ifd_entry_size()` bytes.
    pub fn parse(bytes: &[u8], header: &TiffHeader) -> Self {
        let order = header.byte_order;
        let tag_id = order.read_u16(&bytes[0..2]);
        let field_type_raw = order.read_u16(&bytes[2..4]);
        let field_type = FieldType::from_u16(field_type_raw);

        let (count, value_start) = if header.is_bigtiff {
            (order.read_u64(&bytes[4..12]), 12)
        } else {
            (order.read_u32(&bytes[4..8]) as u64, 8)
        };
        let value_offset_bytes =
            bytes[value_start..value_start + header.value_offset_size()].to_vec();

        let is_inline = field_type
            .map(|ft| ft.fits_inline(count, header.is_bigtiff))
            .unwrap_or(false);

        Self {
            tag_id,
            field_type,
            field_type_raw,
            count,
            value_offset_bytes,
            is_inline,
        }
    }

    /// Known tag for this entry, if any.
    pub fn tag(&self) -> Option<TiffTag> {
        TiffTag::from_u16(self.tag_id)
    }

    /// Total size of the value in bytes, `None` for unknown field types
    /// or sizes that overflow.
    pub fn value_byte_size(&self) -> Option<u64> {
        let field_type = self.field_type?;
        (field_type.size_in_bytes() as u64).checked_mul(self.count)
    }

    /// The value/offset field read as an offset.
    pub fn value_offset(&self, byte_order: ByteOrder) -> u64 {
        if self.value_offset_bytes.len() >= 8 {
            byte_order.read_u64(&self.value_offset_bytes)
        } else {
            byte_order.read_u32(&self.value_offset_bytes) as u64
        }
    }
}

// =============================================================================
// Ifd
// =============================================================================

/// A raw Image File Directory: its entry table and chain link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ifd {
    /// File offset the IFD was read from
    pub offset: u64,

    /// Entries in file order
    pub entries: Vec<IfdEntry>,

    /// Offset of the next IFD in the chain, 0 at the end
    pub next_ifd_offset: u64,
}

impl Ifd {
    /// Total byte size of an IFD with `entry_count` entries.
    pub fn calculate_size(entry_count: u64, header: &TiffHeader) -> usize {
        header.ifd_count_size()
            + entry_count as usize * header.ifd_entry_size()
            + header.ifd_next_offset_size()
    }

    /// Parse an IFD from bytes starting at its entry count.
    ///
    /// # Errors
    /// `TruncatedIfd` when `bytes` is shorter than the declared entry table.
    pub fn parse(offset: u64, bytes: &[u8], header: &TiffHeader) -> Result<Self, TiffError> {
        let count_size = header.ifd_count_size();
        if bytes.len() < count_size {
            return Err(TiffError::TruncatedIfd {
                offset,
                required: count_size as u64,
                actual: bytes.len() as u64,
            });
        }

        let entry_count = if header.is_bigtiff {
            header.byte_order.read_u64(&bytes[..8])
        } else {
            header.byte_order.read_u16(&bytes[..2]) as u64
        };

        let required = header.ifd_count_size() as u64
            + entry_count.saturating_mul(header.ifd_entry_size() as u64)
            + header.ifd_next_offset_size() as u64;
        if (bytes.len() as u64) < required {
            return Err(TiffError::TruncatedIfd {
                offset,
                required,
                actual: bytes.len() as u64,
            });
        }

        let entry_size = header.ifd_entry_size();
        let entries = bytes[count_size..count_size + entry_count as usize * entry_size]
            .chunks_exact(entry_size)
            .map(|raw| IfdEntry::parse(raw, header))
            .collect();

        let next_start = count_size + entry_count as usize * entry_size;
        let next_ifd_offset = header.read_offset(&bytes[next_start..]);

        Ok(Self {
            offset,
            entries,
            next_ifd_offset,
        })
    }

    /// Find the entry for a known tag.
    pub fn get_entry_by_tag(&self, tag: TiffTag) -> Option<&IfdEntry> {
        self.get_entry(tag.as_u16())
    }

    /// Find the entry for a numeric tag ID.
    pub fn get_entry(&self, tag_id: u16) -> Option<&IfdEntry> {
        self.entries.iter().find(|e| e.tag_id == tag_id)
    }
}

// =============================================================================
// Tests
// =============================================================================
