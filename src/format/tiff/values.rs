//! TIFF tag value reading and decoding.
//!
//! Values are either stored inline in the IFD entry or at an offset in the
//! file. [`ValueReader`] resolves both cases to raw bytes in a single range
//! read per entry, and [`decode_value`] turns those bytes into a typed
//! [`TagValue`] respecting the file's byte order.

use bytes::Bytes;

use crate::error::TiffError;
use crate::io::RangeReader;

use super::parser::{ByteOrder, IfdEntry, TiffHeader};
use super::tags::FieldType;

// =============================================================================
// TagValue
// =============================================================================

/// A decoded tag value.
#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    /// BYTE and UNDEFINED
    Bytes(Vec<u8>),
    /// ASCII, with trailing NULs removed
    Ascii(String),
    /// SHORT, LONG, LONG8, IFD, IFD8
    Unsigned(Vec<u64>),
    /// SBYTE, SSHORT, SLONG, SLONG8
    Signed(Vec<i64>),
    /// RATIONAL as (numerator, denominator)
    Rational(Vec<(u32, u32)>),
    /// SRATIONAL as (numerator, denominator)
    SignedRational(Vec<(i32, i32)>),
    /// FLOAT and DOUBLE
    Float(Vec<f64>),
}

impl TagValue {
    /// First value as an unsigned integer.
    ///
    /// Unsigned values and single bytes qualify; negative or non-integer
    /// values do not.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            TagValue::Unsigned(v) => v.first().copied(),
            TagValue::Bytes(v) => v.first().map(|&b| b as u64),
            TagValue::Signed(v) => v.first().and_then(|&x| u64::try_from(x).ok()),
            _ => None,
        }
    }

    /// All values as unsigned integers, `None` for non-integer types.
    pub fn as_u64_vec(&self) -> Option<Vec<u64>> {
        match self {
            TagValue::Unsigned(v) => Some(v.clone()),
            TagValue::Bytes(v) => Some(v.iter().map(|&b| b as u64).collect()),
            _ => None,
        }
    }

    /// Number of values (characters for ASCII).
    pub fn len(&self) -> usize {
        match self {
            TagValue::Bytes(v) => v.len(),
            TagValue::Ascii(s) => s.len(),
            TagValue::Unsigned(v) => v.len(),
            TagValue::Signed(v) => v.len(),
            TagValue::Rational(v) => v.len(),
            TagValue::SignedRational(v) => v.len(),
            TagValue::Float(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// =============================================================================
// TagData
// =============================================================================

/// A tag as it was stored: its type, count, raw bytes and decoded value.
///
/// The raw bytes are kept so a directory can be rewritten into an isolated
/// file without re-encoding values it does not need to change.
#[derive(Debug, Clone, PartialEq)]
pub struct TagData {
    pub field_type: FieldType,
    pub count: u64,
    pub raw: Bytes,
    pub value: TagValue,
}

impl TagData {
    /// Decode `raw` into a tag.
    pub fn from_raw(field_type: FieldType, count: u64, raw: Bytes, byte_order: ByteOrder) -> Self {
        let value = decode_value(&raw, field_type, count, byte_order);
        Self {
            field_type,
            count,
            raw,
            value,
        }
    }

    /// Build an unsigned integer tag of the given type.
    ///
    /// Only SHORT, LONG, LONG8, IFD and IFD8 are meaningful here; values
    /// are truncated to the type's width.
    pub fn unsigned(field_type: FieldType, values: Vec<u64>, byte_order: ByteOrder) -> Self {
        let mut raw = Vec::with_capacity(values.len() * field_type.size_in_bytes());
        for &v in &values {
            match field_type {
                FieldType::Short => byte_order.put_u16(&mut raw, v as u16),
                FieldType::Long8 | FieldType::Ifd8 => byte_order.put_u64(&mut raw, v),
                _ => byte_order.put_u32(&mut raw, v as u32),
            }
        }
        Self {
            field_type,
            count: values.len() as u64,
            raw: Bytes::from(raw),
            value: TagValue::Unsigned(values),
        }
    }

    /// Build an ASCII tag; a NUL terminator is appended.
    pub fn ascii(text: &str) -> Self {
        let mut raw = text.as_bytes().to_vec();
        raw.push(0);
        Self {
            field_type: FieldType::Ascii,
            count: raw.len() as u64,
            raw: Bytes::from(raw),
            value: TagValue::Ascii(text.to_string()),
        }
    }

    /// Build an UNDEFINED tag holding opaque bytes.
    pub fn undefined(bytes: Vec<u8>) -> Self {
        Self {
            field_type: FieldType::Undefined,
            count: bytes.len() as u64,
            raw: Bytes::from(bytes.clone()),
            value: TagValue::Bytes(bytes),
        }
    }
}

// =============================================================================
// Decoding
// =============================================================================

/// Decode `count` values of `field_type` from `bytes`.
///
/// Values past the end of `bytes` are dropped rather than failing, so a
/// short read yields a short value.
pub fn decode_value(
    bytes: &[u8],
    field_type: FieldType,
    count: u64,
    byte_order: ByteOrder,
) -> TagValue {
    let size = field_type.size_in_bytes();
    let available = (bytes.len() / size).min(count as usize);
    let items = bytes.chunks_exact(size).take(available);

    match field_type {
        FieldType::Byte | FieldType::Undefined => TagValue::Bytes(bytes[..available].to_vec()),
        FieldType::Ascii => {
            let text = &bytes[..available];
            let end = text
                .iter()
                .rposition(|&b| b != 0)
                .map(|i| i + 1)
                .unwrap_or(0);
            TagValue::Ascii(String::from_utf8_lossy(&text[..end]).into_owned())
        }
        FieldType::Short => TagValue::Unsigned(
            items.map(|b| byte_order.read_u16(b) as u64).collect(),
        ),
        FieldType::Long | FieldType::Ifd => TagValue::Unsigned(
            items.map(|b| byte_order.read_u32(b) as u64).collect(),
        ),
        FieldType::Long8 | FieldType::Ifd8 => {
            TagValue::Unsigned(items.map(|b| byte_order.read_u64(b)).collect())
        }
        FieldType::SByte => TagValue::Signed(items.map(|b| b[0] as i8 as i64).collect()),
        FieldType::SShort => TagValue::Signed(
            items.map(|b| byte_order.read_u16(b) as i16 as i64).collect(),
        ),
        FieldType::SLong => TagValue::Signed(
            items.map(|b| byte_order.read_u32(b) as i32 as i64).collect(),
        ),
        FieldType::SLong8 => {
            TagValue::Signed(items.map(|b| byte_order.read_u64(b) as i64).collect())
        }
        FieldType::Rational => TagValue::Rational(
            items
                .map(|b| (byte_order.read_u32(b), byte_order.read_u32(&b[4..])))
                .collect(),
        ),
        FieldType::SRational => TagValue::SignedRational(
            items
                .map(|b| {
                    (
                        byte_order.read_u32(b) as i32,
                        byte_order.read_u32(&b[4..]) as i32,
                    )
                })
                .collect(),
        ),
        FieldType::Float => TagValue::Float(
            items
                .map(|b| f32::from_bits(byte_order.read_u32(b)) as f64)
                .collect(),
        ),
        FieldType::Double => TagValue::Float(
            items
                .map(|b| f64::from_bits(byte_order.read_u64(b)))
                .collect(),
        ),
    }
}

// =============================================================================
// ValueReader
// =============================================================================

/// Reads tag values from a TIFF source.
///
/// Combines a [`RangeReader`] with the header so values are read in the
/// file's byte order and offset width.
pub struct ValueReader<'a, R: RangeReader + ?Sized> {
    reader: &'a R,
    header: &'a TiffHeader,
}

impl<'a, R: RangeReader + ?Sized> ValueReader<'a, R> {
    pub fn new(reader: &'a R, header: &'a TiffHeader) -> Self {
        Self { reader, header }
    }

    #[inline]
    pub fn byte_order(&self) -> ByteOrder {
        self.header.byte_order
    }

    /// Read raw bytes for an IFD entry's value.
    ///
    /// Inline values come from the entry itself; others are fetched with
    /// one range read.
    pub async fn read_bytes(&self, entry: &IfdEntry) -> Result<Bytes, TiffError> {
        let size = entry
            .value_byte_size()
            .ok_or(TiffError::UnknownFieldType(entry.field_type_raw))?;

        if entry.is_inline {
            Ok(Bytes::copy_from_slice(
                &entry.value_offset_bytes[..size as usize],
            ))
        } else {
            let offset = entry.value_offset(self.header.byte_order);
            let len = usize::try_from(size).map_err(|_| TiffError::InvalidTagValue {
                tag: "value",
                message: format!("value of {} bytes is too large", size),
            })?;
            Ok(self.reader.read_exact_at(offset, len).await?)
        }
    }

    /// Read and decode an entry into a [`TagData`].
    pub async fn read_tag(&self, entry: &IfdEntry) -> Result<TagData, TiffError> {
        let field_type = entry
            .field_type
            .ok_or(TiffError::UnknownFieldType(entry.field_type_raw))?;
        let raw = self.read_bytes(entry).await?;
        Ok(TagData::from_raw(
            field_type,
            entry.count,
            raw,
            self.header.byte_order,
        ))
    }
}

// =============================================================================
// Tests
// =============================================================================
