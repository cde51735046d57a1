//! JPEG chunk preparation.
//!
//! JPEG-compressed TIFF chunks are often abbreviated streams: the
//! quantization (DQT) and Huffman (DHT) tables are stored once in the
//! directory's `JPEGTables` tag and omitted from every tile or strip.
//! Before a chunk can be handed to a standalone JPEG decoder the tables are
//! spliced back in:
//!
//! ```text
//! tables:  SOI DQT DHT EOI
//! chunk:   SOI SOS ... EOI
//! merged:  SOI DQT DHT SOS ... EOI
//! ```
//!
//! Chunks stored with RGB photometric interpretation carry no color
//! transform hint, and decoders assume YCbCr. An Adobe APP14 segment with
//! transform 0 tells them not to convert.

use bytes::{Bytes, BytesMut};

// =============================================================================
// JPEG Markers
// =============================================================================

/// Start Of Image marker
pub const SOI: [u8; 2] = [0xFF, 0xD8];

/// End Of Image marker
pub const EOI: [u8; 2] = [0xFF, 0xD9];

/// Define Huffman Table marker
pub const DHT: [u8; 2] = [0xFF, 0xC4];

/// Define Quantization Table marker
pub const DQT: [u8; 2] = [0xFF, 0xDB];

/// Start Of Scan marker
pub const SOS: [u8; 2] = [0xFF, 0xDA];

/// Application segment 14 (Adobe) marker
pub const APP14: [u8; 2] = [0xFF, 0xEE];

/// APP14 segment declaring untransformed (RGB) components.
const ADOBE_RGB_SEGMENT: [u8; 16] = [
    0xFF, 0xEE, 0x00, 0x0E, b'A', b'd', b'o', b'b', b'e', 0x00, 0x64, 0x00, 0x00, 0x00, 0x00,
    0x00,
];

// =============================================================================
// Stream inspection
// =============================================================================

/// Walk the marker segments between SOI and the first SOS.
///
/// Yields `(marker, segment_start)` pairs. Stops at SOS, EOI or malformed
/// data.
fn header_markers(data: &[u8]) -> impl Iterator<Item = ([u8; 2], usize)> + '_ {
    let mut pos = if data.len() >= 2 && data[0..2] == SOI {
        2
    } else {
        data.len()
    };
    std::iter::from_fn(move || {
        while pos + 1 < data.len() && data[pos] == 0xFF && data[pos + 1] == 0xFF {
            pos += 1;
        }
        if pos + 1 >= data.len() || data[pos] != 0xFF {
            return None;
        }
        let marker = [data[pos], data[pos + 1]];
        let start = pos;
        if marker == SOS || marker == EOI {
            pos = data.len();
        } else if pos + 3 < data.len() {
            let length = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
            pos += 2 + length.max(2);
        } else {
            pos = data.len();
        }
        Some((marker, start))
    })
}

/// Whether the data is an abbreviated stream: SOI then SOS without any
/// DQT or DHT segment in between.
pub fn is_abbreviated_stream(data: &[u8]) -> bool {
    let mut saw_sos = false;
    for (marker, _) in header_markers(data) {
        if marker == DQT || marker == DHT {
            return false;
        }
        if marker == SOS {
            saw_sos = true;
        }
    }
    saw_sos
}

/// Whether the stream defines its own quantization tables.
pub fn has_tables(data: &[u8]) -> bool {
    header_markers(data).any(|(marker, _)| marker == DQT)
}

/// Whether the stream already carries an Adobe APP14 segment.
pub fn has_adobe_marker(data: &[u8]) -> bool {
    header_markers(data).any(|(marker, start)| {
        marker == APP14 && data.get(start + 4..start + 9) == Some(b"Adobe".as_slice())
    })
}

// =============================================================================
// Rewriting
// =============================================================================

/// Splice `JPEGTables` into an abbreviated chunk.
///
/// The trailing EOI of the tables and the leading SOI of the chunk are
/// dropped so the result is a single well-formed stream.
pub fn merge_jpeg_tables(tables: &[u8], chunk: &[u8]) -> Bytes {
    if tables.is_empty() {
        return Bytes::copy_from_slice(chunk);
    }
    if chunk.is_empty() {
        return Bytes::new();
    }

    let tables_end = if tables.ends_with(&EOI) {
        tables.len() - 2
    } else {
        tables.len()
    };
    let chunk_start = if chunk.starts_with(&SOI) { 2 } else { 0 };

    let mut result = BytesMut::with_capacity(tables_end + chunk.len() - chunk_start);
    result.extend_from_slice(&tables[..tables_end]);
    result.extend_from_slice(&chunk[chunk_start..]);
    result.freeze()
}

/// Insert an Adobe APP14 segment with transform 0 right after SOI.
///
/// Data that does not start with SOI is returned unchanged.
pub fn insert_adobe_rgb_marker(data: &[u8]) -> Bytes {
    if !data.starts_with(&SOI) {
        return Bytes::copy_from_slice(data);
    }
    let mut result = BytesMut::with_capacity(data.len() + ADOBE_RGB_SEGMENT.len());
    result.extend_from_slice(&SOI);
    result.extend_from_slice(&ADOBE_RGB_SEGMENT);
    result.extend_from_slice(&data[2..]);
    result.freeze()
}

/// Turn one JPEG chunk of a TIFF directory into a decodable JPEG file.
///
/// `rgb` is set when the directory's photometric interpretation is RGB.
pub fn prepare_chunk_jpeg(tables: Option<&[u8]>, chunk: &[u8], rgb: bool) -> Bytes {
    let stream = match tables {
        Some(tables) if !has_tables(chunk) && is_abbreviated_stream(chunk) => {
            merge_jpeg_tables(tables, chunk)
        }
        _ => Bytes::copy_from_slice(chunk),
    };

    if rgb && !has_adobe_marker(&stream) {
        insert_adobe_rgb_marker(&stream)
    } else {
        stream
    }
}
