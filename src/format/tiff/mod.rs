//! TIFF reading and rewriting.
//!
//! # Key Concepts
//!
//! - **Byte order**: TIFF files declare their endianness (II = little-endian, MM = big-endian)
//!   in the header. All multi-byte values must be read respecting this order.
//!
//! - **Classic TIFF vs BigTIFF**: Classic TIFF uses 32-bit offsets (max 4GB files),
//!   while BigTIFF uses 64-bit offsets. Both are handled transparently.
//!
//! - **IFD (Image File Directory)**: Holds one image's tags and pointers to its
//!   chunk data. Directories form a chain; tag 330 (SubIFDs) hangs further
//!   chains off a directory.
//!
//! - **Inline vs offset values**: Small values are stored inline in the IFD entry,
//!   larger values are stored at an offset pointed to by the entry.

mod directory;
mod parser;
mod tags;
mod values;
mod writer;


pub use directory::{DirectoryIter, ImageDirectory, TiffFile, MAX_DIRECTORIES, MAX_SUBIFD_DEPTH};
pub use parser::{
    ByteOrder, Ifd, IfdEntry, TiffHeader, BIGTIFF_HEADER_SIZE, TIFF_HEADER_SIZE, VERSION_BIGTIFF,
    VERSION_TIFF,
};
pub use tags::{tag_name, value_name, Compression, FieldType, TiffTag};
pub use values::{decode_value, TagData, TagValue, ValueReader};
pub use writer::{isolate_chunks, isolate_directory, IsolatedImage};
