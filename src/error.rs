use thiserror::Error;

/// I/O errors that can occur when reading the source file
#[derive(Debug, Clone, Error)]
pub enum IoError {
    /// The file could not be opened or inspected
    #[error("Failed to open {path}: {message}")]
    Open { path: String, message: String },

    /// A positioned read failed
    #[error("Read error at offset {offset}: {message}")]
    Read { offset: u64, message: String },

    /// Requested range exceeds resource bounds
    #[error("Range out of bounds: requested {requested} bytes at offset {offset}, size is {size}")]
    RangeOutOfBounds {
        offset: u64,
        requested: u64,
        size: u64,
    },
}

/// Errors that can occur when parsing or rewriting TIFF files
#[derive(Debug, Clone, Error)]
pub enum TiffError {
    /// I/O error while reading the file
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// Invalid TIFF magic bytes (not II or MM)
    #[error("Invalid TIFF magic bytes: expected 0x4949 (II) or 0x4D4D (MM), got 0x{0:04X}")]
    InvalidMagic(u16),

    /// Invalid TIFF version number
    #[error("Invalid TIFF version: expected 42 (TIFF) or 43 (BigTIFF), got {0}")]
    InvalidVersion(u16),

    /// Invalid BigTIFF offset byte size (must be 8)
    #[error("Invalid BigTIFF offset byte size: expected 8, got {0}")]
    InvalidBigTiffOffsetSize(u16),

    /// File is too small to contain a valid TIFF header
    #[error("File too small: need at least {required} bytes, got {actual}")]
    FileTooSmall { required: u64, actual: u64 },

    /// Invalid IFD offset (points outside file or to invalid location)
    #[error("Invalid IFD offset: {0}")]
    InvalidIfdOffset(u64),

    /// IFD bytes end before the declared entries do
    #[error("Truncated IFD at offset {offset}: need {required} bytes, got {actual}")]
    TruncatedIfd {
        offset: u64,
        required: u64,
        actual: u64,
    },

    /// An IFD chain points back at a directory that was already read
    #[error("IFD chain loops back to offset {0}")]
    DirectoryLoop(u64),

    /// The file declares more directories than we are willing to read
    #[error("Too many directories: limit is {0}")]
    TooManyDirectories(usize),

    /// Required tag is missing from IFD
    #[error("Missing required tag: {0}")]
    MissingTag(&'static str),

    /// Tag has unexpected type or count
    #[error("Invalid tag value for {tag}: {message}")]
    InvalidTagValue { tag: &'static str, message: String },

    /// Unknown field type in IFD entry
    #[error("Unknown field type: {0}")]
    UnknownFieldType(u16),
}

/// Errors raised while producing a thumbnail for one directory
#[derive(Debug, Clone, Error)]
pub enum ThumbnailError {
    /// The decoder cannot handle this kind of directory
    #[error("Unsupported by {decoder}: {reason}")]
    Unsupported {
        decoder: &'static str,
        reason: String,
    },

    /// The decoder accepted the directory but failed to decode it
    #[error("Decode error in {decoder}: {message}")]
    Decode {
        decoder: &'static str,
        message: String,
    },

    /// Encoding the thumbnail as PNG failed
    #[error("Encode error: {0}")]
    Encode(String),

    /// No decoder was configured
    #[error("No thumbnail decoders configured")]
    NoDecoders,

    /// The directory could not be read or isolated
    #[error("TIFF error: {0}")]
    Tiff(#[from] TiffError),
}

/// Errors raised while drawing a structure or order overlay
#[derive(Debug, Clone, Error)]
pub enum OverlayError {
    /// The thumbnail is not a decodable PNG
    #[error("Failed to decode thumbnail: {0}")]
    Decode(String),

    /// The annotated image could not be encoded
    #[error("Failed to encode overlay: {0}")]
    Encode(String),

    /// The grid has more cells than the directory lists chunks
    #[error("Chunk grid has {cells} cells but only {chunks} chunk offsets")]
    ChunkCountMismatch { cells: usize, chunks: usize },
}

/// Errors from external helper programs (optipng, plantuml, tifftools)
#[derive(Debug, Clone, Error)]
pub enum ExternalError {
    /// The program could not be started
    #[error("Failed to start {program}: {message}")]
    Spawn { program: String, message: String },

    /// The program did not finish in time
    #[error("{program} timed out after {seconds}s")]
    Timeout { program: String, seconds: u64 },

    /// The program exited unsuccessfully
    #[error("{program} failed ({status}): {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },

    /// Scratch file handling around the program failed
    #[error("I/O error: {0}")]
    Io(String),
}

/// Errors that abort a report
#[derive(Debug, Clone, Error)]
pub enum ReportError {
    /// I/O error while reading the source or writing output
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// The source is not a readable TIFF
    #[error("TIFF error: {0}")]
    Tiff(#[from] TiffError),

    /// A helper program failed
    #[error("External tool error: {0}")]
    External(#[from] ExternalError),

    /// The dump has no anchor for a directory that should be annotated
    #[error("No `{anchor}` entry found for {directory} in the metadata dump")]
    AnchorNotFound {
        directory: String,
        anchor: &'static str,
    },

    /// The dump is not valid YAML
    #[error("YAML error: {0}")]
    Yaml(String),

    /// The dump could not be converted to JSON
    #[error("JSON error: {0}")]
    Json(String),

    /// Writing a result file failed
    #[error("Failed to write {path}: {message}")]
    Write { path: String, message: String },
}
