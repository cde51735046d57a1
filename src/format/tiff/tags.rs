//! TIFF tag and field type definitions.
//!
//! This module defines the vocabulary for TIFF parsing, including:
//! - Field types that determine how values are encoded
//! - Tag IDs that identify metadata fields, with the names used in dumps
//! - Names for the enumerated values of a few well-known tags
//!
//! The definitions support both classic TIFF and BigTIFF formats.

// =============================================================================
// TIFF Field Types
// =============================================================================

/// TIFF field types that determine how values are encoded.
///
/// Each field type has a fixed element size, which decides whether a value
/// fits inline in an IFD entry and how arrays are sliced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum FieldType {
    /// Unsigned 8-bit integer
    Byte = 1,
    /// 8-bit ASCII character, NUL terminated
    Ascii = 2,
    /// Unsigned 16-bit integer
    Short = 3,
    /// Unsigned 32-bit integer
    Long = 4,
    /// Two LONGs: numerator and denominator
    Rational = 5,
    /// Signed 8-bit integer
    SByte = 6,
    /// Opaque byte data
    Undefined = 7,
    /// Signed 16-bit integer
    SShort = 8,
    /// Signed 32-bit integer
    SLong = 9,
    /// Two SLONGs: numerator and denominator
    SRational = 10,
    /// IEEE single precision float
    Float = 11,
    /// IEEE double precision float
    Double = 12,
    /// 32-bit IFD offset
    Ifd = 13,
    /// Unsigned 64-bit integer (BigTIFF)
    Long8 = 16,
    /// Signed 64-bit integer (BigTIFF)
    SLong8 = 17,
    /// 64-bit IFD offset (BigTIFF)
    Ifd8 = 18,
}

impl FieldType {
    /// Size of a single value of this type in bytes.
    #[inline]
    pub const fn size_in_bytes(self) -> usize {
        match self {
            FieldType::Byte | FieldType::Ascii | FieldType::SByte | FieldType::Undefined => 1,
            FieldType::Short | FieldType::SShort => 2,
            FieldType::Long | FieldType::SLong | FieldType::Float | FieldType::Ifd => 4,
            FieldType::Rational
            | FieldType::SRational
            | FieldType::Double
            | FieldType::Long8
            | FieldType::SLong8
            | FieldType::Ifd8 => 8,
        }
    }

    /// Create a FieldType from its numeric value.
    ///
    /// Returns `None` for unknown type values.
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            1 => Some(FieldType::Byte),
            2 => Some(FieldType::Ascii),
            3 => Some(FieldType::Short),
            4 => Some(FieldType::Long),
            5 => Some(FieldType::Rational),
            6 => Some(FieldType::SByte),
            7 => Some(FieldType::Undefined),
            8 => Some(FieldType::SShort),
            9 => Some(FieldType::SLong),
            10 => Some(FieldType::SRational),
            11 => Some(FieldType::Float),
            12 => Some(FieldType::Double),
            13 => Some(FieldType::Ifd),
            16 => Some(FieldType::Long8),
            17 => Some(FieldType::SLong8),
            18 => Some(FieldType::Ifd8),
            _ => None,
        }
    }

    /// Get the numeric type ID.
    #[inline]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Maximum bytes that can be stored inline in a classic TIFF IFD entry.
    pub const INLINE_THRESHOLD_TIFF: usize = 4;

    /// Maximum bytes that can be stored inline in a BigTIFF IFD entry.
    pub const INLINE_THRESHOLD_BIGTIFF: usize = 8;

    /// Check if a value with this type and count fits inline in an entry.
    #[inline]
    pub fn fits_inline(self, count: u64, is_bigtiff: bool) -> bool {
        let threshold = if is_bigtiff {
            Self::INLINE_THRESHOLD_BIGTIFF
        } else {
            Self::INLINE_THRESHOLD_TIFF
        };
        match (self.size_in_bytes() as u64).checked_mul(count) {
            Some(total) => total <= threshold as u64,
            None => false,
        }
    }
}

// =============================================================================
// TIFF Tags
// =============================================================================

/// Declares the `TiffTag` enum together with its numeric and dump names.
macro_rules! tiff_tags {
    ($( $(#[$doc:meta])* $variant:ident = $id:literal => $name:literal, )*) => {
        /// TIFF tag IDs known to the directory reader and the dump.
        ///
        /// Tags outside this list are still read and dumped; they are shown
        /// by their numeric ID.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(u16)]
        pub enum TiffTag {
            $( $(#[$doc])* $variant = $id, )*
        }

        impl TiffTag {
            /// Create a TiffTag from its numeric value.
            pub fn from_u16(value: u16) -> Option<Self> {
                match value {
                    $( $id => Some(TiffTag::$variant), )*
                    _ => None,
                }
            }

            /// Name used for this tag in metadata dumps.
            pub const fn name(self) -> &'static str {
                match self {
                    $( TiffTag::$variant => $name, )*
                }
            }
        }
    };
}

tiff_tags! {
    NewSubfileType = 254 => "NewSubfileType",
    SubfileType = 255 => "SubfileType",
    /// Image width in pixels
    ImageWidth = 256 => "ImageWidth",
    /// Image height (length) in pixels
    ImageLength = 257 => "ImageLength",
    BitsPerSample = 258 => "BitsPerSample",
    Compression = 259 => "Compression",
    PhotometricInterpretation = 262 => "PhotometricInterpretation",
    FillOrder = 266 => "FillOrder",
    DocumentName = 269 => "DocumentName",
    ImageDescription = 270 => "ImageDescription",
    Make = 271 => "Make",
    Model = 272 => "Model",
    /// Byte offsets of strips
    StripOffsets = 273 => "StripOffsets",
    Orientation = 274 => "Orientation",
    SamplesPerPixel = 277 => "SamplesPerPixel",
    /// Row count per strip
    RowsPerStrip = 278 => "RowsPerStrip",
    /// Byte counts of strips
    StripByteCounts = 279 => "StripByteCounts",
    MinSampleValue = 280 => "MinSampleValue",
    MaxSampleValue = 281 => "MaxSampleValue",
    XResolution = 282 => "XResolution",
    YResolution = 283 => "YResolution",
    PlanarConfiguration = 284 => "PlanarConfiguration",
    PageName = 285 => "PageName",
    XPosition = 286 => "XPosition",
    YPosition = 287 => "YPosition",
    ResolutionUnit = 296 => "ResolutionUnit",
    PageNumber = 297 => "PageNumber",
    Software = 305 => "Software",
    DateTime = 306 => "DateTime",
    Artist = 315 => "Artist",
    HostComputer = 316 => "HostComputer",
    Predictor = 317 => "Predictor",
    ColorMap = 320 => "ColorMap",
    /// Width of each tile in pixels
    TileWidth = 322 => "TileWidth",
    /// Height (length) of each tile in pixels
    TileLength = 323 => "TileLength",
    /// Byte offsets of each tile
    TileOffsets = 324 => "TileOffsets",
    /// Byte counts of each tile
    TileByteCounts = 325 => "TileByteCounts",
    /// Offsets of child directory chains
    SubIfds = 330 => "SubIFD",
    InkSet = 332 => "InkSet",
    ExtraSamples = 338 => "ExtraSamples",
    SampleFormat = 339 => "SampleFormat",
    /// Shared quantization and Huffman tables for abbreviated JPEG chunks
    JpegTables = 347 => "JPEGTables",
    JpegInterchangeFormat = 513 => "JPEGIFOffset",
    JpegInterchangeFormatLength = 514 => "JPEGIFByteCount",
    YCbCrCoefficients = 529 => "YCbCrCoefficients",
    /// Horizontal and vertical chroma subsampling factors
    YCbCrSubSampling = 530 => "YCbCrSubsampling",
    YCbCrPositioning = 531 => "YCbCrPositioning",
    ReferenceBlackWhite = 532 => "ReferenceBlackWhite",
    Xmp = 700 => "XMLPacket",
    ImageDepth = 32997 => "ImageDepth",
    TileDepth = 32998 => "TileDepth",
    Copyright = 33432 => "Copyright",
    ModelPixelScale = 33550 => "ModelPixelScaleTag",
    IptcNaa = 33723 => "IPTC/NAA",
    ModelTiepoint = 33922 => "ModelTiepointTag",
    Photoshop = 34377 => "Photoshop",
    ExifIfd = 34665 => "EXIFIFD",
    IccProfile = 34675 => "ICCProfile",
    GeoKeyDirectory = 34735 => "GeoKeyDirectoryTag",
    GeoDoubleParams = 34736 => "GeoDoubleParamsTag",
    GeoAsciiParams = 34737 => "GeoAsciiParamsTag",
    GpsIfd = 34853 => "GPSIFD",
    InteroperabilityIfd = 40965 => "InteroperabilityIFD",
    GdalMetadata = 42112 => "GDAL_METADATA",
    GdalNodata = 42113 => "GDAL_NODATA",
    NdpiVersion = 65420 => "NDPI_FORMAT_FLAG",
    NdpiSourceLens = 65421 => "NDPI_SOURCELENS",
    NdpiXOffset = 65422 => "NDPI_XOFFSET",
    NdpiYOffset = 65423 => "NDPI_YOFFSET",
    NdpiFocalPlane = 65424 => "NDPI_FOCAL_PLANE",
    NdpiMcuStartsHigh = 65432 => "NDPI_MCU_STARTS_HIGHBYTES",
    /// Hamamatsu NDPI restart marker offsets, one per macroblock
    NdpiMcuStarts = 65426 => "NDPI_MCU_STARTS",
    NdpiReference = 65427 => "NDPI_REFERENCE",
    NdpiProperties = 65449 => "NDPI_PROPERTY_MAP",
}

impl TiffTag {
    /// Get the numeric tag ID.
    #[inline]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Tags whose values are offsets into the source file.
    ///
    /// These are meaningless once a directory is copied elsewhere and are
    /// either rewritten or dropped by the directory isolator.
    pub const fn is_offset_pointer(self) -> bool {
        matches!(
            self,
            TiffTag::StripOffsets
                | TiffTag::TileOffsets
                | TiffTag::SubIfds
                | TiffTag::JpegInterchangeFormat
                | TiffTag::ExifIfd
                | TiffTag::GpsIfd
                | TiffTag::InteroperabilityIfd
                | TiffTag::NdpiMcuStarts
                | TiffTag::NdpiMcuStartsHigh
        )
    }
}

/// Name of a tag ID for dumps, if it is a known tag.
pub fn tag_name(id: u16) -> Option<&'static str> {
    TiffTag::from_u16(id).map(TiffTag::name)
}

// =============================================================================
// Compression Values
// =============================================================================

/// TIFF compression scheme identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum Compression {
    None = 1,
    CcittRle = 2,
    CcittFax3 = 3,
    CcittFax4 = 4,
    Lzw = 5,
    /// "Old-style" JPEG
    OldJpeg = 6,
    Jpeg = 7,
    AdobeDeflate = 8,
    PackBits = 32773,
    Deflate = 32946,
    /// Aperio JPEG 2000 with YCbCr components
    Jpeg2000YCbCr = 33003,
    /// Aperio JPEG 2000 with RGB components
    Jpeg2000Rgb = 33005,
    Jpeg2000 = 34712,
    Lzma = 34925,
    Zstd = 50000,
    Webp = 50001,
    JpegXl = 50002,
}

impl Compression {
    /// Create a Compression from its numeric value.
    ///
    /// Returns `None` for unrecognized compression values.
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            1 => Some(Compression::None),
            2 => Some(Compression::CcittRle),
            3 => Some(Compression::CcittFax3),
            4 => Some(Compression::CcittFax4),
            5 => Some(Compression::Lzw),
            6 => Some(Compression::OldJpeg),
            7 => Some(Compression::Jpeg),
            8 => Some(Compression::AdobeDeflate),
            32773 => Some(Compression::PackBits),
            32946 => Some(Compression::Deflate),
            33003 => Some(Compression::Jpeg2000YCbCr),
            33005 => Some(Compression::Jpeg2000Rgb),
            34712 => Some(Compression::Jpeg2000),
            34925 => Some(Compression::Lzma),
            50000 => Some(Compression::Zstd),
            50001 => Some(Compression::Webp),
            50002 => Some(Compression::JpegXl),
            _ => None,
        }
    }

    /// Get a human-readable name for the compression scheme.
    pub const fn name(self) -> &'static str {
        match self {
            Compression::None => "None",
            Compression::CcittRle => "CCITT RLE",
            Compression::CcittFax3 => "CCITT Group 3",
            Compression::CcittFax4 => "CCITT Group 4",
            Compression::Lzw => "LZW",
            Compression::OldJpeg => "Old JPEG",
            Compression::Jpeg => "JPEG",
            Compression::AdobeDeflate => "Adobe Deflate",
            Compression::PackBits => "PackBits",
            Compression::Deflate => "Deflate",
            Compression::Jpeg2000YCbCr => "JPEG 2000 (YCbCr)",
            Compression::Jpeg2000Rgb => "JPEG 2000 (RGB)",
            Compression::Jpeg2000 => "JPEG 2000",
            Compression::Lzma => "LZMA",
            Compression::Zstd => "Zstandard",
            Compression::Webp => "WebP",
            Compression::JpegXl => "JPEG XL",
        }
    }
}

// =============================================================================
// Enumerated Tag Values
// =============================================================================

/// Human-readable name for an enumerated tag value.
///
/// Used by the dump to annotate values such as `7 (JPEG)`. Returns `None`
/// for tags without enumerated values and for unknown values.
pub fn value_name(tag: TiffTag, value: u64) -> Option<&'static str> {
    let value = u16::try_from(value).ok()?;
    match tag {
        TiffTag::Compression => Compression::from_u16(value).map(Compression::name),
        TiffTag::PhotometricInterpretation => match value {
            0 => Some("MinIsWhite"),
            1 => Some("MinIsBlack"),
            2 => Some("RGB"),
            3 => Some("Palette"),
            4 => Some("Mask"),
            5 => Some("Separated"),
            6 => Some("YCbCr"),
            8 => Some("CIELab"),
            9 => Some("ICCLab"),
            10 => Some("ITULab"),
            32844 => Some("LogL"),
            32845 => Some("LogLuv"),
            34892 => Some("LinearRaw"),
            _ => None,
        },
        TiffTag::PlanarConfiguration => match value {
            1 => Some("Chunky"),
            2 => Some("Planar"),
            _ => None,
        },
        TiffTag::ResolutionUnit => match value {
            1 => Some("None"),
            2 => Some("Inch"),
            3 => Some("Centimeter"),
            _ => None,
        },
        TiffTag::Orientation => match value {
            1 => Some("TopLeft"),
            2 => Some("TopRight"),
            3 => Some("BottomRight"),
            4 => Some("BottomLeft"),
            5 => Some("LeftTop"),
            6 => Some("RightTop"),
            7 => Some("RightBottom"),
            8 => Some("LeftBottom"),
            _ => None,
        },
        TiffTag::Predictor => match value {
            1 => Some("None"),
            2 => Some("Horizontal"),
            3 => Some("FloatingPoint"),
            _ => None,
        },
        TiffTag::SampleFormat => match value {
            1 => Some("uint"),
            2 => Some("int"),
            3 => Some("float"),
            4 => Some("void"),
            _ => None,
        },
        _ => None,
    }
}
