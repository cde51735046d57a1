//! File format handling.
//!
//! - [`tiff`] reads TIFF and BigTIFF directory trees and rewrites single
//!   directories as standalone files.
//! - [`jpeg`] repairs abbreviated JPEG chunks so they decode on their own.

pub mod jpeg;
pub mod tiff;

pub use jpeg::{
    has_adobe_marker, has_tables, insert_adobe_rgb_marker, is_abbreviated_stream,
    merge_jpeg_tables, prepare_chunk_jpeg,
};
