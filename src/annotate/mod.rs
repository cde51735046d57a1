//! Thumbnail annotation.
//!
//! - [`layout`] works out how a directory is chunked on disk
//! - [`scale`] picks a thumbnail size for every directory of a file
//! - [`overlay`] draws the chunk grid or write order onto a thumbnail

pub mod layout;
pub mod overlay;
pub mod scale;

pub use layout::{ChunkKind, ChunkLayout};
pub use overlay::{order_shades, render_overlay, OverlayMode, GRID_XOR, RESCALE, SKIPPED_COLOR};
pub use scale::{ScalePlan, DEFAULT_MAX_THUMB, DEFAULT_MIN_THUMB};
