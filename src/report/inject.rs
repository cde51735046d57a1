//! Splicing thumbnails into the dump text.
//!
//! The dump is edited as text rather than re-serialized so that external
//! dumps keep their exact formatting. Each directory's entry goes right
//! after the line holding its `ImageLength:` key, indented to match.

use crate::error::ReportError;

/// Key whose line each entry is inserted after.
pub const ANCHOR_KEY: &str = "ImageLength:";

/// Key of the inserted mapping.
pub const THUMBNAIL_KEY: &str = "Image Thumbnail";

/// Text shown instead of images when a directory could not be decoded.
pub const PLACEHOLDER: &str = "Could not decode image";

/// One directory's entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Injection {
    /// Directory label, for error messages
    pub directory: String,
    /// Pipe-joined image labels, e.g. `Image | Order`
    pub title: String,
    /// Space-joined `<img:data:...>` markers, or the placeholder text
    pub marker: String,
}

impl Injection {
    /// Entry for a directory without a usable thumbnail.
    pub fn placeholder(directory: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            title: "Image".to_string(),
            marker: PLACEHOLDER.to_string(),
        }
    }
}

/// Position of the next anchor key at or after `from`.
///
/// Only occurrences that start a line's content count; `ImageLength:` inside
/// a value is skipped.
fn find_anchor(text: &str, from: usize) -> Option<usize> {
    let mut search = from;
    while let Some(found) = text.get(search..)?.find(ANCHOR_KEY) {
        let at = search + found;
        let line_start = text[..at].rfind('\n').map_or(0, |i| i + 1);
        if text[line_start..at].bytes().all(|b| b == b' ') {
            return Some(at);
        }
        search = at + ANCHOR_KEY.len();
    }
    None
}

fn quote(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| format!("\"{}\"", text.escape_default()))
}

/// Insert every entry after its anchor, in order.
///
/// Anchors are matched front to back: entry `n` goes after the first anchor
/// that follows entry `n - 1`.
///
/// # Errors
/// `AnchorNotFound` when the text runs out of anchors.
pub fn inject(text: &str, injections: &[Injection]) -> Result<String, ReportError> {
    let mut out = String::with_capacity(
        text.len()
            + injections
                .iter()
                .map(|i| i.title.len() + i.marker.len() + 64)
                .sum::<usize>(),
    );
    let mut cursor = 0;

    for injection in injections {
        let anchor = find_anchor(text, cursor).ok_or_else(|| ReportError::AnchorNotFound {
            directory: injection.directory.clone(),
            anchor: ANCHOR_KEY,
        })?;
        let line_start = text[..anchor].rfind('\n').map_or(0, |i| i + 1);
        let indent = " ".repeat(anchor - line_start);
        let line_end = text[anchor..].find('\n').map(|i| anchor + i + 1);

        match line_end {
            Some(end) => {
                out.push_str(&text[cursor..end]);
                cursor = end;
            }
            None => {
                out.push_str(&text[cursor..]);
                out.push('\n');
                cursor = text.len();
            }
        }

        out.push_str(&format!("{}\"{}\":\n", indent, THUMBNAIL_KEY));
        out.push_str(&format!(
            "{}  {}: {}\n",
            indent,
            quote(&injection.title),
            quote(&injection.marker)
        ));
    }

    out.push_str(&text[cursor..]);
    Ok(out)
}
