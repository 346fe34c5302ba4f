//! Highlight markers and offset recovery.
//!
//! The engine reports highlights as field text with a marker inserted before
//! and after every matched span. The same marker is used on both sides, so
//! splitting the text on it yields alternating outside/inside segments and
//! the parity of a segment tells whether it was highlighted.

use std::fmt;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::types::HighlightOffset;

/// A per-request delimiter wrapped around highlighted spans.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HighlightMarker(String);

impl HighlightMarker {
    /// A fresh marker from a random UUID in braced form, e.g.
    /// `{67e55044-10b1-426f-9247-bb680e5fe0c8}`.
    pub fn allocate() -> Self {
        Self(Uuid::new_v4().braced().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HighlightMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Recover highlighted spans from `marked` text.
///
/// Offsets and lengths are counted in characters of the text with every
/// marker removed. `None` means the field had no highlight and yields an
/// empty list.
pub fn decode(marked: Option<&str>, marker: &str) -> Result<Vec<HighlightOffset>> {
    if marker.is_empty() {
        return Err(Error::MissingHighlightMarker);
    }
    let Some(marked) = marked else {
        return Ok(Vec::new());
    };

    let parts: Vec<&str> = marked.split(marker).collect();
    // n markers give n + 1 parts; an odd marker count leaves a span unclosed.
    if parts.len() % 2 == 0 {
        return Err(Error::UnexpectedFragmentCount(format!(
            "{} highlight markers found, expected an even number",
            parts.len() - 1
        )));
    }

    let mut offsets = Vec::with_capacity(parts.len() / 2);
    let mut position = 0usize;
    let mut inside = false;
    for part in parts {
        let length = part.chars().count();
        if inside && length > 0 {
            offsets.push(HighlightOffset::new(position, length));
        }
        position += length;
        inside = !inside;
    }
    Ok(offsets)
}

/// Decode the fragments the engine returned for one field. The query asks
/// for the whole field as a single fragment, so more than one is a defect.
pub fn decode_fragments(field: &str, fragments: &[String], marker: &str) -> Result<Vec<HighlightOffset>> {
    match fragments {
        [] => decode(None, marker),
        [single] => decode(Some(single), marker),
        many => Err(Error::UnexpectedFragmentCount(format!(
            "field '{field}' returned {} fragments, expected one",
            many.len()
        ))),
    }
}

/// Wrap the given byte ranges of `text` in `marker`. Ranges must be sorted,
/// non-overlapping and on character boundaries.
///
/// This is the inverse of [`decode`], used by engines that compute match
/// positions themselves.
pub fn mark(text: &str, spans: &[std::ops::Range<usize>], marker: &str) -> String {
    let mut out = String::with_capacity(text.len() + spans.len() * marker.len() * 2);
    let mut cursor = 0usize;
    for span in spans {
        out.push_str(&text[cursor..span.start]);
        out.push_str(marker);
        out.push_str(&text[span.start..span.end]);
        out.push_str(marker);
        cursor = span.end;
    }
    out.push_str(&text[cursor..]);
    out
}
