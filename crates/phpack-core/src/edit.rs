//! Offset-based source code editing
//!
//! The generator edits stored statement text long after the arena-backed
//! syntax tree is gone, so edits are plain byte ranges rather than parser
//! spans. Edits are applied in reverse order to keep offsets valid.

use thiserror::Error;

/// Errors that can occur during edit application
#[derive(Error, Debug)]
pub enum EditError {
    #[error("Overlapping edits detected at offset {0}")]
    OverlappingEdits(usize),

    #[error("Edit range {start}..{end} out of bounds for source length {len}")]
    RangeOutOfBounds { start: usize, end: usize, len: usize },

    #[error("Edit range {start}..{end} is not on a character boundary")]
    NotCharBoundary { start: usize, end: usize },
}

/// A single replacement of a byte range.
#[derive(Debug, Clone)]
pub struct Edit {
    pub start: usize,
    pub end: usize,
    pub replacement: String,
}

impl Edit {
    pub fn new(start: usize, end: usize, replacement: impl Into<String>) -> Self {
        Self {
            start,
            end,
            replacement: replacement.into(),
        }
    }

    /// An edit that removes the range entirely.
    pub fn delete(start: usize, end: usize) -> Self {
        Self::new(start, end, "")
    }
}

/// Apply edits to source text, preserving everything outside the edited
/// ranges.
///
/// Edits are applied from end to start so earlier offsets stay valid.
/// Overlapping or out-of-bounds edits are rejected as a whole.
pub fn apply_edits(source: &str, edits: &[Edit]) -> Result<String, EditError> {
    if edits.is_empty() {
        return Ok(source.to_string());
    }

    let mut sorted: Vec<&Edit> = edits.iter().collect();
    sorted.sort_by(|a, b| b.start.cmp(&a.start));

    let len = source.len();
    let mut prev_start: Option<usize> = None;

    for edit in &sorted {
        if edit.end < edit.start || edit.end > len {
            return Err(EditError::RangeOutOfBounds {
                start: edit.start,
                end: edit.end,
                len,
            });
        }
        if !source.is_char_boundary(edit.start) || !source.is_char_boundary(edit.end) {
            return Err(EditError::NotCharBoundary {
                start: edit.start,
                end: edit.end,
            });
        }
        if let Some(prev) = prev_start {
            if edit.end > prev {
                return Err(EditError::OverlappingEdits(edit.start));
            }
        }
        prev_start = Some(edit.start);
    }

    let mut result = source.to_string();
    for edit in sorted {
        result.replace_range(edit.start..edit.end, &edit.replacement);
    }

    Ok(result)
}
