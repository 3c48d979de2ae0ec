//! Common types shared between the document model, errors and output.
//!
//! This module contains types that are used by several modules,
//! avoiding circular dependencies.

use serde::{Deserialize, Serialize};

// ============================================================================
// Span Type
// ============================================================================

/// A byte range in a source file, `start` inclusive, `end` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    /// Start byte offset (inclusive).
    pub start: usize,
    /// End byte offset (exclusive).
    pub end: usize,
}

impl Span {
    /// Create a new span.
    ///
    /// A reversed range is normalized so that `start <= end` always holds.
    pub fn new(start: usize, end: usize) -> Self {
        if start <= end {
            Span { start, end }
        } else {
            Span {
                start: end,
                end: start,
            }
        }
    }

    /// Length of the span in bytes.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Check if span is empty.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Check if a byte offset lies inside this span.
    pub fn contains_offset(&self, offset: usize) -> bool {
        offset >= self.start && offset < self.end
    }

    /// Check if this span contains another span entirely.
    pub fn contains(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

// ============================================================================
// Location Type
// ============================================================================

/// Location in a source file.
///
/// - `file`: Snapshot path of the document
/// - `line`: 1-indexed line number
/// - `col`: 1-indexed column, counted in chars
/// - `offset`: Byte offset from file start (optional)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Location {
    /// File path.
    pub file: String,
    /// Line number (1-indexed).
    pub line: u32,
    /// Column number (1-indexed).
    pub col: u32,
    /// Byte offset from file start (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<usize>,
}

impl Location {
    /// Create a new location without a byte offset.
    pub fn new(file: impl Into<String>, line: u32, col: u32) -> Self {
        Location {
            file: file.into(),
            line,
            col,
            offset: None,
        }
    }

    /// Create a location from a byte offset into `content`.
    pub fn from_offset(file: impl Into<String>, content: &str, offset: usize) -> Self {
        let (line, col) = crate::text::byte_offset_to_position_str(content, offset);
        Location {
            file: file.into(),
            line,
            col,
            offset: Some(offset),
        }
    }

    /// Parse a location from "path:line:col" format.
    ///
    /// This parsing is robust against paths containing colons (e.g., Windows paths).
    pub fn parse(s: &str) -> Option<Self> {
        let parts: Vec<&str> = s.rsplitn(3, ':').collect();
        if parts.len() != 3 {
            return None;
        }
        let col: u32 = parts[0].parse().ok()?;
        let line: u32 = parts[1].parse().ok()?;
        Some(Location::new(parts[2], line, col))
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.col)
    }
}

// ============================================================================
// Tests
// ============================================================================
