//! The narrow editor interface completion needs from its host.

use crate::text;
use crate::types::Span;

use super::snippet::expand_snippet;

/// Host editor primitives.
///
/// Offsets are byte offsets into [`TextEditor::text`]. Implementations
/// must tolerate out-of-range spans by clamping.
pub trait TextEditor {
    /// Path of the edited document, as keyed in the snapshot.
    fn path(&self) -> &str;

    /// Current buffer contents.
    fn text(&self) -> &str;

    /// Cursor offset.
    fn position(&self) -> usize;

    /// Move the cursor.
    fn set_position(&mut self, offset: usize);

    /// Replace `span` with `replacement`; the cursor ends after the insertion.
    fn replace(&mut self, span: Span, replacement: &str);

    /// The char starting at `offset`.
    fn char_at(&self, offset: usize) -> Option<char> {
        text::char_at(self.text(), offset)
    }

    /// The char ending at `offset`.
    fn char_before(&self, offset: usize) -> Option<char> {
        text::char_before(self.text(), offset).map(|(_, ch)| ch)
    }

    /// Text in `span`, empty when the span is out of range.
    fn text_in(&self, span: Span) -> &str {
        self.text().get(span.start..span.end).unwrap_or("")
    }

    /// Replace `span` with a snippet body. Placeholder markers are removed
    /// and the first placeholder is selected by moving the cursor to its
    /// start; without placeholders the cursor ends after the insertion.
    fn insert_snippet(&mut self, span: Span, body: &str) {
        let (expanded, first) = expand_snippet(body);
        self.replace(span, &expanded);
        if let Some(placeholder) = first {
            self.set_position(span.start + placeholder.start);
        }
    }
}

// ============================================================================
// In-memory buffer
// ============================================================================

/// A plain string buffer with a cursor.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TextBuffer {
    path: String,
    text: String,
    position: usize,
}

impl TextBuffer {
    /// A buffer with the cursor at `position` (clamped).
    pub fn new(path: impl Into<String>, text: impl Into<String>, position: usize) -> Self {
        let text = text.into();
        let position = text::floor_char_boundary(&text, position);
        TextBuffer {
            path: path.into(),
            text,
            position,
        }
    }

    /// A buffer whose cursor sits at the first `|`, which is removed.
    pub fn with_cursor_marker(path: impl Into<String>, marked: &str) -> Self {
        match marked.find('|') {
            Some(at) => {
                let text = format!("{}{}", &marked[..at], &marked[at + 1..]);
                TextBuffer::new(path, text, at)
            }
            None => TextBuffer::new(path, marked, marked.len()),
        }
    }

    /// Insert text at the cursor, as if typed.
    pub fn type_text(&mut self, typed: &str) {
        let at = self.position;
        self.replace(Span::new(at, at), typed);
    }
}

impl TextEditor for TextBuffer {
    fn path(&self) -> &str {
        &self.path
    }

    fn text(&self) -> &str {
        &self.text
    }

    fn position(&self) -> usize {
        self.position
    }

    fn set_position(&mut self, offset: usize) {
        self.position = text::floor_char_boundary(&self.text, offset);
    }

    fn replace(&mut self, span: Span, replacement: &str) {
        let start = text::floor_char_boundary(&self.text, span.start);
        let end = text::floor_char_boundary(&self.text, span.end.max(start));
        self.text.replace_range(start..end, replacement);
        self.position = start + replacement.len();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_marker_is_removed() {
        let buffer = TextBuffer::with_cursor_marker("a.qml", "foo.|bar");
        assert_eq!(buffer.text(), "foo.bar");
        assert_eq!(buffer.position(), 4);
    }

    #[test]
    fn replace_moves_cursor_after_insertion() {
        let mut buffer = TextBuffer::new("a.js", "foo.ba", 6);
        buffer.replace(Span::new(4, 6), "bar");
        assert_eq!(buffer.text(), "foo.bar");
        assert_eq!(buffer.position(), 7);
    }

    #[test]
    fn out_of_range_spans_clamp() {
        let mut buffer = TextBuffer::new("a.js", "abc", 99);
        assert_eq!(buffer.position(), 3);
        buffer.replace(Span::new(2, 50), "Z");
        assert_eq!(buffer.text(), "abZ");
    }

    #[test]
    fn snippet_selects_first_placeholder() {
        let mut buffer = TextBuffer::new("a.qml", "Rec", 3);
        let body = "Rectangle { width: \u{FFFC}100\u{FFFC} }";
        buffer.insert_snippet(Span::new(0, 3), body);
        assert_eq!(buffer.text(), "Rectangle { width: 100 }");
        assert_eq!(buffer.position(), 19);
        assert!(!buffer.text().contains('\u{FFFC}'));
    }
}
