//! Text utilities for cursor arithmetic over editor buffers.
//!
//! ## Coordinate Conventions
//!
//! - Offsets are **byte** offsets into UTF-8 text (0-indexed), the same unit
//!   used by [`Span`](crate::types::Span)
//! - Lines and columns are **1-indexed**; columns count chars
//! - Offsets that do not fall on a char boundary are treated as "no char"
//!
//! Every helper here tolerates out-of-range offsets: completion must never
//! panic on a stale cursor.

// ============================================================================
// Position Conversions
// ============================================================================

/// Convert a byte offset to 1-indexed line and column.
///
/// Columns count Unicode scalar values (chars), not bytes.
/// If `offset` exceeds the content length, the position at the end is returned.
pub fn byte_offset_to_position_str(content: &str, offset: usize) -> (u32, u32) {
    let mut line = 1u32;
    let mut col = 1u32;

    for (i, ch) in content.char_indices() {
        if i >= offset {
            break;
        }
        if ch == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }

    (line, col)
}

/// Convert 1-indexed line and column to a byte offset.
///
/// Line/column values of 0 are treated as 1. A column beyond the end of the
/// line clamps to the line end; a line beyond the content returns the
/// content length.
pub fn position_to_byte_offset_str(content: &str, line: u32, col: u32) -> usize {
    let line = line.max(1);
    let col = col.max(1);

    let mut line_start = 0usize;
    let mut current_line = 1u32;
    if line > 1 {
        let mut found = false;
        for (i, ch) in content.char_indices() {
            if ch == '\n' {
                current_line += 1;
                if current_line == line {
                    line_start = i + 1;
                    found = true;
                    break;
                }
            }
        }
        if !found {
            return content.len();
        }
    }

    let mut current_col = 1u32;
    for (j, c) in content[line_start..].char_indices() {
        if current_col == col || c == '\n' {
            return line_start + j;
        }
        current_col += 1;
    }
    content.len()
}

// ============================================================================
// Char Access
// ============================================================================

/// The char starting at byte `offset`, if any.
pub fn char_at(content: &str, offset: usize) -> Option<char> {
    content.get(offset..)?.chars().next()
}

/// The char ending at byte `offset`, with its start offset.
pub fn char_before(content: &str, offset: usize) -> Option<(usize, char)> {
    let head = content.get(..offset)?;
    let ch = head.chars().next_back()?;
    Some((offset - ch.len_utf8(), ch))
}

/// Byte offset of the start of the line containing `offset`.
pub fn line_start(content: &str, offset: usize) -> usize {
    let offset = offset.min(content.len());
    content
        .get(..offset)
        .and_then(|head| head.rfind('\n'))
        .map(|nl| nl + 1)
        .unwrap_or(0)
}

// ============================================================================
// Identifier Helpers
// ============================================================================

/// Whether `ch` may continue an identifier (`_` and `$` included).
pub fn is_identifier_char(ch: char) -> bool {
    ch == '_' || ch == '$' || ch.is_alphanumeric()
}

/// Whether `word` starts like an identifier (letter, `_` or `$`).
pub fn check_start_of_identifier(word: &str) -> bool {
    match word.chars().next() {
        Some('_') | Some('$') => true,
        Some(ch) => ch.is_alphabetic(),
        None => false,
    }
}

/// Punctuation that ends an identifier without being a completion operator.
pub fn is_delimiter(ch: char) -> bool {
    matches!(
        ch,
        '{' | '}' | '[' | ']' | ')' | '?' | '!' | ':' | ';' | ','
    )
}

/// The nearest char boundary at or before `offset`, clamped to the text.
pub fn floor_char_boundary(content: &str, offset: usize) -> usize {
    let mut offset = offset.min(content.len());
    while !content.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}

/// Walk back from `offset` over identifier chars and return the start of the name.
///
/// Only letters, digits and `_` count here; `$` is a JavaScript identifier
/// char but the editor treats it as a word boundary when completing.
pub fn find_start_of_name(content: &str, offset: usize) -> usize {
    let mut start = floor_char_boundary(content, offset);
    while let Some((prev, ch)) = char_before(content, start) {
        if ch.is_alphanumeric() || ch == '_' {
            start = prev;
        } else {
            break;
        }
    }
    start
}

/// The identifier-char word ending at `offset`, with its start offset.
pub fn word_before(content: &str, offset: usize) -> (usize, &str) {
    let end = offset.min(content.len());
    let mut start = end;
    while let Some((prev, ch)) = char_before(content, start) {
        if is_identifier_char(ch) {
            start = prev;
        } else {
            break;
        }
    }
    (start, content.get(start..end).unwrap_or(""))
}

/// Longest common prefix of a set of strings, on char boundaries.
pub fn common_prefix<'a>(words: impl IntoIterator<Item = &'a str>) -> String {
    let mut iter = words.into_iter();
    let Some(first) = iter.next() else {
        return String::new();
    };
    let mut prefix_len = first.len();
    for word in iter {
        let shared = first
            .char_indices()
            .zip(word.chars())
            .find(|((_, a), b)| a != b)
            .map(|((i, _), _)| i)
            .unwrap_or_else(|| first.len().min(word.len()));
        prefix_len = prefix_len.min(shared);
    }
    first[..prefix_len].to_string()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    mod position_tests {
        use super::*;

        #[test]
        fn offset_to_position_simple() {
            let content = "Item {\n    width: 10\n}\n";
            assert_eq!(byte_offset_to_position_str(content, 0), (1, 1));
            assert_eq!(byte_offset_to_position_str(content, 5), (1, 6));
            assert_eq!(byte_offset_to_position_str(content, 7), (2, 1));
        }

        #[test]
        fn position_to_offset_simple() {
            let content = "Item {\n    width: 10\n}\n";
            assert_eq!(position_to_byte_offset_str(content, 1, 1), 0);
            assert_eq!(position_to_byte_offset_str(content, 2, 5), 11);
            assert_eq!(position_to_byte_offset_str(content, 3, 1), 21);
        }

        #[test]
        fn roundtrip_str_based() {
            let content = "a.b\nfoo(bar)\n";
            for offset in 0..content.len() {
                let (line, col) = byte_offset_to_position_str(content, offset);
                assert_eq!(position_to_byte_offset_str(content, line, col), offset);
            }
        }

        #[test]
        fn col_beyond_line_end_clamps() {
            let content = "short\nline\n";
            assert_eq!(position_to_byte_offset_str(content, 1, 100), 5);
            assert_eq!(position_to_byte_offset_str(content, 9, 1), content.len());
        }

        #[test]
        fn multibyte_columns_count_chars() {
            let content = "é.x";
            assert_eq!(byte_offset_to_position_str(content, 2), (1, 2));
            assert_eq!(position_to_byte_offset_str(content, 1, 3), 3);
        }
    }

    mod char_access_tests {
        use super::*;

        #[test]
        fn char_before_and_at() {
            let content = "ab.é";
            assert_eq!(char_at(content, 2), Some('.'));
            assert_eq!(char_before(content, 3), Some((2, '.')));
            assert_eq!(char_before(content, 5), Some((3, 'é')));
            assert_eq!(char_before(content, 0), None);
            // inside a multibyte char
            assert_eq!(char_at(content, 4), None);
            assert_eq!(char_at(content, 99), None);
        }

        #[test]
        fn line_start_finds_previous_newline() {
            let content = "one\n  #inc";
            assert_eq!(line_start(content, 8), 4);
            assert_eq!(line_start(content, 2), 0);
        }
    }

    mod identifier_tests {
        use super::*;

        #[test]
        fn identifier_chars() {
            assert!(is_identifier_char('$'));
            assert!(is_identifier_char('_'));
            assert!(is_identifier_char('7'));
            assert!(!is_identifier_char('.'));
        }

        #[test]
        fn start_of_identifier() {
            assert!(check_start_of_identifier("_x"));
            assert!(check_start_of_identifier("$x"));
            assert!(check_start_of_identifier("abc"));
            assert!(!check_start_of_identifier("1abc"));
            assert!(!check_start_of_identifier(""));
        }

        #[test]
        fn start_of_name_stops_at_operator() {
            let content = "foo.barb";
            assert_eq!(find_start_of_name(content, 8), 4);
            assert_eq!(find_start_of_name(content, 4), 4);
        }

        #[test]
        fn start_of_name_from_inside_a_multibyte_char() {
            let content = "größe";
            assert_eq!(floor_char_boundary(content, 3), 2);
            assert_eq!(floor_char_boundary(content, 99), content.len());
            assert_eq!(find_start_of_name(content, 3), 0);
        }

        #[test]
        fn word_before_includes_dollar() {
            let content = "x = $ref";
            assert_eq!(word_before(content, 8), (4, "$ref"));
        }

        #[test]
        fn common_prefix_of_words() {
            assert_eq!(common_prefix(["property", "prompt", "prop"]), "pro");
            assert_eq!(common_prefix(["a"]), "a");
            assert_eq!(common_prefix(Vec::<&str>::new()), "");
            assert_eq!(common_prefix(["xy", "ab"]), "");
        }
    }
}
