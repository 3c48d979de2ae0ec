//! Lexical questions about the text around the cursor.
//!
//! Two scanners, both tolerant of malformed text:
//!
//! - [`token_class_at`] scans forward from the start of the buffer and
//!   reports whether the cursor touches a comment or string token.
//! - [`expression_before`] scans backward from a completion operator and
//!   extracts the expression fragment it applies to (`a.b(c)[d]` in
//!   `a.b(c)[d].`).

use crate::expr::Dialect;
use crate::text::{char_at, char_before, is_identifier_char};
use crate::types::Span;

// ============================================================================
// Token classes
// ============================================================================

/// Lexical class of the token under the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenClass {
    Code,
    Comment,
    String,
}

#[derive(Debug, Clone, Copy)]
struct Token {
    span: Span,
    class: TokenClass,
}

/// Class of the first token whose span touches `offset`, ends included.
///
/// Whitespace belongs to no token and reads as code.
pub fn token_class_at(text: &str, offset: usize, dialect: Dialect) -> TokenClass {
    scan_tokens(text, dialect)
        .into_iter()
        .find(|token| token.span.start <= offset && offset <= token.span.end)
        .map_or(TokenClass::Code, |token| token.class)
}

fn scan_tokens(text: &str, dialect: Dialect) -> Vec<Token> {
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;
    while pos < bytes.len() {
        let start = pos;
        let class = match bytes[pos] {
            b'/' if bytes.get(pos + 1) == Some(&b'/') => {
                pos = line_comment_end(text, pos, dialect);
                TokenClass::Comment
            }
            b'/' if bytes.get(pos + 1) == Some(&b'*') => {
                pos = text[pos + 2..]
                    .find("*/")
                    .map_or(bytes.len(), |close| pos + 2 + close + 2);
                TokenClass::Comment
            }
            quote @ (b'"' | b'\'') => {
                pos = skip_string_forward(bytes, pos, quote);
                TokenClass::String
            }
            b if b.is_ascii_whitespace() => {
                pos += 1;
                continue;
            }
            _ => {
                let ch_len = text[pos..].chars().next().map_or(1, char::len_utf8);
                let is_word = text[pos..].chars().next().is_some_and(is_identifier_char);
                pos += ch_len;
                if is_word {
                    while let Some(ch) = char_at(text, pos) {
                        if !is_identifier_char(ch) {
                            break;
                        }
                        pos += ch.len_utf8();
                    }
                }
                TokenClass::Code
            }
        };
        tokens.push(Token {
            span: Span::new(start, pos),
            class,
        });
    }
    tokens
}

/// End of the `//` comment starting at `start`. A C++ comment line ending
/// in a backslash continues on the next line.
fn line_comment_end(text: &str, start: usize, dialect: Dialect) -> usize {
    let mut pos = start;
    loop {
        let Some(nl) = text[pos..].find('\n') else {
            return text.len();
        };
        let line_end = pos + nl;
        if dialect == Dialect::Cpp && text[..line_end].ends_with('\\') {
            pos = line_end + 1;
            continue;
        }
        return line_end;
    }
}

/// End of the string literal opening at `start`. Unterminated literals end
/// at the line end.
fn skip_string_forward(bytes: &[u8], start: usize, quote: u8) -> usize {
    let mut pos = start + 1;
    while pos < bytes.len() {
        match bytes[pos] {
            b'\\' => pos += 2,
            b'\n' => return pos,
            b if b == quote => return pos + 1,
            _ => pos += 1,
        }
    }
    bytes.len()
}

// ============================================================================
// Expression under cursor
// ============================================================================

/// The expression fragment ending at byte `end`, with its start offset.
///
/// Walks backward over postfix operands (identifiers followed by balanced
/// `(...)` / `[...]` groups, or a string literal) joined by member operators
/// (`.` in both dialects; `->` and `::` in C++). Whitespace ends the
/// fragment. Returns `(end, "")` when nothing expression-like precedes `end`.
pub fn expression_before(text: &str, end: usize, dialect: Dialect) -> (usize, &str) {
    let end = end.min(text.len());
    if !text.is_char_boundary(end) {
        return (end, "");
    }

    let mut start = end;
    loop {
        let Some(operand_start) = operand_before(text, start) else {
            break;
        };
        start = operand_start;
        match member_operator_before(text, start, dialect) {
            Some(op_start) => {
                // `::name` anchors at the global scope.
                if text[op_start..start].starts_with("::")
                    && operand_before(text, op_start).is_none()
                {
                    start = op_start;
                    break;
                }
                if operand_before(text, op_start).is_none() {
                    break;
                }
                start = op_start;
            }
            None => break,
        }
    }
    (start, &text[start..end])
}

/// Start of the postfix operand ending at `end`.
fn operand_before(text: &str, end: usize) -> Option<usize> {
    let (prev, ch) = char_before(text, end)?;
    match ch {
        '"' | '\'' => string_start_before(text, prev, ch),
        ')' | ']' => {
            let mut pos = end;
            while let Some((_, ch)) = char_before(text, pos) {
                if ch != ')' && ch != ']' {
                    break;
                }
                pos = group_start_before(text, pos)?;
            }
            Some(identifier_start_before(text, pos).unwrap_or(pos))
        }
        ch if is_identifier_char(ch) => identifier_start_before(text, end),
        _ => None,
    }
}

fn identifier_start_before(text: &str, end: usize) -> Option<usize> {
    let mut start = end;
    while let Some((prev, ch)) = char_before(text, start) {
        if !is_identifier_char(ch) {
            break;
        }
        start = prev;
    }
    (start < end).then_some(start)
}

/// Start of the bracket group closing at `end` (the closer is the char
/// just before `end`).
fn group_start_before(text: &str, end: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut pos = end;
    while let Some((prev, ch)) = char_before(text, pos) {
        match ch {
            ')' | ']' => depth += 1,
            '(' | '[' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(prev);
                }
            }
            '"' | '\'' => {
                pos = string_start_before(text, prev, ch)?;
                continue;
            }
            _ => {}
        }
        pos = prev;
    }
    None
}

/// Start of the string literal whose closing quote sits at `close`.
fn string_start_before(text: &str, close: usize, quote: char) -> Option<usize> {
    let mut pos = close;
    while let Some((prev, ch)) = char_before(text, pos) {
        if ch == '\n' {
            return None;
        }
        if ch == quote && !is_escaped(text, prev) {
            return Some(prev);
        }
        pos = prev;
    }
    None
}

fn is_escaped(text: &str, quote_at: usize) -> bool {
    let backslashes = text[..quote_at]
        .bytes()
        .rev()
        .take_while(|b| *b == b'\\')
        .count();
    backslashes % 2 == 1
}

/// Start of the member operator ending at `end`.
fn member_operator_before(text: &str, end: usize, dialect: Dialect) -> Option<usize> {
    let head = &text[..end];
    if dialect == Dialect::Cpp && (head.ends_with("->") || head.ends_with("::")) {
        return Some(end - 2);
    }
    if head.ends_with('.') {
        return Some(end - 1);
    }
    None
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    mod tokens {
        use super::*;

        #[test]
        fn code_outside_literals() {
            assert_eq!(token_class_at("foo.bar", 4, Dialect::QmlJs), TokenClass::Code);
            assert_eq!(token_class_at("", 0, Dialect::QmlJs), TokenClass::Code);
        }

        #[test]
        fn inside_string() {
            let text = r#"text: "abc def"#;
            assert_eq!(token_class_at(text, 10, Dialect::QmlJs), TokenClass::String);
            let closed = r#"x = "ab" + y"#;
            assert_eq!(token_class_at(closed, 6, Dialect::QmlJs), TokenClass::String);
            assert_eq!(token_class_at(closed, 12, Dialect::QmlJs), TokenClass::Code);
        }

        #[test]
        fn inside_comments() {
            let line = "x = 1 // note";
            assert_eq!(token_class_at(line, 13, Dialect::Cpp), TokenClass::Comment);
            let block = "/* abc */ foo";
            assert_eq!(token_class_at(block, 4, Dialect::Cpp), TokenClass::Comment);
            assert_eq!(token_class_at(block, 13, Dialect::Cpp), TokenClass::Code);
        }

        #[test]
        fn cpp_line_comment_continues_after_backslash() {
            let text = "// one \\\ntwo\nthree";
            assert_eq!(token_class_at(text, 9, Dialect::Cpp), TokenClass::Comment);
            assert_eq!(token_class_at(text, 9, Dialect::QmlJs), TokenClass::Code);
        }

        #[test]
        fn escaped_quote_stays_in_string() {
            let text = r#""a\"b c"#;
            assert_eq!(token_class_at(text, 6, Dialect::Cpp), TokenClass::String);
        }
    }

    mod expressions {
        use super::*;

        #[test]
        fn member_chain() {
            let text = "x = foo.bar.";
            let end = text.len() - 1;
            assert_eq!(expression_before(text, end, Dialect::QmlJs), (4, "foo.bar"));
        }

        #[test]
        fn calls_and_subscripts() {
            let text = "  a.b(c, (d))[0]";
            assert_eq!(
                expression_before(text, text.len(), Dialect::QmlJs),
                (2, "a.b(c, (d))[0]")
            );
        }

        #[test]
        fn cpp_operators() {
            let text = "return ::ns::obj->ptr";
            assert_eq!(
                expression_before(text, text.len(), Dialect::Cpp),
                (7, "::ns::obj->ptr")
            );
            // `->` is not a QML/JS operator
            assert_eq!(
                expression_before(text, text.len(), Dialect::QmlJs),
                (18, "ptr")
            );
        }

        #[test]
        fn string_literal_operand() {
            let text = r#"var s = "a(b".len"#;
            assert_eq!(
                expression_before(text, text.len(), Dialect::QmlJs),
                (8, r#""a(b".len"#)
            );
        }

        #[test]
        fn parenthesised_operand() {
            let text = "(a + b).c";
            assert_eq!(
                expression_before(text, text.len(), Dialect::QmlJs),
                (0, "(a + b).c")
            );
        }

        #[test]
        fn nothing_before() {
            assert_eq!(expression_before("x = ", 4, Dialect::QmlJs), (4, ""));
            assert_eq!(expression_before(".foo", 4, Dialect::QmlJs), (1, "foo"));
            assert_eq!(expression_before("a(b", 3, Dialect::QmlJs), (2, "b"));
            assert_eq!(expression_before("abc", 99, Dialect::QmlJs), (0, "abc"));
        }

        #[test]
        fn unbalanced_group_stops() {
            assert_eq!(expression_before("b)", 2, Dialect::QmlJs), (2, ""));
        }
    }
}
