//! Keystroke rules shared by the language collectors.

use crate::config::CompletionConfig;
use crate::cursor::{token_class_at, TokenClass};
use crate::expr::Dialect;
use crate::text::{char_at, char_before, check_start_of_identifier, is_delimiter, word_before};

/// Whether the identifier just typed before `cursor` is long enough to open
/// completion.
///
/// The char under the cursor must end the word (whitespace, end of text or
/// a delimiter) and the word must start like an identifier.
pub fn identifier_triggers(text: &str, cursor: usize, config: &CompletionConfig) -> bool {
    let under_cursor = char_at(text, cursor);
    let ends_word = match under_cursor {
        None => true,
        Some(ch) => ch.is_whitespace() || is_delimiter(ch),
    };
    if !ends_word {
        return false;
    }
    let (_, word) = word_before(text, cursor);
    word.chars().count() >= config.identifier_trigger_length && check_start_of_identifier(word)
}

/// Whether the cursor touches a comment or string literal.
pub fn in_comment_or_string(text: &str, cursor: usize, dialect: Dialect) -> bool {
    token_class_at(text, cursor, dialect) != TokenClass::Code
}

/// The rule both dialects share: `.`, `(`, or a long enough identifier,
/// outside comments and strings.
pub fn triggers_completion(
    text: &str,
    cursor: usize,
    dialect: Dialect,
    config: &CompletionConfig,
) -> bool {
    let operator = matches!(char_before(text, cursor), Some((_, '.' | '(')));
    if !operator && !identifier_triggers(text, cursor, config) {
        return false;
    }
    !in_comment_or_string(text, cursor, dialect)
}
