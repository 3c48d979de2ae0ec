//! Fixed word lists offered by QML/JS completion.

/// JavaScript keywords.
pub const JS_KEYWORDS: &[&str] = &[
    "break", "case", "catch", "const", "continue", "debugger", "default", "delete", "do",
    "else", "false", "finally", "for", "function", "if", "in", "instanceof", "new", "null",
    "return", "switch", "this", "throw", "true", "try", "typeof", "var", "void", "while",
    "with",
];

/// Words that start QML declarations.
pub const QML_WORDS: &[&str] = &["property", "signal", "import"];

/// QML declaration words that are also JavaScript keywords; offered on their
/// own only where JavaScript keywords are not.
pub const QML_WORDS_ALSO_IN_JS: &[&str] = &["default", "function"];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_words_are_javascript_keywords() {
        for word in QML_WORDS_ALSO_IN_JS {
            assert!(JS_KEYWORDS.contains(word));
        }
        for word in QML_WORDS {
            assert!(!JS_KEYWORDS.contains(word));
        }
    }
}
