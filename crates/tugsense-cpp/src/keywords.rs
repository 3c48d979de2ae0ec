//! Fixed word lists offered by C++ completion.

/// C++ keywords, plus the Qt keywords `moc` understands.
pub const KEYWORDS: &[&str] = &[
    "alignas", "alignof", "asm", "auto", "bool", "break", "case", "catch", "char",
    "char16_t", "char32_t", "class", "const", "const_cast", "constexpr", "continue",
    "decltype", "default", "delete", "do", "double", "dynamic_cast", "else", "enum",
    "explicit", "export", "extern", "false", "float", "for", "friend", "goto", "if",
    "inline", "int", "long", "mutable", "namespace", "new", "noexcept", "nullptr",
    "operator", "private", "protected", "public", "register", "reinterpret_cast",
    "return", "short", "signed", "sizeof", "static", "static_assert", "static_cast",
    "struct", "switch", "template", "this", "thread_local", "throw", "true", "try",
    "typedef", "typeid", "typename", "union", "unsigned", "using", "virtual", "void",
    "volatile", "wchar_t", "while",
    // Qt
    "emit", "foreach", "signals", "slots", "Q_EMIT", "Q_FOREACH", "Q_SIGNALS", "Q_SLOTS",
    "Q_SIGNAL", "Q_SLOT", "Q_INVOKABLE", "Q_OBJECT", "Q_PROPERTY",
];

/// Directives offered after `#` at the start of a line.
pub const PREPROCESSOR_DIRECTIVES: &[&str] = &[
    "define", "error", "include", "line", "pragma", "undef", "if", "ifdef", "ifndef",
    "elif", "else", "endif",
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn lists_have_no_duplicates() {
        for list in [KEYWORDS, PREPROCESSOR_DIRECTIVES] {
            let unique: HashSet<&str> = list.iter().copied().collect();
            assert_eq!(unique.len(), list.len());
        }
    }
}
