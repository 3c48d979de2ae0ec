//! Where in a QML document the cursor is.
//!
//! [`QmlContext::at`] scans the buffer up to an offset and tracks the
//! nesting of `{ }` blocks. A block opened after a type name (`Rectangle {`,
//! `Behavior on x {`, `gradient: Gradient {`) is a QML object; any other
//! block (function bodies, `onClicked: { ... }`) is script. Inside an object
//! the current statement decides the side of the binding: before its `:`
//! the cursor is on the left-hand side, after it on the right-hand side of
//! the binding to the qualified name before the colon.
//!
//! Statements end at `;`, at braces, and at a newline that follows a
//! complete operand outside parentheses.

use tugsense_core::text::is_identifier_char;

/// Which side of a binding the cursor is on.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BindingSide {
    /// Not directly inside a QML object.
    #[default]
    None,
    /// Where a property name is expected.
    Lhs,
    /// In the value of the binding to the given property path.
    Rhs(Vec<String>),
}

/// Completion context at one offset.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QmlContext {
    /// Type name of the innermost enclosing QML object (`QtQuick.Item`).
    pub object_type: Option<String>,
    pub binding: BindingSide,
    /// Inside a script block (function body or braced binding value).
    pub in_script: bool,
}

impl QmlContext {
    /// The context at `offset` in `text`.
    pub fn at(text: &str, offset: usize) -> Self {
        let end = offset.min(text.len());
        let end = (0..=end).rev().find(|i| text.is_char_boundary(*i)).unwrap_or(0);
        let mut scanner = ContextScanner::default();
        for token in Tokens::new(&text[..end]) {
            scanner.feed(token);
        }
        scanner.finish()
    }

    /// Whether the cursor is inside a QML object definition.
    pub fn is_in_qml_context(&self) -> bool {
        self.object_type.is_some()
    }

    pub fn is_in_lhs_of_binding(&self) -> bool {
        self.binding == BindingSide::Lhs
    }

    pub fn is_in_rhs_of_binding(&self) -> bool {
        matches!(self.binding, BindingSide::Rhs(_))
    }

    /// Property path of the binding whose value holds the cursor.
    pub fn binding_property_name(&self) -> &[String] {
        match &self.binding {
            BindingSide::Rhs(path) => path,
            _ => &[],
        }
    }
}

// ============================================================================
// Block tracking
// ============================================================================

#[derive(Debug, Clone)]
enum Block {
    Object(String),
    /// Script block, with the binding it is the value of, if any.
    Script(Option<Vec<String>>),
}

#[derive(Debug, Default)]
struct ContextScanner<'t> {
    blocks: Vec<Block>,
    statement: Vec<Token<'t>>,
    paren_depth: usize,
}

impl<'t> ContextScanner<'t> {
    fn feed(&mut self, token: Token<'t>) {
        match token {
            Token::Punct('{') => {
                let block = match object_type_before_brace(&self.statement) {
                    Some(type_name) => Block::Object(type_name),
                    None => Block::Script(self.binding_path().or_else(|| self.inherited_binding())),
                };
                self.blocks.push(block);
                self.end_statement();
            }
            Token::Punct('}') => {
                self.blocks.pop();
                self.end_statement();
            }
            Token::Punct(';') if self.paren_depth == 0 => self.end_statement(),
            Token::Newline => {
                if self.paren_depth == 0 && self.statement.last().is_some_and(Token::ends_operand) {
                    self.end_statement();
                }
            }
            Token::Punct('(' | '[') => {
                self.paren_depth += 1;
                self.statement.push(token);
            }
            Token::Punct(')' | ']') => {
                self.paren_depth = self.paren_depth.saturating_sub(1);
                self.statement.push(token);
            }
            _ => self.statement.push(token),
        }
    }

    fn end_statement(&mut self) {
        self.statement.clear();
        self.paren_depth = 0;
    }

    /// Qualified name before the statement's first top-level `:`.
    fn binding_path(&self) -> Option<Vec<String>> {
        let colon = self
            .statement
            .iter()
            .position(|t| *t == Token::Punct(':'))?;
        let mut path = Vec::new();
        let mut expect_name = true;
        for token in self.statement[..colon].iter().rev() {
            match (token, expect_name) {
                (Token::Word(word), true) => {
                    path.push(word.to_string());
                    expect_name = false;
                }
                (Token::Punct('.'), false) => expect_name = true,
                _ => break,
            }
        }
        path.reverse();
        Some(path)
    }

    fn inherited_binding(&self) -> Option<Vec<String>> {
        match self.blocks.last() {
            Some(Block::Script(binding)) => binding.clone(),
            _ => None,
        }
    }

    fn finish(self) -> QmlContext {
        let object_type = self.blocks.iter().rev().find_map(|block| match block {
            Block::Object(name) => Some(name.clone()),
            Block::Script(_) => None,
        });
        match self.blocks.last() {
            Some(Block::Object(_)) => QmlContext {
                binding: match self.binding_path() {
                    Some(path) => BindingSide::Rhs(path),
                    None => BindingSide::Lhs,
                },
                object_type,
                in_script: false,
            },
            Some(Block::Script(binding)) => QmlContext {
                binding: match binding {
                    Some(path) if object_type.is_some() => BindingSide::Rhs(path.clone()),
                    _ => BindingSide::None,
                },
                object_type,
                in_script: true,
            },
            None => QmlContext::default(),
        }
    }
}

/// Type name when the statement so far opens an object: a qualified name
/// whose last segment starts uppercase, optionally followed by `on prop`.
fn object_type_before_brace(statement: &[Token<'_>]) -> Option<String> {
    let value = match statement.iter().position(|t| *t == Token::Punct(':')) {
        Some(colon) => &statement[colon + 1..],
        None => statement,
    };
    let mut segments = Vec::new();
    let mut i = 0;
    while let Some(Token::Word(word)) = value.get(i) {
        segments.push(*word);
        i += 1;
        if value.get(i) != Some(&Token::Punct('.')) {
            break;
        }
        i += 1;
    }
    let trailing = &value[i.min(value.len())..];
    if !matches!(trailing, [] | [Token::Word("on"), Token::Word(_)]) {
        return None;
    }
    let last = segments.last()?;
    if !last.starts_with(char::is_uppercase) {
        return None;
    }
    Some(segments.join("."))
}

// ============================================================================
// Tokens
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'t> {
    Word(&'t str),
    Number,
    Str,
    Punct(char),
    Newline,
}

impl Token<'_> {
    fn ends_operand(&self) -> bool {
        matches!(
            self,
            Token::Word(_) | Token::Number | Token::Str | Token::Punct(')' | ']')
        )
    }
}

/// Forward tokenizer that drops comments and whitespace other than
/// newlines.
struct Tokens<'t> {
    text: &'t str,
    pos: usize,
}

impl<'t> Tokens<'t> {
    fn new(text: &'t str) -> Self {
        Tokens { text, pos: 0 }
    }

    fn skip_while(&mut self, keep: impl Fn(char) -> bool) {
        let rest = &self.text[self.pos..];
        self.pos += rest.find(|c: char| !keep(c)).unwrap_or(rest.len());
    }

    fn skip_string(&mut self, quote: char) {
        let mut escaped = false;
        for (i, ch) in self.text[self.pos..].char_indices() {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == quote || ch == '\n' {
                self.pos += i + ch.len_utf8();
                return;
            }
        }
        self.pos = self.text.len();
    }
}

impl<'t> Iterator for Tokens<'t> {
    type Item = Token<'t>;

    fn next(&mut self) -> Option<Token<'t>> {
        loop {
            let rest = &self.text[self.pos..];
            let ch = rest.chars().next()?;
            if ch == '\n' {
                self.pos += 1;
                return Some(Token::Newline);
            }
            if ch.is_whitespace() {
                self.pos += ch.len_utf8();
                continue;
            }
            if rest.starts_with("//") {
                self.skip_while(|c| c != '\n');
                continue;
            }
            if rest.starts_with("/*") {
                self.pos += rest[2..].find("*/").map_or(rest.len(), |i| i + 4);
                continue;
            }
            if ch == '"' || ch == '\'' || ch == '`' {
                self.pos += 1;
                self.skip_string(ch);
                return Some(Token::Str);
            }
            if ch.is_ascii_digit() {
                self.skip_while(|c| c.is_alphanumeric() || c == '.');
                return Some(Token::Number);
            }
            if is_identifier_char(ch) {
                let start = self.pos;
                self.skip_while(is_identifier_char);
                return Some(Token::Word(&self.text[start..self.pos]));
            }
            self.pos += ch.len_utf8();
            return Some(Token::Punct(ch));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(text: &str) -> QmlContext {
        QmlContext::at(text, text.len())
    }

    fn path(names: &[&str]) -> BindingSide {
        BindingSide::Rhs(names.iter().map(|s| s.to_string()).collect())
    }

    mod sides {
        use super::*;

        #[test]
        fn property_name_position_is_lhs() {
            let ctx = context("import QtQuick 1.0\nRectangle {\n    width: 10\n    ");
            assert_eq!(ctx.object_type.as_deref(), Some("Rectangle"));
            assert!(ctx.is_in_lhs_of_binding());
            assert!(ctx.binding_property_name().is_empty());
        }

        #[test]
        fn after_colon_is_rhs_with_path() {
            let ctx = context("Item {\n    anchors.fill: ");
            assert_eq!(ctx.binding, path(&["anchors", "fill"]));
            let ctx = context("Text { font.pixelSize: 10; horizontalAlignment: ");
            assert_eq!(ctx.binding, path(&["horizontalAlignment"]));
        }

        #[test]
        fn continued_expressions_stay_rhs() {
            let ctx = context("Item {\n    width: parent.width +\n        ");
            assert_eq!(ctx.binding, path(&["width"]));
            let ctx = context("Item {\n    width: Math.max(1,\n        ");
            assert_eq!(ctx.binding, path(&["width"]));
        }

        #[test]
        fn member_access_on_lhs() {
            let ctx = context("Text {\n    font.");
            assert!(ctx.is_in_lhs_of_binding());
        }
    }

    mod blocks {
        use super::*;

        #[test]
        fn nested_objects_use_innermost_type() {
            let ctx = context("Rectangle {\n  gradient: Gradient {\n    GradientStop { ");
            assert_eq!(ctx.object_type.as_deref(), Some("GradientStop"));
            let ctx = context("Rectangle {\n  Item { }\n  ");
            assert_eq!(ctx.object_type.as_deref(), Some("Rectangle"));
        }

        #[test]
        fn qualified_and_on_types() {
            let ctx = context("QtQuick.Item {\n  Behavior on x { ");
            assert_eq!(ctx.object_type.as_deref(), Some("Behavior"));
            let ctx = context("QtQuick.Item { ");
            assert_eq!(ctx.object_type.as_deref(), Some("QtQuick.Item"));
        }

        #[test]
        fn script_blocks_inherit_the_binding() {
            let ctx = context("MouseArea {\n  onClicked: {\n    if (x) {\n      ");
            assert!(ctx.in_script);
            assert_eq!(ctx.binding, path(&["onClicked"]));
            assert_eq!(ctx.object_type.as_deref(), Some("MouseArea"));

            let ctx = context("Item {\n  function f() {\n    ");
            assert!(ctx.in_script);
            assert_eq!(ctx.binding, BindingSide::None);
        }

        #[test]
        fn comments_and_strings_are_ignored() {
            let ctx = context("Item {\n  // Other {\n  text: \"Fake {\"\n  ");
            assert_eq!(ctx.object_type.as_deref(), Some("Item"));
            assert!(ctx.is_in_lhs_of_binding());
        }

        #[test]
        fn plain_javascript_has_no_qml_context() {
            let ctx = context("function f(a) {\n  return a.");
            assert!(!ctx.is_in_qml_context());
            assert_eq!(ctx.binding, BindingSide::None);
            assert!(!context("var x = 1;").is_in_qml_context());
        }
    }
}
