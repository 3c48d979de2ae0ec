//! Macro expansion of expression fragments.
//!
//! Before a C++ fragment is parsed it is expanded against the macros
//! visible from the current document: its own `#define`s and, transitively,
//! those of every included document. Expansion is purely textual:
//!
//! - object-like macros are replaced by their body
//! - function-like macros are replaced only when followed by `(`; arguments
//!   are macro-expanded before substitution, except operands of `#`
//!   (stringification) and `##` (token pasting)
//! - replacement text is rescanned with the macro's own name hidden, so a
//!   self-referential macro expands exactly once
//! - nesting is bounded by a depth limit
//!
//! String and char literals are copied verbatim.

use std::collections::{BTreeMap, HashSet};

use thiserror::Error;
use tracing::{debug, trace};

use tugsense_core::document::{Document, MacroDef};
use tugsense_core::snapshot::Snapshot;

/// Name of the variadic parameter in a macro body.
const VA_ARGS: &str = "__VA_ARGS__";

// ============================================================================
// Errors
// ============================================================================

/// Why a fragment could not be expanded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreprocessError {
    /// Expansion nested deeper than the configured limit.
    #[error("macro `{name}` exceeds the expansion depth limit of {limit}")]
    DepthExceeded { name: String, limit: usize },

    /// A function-like macro invocation has no closing parenthesis.
    #[error("unterminated argument list for macro `{name}`")]
    UnterminatedArguments { name: String },

    /// Wrong number of arguments.
    #[error("macro `{name}` expects {expected} argument(s), got {found}")]
    ArgumentCount {
        name: String,
        expected: usize,
        found: usize,
    },
}

// ============================================================================
// Macro Environment
// ============================================================================

/// Macros visible from one document.
#[derive(Debug, Clone, Default)]
pub struct MacroEnvironment {
    macros: BTreeMap<String, MacroDef>,
}

impl MacroEnvironment {
    /// An empty environment.
    pub fn new() -> Self {
        MacroEnvironment::default()
    }

    /// Macros of `doc` and everything it includes, transitively.
    ///
    /// Included documents are processed before the including document's own
    /// definitions, so a later `#define` replaces an earlier one. Each
    /// document is processed once.
    pub fn for_document(snapshot: &Snapshot, doc: &Document) -> Self {
        let mut env = MacroEnvironment::new();
        let mut processed = HashSet::new();
        env.collect(snapshot, doc, &mut processed);
        debug!(path = %doc.path, macros = env.len(), "macro environment built");
        env
    }

    fn collect<'a>(
        &mut self,
        snapshot: &'a Snapshot,
        doc: &'a Document,
        processed: &mut HashSet<&'a str>,
    ) {
        if !processed.insert(doc.path.as_str()) {
            return;
        }
        for include in &doc.includes {
            if let Some(included) = snapshot.resolve_include(doc, include) {
                self.collect(snapshot, included, processed);
            }
        }
        for def in &doc.macros {
            self.define(def.clone());
        }
    }

    /// Add or replace a definition.
    pub fn define(&mut self, def: MacroDef) {
        self.macros.insert(def.name.clone(), def);
    }

    /// Remove a definition.
    pub fn undefine(&mut self, name: &str) -> Option<MacroDef> {
        self.macros.remove(name)
    }

    /// Look up a macro.
    pub fn get(&self, name: &str) -> Option<&MacroDef> {
        self.macros.get(name)
    }

    /// Defined names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.macros.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.macros.len()
    }

    pub fn is_empty(&self) -> bool {
        self.macros.is_empty()
    }
}

// ============================================================================
// Preprocessor
// ============================================================================

/// Expands fragments against a macro environment.
#[derive(Debug, Clone)]
pub struct Preprocessor {
    env: MacroEnvironment,
    max_depth: usize,
}

impl Preprocessor {
    /// A preprocessor that stops after `max_depth` nested expansions.
    pub fn new(env: MacroEnvironment, max_depth: usize) -> Self {
        Preprocessor { env, max_depth }
    }

    /// The macro environment.
    pub fn environment(&self) -> &MacroEnvironment {
        &self.env
    }

    /// Expand `text`, reporting malformed invocations and runaway nesting.
    pub fn try_expand(&self, text: &str) -> Result<String, PreprocessError> {
        let mut out = String::with_capacity(text.len());
        let mut hidden = Vec::new();
        self.expand_into(text, &mut hidden, 0, &mut out)?;
        Ok(out)
    }

    /// Expand `text`; on failure the fragment is used unexpanded.
    pub fn expand(&self, text: &str) -> String {
        match self.try_expand(text) {
            Ok(expanded) => {
                if expanded != text {
                    trace!(fragment = text, expanded = %expanded, "fragment expanded");
                }
                expanded
            }
            Err(error) => {
                debug!(fragment = text, %error, "macro expansion failed");
                text.to_string()
            }
        }
    }

    fn expand_into<'e>(
        &'e self,
        text: &str,
        hidden: &mut Vec<&'e str>,
        depth: usize,
        out: &mut String,
    ) -> Result<(), PreprocessError> {
        let mut pos = 0;
        while let Some(ch) = text[pos..].chars().next() {
            if ch == '"' || ch == '\'' {
                let end = literal_end(text, pos);
                out.push_str(&text[pos..end]);
                pos = end;
                continue;
            }
            if ch.is_ascii_digit() {
                let end = number_end(text, pos);
                out.push_str(&text[pos..end]);
                pos = end;
                continue;
            }
            if !is_ident_start(ch) {
                out.push(ch);
                pos += ch.len_utf8();
                continue;
            }

            let end = word_end(text, pos);
            let name = &text[pos..end];
            let def = match self.env.get(name) {
                Some(def) if !hidden.iter().any(|h| *h == name) => def,
                _ => {
                    out.push_str(name);
                    pos = end;
                    continue;
                }
            };
            if depth >= self.max_depth {
                return Err(PreprocessError::DepthExceeded {
                    name: name.to_string(),
                    limit: self.max_depth,
                });
            }

            match &def.params {
                None => {
                    hidden.push(def.name.as_str());
                    self.expand_into(&def.body, hidden, depth + 1, out)?;
                    hidden.pop();
                    pos = end;
                }
                Some(params) => {
                    let open = skip_whitespace(text, end);
                    if !text[open..].starts_with('(') {
                        out.push_str(name);
                        pos = end;
                        continue;
                    }
                    let (args, close) = split_arguments(text, open).ok_or_else(|| {
                        PreprocessError::UnterminatedArguments {
                            name: name.to_string(),
                        }
                    })?;
                    let body = self.substitute(def, params, &args, hidden, depth)?;
                    hidden.push(def.name.as_str());
                    self.expand_into(&body, hidden, depth + 1, out)?;
                    hidden.pop();
                    pos = close;
                }
            }
        }
        Ok(())
    }

    /// Replacement text of a function-like invocation, before rescanning.
    fn substitute<'e>(
        &'e self,
        def: &MacroDef,
        params: &[String],
        args: &[&str],
        hidden: &mut Vec<&'e str>,
        depth: usize,
    ) -> Result<String, PreprocessError> {
        let variadic = params.last().is_some_and(|p| p == "...");
        let named = if variadic { params.len() - 1 } else { params.len() };
        let found = if args.len() == 1 && args[0].trim().is_empty() && named == 0 {
            0
        } else {
            args.len()
        };
        if (!variadic && found != named) || (variadic && found < named) {
            return Err(PreprocessError::ArgumentCount {
                name: def.name.clone(),
                expected: named,
                found,
            });
        }

        let raw_arg = |name: &str| -> Option<String> {
            if variadic && name == VA_ARGS {
                let rest: Vec<&str> = args.iter().skip(named).map(|a| a.trim()).collect();
                return Some(rest.join(", "));
            }
            params[..named]
                .iter()
                .position(|p| p == name)
                .map(|i| args[i].trim().to_string())
        };

        let body = def.body.as_str();
        let mut out = String::with_capacity(body.len());
        let mut pos = 0;
        while let Some(ch) = body[pos..].chars().next() {
            if ch == '"' || ch == '\'' {
                let end = literal_end(body, pos);
                out.push_str(&body[pos..end]);
                pos = end;
                continue;
            }
            if ch == '#' && !body[pos..].starts_with("##") && !body[..pos].ends_with('#') {
                let start = skip_whitespace(body, pos + 1);
                let end = word_end(body, start);
                if let Some(raw) = raw_arg(&body[start..end]) {
                    out.push_str(&stringify(&raw));
                    pos = end;
                    continue;
                }
            }
            if !is_ident_start(ch) {
                out.push(ch);
                pos += ch.len_utf8();
                continue;
            }
            let end = word_end(body, pos);
            let word = &body[pos..end];
            match raw_arg(word) {
                Some(raw) if next_to_paste(body, pos, end) => out.push_str(&raw),
                Some(raw) => {
                    let mut expanded = String::new();
                    self.expand_into(&raw, hidden, depth + 1, &mut expanded)?;
                    out.push_str(&expanded);
                }
                None => out.push_str(word),
            }
            pos = end;
        }
        Ok(paste_tokens(&out))
    }
}

// ============================================================================
// Lexical helpers
// ============================================================================

fn is_ident_start(ch: char) -> bool {
    ch == '_' || ch.is_alphabetic()
}

fn word_end(text: &str, start: usize) -> usize {
    text[start..]
        .char_indices()
        .find(|(_, ch)| !(ch.is_alphanumeric() || *ch == '_'))
        .map_or(text.len(), |(i, _)| start + i)
}

fn number_end(text: &str, start: usize) -> usize {
    text[start..]
        .char_indices()
        .find(|(_, ch)| !(ch.is_alphanumeric() || *ch == '_' || *ch == '.'))
        .map_or(text.len(), |(i, _)| start + i)
}

fn skip_whitespace(text: &str, start: usize) -> usize {
    text[start..]
        .char_indices()
        .find(|(_, ch)| !ch.is_whitespace())
        .map_or(text.len(), |(i, _)| start + i)
}

fn literal_end(text: &str, start: usize) -> usize {
    let bytes = text.as_bytes();
    let quote = bytes[start];
    let mut pos = start + 1;
    while pos < bytes.len() {
        match bytes[pos] {
            b'\\' => pos += 2,
            b if b == quote => return pos + 1,
            _ => pos += 1,
        }
    }
    text.len()
}

/// Top-level arguments of the invocation whose `(` is at `open`, and the
/// offset after the closing `)`.
fn split_arguments(text: &str, open: usize) -> Option<(Vec<&str>, usize)> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut args = Vec::new();
    let mut arg_start = open + 1;
    let mut pos = open;
    while pos < bytes.len() {
        match bytes[pos] {
            b'"' | b'\'' => {
                pos = literal_end(text, pos);
                continue;
            }
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => {
                depth -= 1;
                if depth == 0 {
                    args.push(&text[arg_start..pos]);
                    return Some((args, pos + 1));
                }
            }
            b',' if depth == 1 => {
                args.push(&text[arg_start..pos]);
                arg_start = pos + 1;
            }
            _ => {}
        }
        pos += 1;
    }
    None
}

/// Whether the word at `start..end` is an operand of `##`.
fn next_to_paste(body: &str, start: usize, end: usize) -> bool {
    body[..start].trim_end().ends_with("##") || body[end..].trim_start().starts_with("##")
}

/// Join the operands around every `##`.
fn paste_tokens(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(at) = rest.find("##") {
        out.push_str(rest[..at].trim_end());
        rest = rest[at + 2..].trim_start();
    }
    out.push_str(rest);
    out
}

fn stringify(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 2);
    out.push('"');
    for ch in raw.chars() {
        if ch == '"' || ch == '\\' {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tugsense_core::builder::DocumentBuilder;
    use tugsense_core::document::Language;

    fn preprocessor(defs: Vec<MacroDef>) -> Preprocessor {
        let mut env = MacroEnvironment::new();
        for def in defs {
            env.define(def);
        }
        Preprocessor::new(env, 32)
    }

    mod expansion {
        use super::*;

        #[test]
        fn object_like_macros_expand_and_rescan() {
            let pp = preprocessor(vec![
                MacroDef::object("APP", "qApp"),
                MacroDef::object("qApp", "QCoreApplication::instance()"),
            ]);
            assert_eq!(pp.expand("APP->quit"), "QCoreApplication::instance()->quit");
        }

        #[test]
        fn self_reference_expands_once() {
            let pp = preprocessor(vec![
                MacroDef::object("foo", "foo.bar"),
                MacroDef::object("A", "B"),
                MacroDef::object("B", "A"),
            ]);
            assert_eq!(pp.expand("foo"), "foo.bar");
            assert_eq!(pp.expand("A"), "A");
        }

        #[test]
        fn function_like_needs_parenthesis() {
            let pp = preprocessor(vec![MacroDef::function("GET", &["o"], "(o)->get()")]);
            assert_eq!(pp.expand("GET(widget).x"), "(widget)->get().x");
            assert_eq!(pp.expand("GET"), "GET");
        }

        #[test]
        fn arguments_expand_before_substitution() {
            let pp = preprocessor(vec![
                MacroDef::object("W", "window"),
                MacroDef::function("PTR", &["x"], "x.data()"),
            ]);
            assert_eq!(pp.expand("PTR(W)"), "window.data()");
        }

        #[test]
        fn stringify_and_paste() {
            let pp = preprocessor(vec![
                MacroDef::function("STR", &["x"], "#x"),
                MacroDef::function("CAT", &["a", "b"], "a ## b"),
                MacroDef::object("X", "nope"),
            ]);
            assert_eq!(pp.expand("STR(a \"b\")"), "\"a \\\"b\\\"\"");
            assert_eq!(pp.expand("CAT(my, X)"), "myX");
        }

        #[test]
        fn variadic_arguments() {
            let pp = preprocessor(vec![MacroDef::function(
                "CALL",
                &["f", "..."],
                "f(__VA_ARGS__)",
            )]);
            assert_eq!(pp.expand("CALL(g, 1, (2, 3))"), "g(1, (2, 3))");
        }

        #[test]
        fn literals_are_not_expanded() {
            let pp = preprocessor(vec![MacroDef::object("X", "y")]);
            assert_eq!(pp.expand("\"X\" + 'X' + X + 1e5"), "\"X\" + 'X' + y + 1e5");
        }
    }

    mod errors {
        use super::*;

        #[test]
        fn depth_limit_is_reported() {
            let mut env = MacroEnvironment::new();
            env.define(MacroDef::object("A", "B"));
            env.define(MacroDef::object("B", "C"));
            env.define(MacroDef::object("C", "D"));
            let pp = Preprocessor::new(env, 2);
            assert_eq!(
                pp.try_expand("A"),
                Err(PreprocessError::DepthExceeded {
                    name: "C".to_string(),
                    limit: 2
                })
            );
            assert_eq!(pp.expand("A"), "A");
        }

        #[test]
        fn malformed_invocations() {
            let pp = preprocessor(vec![MacroDef::function("F", &["a", "b"], "a + b")]);
            assert_eq!(
                pp.try_expand("F(1"),
                Err(PreprocessError::UnterminatedArguments {
                    name: "F".to_string()
                })
            );
            assert_eq!(
                pp.try_expand("F(1)"),
                Err(PreprocessError::ArgumentCount {
                    name: "F".to_string(),
                    expected: 2,
                    found: 1
                })
            );
        }
    }

    mod environment {
        use super::*;

        #[test]
        fn includes_are_collected_once_and_overridden_locally() {
            let mut header = DocumentBuilder::new("src/widget.h", Language::Cpp);
            header.include("main.cpp");
            header.define(MacroDef::object("VERSION", "1"));
            header.define(MacroDef::object("HEADER_ONLY", "h"));
            let mut main = DocumentBuilder::new("src/main.cpp", Language::Cpp);
            main.include("widget.h");
            main.define(MacroDef::object("VERSION", "2"));
            let snapshot = Snapshot::from_documents([header.finish(), main.finish()]);

            let doc = snapshot.document("src/main.cpp").unwrap();
            let env = MacroEnvironment::for_document(&snapshot, doc);
            assert_eq!(env.names().collect::<Vec<_>>(), vec!["HEADER_ONLY", "VERSION"]);
            assert_eq!(env.get("VERSION").unwrap().body, "2");
        }
    }
}
