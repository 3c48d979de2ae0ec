//! C++ completion collector.
//!
//! The operator before the typed name picks the completion:
//!
//! | Before the name | Offered |
//! |-----------------|---------|
//! | `.` / `->` | members of the expression's type |
//! | `::` | members of the namespace or class, or globals after a bare `::` |
//! | `(` with nothing typed | argument hint only; no list |
//! | `SIGNAL(` / `SLOT(` | Qt signals / slots of the sender or receiver |
//! | `#` at line start | preprocessor directives |
//! | `#include "` / `#include <` | file names from the snapshot |
//! | anything else | scope symbols, macros and keywords |

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::debug;

use tugsense_core::builder::DocumentBuilder;
use tugsense_core::completion::trigger::{identifier_triggers, in_comment_or_string};
use tugsense_core::completion::{
    CompletionCollector, CompletionItem, CompletionOrder, CompletionSession, FunctionHint,
    IconKind, Payload, TextEditor,
};
use tugsense_core::config::CompletionConfig;
use tugsense_core::cursor::expression_before;
use tugsense_core::document::{Document, Language, ValueHandle};
use tugsense_core::enumerate::{
    Candidate, EnumerateOptions, LookupMode, MemberEnumerator, Members,
};
use tugsense_core::expr::Dialect;
use tugsense_core::scope::{CursorPosition, ScopeChain, ScopeResolver};
use tugsense_core::snapshot::{Snapshot, SnapshotStore};
use tugsense_core::text::{char_before, find_start_of_name, floor_char_boundary, line_start};
use tugsense_core::value::{FunctionValue, MemberCategory, Value};

use crate::keywords::{KEYWORDS, PREPROCESSOR_DIRECTIVES};
use crate::type_of::{PreprocessMode, TypeOfExpression};

// ============================================================================
// Completion Operator
// ============================================================================

/// What precedes the name being completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionOperator {
    /// No operator: global completion.
    None,
    Dot,
    Arrow,
    ColonColon,
    LeftParen,
    /// `#` at the start of a line.
    Pound,
    /// Inside `#include "...`.
    IncludeQuote,
    /// Inside `#include <...`.
    IncludeAngle,
    /// Inside `SIGNAL(`.
    Signal,
    /// Inside `SLOT(`.
    Slot,
}

impl CompletionOperator {
    /// Length of the operator token before the name.
    fn token_len(self) -> usize {
        match self {
            CompletionOperator::Arrow | CompletionOperator::ColonColon => 2,
            CompletionOperator::None
            | CompletionOperator::IncludeQuote
            | CompletionOperator::IncludeAngle => 0,
            _ => 1,
        }
    }
}

/// The completion operator at `cursor` and where the replaced span starts.
pub fn completion_operator(text: &str, cursor: usize) -> (CompletionOperator, usize) {
    let cursor = floor_char_boundary(text, cursor);
    let line_begin = line_start(text, cursor);
    let line = text.get(line_begin..cursor).unwrap_or("");

    if let Some(directive) = line.trim_start().strip_prefix('#') {
        if let Some(argument) = directive.trim_start().strip_prefix("include") {
            let argument = argument.trim_start();
            let after_open = cursor - argument.len() + 1;
            if let Some(typed) = argument.strip_prefix('"') {
                if !typed.contains('"') {
                    return (CompletionOperator::IncludeQuote, after_open);
                }
            } else if let Some(typed) = argument.strip_prefix('<') {
                if !typed.contains('>') {
                    return (CompletionOperator::IncludeAngle, after_open);
                }
            }
        }
    }

    let start = find_start_of_name(text, cursor);
    let before = &text[..start];
    if before[line_begin..].trim() == "#" {
        return (CompletionOperator::Pound, start);
    }
    if before.ends_with("->") {
        return (CompletionOperator::Arrow, start);
    }
    if before.ends_with("::") {
        return (CompletionOperator::ColonColon, start);
    }
    if before.ends_with('.') {
        let (_, number) = expression_before(text, start - 1, Dialect::Cpp);
        if number.starts_with(|c: char| c.is_ascii_digit()) {
            return (CompletionOperator::None, start);
        }
        return (CompletionOperator::Dot, start);
    }
    if let Some(call) = before.strip_suffix('(') {
        let call = call.trim_end();
        if ends_with_word(call, "SIGNAL") {
            return (CompletionOperator::Signal, start);
        }
        if ends_with_word(call, "SLOT") {
            return (CompletionOperator::Slot, start);
        }
        if start == cursor {
            return (CompletionOperator::LeftParen, start);
        }
    }
    (CompletionOperator::None, start)
}

fn ends_with_word(text: &str, word: &str) -> bool {
    text.strip_suffix(word).is_some_and(|head| {
        !head
            .chars()
            .next_back()
            .is_some_and(|c| c.is_alphanumeric() || c == '_')
    })
}

// ============================================================================
// Collector
// ============================================================================

/// Completion for C++ documents.
#[derive(Debug)]
pub struct CppCompletion {
    session: CompletionSession,
}

impl CppCompletion {
    /// A collector over a pinned snapshot.
    pub fn new(config: CompletionConfig, snapshot: Arc<Snapshot>) -> Self {
        CppCompletion {
            session: CompletionSession::new(config, snapshot),
        }
    }

    /// A collector pinned to the store's current snapshot.
    pub fn from_store(config: CompletionConfig, store: &SnapshotStore) -> Self {
        CppCompletion::new(config, store.snapshot())
    }

    /// Commit `item` because `typed` was typed; the typed char is inserted
    /// after the item.
    pub fn complete_typed(&mut self, editor: &mut dyn TextEditor, item: &CompletionItem, typed: char) {
        self.session
            .replace_typed(editor, &format!("{}{typed}", item.text));
        if typed == '.' {
            self.session.request_restart();
        }
    }

    fn collect(
        &mut self,
        chain: &ScopeChain<'_>,
        text: &str,
        operator: CompletionOperator,
        start: usize,
    ) -> Vec<CompletionItem> {
        let config = self.session.config();
        let type_of = TypeOfExpression::new(chain, config.max_macro_expansion_depth);
        let member_options = EnumerateOptions {
            include_signals: true,
            lookup_mode: LookupMode::Cpp,
            viewer: chain.class_context(),
            keys_companion_suffix: config.keys_companion_suffix.clone(),
            ..EnumerateOptions::default()
        };
        let operator_start = start - operator.token_len();

        match operator {
            CompletionOperator::Dot | CompletionOperator::Arrow => {
                complete_member(&type_of, text, operator_start, member_options)
            }
            CompletionOperator::ColonColon => {
                let (_, expression) = expression_before(text, operator_start, Dialect::Cpp);
                if expression.is_empty() {
                    let enumerator =
                        MemberEnumerator::new(type_of.evaluator().lookup(), member_options);
                    let frames: Vec<_> = chain.global().into_iter().cloned().collect();
                    symbol_items(&enumerator.enumerate_frames(&frames))
                } else {
                    complete_member(&type_of, text, operator_start, member_options)
                }
            }
            CompletionOperator::LeftParen => {
                if let Some(hint) = self.function_hint(&type_of, text, start) {
                    self.session.show_hint(hint);
                }
                Vec::new()
            }
            CompletionOperator::Signal | CompletionOperator::Slot => {
                complete_qt_method(&type_of, chain, text, operator_start, operator, member_options)
            }
            CompletionOperator::Pound => PREPROCESSOR_DIRECTIVES
                .iter()
                .map(|d| CompletionItem::new(*d, CompletionOrder::Keyword, IconKind::Keyword))
                .collect(),
            CompletionOperator::IncludeQuote | CompletionOperator::IncludeAngle => {
                complete_include(chain.snapshot(), chain.document(), operator)
            }
            CompletionOperator::None => {
                let options = EnumerateOptions {
                    global_completion: true,
                    keep_enumerators_in_global: config.enumerators_in_global,
                    ..member_options
                };
                let enumerator = MemberEnumerator::new(type_of.evaluator().lookup(), options);
                let mut items = symbol_items(&enumerator.enumerate_chain());
                items.extend(macro_items(&type_of));
                items.extend(
                    KEYWORDS
                        .iter()
                        .map(|k| CompletionItem::new(*k, CompletionOrder::Keyword, IconKind::Keyword)),
                );
                items
            }
        }
    }

    /// Argument hint for the call whose `(` ends just before `start`.
    fn function_hint(
        &self,
        type_of: &TypeOfExpression<'_, '_>,
        text: &str,
        start: usize,
    ) -> Option<FunctionHint> {
        let (_, expression) = expression_before(text, start - 1, Dialect::Cpp);
        if expression.is_empty() {
            return None;
        }
        let lookup = type_of.evaluator().lookup();
        let mut name = String::new();
        let mut overloads = Vec::new();
        for item in type_of.evaluate(expression, PreprocessMode::Preprocess) {
            let Some(handle) = item.ty.handle() else {
                continue;
            };
            match handle.value() {
                Value::Function(function) => {
                    name = function.name.clone();
                    overloads.push(argument_names(function));
                }
                Value::Object(object) => {
                    name = object.class_name.clone();
                    for hit in lookup.find_member(handle, &object.class_name) {
                        let constructor = hit
                            .member
                            .value
                            .and_then(|id| hit.owner.sibling(id).value().as_function());
                        if let Some(function) = constructor {
                            overloads.push(argument_names(function));
                        }
                    }
                }
                _ => {}
            }
        }
        if overloads.is_empty() {
            debug!(expression, "no callable for argument hint");
            return None;
        }
        Some(FunctionHint::overloaded(
            name,
            overloads,
            start,
            self.session.config().min_hint_parameters,
        ))
    }
}

impl CompletionCollector for CppCompletion {
    fn session(&self) -> &CompletionSession {
        &self.session
    }

    fn session_mut(&mut self) -> &mut CompletionSession {
        &mut self.session
    }

    fn supports(&self, editor: &dyn TextEditor) -> bool {
        Language::from_path(editor.path()) == Some(Language::Cpp)
    }

    fn triggers_completion(&self, editor: &dyn TextEditor) -> bool {
        let text = editor.text();
        let cursor = floor_char_boundary(text, editor.position());
        let (operator, start) = completion_operator(text, cursor);
        match operator {
            CompletionOperator::IncludeQuote | CompletionOperator::IncludeAngle => {
                matches!(char_before(text, cursor), Some((_, '"' | '<' | '/')))
            }
            CompletionOperator::None => {
                identifier_triggers(text, cursor, self.session.config())
                    && !in_comment_or_string(text, cursor, Dialect::Cpp)
            }
            _ if start == cursor => !in_comment_or_string(text, cursor, Dialect::Cpp),
            _ => false,
        }
    }

    fn start_completion(&mut self, editor: &dyn TextEditor) -> Option<usize> {
        let snapshot = Arc::clone(self.session.snapshot());
        let text = editor.text();
        let cursor = floor_char_boundary(text, editor.position());
        let (operator, start) = completion_operator(text, cursor);
        self.session.begin(start);

        let unparsed: Document;
        let doc = match snapshot.document(editor.path()) {
            Some(doc) => doc.as_ref(),
            None => {
                debug!(path = editor.path(), "document not in snapshot");
                unparsed = DocumentBuilder::new(editor.path(), Language::Cpp)
                    .source(text)
                    .finish();
                &unparsed
            }
        };
        let chain = ScopeResolver::new(&snapshot).resolve(doc, CursorPosition::Offset(cursor));
        let items = self.collect(&chain, text, operator, start);
        debug!(?operator, items = items.len(), "c++ completion");
        self.session.extend(items);
        if operator == CompletionOperator::LeftParen {
            return None;
        }
        self.session.finish()
    }

    fn typed_char_completes(&self, _item: &CompletionItem, ch: char) -> bool {
        matches!(ch, '(' | '.')
    }

    fn complete(&mut self, editor: &mut dyn TextEditor, item: &CompletionItem) {
        let auto_parens = self.session.config().auto_insert_parens;
        match &item.payload {
            Some(Payload::Call { has_params }) if auto_parens => {
                if editor.char_at(editor.position()) == Some('(') {
                    self.session.replace_typed(editor, &item.text);
                    return;
                }
                self.session
                    .replace_typed(editor, &format!("{}()", item.text));
                if *has_params {
                    let inside = editor.position() - 1;
                    editor.set_position(inside);
                }
            }
            _ => self.session.replace_typed(editor, &item.text),
        }
    }
}

// ============================================================================
// Collection
// ============================================================================

fn complete_member<'s>(
    type_of: &TypeOfExpression<'_, 's>,
    text: &str,
    operator_start: usize,
    options: EnumerateOptions<'s>,
) -> Vec<CompletionItem> {
    let (_, expression) = expression_before(text, operator_start, Dialect::Cpp);
    if expression.is_empty() {
        return Vec::new();
    }
    let objects = objects_of(type_of, expression);
    let enumerator = MemberEnumerator::new(type_of.evaluator().lookup(), options);
    symbol_items(&enumerator.enumerate_values(&objects))
}

fn objects_of<'s>(type_of: &TypeOfExpression<'_, 's>, expression: &str) -> Vec<ValueHandle<'s>> {
    type_of
        .evaluate(expression, PreprocessMode::Preprocess)
        .iter()
        .filter_map(|item| type_of.evaluator().convert_to_object(&item.ty))
        .collect()
}

/// Signals (`SIGNAL(`) or slots (`SLOT(`) of the object passed before the
/// macro, or of `this` when no object precedes it.
fn complete_qt_method<'s>(
    type_of: &TypeOfExpression<'_, 's>,
    chain: &ScopeChain<'s>,
    text: &str,
    paren: usize,
    operator: CompletionOperator,
    options: EnumerateOptions<'s>,
) -> Vec<CompletionItem> {
    let (wanted, icon, keyword) = match operator {
        CompletionOperator::Signal => (MemberCategory::Signal, IconKind::Signal, "SIGNAL"),
        _ => (MemberCategory::Slot, IconKind::Slot, "SLOT"),
    };
    let macro_start = text[..paren].trim_end().len() - keyword.len();
    let before = text[..macro_start].trim_end();
    let mut objects = match before.strip_suffix(',') {
        Some(argument) => {
            let argument = argument.trim_end();
            let (_, expression) = expression_before(argument, argument.len(), Dialect::Cpp);
            objects_of(type_of, expression)
        }
        None => Vec::new(),
    };
    if objects.is_empty() {
        objects.extend(chain.this_object());
    }

    let enumerator = MemberEnumerator::new(type_of.evaluator().lookup(), options);
    enumerator
        .enumerate_values(&objects)
        .values()
        .filter(|candidate| candidate.category == wanted)
        .filter_map(function_of)
        .map(|function| CompletionItem::new(qt_signature(function), CompletionOrder::Symbol, icon))
        .collect()
}

fn complete_include(
    snapshot: &Snapshot,
    current: &Document,
    operator: CompletionOperator,
) -> Vec<CompletionItem> {
    let dir = current.directory();
    let mut names = BTreeSet::new();
    for doc in snapshot.documents() {
        if doc.language != Language::Cpp || doc.path == current.path {
            continue;
        }
        let relative = if dir.is_empty() {
            Some(doc.path.as_str())
        } else {
            doc.path
                .strip_prefix(dir)
                .and_then(|rest| rest.strip_prefix('/'))
        };
        match operator {
            CompletionOperator::IncludeQuote => {
                names.insert(relative.unwrap_or(doc.path.as_str()));
            }
            _ => {
                names.insert(doc.path.as_str());
                names.insert(doc.file_name());
            }
        }
    }
    names
        .into_iter()
        .map(|name| CompletionItem::new(name, CompletionOrder::Symbol, IconKind::Include))
        .collect()
}

fn macro_items(type_of: &TypeOfExpression<'_, '_>) -> Vec<CompletionItem> {
    let macros = type_of.macros();
    macros
        .names()
        .filter_map(|name| macros.get(name))
        .map(|def| {
            CompletionItem::new(def.name.as_str(), CompletionOrder::Symbol, IconKind::Macro)
                .with_details(def.body.as_str())
        })
        .collect()
}

fn symbol_items(members: &Members<'_>) -> Vec<CompletionItem> {
    members
        .iter()
        .map(|(name, candidate)| symbol_item(name, candidate))
        .collect()
}

fn symbol_item(name: &str, candidate: &Candidate<'_>) -> CompletionItem {
    let value = candidate
        .member
        .and_then(|member| member.value)
        .map(|id| candidate.declaring.sibling(id).value());
    let icon = match (candidate.category, value) {
        (MemberCategory::Type, Some(Value::Enumerator(_))) => IconKind::Enum,
        (category, _) => IconKind::for_category(category),
    };
    let item = CompletionItem::new(name, CompletionOrder::Symbol, icon);
    if let Some(function) = function_of(candidate) {
        return item
            .with_payload(Payload::Call {
                has_params: function.argument_count() > 0,
            })
            .with_details(function.signature());
    }
    match candidate.member.and_then(|member| member.type_ref.as_ref()) {
        Some(type_ref) => item.with_details(type_ref.to_string()),
        None => item,
    }
}

fn function_of<'s>(candidate: &Candidate<'s>) -> Option<&'s FunctionValue> {
    let id = candidate.member?.value?;
    candidate.declaring.sibling(id).value().as_function()
}

fn argument_names(function: &FunctionValue) -> Vec<String> {
    (0..function.argument_count())
        .map(|i| function.argument_name(i))
        .collect()
}

/// Normalized Qt signature: `valueChanged(int,QString)`.
fn qt_signature(function: &FunctionValue) -> String {
    let types: Vec<&str> = function
        .params
        .iter()
        .map(|p| p.type_ref.as_ref().map_or(p.name.as_str(), |t| t.as_str()))
        .collect();
    format!("{}({})", function.name, types.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;

    mod operators {
        use super::*;

        #[test]
        fn member_and_scope_operators() {
            assert_eq!(completion_operator("foo.ba", 6), (CompletionOperator::Dot, 4));
            assert_eq!(completion_operator("p->", 3), (CompletionOperator::Arrow, 3));
            assert_eq!(completion_operator("ns::A", 5), (CompletionOperator::ColonColon, 4));
            assert_eq!(completion_operator("x = 1.", 6), (CompletionOperator::None, 6));
        }

        #[test]
        fn cursor_inside_a_multibyte_char_is_clamped() {
            // 'é' spans bytes 3..5
            assert_eq!(completion_operator("café.x", 4), (CompletionOperator::None, 0));
            assert_eq!(completion_operator("a->é", 4), (CompletionOperator::Arrow, 3));
        }

        #[test]
        fn call_and_qt_macros() {
            assert_eq!(completion_operator("f(", 2), (CompletionOperator::LeftParen, 2));
            assert_eq!(completion_operator("f(ab", 4), (CompletionOperator::None, 2));
            assert_eq!(
                completion_operator("connect(a, SIGNAL(va", 20),
                (CompletionOperator::Signal, 18)
            );
            assert_eq!(completion_operator("x, SLOT(", 8), (CompletionOperator::Slot, 8));
            assert_eq!(completion_operator("MYSLOT(", 7), (CompletionOperator::LeftParen, 7));
        }

        #[test]
        fn preprocessor_lines() {
            assert_eq!(completion_operator("  #inc", 6), (CompletionOperator::Pound, 3));
            assert_eq!(
                completion_operator("#include \"sub/wi", 16),
                (CompletionOperator::IncludeQuote, 10)
            );
            assert_eq!(
                completion_operator("#include <vec", 13),
                (CompletionOperator::IncludeAngle, 10)
            );
            assert_eq!(
                completion_operator("#include \"a.h\" x", 16),
                (CompletionOperator::None, 15)
            );
        }
    }

    #[test]
    fn qt_signatures_use_parameter_types() {
        use tugsense_core::value::{Param, TypeRef};
        let function = FunctionValue {
            params: vec![
                Param::typed("value", TypeRef::new("int")),
                Param::typed("", TypeRef::new("QString")),
            ],
            ..FunctionValue::new("valueChanged")
        };
        assert_eq!(qt_signature(&function), "valueChanged(int,QString)");
    }
}
