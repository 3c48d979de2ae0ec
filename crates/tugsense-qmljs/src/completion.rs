//! QML/JS completion collector.
//!
//! The char before the typed name picks the completion. After whitespace,
//! a delimiter, the start of the buffer, or a `(` followed by a typed name:
//!
//! - on the left-hand side of a binding inside a QML object: `id: `, the
//!   object type's properties as `name: ` (or `name.` for grouped
//!   properties), and the visible QML types
//! - on the right-hand side of a binding to an enumeration property: the
//!   enumeration keys as quoted strings
//! - elsewhere: every name in scope and the JavaScript keywords
//! - in `.qml` files: the QML declaration words and the snippets
//!
//! After `.` the members of the expression's value are offered; after `(`
//! with nothing typed the argument hint opens and no list is shown.

use std::sync::Arc;

use tracing::debug;

use tugsense_core::builder::DocumentBuilder;
use tugsense_core::completion::trigger::triggers_completion;
use tugsense_core::completion::{
    CompletionCollector, CompletionItem, CompletionOrder, CompletionSession, FunctionHint,
    IconKind, Payload, TextEditor,
};
use tugsense_core::config::CompletionConfig;
use tugsense_core::cursor::expression_before;
use tugsense_core::document::{Document, Language, ValueHandle};
use tugsense_core::enumerate::{EnumerateOptions, LookupMode, MemberEnumerator, Members};
use tugsense_core::evaluate::Evaluator;
use tugsense_core::expr::{parse_expression, Dialect};
use tugsense_core::lookup::Lookup;
use tugsense_core::scope::{CursorPosition, FrameKind, ScopeChain, ScopeResolver};
use tugsense_core::snapshot::{Snapshot, SnapshotStore};
use tugsense_core::text::{char_before, find_start_of_name, floor_char_boundary, is_delimiter};
use tugsense_core::types::Span;
use tugsense_core::value::{MemberCategory, TypeRef, Value};

use crate::context::QmlContext;
use crate::keywords::{JS_KEYWORDS, QML_WORDS, QML_WORDS_ALSO_IN_JS};

/// Completion for QML and JavaScript documents.
#[derive(Debug)]
pub struct QmlJsCompletion {
    session: CompletionSession,
}

impl QmlJsCompletion {
    /// A collector over a pinned snapshot.
    pub fn new(config: CompletionConfig, snapshot: Arc<Snapshot>) -> Self {
        QmlJsCompletion {
            session: CompletionSession::new(config, snapshot),
        }
    }

    /// A collector pinned to the store's current snapshot.
    pub fn from_store(config: CompletionConfig, store: &SnapshotStore) -> Self {
        QmlJsCompletion::new(config, store.snapshot())
    }
}

/// Chars after which the scope-level completion runs.
fn opens_scope_completion(operator: Option<char>) -> bool {
    match operator {
        None => true,
        Some(ch) => ch.is_whitespace() || is_delimiter(ch),
    }
}

impl CompletionCollector for QmlJsCompletion {
    fn session(&self) -> &CompletionSession {
        &self.session
    }

    fn session_mut(&mut self) -> &mut CompletionSession {
        &mut self.session
    }

    fn supports(&self, editor: &dyn TextEditor) -> bool {
        matches!(
            Language::from_path(editor.path()),
            Some(Language::Qml | Language::JavaScript)
        )
    }

    fn triggers_completion(&self, editor: &dyn TextEditor) -> bool {
        triggers_completion(
            editor.text(),
            editor.position(),
            Dialect::QmlJs,
            self.session.config(),
        )
    }

    fn start_completion(&mut self, editor: &dyn TextEditor) -> Option<usize> {
        let snapshot = Arc::clone(self.session.snapshot());
        let text = editor.text();
        let cursor = floor_char_boundary(text, editor.position());
        let start = find_start_of_name(text, cursor);
        let operator = char_before(text, start).map(|(_, ch)| ch);
        self.session.begin(start);

        let language = Language::from_path(editor.path()).unwrap_or(Language::JavaScript);
        let is_qml_file = language == Language::Qml;
        let unparsed: Document;
        let doc = match snapshot.document(editor.path()) {
            Some(doc) => doc.as_ref(),
            None => {
                debug!(path = editor.path(), "document not in snapshot");
                unparsed = DocumentBuilder::new(editor.path(), language)
                    .source(text)
                    .finish();
                &unparsed
            }
        };
        let chain = ScopeResolver::new(&snapshot)
            .with_import_paths(&self.session.config().import_paths)
            .resolve(doc, CursorPosition::Offset(cursor));
        let context = QmlContext::at(text, start);
        let request = Request {
            chain: &chain,
            evaluator: Evaluator::new(&chain),
            context,
            config: self.session.config(),
        };

        let scope_completion =
            opens_scope_completion(operator) || (operator == Some('(') && start != cursor);
        if scope_completion {
            let items = request.scope_completion(is_qml_file);
            self.session.extend(items);
        } else if matches!(operator, Some('.' | '(')) {
            let (_, expression) = expression_before(text, start - 1, Dialect::QmlJs);
            if operator == Some('.') {
                let items = request.member_completion(expression);
                self.session.extend(items);
            } else {
                if let Some(hint) = request.function_hint(expression, start) {
                    self.session.show_hint(hint);
                }
                return None;
            }
            return self.session.finish();
        }

        if is_qml_file && opens_scope_completion(operator) {
            let snippets = self.session.snippets_mut();
            snippets.refresh();
            let items = snippets.completion_items();
            self.session.extend(items);
        }
        debug!(?operator, items = self.session.completions().len(), "qml/js completion");
        self.session.finish()
    }

    fn complete(&mut self, editor: &mut dyn TextEditor, item: &CompletionItem) {
        let start = self.session.start_position().unwrap_or(editor.position());
        let cursor = editor.position().max(start);
        if let Some(Payload::Snippet { body }) = &item.payload {
            editor.insert_snippet(Span::new(start, cursor), body);
            return;
        }

        let replaceable = if item.text.ends_with(": ") {
            ": "
        } else if item.text.ends_with('.') {
            "."
        } else {
            ""
        };
        let mut replaced = 0;
        for ch in replaceable.chars() {
            if editor.char_at(cursor + replaced) != Some(ch) {
                break;
            }
            replaced += ch.len_utf8();
        }
        editor.replace(Span::new(start, cursor + replaced), &item.text);

        if item.text.ends_with('.') {
            self.session.request_restart();
        }
    }
}

// ============================================================================
// Collection
// ============================================================================

/// Everything one request collects against.
struct Request<'r, 'c, 's> {
    chain: &'c ScopeChain<'s>,
    evaluator: Evaluator<'c, 's>,
    context: QmlContext,
    config: &'r CompletionConfig,
}

impl<'r, 'c, 's> Request<'r, 'c, 's> {
    fn lookup(&self) -> &Lookup<'c, 's> {
        self.evaluator.lookup()
    }

    fn options(&self) -> EnumerateOptions<'s> {
        let qml_lookup = self.context.is_in_qml_context() && !self.context.in_script;
        EnumerateOptions {
            lookup_mode: if qml_lookup {
                LookupMode::Qml
            } else {
                LookupMode::Js
            },
            keys_companion_suffix: self.config.keys_companion_suffix.clone(),
            ..EnumerateOptions::default()
        }
    }

    /// Type of the innermost enclosing QML object.
    fn qml_scope_type(&self) -> Option<ValueHandle<'s>> {
        let name = self.context.object_type.as_deref()?;
        let resolved = self
            .lookup()
            .resolve_type(&TypeRef::new(name), self.chain.document());
        resolved
            .handle()
            .filter(|handle| handle.object().is_some())
            .or_else(|| self.chain.qml_scope_object())
    }

    fn scope_completion(&self, is_qml_file: bool) -> Vec<CompletionItem> {
        let mut items = Vec::new();
        let mut global = true;
        let mut qml_keywords = true;
        let mut js_keywords = true;
        let scope_type = self.qml_scope_type();

        if let (true, Some(scope_type)) = (self.context.is_in_lhs_of_binding(), scope_type) {
            global = false;
            js_keywords = false;
            items.push(CompletionItem::new("id: ", CompletionOrder::Property, IconKind::Property));
            let options = EnumerateOptions {
                global_completion: true,
                enumerate_generated_slots: true,
                ..self.options()
            };
            let enumerator = MemberEnumerator::new(self.lookup(), options);
            items.extend(self.property_lhs_items(&enumerator.enumerate_value(scope_type)));
            items.extend(self.qml_type_items());
        }

        if let (true, Some(scope_type)) = (self.context.is_in_rhs_of_binding(), scope_type) {
            qml_keywords = false;
            items.extend(self.enum_value_items(scope_type));
        }

        if global {
            let options = EnumerateOptions {
                global_completion: true,
                ..self.options()
            };
            let enumerator = MemberEnumerator::new(self.lookup(), options);
            items.extend(plain_items(&enumerator.enumerate_chain(), CompletionOrder::Symbol));
        }
        if js_keywords {
            items.extend(keyword_items(JS_KEYWORDS));
        }
        if qml_keywords && is_qml_file {
            items.extend(keyword_items(QML_WORDS));
            if !js_keywords {
                items.extend(keyword_items(QML_WORDS_ALSO_IN_JS));
            }
        }
        items
    }

    /// Members of the value before `.`; literals offer nothing.
    fn member_completion(&self, expression: &str) -> Vec<CompletionItem> {
        let Ok(parsed) = parse_expression(expression, Dialect::QmlJs) else {
            return Vec::new();
        };
        if parsed.is_literal() {
            return Vec::new();
        }
        let objects: Vec<ValueHandle<'s>> = self
            .evaluator
            .evaluate(&parsed)
            .iter()
            .filter_map(|item| self.evaluator.convert_to_object(&item.ty))
            .collect();
        let Some(first) = objects.first() else {
            return Vec::new();
        };

        let enumerator = MemberEnumerator::new(self.lookup(), self.options());
        let members = enumerator.enumerate_value(*first);
        if self.context.is_in_lhs_of_binding()
            && self.qml_scope_type().is_some()
            && parsed.starts_with_lowercase()
        {
            self.property_lhs_items(&members)
        } else {
            plain_items(&members, CompletionOrder::Symbol)
        }
    }

    /// Argument hint for the function before `(`.
    fn function_hint(&self, expression: &str, start: usize) -> Option<FunctionHint> {
        let function = self
            .evaluator
            .evaluate_text(expression)
            .iter()
            .filter_map(|item| item.ty.handle())
            .find_map(|handle| handle.value().as_function())?;
        let name = expression.rsplit('.').next().unwrap_or(expression).trim();
        let signature = (0..function.argument_count())
            .map(|i| function.argument_name(i))
            .collect();
        Some(FunctionHint::new(
            name,
            signature,
            start,
            self.config.min_hint_parameters,
        ))
    }

    /// `name: ` for plain properties, `name.` for grouped ones.
    fn property_lhs_items(&self, members: &Members<'s>) -> Vec<CompletionItem> {
        members
            .iter()
            .map(|(name, candidate)| {
                let grouped = candidate
                    .resolve(self.lookup())
                    .handle()
                    .and_then(|handle| handle.object())
                    .is_some_and(|object| object.grouped);
                let text = if grouped {
                    format!("{name}.")
                } else {
                    format!("{name}: ")
                };
                CompletionItem::new(
                    text,
                    CompletionOrder::Property,
                    IconKind::for_category(candidate.category),
                )
            })
            .collect()
    }

    /// QML types visible from imports and globals.
    fn qml_type_items(&self) -> Vec<CompletionItem> {
        let frames: Vec<_> = self
            .chain
            .frames()
            .iter()
            .filter(|frame| matches!(frame.kind, FrameKind::Import | FrameKind::Global))
            .cloned()
            .collect();
        let enumerator = MemberEnumerator::new(
            self.lookup(),
            EnumerateOptions {
                global_completion: true,
                ..self.options()
            },
        );
        enumerator
            .enumerate_frames(&frames)
            .into_iter()
            .filter(|(name, candidate)| {
                candidate.category == MemberCategory::Type && name.starts_with(char::is_uppercase)
            })
            .map(|(name, _)| CompletionItem::new(name, CompletionOrder::Type, IconKind::Class))
            .collect()
    }

    /// Keys of the enumeration the bound property is typed with.
    fn enum_value_items(&self, scope_type: ValueHandle<'s>) -> Vec<CompletionItem> {
        let path = self.context.binding_property_name();
        if path.is_empty() {
            return Vec::new();
        }
        let mut value = Some(scope_type);
        for name in path {
            value = value.and_then(|handle| {
                let hit = self.lookup().find_member(handle, name).into_iter().next()?;
                self.lookup().member_type(&hit).handle()
            });
        }
        let Some(Value::Enumerator(enumerator)) = value.map(|handle| handle.value()) else {
            return Vec::new();
        };
        enumerator
            .keys
            .iter()
            .map(|key| {
                CompletionItem::new(key.as_str(), CompletionOrder::EnumValue, IconKind::Enumerator)
                    .with_payload(Payload::Snippet {
                        body: format!("\"{key}\""),
                    })
            })
            .collect()
    }
}

fn plain_items(members: &Members<'_>, order: CompletionOrder) -> Vec<CompletionItem> {
    members
        .iter()
        .map(|(name, candidate)| {
            CompletionItem::new(*name, order, IconKind::for_category(candidate.category))
        })
        .collect()
}

fn keyword_items(words: &[&str]) -> Vec<CompletionItem> {
    words
        .iter()
        .map(|word| CompletionItem::new(*word, CompletionOrder::Keyword, IconKind::Keyword))
        .collect()
}
