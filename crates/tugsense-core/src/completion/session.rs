//! The per-invocation completion state machine.
//!
//! A [`CompletionSession`] owns everything one completion needs between
//! keystrokes: the pinned snapshot, the start offset, the collected items,
//! the restart flag, the function hint and the snippet cache. Language
//! collectors implement [`CompletionCollector`] on top of a session:
//!
//! 1. `triggers_completion` decides whether a keystroke opens completion
//! 2. `start_completion` collects candidates and returns the start offset,
//!    or `None` when there is nothing to offer (function hints always
//!    return `None`)
//! 3. `get_completions` ranks and filters by the text typed since the start
//! 4. `complete` / `partially_complete` commit an item
//! 5. `cleanup` resets the per-invocation state

use std::sync::Arc;

use tracing::debug;

use crate::config::CompletionConfig;
use crate::snapshot::{Snapshot, SnapshotStore};
use crate::text::common_prefix;
use crate::types::Span;

use super::editor::TextEditor;
use super::hint::FunctionHint;
use super::item::{CompletionItem, Payload};
use super::rank::{filter_by_prefix, rank};
use super::snippet::SnippetCache;

// ============================================================================
// Session
// ============================================================================

/// State owned by one completion controller.
#[derive(Debug)]
pub struct CompletionSession {
    config: CompletionConfig,
    snapshot: Arc<Snapshot>,
    snippets: SnippetCache,
    start_position: Option<usize>,
    completions: Vec<CompletionItem>,
    restart: bool,
    hint: Option<FunctionHint>,
}

impl CompletionSession {
    /// A session over a pinned snapshot.
    pub fn new(config: CompletionConfig, snapshot: Arc<Snapshot>) -> Self {
        let snippets = SnippetCache::new(config.snippets_path.clone());
        CompletionSession {
            config,
            snapshot,
            snippets,
            start_position: None,
            completions: Vec::new(),
            restart: false,
            hint: None,
        }
    }

    /// A session pinned to the store's current snapshot.
    pub fn from_store(config: CompletionConfig, store: &SnapshotStore) -> Self {
        CompletionSession::new(config, store.snapshot())
    }

    /// Engine configuration.
    pub fn config(&self) -> &CompletionConfig {
        &self.config
    }

    /// The pinned snapshot.
    pub fn snapshot(&self) -> &Arc<Snapshot> {
        &self.snapshot
    }

    /// Pin a newer snapshot for the next request.
    pub fn pin(&mut self, snapshot: Arc<Snapshot>) {
        self.snapshot = snapshot;
    }

    /// Begin collecting for a request starting at `start`.
    pub fn begin(&mut self, start: usize) {
        self.start_position = Some(start);
        self.completions.clear();
        self.restart = false;
    }

    /// Where the replaced span starts.
    pub fn start_position(&self) -> Option<usize> {
        self.start_position
    }

    /// Add collected items.
    pub fn extend(&mut self, items: impl IntoIterator<Item = CompletionItem>) {
        self.completions.extend(items);
    }

    /// Add one collected item.
    pub fn push(&mut self, item: CompletionItem) {
        self.completions.push(item);
    }

    /// Collected items, unranked.
    pub fn completions(&self) -> &[CompletionItem] {
        &self.completions
    }

    /// The start offset when anything was collected.
    pub fn finish(&self) -> Option<usize> {
        let start = self.start_position.filter(|_| !self.completions.is_empty());
        debug!(
            items = self.completions.len(),
            start = ?start,
            "completion collected"
        );
        start
    }

    /// Ask the host to reopen completion after the commit.
    pub fn request_restart(&mut self) {
        self.restart = true;
    }

    /// Whether the last commit asked for a restart.
    pub fn should_restart(&self) -> bool {
        self.restart
    }

    /// Show a function hint. A hint already open for the same call is kept.
    pub fn show_hint(&mut self, hint: FunctionHint) {
        if self
            .hint
            .as_ref()
            .is_some_and(|open| open.is_visible() && open.start_position == hint.start_position)
        {
            return;
        }
        self.hint = Some(hint);
    }

    /// The current function hint.
    pub fn hint(&self) -> Option<&FunctionHint> {
        self.hint.as_ref()
    }

    /// Forward cursor movement to the hint.
    pub fn update_hint(&mut self, text: &str, cursor: usize) {
        if let Some(hint) = self.hint.as_mut() {
            hint.update(text, cursor);
        }
    }

    /// The host reports that focus or the pointer left the editor.
    pub fn cancel_hint(&mut self) {
        if let Some(hint) = self.hint.as_mut() {
            hint.dismiss();
        }
    }

    /// The snippet cache.
    pub fn snippets_mut(&mut self) -> &mut SnippetCache {
        &mut self.snippets
    }

    /// Clear per-invocation state; snapshot, hint and snippets survive.
    pub fn reset(&mut self) {
        self.start_position = None;
        self.completions.clear();
    }

    /// Replace the span from the start offset to the cursor with `text`.
    pub fn replace_typed(&self, editor: &mut dyn TextEditor, text: &str) {
        let start = self.start_position.unwrap_or_else(|| editor.position());
        let span = Span::new(start, editor.position().max(start));
        editor.replace(span, text);
    }
}

// ============================================================================
// Collector
// ============================================================================

/// A language's completion collector.
pub trait CompletionCollector {
    /// The session state.
    fn session(&self) -> &CompletionSession;

    /// The session state, mutably.
    fn session_mut(&mut self) -> &mut CompletionSession;

    /// Whether this collector handles the editor's document.
    fn supports(&self, editor: &dyn TextEditor) -> bool;

    /// Whether the last keystroke should open completion.
    fn triggers_completion(&self, editor: &dyn TextEditor) -> bool;

    /// Collect candidates; returns the start offset of the replaced span,
    /// or `None` when nothing is offered.
    fn start_completion(&mut self, editor: &dyn TextEditor) -> Option<usize>;

    /// Ranked items matching what was typed since the start offset.
    fn get_completions(&self, editor: &dyn TextEditor) -> Vec<CompletionItem> {
        let Some(start) = self.session().start_position() else {
            return Vec::new();
        };
        if editor.position() < start {
            return Vec::new();
        }
        let ranked = rank([self.session().completions().to_vec()]);
        let typed = editor.text_in(Span::new(start, editor.position()));
        filter_by_prefix(&ranked, typed)
    }

    /// Whether typing `ch` while `item` is selected commits it.
    fn typed_char_completes(&self, _item: &CompletionItem, _ch: char) -> bool {
        false
    }

    /// Commit one item.
    fn complete(&mut self, editor: &mut dyn TextEditor, item: &CompletionItem) {
        match &item.payload {
            Some(Payload::Snippet { body }) => {
                let start = self.session().start_position().unwrap_or(editor.position());
                let span = Span::new(start, editor.position().max(start));
                editor.insert_snippet(span, body);
            }
            _ => self.session().replace_typed(editor, &item.text),
        }
    }

    /// Commit the only remaining non-snippet item, or insert the longest
    /// common prefix. Returns whether an item was committed.
    fn partially_complete(&mut self, editor: &mut dyn TextEditor, items: &[CompletionItem]) -> bool {
        if let [only] = items {
            if !only.is_snippet() {
                self.complete(editor, only);
                return true;
            }
        }
        let prefix = common_prefix(items.iter().map(|item| item.text.as_str()));
        let typed_len = self
            .session()
            .start_position()
            .map_or(0, |start| editor.position().saturating_sub(start));
        if prefix.len() > typed_len {
            self.session().replace_typed(editor, &prefix);
        }
        false
    }

    /// Reset per-invocation state.
    fn cleanup(&mut self) {
        self.session_mut().reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::editor::TextBuffer;
    use crate::completion::item::{CompletionOrder, IconKind};
    use crate::completion::trigger::triggers_completion;
    use crate::expr::Dialect;

    /// Offers a fixed word list after any identifier prefix.
    struct WordCollector {
        session: CompletionSession,
        words: Vec<&'static str>,
    }

    impl WordCollector {
        fn new(words: Vec<&'static str>) -> Self {
            WordCollector {
                session: CompletionSession::new(
                    CompletionConfig::default(),
                    Arc::new(Snapshot::new()),
                ),
                words,
            }
        }
    }

    impl CompletionCollector for WordCollector {
        fn session(&self) -> &CompletionSession {
            &self.session
        }

        fn session_mut(&mut self) -> &mut CompletionSession {
            &mut self.session
        }

        fn supports(&self, _editor: &dyn TextEditor) -> bool {
            true
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
            let start = crate::text::find_start_of_name(editor.text(), editor.position());
            self.session.begin(start);
            let items = self
                .words
                .iter()
                .map(|w| CompletionItem::new(*w, CompletionOrder::Symbol, IconKind::Symbol));
            self.session.extend(items);
            self.session.finish()
        }
    }

    #[test]
    fn start_filter_and_commit() {
        let mut collector = WordCollector::new(vec!["width", "window", "height"]);
        let mut editor = TextBuffer::with_cursor_marker("a.js", "x = wi|");
        assert!(!collector.triggers_completion(&editor));
        assert_eq!(collector.start_completion(&editor), Some(4));

        let items = collector.get_completions(&editor);
        let texts: Vec<&str> = items.iter().map(|i| i.text.as_str()).collect();
        assert_eq!(texts, vec!["width", "window"]);

        collector.complete(&mut editor, &items[0]);
        assert_eq!(editor.text(), "x = width");
        assert_eq!(editor.position(), 9);
        collector.cleanup();
        assert_eq!(collector.session().start_position(), None);
    }

    #[test]
    fn partial_completion_inserts_common_prefix() {
        let mut collector = WordCollector::new(vec!["window", "windowTitle"]);
        let mut editor = TextBuffer::with_cursor_marker("a.js", "w|");
        collector.start_completion(&editor);
        let items = collector.get_completions(&editor);
        assert!(!collector.partially_complete(&mut editor, &items));
        assert_eq!(editor.text(), "window");

        let single = vec![items[1].clone()];
        assert!(collector.partially_complete(&mut editor, &single));
        assert_eq!(editor.text(), "windowTitle");
    }

    #[test]
    fn empty_collection_returns_none() {
        let mut collector = WordCollector::new(Vec::new());
        let editor = TextBuffer::with_cursor_marker("a.js", "abc|");
        assert_eq!(collector.start_completion(&editor), None);
        assert!(collector.session().completions().is_empty());
        assert!(collector.get_completions(&editor).is_empty());
    }

    #[test]
    fn open_hint_for_same_call_is_kept() {
        let mut session =
            CompletionSession::new(CompletionConfig::default(), Arc::new(Snapshot::new()));
        let mut first = FunctionHint::new("f", vec!["a".into(), "b".into()], 2, 1);
        first.current_argument = 1;
        session.show_hint(first);
        session.show_hint(FunctionHint::new("f", vec!["a".into(), "b".into()], 2, 1));
        assert_eq!(session.hint().map(|h| h.current_argument), Some(1));

        session.cancel_hint();
        assert!(!session.hint().is_some_and(FunctionHint::is_visible));
    }
}
