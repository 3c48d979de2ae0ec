//! CLI front door.
//!
//! Each `run_*` function serves one subcommand against a loaded snapshot
//! and returns the response to print. The engine itself never fails; the
//! errors here come from validating the request (unknown document, offset
//! past the end, unparsable expression).

use std::sync::Arc;

use tracing::{debug, info_span};

use tugsense_core::completion::{CompletionCollector, TextBuffer, TextEditor};
use tugsense_core::config::CompletionConfig;
use tugsense_core::document::{Document, Language};
use tugsense_core::error::{SenseError, SenseResult};
use tugsense_core::evaluate::Evaluator;
use tugsense_core::expr::parse_expression;
use tugsense_core::scope::{CursorPosition, ScopeResolver};
use tugsense_core::snapshot::Snapshot;
use tugsense_cpp::{CppCompletion, TypeOfExpression};
use tugsense_qmljs::QmlJsCompletion;

use crate::output::{CompleteResponse, EvalResponse, ScopeResponse, SCHEMA_VERSION};

/// A document and a cursor offset inside it.
#[derive(Debug, Clone, Copy)]
pub struct Position<'a> {
    pub file: &'a str,
    pub offset: usize,
}

/// Look up the requested document and check the offset against its text.
pub fn document_at<'s>(snapshot: &'s Snapshot, position: Position<'_>) -> SenseResult<&'s Document> {
    let doc = snapshot
        .document(position.file)
        .ok_or_else(|| SenseError::document_not_found(position.file))?;
    if position.offset > doc.source.len() || !doc.source.is_char_boundary(position.offset) {
        return Err(SenseError::OffsetOutOfRange {
            path: position.file.to_string(),
            offset: position.offset,
            len: doc.source.len(),
        });
    }
    Ok(doc.as_ref())
}

/// The collector for a document's language.
pub fn collector_for(
    language: Language,
    config: CompletionConfig,
    snapshot: Arc<Snapshot>,
) -> Box<dyn CompletionCollector> {
    match language {
        Language::Cpp => Box::new(CppCompletion::new(config, snapshot)),
        Language::Qml | Language::JavaScript => Box::new(QmlJsCompletion::new(config, snapshot)),
    }
}

// ============================================================================
// scope
// ============================================================================

/// Resolve the scope chain at a position.
pub fn run_scope(
    snapshot: &Snapshot,
    config: &CompletionConfig,
    position: Position<'_>,
) -> SenseResult<ScopeResponse> {
    let _span = info_span!("scope", file = position.file, offset = position.offset).entered();
    let doc = document_at(snapshot, position)?;
    let chain = ScopeResolver::new(snapshot)
        .with_import_paths(&config.import_paths)
        .resolve(doc, CursorPosition::Offset(position.offset));
    Ok(ScopeResponse::new(&chain, position.offset))
}

// ============================================================================
// eval
// ============================================================================

/// Evaluate an expression fragment at a position.
///
/// With `preprocess`, C++ macros visible from the document are expanded
/// first; asking for it on a QML/JS document is an argument error.
pub fn run_eval(
    snapshot: &Snapshot,
    config: &CompletionConfig,
    position: Position<'_>,
    expression: &str,
    preprocess: bool,
) -> SenseResult<EvalResponse> {
    let _span = info_span!("eval", file = position.file, offset = position.offset).entered();
    let doc = document_at(snapshot, position)?;
    if preprocess && doc.language != Language::Cpp {
        return Err(SenseError::invalid_args(
            "--preprocess applies to C++ documents only",
        ));
    }
    let chain = ScopeResolver::new(snapshot)
        .with_import_paths(&config.import_paths)
        .resolve(doc, CursorPosition::Offset(position.offset));

    if preprocess {
        let type_of = TypeOfExpression::new(&chain, config.max_macro_expansion_depth);
        let expanded = type_of
            .try_preprocess(expression)
            .map_err(|err| SenseError::invalid_args(err.to_string()))?;
        let parsed = parse_expression(&expanded, doc.language.dialect())?;
        let items = type_of.evaluator().evaluate(&parsed);
        debug!(items = items.len(), expanded = %expanded, "expression evaluated");
        return Ok(EvalResponse::new(expression, Some(expanded), &items));
    }

    let parsed = parse_expression(expression, doc.language.dialect())?;
    let items = Evaluator::new(&chain).evaluate(&parsed);
    debug!(items = items.len(), "expression evaluated");
    Ok(EvalResponse::new(expression, None, &items))
}

// ============================================================================
// complete
// ============================================================================

/// Run one completion request: type `typed` at the position, then check the
/// trigger, collect, rank and filter.
pub fn run_complete(
    snapshot: Arc<Snapshot>,
    config: CompletionConfig,
    position: Position<'_>,
    typed: Option<&str>,
) -> SenseResult<CompleteResponse> {
    let _span = info_span!("complete", file = position.file, offset = position.offset).entered();
    let doc = document_at(&snapshot, position)?;
    let mut editor = TextBuffer::new(position.file, doc.source.as_str(), position.offset);
    let language = doc.language;
    if let Some(typed) = typed {
        editor.type_text(typed);
    }

    let mut collector = collector_for(language, config, snapshot);
    let triggered = collector.supports(&editor) && collector.triggers_completion(&editor);
    let start = if triggered {
        collector.start_completion(&editor)
    } else {
        None
    };
    let items = match start {
        Some(_) => collector.get_completions(&editor),
        None => Vec::new(),
    };
    debug!(triggered, items = items.len(), "completion request served");

    Ok(CompleteResponse {
        status: "ok".to_string(),
        schema_version: SCHEMA_VERSION.to_string(),
        file: position.file.to_string(),
        offset: editor.position(),
        triggered,
        start,
        items,
        hint: collector.session().hint().cloned(),
    })
}
