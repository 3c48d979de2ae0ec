//! End-to-end tests of the language-neutral pipeline: scope resolution,
//! evaluation, enumeration and ranking.

use std::sync::Arc;

use tugsense_core::builder::DocumentBuilder;
use tugsense_core::completion::{rank, CompletionItem, CompletionOrder, IconKind};
use tugsense_core::cursor::expression_before;
use tugsense_core::document::{Document, Language};
use tugsense_core::enumerate::{EnumerateOptions, MemberEnumerator};
use tugsense_core::evaluate::Evaluator;
use tugsense_core::scope::{resolve_scope, CursorPosition, FrameKind};
use tugsense_core::snapshot::{Snapshot, SnapshotStore};
use tugsense_core::types::Span;
use tugsense_core::value::{FunctionValue, TypeRef};

/// `Base { bar(), qux }`, `Derived : Base { bar(), baz }`, `Derived foo;`
/// and the buffer ends in `foo.`.
fn member_access_document() -> Document {
    let source = "Derived foo;\nfoo.";
    let mut b = DocumentBuilder::new("main.cpp", Language::Cpp).source(source);
    b.begin_class("Base", Span::default());
    b.function(FunctionValue::new("bar"));
    b.variable("qux", TypeRef::new("int"));
    b.end();
    b.begin_class("Derived", Span::default());
    b.base(TypeRef::new("Base"));
    b.function(FunctionValue::new("bar"));
    b.variable("baz", TypeRef::new("int"));
    b.end();
    b.variable("foo", TypeRef::new("Derived"));
    b.finish()
}

fn symbols(names: &[&str]) -> Vec<CompletionItem> {
    names
        .iter()
        .map(|n| CompletionItem::new(*n, CompletionOrder::Symbol, IconKind::Symbol))
        .collect()
}

#[test]
fn scenario_a_member_completion_prefers_derived_declarations() {
    let doc = member_access_document();
    let snapshot = Snapshot::new();
    let cursor = doc.source.len();
    let chain = resolve_scope(&snapshot, &doc, CursorPosition::Offset(cursor));

    let (_, fragment) = expression_before(&doc.source, cursor - 1, Language::Cpp.dialect());
    assert_eq!(fragment, "foo");

    let evaluator = Evaluator::new(&chain);
    let items = evaluator.evaluate_text(fragment);
    assert_eq!(items.len(), 1);
    let object = evaluator.convert_to_object(&items[0].ty).unwrap();

    let members = MemberEnumerator::new(evaluator.lookup(), EnumerateOptions::default())
        .enumerate_value(object);
    let names: Vec<&str> = members.keys().copied().collect();
    assert_eq!(names, vec!["bar", "baz", "qux"]);
    assert_eq!(
        members["bar"].declaring.object().unwrap().class_name,
        "Derived"
    );

    let ranked = rank([symbols(&names)]);
    let texts: Vec<&str> = ranked.iter().map(|i| i.text.as_str()).collect();
    assert_eq!(texts, vec!["bar", "baz", "qux"]);
}

#[test]
fn scenario_b_nested_function_has_four_frames() {
    let source = "namespace ns { class A { void f() {  } }; }";
    let mut b = DocumentBuilder::new("a.cpp", Language::Cpp).source(source);
    b.begin_namespace("ns", Span::new(0, source.len()));
    b.begin_class("A", Span::new(15, 41));
    b.begin_function(FunctionValue::new("f"), Span::new(25, 38));
    b.end();
    b.end();
    b.end();
    let doc = b.finish();
    let snapshot = Snapshot::new();

    let cursor = source.find("{  }").unwrap() + 2;
    let chain = resolve_scope(&snapshot, &doc, CursorPosition::Offset(cursor));
    assert_eq!(
        chain.kinds(),
        vec![
            FrameKind::Function,
            FrameKind::Class,
            FrameKind::Namespace,
            FrameKind::Global
        ]
    );
}

#[test]
fn scenario_d_duplicate_across_sources_is_kept_once() {
    let keywords = vec![
        CompletionItem::new("break", CompletionOrder::Keyword, IconKind::Keyword),
        CompletionItem::new("default", CompletionOrder::Keyword, IconKind::Keyword),
    ];
    let symbols = vec![
        CompletionItem::new("default", CompletionOrder::Symbol, IconKind::Symbol),
        CompletionItem::new("width", CompletionOrder::Symbol, IconKind::Symbol),
    ];
    let ranked = rank([keywords, symbols]);
    let defaults = ranked.iter().filter(|i| i.text == "default").count();
    assert_eq!(defaults, 1);
    let texts: Vec<&str> = ranked.iter().map(|i| i.text.as_str()).collect();
    assert_eq!(texts, vec!["default", "width", "break"]);
}

#[test]
fn unparsable_fragments_evaluate_to_nothing() {
    let doc = member_access_document();
    let snapshot = Snapshot::new();
    let chain = resolve_scope(&snapshot, &doc, CursorPosition::Offset(0));
    let evaluator = Evaluator::new(&chain);
    for fragment in ["", "foo.", "foo(", ")(", "\"open", "a..b"] {
        assert!(
            evaluator.evaluate_text(fragment).is_empty(),
            "fragment {fragment:?} should not evaluate"
        );
    }
}

#[test]
fn evaluation_is_deterministic() {
    let doc = member_access_document();
    let snapshot = Snapshot::new();
    let chain = resolve_scope(&snapshot, &doc, CursorPosition::Offset(0));
    let evaluator = Evaluator::new(&chain);
    let first = evaluator.evaluate_text("foo.bar");
    let second = evaluator.evaluate_text("foo.bar");
    assert_eq!(first, second);
    assert_eq!(first.len(), 1);
}

#[test]
fn pinned_snapshot_survives_store_update() {
    let store = SnapshotStore::new(Snapshot::from_documents([member_access_document()]));
    let pinned = store.snapshot();

    let replacement = DocumentBuilder::new("main.cpp", Language::Cpp)
        .revision(1)
        .source("int x;")
        .finish();
    assert_eq!(store.update([replacement]), 1);

    let doc = pinned.document("main.cpp").unwrap();
    assert_eq!(doc.revision, 0);
    assert!(doc.source.contains("foo."));
    assert_eq!(store.snapshot().document("main.cpp").unwrap().revision, 1);
    assert_eq!(Arc::strong_count(&pinned), 1);
}
