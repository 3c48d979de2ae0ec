//! Integration tests for the C++ completion collector.

use std::sync::Arc;

use tugsense_core::builder::DocumentBuilder;
use tugsense_core::completion::{CompletionCollector, IconKind, Payload, TextBuffer, TextEditor};
use tugsense_core::config::CompletionConfig;
use tugsense_core::document::{Document, Language, MacroDef};
use tugsense_core::snapshot::Snapshot;
use tugsense_core::types::Span;
use tugsense_core::value::{
    FunctionValue, Member, MemberCategory, Param, TypeRef, Visibility,
};
use tugsense_cpp::CppCompletion;

fn collector(documents: Vec<Document>) -> CppCompletion {
    CppCompletion::new(
        CompletionConfig::default(),
        Arc::new(Snapshot::from_documents(documents)),
    )
}

fn editor_at_end(path: &str, text: &str) -> TextBuffer {
    TextBuffer::new(path, text, text.len())
}

fn texts(collector: &CppCompletion, editor: &TextBuffer) -> Vec<String> {
    collector
        .get_completions(editor)
        .into_iter()
        .map(|item| item.text)
        .collect()
}

fn int() -> TypeRef {
    TypeRef::new("int")
}

// ============================================================================
// Member completion
// ============================================================================

#[test]
fn member_completion_after_dot() {
    let source = "Derived foo;\nfoo.";
    let mut b = DocumentBuilder::new("main.cpp", Language::Cpp).source(source);
    b.begin_class("Base", Span::default());
    b.function(FunctionValue::new("bar"));
    b.variable("qux", int());
    b.end();
    b.begin_class("Derived", Span::default());
    b.base(TypeRef::new("Base"));
    b.function(FunctionValue::new("bar"));
    b.variable("baz", int());
    b.end();
    b.variable("foo", TypeRef::new("Derived"));

    let mut collector = collector(vec![b.finish()]);
    let editor = editor_at_end("main.cpp", source);
    assert!(collector.triggers_completion(&editor));
    assert_eq!(collector.start_completion(&editor), Some(source.len()));
    assert_eq!(texts(&collector, &editor), vec!["bar", "baz", "qux"]);

    let bar = &collector.get_completions(&editor)[0];
    assert_eq!(bar.icon, IconKind::Function);
    assert_eq!(bar.payload, Some(Payload::Call { has_params: false }));
    assert_eq!(bar.details.as_deref(), Some("bar()"));
}

#[test]
fn private_members_are_visible_only_inside_the_class() {
    let source = "class W { void f() { this-> } };\nW w;\nw->";
    let class_end = source.find("};").unwrap() + 2;
    let body_start = source.find("void").unwrap();
    let body_end = source.find("} }").unwrap() + 1;

    let mut b = DocumentBuilder::new("w.cpp", Language::Cpp).source(source);
    b.begin_class("W", Span::new(0, class_end));
    b.declare(
        Member::typed("secret", MemberCategory::Variable, int()).with_visibility(Visibility::Private),
    );
    b.variable("open", int());
    b.begin_function(FunctionValue::new("f"), Span::new(body_start, body_end));
    b.end();
    b.end();
    b.variable("w", TypeRef::new("W"));
    let doc = b.finish();

    let mut inside = collector(vec![doc.clone()]);
    let cursor = source.find("this->").unwrap() + 6;
    let editor = TextBuffer::new("w.cpp", source, cursor);
    assert_eq!(inside.start_completion(&editor), Some(cursor));
    assert_eq!(texts(&inside, &editor), vec!["f", "open", "secret"]);

    let mut outside = collector(vec![doc]);
    let editor = editor_at_end("w.cpp", source);
    outside.start_completion(&editor);
    assert_eq!(texts(&outside, &editor), vec!["f", "open"]);
}

#[test]
fn macros_expand_before_member_lookup() {
    let mut header = DocumentBuilder::new("window.h", Language::Cpp);
    header.begin_class("Window", Span::default());
    header.variable("width", int());
    header.end();
    header.variable("window", TypeRef::new("Window*"));
    header.define(MacroDef::object("W", "window"));

    let source = "#include \"window.h\"\nW->";
    let mut main = DocumentBuilder::new("main.cpp", Language::Cpp).source(source);
    main.include("window.h");

    let mut collector = collector(vec![header.finish(), main.finish()]);
    let editor = editor_at_end("main.cpp", source);
    assert!(collector.start_completion(&editor).is_some());
    assert_eq!(texts(&collector, &editor), vec!["width"]);
}

#[test]
fn unknown_expression_offers_nothing() {
    let source = "missing.";
    let mut collector = collector(vec![DocumentBuilder::new("m.cpp", Language::Cpp)
        .source(source)
        .finish()]);
    let editor = editor_at_end("m.cpp", source);
    assert_eq!(collector.start_completion(&editor), None);
    assert!(collector.get_completions(&editor).is_empty());
}

// ============================================================================
// Function hints
// ============================================================================

fn functions_document(source: &str) -> Document {
    let mut b = DocumentBuilder::new("calls.cpp", Language::Cpp).source(source);
    b.function(FunctionValue {
        params: vec![Param::typed("w", int()), Param::typed("h", int())],
        ..FunctionValue::new("resize")
    });
    b.function(FunctionValue::new("reset"));
    b.finish()
}

#[test]
fn open_paren_shows_argument_hint() {
    let source = "resize(";
    let mut collector = collector(vec![functions_document(source)]);
    let editor = editor_at_end("calls.cpp", source);
    assert!(collector.triggers_completion(&editor));
    assert_eq!(collector.start_completion(&editor), None);

    let hint = collector.session().hint().unwrap();
    assert!(hint.is_visible());
    assert_eq!(hint.function_name, "resize");
    assert_eq!(hint.signature, vec!["w", "h"]);
    assert_eq!(hint.start_position, 7);
}

#[test]
fn zero_argument_call_hint_is_not_shown() {
    let source = "reset(";
    let mut collector = collector(vec![functions_document(source)]);
    let editor = editor_at_end("calls.cpp", source);
    assert_eq!(collector.start_completion(&editor), None);

    let hint = collector.session().hint().unwrap();
    assert!(!hint.is_visible());
    let json = serde_json::to_value(hint).unwrap();
    assert_eq!(json["signature"], serde_json::json!([]));
}

#[test]
fn committing_a_function_inserts_parentheses() {
    let source = "res";
    let mut collector = collector(vec![functions_document(source)]);
    let mut editor = editor_at_end("calls.cpp", source);
    assert_eq!(collector.start_completion(&editor), Some(0));

    let items = collector.get_completions(&editor);
    let resize = items.iter().find(|i| i.text == "resize").unwrap().clone();
    collector.complete(&mut editor, &resize);
    assert_eq!(editor.text(), "resize()");
    assert_eq!(editor.position(), 7);

    let mut editor = editor_at_end("calls.cpp", source);
    let reset = items.iter().find(|i| i.text == "reset").unwrap().clone();
    collector.complete(&mut editor, &reset);
    assert_eq!(editor.text(), "reset()");
    assert_eq!(editor.position(), 7);
}

#[test]
fn typed_paren_commits_without_auto_parentheses() {
    let source = "res";
    let mut collector = collector(vec![functions_document(source)]);
    let mut editor = editor_at_end("calls.cpp", source);
    collector.start_completion(&editor);
    let items = collector.get_completions(&editor);
    let resize = items.iter().find(|i| i.text == "resize").unwrap().clone();

    assert!(collector.typed_char_completes(&resize, '('));
    collector.complete_typed(&mut editor, &resize, '(');
    assert_eq!(editor.text(), "resize(");
}

// ============================================================================
// Global completion
// ============================================================================

#[test]
fn global_completion_merges_symbols_macros_and_keywords() {
    let source = "#define MAX 10\nenum Mode { On, Off };\nint value;\nva";
    let mut b = DocumentBuilder::new("g.cpp", Language::Cpp).source(source);
    b.define(MacroDef::object("MAX", "10"));
    b.enumeration("Mode", &["On", "Off"]);
    b.variable("value", int());

    let mut collector = collector(vec![b.finish()]);
    let editor = editor_at_end("g.cpp", source);
    assert_eq!(collector.start_completion(&editor), Some(source.len() - 2));
    assert_eq!(texts(&collector, &editor), vec!["value"]);

    let all = collector.session().completions();
    let icon_of = |text: &str| all.iter().find(|i| i.text == text).map(|i| i.icon);
    assert_eq!(icon_of("MAX"), Some(IconKind::Macro));
    assert_eq!(icon_of("On"), None);
    assert_eq!(icon_of("Mode"), Some(IconKind::Enum));
    assert_eq!(icon_of("while"), Some(IconKind::Keyword));
}

fn color_document(source: &str) -> Document {
    let mut b = DocumentBuilder::new("main.cpp", Language::Cpp).source(source);
    b.enumeration("Color", &["colorRed", "colorGreen"]);
    b.variable("column", int());
    b.finish()
}

#[test]
fn enumerators_stay_out_of_unqualified_completion() {
    let source = "int main() { col";
    let mut collector = collector(vec![color_document(source)]);
    let editor = editor_at_end("main.cpp", source);
    assert_eq!(collector.start_completion(&editor), Some(source.len() - 3));
    assert_eq!(texts(&collector, &editor), vec!["column"]);
}

#[test]
fn enumerators_in_global_completion_are_opt_in() {
    let source = "int main() { col";
    let config = CompletionConfig {
        enumerators_in_global: true,
        ..CompletionConfig::default()
    };
    let mut collector = CppCompletion::new(
        config,
        Arc::new(Snapshot::from_documents(vec![color_document(source)])),
    );
    let editor = editor_at_end("main.cpp", source);
    collector.start_completion(&editor);
    assert_eq!(
        texts(&collector, &editor),
        vec!["colorGreen", "colorRed", "column"]
    );
}

#[test]
fn documents_missing_from_the_snapshot_still_get_keywords() {
    let mut collector = collector(Vec::new());
    let editor = editor_at_end("new.cpp", "whi");
    assert_eq!(collector.start_completion(&editor), Some(0));
    assert_eq!(texts(&collector, &editor), vec!["while"]);
}

#[test]
fn comments_do_not_trigger() {
    let collector = collector(Vec::new());
    assert!(!collector.triggers_completion(&editor_at_end("c.cpp", "// foo.")));
    assert!(!collector.triggers_completion(&editor_at_end("c.cpp", "/* a->")));
    assert!(collector.triggers_completion(&editor_at_end("c.cpp", "a->")));
    assert!(collector.triggers_completion(&editor_at_end("c.cpp", "ns::")));
}

// ============================================================================
// Qt, preprocessor and includes
// ============================================================================

fn counter_document(source: &str) -> Document {
    let mut b = DocumentBuilder::new("counter.cpp", Language::Cpp).source(source);
    b.begin_class("Counter", Span::default());
    b.callable(
        FunctionValue {
            params: vec![Param::typed("", int())],
            ..FunctionValue::new("valueChanged")
        },
        MemberCategory::Signal,
    );
    b.callable(
        FunctionValue {
            params: vec![Param::typed("value", int())],
            ..FunctionValue::new("setValue")
        },
        MemberCategory::Slot,
    );
    b.function(FunctionValue::new("value"));
    b.end();
    b.variable("counter", TypeRef::new("Counter*"));
    b.finish()
}

#[test]
fn signal_and_slot_macros_offer_normalized_signatures() {
    let source = "connect(counter, SIGNAL(";
    let mut collector = collector(vec![counter_document(source)]);
    let editor = editor_at_end("counter.cpp", source);
    assert!(collector.start_completion(&editor).is_some());
    assert_eq!(texts(&collector, &editor), vec!["valueChanged(int)"]);

    let source = "connect(counter, SIGNAL(valueChanged(int)), counter, SLOT(";
    let mut collector = self::collector(vec![counter_document(source)]);
    let editor = editor_at_end("counter.cpp", source);
    assert!(collector.start_completion(&editor).is_some());
    assert_eq!(texts(&collector, &editor), vec!["setValue(int)"]);
}

#[test]
fn pound_offers_directives() {
    let source = "int x;\n#";
    let mut collector = collector(Vec::new());
    let editor = editor_at_end("d.cpp", source);
    assert!(collector.triggers_completion(&editor));
    assert_eq!(collector.start_completion(&editor), Some(source.len()));
    let offered = texts(&collector, &editor);
    assert!(offered.contains(&"include".to_string()));
    assert!(offered.contains(&"define".to_string()));
    assert!(!offered.contains(&"while".to_string()));
}

#[test]
fn include_offers_snapshot_files() {
    let documents = vec![
        DocumentBuilder::new("src/main.cpp", Language::Cpp).finish(),
        DocumentBuilder::new("src/widgets/button.h", Language::Cpp).finish(),
        DocumentBuilder::new("include/core.h", Language::Cpp).finish(),
        DocumentBuilder::new("src/Main.qml", Language::Qml).finish(),
    ];
    let source = "#include \"";
    let mut collector = collector(documents);
    let editor = editor_at_end("src/main.cpp", source);
    assert!(collector.triggers_completion(&editor));
    assert_eq!(collector.start_completion(&editor), Some(source.len()));
    assert_eq!(
        texts(&collector, &editor),
        vec!["include/core.h", "widgets/button.h"]
    );
}
