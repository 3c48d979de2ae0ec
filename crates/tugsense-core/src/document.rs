//! Parsed documents: one source file at one parse generation.
//!
//! A [`Document`] is immutable once produced. It owns three arenas:
//!
//! - **AST**: nodes with byte spans and children, used to locate the cursor.
//!   A node that introduces a scope names it via [`AstNode::scope`].
//! - **Scopes**: lexical contexts. Scope 0 is the document's global scope;
//!   every other scope has a parent, so parent links form a tree.
//! - **Values**: the semantic entities scopes and members refer to.
//!
//! Cross-references inside a document are plain indices, so nothing can
//! outlive the document, and a cycle is detected by comparing indices.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::expr::Dialect;
use crate::types::Span;
use crate::value::{ObjectValue, Value, ValueId};

// ============================================================================
// ID Types
// ============================================================================

/// Index of a scope inside its document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct ScopeId(pub u32);

impl ScopeId {
    /// The document's global scope.
    pub const GLOBAL: ScopeId = ScopeId(0);

    /// Create a new scope ID.
    pub fn new(id: u32) -> Self {
        ScopeId(id)
    }
}

impl std::fmt::Display for ScopeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "scope_{}", self.0)
    }
}

/// Index of an AST node inside its document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    /// The AST root.
    pub const ROOT: NodeId = NodeId(0);

    /// Create a new node ID.
    pub fn new(id: u32) -> Self {
        NodeId(id)
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "node_{}", self.0)
    }
}

// ============================================================================
// Language
// ============================================================================

/// Source language of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    Cpp,
    Qml,
    #[serde(rename = "javascript")]
    JavaScript,
}

impl Language {
    /// Detect the language from a file extension.
    pub fn from_path(path: &str) -> Option<Language> {
        let ext = Path::new(path).extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "c" | "cc" | "cpp" | "cxx" | "c++" | "h" | "hh" | "hpp" | "hxx" | "inl" => {
                Some(Language::Cpp)
            }
            "qml" => Some(Language::Qml),
            "js" | "mjs" => Some(Language::JavaScript),
            _ => None,
        }
    }

    /// Expression dialect of the language.
    pub fn dialect(self) -> Dialect {
        match self {
            Language::Cpp => Dialect::Cpp,
            Language::Qml | Language::JavaScript => Dialect::QmlJs,
        }
    }

    /// Whether two languages share scopes, imports and builtins.
    pub fn same_family(self, other: Language) -> bool {
        self.dialect() == other.dialect()
    }
}

// ============================================================================
// AST
// ============================================================================

/// Syntactic construct of an AST node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum NodeKind {
    /// Translation unit / program / QML document.
    Root,
    Namespace { name: String },
    Class { name: String },
    Function { name: String },
    Block,
    /// QML object definition (`Rectangle { ... }`).
    QmlObject { type_name: String },
    /// QML property binding (`width: ...`).
    Binding { property: String },
    /// A declaration that introduces no scope.
    Declaration { name: String },
    /// An expression the host parsed in place.
    Expression { expr: crate::expr::Expr },
    Other,
}

/// One AST node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AstNode {
    pub kind: NodeKind,
    pub span: Span,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeId>,
    /// Scope introduced by this node, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<ScopeId>,
}

/// Node arena; `NodeId::ROOT` is the root when non-empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ast {
    pub nodes: Vec<AstNode>,
}

impl Ast {
    /// Look up a node.
    pub fn node(&self, id: NodeId) -> Option<&AstNode> {
        self.nodes.get(id.0 as usize)
    }

    /// Root-to-leaf path of nodes enclosing `offset`.
    ///
    /// The root is always part of a non-empty path, even when the offset lies
    /// past its end (a cursor at end of buffer). Children are entered only
    /// when their span contains the offset.
    pub fn path_to_offset(&self, offset: usize) -> Vec<NodeId> {
        let mut path = Vec::new();
        if self.nodes.is_empty() {
            return path;
        }
        let mut current = NodeId::ROOT;
        path.push(current);
        while let Some(node) = self.node(current) {
            let next = node.children.iter().copied().find(|child| {
                self.node(*child)
                    .is_some_and(|c| c.span.contains_offset(offset) && !path.contains(child))
            });
            match next {
                Some(child) => {
                    path.push(child);
                    current = child;
                }
                None => break,
            }
        }
        path
    }
}

// ============================================================================
// Scopes
// ============================================================================

/// What kind of construct a scope belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeKind {
    Global,
    Namespace,
    Class,
    Function,
    Block,
    QmlObject,
}

/// One scope: its names live in the members of `object`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopeData {
    pub kind: ScopeKind,
    #[serde(default)]
    pub name: String,
    /// Enclosing scope; `None` only for the global scope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<ScopeId>,
    /// Object value holding the scope's declarations. For class and QML
    /// object scopes this is the class / object value itself.
    pub object: ValueId,
}

// ============================================================================
// Preprocessor and Import Metadata
// ============================================================================

/// A `#define`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacroDef {
    pub name: String,
    /// Parameter names for function-like macros; `None` for object-like.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Vec<String>>,
    #[serde(default)]
    pub body: String,
}

impl MacroDef {
    /// Object-like macro.
    pub fn object(name: impl Into<String>, body: impl Into<String>) -> Self {
        MacroDef {
            name: name.into(),
            params: None,
            body: body.into(),
        }
    }

    /// Function-like macro.
    pub fn function(name: impl Into<String>, params: &[&str], body: impl Into<String>) -> Self {
        MacroDef {
            name: name.into(),
            params: Some(params.iter().map(|p| p.to_string()).collect()),
            body: body.into(),
        }
    }
}

/// What a QML/JS import refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportKind {
    /// A single JavaScript or QML file.
    File,
    /// A directory of QML components, relative to the importing document.
    Directory,
    /// A dotted module name searched along the import paths.
    Library,
}

/// A QML/JS `import` statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Import {
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    pub kind: ImportKind,
}

// ============================================================================
// Document
// ============================================================================

/// One source file at one parse generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub path: String,
    #[serde(default)]
    pub revision: u64,
    pub language: Language,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub ast: Ast,
    pub scopes: Vec<ScopeData>,
    pub values: Vec<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub macros: Vec<MacroDef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub includes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub imports: Vec<Import>,
    /// Root object of a QML component document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_object: Option<ValueId>,
}

static UNKNOWN: Value = Value::Unknown;

impl Document {
    /// Look up a value; dangling ids read as [`Value::Unknown`].
    pub fn value(&self, id: ValueId) -> &Value {
        self.values.get(id.index()).unwrap_or(&UNKNOWN)
    }

    /// Look up an object value.
    pub fn object(&self, id: ValueId) -> Option<&ObjectValue> {
        self.value(id).as_object()
    }

    /// Look up a scope.
    pub fn scope(&self, id: ScopeId) -> Option<&ScopeData> {
        self.scopes.get(id.0 as usize)
    }

    /// The object holding global declarations, if the document has scopes.
    pub fn global_object(&self) -> Option<ValueId> {
        self.scope(ScopeId::GLOBAL).map(|scope| scope.object)
    }

    /// File name without directory or extension (`Button.qml` gives `Button`).
    pub fn file_stem(&self) -> &str {
        Path::new(&self.path)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("")
    }

    /// File name without directory.
    pub fn file_name(&self) -> &str {
        Path::new(&self.path)
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("")
    }

    /// Directory part of the path (empty for bare file names).
    pub fn directory(&self) -> &str {
        Path::new(&self.path)
            .parent()
            .and_then(|p| p.to_str())
            .unwrap_or("")
    }

    /// Handle to a value of this document.
    pub fn handle(&self, id: ValueId) -> ValueHandle<'_> {
        ValueHandle { doc: self, id }
    }
}

// ============================================================================
// Value Handles
// ============================================================================

/// A value together with the document that owns it.
///
/// Handles are transient: they borrow the pinned snapshot and are only
/// valid for one request.
#[derive(Clone, Copy)]
pub struct ValueHandle<'s> {
    pub doc: &'s Document,
    pub id: ValueId,
}

impl<'s> ValueHandle<'s> {
    /// The referenced value.
    pub fn value(&self) -> &'s Value {
        self.doc.value(self.id)
    }

    /// The referenced object, if it is one.
    pub fn object(&self) -> Option<&'s ObjectValue> {
        self.doc.object(self.id)
    }

    /// Identity key across documents, for visited sets.
    pub fn key(&self) -> (&'s str, ValueId) {
        (self.doc.path.as_str(), self.id)
    }

    /// Another value in the same document.
    pub fn sibling(&self, id: ValueId) -> ValueHandle<'s> {
        ValueHandle { doc: self.doc, id }
    }
}

impl std::fmt::Debug for ValueHandle<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.doc.path, self.id)
    }
}

impl PartialEq for ValueHandle<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for ValueHandle<'_> {}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn node(kind: NodeKind, start: usize, end: usize, children: &[u32]) -> AstNode {
        AstNode {
            kind,
            span: Span::new(start, end),
            children: children.iter().map(|c| NodeId(*c)).collect(),
            scope: None,
        }
    }

    mod language_tests {
        use super::*;

        #[test]
        fn detect_from_extension() {
            assert_eq!(Language::from_path("src/main.cpp"), Some(Language::Cpp));
            assert_eq!(Language::from_path("widget.H"), Some(Language::Cpp));
            assert_eq!(Language::from_path("ui/Main.qml"), Some(Language::Qml));
            assert_eq!(Language::from_path("lib.js"), Some(Language::JavaScript));
            assert_eq!(Language::from_path("README"), None);
        }

        #[test]
        fn qml_and_js_share_a_family() {
            assert!(Language::Qml.same_family(Language::JavaScript));
            assert!(!Language::Qml.same_family(Language::Cpp));
        }
    }

    mod ast_tests {
        use super::*;

        fn sample() -> Ast {
            // 0: root [0, 40) -> 1: class [5, 30) -> 2: function [10, 25)
            //                 -> 3: other [30, 40)
            Ast {
                nodes: vec![
                    node(NodeKind::Root, 0, 40, &[1, 3]),
                    node(NodeKind::Class { name: "A".into() }, 5, 30, &[2]),
                    node(NodeKind::Function { name: "f".into() }, 10, 25, &[]),
                    node(NodeKind::Other, 30, 40, &[]),
                ],
            }
        }

        #[test]
        fn path_descends_to_innermost() {
            let ast = sample();
            assert_eq!(
                ast.path_to_offset(12),
                vec![NodeId(0), NodeId(1), NodeId(2)]
            );
            assert_eq!(ast.path_to_offset(30), vec![NodeId(0), NodeId(3)]);
        }

        #[test]
        fn offset_past_end_stays_at_root() {
            let ast = sample();
            assert_eq!(ast.path_to_offset(100), vec![NodeId(0)]);
        }

        #[test]
        fn empty_ast_has_no_path() {
            assert!(Ast::default().path_to_offset(0).is_empty());
        }

        #[test]
        fn self_referencing_child_terminates() {
            let ast = Ast {
                nodes: vec![node(NodeKind::Root, 0, 10, &[0])],
            };
            assert_eq!(ast.path_to_offset(3), vec![NodeId(0)]);
        }
    }

    mod document_tests {
        use super::*;

        fn doc(path: &str) -> Document {
            Document {
                path: path.to_string(),
                revision: 1,
                language: Language::Qml,
                source: String::new(),
                ast: Ast::default(),
                scopes: vec![ScopeData {
                    kind: ScopeKind::Global,
                    name: String::new(),
                    parent: None,
                    object: ValueId(0),
                }],
                values: vec![Value::Object(ObjectValue::new(""))],
                macros: Vec::new(),
                includes: Vec::new(),
                imports: Vec::new(),
                root_object: None,
            }
        }

        #[test]
        fn path_parts() {
            let d = doc("ui/controls/Button.qml");
            assert_eq!(d.file_stem(), "Button");
            assert_eq!(d.file_name(), "Button.qml");
            assert_eq!(d.directory(), "ui/controls");
        }

        #[test]
        fn dangling_value_is_unknown() {
            let d = doc("a.qml");
            assert_eq!(d.value(ValueId(99)), &Value::Unknown);
            assert!(d.object(ValueId(0)).is_some());
        }

        #[test]
        fn handles_compare_by_document_and_id() {
            let a = doc("a.qml");
            let b = doc("b.qml");
            assert_eq!(a.handle(ValueId(0)), a.handle(ValueId(0)));
            assert_ne!(a.handle(ValueId(0)), b.handle(ValueId(0)));
        }
    }
}
