//! Incremental construction of [`Document`]s.
//!
//! A host parser (or a test) walks its syntax tree and mirrors it into a
//! `DocumentBuilder`: `begin_*` opens a scope-introducing construct and its
//! AST node, declarations go into the innermost open scope, and `end`
//! closes the construct again.
//!
//! ```
//! use tugsense_core::builder::DocumentBuilder;
//! use tugsense_core::document::Language;
//! use tugsense_core::types::Span;
//! use tugsense_core::value::{FunctionValue, TypeRef};
//!
//! let source = "namespace ns { class A { void f() { } }; }";
//! let mut b = DocumentBuilder::new("a.cpp", Language::Cpp).source(source);
//! b.begin_namespace("ns", Span::new(0, 43));
//! b.begin_class("A", Span::new(15, 40));
//! b.begin_function(FunctionValue::new("f"), Span::new(25, 37));
//! b.variable("count", TypeRef::new("int"));
//! b.end();
//! b.end();
//! b.end();
//! let doc = b.finish();
//! assert_eq!(doc.scopes.len(), 4);
//! ```

use crate::document::{
    Ast, AstNode, Document, Import, Language, MacroDef, NodeId, NodeKind, ScopeData, ScopeId,
    ScopeKind,
};
use crate::expr::Expr;
use crate::types::Span;
use crate::value::{
    EnumeratorValue, FunctionValue, Member, MemberCategory, ObjectValue, Prototype, TypeRef,
    Value, ValueId,
};

/// Builder for one [`Document`].
#[derive(Debug)]
pub struct DocumentBuilder {
    doc: Document,
    /// Open constructs, innermost last: (scope, AST node).
    stack: Vec<(ScopeId, NodeId)>,
}

impl DocumentBuilder {
    /// Start a document with an empty global scope and root node.
    pub fn new(path: impl Into<String>, language: Language) -> Self {
        let global = ObjectValue::new("");
        let doc = Document {
            path: path.into(),
            revision: 0,
            language,
            source: String::new(),
            ast: Ast {
                nodes: vec![AstNode {
                    kind: NodeKind::Root,
                    span: Span::default(),
                    children: Vec::new(),
                    scope: Some(ScopeId::GLOBAL),
                }],
            },
            scopes: vec![ScopeData {
                kind: ScopeKind::Global,
                name: String::new(),
                parent: None,
                object: ValueId(0),
            }],
            values: vec![Value::Object(global)],
            macros: Vec::new(),
            includes: Vec::new(),
            imports: Vec::new(),
            root_object: None,
        };
        DocumentBuilder {
            doc,
            stack: vec![(ScopeId::GLOBAL, NodeId::ROOT)],
        }
    }

    /// Set the parse generation.
    pub fn revision(mut self, revision: u64) -> Self {
        self.doc.revision = revision;
        self
    }

    /// Set the source text.
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.doc.source = source.into();
        self
    }

    // ------------------------------------------------------------------------
    // Metadata
    // ------------------------------------------------------------------------

    /// Record an `#include`.
    pub fn include(&mut self, path: impl Into<String>) -> &mut Self {
        self.doc.includes.push(path.into());
        self
    }

    /// Record a `#define`.
    pub fn define(&mut self, def: MacroDef) -> &mut Self {
        self.doc.macros.push(def);
        self
    }

    /// Record an `import`.
    pub fn import(&mut self, import: Import) -> &mut Self {
        self.doc.imports.push(import);
        self
    }

    // ------------------------------------------------------------------------
    // Arena access
    // ------------------------------------------------------------------------

    /// Add a value to the arena without declaring it anywhere.
    pub fn value(&mut self, value: Value) -> ValueId {
        self.doc.values.push(value);
        ValueId((self.doc.values.len() - 1) as u32)
    }

    /// Add an object value to the arena.
    pub fn object(&mut self, object: ObjectValue) -> ValueId {
        self.value(Value::Object(object))
    }

    /// Append a member to an arbitrary object. Non-objects are left alone.
    pub fn member_of(&mut self, object: ValueId, member: Member) -> &mut Self {
        if let Some(Value::Object(obj)) = self.doc.values.get_mut(object.index()) {
            obj.members.push(member);
        }
        self
    }

    /// Append a prototype / base to an arbitrary object.
    pub fn prototype_of(&mut self, object: ValueId, prototype: Prototype) -> &mut Self {
        if let Some(Value::Object(obj)) = self.doc.values.get_mut(object.index()) {
            obj.prototypes.push(prototype);
        }
        self
    }

    /// Mark an object as a grouped-property type.
    pub fn set_grouped(&mut self, object: ValueId) -> &mut Self {
        if let Some(Value::Object(obj)) = self.doc.values.get_mut(object.index()) {
            obj.grouped = true;
        }
        self
    }

    /// Object value of the innermost open scope.
    pub fn current_object(&self) -> ValueId {
        let (scope, _) = self.current();
        self.doc
            .scope(scope)
            .map(|s| s.object)
            .unwrap_or(ValueId(0))
    }

    /// The global scope's object.
    pub fn global_object(&self) -> ValueId {
        ValueId(0)
    }

    // ------------------------------------------------------------------------
    // Declarations in the current scope
    // ------------------------------------------------------------------------

    /// Declare a member in the innermost open scope.
    pub fn declare(&mut self, member: Member) -> &mut Self {
        let object = self.current_object();
        self.member_of(object, member)
    }

    /// Declare a typed variable.
    pub fn variable(&mut self, name: impl Into<String>, type_ref: TypeRef) -> &mut Self {
        self.declare(Member::typed(name, MemberCategory::Variable, type_ref))
    }

    /// Declare a typed property.
    pub fn property(&mut self, name: impl Into<String>, type_ref: TypeRef) -> &mut Self {
        self.declare(Member::typed(name, MemberCategory::Property, type_ref))
    }

    /// Declare a function (without a body scope).
    pub fn function(&mut self, function: FunctionValue) -> ValueId {
        self.callable(function, MemberCategory::Function)
    }

    /// Declare a function-like member of the given category (signal, slot).
    pub fn callable(&mut self, function: FunctionValue, category: MemberCategory) -> ValueId {
        let name = function.name.clone();
        let id = self.value(Value::Function(function));
        self.declare(Member::with_value(name, category, id));
        id
    }

    /// Declare an enumeration and its constants in the current scope.
    pub fn enumeration(&mut self, name: impl Into<String>, keys: &[&str]) -> ValueId {
        let name = name.into();
        let id = self.value(Value::Enumerator(EnumeratorValue {
            enum_name: name.clone(),
            keys: keys.iter().map(|k| k.to_string()).collect(),
        }));
        if !name.is_empty() {
            self.declare(Member::with_value(name, MemberCategory::Type, id));
        }
        for key in keys {
            self.declare(Member::with_value(*key, MemberCategory::Enumerator, id));
        }
        id
    }

    /// Add a base class / prototype to the innermost open scope's object.
    pub fn base(&mut self, base: TypeRef) -> &mut Self {
        let object = self.current_object();
        self.prototype_of(object, Prototype::Named(base))
    }

    // ------------------------------------------------------------------------
    // Scope-introducing constructs
    // ------------------------------------------------------------------------

    /// Open a namespace; returns its object.
    pub fn begin_namespace(&mut self, name: impl Into<String>, span: Span) -> ValueId {
        let name = name.into();
        let object = self.object(ObjectValue::new(name.clone()));
        self.declare(Member::with_value(
            name.clone(),
            MemberCategory::Namespace,
            object,
        ));
        self.open(ScopeKind::Namespace, name.clone(), object, NodeKind::Namespace { name }, span);
        object
    }

    /// Open a class; returns the class object.
    pub fn begin_class(&mut self, name: impl Into<String>, span: Span) -> ValueId {
        let name = name.into();
        let object = self.object(ObjectValue::new(name.clone()));
        self.declare(Member::with_value(name.clone(), MemberCategory::Type, object));
        self.open(ScopeKind::Class, name.clone(), object, NodeKind::Class { name }, span);
        object
    }

    /// Open a function body; parameters become typed locals. Returns the
    /// function value.
    pub fn begin_function(&mut self, function: FunctionValue, span: Span) -> ValueId {
        let name = function.name.clone();
        let mut locals = ObjectValue::new("");
        for param in function.params.iter().filter(|p| !p.name.is_empty()) {
            locals.members.push(Member {
                name: param.name.clone(),
                category: MemberCategory::Variable,
                visibility: Default::default(),
                value: None,
                type_ref: param.type_ref.clone(),
            });
        }
        let function_id = self.function(function);
        let object = self.object(locals);
        self.open(ScopeKind::Function, name.clone(), object, NodeKind::Function { name }, span);
        function_id
    }

    /// Open a block with its own declarations.
    pub fn begin_block(&mut self, span: Span) -> ValueId {
        let object = self.object(ObjectValue::new(""));
        self.open(ScopeKind::Block, String::new(), object, NodeKind::Block, span);
        object
    }

    /// Open a QML object definition whose prototype is `type_name`.
    ///
    /// The first object opened becomes the component's root object.
    pub fn begin_object(&mut self, type_name: impl Into<String>, span: Span) -> ValueId {
        let type_name = type_name.into();
        let mut object = ObjectValue::new(type_name.clone());
        object
            .prototypes
            .push(Prototype::Named(TypeRef::new(type_name.clone())));
        let object = self.object(object);
        if self.doc.root_object.is_none() {
            self.doc.root_object = Some(object);
        }
        self.open(
            ScopeKind::QmlObject,
            type_name.clone(),
            object,
            NodeKind::QmlObject { type_name },
            span,
        );
        object
    }

    /// Close the innermost open construct. The global scope stays open.
    pub fn end(&mut self) -> &mut Self {
        if self.stack.len() > 1 {
            self.stack.pop();
        }
        self
    }

    // ------------------------------------------------------------------------
    // Plain AST nodes
    // ------------------------------------------------------------------------

    /// Add a leaf node under the innermost open construct.
    pub fn node(&mut self, kind: NodeKind, span: Span) -> NodeId {
        let (_, parent) = self.current();
        self.push_node(parent, kind, span, None)
    }

    /// Add an already-parsed expression node.
    pub fn expression(&mut self, expr: Expr, span: Span) -> NodeId {
        self.node(NodeKind::Expression { expr }, span)
    }

    /// Finish the document. The root node spans the whole source.
    pub fn finish(mut self) -> Document {
        let end = self
            .doc
            .ast
            .nodes
            .iter()
            .map(|n| n.span.end)
            .max()
            .unwrap_or(0)
            .max(self.doc.source.len());
        if let Some(root) = self.doc.ast.nodes.first_mut() {
            root.span = Span::new(0, end);
        }
        self.doc
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    fn current(&self) -> (ScopeId, NodeId) {
        self.stack
            .last()
            .copied()
            .unwrap_or((ScopeId::GLOBAL, NodeId::ROOT))
    }

    fn open(
        &mut self,
        kind: ScopeKind,
        name: String,
        object: ValueId,
        node_kind: NodeKind,
        span: Span,
    ) {
        let (parent_scope, parent_node) = self.current();
        self.doc.scopes.push(ScopeData {
            kind,
            name,
            parent: Some(parent_scope),
            object,
        });
        let scope = ScopeId((self.doc.scopes.len() - 1) as u32);
        let node = self.push_node(parent_node, node_kind, span, Some(scope));
        self.stack.push((scope, node));
    }

    fn push_node(
        &mut self,
        parent: NodeId,
        kind: NodeKind,
        span: Span,
        scope: Option<ScopeId>,
    ) -> NodeId {
        self.doc.ast.nodes.push(AstNode {
            kind,
            span,
            children: Vec::new(),
            scope,
        });
        let id = NodeId((self.doc.ast.nodes.len() - 1) as u32);
        if let Some(parent) = self.doc.ast.nodes.get_mut(parent.0 as usize) {
            parent.children.push(id);
        }
        id
    }
}

// ============================================================================
// Tests
// ============================================================================
