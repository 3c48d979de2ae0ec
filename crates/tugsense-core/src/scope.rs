//! Scope resolution: from a cursor position to an ordered scope chain.
//!
//! The resolver walks the AST path from the root to the innermost node
//! enclosing the cursor and pushes a frame for every scope-introducing node
//! it crosses. The chain is innermost first and always ends with exactly
//! one `Global` frame.
//!
//! Language specifics:
//!
//! - **C++**: the Global frame also holds the global objects of every
//!   document reachable through `#include` (transitively, each once).
//! - **QML/JS**: an `Import` frame sits just before Global when imports
//!   bind anything: QML components by file stem, JavaScript files by
//!   alias, directory and library imports searched along the import path.
//!   Only the innermost QML object and the component root stay in the chain.
//!
//! Builtin documents of the language family join the Global frame last.
//! Resolution never fails; a cursor outside every node yields the frames
//! that can still be determined (at least Global).

use std::collections::HashSet;

use tracing::debug;

use crate::document::{Document, ImportKind, Language, NodeId, ScopeId, ScopeKind, ValueHandle};
use crate::snapshot::Snapshot;

// ============================================================================
// Frames
// ============================================================================

/// Kind of a scope-chain frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
    Function,
    Block,
    Class,
    Namespace,
    QmlObject,
    Import,
    Global,
}

impl FrameKind {
    /// Returns the string representation used in output.
    pub fn as_str(&self) -> &'static str {
        match self {
            FrameKind::Function => "function",
            FrameKind::Block => "block",
            FrameKind::Class => "class",
            FrameKind::Namespace => "namespace",
            FrameKind::QmlObject => "qml_object",
            FrameKind::Import => "import",
            FrameKind::Global => "global",
        }
    }

    fn from_scope(kind: ScopeKind) -> FrameKind {
        match kind {
            ScopeKind::Global => FrameKind::Global,
            ScopeKind::Namespace => FrameKind::Namespace,
            ScopeKind::Class => FrameKind::Class,
            ScopeKind::Function => FrameKind::Function,
            ScopeKind::Block => FrameKind::Block,
            ScopeKind::QmlObject => FrameKind::QmlObject,
        }
    }
}

/// One frame of a scope chain.
#[derive(Debug, Clone)]
pub struct Frame<'s> {
    pub kind: FrameKind,
    /// Frame name (class, namespace or function name; empty otherwise).
    pub name: String,
    /// Scope in the requesting document, if the frame comes from one.
    pub scope: Option<ScopeId>,
    /// Objects whose members are visible in this frame, searched in order.
    pub objects: Vec<ValueHandle<'s>>,
    /// Names bound directly to values (imports).
    pub bindings: Vec<(&'s str, ValueHandle<'s>)>,
}

impl<'s> Frame<'s> {
    fn new(kind: FrameKind, name: String, scope: Option<ScopeId>) -> Self {
        Frame {
            kind,
            name,
            scope,
            objects: Vec::new(),
            bindings: Vec::new(),
        }
    }

    /// Value bound to `name` in this frame's bindings.
    pub fn binding(&self, name: &str) -> Option<ValueHandle<'s>> {
        self.bindings
            .iter()
            .find(|(bound, _)| *bound == name)
            .map(|(_, handle)| *handle)
    }
}

/// Ordered scope frames, innermost first, ending with Global.
#[derive(Debug, Clone)]
pub struct ScopeChain<'s> {
    snapshot: &'s Snapshot,
    document: &'s Document,
    frames: Vec<Frame<'s>>,
}

impl<'s> ScopeChain<'s> {
    /// The pinned snapshot.
    pub fn snapshot(&self) -> &'s Snapshot {
        self.snapshot
    }

    /// The requesting document.
    pub fn document(&self) -> &'s Document {
        self.document
    }

    /// Frames, innermost first.
    pub fn frames(&self) -> &[Frame<'s>] {
        &self.frames
    }

    /// Number of frames.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Always false: a chain ends with Global.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Frame kinds, innermost first.
    pub fn kinds(&self) -> Vec<FrameKind> {
        self.frames.iter().map(|f| f.kind).collect()
    }

    /// The Global frame.
    pub fn global(&self) -> Option<&Frame<'s>> {
        self.frames.last().filter(|f| f.kind == FrameKind::Global)
    }

    /// The Import frame, if any.
    pub fn imports(&self) -> Option<&Frame<'s>> {
        self.frames.iter().find(|f| f.kind == FrameKind::Import)
    }

    /// Innermost enclosing class object (the viewer for access control).
    pub fn class_context(&self) -> Option<ValueHandle<'s>> {
        self.frames
            .iter()
            .find(|f| f.kind == FrameKind::Class)
            .and_then(|f| f.objects.first().copied())
    }

    /// Innermost enclosing QML object.
    pub fn qml_scope_object(&self) -> Option<ValueHandle<'s>> {
        self.frames
            .iter()
            .find(|f| f.kind == FrameKind::QmlObject)
            .and_then(|f| f.objects.first().copied())
    }

    /// Object `this` refers to: the innermost class in C++, the innermost
    /// QML object in QML.
    pub fn this_object(&self) -> Option<ValueHandle<'s>> {
        match self.document.language {
            Language::Cpp => self.class_context(),
            Language::Qml | Language::JavaScript => self.qml_scope_object(),
        }
    }
}

// ============================================================================
// Resolver
// ============================================================================

/// Where the cursor is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CursorPosition {
    /// Byte offset into the document source.
    Offset(usize),
    /// Explicit root-to-leaf AST path.
    Path(Vec<NodeId>),
}

/// Produces scope chains against one pinned snapshot.
#[derive(Debug, Clone)]
pub struct ScopeResolver<'s> {
    snapshot: &'s Snapshot,
    import_paths: Vec<String>,
}

impl<'s> ScopeResolver<'s> {
    /// Create a resolver for `snapshot`.
    pub fn new(snapshot: &'s Snapshot) -> Self {
        ScopeResolver {
            snapshot,
            import_paths: Vec::new(),
        }
    }

    /// Set the ordered QML import search path.
    pub fn with_import_paths(mut self, import_paths: &[String]) -> Self {
        self.import_paths = import_paths.to_vec();
        self
    }

    /// Resolve the scope chain at `position` in `document`.
    pub fn resolve(&self, document: &'s Document, position: CursorPosition) -> ScopeChain<'s> {
        let path = match position {
            CursorPosition::Offset(offset) => document.ast.path_to_offset(offset),
            CursorPosition::Path(path) => path,
        };

        let mut lexical: Vec<Frame<'s>> = Vec::new();
        for node in path.iter().filter_map(|id| document.ast.node(*id)) {
            let Some(scope_id) = node.scope else {
                continue;
            };
            let Some(scope) = document.scope(scope_id) else {
                continue;
            };
            if scope.kind == ScopeKind::Global {
                continue;
            }
            let mut frame = Frame::new(
                FrameKind::from_scope(scope.kind),
                scope.name.clone(),
                Some(scope_id),
            );
            frame.objects.push(document.handle(scope.object));
            lexical.push(frame);
        }
        if document.language != Language::Cpp {
            retain_outer_and_inner_objects(&mut lexical);
        }
        lexical.reverse();

        let mut frames = lexical;
        if document.language != Language::Cpp {
            let imports = self.import_frame(document);
            if !imports.bindings.is_empty() {
                frames.push(imports);
            }
        }
        frames.push(self.global_frame(document));

        debug!(
            path = %document.path,
            frames = frames.len(),
            "scope chain resolved"
        );
        ScopeChain {
            snapshot: self.snapshot,
            document,
            frames,
        }
    }

    fn global_frame(&self, document: &'s Document) -> Frame<'s> {
        let mut frame = Frame::new(FrameKind::Global, String::new(), Some(ScopeId::GLOBAL));
        if let Some(object) = document.global_object() {
            frame.objects.push(document.handle(object));
        }
        if document.language == Language::Cpp {
            for included in self.snapshot.included_documents(document) {
                if let Some(object) = included.global_object() {
                    frame.objects.push(included.handle(object));
                }
            }
        }
        for builtin in self.snapshot.builtins_for(document.language) {
            if let Some(object) = builtin.global_object() {
                frame.objects.push(builtin.handle(object));
            }
        }
        frame
    }

    fn import_frame(&self, document: &'s Document) -> Frame<'s> {
        let mut frame = Frame::new(FrameKind::Import, String::new(), None);
        let mut bound: HashSet<&'s str> = HashSet::new();

        for import in &document.imports {
            match import.kind {
                ImportKind::File => {
                    let path = join(document.directory(), &import.uri);
                    let Some(target) = self.snapshot.document(&path) else {
                        debug!(uri = %import.uri, "imported file not in snapshot");
                        continue;
                    };
                    let name: &'s str = match (&import.alias, target.language) {
                        (Some(alias), _) => alias.as_str(),
                        (None, Language::Qml) => target.file_stem(),
                        (None, _) => continue,
                    };
                    if let Some(value) = exported_value(target) {
                        bind(&mut frame, &mut bound, name, target.handle(value));
                    }
                }
                ImportKind::Directory => {
                    let dir = join(document.directory(), &import.uri);
                    self.bind_components(&mut frame, &mut bound, &dir, document);
                }
                ImportKind::Library => {
                    let relative = import.uri.replace('.', "/");
                    for root in &self.import_paths {
                        let dir = join(root, &relative);
                        self.bind_components(&mut frame, &mut bound, &dir, document);
                    }
                }
            }
        }

        // Components next to the document are visible without an import.
        if document.language == Language::Qml {
            self.bind_components(&mut frame, &mut bound, document.directory(), document);
        }
        frame
    }

    /// Bind every QML component directly inside `dir` by file stem.
    fn bind_components(
        &self,
        frame: &mut Frame<'s>,
        bound: &mut HashSet<&'s str>,
        dir: &str,
        requester: &Document,
    ) {
        for doc in self.snapshot.documents() {
            if doc.language != Language::Qml
                || doc.path == requester.path
                || doc.directory() != dir
                || !doc.file_stem().starts_with(char::is_uppercase)
            {
                continue;
            }
            if let Some(value) = exported_value(doc) {
                bind(frame, bound, doc.file_stem(), doc.handle(value));
            }
        }
    }
}

/// Resolve the scope chain at `position` (convenience wrapper).
pub fn resolve_scope<'s>(
    snapshot: &'s Snapshot,
    document: &'s Document,
    position: CursorPosition,
) -> ScopeChain<'s> {
    ScopeResolver::new(snapshot).resolve(document, position)
}

/// Keep only the outermost (component root) and innermost QML object frames.
fn retain_outer_and_inner_objects(frames: &mut Vec<Frame<'_>>) {
    let objects: Vec<usize> = frames
        .iter()
        .enumerate()
        .filter(|(_, f)| f.kind == FrameKind::QmlObject)
        .map(|(i, _)| i)
        .collect();
    if objects.len() <= 2 {
        return;
    }
    let keep_outer = objects[0];
    let keep_inner = objects[objects.len() - 1];
    let mut index = 0;
    frames.retain(|f| {
        let keep =
            f.kind != FrameKind::QmlObject || index == keep_outer || index == keep_inner;
        index += 1;
        keep
    });
}

/// What importing a document binds: a QML component's root object or a
/// script's global object.
fn exported_value(doc: &Document) -> Option<crate::value::ValueId> {
    match doc.language {
        Language::Qml => doc.root_object.or_else(|| doc.global_object()),
        _ => doc.global_object(),
    }
}

fn bind<'s>(
    frame: &mut Frame<'s>,
    bound: &mut HashSet<&'s str>,
    name: &'s str,
    handle: ValueHandle<'s>,
) {
    if bound.insert(name) {
        frame.bindings.push((name, handle));
    }
}

fn join(dir: &str, relative: &str) -> String {
    let relative = relative.trim_start_matches("./").trim_end_matches('/');
    if dir.is_empty() {
        relative.to_string()
    } else if relative.is_empty() {
        dir.to_string()
    } else {
        format!("{}/{}", dir.trim_end_matches('/'), relative)
    }
}

// ============================================================================
// Tests
// ============================================================================
