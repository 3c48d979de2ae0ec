//! Name lookup over scope chains and prototype/base chains.
//!
//! Two lookups underlie everything else:
//!
//! - **Member lookup** searches one value: its own membership table first,
//!   then its prototypes depth-first in declaration order. The first object
//!   that declares the name wins and all its same-named members are
//!   returned (an overload set). Derived members hide base members.
//! - **Name lookup** searches the scope chain innermost first; the first
//!   frame with a match wins.
//!
//! Prototypes named by type (`Prototype::Named`) are resolved through the
//! requesting scope chain. A prototype whose resolution is already in
//! progress resolves to nothing, which breaks the self-reference a QML
//! object frame has through its own type name.

use std::cell::RefCell;
use std::collections::HashSet;

use tracing::trace;

use crate::document::{Document, ValueHandle};
use crate::scope::ScopeChain;
use crate::value::{Member, PrimitiveKind, Prototype, TypeRef, Value, ValueId};

// ============================================================================
// Results
// ============================================================================

/// What a type or member resolved to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResolvedType<'s> {
    /// A value in some document.
    Value(ValueHandle<'s>),
    /// A builtin scalar.
    Primitive(PrimitiveKind),
    /// Declared, but nothing is known about it.
    Unknown,
}

impl<'s> ResolvedType<'s> {
    /// The value handle, if resolved to a value.
    pub fn handle(&self) -> Option<ValueHandle<'s>> {
        match self {
            ResolvedType::Value(handle) => Some(*handle),
            _ => None,
        }
    }
}

/// A member found on some object.
#[derive(Debug, Clone, Copy)]
pub struct MemberHit<'s> {
    pub member: &'s Member,
    /// Object whose membership table declares the member.
    pub owner: ValueHandle<'s>,
}

/// A name found in the scope chain.
#[derive(Debug, Clone, Copy)]
pub enum NameHit<'s> {
    /// A member of one of a frame's objects.
    Member(MemberHit<'s>),
    /// A name bound by an import.
    Binding(ValueHandle<'s>),
}

type PrototypeKey<'s> = ((&'s str, ValueId), usize);

// ============================================================================
// Lookup
// ============================================================================

/// Lookup context for one request.
#[derive(Debug)]
pub struct Lookup<'c, 's> {
    chain: &'c ScopeChain<'s>,
    resolving: RefCell<HashSet<PrototypeKey<'s>>>,
}

impl<'c, 's> Lookup<'c, 's> {
    /// Create a lookup over `chain`.
    pub fn new(chain: &'c ScopeChain<'s>) -> Self {
        Lookup {
            chain,
            resolving: RefCell::new(HashSet::new()),
        }
    }

    /// The scope chain.
    pub fn chain(&self) -> &'c ScopeChain<'s> {
        self.chain
    }

    // ------------------------------------------------------------------------
    // Prototypes
    // ------------------------------------------------------------------------

    /// Resolve the `index`-th prototype of `owner`.
    pub fn resolve_prototype(
        &self,
        owner: ValueHandle<'s>,
        index: usize,
    ) -> Option<ValueHandle<'s>> {
        let object = owner.object()?;
        match object.prototypes.get(index)? {
            Prototype::Value(id) => Some(owner.sibling(*id)),
            Prototype::Named(type_ref) => {
                let key = (owner.key(), index);
                if !self.resolving.borrow_mut().insert(key) {
                    return None;
                }
                let resolved = self.resolve_type(type_ref, owner.doc);
                self.resolving.borrow_mut().remove(&key);
                resolved.handle().filter(|handle| *handle != owner)
            }
        }
    }

    /// Direct prototypes of `handle` that resolve, in declaration order.
    pub fn prototypes(&self, handle: ValueHandle<'s>) -> Vec<ValueHandle<'s>> {
        let count = handle.object().map_or(0, |o| o.prototypes.len());
        (0..count)
            .filter_map(|index| self.resolve_prototype(handle, index))
            .collect()
    }

    /// Whether `base` is reachable from `derived` through prototypes.
    pub fn derives_from(&self, derived: ValueHandle<'s>, base: ValueHandle<'s>) -> bool {
        let mut visited = HashSet::new();
        let mut stack = vec![derived];
        while let Some(current) = stack.pop() {
            if current == base {
                return true;
            }
            if !visited.insert(current.key()) {
                continue;
            }
            stack.extend(self.prototypes(current));
        }
        false
    }

    // ------------------------------------------------------------------------
    // Member lookup
    // ------------------------------------------------------------------------

    /// Members named `name` on `handle` or the nearest prototype declaring it.
    pub fn find_member(&self, handle: ValueHandle<'s>, name: &str) -> Vec<MemberHit<'s>> {
        let mut visited = HashSet::new();
        self.find_member_in(handle, name, &mut visited)
    }

    fn find_member_in(
        &self,
        handle: ValueHandle<'s>,
        name: &str,
        visited: &mut HashSet<(&'s str, ValueId)>,
    ) -> Vec<MemberHit<'s>> {
        if !visited.insert(handle.key()) {
            trace!(value = %handle.id, doc = %handle.doc.path, "cyclic prototype chain");
            return Vec::new();
        }
        let Some(object) = handle.object() else {
            return Vec::new();
        };
        let own: Vec<MemberHit<'s>> = object
            .own_members(name)
            .map(|member| MemberHit {
                member,
                owner: handle,
            })
            .collect();
        if !own.is_empty() {
            return own;
        }
        for index in 0..object.prototypes.len() {
            if let Some(prototype) = self.resolve_prototype(handle, index) {
                let hits = self.find_member_in(prototype, name, visited);
                if !hits.is_empty() {
                    return hits;
                }
            }
        }
        Vec::new()
    }

    /// What a member's value or declared type resolves to.
    pub fn member_type(&self, hit: &MemberHit<'s>) -> ResolvedType<'s> {
        if let Some(id) = hit.member.value {
            return ResolvedType::Value(hit.owner.sibling(id));
        }
        match &hit.member.type_ref {
            Some(type_ref) => self.resolve_type(type_ref, hit.owner.doc),
            None => ResolvedType::Unknown,
        }
    }

    // ------------------------------------------------------------------------
    // Name lookup
    // ------------------------------------------------------------------------

    /// Resolve an unqualified name, innermost frame first.
    pub fn find_name(&self, name: &str) -> Vec<NameHit<'s>> {
        for frame in self.chain.frames() {
            if let Some(bound) = frame.binding(name) {
                return vec![NameHit::Binding(bound)];
            }
            for object in &frame.objects {
                let hits = self.find_member(*object, name);
                if !hits.is_empty() {
                    return hits.into_iter().map(NameHit::Member).collect();
                }
            }
        }
        Vec::new()
    }

    /// Resolve a name in the Global frame only (`::name`, boxing classes).
    pub fn find_global_name(&self, name: &str) -> Vec<NameHit<'s>> {
        let Some(global) = self.chain.global() else {
            return Vec::new();
        };
        for object in &global.objects {
            let hits = self.find_member(*object, name);
            if !hits.is_empty() {
                return hits.into_iter().map(NameHit::Member).collect();
            }
        }
        Vec::new()
    }

    /// The value a name hit denotes (for type names, the type itself).
    pub fn hit_type(&self, hit: &NameHit<'s>) -> ResolvedType<'s> {
        match hit {
            NameHit::Member(member) => self.member_type(member),
            NameHit::Binding(handle) => ResolvedType::Value(*handle),
        }
    }

    // ------------------------------------------------------------------------
    // Type resolution
    // ------------------------------------------------------------------------

    /// Resolve a type reference.
    ///
    /// The first segment is looked up through the scope chain (only the
    /// Global frame for `::`-anchored names), falling back to the globals of
    /// `origin`, the document that spelled the type. Remaining segments are
    /// member lookups.
    pub fn resolve_type(&self, type_ref: &TypeRef, origin: &'s Document) -> ResolvedType<'s> {
        let segments = type_ref.segments();
        let Some((first, rest)) = segments.split_first() else {
            return ResolvedType::Unknown;
        };
        if rest.is_empty() {
            if let Some(primitive) = PrimitiveKind::from_type_name(first) {
                return ResolvedType::Primitive(primitive);
            }
        }

        let hits = if type_ref.is_global() {
            self.find_global_name(first)
        } else {
            self.find_name(first)
        };
        let mut current = hits
            .iter()
            .filter_map(|hit| self.hit_type(hit).handle())
            .find(|handle| is_type_like(handle.value()))
            .or_else(|| self.find_in_document(origin, first));

        for segment in rest {
            let Some(scope) = current else {
                break;
            };
            current = self
                .find_member(scope, segment)
                .iter()
                .filter_map(|hit| self.member_type(hit).handle())
                .find(|handle| is_type_like(handle.value()));
        }

        match current {
            Some(handle) => ResolvedType::Value(handle),
            None => ResolvedType::Unknown,
        }
    }

    /// Look up a type name among the globals `doc` can see on its own.
    fn find_in_document(&self, doc: &'s Document, name: &str) -> Option<ValueHandle<'s>> {
        let snapshot = self.chain.snapshot();
        let mut roots: Vec<ValueHandle<'s>> = Vec::new();
        if let Some(object) = doc.global_object() {
            roots.push(doc.handle(object));
        }
        for included in snapshot.included_documents(doc) {
            if let Some(object) = included.global_object() {
                roots.push(included.handle(object));
            }
        }
        for builtin in snapshot.builtins_for(doc.language) {
            if let Some(object) = builtin.global_object() {
                roots.push(builtin.handle(object));
            }
        }
        roots.into_iter().find_map(|root| {
            self.find_member(root, name)
                .iter()
                .filter_map(|hit| self.member_type(hit).handle())
                .find(|handle| is_type_like(handle.value()))
        })
    }
}

fn is_type_like(value: &Value) -> bool {
    matches!(value, Value::Object(_) | Value::Enumerator(_))
}

// ============================================================================
// Tests
// ============================================================================
