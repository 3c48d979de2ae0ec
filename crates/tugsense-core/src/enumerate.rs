//! Member enumeration over values and whole scope chains.
//!
//! Enumeration walks from the starting object outward: own members first,
//! then prototypes depth-first. The first occurrence of a name wins and is
//! never overwritten, so derived members shadow base members and inner
//! scopes shadow outer ones. A visited set stops cyclic prototype graphs.
//!
//! Category policy:
//!
//! | Category | Included when |
//! |----------|---------------|
//! | Signal | `include_signals` |
//! | Slot | not global completion, or C++ lookup |
//! | Enumerator | not global completion, or `keep_enumerators_in_global` |
//! | GeneratedSlot | `enumerate_generated_slots`, or the enumerated type's class name ends with `keys_companion_suffix` |
//! | Variable | not QML lookup |
//!
//! Private members are visible only to the declaring class; protected
//! members also to classes derived from it.

use std::collections::{BTreeMap, HashSet};

use tracing::trace;

use crate::document::ValueHandle;
use crate::lookup::{Lookup, MemberHit, ResolvedType};
use crate::scope::Frame;
use crate::value::{Member, MemberCategory, ValueId, Visibility};

// ============================================================================
// Options
// ============================================================================

/// Which declarations count as visible names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LookupMode {
    /// Script lookup: `var` declarations are names.
    #[default]
    Js,
    /// QML binding lookup: script variable declarations are not visible.
    Qml,
    /// C++ lookup: slots are ordinary member functions.
    Cpp,
}

/// Enumeration policy.
#[derive(Debug, Clone)]
pub struct EnumerateOptions<'s> {
    /// Unqualified completion: drop enumerators and slots.
    pub global_completion: bool,
    /// Include accessors a framework generates for declared properties.
    pub enumerate_generated_slots: bool,
    /// Include signal declarations.
    pub include_signals: bool,
    /// Keep enumerator constants even in global completion.
    pub keep_enumerators_in_global: bool,
    /// Name visibility rules.
    pub lookup_mode: LookupMode,
    /// Class the completion happens in, for access control.
    pub viewer: Option<ValueHandle<'s>>,
    /// Class-name suffix whose generated slots are always enumerated.
    pub keys_companion_suffix: String,
}

impl Default for EnumerateOptions<'_> {
    fn default() -> Self {
        EnumerateOptions {
            global_completion: false,
            enumerate_generated_slots: false,
            include_signals: false,
            keep_enumerators_in_global: false,
            lookup_mode: LookupMode::Js,
            viewer: None,
            keys_companion_suffix: "Keys".to_string(),
        }
    }
}

// ============================================================================
// Candidates
// ============================================================================

/// One enumerated name.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'s> {
    pub category: MemberCategory,
    /// The declaring member; `None` for names bound by imports.
    pub member: Option<&'s Member>,
    /// Declaring object, or the bound value for import bindings.
    pub declaring: ValueHandle<'s>,
}

impl<'s> Candidate<'s> {
    /// What the name denotes.
    pub fn resolve(&self, lookup: &Lookup<'_, 's>) -> ResolvedType<'s> {
        match self.member {
            Some(member) => lookup.member_type(&MemberHit {
                member,
                owner: self.declaring,
            }),
            None => ResolvedType::Value(self.declaring),
        }
    }
}

/// Enumerated names, each with its nearest declaration.
pub type Members<'s> = BTreeMap<&'s str, Candidate<'s>>;

// ============================================================================
// Enumerator
// ============================================================================

/// Enumerates members under one policy.
#[derive(Debug)]
pub struct MemberEnumerator<'l, 'c, 's> {
    lookup: &'l Lookup<'c, 's>,
    options: EnumerateOptions<'s>,
}

struct Walk<'s> {
    visited: HashSet<(&'s str, ValueId)>,
    members: Members<'s>,
    /// Class name of the enumerated value (none in chain enumeration).
    start_class: Option<&'s str>,
}

impl<'l, 'c, 's> MemberEnumerator<'l, 'c, 's> {
    /// Create an enumerator.
    pub fn new(lookup: &'l Lookup<'c, 's>, options: EnumerateOptions<'s>) -> Self {
        MemberEnumerator { lookup, options }
    }

    /// The active options.
    pub fn options(&self) -> &EnumerateOptions<'s> {
        &self.options
    }

    /// Members of one value and its prototypes.
    pub fn enumerate_value(&self, value: ValueHandle<'s>) -> Members<'s> {
        self.enumerate_values(&[value])
    }

    /// Members of several candidate values, merged in order.
    pub fn enumerate_values(&self, values: &[ValueHandle<'s>]) -> Members<'s> {
        let mut walk = Walk {
            visited: HashSet::new(),
            members: BTreeMap::new(),
            start_class: None,
        };
        for value in values {
            walk.start_class = value.object().map(|o| o.class_name.as_str());
            self.walk_object(*value, &mut walk);
        }
        walk.members
    }

    /// Every name visible in the scope chain, innermost frame first.
    pub fn enumerate_chain(&self) -> Members<'s> {
        self.enumerate_frames(self.lookup.chain().frames())
    }

    /// Every name visible in the given frames, in order.
    pub fn enumerate_frames(&self, frames: &[Frame<'s>]) -> Members<'s> {
        let mut walk = Walk {
            visited: HashSet::new(),
            members: BTreeMap::new(),
            start_class: None,
        };
        for frame in frames {
            for (name, bound) in &frame.bindings {
                walk.members.entry(*name).or_insert(Candidate {
                    category: MemberCategory::Type,
                    member: None,
                    declaring: *bound,
                });
            }
            for object in &frame.objects {
                self.walk_object(*object, &mut walk);
            }
        }
        walk.members
    }

    fn walk_object(&self, handle: ValueHandle<'s>, walk: &mut Walk<'s>) {
        if !walk.visited.insert(handle.key()) {
            trace!(value = %handle.id, doc = %handle.doc.path, "already enumerated");
            return;
        }
        let Some(object) = handle.object() else {
            return;
        };
        for member in &object.members {
            if walk.members.contains_key(member.name.as_str()) {
                continue;
            }
            if !self.accepts(member, handle, walk.start_class) {
                continue;
            }
            walk.members.insert(
                member.name.as_str(),
                Candidate {
                    category: member.category,
                    member: Some(member),
                    declaring: handle,
                },
            );
        }
        for prototype in self.lookup.prototypes(handle) {
            self.walk_object(prototype, walk);
        }
    }

    fn accepts(&self, member: &Member, declaring: ValueHandle<'s>, start_class: Option<&str>) -> bool {
        let options = &self.options;
        let category_ok = match member.category {
            MemberCategory::Signal => options.include_signals,
            MemberCategory::Slot => {
                !options.global_completion || options.lookup_mode == LookupMode::Cpp
            }
            MemberCategory::Enumerator => {
                !options.global_completion || options.keep_enumerators_in_global
            }
            MemberCategory::GeneratedSlot => {
                options.enumerate_generated_slots
                    || (!options.keys_companion_suffix.is_empty()
                        && start_class
                            .is_some_and(|class| class.ends_with(&options.keys_companion_suffix)))
            }
            MemberCategory::Variable => options.lookup_mode != LookupMode::Qml,
            MemberCategory::Property
            | MemberCategory::Function
            | MemberCategory::Type
            | MemberCategory::Namespace => true,
        };
        category_ok && self.visible(member.visibility, declaring)
    }

    fn visible(&self, visibility: Visibility, declaring: ValueHandle<'s>) -> bool {
        match (visibility, self.options.viewer) {
            (Visibility::Public, _) => true,
            (_, None) => false,
            (Visibility::Private, Some(viewer)) => viewer == declaring,
            (Visibility::Protected, Some(viewer)) => {
                viewer == declaring || self.lookup.derives_from(viewer, declaring)
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::DocumentBuilder;
    use crate::document::{Document, Language};
    use crate::scope::{resolve_scope, CursorPosition};
    use crate::snapshot::Snapshot;
    use crate::types::Span;
    use crate::value::{FunctionValue, ObjectValue, Prototype, TypeRef};

    fn names(members: &Members<'_>) -> Vec<String> {
        members.keys().map(|k| k.to_string()).collect()
    }

    /// Base { bar, qux, -secret, #guarded }, Derived : Base { bar, baz, sig, slot }
    fn classes() -> Document {
        let mut b = DocumentBuilder::new("c.cpp", Language::Cpp).source(" ".repeat(40));
        b.begin_class("Base", Span::new(0, 10));
        b.function(FunctionValue::new("bar"));
        b.variable("qux", TypeRef::new("int"));
        b.declare(
            Member::typed("secret", MemberCategory::Variable, TypeRef::new("int"))
                .with_visibility(Visibility::Private),
        );
        b.declare(
            Member::typed("guarded", MemberCategory::Variable, TypeRef::new("int"))
                .with_visibility(Visibility::Protected),
        );
        b.end();
        b.begin_class("Derived", Span::new(10, 30));
        b.base(TypeRef::new("Base"));
        b.function(FunctionValue::new("bar"));
        b.variable("baz", TypeRef::new("int"));
        b.callable(FunctionValue::new("changed"), MemberCategory::Signal);
        b.callable(FunctionValue::new("refresh"), MemberCategory::Slot);
        b.enumeration("Mode", &["On", "Off"]);
        b.begin_function(FunctionValue::new("method"), Span::new(20, 28));
        b.end();
        b.end();
        b.finish()
    }

    mod value_enumeration {
        use super::*;

        #[test]
        fn derived_shadows_base() {
            let doc = classes();
            let snapshot = Snapshot::new();
            let chain = resolve_scope(&snapshot, &doc, CursorPosition::Offset(35));
            let lookup = Lookup::new(&chain);
            let derived = lookup.resolve_type(&TypeRef::new("Derived"), &doc).handle().unwrap();

            let members = MemberEnumerator::new(&lookup, EnumerateOptions::default())
                .enumerate_value(derived);
            assert_eq!(
                names(&members),
                vec!["Mode", "Off", "On", "bar", "baz", "method", "qux", "refresh"]
            );
            let bar = members["bar"];
            assert_eq!(bar.declaring.object().unwrap().class_name, "Derived");
        }

        #[test]
        fn signals_only_on_request() {
            let doc = classes();
            let snapshot = Snapshot::new();
            let chain = resolve_scope(&snapshot, &doc, CursorPosition::Offset(35));
            let lookup = Lookup::new(&chain);
            let derived = lookup.resolve_type(&TypeRef::new("Derived"), &doc).handle().unwrap();

            let options = EnumerateOptions {
                include_signals: true,
                ..Default::default()
            };
            let members = MemberEnumerator::new(&lookup, options).enumerate_value(derived);
            assert!(members.contains_key("changed"));
        }

        #[test]
        fn access_control_follows_viewer() {
            let doc = classes();
            let snapshot = Snapshot::new();
            // inside Derived::method
            let chain = resolve_scope(&snapshot, &doc, CursorPosition::Offset(22));
            let lookup = Lookup::new(&chain);
            let base = lookup.resolve_type(&TypeRef::new("Base"), &doc).handle().unwrap();

            let outside = MemberEnumerator::new(&lookup, EnumerateOptions::default())
                .enumerate_value(base);
            assert!(!outside.contains_key("guarded"));
            assert!(!outside.contains_key("secret"));

            let options = EnumerateOptions {
                viewer: chain.class_context(),
                ..Default::default()
            };
            let inside = MemberEnumerator::new(&lookup, options).enumerate_value(base);
            assert!(inside.contains_key("guarded"));
            assert!(!inside.contains_key("secret"));
        }

        #[test]
        fn cyclic_prototypes_terminate() {
            let mut b = DocumentBuilder::new("a.js", Language::JavaScript);
            let first = b.object(ObjectValue::new("First"));
            let second = b.object(ObjectValue::new("Second"));
            b.member_of(first, Member::typed("a", MemberCategory::Property, TypeRef::new("int")));
            b.member_of(second, Member::typed("b", MemberCategory::Property, TypeRef::new("int")));
            b.prototype_of(first, Prototype::Value(second));
            b.prototype_of(second, Prototype::Value(first));
            let doc = b.finish();
            let snapshot = Snapshot::new();
            let chain = resolve_scope(&snapshot, &doc, CursorPosition::Offset(0));
            let lookup = Lookup::new(&chain);

            let members = MemberEnumerator::new(&lookup, EnumerateOptions::default())
                .enumerate_value(doc.handle(first));
            assert_eq!(names(&members), vec!["a", "b"]);
        }
    }

    mod policy {
        use super::*;

        fn keys_doc() -> Document {
            let mut b = DocumentBuilder::new("<qt>", Language::Qml);
            for class in ["ItemKeys", "Item"] {
                b.begin_class(class, Span::default());
                b.callable(FunctionValue::new("onPressed"), MemberCategory::GeneratedSlot);
                b.variable("scratch", TypeRef::new("int"));
                b.end();
            }
            b.finish()
        }

        #[test]
        fn generated_slots_follow_keys_companion_policy() {
            let doc = keys_doc();
            let snapshot = Snapshot::new();
            let chain = resolve_scope(&snapshot, &doc, CursorPosition::Offset(0));
            let lookup = Lookup::new(&chain);
            let keys = lookup.resolve_type(&TypeRef::new("ItemKeys"), &doc).handle().unwrap();
            let item = lookup.resolve_type(&TypeRef::new("Item"), &doc).handle().unwrap();

            let enumerator = MemberEnumerator::new(&lookup, EnumerateOptions::default());
            assert!(enumerator.enumerate_value(keys).contains_key("onPressed"));
            assert!(!enumerator.enumerate_value(item).contains_key("onPressed"));

            let disabled = MemberEnumerator::new(
                &lookup,
                EnumerateOptions {
                    keys_companion_suffix: String::new(),
                    ..Default::default()
                },
            );
            assert!(!disabled.enumerate_value(keys).contains_key("onPressed"));

            let requested = MemberEnumerator::new(
                &lookup,
                EnumerateOptions {
                    enumerate_generated_slots: true,
                    ..Default::default()
                },
            );
            assert!(requested.enumerate_value(item).contains_key("onPressed"));
        }

        #[test]
        fn qml_lookup_skips_script_variables() {
            let doc = keys_doc();
            let snapshot = Snapshot::new();
            let chain = resolve_scope(&snapshot, &doc, CursorPosition::Offset(0));
            let lookup = Lookup::new(&chain);
            let item = lookup.resolve_type(&TypeRef::new("Item"), &doc).handle().unwrap();

            let qml = MemberEnumerator::new(
                &lookup,
                EnumerateOptions {
                    lookup_mode: LookupMode::Qml,
                    ..Default::default()
                },
            );
            assert!(!qml.enumerate_value(item).contains_key("scratch"));
            let js = MemberEnumerator::new(&lookup, EnumerateOptions::default());
            assert!(js.enumerate_value(item).contains_key("scratch"));
        }
    }

    mod chain_enumeration {
        use super::*;

        #[test]
        fn global_completion_drops_enumerators_and_slots() {
            let doc = classes();
            let snapshot = Snapshot::new();
            let chain = resolve_scope(&snapshot, &doc, CursorPosition::Offset(22));
            let lookup = Lookup::new(&chain);

            let options = EnumerateOptions {
                global_completion: true,
                viewer: chain.class_context(),
                ..Default::default()
            };
            let members = MemberEnumerator::new(&lookup, options).enumerate_chain();
            assert!(members.contains_key("baz"));
            assert!(members.contains_key("guarded"));
            assert!(members.contains_key("Base"));
            assert!(members.contains_key("method"));
            assert!(!members.contains_key("On"));
            assert!(!members.contains_key("refresh"));

            let cpp = EnumerateOptions {
                global_completion: true,
                keep_enumerators_in_global: true,
                lookup_mode: LookupMode::Cpp,
                viewer: chain.class_context(),
                ..Default::default()
            };
            let members = MemberEnumerator::new(&lookup, cpp).enumerate_chain();
            assert!(members.contains_key("On"));
            assert!(members.contains_key("refresh"));
        }

        #[test]
        fn inner_scope_wins_over_outer() {
            let mut b = DocumentBuilder::new("a.cpp", Language::Cpp).source(" ".repeat(10));
            b.variable("x", TypeRef::new("int"));
            b.begin_function(FunctionValue::new("f"), Span::new(0, 10));
            b.variable("x", TypeRef::new("double"));
            b.end();
            let doc = b.finish();
            let snapshot = Snapshot::new();
            let chain = resolve_scope(&snapshot, &doc, CursorPosition::Offset(5));
            let lookup = Lookup::new(&chain);

            let members = MemberEnumerator::new(&lookup, EnumerateOptions::default())
                .enumerate_chain();
            let x = members["x"];
            assert_eq!(x.member.unwrap().type_ref, Some(TypeRef::new("double")));
        }
    }
}
