//! Expression evaluation: fragment + scope chain to candidate lookup items.
//!
//! Evaluation walks the fragment outward-in. Identifiers resolve against the
//! scope chain, member access converts the base to an object (boxing script
//! primitives) and looks the name up along its prototype chain, and calls
//! resolve to the callee's declared return type. Every step fans out over
//! all candidates of the previous step; results are unioned in first-seen
//! order, so evaluating the same fragment against the same snapshot always
//! yields the same list.
//!
//! Nothing here fails: an unparsable fragment or an unresolvable name
//! simply produces no items.

use tracing::debug;

use crate::document::{NodeId, NodeKind, ValueHandle};
use crate::expr::{parse_expression, Dialect, Expr, LiteralKind};
use crate::lookup::{Lookup, NameHit, ResolvedType};
use crate::scope::ScopeChain;
use crate::value::{PrimitiveKind, Value};

// ============================================================================
// Lookup Items
// ============================================================================

/// One candidate interpretation of an expression.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LookupItem<'s> {
    /// Name the candidate was found under (the last name in the fragment).
    pub name: &'s str,
    /// What the expression evaluates to.
    pub ty: ResolvedType<'s>,
    /// Object whose scope or membership table declared the name.
    pub declaring: Option<ValueHandle<'s>>,
}

impl<'s> LookupItem<'s> {
    fn new(name: &'s str, ty: ResolvedType<'s>, declaring: Option<ValueHandle<'s>>) -> Self {
        LookupItem {
            name,
            ty,
            declaring,
        }
    }
}

// ============================================================================
// Evaluator
// ============================================================================

/// Evaluates fragments against one scope chain.
#[derive(Debug)]
pub struct Evaluator<'c, 's> {
    lookup: Lookup<'c, 's>,
    dialect: Dialect,
}

impl<'c, 's> Evaluator<'c, 's> {
    /// Create an evaluator in the dialect of the chain's document.
    pub fn new(chain: &'c ScopeChain<'s>) -> Self {
        Evaluator {
            lookup: Lookup::new(chain),
            dialect: chain.document().language.dialect(),
        }
    }

    /// The underlying lookup context.
    pub fn lookup(&self) -> &Lookup<'c, 's> {
        &self.lookup
    }

    /// Parse and evaluate a text fragment; parse failures yield nothing.
    pub fn evaluate_text(&self, text: &str) -> Vec<LookupItem<'s>> {
        match parse_expression(text, self.dialect) {
            Ok(expr) => {
                let items = self.evaluate(&expr);
                debug!(fragment = text, items = items.len(), "fragment evaluated");
                items
            }
            Err(error) => {
                debug!(fragment = text, %error, "fragment does not parse");
                Vec::new()
            }
        }
    }

    /// Evaluate an expression node of the chain's document.
    pub fn evaluate_node(&self, node: NodeId) -> Vec<LookupItem<'s>> {
        let document = self.lookup.chain().document();
        match document.ast.node(node).map(|n| &n.kind) {
            Some(NodeKind::Expression { expr }) => self.evaluate(expr),
            _ => Vec::new(),
        }
    }

    /// Evaluate a parsed expression.
    pub fn evaluate(&self, expr: &Expr) -> Vec<LookupItem<'s>> {
        let mut items = Vec::new();
        self.eval_into(expr, &mut items);
        dedup_preserving_order(items)
    }

    fn eval_into(&self, expr: &Expr, out: &mut Vec<LookupItem<'s>>) {
        match expr {
            Expr::Ident { name } => {
                let hits = self.lookup.find_name(name);
                self.push_hits(&hits, out);
            }
            Expr::Qualified { base: None, name } => {
                let hits = self.lookup.find_global_name(name);
                self.push_hits(&hits, out);
            }
            Expr::Qualified {
                base: Some(base),
                name,
            }
            | Expr::Member { base, name, .. } => {
                for item in self.evaluate(base) {
                    let Some(object) = self.convert_to_object(&item.ty) else {
                        continue;
                    };
                    for hit in self.lookup.find_member(object, name) {
                        out.push(LookupItem::new(
                            hit.member.name.as_str(),
                            self.lookup.member_type(&hit),
                            Some(hit.owner),
                        ));
                    }
                }
            }
            Expr::Call { callee, .. } => {
                for item in self.evaluate(callee) {
                    if let Some(result) = self.call_result(&item) {
                        out.push(result);
                    }
                }
            }
            Expr::New { inner } => {
                for item in self.evaluate(inner) {
                    match item.ty.handle().map(|h| h.value()) {
                        Some(Value::Function(_)) => out.extend(self.call_result(&item)),
                        _ => out.push(item),
                    }
                }
            }
            Expr::Paren { inner } => self.eval_into(inner, out),
            Expr::Subscript { .. } => {}
            Expr::This => {
                if let Some(object) = self.lookup.chain().this_object() {
                    out.push(LookupItem::new("this", ResolvedType::Value(object), None));
                }
            }
            Expr::Literal { kind } => {
                let primitive = match kind {
                    LiteralKind::String => PrimitiveKind::String,
                    LiteralKind::Number => PrimitiveKind::Number,
                    LiteralKind::Char => PrimitiveKind::Char,
                    LiteralKind::Boolean => PrimitiveKind::Boolean,
                    LiteralKind::Null => PrimitiveKind::Null,
                };
                out.push(LookupItem::new("", ResolvedType::Primitive(primitive), None));
            }
        }
    }

    fn push_hits(&self, hits: &[NameHit<'s>], out: &mut Vec<LookupItem<'s>>) {
        for hit in hits {
            let item = match hit {
                NameHit::Member(member) => LookupItem::new(
                    member.member.name.as_str(),
                    self.lookup.member_type(member),
                    Some(member.owner),
                ),
                NameHit::Binding(handle) => LookupItem::new(
                    handle.object().map_or("", |o| o.class_name.as_str()),
                    ResolvedType::Value(*handle),
                    None,
                ),
            };
            out.push(item);
        }
    }

    /// Result of calling `item`: a function's return type, a constructor's
    /// class, or the class itself for a class called like a function.
    fn call_result(&self, item: &LookupItem<'s>) -> Option<LookupItem<'s>> {
        let handle = item.ty.handle()?;
        let ty = match handle.value() {
            Value::Function(function) if function.constructor => {
                ResolvedType::Value(item.declaring?)
            }
            Value::Function(function) => match &function.returns {
                Some(returns) => self.lookup.resolve_type(returns, handle.doc),
                None => ResolvedType::Unknown,
            },
            Value::Object(_) => ResolvedType::Value(handle),
            _ => return None,
        };
        Some(LookupItem::new(item.name, ty, item.declaring))
    }

    /// The object whose members `ty` exposes.
    ///
    /// Script dialects box primitives into their global wrapper class
    /// (`String`, `Number`, `Boolean`).
    pub fn convert_to_object(&self, ty: &ResolvedType<'s>) -> Option<ValueHandle<'s>> {
        match ty {
            ResolvedType::Value(handle) => handle.object().map(|_| *handle),
            ResolvedType::Primitive(kind) if self.dialect == Dialect::QmlJs => {
                let class = kind.boxing_class()?;
                self.lookup
                    .find_global_name(class)
                    .iter()
                    .filter_map(|hit| self.lookup.hit_type(hit).handle())
                    .find(|handle| handle.object().is_some())
            }
            _ => None,
        }
    }
}

fn dedup_preserving_order(items: Vec<LookupItem<'_>>) -> Vec<LookupItem<'_>> {
    let mut unique: Vec<LookupItem<'_>> = Vec::with_capacity(items.len());
    for item in items {
        if !unique.contains(&item) {
            unique.push(item);
        }
    }
    unique
}

// ============================================================================
// Tests
// ============================================================================
