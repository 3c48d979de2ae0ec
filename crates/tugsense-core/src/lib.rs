//! Core infrastructure for tugsense.
//!
//! This crate provides the language-agnostic completion pipeline:
//! - Documents, values and scopes produced by a host parser
//! - Snapshot store with pin-per-request semantics
//! - Scope resolution (cursor position to scope chain)
//! - Expression fragments and the evaluator that types them
//! - Member enumeration over prototype/base chains
//! - Completion ranking, filtering and the session controller
//! - Error types, configuration and text utilities

pub mod builder;
pub mod completion;
pub mod config;
pub mod cursor;
pub mod document;
pub mod enumerate;
pub mod error;
pub mod evaluate;
pub mod expr;
pub mod lookup;
pub mod scope;
pub mod snapshot;
pub mod text;
pub mod types;
pub mod value;
