//! tugsense: scope-aware code completion for C++ and QML/JS editors.
//!
//! The engine works on a pinned snapshot of parsed documents. For a cursor
//! position it resolves the scope chain, types the expression before a
//! completion operator, enumerates the members that value exposes and ranks
//! them into completion items.
//!
//! This crate re-exports the workspace crates and adds the CLI front door:
//! - the `tugsense-core` modules, re-exported at the top level: documents,
//!   snapshots, scope chains, evaluation, ranking, sessions
//! - [`cpp`]: macro expansion and the C++ completion collector
//! - [`qmljs`]: binding context detection and the QML/JS completion collector

pub use tugsense_cpp as cpp;
pub use tugsense_qmljs as qmljs;

pub use tugsense_core::{
    builder, completion, config, cursor, document, enumerate, error, evaluate, expr, lookup,
    scope, snapshot, text, types, value,
};

pub mod cli;
pub mod output;
