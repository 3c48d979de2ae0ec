//! QML and JavaScript support for tugsense.
//!
//! This crate provides:
//! - Binding context detection (which QML object the cursor is in, and
//!   whether it sits left or right of a binding colon)
//! - The QML/JS completion collector

pub mod completion;
pub mod context;
pub mod keywords;

pub use completion::QmlJsCompletion;
pub use context::{BindingSide, QmlContext};
