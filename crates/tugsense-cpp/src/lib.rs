//! C++ support for tugsense.
//!
//! This crate provides:
//! - Macro environments collected across includes, and fragment expansion
//! - Expression typing with optional preprocessing
//! - The C++ completion collector (members, scopes, globals, argument hints,
//!   Qt signals and slots, preprocessor directives, include file names)

pub mod completion;
pub mod keywords;
pub mod preprocess;
pub mod type_of;

pub use completion::{completion_operator, CompletionOperator, CppCompletion};
pub use preprocess::{MacroEnvironment, PreprocessError, Preprocessor};
pub use type_of::{PreprocessMode, TypeOfExpression};
