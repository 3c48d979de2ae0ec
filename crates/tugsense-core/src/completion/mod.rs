//! Completion list construction and the session controller.
//!
//! - [`item`]: completion items, category orders and icons
//! - [`rank`]: sort key, deduplication, prefix filtering
//! - [`session`]: per-invocation state and the [`CompletionCollector`] trait
//! - [`editor`]: the host editor interface
//! - [`hint`]: function-argument hints
//! - [`snippet`]: snippet definitions and their cache
//! - [`trigger`]: keystroke rules

pub mod editor;
pub mod hint;
pub mod item;
pub mod rank;
pub mod session;
pub mod snippet;
pub mod trigger;

pub use editor::{TextBuffer, TextEditor};
pub use hint::FunctionHint;
pub use item::{CompletionItem, CompletionOrder, IconKind, Payload, PayloadKind};
pub use rank::{filter_by_prefix, rank};
pub use session::{CompletionCollector, CompletionSession};
pub use snippet::{Snippet, SnippetCache, SnippetError};
