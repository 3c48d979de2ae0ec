//! Snippet definitions and the modification-time keyed snippet cache.
//!
//! ## File Format
//!
//! ```json
//! {
//!   "snippets": [
//!     { "body": "property ${type} ${name}: ${value}", "description": "with value" },
//!     { "title": "Item", "body": "Item {\n    id: ${name}\n}" }
//!   ]
//! }
//! ```
//!
//! `${text}` marks a tab stop with default text `text`; `$$` is a literal
//! `$`. Inside the engine tab stops are delimited by [`PLACEHOLDER_MARK`]
//! pairs. Without an explicit title, a snippet is titled by the leading
//! alphanumeric run of its body.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::types::Span;

use super::item::{CompletionItem, CompletionOrder, IconKind, Payload};

/// Delimits placeholder text in snippet bodies (U+FFFC OBJECT REPLACEMENT).
pub const PLACEHOLDER_MARK: char = '\u{FFFC}';

// ============================================================================
// Errors
// ============================================================================

/// Errors loading a snippet file.
#[derive(Debug, Error)]
pub enum SnippetError {
    /// The file could not be read.
    #[error("cannot read snippet file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid snippet JSON.
    #[error("invalid snippet file {path}: {source}")]
    Invalid {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// A `${` tab stop is never closed.
    #[error("unterminated tab stop at byte {offset} in snippet #{index}")]
    UnterminatedTabStop { index: usize, offset: usize },

    /// Neither an explicit nor a derived title.
    #[error("snippet #{index} has no title")]
    MissingTitle { index: usize },
}

// ============================================================================
// Snippets
// ============================================================================

#[derive(Debug, Deserialize)]
struct SnippetFile {
    snippets: Vec<SnippetEntry>,
}

#[derive(Debug, Deserialize)]
struct SnippetEntry {
    #[serde(default)]
    title: Option<String>,
    body: String,
    #[serde(default)]
    description: Option<String>,
}

/// One snippet definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snippet {
    pub title: String,
    /// Body with [`PLACEHOLDER_MARK`]-delimited placeholders.
    pub body: String,
    pub description: Option<String>,
}

impl Snippet {
    /// The completion item offering this snippet.
    pub fn completion_item(&self) -> CompletionItem {
        let text = match &self.description {
            Some(description) if !description.is_empty() => {
                format!("{} {}", self.title, description)
            }
            _ => self.title.clone(),
        };
        CompletionItem::new(text, CompletionOrder::Snippet, IconKind::Snippet)
            .with_payload(Payload::Snippet {
                body: self.body.clone(),
            })
            .with_details(self.preview())
    }

    /// Body as it will be inserted, empty placeholders shown as `...`.
    pub fn preview(&self) -> String {
        let mut preview = String::with_capacity(self.body.len());
        let mut in_placeholder = false;
        let mut placeholder_empty = true;
        for ch in self.body.chars() {
            if ch == PLACEHOLDER_MARK {
                if in_placeholder && placeholder_empty {
                    preview.push_str("...");
                }
                in_placeholder = !in_placeholder;
                placeholder_empty = true;
                continue;
            }
            placeholder_empty = false;
            preview.push(ch);
        }
        preview.trim_end().to_string()
    }
}

/// Strip placeholder marks; returns the text and the first placeholder's
/// span within it.
pub fn expand_snippet(body: &str) -> (String, Option<Span>) {
    let mut expanded = String::with_capacity(body.len());
    let mut first: Option<Span> = None;
    let mut open: Option<usize> = None;
    for ch in body.chars() {
        if ch != PLACEHOLDER_MARK {
            expanded.push(ch);
            continue;
        }
        match open.take() {
            Some(start) => {
                if first.is_none() {
                    first = Some(Span::new(start, expanded.len()));
                }
            }
            None => open = Some(expanded.len()),
        }
    }
    (expanded, first)
}

/// Convert `${text}` tab stops to marker pairs.
fn convert_tab_stops(source: &str, index: usize) -> Result<String, SnippetError> {
    let mut body = String::with_capacity(source.len());
    let mut rest = source;
    let mut consumed = 0;
    while let Some(dollar) = rest.find('$') {
        body.push_str(&rest[..dollar]);
        let after = &rest[dollar + 1..];
        if let Some(tail) = after.strip_prefix('$') {
            body.push('$');
            consumed += dollar + 2;
            rest = tail;
        } else if let Some(tail) = after.strip_prefix('{') {
            let Some(close) = tail.find('}') else {
                return Err(SnippetError::UnterminatedTabStop {
                    index,
                    offset: consumed + dollar,
                });
            };
            body.push(PLACEHOLDER_MARK);
            body.push_str(&tail[..close]);
            body.push(PLACEHOLDER_MARK);
            consumed += dollar + 2 + close + 1;
            rest = &tail[close + 1..];
        } else {
            body.push('$');
            consumed += dollar + 1;
            rest = after;
        }
    }
    body.push_str(rest);
    Ok(body)
}

fn derived_title(body: &str) -> &str {
    let end = body
        .char_indices()
        .find(|(_, ch)| !ch.is_alphanumeric())
        .map_or(body.len(), |(i, _)| i);
    &body[..end]
}

/// Parse snippet JSON.
pub fn parse_snippets(content: &str, path: &str) -> Result<Vec<Snippet>, SnippetError> {
    let file: SnippetFile =
        serde_json::from_str(content).map_err(|source| SnippetError::Invalid {
            path: path.to_string(),
            source,
        })?;
    file.snippets
        .into_iter()
        .enumerate()
        .map(|(index, entry)| {
            let body = convert_tab_stops(&entry.body, index)?;
            let title = match entry.title {
                Some(title) if !title.is_empty() => title,
                _ => derived_title(&body).to_string(),
            };
            if title.is_empty() {
                return Err(SnippetError::MissingTitle { index });
            }
            Ok(Snippet {
                title,
                body,
                description: entry.description,
            })
        })
        .collect()
}

/// Read and parse a snippet file.
pub fn load_snippets(path: &Path) -> Result<Vec<Snippet>, SnippetError> {
    let display = path.display().to_string();
    let content = std::fs::read_to_string(path).map_err(|source| SnippetError::Read {
        path: display.clone(),
        source,
    })?;
    parse_snippets(&content, &display)
}

// ============================================================================
// Cache
// ============================================================================

/// Snippet list cached by file modification time.
///
/// A failed reload keeps the previous list; the failing modification time
/// is remembered so the same broken file is not re-read on every request.
#[derive(Debug, Clone, Default)]
pub struct SnippetCache {
    path: Option<PathBuf>,
    modified: Option<SystemTime>,
    snippets: Vec<Snippet>,
}

impl SnippetCache {
    /// A cache for `path`; nothing is read until [`SnippetCache::refresh`].
    pub fn new(path: Option<PathBuf>) -> Self {
        SnippetCache {
            path,
            modified: None,
            snippets: Vec::new(),
        }
    }

    /// The snippet file, if configured.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Reload if the file changed since the last load, then return the list.
    pub fn refresh(&mut self) -> &[Snippet] {
        let Some(path) = self.path.as_deref() else {
            return &self.snippets;
        };
        let Ok(modified) = std::fs::metadata(path).and_then(|m| m.modified()) else {
            return &self.snippets;
        };
        if self.modified == Some(modified) {
            return &self.snippets;
        }
        self.modified = Some(modified);
        match load_snippets(path) {
            Ok(snippets) => {
                debug!(path = %path.display(), count = snippets.len(), "snippets loaded");
                self.snippets = snippets;
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "keeping previous snippets");
            }
        }
        &self.snippets
    }

    /// The cached list, without touching the file.
    pub fn snippets(&self) -> &[Snippet] {
        &self.snippets
    }

    /// Completion items for the cached list.
    pub fn completion_items(&self) -> Vec<CompletionItem> {
        self.snippets.iter().map(Snippet::completion_item).collect()
    }
}
