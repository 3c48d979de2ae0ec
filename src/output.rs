//! JSON output types for CLI responses.
//!
//! Every response is a single JSON object with `status` as its first field
//! and a `schema_version`. Errors use the same envelope:
//!
//! ```json
//! {"status": "error", "schema_version": "1", "error": {"code": 3, "message": "..."}}
//! ```
//!
//! Array order is deterministic: frames innermost first, lookup items in
//! evaluation order, completion items in ranked order.

use std::io::{self, Write};

use serde::Serialize;

use tugsense_core::completion::{CompletionItem, FunctionHint};
use tugsense_core::document::ValueHandle;
use tugsense_core::error::{OutputErrorCode, SenseError};
use tugsense_core::evaluate::LookupItem;
use tugsense_core::lookup::ResolvedType;
use tugsense_core::scope::{Frame, ScopeChain};
use tugsense_core::value::{PrimitiveKind, Value};

/// Current schema version for all responses.
pub const SCHEMA_VERSION: &str = "1";

// ============================================================================
// Common Types
// ============================================================================

/// A value reference: the document it lives in and what it is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValueInfo {
    /// `object`, `function`, `enumerator`, `primitive` or `unknown`.
    pub kind: String,
    /// Class, function or enumeration name; empty for anonymous objects.
    pub name: String,
    /// Path of the owning document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primitive: Option<PrimitiveKind>,
}

impl ValueInfo {
    pub fn from_handle(handle: ValueHandle<'_>) -> Self {
        let value = handle.value();
        let name = match value {
            Value::Object(object) => object.class_name.clone(),
            Value::Function(function) => function.name.clone(),
            Value::Enumerator(enumerator) => enumerator.enum_name.clone(),
            Value::Primitive { .. } | Value::Unknown => String::new(),
        };
        ValueInfo {
            kind: value.kind_str().to_string(),
            name,
            document: Some(handle.doc.path.clone()),
            primitive: match value {
                Value::Primitive { primitive } => Some(*primitive),
                _ => None,
            },
        }
    }

    pub fn from_resolved(resolved: &ResolvedType<'_>) -> Self {
        match resolved {
            ResolvedType::Value(handle) => ValueInfo::from_handle(*handle),
            ResolvedType::Primitive(primitive) => ValueInfo {
                kind: "primitive".to_string(),
                name: String::new(),
                document: None,
                primitive: Some(*primitive),
            },
            ResolvedType::Unknown => ValueInfo {
                kind: "unknown".to_string(),
                name: String::new(),
                document: None,
                primitive: None,
            },
        }
    }
}

/// Error information.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorInfo {
    /// Numeric error code, also the process exit code.
    pub code: u8,
    /// Human-readable message.
    pub message: String,
}

impl ErrorInfo {
    pub fn from_error(err: &SenseError) -> Self {
        ErrorInfo {
            code: OutputErrorCode::from(err).code(),
            message: err.to_string(),
        }
    }
}

// ============================================================================
// Scope Response
// ============================================================================

/// One frame of a resolved scope chain.
#[derive(Debug, Clone, Serialize)]
pub struct FrameInfo {
    pub kind: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Objects whose members are visible in the frame, in search order.
    pub objects: Vec<ValueInfo>,
    /// Names bound by imports.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub bindings: Vec<String>,
}

impl FrameInfo {
    pub fn from_frame(frame: &Frame<'_>) -> Self {
        FrameInfo {
            kind: frame.kind.as_str().to_string(),
            name: frame.name.clone(),
            objects: frame
                .objects
                .iter()
                .map(|object| ValueInfo::from_handle(*object))
                .collect(),
            bindings: frame
                .bindings
                .iter()
                .map(|(name, _)| name.to_string())
                .collect(),
        }
    }
}

/// Response for `tugsense scope`.
#[derive(Debug, Clone, Serialize)]
pub struct ScopeResponse {
    pub status: String,
    pub schema_version: String,
    pub file: String,
    pub offset: usize,
    /// Frames, innermost first.
    pub frames: Vec<FrameInfo>,
}

impl ScopeResponse {
    pub fn new(chain: &ScopeChain<'_>, offset: usize) -> Self {
        ScopeResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            file: chain.document().path.clone(),
            offset,
            frames: chain.frames().iter().map(FrameInfo::from_frame).collect(),
        }
    }
}

// ============================================================================
// Eval Response
// ============================================================================

/// One candidate interpretation of an expression.
#[derive(Debug, Clone, Serialize)]
pub struct LookupItemInfo {
    /// Name the candidate was found under.
    pub name: String,
    /// What the expression evaluates to.
    pub value: ValueInfo,
    /// Object that declared the name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub declaring: Option<ValueInfo>,
}

impl LookupItemInfo {
    pub fn from_item(item: &LookupItem<'_>) -> Self {
        LookupItemInfo {
            name: item.name.to_string(),
            value: ValueInfo::from_resolved(&item.ty),
            declaring: item.declaring.map(ValueInfo::from_handle),
        }
    }
}

/// Response for `tugsense eval`.
#[derive(Debug, Clone, Serialize)]
pub struct EvalResponse {
    pub status: String,
    pub schema_version: String,
    pub expression: String,
    /// The expression after macro expansion, when preprocessing was asked for.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preprocessed: Option<String>,
    pub items: Vec<LookupItemInfo>,
}

impl EvalResponse {
    pub fn new(
        expression: impl Into<String>,
        preprocessed: Option<String>,
        items: &[LookupItem<'_>],
    ) -> Self {
        EvalResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            expression: expression.into(),
            preprocessed,
            items: items.iter().map(LookupItemInfo::from_item).collect(),
        }
    }
}

// ============================================================================
// Complete Response
// ============================================================================

/// Response for `tugsense complete`.
#[derive(Debug, Clone, Serialize)]
pub struct CompleteResponse {
    pub status: String,
    pub schema_version: String,
    pub file: String,
    /// Cursor offset after applying `--typed`.
    pub offset: usize,
    /// Whether the text before the cursor opens completion.
    pub triggered: bool,
    /// Offset the items replace from; `null` when no list opens.
    pub start: Option<usize>,
    /// Ranked items filtered by the typed prefix.
    pub items: Vec<CompletionItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<FunctionHint>,
}

// ============================================================================
// Error Response
// ============================================================================

/// Error response.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub status: String,
    pub schema_version: String,
    pub error: ErrorInfo,
}

impl ErrorResponse {
    pub fn from_error(err: &SenseError) -> Self {
        ErrorResponse {
            status: "error".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            error: ErrorInfo::from_error(err),
        }
    }
}

// ============================================================================
// Emission
// ============================================================================

/// Emit a response as pretty-printed JSON to a writer.
pub fn emit_response<T: Serialize>(response: &T, writer: &mut impl Write) -> io::Result<()> {
    let json = serde_json::to_string_pretty(response)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{}", json)
}

// ============================================================================
// Tests
// ============================================================================
