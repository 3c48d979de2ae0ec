//! Error types and error code constants for tugsense.
//!
//! This module provides a unified error type (`SenseError`) that bridges
//! domain-specific errors from different subsystems (configuration, snippet
//! resources, fragment parsing) into a common format suitable for JSON output.
//!
//! ## Error Code Mapping
//!
//! - `2`: Invalid arguments (bad input from caller)
//! - `3`: Resolution errors (document not found, offset out of range)
//! - `10`: Internal errors (I/O, malformed snapshot files)
//!
//! ## Where Errors Exist
//!
//! The completion pipeline itself never fails. Unparsable fragments,
//! unresolved names and cyclic prototype chains all degrade to fewer
//! candidates. Errors only appear at the host boundary: loading snapshots,
//! configuration and snippet files, and validating CLI arguments.

use std::fmt;

use thiserror::Error;

use crate::config::ConfigError;
use crate::completion::snippet::SnippetError;
use crate::expr::ParseError;

// ============================================================================
// Output Error Codes
// ============================================================================

/// Error codes for JSON output.
///
/// These codes map to CLI exit codes and appear in JSON error responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OutputErrorCode {
    /// Invalid arguments from caller (bad input, malformed request).
    InvalidArguments = 2,
    /// Resolution errors (document not found, offset out of range).
    ResolutionError = 3,
    /// Internal errors (I/O, JSON).
    InternalError = 10,
}

impl OutputErrorCode {
    /// Get the numeric code value.
    pub fn code(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for OutputErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ============================================================================
// Unified Error Type
// ============================================================================

/// Unified error type for host-facing operations.
#[derive(Debug, Error)]
pub enum SenseError {
    /// Invalid arguments from caller.
    #[error("invalid arguments: {message}")]
    InvalidArguments { message: String },

    /// The requested document is not part of the pinned snapshot.
    #[error("document not found in snapshot: {path}")]
    DocumentNotFound { path: String },

    /// The cursor offset lies beyond the document text.
    #[error("offset {offset} is out of range for {path} (length {len})")]
    OffsetOutOfRange {
        path: String,
        offset: usize,
        len: usize,
    },

    /// An expression given on the command line does not parse.
    #[error("expression does not parse: {0}")]
    Parse(#[from] ParseError),

    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Snippet resource could not be loaded.
    #[error("snippet error: {0}")]
    Snippet(#[from] SnippetError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error (snapshot files, output).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for host-facing operations.
pub type SenseResult<T> = Result<T, SenseError>;

// ============================================================================
// Error Code Mapping
// ============================================================================

impl From<&SenseError> for OutputErrorCode {
    fn from(err: &SenseError) -> Self {
        match err {
            SenseError::InvalidArguments { .. } => OutputErrorCode::InvalidArguments,
            SenseError::Parse(_) => OutputErrorCode::InvalidArguments,
            SenseError::Config(_) => OutputErrorCode::InvalidArguments,
            SenseError::DocumentNotFound { .. } => OutputErrorCode::ResolutionError,
            SenseError::OffsetOutOfRange { .. } => OutputErrorCode::ResolutionError,
            SenseError::Snippet(_) => OutputErrorCode::InternalError,
            SenseError::Io(_) => OutputErrorCode::InternalError,
            SenseError::Json(_) => OutputErrorCode::InternalError,
        }
    }
}

impl From<SenseError> for OutputErrorCode {
    fn from(err: SenseError) -> Self {
        OutputErrorCode::from(&err)
    }
}

// ============================================================================
// Convenience Constructors
// ============================================================================

impl SenseError {
    /// Create an invalid arguments error.
    pub fn invalid_args(message: impl Into<String>) -> Self {
        SenseError::InvalidArguments {
            message: message.into(),
        }
    }

    /// Create a document not found error.
    pub fn document_not_found(path: impl Into<String>) -> Self {
        SenseError::DocumentNotFound { path: path.into() }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> OutputErrorCode {
        OutputErrorCode::from(self)
    }
}

// ============================================================================
// Tests
// ============================================================================
