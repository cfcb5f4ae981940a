//! Error Types
//!
//! The main error type [`HlmsError`] covers resource and compilation
//! failures surfaced through the collaborator interfaces, plus syntax
//! errors promoted to hard failures by strict callers.
//!
//! Template syntax problems are represented by [`SyntaxError`]: inside a
//! parser pass they propagate with `?`; at pass boundaries they degrade to
//! logged diagnostics collected on the render output, because a render is
//! best-effort and must not abort on a single malformed directive.

use thiserror::Error;

/// A malformed directive, expression or block in a shader template.
///
/// Line numbers are 1-based and computed against the buffer the offending
/// pass was scanning at the time.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("syntax error at line {line}: {message}")]
pub struct SyntaxError {
    pub line: usize,
    pub message: String,
}

impl SyntaxError {
    #[must_use]
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

/// The main error type for the HLMS core.
#[derive(Error, Debug)]
pub enum HlmsError {
    /// The requested template file does not exist in the provider.
    #[error("template not found: {0}")]
    TemplateNotFound(String),

    /// A template contained unrecoverable syntax errors and the caller
    /// asked for strict failure.
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    /// The external compiler rejected the generated source.
    #[error("shader program compilation failed: {0}")]
    CompileFailed(String),

    /// File I/O error from a filesystem-backed provider.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Alias for `Result<T, HlmsError>`.
pub type Result<T> = std::result::Result<T, HlmsError>;
