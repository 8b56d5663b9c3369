//! Error types and result aliases for aspfmt.
//!
//! This module defines the error handling infrastructure:
//! - [`Result<T>`]: Type alias for `anyhow::Result<T>` used throughout the crate
//! - [`FormatError`]: Recoverable failures raised while formatting one piece of a
//!   document. Callers inside the pipeline catch these and keep the original text.

use anyhow::Result as AnyhowResult;
use thiserror::Error;

pub type Result<T> = AnyhowResult<T>;

/// Failures the formatting stages report instead of producing output
#[derive(Debug, Error)]
pub enum FormatError {
    /// A script line whose quotes do not balance; the beautifier cannot tell
    /// code from string contents on it
    #[error("unterminated string literal on script line {line}")]
    UnterminatedString { line: usize },

    /// The markup formatter rejected its input
    #[error("markup formatter failed: {0}")]
    Markup(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
