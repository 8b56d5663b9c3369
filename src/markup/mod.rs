//! Markup formatting seam.
//!
//! The pipeline hands the document, with every ASP block replaced by a
//! placeholder token, to a [`MarkupFormatter`]. [`HtmlFormatter`] drives
//! `markup_fmt` and is what [`render`](crate::render) uses. [`LineIndenter`]
//! only re-indents lines and gives fully predictable output, which suits tests
//! and callers that want the smallest possible diff.

pub mod html;
pub mod indent;

use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use html::HtmlFormatter;
pub use indent::LineIndenter;

/// Accepted values of [`MarkupOptions::wrap_attributes`]
pub const WRAP_ATTRIBUTE_MODES: &[&str] = &[
    "auto",
    "force",
    "force-aligned",
    "force-expand-multiline",
    "aligned-multiple",
    "preserve",
    "preserve-aligned",
];

// Serde default functions
fn default_indent_size() -> usize {
    4
}
fn default_wrap_line_length() -> usize {
    120
}
fn default_max_preserve_newlines() -> usize {
    2
}
fn default_wrap_attributes() -> String {
    "auto".to_string()
}
fn default_true() -> bool {
    true
}

/// Options forwarded untouched to the markup formatter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkupOptions {
    /// Indent width per nesting level (default: 4)
    #[serde(default = "default_indent_size")]
    pub indent_size: usize,

    /// Indent with tabs instead of spaces (default: false)
    #[serde(default)]
    pub indent_with_tabs: bool,

    /// Preferred maximum line width (default: 120)
    #[serde(default = "default_wrap_line_length")]
    pub wrap_line_length: usize,

    /// Keep blank lines from the input (default: true)
    #[serde(default = "default_true")]
    pub preserve_newlines: bool,

    /// Longest run of blank lines kept; 0 keeps them all (default: 2)
    #[serde(default = "default_max_preserve_newlines")]
    pub max_preserve_newlines: usize,

    /// Attribute wrapping mode (default: "auto")
    #[serde(default = "default_wrap_attributes")]
    pub wrap_attributes: String,

    /// End the output with a newline (default: false)
    #[serde(default)]
    pub end_with_newline: bool,
}

impl Default for MarkupOptions {
    fn default() -> Self {
        Self {
            indent_size: 4,
            indent_with_tabs: false,
            wrap_line_length: 120,
            preserve_newlines: true,
            max_preserve_newlines: 2,
            wrap_attributes: "auto".to_string(),
            end_with_newline: false,
        }
    }
}

impl MarkupOptions {
    /// Whitespace for one indent level
    #[must_use]
    pub fn indent_unit(&self) -> String {
        if self.indent_with_tabs {
            "\t".to_string()
        } else {
            " ".repeat(self.indent_size)
        }
    }

    /// Whether a run of `run` blank lines is longer than what is kept
    #[must_use]
    pub fn exceeds_blank_limit(&self, run: usize) -> bool {
        !self.preserve_newlines
            || (self.max_preserve_newlines > 0 && run > self.max_preserve_newlines)
    }
}

/// A pure `format(text, options) -> text` markup pretty-printer
pub trait MarkupFormatter: Send + Sync {
    fn format(&self, text: &str, options: &MarkupOptions) -> Result<String>;
}

impl<F> MarkupFormatter for F
where
    F: Fn(&str, &MarkupOptions) -> Result<String> + Send + Sync,
{
    fn format(&self, text: &str, options: &MarkupOptions) -> Result<String> {
        self(text, options)
    }
}
