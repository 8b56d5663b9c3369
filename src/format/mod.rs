//! Script beautifiers for code inside ASP blocks.
//!
//! This module contains the line-oriented formatters and their helpers:
//! - [`vbscript`]: indentation state machine for VBScript (`If`/`End If`, loops, `Select Case`...)
//! - [`jscript`]: indentation state machine for JScript, driven by braces and brackets
//! - [`line_split`]: breaks over-long lines at operator, comma or member-access boundaries
//! - [`aligner`]: optional `=` column alignment post-pass
//! - [`literal`]: array/object literal reflow and object-model call spacing
//!
//! Neither beautifier parses its language. Both work one physical line at a
//! time over masked text (string contents and comments blanked), so a keyword
//! inside a literal never moves the indentation.

pub mod aligner;
pub mod jscript;
pub mod line_split;
pub mod literal;
pub mod vbscript;

pub use aligner::AssignmentAligner;
pub use jscript::beautify_jscript;
pub use vbscript::beautify_vbscript;

/// Options shared by both beautifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptOptions {
    /// Spaces per indent level
    pub indent_size: usize,
    /// Break lines longer than this; 0 disables breaking
    pub max_line_length: usize,
    /// Align the `=` of assignment lines
    pub align_assignments: bool,
    /// Append missing statement terminators (JScript only)
    pub statement_terminators: bool,
}

impl Default for ScriptOptions {
    fn default() -> Self {
        Self {
            indent_size: 4,
            max_line_length: 120,
            align_assignments: false,
            statement_terminators: true,
        }
    }
}

/// Leading whitespace for `depth` levels
pub(crate) fn indent(depth: usize, size: usize) -> String {
    " ".repeat(depth.saturating_mul(size))
}
