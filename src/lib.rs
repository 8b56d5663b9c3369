//! aspfmt - Formatter for classic ASP pages
//!
//! Formats HTML documents with embedded `<% ... %>` blocks. The markup is
//! formatted by a pluggable [`MarkupFormatter`] while every ASP block is
//! swapped out for a placeholder. VBScript and JScript inside the blocks get
//! their own line-oriented beautifiers.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::struct_excessive_bools)]

pub mod batch;
pub mod cli;
pub mod config;
pub mod directive;
pub mod error;
pub mod format;
pub mod language;
pub mod markup;
pub mod parser;
pub mod process;

// Re-export commonly used types
pub use batch::{ChangeSet, Edit};
pub use cli::{build_cli, parse_args, parse_args_from, CliArgs};
pub use config::Config;
pub use directive::{find_directive, parse_directive, DirectiveOverrides};
pub use error::{FormatError, Result};
pub use language::{classify, ScriptLanguage, Verdict};
pub use markup::{HtmlFormatter, LineIndenter, MarkupFormatter, MarkupOptions};
pub use parser::scanner::{scan, Block, BlockKind, Segment};
pub use process::{format_document, render, render_with};
