//! Document processing.
//!
//! - [`placeholder`]: swaps ASP blocks for sentinel tokens and back, beautifying
//!   script blocks on the way out
//! - [`pipeline`]: drives scan, markup formatting and reinsertion, with the
//!   plain-markup fallback
//!
//! The main entry point is [`render`], which never fails.

pub mod pipeline;
pub mod placeholder;

pub use pipeline::{format_document, render, render_with};
pub use placeholder::{extract, reinsert, Extraction, PlaceholderMap};
