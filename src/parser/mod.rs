//! ASP document and script parsing utilities.
//!
//! - [`scanner`]: splits a document into markup spans and ASP blocks
//! - [`code_filter`]: blanks string contents and comments in script lines so
//!   keyword and bracket matching only sees code
//! - [`patterns`]: precompiled regex patterns for VBScript and JScript statements
//!
//! Nothing here builds a syntax tree. The beautifiers work line by line over
//! masked text, which is enough to indent code without understanding it.

pub mod code_filter;
pub mod patterns;
pub mod scanner;

pub use code_filter::{CodeFilter, Syntax};
pub use scanner::{blocks, scan, Block, BlockKind, Segment};
