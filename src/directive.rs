//! Inline directive parsing for `<%-- aspfmt: --%>` comments
//!
//! Supports in-file configuration overrides via an ASP comment near the top
//! of the document:
//! `<%-- aspfmt: --vbscript-indent 2 --no-align --%>`
//!
//! `<%-- aspfmt: off --%>` leaves the document untouched.

use std::sync::LazyLock;

use regex::Regex;

use crate::config::Config;
use crate::parser::patterns::build_re;

/// Only this many leading lines are searched for a directive
const DIRECTIVE_SEARCH_LINES: usize = 20;

/// Pattern to match aspfmt directives
static ASPFMT_DIRECTIVE_RE: LazyLock<Regex> =
    LazyLock::new(|| build_re(r"<%--\s*aspfmt:(.*?)--%>"));

/// Parsed directive options that can override config
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DirectiveOverrides {
    /// Leave the document unformatted
    pub off: bool,
    pub vbscript_indent: Option<usize>,
    pub jscript_indent: Option<usize>,
    pub max_line_length: Option<usize>,
    pub detect_language: Option<bool>,
    pub align_server_blocks: Option<bool>,
}

impl DirectiveOverrides {
    /// Check if any overrides are set
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.off
            && self.vbscript_indent.is_none()
            && self.jscript_indent.is_none()
            && self.max_line_length.is_none()
            && self.detect_language.is_none()
            && self.align_server_blocks.is_none()
    }

    /// Copy the overrides onto `config`
    pub fn apply(&self, config: &mut Config) {
        if let Some(v) = self.vbscript_indent {
            config.vbscript_indent_size = v;
        }
        if let Some(v) = self.jscript_indent {
            config.jscript_indent_size = v;
        }
        if let Some(v) = self.max_line_length {
            config.max_line_length = v;
        }
        if let Some(v) = self.detect_language {
            config.detect_asp_language = v;
        }
        if let Some(v) = self.align_server_blocks {
            config.align_server_blocks = v;
        }
    }
}

/// Parse an aspfmt directive comment and return option overrides
///
/// Returns `None` if `text` holds no directive or the directive sets nothing.
#[must_use]
pub fn parse_directive(text: &str) -> Option<DirectiveOverrides> {
    let caps = ASPFMT_DIRECTIVE_RE.captures(text)?;
    parse_directive_args(caps.get(1)?.as_str())
}

/// Parse directive arguments into overrides
fn parse_directive_args(args_str: &str) -> Option<DirectiveOverrides> {
    let mut overrides = DirectiveOverrides::default();
    let mut tokens = args_str.split_whitespace();

    while let Some(token) = tokens.next() {
        match token.to_ascii_lowercase().as_str() {
            "off" => overrides.off = true,
            "--vbscript-indent" => {
                overrides.vbscript_indent = tokens.next().and_then(|v| v.parse().ok());
            }
            "--jscript-indent" => {
                overrides.jscript_indent = tokens.next().and_then(|v| v.parse().ok());
            }
            "--max-line-length" => {
                overrides.max_line_length = tokens.next().and_then(|v| v.parse().ok());
            }
            "--detect-language" => overrides.detect_language = Some(true),
            "--no-align" => overrides.align_server_blocks = Some(false),
            _ => {
                // Unknown option, skip
            }
        }
    }

    if overrides.is_empty() {
        None
    } else {
        Some(overrides)
    }
}

/// Find the first directive in the leading lines of a document
#[must_use]
pub fn find_directive(text: &str) -> Option<DirectiveOverrides> {
    let head_end = text
        .match_indices('\n')
        .nth(DIRECTIVE_SEARCH_LINES - 1)
        .map_or(text.len(), |(i, _)| i);
    parse_directive(&text[..head_end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_directive_indent() {
        let overrides = parse_directive("<%-- aspfmt: --vbscript-indent 2 --%>").unwrap();
        assert_eq!(overrides.vbscript_indent, Some(2));
        assert!(!overrides.off);
    }

    #[test]
    fn test_parse_directive_multiple() {
        let overrides = parse_directive(
            "<%-- ASPFMT: --jscript-indent 4 --max-line-length 80 --detect-language --no-align --%>",
        )
        .unwrap();
        assert_eq!(overrides.jscript_indent, Some(4));
        assert_eq!(overrides.max_line_length, Some(80));
        assert_eq!(overrides.detect_language, Some(true));
        assert_eq!(overrides.align_server_blocks, Some(false));
    }

    #[test]
    fn test_parse_directive_off() {
        let overrides = parse_directive("<%-- aspfmt: off --%>").unwrap();
        assert!(overrides.off);
    }

    #[test]
    fn test_parse_invalid_directive() {
        assert!(parse_directive("<%-- aspfmt: --%>").is_none());
        assert!(parse_directive("<%-- aspfmt: --unknown --%>").is_none());
        assert!(parse_directive("<%-- a regular comment --%>").is_none());
    }

    #[test]
    fn test_apply_overrides() {
        let overrides = parse_directive("<%-- aspfmt: --vbscript-indent 2 --no-align --%>").unwrap();
        let mut config = Config::default();
        overrides.apply(&mut config);
        assert_eq!(config.vbscript_indent_size, 2);
        assert!(!config.align_server_blocks);
        assert_eq!(config.jscript_indent_size, 2);
    }

    #[test]
    fn test_find_directive_only_near_top() {
        let text = "<html>\n<%-- aspfmt: off --%>\n<body>";
        assert!(find_directive(text).is_some_and(|o| o.off));

        let late = format!("{}<%-- aspfmt: off --%>", "<p>\n".repeat(30));
        assert!(find_directive(&late).is_none());
    }
}
