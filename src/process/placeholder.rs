//! Placeholder substitution around the markup formatter.
//!
//! [`extract`] swaps every preserved ASP block for a sentinel token such as
//! `__BLOCK_3__`, beautifying script blocks on the way. The markup formatter
//! then only ever sees plain HTML. [`reinsert`] puts the block text back,
//! re-anchoring multi-line blocks to the indentation the formatter gave their
//! sentinel.

use regex::Regex;

use crate::config::Config;
use crate::error::{FormatError, Result};
use crate::format::{beautify_jscript, beautify_vbscript};
use crate::language::{classify, page_language, ScriptLanguage};
use crate::parser::scanner::{Block, BlockKind, Segment};

/// Sentinel namespace; widened with `X` until absent from the document
const SENTINEL_PREFIX: &str = "__BLOCK_";

/// Block text by sentinel number, for one document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaceholderMap {
    prefix: String,
    blocks: Vec<String>,
}

impl PlaceholderMap {
    fn new(text: &str) -> Self {
        let mut prefix = SENTINEL_PREFIX.to_string();
        while text.contains(&prefix) {
            prefix.insert(2, 'X');
        }
        Self {
            prefix,
            blocks: Vec::new(),
        }
    }

    /// Sentinel text for block `index`
    #[must_use]
    pub fn sentinel(&self, index: usize) -> String {
        format!("{}{index}__", self.prefix)
    }

    /// Regex matching any sentinel of this map, capturing its number
    pub fn sentinel_pattern(&self) -> Result<Regex> {
        Ok(Regex::new(&format!(r"{}(\d+)__", regex::escape(&self.prefix)))?)
    }

    /// Store `content` and return its sentinel
    fn push(&mut self, content: String) -> String {
        self.blocks.push(content);
        self.sentinel(self.blocks.len() - 1)
    }

    /// Text stored for block `index`
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&str> {
        self.blocks.get(index).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

/// Document text with sentinels, plus the blocks they stand for
#[derive(Debug, Clone)]
pub struct Extraction {
    pub text: String,
    pub map: PlaceholderMap,
}

/// Whether a block of this kind keeps a placeholder
fn is_preserved(kind: BlockKind, config: &Config) -> bool {
    match kind {
        BlockKind::Include => config.preserve_include_directives,
        BlockKind::Comment => config.preserve_asp_comments,
        BlockKind::Directive | BlockKind::Declaration | BlockKind::Output | BlockKind::Server => {
            true
        }
    }
}

fn beautifier_enabled(language: ScriptLanguage, config: &Config) -> bool {
    match language {
        ScriptLanguage::VbScript => config.format_vbscript_in_blocks,
        ScriptLanguage::JScript => config.format_jscript_in_blocks,
    }
}

/// Language to beautify `code` as, or `None` to leave it alone.
///
/// Classifier verdict first (when enabled), then the page's `<%@ Language %>`,
/// then whichever beautifier is enabled, VBScript first.
fn choose_language(
    code: &str,
    page: Option<ScriptLanguage>,
    config: &Config,
) -> Option<ScriptLanguage> {
    let enabled = |language: ScriptLanguage| {
        beautifier_enabled(language, config).then_some(language)
    };
    if config.detect_asp_language {
        if let Some(language) = classify(code).language() {
            return enabled(language);
        }
    }
    if let Some(language) = page {
        return enabled(language);
    }
    enabled(ScriptLanguage::VbScript).or_else(|| enabled(ScriptLanguage::JScript))
}

/// Split block contents into (leading, code, trailing).
///
/// Padding that spans lines keeps only its newlines: the code's first line is
/// re-indented by the beautifier and the closing delimiter by [`reinsert`].
/// Padding within one line (`<% x %>`) is kept as is.
fn split_padding(inner: &str) -> (String, &str, String) {
    let code = inner.trim();
    let code_start = inner.len() - inner.trim_start().len();
    let leading = &inner[..code_start];
    let trailing = &inner[code_start + code.len()..];
    let keep = |pad: &str| match pad.matches('\n').count() {
        0 => pad.to_string(),
        n => "\n".repeat(n),
    };
    (keep(leading), code, keep(trailing))
}

/// Block text after beautifying its script, or the original text
fn format_block(block: &Block<'_>, page: Option<ScriptLanguage>, config: &Config) -> String {
    if !block.kind.holds_script() || !block.terminated {
        return block.raw.to_string();
    }
    let (leading, code, trailing) = split_padding(block.inner());
    if code.is_empty() {
        return block.raw.to_string();
    }
    let Some(language) = choose_language(code, page, config) else {
        return block.raw.to_string();
    };
    tracing::debug!(offset = block.start, %language, "beautifying block");

    let result: std::result::Result<String, FormatError> = match language {
        ScriptLanguage::VbScript => beautify_vbscript(code, &config.vbscript_options()),
        ScriptLanguage::JScript => {
            let mut options = config.jscript_options();
            // `<%= expr %>` is an expression, never a statement
            if block.kind == BlockKind::Output {
                options.statement_terminators = false;
            }
            beautify_jscript(code, &options)
        }
    };
    match result {
        Ok(formatted) => format!(
            "{}{leading}{formatted}{trailing}{}",
            block.kind.open_delimiter(),
            block.kind.close_delimiter()
        ),
        Err(e) => {
            tracing::warn!(
                offset = block.start,
                %language,
                error = %e,
                "could not beautify block, keeping it unchanged"
            );
            block.raw.to_string()
        }
    }
}

/// Replace preserved blocks of a scanned document with sentinels.
#[must_use]
pub fn extract(text: &str, segments: &[Segment<'_>], config: &Config) -> Extraction {
    let mut map = PlaceholderMap::new(text);
    let page = page_language(segments);
    let mut out = String::with_capacity(text.len());

    for segment in segments {
        match segment {
            Segment::Markup(markup) => out.push_str(markup),
            Segment::Block(block) if is_preserved(block.kind, config) => {
                let content = format_block(block, page, config);
                out.push_str(&map.push(content));
            }
            Segment::Block(block) => out.push_str(block.raw),
        }
    }

    Extraction { text: out, map }
}

/// Width in bytes of the leading spaces and tabs of `line`
fn indent_width(line: &str) -> usize {
    line.len() - line.trim_start_matches([' ', '\t']).len()
}

/// Move lines after the first from their common indentation to `indent`
fn reanchor(content: &str, indent: &str) -> String {
    let mut lines = content.split('\n');
    let first = lines.next().unwrap_or_default();
    let rest: Vec<&str> = lines.collect();
    let common = rest
        .iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| indent_width(line))
        .min()
        .unwrap_or(0);

    let mut out = String::with_capacity(content.len() + rest.len() * indent.len());
    out.push_str(first);
    for line in rest {
        out.push('\n');
        if !line.trim().is_empty() {
            out.push_str(indent);
            out.push_str(&line[common..]);
        }
    }
    out
}

/// Put block text back in place of its sentinels.
///
/// A sentinel that starts its line and stands for a multi-line block gets the
/// block re-anchored to the sentinel's indentation (unless `align` is off).
/// Anywhere else the block text goes in verbatim.
///
/// Fails when a sentinel is unknown, repeated, or missing from `formatted`.
pub fn reinsert(formatted: &str, map: &PlaceholderMap, align: bool) -> Result<String> {
    let pattern = map.sentinel_pattern()?;
    let mut seen = vec![false; map.len()];
    let mut out = String::with_capacity(formatted.len());
    let mut last = 0;

    for caps in pattern.captures_iter(formatted) {
        let Some(found) = caps.get(0) else {
            continue;
        };
        let index: usize = caps[1].parse()?;
        let content = map
            .get(index)
            .ok_or_else(|| anyhow::anyhow!("unknown placeholder {}", found.as_str()))?;
        if std::mem::replace(&mut seen[index], true) {
            anyhow::bail!("placeholder {} appears more than once", found.as_str());
        }

        out.push_str(&formatted[last..found.start()]);
        let line_start = formatted[..found.start()].rfind('\n').map_or(0, |i| i + 1);
        let before = &formatted[line_start..found.start()];
        if align && content.contains('\n') && before.trim().is_empty() {
            out.push_str(&reanchor(content, before));
        } else {
            out.push_str(content);
        }
        last = found.end();
    }
    out.push_str(&formatted[last..]);

    if let Some(missing) = seen.iter().position(|&s| !s) {
        anyhow::bail!("markup formatter dropped placeholder {}", map.sentinel(missing));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::scanner::scan;

    fn run_extract(text: &str, config: &Config) -> Extraction {
        extract(text, &scan(text), config)
    }

    #[test]
    fn test_extract_and_reinsert_unchanged() {
        let text = "<p><%= name %></p>\n<% x = 1 %>";
        let config = Config::default();
        let extraction = run_extract(text, &config);
        assert_eq!(extraction.text, "<p>__BLOCK_0__</p>\n__BLOCK_1__");
        assert_eq!(extraction.map.len(), 2);
        let back = reinsert(&extraction.text, &extraction.map, true).unwrap();
        assert_eq!(back, text);
    }

    #[test]
    fn test_sentinel_prefix_widened() {
        let text = "<p>__BLOCK_ is taken</p><% x %>";
        let extraction = run_extract(text, &Config::default());
        assert_eq!(extraction.text, "<p>__BLOCK_ is taken</p>__XBLOCK_0__");
        assert!(!text.contains(&extraction.map.sentinel(0)));
    }

    #[test]
    fn test_comment_toggle() {
        let text = "<%-- note --%><p>";
        let kept = run_extract(text, &Config::default());
        assert_eq!(kept.text, "__BLOCK_0__<p>");
        assert_eq!(kept.map.get(0), Some("<%-- note --%>"));

        let config = Config {
            preserve_asp_comments: false,
            ..Config::default()
        };
        let inlined = run_extract(text, &config);
        assert_eq!(inlined.text, text);
        assert!(inlined.map.is_empty());
    }

    #[test]
    fn test_include_toggle() {
        let text = "<!-- #include file=\"a.inc\" -->";
        let config = Config {
            preserve_include_directives: false,
            ..Config::default()
        };
        assert!(run_extract(text, &config).map.is_empty());
        assert_eq!(run_extract(text, &Config::default()).map.len(), 1);
    }

    #[test]
    fn test_server_block_beautified() {
        let text = "<%\n      If x Then\ny = 1\n   End If\n   %>";
        let extraction = run_extract(text, &Config::default());
        assert_eq!(
            extraction.map.get(0),
            Some("<%\nIf x Then\n    y = 1\nEnd If\n%>")
        );
    }

    #[test]
    fn test_single_line_padding_kept() {
        let text = "<%=  total %>";
        let extraction = run_extract(text, &Config::default());
        assert_eq!(extraction.map.get(0), Some(text));
    }

    #[test]
    fn test_beautify_failure_keeps_block() {
        let text = "<% x = \"open\nEnd If %>";
        let extraction = run_extract(text, &Config::default());
        assert_eq!(extraction.map.get(0), Some(text));
    }

    #[test]
    fn test_disabled_language_left_alone() {
        let text = "<%@ Language=\"JScript\" %>\n<%\n    if (a) {\n    b()\n    }\n%>";
        let extraction = run_extract(text, &Config::default());
        assert_eq!(extraction.map.get(1), Some("<%\n    if (a) {\n    b()\n    }\n%>"));

        let config = Config {
            format_jscript_in_blocks: true,
            ..Config::default()
        };
        let extraction = run_extract(text, &config);
        assert_eq!(extraction.map.get(1), Some("<%\nif (a) {\n  b();\n}\n%>"));
    }

    #[test]
    fn test_output_block_gets_no_terminator() {
        let config = Config {
            format_vbscript_in_blocks: false,
            format_jscript_in_blocks: true,
            ..Config::default()
        };
        let extraction = run_extract("<%= a + b %>", &config);
        assert_eq!(extraction.map.get(0), Some("<%= a + b %>"));
    }

    #[test]
    fn test_choose_language() {
        let config = Config {
            detect_asp_language: true,
            format_jscript_in_blocks: true,
            ..Config::default()
        };
        assert_eq!(
            choose_language("var x = 1; console.log(x);", None, &config),
            Some(ScriptLanguage::JScript)
        );
        assert_eq!(
            choose_language("Dim x", Some(ScriptLanguage::JScript), &config),
            Some(ScriptLanguage::VbScript)
        );
        // Undetermined falls through to the page language
        assert_eq!(
            choose_language("x", Some(ScriptLanguage::JScript), &config),
            Some(ScriptLanguage::JScript)
        );
        let nothing = Config {
            format_vbscript_in_blocks: false,
            ..Config::default()
        };
        assert_eq!(choose_language("Dim x", None, &nothing), None);
    }

    #[test]
    fn test_reanchor_to_sentinel_indent() {
        let mut map = PlaceholderMap::new("");
        let content = "<% If x Then\n        y = 1\n        z = 2 %>".to_string();
        let sentinel = map.push(content);
        let formatted = format!("<div>\n  {sentinel}\n</div>");
        let out = reinsert(&formatted, &map, true).unwrap();
        assert_eq!(out, "<div>\n  <% If x Then\n  y = 1\n  z = 2 %>\n</div>");
    }

    #[test]
    fn test_reanchor_keeps_relative_indent() {
        let out = reanchor("<%\nIf x Then\n    y\n\nEnd If\n%>", "    ");
        assert_eq!(out, "<%\n    If x Then\n        y\n\n    End If\n    %>");
    }

    #[test]
    fn test_inline_sentinel_verbatim() {
        let mut map = PlaceholderMap::new("");
        let sentinel = map.push("<%\n  a\n%>".to_string());
        let formatted = format!("    <p>{sentinel}</p>");
        let out = reinsert(&formatted, &map, true).unwrap();
        assert_eq!(out, "    <p><%\n  a\n%></p>");
    }

    #[test]
    fn test_align_disabled_is_verbatim() {
        let mut map = PlaceholderMap::new("");
        let sentinel = map.push("<%\n  a\n%>".to_string());
        let formatted = format!("    {sentinel}");
        let out = reinsert(&formatted, &map, false).unwrap();
        assert_eq!(out, "    <%\n  a\n%>");
    }

    #[test]
    fn test_missing_or_repeated_sentinel_fails() {
        let mut map = PlaceholderMap::new("");
        let sentinel = map.push("<% a %>".to_string());
        assert!(reinsert("<p></p>", &map, true).is_err());
        assert!(reinsert(&format!("{sentinel}{sentinel}"), &map, true).is_err());
        assert!(reinsert("__BLOCK_7__", &map, true).is_err());
    }
}
