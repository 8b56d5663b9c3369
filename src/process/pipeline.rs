//! Document formatting pipeline
//!
//! ```text
//! scan/extract -> no blocks  -> markup format                              -> normalize
//!              -> blocks     -> markup format -> isolate sentinels -> reinsert -> normalize
//! ```
//!
//! Any failure along the way discards the partial work and formats the
//! untouched input as plain markup instead. [`render`] therefore always
//! returns text.

use std::borrow::Cow;

use crate::config::Config;
use crate::directive::find_directive;
use crate::error::{FormatError, Result};
use crate::markup::{HtmlFormatter, MarkupFormatter};
use crate::parser::scanner::scan;
use crate::process::placeholder::{extract, reinsert, PlaceholderMap};

const BOM: char = '\u{feff}';

/// Line ending and byte-order mark of the input, restored on output
#[derive(Debug, Clone, Copy, Default)]
struct TextShape {
    bom: bool,
    crlf: bool,
}

impl TextShape {
    /// Detect the shape of `document` and return its body with LF endings
    fn detect(document: &str) -> (Self, Cow<'_, str>) {
        let (bom, body) = match document.strip_prefix(BOM) {
            Some(body) => (true, body),
            None => (false, document),
        };
        let crlf = body.contains("\r\n");
        let body = if crlf {
            Cow::Owned(body.replace("\r\n", "\n"))
        } else {
            Cow::Borrowed(body)
        };
        (Self { bom, crlf }, body)
    }

    /// Final normalization: trailing whitespace, line endings, BOM
    fn restore(self, text: &str, trim_trailing_whitespace: bool) -> String {
        let mut out = String::with_capacity(text.len() + 4);
        if self.bom {
            out.push(BOM);
        }
        let eol = if self.crlf { "\r\n" } else { "\n" };
        for (i, line) in text.split('\n').enumerate() {
            if i > 0 {
                out.push_str(eol);
            }
            if trim_trailing_whitespace {
                out.push_str(line.trim_end_matches([' ', '\t']));
            } else {
                out.push_str(line);
            }
        }
        out
    }
}

/// Put a sentinel squeezed between two tags on its own line.
///
/// Returns `None` when no sentinel needed moving.
fn isolate_sentinels(text: &str, map: &PlaceholderMap) -> Result<Option<String>> {
    let sentinel = map.sentinel_pattern()?;
    let squeezed = regex::Regex::new(&format!(r">[ \t]*({})[ \t]*<", sentinel.as_str()))?;
    if !squeezed.is_match(text) {
        return Ok(None);
    }
    Ok(Some(squeezed.replace_all(text, ">\n${1}\n<").into_owned()))
}

fn run_markup(
    formatter: &dyn MarkupFormatter,
    text: &str,
    config: &Config,
) -> std::result::Result<String, FormatError> {
    formatter
        .format(text, &config.markup)
        .map_err(|e| FormatError::Markup(format!("{e:#}")))
}

/// Format LF-only text; errors send the caller to the fallback
fn format_text(text: &str, config: &Config, formatter: &dyn MarkupFormatter) -> Result<String> {
    let segments = scan(text);
    let extraction = extract(text, &segments, config);
    if extraction.map.is_empty() {
        return Ok(run_markup(formatter, &extraction.text, config)?);
    }

    let mut formatted = run_markup(formatter, &extraction.text, config)?;
    if let Some(isolated) = isolate_sentinels(&formatted, &extraction.map)? {
        formatted = run_markup(formatter, &isolated, config)?;
    }
    reinsert(&formatted, &extraction.map, config.align_server_blocks)
}

/// Format an ASP document with the built-in HTML formatter.
#[must_use]
pub fn render(document: &str, config: &Config) -> String {
    render_with(document, config, &HtmlFormatter)
}

/// Format an ASP document with a caller-supplied markup formatter.
///
/// Out-of-range sizes in `config` are clamped first. Never fails: if any
/// stage errors, the original document is formatted as plain markup, and if
/// even that fails it is returned unchanged.
#[must_use]
pub fn render_with(document: &str, config: &Config, formatter: &dyn MarkupFormatter) -> String {
    let config = &config.clamped();
    let (shape, text) = TextShape::detect(document);
    let formatted = match format_text(&text, config, formatter) {
        Ok(formatted) => formatted,
        Err(e) => {
            tracing::warn!(error = %e, "formatting failed, falling back to plain markup");
            match formatter.format(&text, &config.markup) {
                Ok(formatted) => formatted,
                Err(e) => {
                    tracing::warn!(error = %e, "markup fallback failed, leaving document unchanged");
                    return document.to_string();
                }
            }
        }
    };
    shape.restore(&formatted, config.trim_trailing_whitespace)
}

/// Format a document, honoring an `<%-- aspfmt: ... --%>` directive in it.
///
/// A directive whose overrides make the configuration invalid is ignored.
#[must_use]
pub fn format_document(document: &str, config: &Config, formatter: &dyn MarkupFormatter) -> String {
    match find_directive(document) {
        Some(overrides) if overrides.off => document.to_string(),
        Some(overrides) => {
            let mut adjusted = config.clone();
            overrides.apply(&mut adjusted);
            match adjusted.validate() {
                None => render_with(document, &adjusted, formatter),
                Some(problem) => {
                    tracing::warn!(%problem, "ignoring aspfmt directive");
                    render_with(document, config, formatter)
                }
            }
        }
        None => render_with(document, config, formatter),
    }
}
