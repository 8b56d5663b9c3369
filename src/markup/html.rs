//! Built-in HTML formatter backed by `markup_fmt`
//!
//! [`MarkupOptions`] map onto `markup_fmt`'s layout and language options.
//! Embedded `<script>` and `<style>` content is handed back unchanged, and
//! blank-line limits and the final newline are applied after printing.

use std::borrow::Cow;
use std::convert::Infallible;
use std::num::NonZeroUsize;

use anyhow::anyhow;
use markup_fmt::config::{FormatOptions, LanguageOptions, LayoutOptions};
use markup_fmt::{format_text, Language};

use crate::error::Result;
use crate::markup::{MarkupFormatter, MarkupOptions};

/// Print width used when `wrap_line_length` is 0
const UNLIMITED_WIDTH: usize = 10_000;

/// Elements whose blank lines are content
const VERBATIM_ELEMENTS: &[&str] = &["pre", "textarea"];

/// The formatter [`render`](crate::render) uses
#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlFormatter;

impl MarkupFormatter for HtmlFormatter {
    fn format(&self, text: &str, options: &MarkupOptions) -> Result<String> {
        let printed = format_text(
            text,
            Language::Html,
            &format_options(options),
            |code, _| Ok::<_, Infallible>(Cow::Borrowed(code)),
        )
        .map_err(|e| anyhow!("HTML formatter rejected the document: {e:?}"))?;
        Ok(limit_blank_lines(&printed, options))
    }
}

/// Translate aspfmt's markup options into `markup_fmt`'s
#[must_use]
pub fn format_options(options: &MarkupOptions) -> FormatOptions {
    let print_width = match options.wrap_line_length {
        0 => UNLIMITED_WIDTH,
        width => width,
    };
    let max_attrs_per_line = match options.wrap_attributes.as_str() {
        "force" | "force-aligned" | "force-expand-multiline" => Some(NonZeroUsize::MIN),
        _ => None,
    };
    FormatOptions {
        layout: LayoutOptions {
            print_width,
            use_tabs: options.indent_with_tabs,
            indent_width: options.indent_size,
            ..LayoutOptions::default()
        },
        language: LanguageOptions {
            max_attrs_per_line,
            ..LanguageOptions::default()
        },
    }
}

/// Raw element still open after `line`, given the one open before it
fn verbatim_after(line: &str, mut open: Option<&'static str>) -> Option<&'static str> {
    let lower = line.to_ascii_lowercase();
    let mut rest = lower.as_str();
    loop {
        match open {
            Some(tag) => match rest.find(&format!("</{tag}")) {
                Some(i) => {
                    rest = &rest[i..];
                    open = None;
                }
                None => return open,
            },
            None => {
                let start = VERBATIM_ELEMENTS.iter().find_map(|&tag| {
                    let at = rest.find(&format!("<{tag}"))?;
                    let next = rest[at + 1 + tag.len()..].chars().next();
                    matches!(next, Some('>' | ' ' | '\t') | None).then_some((at, tag))
                });
                match start {
                    Some((at, tag)) => {
                        rest = &rest[at + 1..];
                        open = Some(tag);
                    }
                    None => return None,
                }
            }
        }
    }
}

/// Cap runs of blank lines outside `<pre>` and `<textarea>`, trim blank
/// lines at both ends and settle the final newline.
fn limit_blank_lines(text: &str, options: &MarkupOptions) -> String {
    let mut lines: Vec<&str> = Vec::new();
    let mut run = 0;
    let mut verbatim = None;
    for line in text.lines() {
        let inside = verbatim.is_some();
        verbatim = verbatim_after(line, verbatim);
        if inside || !line.trim().is_empty() {
            run = 0;
            lines.push(line);
            continue;
        }
        run += 1;
        if !lines.is_empty() && !options.exceeds_blank_limit(run) {
            lines.push("");
        }
    }
    while lines.last().is_some_and(|line| line.trim().is_empty()) {
        lines.pop();
    }
    let mut out = lines.join("\n");
    if options.end_with_newline {
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format(text: &str, options: &MarkupOptions) -> String {
        HtmlFormatter.format(text, options).unwrap()
    }

    #[test]
    fn test_options_mapped() {
        let options = MarkupOptions {
            indent_size: 2,
            indent_with_tabs: true,
            wrap_line_length: 80,
            wrap_attributes: "force".to_string(),
            ..MarkupOptions::default()
        };
        let mapped = format_options(&options);
        assert_eq!(mapped.layout.indent_width, 2);
        assert!(mapped.layout.use_tabs);
        assert_eq!(mapped.layout.print_width, 80);
        assert_eq!(mapped.language.max_attrs_per_line, Some(NonZeroUsize::MIN));

        let unwrapped = format_options(&MarkupOptions {
            wrap_line_length: 0,
            ..MarkupOptions::default()
        });
        assert_eq!(unwrapped.layout.print_width, UNLIMITED_WIDTH);
        assert_eq!(unwrapped.language.max_attrs_per_line, None);
    }

    #[test]
    fn test_nested_elements_indented() {
        let out = format("<ul>\n<li>a</li>\n<li>b</li>\n</ul>", &MarkupOptions::default());
        assert!(out.contains("\n    <li>a</li>"), "{out}");
        assert!(out.ends_with("</ul>"), "{out}");
    }

    #[test]
    fn test_forced_attribute_wrapping() {
        let options = MarkupOptions {
            wrap_attributes: "force".to_string(),
            ..MarkupOptions::default()
        };
        let out = format("<div class=\"a\" id=\"b\" title=\"c\">x</div>", &options);
        assert!(out.lines().any(|line| line.trim() == "id=\"b\""), "{out}");
    }

    #[test]
    fn test_print_width_respected() {
        let options = MarkupOptions {
            wrap_line_length: 40,
            ..MarkupOptions::default()
        };
        let input = "<a href=\"/some/fairly/long/path\" title=\"a descriptive title\">link</a>";
        let out = format(input, &options);
        assert!(out.lines().count() > 1, "{out}");
    }

    #[test]
    fn test_final_newline() {
        let options = MarkupOptions {
            end_with_newline: true,
            ..MarkupOptions::default()
        };
        assert!(format("<p>x</p>", &options).ends_with("</p>\n"));
        assert!(!format("<p>x</p>\n\n", &MarkupOptions::default()).ends_with('\n'));
    }

    #[test]
    fn test_limit_blank_lines() {
        let options = MarkupOptions::default();
        assert_eq!(limit_blank_lines("\n\na\n\n\n\n\nb\n\n", &options), "a\n\n\nb");
        let dropped = MarkupOptions {
            preserve_newlines: false,
            ..MarkupOptions::default()
        };
        assert_eq!(limit_blank_lines("a\n\nb", &dropped), "a\nb");
        let kept = MarkupOptions {
            max_preserve_newlines: 0,
            ..MarkupOptions::default()
        };
        assert_eq!(limit_blank_lines("a\n\n\n\n\nb", &kept), "a\n\n\n\n\nb");
    }

    #[test]
    fn test_blank_lines_inside_pre_kept() {
        let dropped = MarkupOptions {
            preserve_newlines: false,
            ..MarkupOptions::default()
        };
        let text = "<pre>\na\n\n\nb\n</pre>\n\n<p>x</p>";
        assert_eq!(
            limit_blank_lines(text, &dropped),
            "<pre>\na\n\n\nb\n</pre>\n<p>x</p>"
        );
    }

    #[test]
    fn test_verbatim_after() {
        assert_eq!(verbatim_after("<pre>", None), Some("pre"));
        assert_eq!(verbatim_after("<pre>x</pre>", None), None);
        assert_eq!(verbatim_after("<prefix>", None), None);
        assert_eq!(verbatim_after("</TEXTAREA>", Some("textarea")), None);
        assert_eq!(verbatim_after("text", Some("pre")), Some("pre"));
    }
}
