//! Line-oriented HTML re-indenter
//!
//! Every line is trimmed and re-indented by the number of elements open at
//! its first tag or text. Lines are never joined or wrapped, so formatting its
//! own output again changes nothing.
//!
//! - void elements (`<br>`, `<img>`...) and self-closing tags do not nest
//! - elements with optional end tags (`<li>`, `<p>`, `<td>`...) are closed by
//!   the start tags that implicitly end them, and by the end tag of any parent
//! - attribute lines of a start tag spread over several lines get one extra level
//! - contents of `<pre>`, `<textarea>`, `<script>`, `<style>` and multi-line
//!   `<!-- -->` comments are copied as they are
//! - runs of blank lines are capped at `max_preserve_newlines`

use std::mem;

use crate::error::Result;
use crate::markup::{MarkupFormatter, MarkupOptions};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Elements whose content is copied without re-indenting
const RAW_ELEMENTS: &[&str] = &["pre", "textarea", "script", "style"];

/// Start tags that end an open `<p>`
const P_CLOSERS: &[&str] = &[
    "address", "article", "aside", "blockquote", "div", "dl", "fieldset", "footer", "form", "h1",
    "h2", "h3", "h4", "h5", "h6", "header", "hr", "main", "nav", "ol", "p", "pre", "section",
    "table", "ul",
];

/// Re-indents markup line by line without reflowing anything.
///
/// Its output is fully predictable, which makes it the formatter of choice
/// for tests and for callers who want only indentation fixed. [`render`]
/// uses [`HtmlFormatter`] instead.
///
/// [`render`]: crate::render
/// [`HtmlFormatter`]: crate::HtmlFormatter
#[derive(Debug, Default, Clone, Copy)]
pub struct LineIndenter;

impl MarkupFormatter for LineIndenter {
    fn format(&self, text: &str, options: &MarkupOptions) -> Result<String> {
        let mut state = IndentState::new(options);
        for line in text.lines() {
            state.push_line(line);
        }
        Ok(state.finish())
    }
}

/// A start tag whose `>` is on a later line
#[derive(Debug)]
struct OpenTag {
    name: String,
    quote: Option<char>,
    /// Depth of the line the tag started on
    depth: usize,
}

#[derive(Debug, Default)]
enum Mode {
    #[default]
    Normal,
    /// Inside a multi-line `<!-- -->`
    Comment,
    /// Inside a raw-text element
    Raw(&'static str),
    /// Inside a multi-line start tag
    Tag(OpenTag),
}

fn is_void(name: &str) -> bool {
    VOID_ELEMENTS.contains(&name)
}

/// Whether starting `next` ends the open element `open`
fn closes_implicitly(open: &str, next: &str) -> bool {
    match open {
        "li" => next == "li",
        "dt" | "dd" => matches!(next, "dt" | "dd"),
        "td" | "th" => matches!(next, "td" | "th" | "tr" | "thead" | "tbody" | "tfoot"),
        "tr" => matches!(next, "tr" | "thead" | "tbody" | "tfoot"),
        "thead" | "tbody" => matches!(next, "tbody" | "tfoot"),
        "option" => matches!(next, "option" | "optgroup"),
        "optgroup" => next == "optgroup",
        "p" => P_CLOSERS.contains(&next),
        _ => false,
    }
}

/// Lowercased tag name at the start of `text`, if it is one
fn tag_name(text: &str) -> Option<String> {
    let mut chars = text.chars();
    if !chars.next()?.is_ascii_alphabetic() {
        return None;
    }
    let len = text
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == ':'))
        .unwrap_or(text.len());
    Some(text[..len].to_ascii_lowercase())
}

/// Byte offset of the `>` ending a tag, skipping quoted attribute values.
/// `quote` carries an open quote across lines.
fn find_tag_end(text: &str, quote: &mut Option<char>) -> Option<usize> {
    for (i, c) in text.char_indices() {
        match *quote {
            Some(q) if c == q => *quote = None,
            Some(_) => {}
            None => match c {
                '"' | '\'' => *quote = Some(c),
                '>' => return Some(i),
                _ => {}
            },
        }
    }
    None
}

/// Text after the next `>`, or nothing
fn after_gt(text: &str) -> &str {
    text.find('>').map_or("", |i| &text[i + 1..])
}

fn starts_with_ignore_case(text: &str, prefix: &str) -> bool {
    text.len() >= prefix.len()
        && text.is_char_boundary(prefix.len())
        && text[..prefix.len()].eq_ignore_ascii_case(prefix)
}

fn find_ignore_case(text: &str, needle: &str) -> Option<usize> {
    text.to_ascii_lowercase().find(needle)
}

struct IndentState<'o> {
    options: &'o MarkupOptions,
    unit: String,
    /// Names of the open elements, innermost last
    open: Vec<String>,
    mode: Mode,
    blank_run: usize,
    out: Vec<String>,
}

impl<'o> IndentState<'o> {
    fn new(options: &'o MarkupOptions) -> Self {
        Self {
            options,
            unit: options.indent_unit(),
            open: Vec::new(),
            mode: Mode::Normal,
            blank_run: 0,
            out: Vec::new(),
        }
    }

    fn emit(&mut self, depth: usize, text: &str) {
        self.blank_run = 0;
        self.out.push(format!("{}{text}", self.unit.repeat(depth)));
    }

    fn emit_verbatim(&mut self, line: &str) {
        self.blank_run = 0;
        self.out.push(line.trim_end().to_string());
    }

    fn push_blank(&mut self) {
        if self.out.is_empty() {
            return;
        }
        self.blank_run += 1;
        if self.options.exceeds_blank_limit(self.blank_run) {
            return;
        }
        self.out.push(String::new());
    }

    fn push_line(&mut self, line: &str) {
        let trimmed = line.trim();
        match &self.mode {
            Mode::Raw(tag) => {
                if starts_with_ignore_case(trimmed, &format!("</{tag}")) {
                    let first = self.scan(trimmed);
                    self.emit(first.unwrap_or(self.open.len()), trimmed);
                } else {
                    self.emit_verbatim(line);
                    self.scan(line);
                }
                return;
            }
            Mode::Comment => {
                self.emit_verbatim(line);
                self.scan(line);
                return;
            }
            Mode::Tag(tag) => {
                if !trimmed.is_empty() {
                    self.emit(tag.depth + 1, trimmed);
                    self.scan(trimmed);
                }
                return;
            }
            Mode::Normal => {}
        }

        if trimmed.is_empty() {
            self.push_blank();
            return;
        }
        let first = self.scan(trimmed);
        self.emit(first.unwrap_or(self.open.len()), trimmed);
    }

    /// Close `name` and everything opened inside it; a stray end tag is ignored
    fn close_element(&mut self, name: &str) {
        if let Some(i) = self.open.iter().rposition(|open| open == name) {
            self.open.truncate(i);
        }
    }

    fn close_implied(&mut self, next: &str) {
        while self
            .open
            .last()
            .is_some_and(|open| closes_implicitly(open, next))
        {
            self.open.pop();
        }
    }

    fn open_element(&mut self, name: String, self_closing: bool) {
        if self_closing || is_void(&name) {
            return;
        }
        if let Some(raw) = RAW_ELEMENTS.iter().find(|&&raw| raw == name) {
            self.mode = Mode::Raw(raw);
        }
        self.open.push(name);
    }

    /// Update the open elements and mode for the tags on one line.
    ///
    /// Returns the depth at the first text, comment or start tag of the line,
    /// or `None` when the line holds only end tags.
    fn scan(&mut self, line: &str) -> Option<usize> {
        let mut first = None;
        let mut rest = line;
        loop {
            match mem::take(&mut self.mode) {
                Mode::Comment => match rest.find("-->") {
                    Some(i) => rest = &rest[i + 3..],
                    None => {
                        self.mode = Mode::Comment;
                        return first;
                    }
                },
                Mode::Raw(tag) => match find_ignore_case(rest, &format!("</{tag}")) {
                    Some(i) => {
                        self.close_element(tag);
                        rest = after_gt(&rest[i..]);
                    }
                    None => {
                        self.mode = Mode::Raw(tag);
                        return first;
                    }
                },
                Mode::Tag(mut tag) => match find_tag_end(rest, &mut tag.quote) {
                    Some(i) => {
                        let self_closing = rest[..i].trim_end().ends_with('/');
                        rest = &rest[i + 1..];
                        self.open_element(tag.name, self_closing);
                    }
                    None => {
                        self.mode = Mode::Tag(tag);
                        return first;
                    }
                },
                Mode::Normal => {
                    let (text, tail) = rest.split_at(rest.find('<').unwrap_or(rest.len()));
                    if !text.trim().is_empty() {
                        first.get_or_insert(self.open.len());
                    }
                    if tail.is_empty() {
                        return first;
                    }
                    rest = tail;
                    if let Some(after) = rest.strip_prefix("<!--") {
                        first.get_or_insert(self.open.len());
                        self.mode = Mode::Comment;
                        rest = after;
                    } else if rest.starts_with("<!") || rest.starts_with("<?") {
                        first.get_or_insert(self.open.len());
                        rest = after_gt(rest);
                    } else if let Some(after) = rest.strip_prefix("</") {
                        if let Some(name) = tag_name(after) {
                            self.close_element(&name);
                        }
                        rest = after_gt(after);
                    } else if let Some(name) = tag_name(&rest[1..]) {
                        self.close_implied(&name);
                        first.get_or_insert(self.open.len());
                        let after_name = &rest[1 + name.len()..];
                        let mut quote = None;
                        match find_tag_end(after_name, &mut quote) {
                            Some(i) => {
                                let self_closing = after_name[..i].trim_end().ends_with('/');
                                rest = &after_name[i + 1..];
                                self.open_element(name, self_closing);
                            }
                            None => {
                                self.mode = Mode::Tag(OpenTag {
                                    name,
                                    quote,
                                    depth: self.open.len(),
                                });
                                return first;
                            }
                        }
                    } else {
                        // A lone `<`, such as the start of a server block
                        first.get_or_insert(self.open.len());
                        rest = &rest[1..];
                    }
                }
            }
        }
    }

    fn finish(mut self) -> String {
        while self.out.last().is_some_and(String::is_empty) {
            self.out.pop();
        }
        let mut text = self.out.join("\n");
        if self.options.end_with_newline {
            text.push('\n');
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format(text: &str) -> String {
        LineIndenter.format(text, &MarkupOptions::default()).unwrap()
    }

    #[test]
    fn test_nesting() {
        let input = "<html>\n<body>\n<div>\n<p>Hi</p>\n</div>\n</body>\n</html>";
        let expected =
            "<html>\n    <body>\n        <div>\n            <p>Hi</p>\n        </div>\n    </body>\n</html>";
        assert_eq!(format(input), expected);
    }

    #[test]
    fn test_void_and_self_closing() {
        let input = "<div>\n<br>\n<img src=\"a.png\">\n<input />\ntext\n</div>";
        let expected =
            "<div>\n    <br>\n    <img src=\"a.png\">\n    <input />\n    text\n</div>";
        assert_eq!(format(input), expected);
    }

    #[test]
    fn test_optional_end_tags_do_not_drift() {
        let input = "<ul>\n<li>one\n<li>two\n<li>three\n</ul>\n<p>after</p>";
        let expected = "<ul>\n    <li>one\n    <li>two\n    <li>three\n</ul>\n<p>after</p>";
        assert_eq!(format(input), expected);
    }

    #[test]
    fn test_table_cells_without_end_tags() {
        let input = "<table>\n<tr>\n<td>a\n<td>b\n<tr>\n<td>c\n</table>\n<div>x</div>";
        let expected = "<table>\n    <tr>\n        <td>a\n        <td>b\n    <tr>\n        <td>c\n</table>\n<div>x</div>";
        assert_eq!(format(input), expected);
    }

    #[test]
    fn test_paragraph_closed_by_block() {
        let input = "<body>\n<p>intro\n<div>\nbody\n</div>\n</body>";
        let expected = "<body>\n    <p>intro\n    <div>\n        body\n    </div>\n</body>";
        assert_eq!(format(input), expected);
    }

    #[test]
    fn test_stray_end_tag_ignored() {
        assert_eq!(format("</div>\n<p>x</p>"), "</div>\n<p>x</p>");
    }

    #[test]
    fn test_raw_content_kept() {
        let input = "<div>\n<pre>\n  keep   this\n</pre>\n</div>";
        let expected = "<div>\n    <pre>\n  keep   this\n    </pre>\n</div>";
        assert_eq!(format(input), expected);

        let input = "<script>\nif (a < b) { x(); }\n</script>\n<p>after</p>";
        assert_eq!(format(input), input);
    }

    #[test]
    fn test_multiline_start_tag() {
        let input = "<div\nclass=\"a\"\nid=\"b\">\ntext\n</div>";
        let expected = "<div\n    class=\"a\"\n    id=\"b\">\n    text\n</div>";
        assert_eq!(format(input), expected);
    }

    #[test]
    fn test_quoted_gt_in_attribute() {
        let input = "<a title=\"x > y\">\nlink\n</a>";
        assert_eq!(format(input), "<a title=\"x > y\">\n    link\n</a>");
    }

    #[test]
    fn test_comment_content_ignored() {
        let input = "<!-- <div> -->\n<p>x</p>";
        assert_eq!(format(input), input);
        let input = "<div>\n<!--\n  <span>\n-->\n<p>x</p>\n</div>";
        let expected = "<div>\n    <!--\n  <span>\n-->\n    <p>x</p>\n</div>";
        assert_eq!(format(input), expected);
    }

    #[test]
    fn test_blank_lines() {
        assert_eq!(format("\n\na\n\n\n\n\nb\n\n"), "a\n\n\nb");
        let options = MarkupOptions {
            preserve_newlines: false,
            ..MarkupOptions::default()
        };
        assert_eq!(LineIndenter.format("a\n\nb", &options).unwrap(), "a\nb");
        let options = MarkupOptions {
            max_preserve_newlines: 0,
            ..MarkupOptions::default()
        };
        assert_eq!(
            LineIndenter.format("a\n\n\n\n\nb", &options).unwrap(),
            "a\n\n\n\n\nb"
        );
    }

    #[test]
    fn test_tabs_and_final_newline() {
        let options = MarkupOptions {
            indent_with_tabs: true,
            end_with_newline: true,
            ..MarkupOptions::default()
        };
        assert_eq!(
            LineIndenter.format("<ul>\n<li>a</li>\n</ul>", &options).unwrap(),
            "<ul>\n\t<li>a</li>\n</ul>\n"
        );
    }

    #[test]
    fn test_idempotent() {
        let input = "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<style>\n body { margin: 0 }\n</style>\n</head>\n<body>\n<table>\n<tr><td>__BLOCK_0__</td></tr>\n</table>\n<ul>\n<li>a\n<li>b\n</ul>\n</body>\n</html>";
        let once = format(input);
        assert_eq!(format(&once), once);
    }
}
