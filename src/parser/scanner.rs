//! `scan` - Splits an ASP document into markup spans and ASP blocks
//!
//! One left-to-right pass. At each `<` the scanner checks, in priority order:
//!
//! 1. `<!-- #include ... -->` server-side include
//! 2. `<%-- ... --%>` ASP comment
//! 3. `<%@`, `<%=`, `<%!` and plain `<%` blocks, closed by `%>`
//!
//! Anything else is markup and is copied through. The `%>` search inside a
//! block is quote aware: a `"` or `'` opens a literal only when the same quote
//! closes it on the same line, so `<% x = "a%>b" %>` is one block while a
//! lone apostrophe in a VBScript comment does not swallow the terminator.
//!
//! Concatenating the segments in order gives back the input exactly.

use std::sync::LazyLock;

use regex::Regex;

use crate::parser::patterns::build_re;

static INCLUDE_OPEN_RE: LazyLock<Regex> = LazyLock::new(|| build_re(r"\A<!--\s*#include\b"));

/// Kind of a recognized ASP block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    /// `<%@ ... %>` page directive
    Directive,
    /// `<%! ... %>` declaration
    Declaration,
    /// `<%= ... %>` output expression
    Output,
    /// `<% ... %>` server code
    Server,
    /// `<!-- #include ... -->` server-side include
    Include,
    /// `<%-- ... --%>` ASP comment
    Comment,
}

impl BlockKind {
    /// Opening delimiter of the block
    #[must_use]
    pub fn open_delimiter(self) -> &'static str {
        match self {
            Self::Directive => "<%@",
            Self::Declaration => "<%!",
            Self::Output => "<%=",
            Self::Server => "<%",
            Self::Include => "<!--",
            Self::Comment => "<%--",
        }
    }

    /// Closing delimiter of the block
    #[must_use]
    pub fn close_delimiter(self) -> &'static str {
        match self {
            Self::Include => "-->",
            Self::Comment => "--%>",
            _ => "%>",
        }
    }

    /// Whether the block holds script code the beautifiers may format
    #[must_use]
    pub fn holds_script(self) -> bool {
        matches!(self, Self::Server | Self::Output)
    }
}

/// A span of the document recognized as an ASP block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block<'a> {
    pub kind: BlockKind,
    /// Original text including delimiters
    pub raw: &'a str,
    /// Byte offset of the opening delimiter
    pub start: usize,
    /// Byte offset just past the closing delimiter (or end of document)
    pub end: usize,
    /// Whether the closing delimiter was found
    pub terminated: bool,
}

impl<'a> Block<'a> {
    /// Text between the delimiters
    #[must_use]
    pub fn inner(&self) -> &'a str {
        let open = self.kind.open_delimiter().len();
        let close = if self.terminated {
            self.kind.close_delimiter().len()
        } else {
            0
        };
        self.raw.get(open..self.raw.len() - close).unwrap_or("")
    }
}

/// One piece of a scanned document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a> {
    Markup(&'a str),
    Block(Block<'a>),
}

impl<'a> Segment<'a> {
    /// Original text of the segment
    #[must_use]
    pub fn as_str(&self) -> &'a str {
        match self {
            Segment::Markup(text) => text,
            Segment::Block(block) => block.raw,
        }
    }
}

/// Whether the quote at byte `pos` is closed by the same quote before the
/// next newline
fn quote_closes_on_line(text: &str, pos: usize, quote: char) -> bool {
    text[pos + 1..]
        .chars()
        .take_while(|&c| c != '\n')
        .any(|c| c == quote)
}

/// Byte offset just past the `%>` that closes a block body starting at `from`
fn find_block_end(text: &str, from: usize) -> Option<usize> {
    let mut quote: Option<char> = None;
    let mut chars = text[from..].char_indices().map(|(i, c)| (from + i, c));

    while let Some((pos, c)) = chars.next() {
        match quote {
            Some(q) if c == q || c == '\n' => quote = None,
            Some(_) => {}
            None => match c {
                '"' | '\'' if quote_closes_on_line(text, pos, c) => quote = Some(c),
                '%' if text[pos + 1..].starts_with('>') => return Some(pos + 2),
                _ => {}
            },
        }
    }
    None
}

/// Where a block starting at `pos` ends, and whether it was terminated
fn block_extent(text: &str, pos: usize, kind: BlockKind) -> (usize, bool) {
    let body = pos + kind.open_delimiter().len();
    let found = match kind {
        BlockKind::Include | BlockKind::Comment => {
            let close = kind.close_delimiter();
            text[body..].find(close).map(|i| body + i + close.len())
        }
        _ => find_block_end(text, body),
    };
    match found {
        Some(end) => (end, true),
        None => {
            tracing::debug!(
                offset = pos,
                kind = ?kind,
                "unterminated block extends to end of document"
            );
            (text.len(), false)
        }
    }
}

/// Classify the block opening at `rest`, if any
fn block_kind_at(rest: &str) -> Option<BlockKind> {
    if rest.starts_with("<!--") {
        return INCLUDE_OPEN_RE.is_match(rest).then_some(BlockKind::Include);
    }
    if rest.starts_with("<%--") {
        return Some(BlockKind::Comment);
    }
    let after = rest.strip_prefix("<%")?;
    Some(match after.chars().next() {
        Some('@') => BlockKind::Directive,
        Some('=') => BlockKind::Output,
        Some('!') => BlockKind::Declaration,
        _ => BlockKind::Server,
    })
}

/// Split `text` into markup spans and ASP blocks.
#[must_use]
pub fn scan(text: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut markup_start = 0;
    let mut pos = 0;

    while let Some(offset) = text[pos..].find('<') {
        pos += offset;
        let Some(kind) = block_kind_at(&text[pos..]) else {
            pos += 1;
            continue;
        };

        let (end, terminated) = block_extent(text, pos, kind);
        if markup_start < pos {
            segments.push(Segment::Markup(&text[markup_start..pos]));
        }
        segments.push(Segment::Block(Block {
            kind,
            raw: &text[pos..end],
            start: pos,
            end,
            terminated,
        }));
        pos = end;
        markup_start = end;
    }

    if markup_start < text.len() {
        segments.push(Segment::Markup(&text[markup_start..]));
    }
    segments
}

/// Blocks of a scanned document, in order
pub fn blocks<'s, 'a>(segments: &'s [Segment<'a>]) -> impl Iterator<Item = &'s Block<'a>> {
    segments.iter().filter_map(|segment| match segment {
        Segment::Block(block) => Some(block),
        Segment::Markup(_) => None,
    })
}
