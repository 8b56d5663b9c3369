/// `CodeFilter` - Iterator that filters out string literals and comments
///
/// Wraps a character iterator over one physical script line and tracks
/// whether the cursor is inside a string literal or a comment. Used by the
/// beautifiers so keyword patterns, bracket counting and break points only
/// ever look at actual code.
use std::iter::Peekable;
use std::str::CharIndices;

/// Script syntax the filter follows for quotes and comments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Syntax {
    /// `"..."` strings (doubled quote escapes), `'` and `Rem` comments
    VbScript,
    /// `"..."`, `'...'` and `` `...` `` strings with backslash escapes,
    /// `//` and `/* */` comments
    JScript,
}

/// Iterator adapter yielding `(byte_position, char)` for code characters only
pub struct CodeFilter<'a> {
    content: &'a str,
    chars: Peekable<CharIndices<'a>>,
    syntax: Syntax,
    state: FilterState,
}

#[derive(Debug, Default)]
struct FilterState {
    instring: Option<char>,
    escaped: bool,
    in_line_comment: bool,
    in_block_comment: bool,
}

impl<'a> CodeFilter<'a> {
    /// Create a new `CodeFilter` starting outside any string or comment
    #[must_use]
    pub fn new(content: &'a str, syntax: Syntax) -> Self {
        Self::with_block_comment(content, syntax, false)
    }

    /// Create a `CodeFilter` that starts inside a `/* */` comment opened on an
    /// earlier line
    #[must_use]
    pub fn with_block_comment(content: &'a str, syntax: Syntax, in_block_comment: bool) -> Self {
        Self {
            content,
            chars: content.char_indices().peekable(),
            syntax,
            state: FilterState {
                in_block_comment: in_block_comment && syntax == Syntax::JScript,
                ..FilterState::default()
            },
        }
    }

    /// Whether the cursor is inside a string literal
    #[must_use]
    pub fn instring(&self) -> bool {
        self.state.instring.is_some()
    }

    /// Whether the cursor is inside a `/* */` comment
    #[must_use]
    pub fn in_block_comment(&self) -> bool {
        self.state.in_block_comment
    }

    /// Collect the remaining code characters into a string
    pub fn filter_all(&mut self) -> String {
        let mut result = String::with_capacity(self.content.len());
        for (_, c) in self.by_ref() {
            result.push(c);
        }
        result
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    fn starts_rem_comment(&self, pos: usize) -> bool {
        let rest = &self.content[pos..];
        let before_ok = self.content[..pos]
            .chars()
            .next_back()
            .map_or(true, |c| c.is_whitespace() || c == ':');
        before_ok
            && rest.len() >= 3
            && rest.is_char_boundary(3)
            && rest[..3].eq_ignore_ascii_case("rem")
            && rest[3..].chars().next().map_or(true, char::is_whitespace)
    }
}

impl Iterator for CodeFilter<'_> {
    type Item = (usize, char);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (pos, c) = self.chars.next()?;

            if self.state.in_line_comment {
                continue;
            }

            if self.state.in_block_comment {
                if c == '*' && self.peek_char() == Some('/') {
                    self.chars.next();
                    self.state.in_block_comment = false;
                }
                continue;
            }

            if let Some(quote) = self.state.instring {
                if self.syntax == Syntax::JScript && !self.state.escaped && c == '\\' {
                    self.state.escaped = true;
                    continue;
                }
                if !self.state.escaped && c == quote {
                    self.state.instring = None;
                    // Closing quote is code, so callers see balanced delimiters
                    return Some((pos, c));
                }
                self.state.escaped = false;
                continue;
            }

            match (self.syntax, c) {
                (Syntax::VbScript, '"') | (Syntax::JScript, '"' | '\'' | '`') => {
                    self.state.instring = Some(c);
                    return Some((pos, c));
                }
                (Syntax::VbScript, '\'') => {
                    self.state.in_line_comment = true;
                }
                (Syntax::VbScript, 'r' | 'R') if self.starts_rem_comment(pos) => {
                    self.state.in_line_comment = true;
                }
                (Syntax::JScript, '/') if self.peek_char() == Some('/') => {
                    self.state.in_line_comment = true;
                }
                (Syntax::JScript, '/') if self.peek_char() == Some('*') => {
                    self.chars.next();
                    self.state.in_block_comment = true;
                }
                _ => return Some((pos, c)),
            }
        }
    }
}

/// A script line with string contents and comments blanked out
#[derive(Debug, Clone)]
pub struct MaskedLine {
    /// The line with string contents and comments replaced by spaces,
    /// trailing whitespace trimmed. Byte positions match the source line.
    pub code: String,
    /// A `/* */` comment is still open at the end of the line
    pub in_block_comment: bool,
    /// A string literal is still open at the end of the line
    pub unterminated_string: bool,
}

/// Mask a line that may start inside a `/* */` comment opened earlier.
///
/// Quote characters stay in place so the masked line still shows where
/// literals are.
#[must_use]
pub fn mask(line: &str, syntax: Syntax, in_block_comment: bool) -> MaskedLine {
    let mut masked: Vec<u8> = vec![b' '; line.len()];
    let mut filter = CodeFilter::with_block_comment(line, syntax, in_block_comment);
    for (pos, c) in filter.by_ref() {
        let mut buf = [0u8; 4];
        let encoded = c.encode_utf8(&mut buf);
        masked[pos..pos + encoded.len()].copy_from_slice(encoded.as_bytes());
    }
    // Only whole characters were copied, the rest are ASCII spaces
    let text = String::from_utf8(masked).unwrap_or_default();
    MaskedLine {
        code: text.trim_end().to_string(),
        in_block_comment: filter.in_block_comment(),
        unterminated_string: filter.instring(),
    }
}

/// Replace string contents and comments with spaces, keeping byte positions.
#[must_use]
pub fn mask_line(line: &str, syntax: Syntax) -> String {
    mask(line, syntax, false).code
}

/// Check whether every string literal opened on the line is closed on it.
#[must_use]
pub fn strings_balanced(line: &str, syntax: Syntax) -> bool {
    let mut filter = CodeFilter::new(line, syntax);
    filter.by_ref().for_each(drop);
    !filter.instring()
}

/// Byte position where a trailing comment starts, if the line has one.
#[must_use]
pub fn comment_start(line: &str, syntax: Syntax) -> Option<usize> {
    let masked = mask_line(line, syntax);
    let code_end = masked.len();
    let rest = line[code_end..].trim_start();
    if rest.is_empty() {
        None
    } else {
        Some(line.len() - rest.len())
    }
}
