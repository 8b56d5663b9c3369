//! Line splitting for respecting line length limits
//!
//! Breaks an over-long script line in two at an operator, comma or member
//! access boundary. Candidates are tried in a fixed priority order and each
//! one is searched right to left, so the head stays as long as the limit
//! allows. Only code is searched: boundaries inside string literals and
//! comments are never used.

use crate::parser::code_filter::{comment_start, mask_line, Syntax};

/// VBScript break candidates, in priority order
pub const VBSCRIPT_BREAKS: &[&str] = &[" and ", " or ", " & ", " + ", " - ", " * ", " / ", ", "];

/// JScript break candidates, in priority order
pub const JSCRIPT_BREAKS: &[&str] = &[
    " && ", " || ", " + ", " - ", " * ", " / ", ", ", " ? ", " : ", ".",
];

/// Where and how to break a long line
#[derive(Debug, Clone, Copy)]
pub struct BreakParams<'a> {
    /// Column the line starts at
    pub indent: usize,
    /// Maximum line width; 0 disables breaking
    pub max_line_length: usize,
    /// Candidate boundaries in priority order (lowercase)
    pub candidates: &'a [&'a str],
    /// Marker appended to the head to continue the statement (`" _"` for VBScript)
    pub marker: &'a str,
    /// Quote/comment rules for the line
    pub syntax: Syntax,
}

fn width(text: &str) -> usize {
    text.chars().count()
}

/// A `.` between two digits is a decimal point, not member access
fn is_decimal_point(text: &str, pos: usize) -> bool {
    let before = text[..pos].chars().next_back();
    let after = text[pos + 1..].chars().next();
    matches!((before, after), (Some(b), Some(a)) if b.is_ascii_digit() && a.is_ascii_digit())
}

/// Split `text` at the candidate occurrence starting at `pos`.
///
/// Returns `(head, tail)` without the continuation marker.
fn split_at_candidate(text: &str, pos: usize, candidate: &str) -> Option<(String, String)> {
    let (head, tail) = if candidate == "." {
        (text[..pos].trim_end(), &text[pos..])
    } else {
        // The operator stays at the end of the head
        let keep = candidate.trim_end().len();
        (&text[..pos + keep], text[pos + candidate.len()..].trim_start())
    };
    if head.trim().is_empty() || tail.trim().is_empty() {
        return None;
    }
    Some((head.to_string(), tail.to_string()))
}

/// Find a break for a trimmed script line that exceeds the limit.
///
/// Returns `None` when the line fits, carries a trailing comment, or offers
/// no boundary that makes the head fit. The caller re-feeds the tail, which
/// may be broken again.
#[must_use]
pub fn break_long_line(text: &str, params: &BreakParams<'_>) -> Option<(String, String)> {
    if params.max_line_length == 0
        || params.indent.saturating_add(width(text)) <= params.max_line_length
    {
        return None;
    }
    if comment_start(text, params.syntax).is_some() {
        return None;
    }

    let budget = params
        .max_line_length
        .checked_sub(params.indent.saturating_add(width(params.marker)))?;
    let masked = mask_line(text, params.syntax).to_ascii_lowercase();

    for candidate in params.candidates {
        let positions: Vec<usize> = masked.match_indices(candidate).map(|(p, _)| p).collect();
        for &pos in positions.iter().rev() {
            if *candidate == "." && is_decimal_point(text, pos) {
                continue;
            }
            let Some((head, tail)) = split_at_candidate(text, pos, candidate) else {
                continue;
            };
            if width(&head) <= budget {
                return Some((format!("{head}{}", params.marker), tail));
            }
        }
    }

    None
}
