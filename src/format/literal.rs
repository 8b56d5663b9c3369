//! Cosmetic line transforms shared by both beautifiers
//!
//! - Array and object literals with more than [`REFLOW_THRESHOLD`] items
//!   written on one line are laid out one item per line.
//! - Calls on well-known ASP object members lose the space before `(` and
//!   around a single `CreateObject` argument.
//!
//! Every transform works on the masked line so brackets, commas and member
//! names inside string literals or comments are never touched.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::parser::code_filter::{comment_start, mask_line, Syntax};
use crate::parser::patterns::{build_re, CREATE_OBJECT_RE, MEMBER_CALL_RE, VB_CONTINUATION_RE};

/// Literals with more items than this are reflowed
pub const REFLOW_THRESHOLD: usize = 3;

static VB_ARRAY_RE: LazyLock<Regex> = LazyLock::new(|| build_re(r"\barray[ \t]*\("));

/// Byte offset of the bracket closing the one at `open` on the same line
#[must_use]
pub fn matching_close(masked: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, b) in masked.bytes().enumerate().skip(open) {
        match b {
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Byte ranges of the comma-separated items between `open` and `close`.
///
/// Returns `None` when an item is empty (trailing or doubled comma), since
/// such a literal cannot be laid out one item per line without changing it.
#[must_use]
pub fn split_top_level(masked: &str, open: usize, close: usize) -> Option<Vec<(usize, usize)>> {
    let mut items = Vec::new();
    let mut depth = 0usize;
    let mut start = open + 1;
    for (i, b) in masked.bytes().enumerate().take(close).skip(open + 1) {
        match b {
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth = depth.saturating_sub(1),
            b',' if depth == 0 => {
                items.push((start, i));
                start = i + 1;
            }
            _ => {}
        }
    }
    items.push((start, close));

    if items.iter().any(|&(s, e)| masked[s..e].trim().is_empty()) {
        return None;
    }
    Some(items)
}

/// Lay out `Array(...)` with many items over continued lines.
///
/// ```text
/// list = Array( _
/// "a", _
/// "b", _
/// "c", _
/// "d" _
/// )
/// ```
///
/// The pieces carry no indentation; the beautifier indents them as
/// continuation lines.
#[must_use]
pub fn reflow_vbscript_array(text: &str) -> Option<Vec<String>> {
    let masked = mask_line(text, Syntax::VbScript);
    if comment_start(text, Syntax::VbScript).is_some() || VB_CONTINUATION_RE.is_match(&masked) {
        return None;
    }

    let found = VB_ARRAY_RE.find(&masked)?;
    let open = found.end() - 1;
    let close = matching_close(&masked, open)?;
    let items = split_top_level(&masked, open, close)?;
    if items.len() <= REFLOW_THRESHOLD {
        return None;
    }

    let last = items.len() - 1;
    let mut pieces = Vec::with_capacity(items.len() + 2);
    pieces.push(format!("{} _", &text[..=open]));
    for (i, &(start, end)) in items.iter().enumerate() {
        let item = text[start..end].trim();
        if i == last {
            pieces.push(format!("{item} _"));
        } else {
            pieces.push(format!("{item}, _"));
        }
    }
    pieces.push(text[close..].to_string());
    Some(pieces)
}

/// Lay out the first `[...]` or `{...}` literal with many items one item per
/// line.
///
/// `is_literal(masked, pos)` decides whether the bracket at `pos` opens a
/// literal rather than an index, a block or a call.
#[must_use]
pub fn reflow_jscript_literal<F>(text: &str, is_literal: F) -> Option<Vec<String>>
where
    F: Fn(&str, usize) -> bool,
{
    if comment_start(text, Syntax::JScript).is_some() {
        return None;
    }
    let masked = mask_line(text, Syntax::JScript);

    for (open, c) in masked.char_indices() {
        if !matches!(c, '[' | '{') || !is_literal(&masked, open) {
            continue;
        }
        let Some(close) = matching_close(&masked, open) else {
            continue;
        };
        let Some(items) = split_top_level(&masked, open, close) else {
            continue;
        };
        if items.len() <= REFLOW_THRESHOLD {
            continue;
        }

        let last = items.len() - 1;
        let mut pieces = Vec::with_capacity(items.len() + 2);
        pieces.push(text[..=open].to_string());
        for (i, &(start, end)) in items.iter().enumerate() {
            let item = text[start..end].trim();
            if i == last {
                pieces.push(item.to_string());
            } else {
                pieces.push(format!("{item},"));
            }
        }
        pieces.push(text[close..].to_string());
        return Some(pieces);
    }

    None
}

/// Replace every match of `re` that `accept` confirms lies in code
fn replace_in_code<A, R>(text: &str, syntax: Syntax, re: &Regex, accept: A, replace: R) -> String
where
    A: Fn(&str, &Captures<'_>) -> bool,
    R: Fn(&Captures<'_>) -> String,
{
    let masked = mask_line(text, syntax);
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for caps in re.captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        if !accept(&masked, &caps) {
            continue;
        }
        out.push_str(&text[last..whole.start()]);
        out.push_str(&replace(&caps));
        last = whole.end();
    }
    out.push_str(&text[last..]);
    out
}

/// Byte ranges of the blanks to drop at a known member call: before and
/// after its `(`, and before the matching `)` when the call closes on the line.
fn member_call_cuts(text: &str, masked: &str) -> Vec<(usize, usize)> {
    let mut cuts = Vec::new();
    for caps in MEMBER_CALL_RE.captures_iter(text) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if masked.get(whole.range()) != text.get(whole.range()) {
            continue;
        }
        let Some(open) = text[name.end()..whole.end()].find('(').map(|i| name.end() + i) else {
            continue;
        };
        cuts.push((name.end(), open));
        cuts.push((open + 1, whole.end()));
        if let Some(close) = matching_close(masked, open) {
            let content_end = text[..close].trim_end_matches([' ', '\t']).len();
            cuts.push((content_end.max(whole.end()), close));
        }
    }
    cuts.sort_unstable();
    cuts
}

/// Normalize spacing at call sites of known ASP object members:
/// `Response.Write ( x )` becomes `Response.Write(x)` and
/// `CreateObject( "ProgId" )` becomes `CreateObject("ProgId")`.
#[must_use]
pub fn normalize_member_calls(text: &str, syntax: Syntax) -> String {
    let masked = mask_line(text, syntax);
    let mut spaced = String::with_capacity(text.len());
    let mut last = 0;
    for (start, end) in member_call_cuts(text, &masked) {
        if start < last || start >= end {
            continue;
        }
        spaced.push_str(&text[last..start]);
        last = end;
    }
    spaced.push_str(&text[last..]);

    replace_in_code(
        &spaced,
        syntax,
        &CREATE_OBJECT_RE,
        |masked, caps| {
            let (Some(name), Some(literal), Some(whole)) = (caps.get(1), caps.get(2), caps.get(0))
            else {
                return false;
            };
            let quote = &literal.as_str()[..1];
            masked.get(name.start()..name.end()) == Some(name.as_str())
                && masked.get(literal.start()..=literal.start()) == Some(quote)
                && masked.get(literal.end() - 1..literal.end()) == Some(quote)
                && masked.get(whole.end() - 1..whole.end()) == Some(")")
        },
        |caps| format!("{}({})", &caps[1], &caps[2]),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matching_close() {
        let masked = "x = f(a, (b), c) + 1";
        assert_eq!(matching_close(masked, 5), Some(15));
        assert_eq!(matching_close("f(a", 1), None);
    }

    #[test]
    fn test_split_top_level() {
        let masked = "[1, f(2, 3), [4, 5], 6]";
        let items = split_top_level(masked, 0, masked.len() - 1).unwrap();
        let texts: Vec<&str> = items.iter().map(|&(s, e)| masked[s..e].trim()).collect();
        assert_eq!(texts, vec!["1", "f(2, 3)", "[4, 5]", "6"]);
        assert!(split_top_level("[1, 2,]", 0, 6).is_none());
    }

    #[test]
    fn test_reflow_vbscript_array() {
        let pieces = reflow_vbscript_array(r#"days = Array("Mon", "Tue", "Wed", "Thu")"#).unwrap();
        assert_eq!(
            pieces,
            vec![
                "days = Array( _",
                "\"Mon\", _",
                "\"Tue\", _",
                "\"Wed\", _",
                "\"Thu\" _",
                ")",
            ]
        );
    }

    #[test]
    fn test_reflow_vbscript_small_array_kept() {
        assert!(reflow_vbscript_array("x = Array(1, 2, 3)").is_none());
        assert!(reflow_vbscript_array("x = Array(1, 2, 3, 4) ' four").is_none());
        assert!(reflow_vbscript_array(r#"x = "Array(1, 2, 3, 4)""#).is_none());
    }

    #[test]
    fn test_reflow_jscript_literal() {
        let always = |_: &str, _: usize| true;
        let pieces = reflow_jscript_literal("var o = {a: 1, b: 2, c: 3, d: 4};", always).unwrap();
        assert_eq!(pieces, vec!["var o = {", "a: 1,", "b: 2,", "c: 3,", "d: 4", "};"]);

        let never = |_: &str, _: usize| false;
        assert!(reflow_jscript_literal("x = [1, 2, 3, 4];", never).is_none());
        assert!(reflow_jscript_literal("x = [1, 2, 3];", always).is_none());
    }

    #[test]
    fn test_normalize_member_calls() {
        assert_eq!(
            normalize_member_calls("Response.Write (name)", Syntax::VbScript),
            "Response.Write(name)"
        );
        assert_eq!(
            normalize_member_calls(
                r#"Set conn = Server.CreateObject( "ADODB.Connection" )"#,
                Syntax::VbScript
            ),
            r#"Set conn = Server.CreateObject("ADODB.Connection")"#
        );
        assert_eq!(
            normalize_member_calls(r#"s = "Response.Write (x)""#, Syntax::VbScript),
            r#"s = "Response.Write (x)""#
        );
        assert_eq!(
            normalize_member_calls("var fso = new ActiveXObject('x'); Response.Write( s );", Syntax::JScript),
            "var fso = new ActiveXObject('x'); Response.Write(s);"
        );
    }

    #[test]
    fn test_member_call_closing_paren() {
        assert_eq!(
            normalize_member_calls("Response.Write( Server.HTMLEncode( name ) )", Syntax::VbScript),
            "Response.Write(Server.HTMLEncode(name))"
        );
        assert_eq!(
            normalize_member_calls(r#"Response.Write( "a )  " )"#, Syntax::VbScript),
            r#"Response.Write("a )  ")"#
        );
        assert_eq!(
            normalize_member_calls("Response.Write( )", Syntax::VbScript),
            "Response.Write()"
        );
        // Closing on a later line leaves the rest alone
        assert_eq!(
            normalize_member_calls("Response.Write( a & _", Syntax::VbScript),
            "Response.Write(a & _"
        );
    }
}
