/// Regex patterns for VBScript and JScript statements
///
/// All patterns are compiled once on first use via `LazyLock` and are
/// matched against masked, trimmed code (strings and comments blanked).
///
/// All regexes use case-insensitive + unicode flags
use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};

/// Build a case-insensitive regex from a compile-time constant pattern.
///
/// # Panics
///
/// Panics if the pattern is invalid. This is acceptable because all patterns
/// in this module are compile-time constants that are verified by tests.
/// The panic occurs at first access of the `LazyLock` static.
pub(crate) fn build_re(pattern: &str) -> Regex {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .unicode(true)
        .build()
        .unwrap_or_else(|_| panic!("Invalid regex pattern: {pattern}"))
}

// ===== VBSCRIPT BLOCK STRUCTURE =====

// If ... Then with nothing after Then opens a block; single-line Ifs don't
pub static VB_BLOCK_IF_RE: LazyLock<Regex> = LazyLock::new(|| build_re(r"^if\b.*\bthen$"));
// Else / ElseIf close one branch and open the next
pub static VB_ELSE_RE: LazyLock<Regex> = LazyLock::new(|| build_re(r"^else(if)?\b"));

// End If / End Sub / End Function / End Class / End Property / End With / End Select
pub static VB_END_BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    build_re(r"^end\s+(if|sub|function|class|property|with|select)\b")
});

// For / For Each / Do / Do While / While ... and their terminators
pub static VB_LOOP_START_RE: LazyLock<Regex> =
    LazyLock::new(|| build_re(r"^(for|do|while)\b"));
pub static VB_LOOP_END_RE: LazyLock<Regex> = LazyLock::new(|| build_re(r"^(next|loop|wend)\b"));

// Sub / Function / Property Get|Let|Set / Class, optionally scoped
pub static VB_PROC_START_RE: LazyLock<Regex> = LazyLock::new(|| {
    build_re(r"^((public|private)\s+)?(default\s+)?(sub|function|class|property\s+(get|let|set))\b")
});

pub static VB_WITH_RE: LazyLock<Regex> = LazyLock::new(|| build_re(r"^with\b"));
pub static VB_SELECT_RE: LazyLock<Regex> = LazyLock::new(|| build_re(r"^select\s+case\b"));
pub static VB_CASE_RE: LazyLock<Regex> = LazyLock::new(|| build_re(r"^case\b"));

// Physical line continued by a trailing underscore
pub static VB_CONTINUATION_RE: LazyLock<Regex> = LazyLock::new(|| build_re(r"(^|\s)_$"));

// Plain assignment: `x = ...`, `Set rs = ...`, `arr(i) = ...`, `Const X = ...`
pub static VB_ASSIGN_RE: LazyLock<Regex> =
    LazyLock::new(|| build_re(r"^((set|const|let)\s+)?[a-z_][\w.]*(\([^()]*\))?\s*="));

// Lines that are control headers rather than plain assignments
pub static VB_CONTROL_RE: LazyLock<Regex> = LazyLock::new(|| {
    build_re(r"^(if|elseif|else|for|do|loop|while|select|case|with)\b|\bthen\b")
});

// ===== JSCRIPT STATEMENTS =====

pub static JS_SWITCH_RE: LazyLock<Regex> = LazyLock::new(|| build_re(r"^switch\s*\("));
pub static JS_CASE_LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| build_re(r"^(case\b.*|default\s*):"));

// Headers that open a statement body instead of ending a statement
pub static JS_CONTROL_RE: LazyLock<Regex> = LazyLock::new(|| {
    build_re(r"^(if|for|while|switch|catch|with)\s*\(|^(else|do|try|finally)\b|^\}?\s*else\b|\bfunction\b")
});

// Statement shapes that receive a terminator
pub static JS_DECL_RE: LazyLock<Regex> =
    LazyLock::new(|| build_re(r"^(var|let|const)\s+[\w$]+"));
pub static JS_ASSIGN_RE: LazyLock<Regex> = LazyLock::new(|| {
    build_re(r"^[\w$.\[\]]+\s*([-+*/%&|^]|<<|>>|>>>)?=([^=]|$)")
});
pub static JS_CALL_RE: LazyLock<Regex> =
    LazyLock::new(|| build_re(r"[\w$\])]\s*\([^;]*\)$"));

// ===== ASP OBJECT MODEL =====

// Known object-model members whose call sites get normalized spacing
pub static MEMBER_CALL_RE: LazyLock<Regex> = LazyLock::new(|| {
    build_re(
        r"\b(Response\.(?:Write|Redirect|AddHeader|AppendToLog|BinaryWrite)|Server\.(?:MapPath|HTMLEncode|URLEncode|Execute|Transfer)|Request\.(?:QueryString|Form|Cookies|ServerVariables))[ \t]*\([ \t]*",
    )
});

// CreateObject("ProgId") with a single literal argument
pub static CREATE_OBJECT_RE: LazyLock<Regex> = LazyLock::new(|| {
    build_re(r#"\b((?:Server\.)?CreateObject)[ \t]*\([ \t]*("[^"]*"|'[^']*')[ \t]*\)"#)
});
