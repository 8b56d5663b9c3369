//! Script language detection for ASP blocks.
//!
//! [`classify`] decides whether a block's code is VBScript or JScript when
//! the page does not say. It is a scoring heuristic, not a parser:
//!
//! 1. An explicit `language="..."` attribute wins outright.
//! 2. Each language has a list of weighted patterns; every pattern that
//!    matches adds its weight once.
//! 3. Secondary hints: mostly `;`-terminated lines and `//` comments favour
//!    JScript, `'` comment lines favour VBScript.
//! 4. A clear lead with enough evidence decides. Near ties go to VBScript,
//!    the common default for classic ASP pages.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::parser::code_filter::{comment_start, Syntax};
use crate::parser::patterns::build_re;
use crate::parser::scanner::{blocks, BlockKind, Segment};

/// A script language an ASP block can be written in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptLanguage {
    VbScript,
    JScript,
}

impl fmt::Display for ScriptLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::VbScript => f.write_str("VBScript"),
            Self::JScript => f.write_str("JScript"),
        }
    }
}

/// Outcome of [`classify`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    VbScript,
    JScript,
    Undetermined,
}

impl Verdict {
    /// The detected language, if any
    #[must_use]
    pub fn language(self) -> Option<ScriptLanguage> {
        match self {
            Self::VbScript => Some(ScriptLanguage::VbScript),
            Self::JScript => Some(ScriptLanguage::JScript),
            Self::Undetermined => None,
        }
    }
}

/// A lead of at least this many points decides...
const MIN_LEAD: u32 = 2;
/// ...when the leading score reaches this
const MIN_SCORE: u32 = 3;
/// Scores this close count as a tie
const TIE_TOLERANCE: u32 = 1;

static LANGUAGE_ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    build_re(r#"\blanguage\s*=\s*["']?\s*(vbscript|jscript|javascript)\b"#)
});

static VBSCRIPT_RULES: LazyLock<Vec<(Regex, u32)>> = LazyLock::new(|| {
    [
        (r"\bdim\s+\w", 3),
        (r"\bend\s+(if|sub|function|select|with|class|property)\b", 3),
        (r"\bthen\b", 2),
        (r"\bset\s+\w+\s*=", 3),
        (r"\bon\s+error\s+(resume\s+next|goto\s+0)\b", 4),
        (r"\bnothing\b", 2),
        (r"\bvbcrlf\b", 3),
        (r"\bredim\b", 3),
        (r"<>", 2),
        (r"\bresponse\.write\s+[^(\s=]", 2),
        (r"\bexit\s+(sub|function|for|do)\b", 3),
        (r"\bcall\s+\w", 2),
        (r"\b(byval|byref)\b", 3),
        (
            r"(^|[^.\w])(isnull|isempty|isnumeric|isobject|cstr|cint|clng|cdbl|cbool|ubound|lbound|instr|lcase|ucase)\s*\(",
            2,
        ),
        (r"\belseif\b", 2),
        (r"\bwend\b", 2),
        (r"(?m)^\s*next\b", 2),
        (r"\bfor\s+each\b", 3),
        (r"\bselect\s+case\b", 3),
        (r"\b(and|or|not)\b", 1),
    ]
    .into_iter()
    .map(|(pattern, weight)| (build_re(pattern), weight))
    .collect()
});

static JSCRIPT_RULES: LazyLock<Vec<(Regex, u32)>> = LazyLock::new(|| {
    [
        (r"\bvar\s+\w", 3),
        (r"\b(let|const)\s+\w", 3),
        (r"\bfunction\s*[\w$]*\s*\([^)]*\)\s*\{", 3),
        (r"===|!==", 3),
        (r"&&|\|\|", 2),
        (r"\bconsole\.log\b", 3),
        (r"\bnew\s+(activexobject|date|array|object|enumerator|regexp)\b", 3),
        (r"\btypeof\b", 3),
        (r"\bthis\.", 2),
        (r"\bcatch\s*\(", 3),
        (r"\b(parseint|parsefloat)\s*\(", 3),
        (r"\bfor\s*\(", 3),
        (r"\bswitch\s*\(", 3),
        (r"!=", 2),
        (r"\breturn\b", 2),
        (r"\+\+", 1),
        (r"[{}]", 1),
    ]
    .into_iter()
    .map(|(pattern, weight)| (build_re(pattern), weight))
    .collect()
});

fn score(rules: &[(Regex, u32)], code: &str) -> u32 {
    rules
        .iter()
        .filter(|(re, _)| re.is_match(code))
        .map(|&(_, weight)| weight)
        .sum()
}

/// Language named by an explicit `language="..."` attribute in `code`
#[must_use]
pub fn explicit_language(code: &str) -> Option<ScriptLanguage> {
    let caps = LANGUAGE_ATTR_RE.captures(code)?;
    if caps[1].eq_ignore_ascii_case("vbscript") {
        Some(ScriptLanguage::VbScript)
    } else {
        Some(ScriptLanguage::JScript)
    }
}

/// VBScript and JScript scores for `code`, secondary hints included
#[must_use]
pub fn scores(code: &str) -> (u32, u32) {
    let lower = code.to_lowercase();
    let mut vb = score(&VBSCRIPT_RULES, &lower);
    let mut js = score(&JSCRIPT_RULES, &lower);

    let lines: Vec<&str> = code.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    if !lines.is_empty() {
        let terminated = lines.iter().filter(|l| l.ends_with(';')).count();
        if terminated * 2 > lines.len() {
            js += 2;
        }
    }
    let slash_comment = lines.iter().any(|line| {
        comment_start(line, Syntax::JScript).is_some_and(|pos| line[pos..].starts_with("//"))
    });
    if slash_comment {
        js += 2;
    }
    if lines.iter().any(|line| line.starts_with('\'')) {
        vb += 2;
    }

    (vb, js)
}

/// Decide the script language of a block's code.
#[must_use]
pub fn classify(code: &str) -> Verdict {
    if let Some(language) = explicit_language(code) {
        return match language {
            ScriptLanguage::VbScript => Verdict::VbScript,
            ScriptLanguage::JScript => Verdict::JScript,
        };
    }

    let (vb, js) = scores(code);
    let verdict = if vb >= js + MIN_LEAD && vb >= MIN_SCORE {
        Verdict::VbScript
    } else if js >= vb + MIN_LEAD && js >= MIN_SCORE {
        Verdict::JScript
    } else if vb.abs_diff(js) <= TIE_TOLERANCE && vb.max(js) > 0 {
        Verdict::VbScript
    } else if vb > js {
        Verdict::VbScript
    } else if js > vb {
        Verdict::JScript
    } else {
        Verdict::Undetermined
    };
    tracing::debug!(vbscript = vb, jscript = js, ?verdict, "classified block");
    verdict
}

/// Page default language from a `<%@ Language="..." %>` directive
#[must_use]
pub fn page_language(segments: &[Segment<'_>]) -> Option<ScriptLanguage> {
    blocks(segments)
        .filter(|block| block.kind == BlockKind::Directive)
        .find_map(|block| explicit_language(block.inner()))
}
