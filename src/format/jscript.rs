//! JScript beautifier
//!
//! Indentation follows a stack of open brackets. `{` is told apart by its
//! context: a `switch` body, an object literal or a statement block. `case`
//! labels sit one level inside their `switch` and the statements after them
//! one level deeper. A line that follows a dangling binary operator, or
//! starts with `.`, is indented one extra level.
//!
//! Missing `;` terminators are added to declaration, assignment and call
//! statements when enabled.

use std::collections::VecDeque;

use crate::error::FormatError;
use crate::format::aligner::{find_assignment_operator, AssignmentAligner};
use crate::format::line_split::{break_long_line, BreakParams, JSCRIPT_BREAKS};
use crate::format::literal::{normalize_member_calls, reflow_jscript_literal};
use crate::format::{indent, ScriptOptions};
use crate::parser::code_filter::{mask, Syntax};
use crate::parser::patterns::{
    JS_ASSIGN_RE, JS_CALL_RE, JS_CASE_LABEL_RE, JS_CONTROL_RE, JS_DECL_RE, JS_SWITCH_RE,
};

/// Kind of an unclosed bracket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Opener {
    Block,
    Object,
    Switch,
    Paren,
    Bracket,
}

impl Opener {
    /// Brackets whose contents are part of the enclosing statement
    fn is_expression(self) -> bool {
        matches!(self, Self::Object | Self::Paren | Self::Bracket)
    }
}

/// Characters after which an expression continues on the next line
const OPERATOR_ENDINGS: &[char] = &[
    '+', '-', '*', '/', '%', '=', '&', '|', '^', '!', '~', '<', '>', '?', ':',
];

fn ends_with_operator(code: &str) -> bool {
    if code.ends_with("++") || code.ends_with("--") {
        return false;
    }
    code.ends_with(OPERATOR_ENDINGS)
}

fn ends_with_word(text: &str, word: &str) -> bool {
    text.strip_suffix(word).is_some_and(|rest| {
        !rest
            .chars()
            .next_back()
            .is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '$')
    })
}

/// Number of closing brackets before the first other code character
fn leading_closers(code: &str) -> usize {
    code.chars()
        .take_while(|&c| matches!(c, '}' | ')' | ']') || c.is_whitespace())
        .filter(|&c| !c.is_whitespace())
        .count()
}

/// Decide what the `{` at `pos` opens, given the brackets still open before it
fn classify_brace(stack: &[Opener], masked: &str, pos: usize) -> Opener {
    let before = masked[..pos].trim_end();
    if JS_SWITCH_RE.is_match(masked.trim_start()) && !before.contains('{') {
        return Opener::Switch;
    }
    if before.is_empty() {
        return match stack.last() {
            Some(open) if open.is_expression() => Opener::Object,
            _ => Opener::Block,
        };
    }
    if before.ends_with(['=', '(', '[', ',', ':', '?']) || ends_with_word(before, "return") {
        Opener::Object
    } else {
        Opener::Block
    }
}

/// Push and pop the brackets of one masked line
fn track_brackets(stack: &mut Vec<Opener>, masked: &str) {
    for (pos, c) in masked.char_indices() {
        match c {
            '{' => {
                let open = classify_brace(stack, masked, pos);
                stack.push(open);
            }
            '(' => stack.push(Opener::Paren),
            '[' => stack.push(Opener::Bracket),
            '}' | ')' | ']' => {
                stack.pop();
            }
            _ => {}
        }
    }
}

/// A statement spanning several lines
#[derive(Debug, Clone, Copy)]
struct OpenStatement {
    /// Bracket depth where the statement started
    base: usize,
    /// Whether the statement takes a `;` once it ends
    terminable: bool,
}

/// Indentation state carried from one line to the next
#[derive(Debug, Default)]
struct JsIndentState {
    stack: Vec<Opener>,
    in_block_comment: bool,
    /// The previous line left an expression open
    continues: bool,
    statement: Option<OpenStatement>,
}

impl JsIndentState {
    /// Indent level of a line with `closers` leading closing brackets
    fn level(&self, code: &str, closers: usize) -> usize {
        let open = &self.stack[..self.stack.len() - closers.min(self.stack.len())];
        let switches = open.iter().filter(|&&o| o == Opener::Switch).count();
        let mut level = open.len() + switches;
        if open.last() == Some(&Opener::Switch) && JS_CASE_LABEL_RE.is_match(code) {
            level -= 1;
        }
        level
    }

    /// Whether the bracket at `pos` opens an array or object literal
    fn opens_literal(&self, masked: &str, pos: usize) -> bool {
        if masked[pos..].starts_with('{') {
            return classify_brace(&self.stack, masked, pos) == Opener::Object;
        }
        let before = masked[..pos].trim_end();
        before.is_empty()
            || before.ends_with(['=', '(', '[', ',', ':', '?'])
            || ends_with_word(before, "return")
    }
}

fn is_terminable(code: &str) -> bool {
    (JS_DECL_RE.is_match(code) || JS_ASSIGN_RE.is_match(code) || JS_CALL_RE.is_match(code))
        && !JS_CONTROL_RE.is_match(code)
}

/// Whether a line ending in `code` still needs a `;`
fn lacks_terminator(code: &str) -> bool {
    !code.ends_with([';', '{', ',', '(', '[', ':']) && !ends_with_operator(code)
}

/// Append `;` after the code portion of `text`, before any trailing comment
fn append_terminator(text: &str, code_len: usize) -> String {
    format!("{};{}", &text[..code_len], &text[code_len..])
}

fn next_starts_with_dot(queue: &VecDeque<(usize, String)>) -> bool {
    queue
        .iter()
        .map(|(_, line)| line.trim())
        .find(|line| !line.is_empty())
        .is_some_and(|line| line.starts_with('.'))
}

fn requeue(queue: &mut VecDeque<(usize, String)>, line_no: usize, pieces: Vec<String>) -> String {
    let mut pieces = pieces.into_iter();
    let first = pieces.next().unwrap_or_default();
    for piece in pieces.rev() {
        queue.push_front((line_no, piece));
    }
    first
}

/// Beautify JScript code.
///
/// Returns [`FormatError::UnterminatedString`] when a line's quotes do not
/// balance.
pub fn beautify_jscript(code: &str, options: &ScriptOptions) -> Result<String, FormatError> {
    let unit = options.indent_size;
    let mut queue: VecDeque<(usize, String)> = code
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.to_string()))
        .collect();
    let mut state = JsIndentState::default();
    let mut out: Vec<String> = Vec::with_capacity(queue.len());
    let mut aligner = AssignmentAligner::new();

    while let Some((line_no, raw)) = queue.pop_front() {
        let text = raw.trim();
        if text.is_empty() {
            out.push(String::new());
            continue;
        }

        // Body of a /* */ comment
        if state.in_block_comment {
            let masked = mask(text, Syntax::JScript, true);
            let lead = indent(state.level("", 0), unit);
            if text.starts_with('*') {
                out.push(format!("{lead} {text}"));
            } else {
                out.push(format!("{lead}{text}"));
            }
            state.in_block_comment = masked.in_block_comment;
            track_brackets(&mut state.stack, &masked.code);
            continue;
        }

        let masked = mask(text, Syntax::JScript, false);
        if masked.unterminated_string {
            return Err(FormatError::UnterminatedString { line: line_no });
        }
        let code = masked.code.trim();

        // Comment-only line
        if code.is_empty() {
            out.push(format!("{}{text}", indent(state.level("", 0), unit)));
            state.in_block_comment = masked.in_block_comment;
            continue;
        }

        let closers = leading_closers(code);
        let mut level = state.level(code, closers);
        if closers == 0 && (state.continues || code.starts_with('.')) {
            level += 1;
        }
        let lead = indent(level, unit);
        let fresh = state.statement.is_none();
        let statement = state.statement.unwrap_or_else(|| OpenStatement {
            base: state.stack.len() - closers.min(state.stack.len()),
            terminable: is_terminable(code),
        });

        let mut line = text.to_string();
        let chained = next_starts_with_dot(&queue);
        if options.statement_terminators && statement.terminable && !chained {
            let mut after = state.stack.clone();
            track_brackets(&mut after, code);
            let inside = after.len() > statement.base
                && after.last().is_some_and(|open| open.is_expression());
            if !inside && lacks_terminator(code) {
                line = append_terminator(text, masked.code.len());
            }
        }

        line = normalize_member_calls(&line, Syntax::JScript);
        if let Some(pieces) = reflow_jscript_literal(&line, |m, pos| state.opens_literal(m, pos)) {
            line = requeue(&mut queue, line_no, pieces);
        }
        let params = BreakParams {
            indent: level.saturating_mul(unit),
            max_line_length: options.max_line_length,
            candidates: JSCRIPT_BREAKS,
            marker: "",
            syntax: Syntax::JScript,
        };
        if let Some((head, tail)) = break_long_line(&line, &params) {
            queue.push_front((line_no, tail));
            line = head;
        }

        let final_masked = mask(&line, Syntax::JScript, false);
        let final_code = final_masked.code.trim();

        if options.align_assignments
            && fresh
            && closers == 0
            && !state.stack.last().is_some_and(|open| open.is_expression())
            && (JS_DECL_RE.is_match(final_code) || JS_ASSIGN_RE.is_match(final_code))
        {
            if let Some(op) = find_assignment_operator(final_code) {
                aligner.record(out.len(), lead.len() + op);
            }
        }
        out.push(format!("{lead}{line}"));

        track_brackets(&mut state.stack, final_code);
        state.in_block_comment = final_masked.in_block_comment;
        let innermost = state.stack.last().copied();
        state.continues = (ends_with_operator(final_code) && !JS_CASE_LABEL_RE.is_match(final_code))
            || (final_code.ends_with(',')
                && !innermost.is_some_and(Opener::is_expression));

        let open_inside = state.stack.len() > statement.base
            && innermost.is_some_and(Opener::is_expression);
        state.statement = if state.continues || open_inside || next_starts_with_dot(&queue) {
            Some(statement)
        } else {
            None
        };
    }

    if options.align_assignments {
        aligner.apply(&mut out, options.max_line_length);
    }
    Ok(out.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts() -> ScriptOptions {
        ScriptOptions {
            indent_size: 2,
            max_line_length: 120,
            align_assignments: false,
            statement_terminators: true,
        }
    }

    fn beautify(code: &str) -> String {
        beautify_jscript(code, &opts()).unwrap()
    }

    #[test]
    fn test_blocks() {
        let input = "function greet(name) {\nif (name) {\nResponse.Write(\"Hi \" + name);\n} else {\nResponse.Write(\"Hi\");\n}\n}";
        let expected = "function greet(name) {\n  if (name) {\n    Response.Write(\"Hi \" + name);\n  } else {\n    Response.Write(\"Hi\");\n  }\n}";
        assert_eq!(beautify(input), expected);
    }

    #[test]
    fn test_terminators() {
        let input = "var x = 1\nx += 2\nfoo(x)\nif (x) {\nbar()\n}\nreturn x";
        let expected = "var x = 1;\nx += 2;\nfoo(x);\nif (x) {\n  bar();\n}\nreturn x";
        assert_eq!(beautify(input), expected);

        let plain = ScriptOptions {
            statement_terminators: false,
            ..opts()
        };
        assert_eq!(beautify_jscript("var x = 1", &plain).unwrap(), "var x = 1");
    }

    #[test]
    fn test_terminator_before_comment() {
        assert_eq!(beautify("x = 1 // one"), "x = 1; // one");
    }

    #[test]
    fn test_switch() {
        let input = "switch (k) {\ncase 1:\nx = 1;\nbreak;\ndefault:\nx = 2;\n}";
        let expected = "switch (k) {\n  case 1:\n    x = 1;\n    break;\n  default:\n    x = 2;\n}";
        assert_eq!(beautify(input), expected);
    }

    #[test]
    fn test_object_literal_reflow() {
        let once = beautify("var o = {a: 1, b: 2, c: 3, d: 4}");
        assert_eq!(once, "var o = {\n  a: 1,\n  b: 2,\n  c: 3,\n  d: 4\n};");
        assert_eq!(beautify(&once), once);
    }

    #[test]
    fn test_array_index_not_reflowed() {
        let line = "x = grid[a, b, c, d];";
        assert_eq!(beautify(line), line);
    }

    #[test]
    fn test_operator_continuation() {
        assert_eq!(beautify("var total = a +\nb;"), "var total = a +\n  b;");
        assert_eq!(beautify("foo(a,\nb);"), "foo(a,\n  b);");
    }

    #[test]
    fn test_member_chain() {
        assert_eq!(beautify("$(\"#x\")\n.hide()"), "$(\"#x\")\n  .hide();");
    }

    #[test]
    fn test_block_comment() {
        assert_eq!(beautify("/*\n* note\n*/\nx = 1;"), "/*\n * note\n */\nx = 1;");
    }

    #[test]
    fn test_long_line_broken() {
        let options = ScriptOptions {
            max_line_length: 40,
            ..opts()
        };
        let input = "var message = first_part + second_part + third_part;";
        let once = beautify_jscript(input, &options).unwrap();
        assert_eq!(once, "var message = first_part + second_part +\n  third_part;");
        assert_eq!(beautify_jscript(&once, &options).unwrap(), once);
    }

    #[test]
    fn test_align_assignments() {
        let options = ScriptOptions {
            align_assignments: true,
            ..opts()
        };
        let once = beautify_jscript("var a = 1;\nvar longer = 2;", &options).unwrap();
        assert_eq!(once, "var a      = 1;\nvar longer = 2;");
        assert_eq!(beautify_jscript(&once, &options).unwrap(), once);
    }

    #[test]
    fn test_unterminated_string_is_error() {
        let err = beautify_jscript("var s = \"abc", &opts()).unwrap_err();
        assert!(matches!(err, FormatError::UnterminatedString { line: 1 }));
    }

    #[test]
    fn test_helpers() {
        assert_eq!(leading_closers("}) + x"), 2);
        assert!(ends_with_word("x = return", "return"));
        assert!(!ends_with_word("noreturn", "return"));
        assert!(ends_with_operator("a &&"));
        assert!(!ends_with_operator("i++"));
    }
}
