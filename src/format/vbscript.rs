//! VBScript beautifier
//!
//! Re-indents VBScript one physical line at a time. Block structure comes
//! from keywords at the start of each statement:
//!
//! - closing keywords (`End If`, `Next`, `Loop`, `Wend`, `Else`...) dedent
//!   their own line before it is indented;
//! - opening keywords (`If ... Then`, `For`, `Do`, `Sub`, `Select Case`...)
//!   raise the depth starting with the next line.
//!
//! Statements continued with ` _` are judged as one logical statement and
//! their continuation lines are indented one extra level. Lines produced by
//! array reflow or long-line breaking go back through the same state machine.

use std::collections::VecDeque;

use crate::error::FormatError;
use crate::format::aligner::{find_assignment_operator, AssignmentAligner};
use crate::format::line_split::{break_long_line, BreakParams, VBSCRIPT_BREAKS};
use crate::format::literal::{normalize_member_calls, reflow_vbscript_array};
use crate::format::{indent, ScriptOptions};
use crate::parser::code_filter::{mask, Syntax};
use crate::parser::patterns::{
    VB_ASSIGN_RE, VB_BLOCK_IF_RE, VB_CASE_RE, VB_CONTINUATION_RE, VB_CONTROL_RE, VB_ELSE_RE,
    VB_END_BLOCK_RE, VB_LOOP_END_RE, VB_LOOP_START_RE, VB_PROC_START_RE, VB_SELECT_RE,
    VB_WITH_RE,
};

/// A statement whose continuation lines are still being read
#[derive(Debug)]
struct OpenStatement {
    /// Depth of the statement's first line
    depth: usize,
    /// Masked code of the lines read so far, joined with spaces
    code: String,
}

/// Indentation state carried from one line to the next
#[derive(Debug, Default)]
struct VbIndentState {
    depth: usize,
    /// One entry per open `Select Case`; `true` once a `Case` branch is open
    select_stack: Vec<bool>,
    statement: Option<OpenStatement>,
}

impl VbIndentState {
    /// Dedent for a closing keyword at the start of a statement
    fn outdent(&mut self, code: &str) {
        if let Some(caps) = VB_END_BLOCK_RE.captures(code) {
            if caps[1].eq_ignore_ascii_case("select") && self.select_stack.pop() == Some(true) {
                self.depth = self.depth.saturating_sub(1);
            }
            self.depth = self.depth.saturating_sub(1);
        } else if VB_LOOP_END_RE.is_match(code) || VB_ELSE_RE.is_match(code) {
            self.depth = self.depth.saturating_sub(1);
        } else if VB_CASE_RE.is_match(code) && self.select_stack.last() == Some(&true) {
            self.depth = self.depth.saturating_sub(1);
        }
    }

    /// Schedule the indent increase of a complete statement for the next line
    fn open(&mut self, statement: &str) {
        if VB_SELECT_RE.is_match(statement) {
            self.select_stack.push(false);
            self.depth += 1;
        } else if VB_CASE_RE.is_match(statement) {
            if let Some(case_open) = self.select_stack.last_mut() {
                *case_open = true;
                self.depth += 1;
            }
        } else if VB_BLOCK_IF_RE.is_match(statement)
            || VB_ELSE_RE.is_match(statement)
            || VB_LOOP_START_RE.is_match(statement)
            || VB_PROC_START_RE.is_match(statement)
            || VB_WITH_RE.is_match(statement)
        {
            self.depth += 1;
        }
    }
}

/// Put all pieces but the first back at the front of the queue and return
/// the first one
fn requeue(queue: &mut VecDeque<(usize, String)>, line_no: usize, pieces: Vec<String>) -> String {
    let mut pieces = pieces.into_iter();
    let first = pieces.next().unwrap_or_default();
    for piece in pieces.rev() {
        queue.push_front((line_no, piece));
    }
    first
}

/// Beautify VBScript code.
///
/// Returns [`FormatError::UnterminatedString`] when a line's quotes do not
/// balance, since code and string contents can no longer be told apart.
pub fn beautify_vbscript(code: &str, options: &ScriptOptions) -> Result<String, FormatError> {
    let unit = options.indent_size;
    let mut queue: VecDeque<(usize, String)> = code
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.to_string()))
        .collect();
    let mut state = VbIndentState::default();
    let mut out: Vec<String> = Vec::with_capacity(queue.len());
    let mut aligner = AssignmentAligner::new();

    while let Some((line_no, raw)) = queue.pop_front() {
        let text = raw.trim();
        if text.is_empty() {
            out.push(String::new());
            continue;
        }

        let masked = mask(text, Syntax::VbScript, false);
        if masked.unterminated_string {
            return Err(FormatError::UnterminatedString { line: line_no });
        }
        let code = masked.code.trim().to_ascii_lowercase();

        // Comment-only line
        if code.is_empty() {
            let depth = state.statement.as_ref().map_or(state.depth, |s| s.depth + 1);
            out.push(format!("{}{text}", indent(depth, unit)));
            continue;
        }

        let continuing = state.statement.is_some();
        let depth = match &state.statement {
            Some(stmt) if code.starts_with(')') => stmt.depth,
            Some(stmt) => stmt.depth + 1,
            None => {
                state.outdent(&code);
                state.depth
            }
        };

        let mut line = normalize_member_calls(text, Syntax::VbScript);
        if let Some(pieces) = reflow_vbscript_array(&line) {
            line = requeue(&mut queue, line_no, pieces);
        }
        let params = BreakParams {
            indent: depth.saturating_mul(unit),
            max_line_length: options.max_line_length,
            candidates: VBSCRIPT_BREAKS,
            marker: " _",
            syntax: Syntax::VbScript,
        };
        if let Some((head, tail)) = break_long_line(&line, &params) {
            queue.push_front((line_no, tail));
            line = head;
        }

        let line_code = mask(&line, Syntax::VbScript, false).code;
        let continues = VB_CONTINUATION_RE.is_match(&line_code);
        let lead = indent(depth, unit);

        if options.align_assignments
            && !continuing
            && !continues
            && VB_ASSIGN_RE.is_match(&line_code)
            && !VB_CONTROL_RE.is_match(&line_code)
        {
            if let Some(op) = find_assignment_operator(&line_code) {
                aligner.record(out.len(), lead.len() + op);
            }
        }
        out.push(format!("{lead}{line}"));

        let piece = if continues {
            line_code.trim_end_matches('_').trim()
        } else {
            line_code.trim()
        };
        let stmt = state.statement.get_or_insert_with(|| OpenStatement {
            depth,
            code: String::new(),
        });
        if !stmt.code.is_empty() {
            stmt.code.push(' ');
        }
        stmt.code.push_str(piece);

        if !continues {
            if let Some(finished) = state.statement.take() {
                state.open(&finished.code);
            }
        }
    }

    if options.align_assignments {
        aligner.apply(&mut out, options.max_line_length);
    }
    Ok(out.join("\n"))
}
