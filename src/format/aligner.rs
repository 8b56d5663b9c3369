/// `AssignmentAligner` - Lines up the `=` of assignment statements
///
/// The beautifiers record every emitted line that is a plain assignment
/// together with the byte offset of its operator. After the whole block is
/// formatted the aligner pads the left-hand sides so every recorded operator
/// starts in the same column.
///
/// Padding is computed from the trimmed left-hand side, so aligning an already
/// aligned block gives the same result.

/// Characters that may precede `=` in a compound assignment operator
const COMPOUND_PREFIX: &[char] = &['+', '-', '*', '/', '%', '&', '|', '^', '<', '>'];

/// Find the assignment operator in a masked (strings and comments blanked) line.
///
/// Returns the byte offset where the operator starts: the `=` itself, or the
/// first character of a compound operator such as `+=`. Comparisons (`==`,
/// `===`, `!=`, `<=`, `>=`) and arrows (`=>`) are not assignments.
#[must_use]
pub fn find_assignment_operator(masked: &str) -> Option<usize> {
    let bytes = masked.as_bytes();
    let eq = masked.find('=')?;
    if bytes.get(eq + 1).is_some_and(|&b| b == b'=' || b == b'>') {
        return None;
    }
    let mut start = eq;
    while start > 0 && COMPOUND_PREFIX.contains(&char::from(bytes[start - 1])) {
        start -= 1;
    }
    // `<=` and `>=` on their own are comparisons
    if start + 1 == eq && matches!(bytes[start], b'<' | b'>') {
        return None;
    }
    if start > 0 && bytes[start - 1] == b'!' {
        return None;
    }
    if masked[..start].trim().is_empty() {
        return None;
    }
    Some(start)
}

/// Collects assignment lines and aligns them in a final pass
#[derive(Debug, Default)]
pub struct AssignmentAligner {
    /// `(line index, operator offset)` for every recorded line
    entries: Vec<(usize, usize)>,
}

impl AssignmentAligner {
    /// Create an empty aligner
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `lines[index]` has its assignment operator at `op_offset`
    pub fn record(&mut self, index: usize, op_offset: usize) {
        self.entries.push((index, op_offset));
    }

    /// Number of recorded lines
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pad recorded lines so their operators share a column.
    ///
    /// Nothing happens with fewer than two recorded lines. A line whose padded
    /// form would exceed `max_line_length` (when non-zero) is left as it is.
    pub fn apply(&self, lines: &mut [String], max_line_length: usize) {
        if self.entries.len() < 2 {
            return;
        }

        let lhs_width = |line: &str, op: usize| line[..op].trim_end().chars().count();
        let target = self
            .entries
            .iter()
            .filter_map(|&(idx, op)| lines.get(idx).map(|line| lhs_width(line, op)))
            .max()
            .unwrap_or(0);

        for &(idx, op) in &self.entries {
            let Some(line) = lines.get_mut(idx) else {
                continue;
            };
            let lhs = line[..op].trim_end();
            let rest = &line[op..];
            let padded = format!("{lhs}{}{rest}", " ".repeat(target - lhs_width(line, op) + 1));
            if max_line_length > 0 && padded.chars().count() > max_line_length {
                continue;
            }
            *line = padded;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_assignment_operator() {
        assert_eq!(find_assignment_operator("x = 1"), Some(2));
        assert_eq!(find_assignment_operator("total += n"), Some(6));
        assert_eq!(find_assignment_operator("a == b"), None);
        assert_eq!(find_assignment_operator("a != b"), None);
        assert_eq!(find_assignment_operator("a <= b"), None);
        assert_eq!(find_assignment_operator("f = (x) => x"), Some(2));
        assert_eq!(find_assignment_operator("= 5"), None);
        assert_eq!(find_assignment_operator("n <<= 2"), Some(2));
    }

    #[test]
    fn test_align_columns() {
        let mut lines = vec![
            "x = 1".to_string(),
            "longer_name = 2".to_string(),
            "' note".to_string(),
            "    y = 3".to_string(),
        ];
        let mut aligner = AssignmentAligner::new();
        aligner.record(0, 2);
        aligner.record(1, 12);
        aligner.record(3, 6);
        aligner.apply(&mut lines, 0);
        assert_eq!(lines[0], "x           = 1");
        assert_eq!(lines[1], "longer_name = 2");
        assert_eq!(lines[2], "' note");
        assert_eq!(lines[3], "    y       = 3");
    }

    #[test]
    fn test_align_is_stable() {
        let mut lines = vec!["a   = 1".to_string(), "bcd = 2".to_string()];
        let mut aligner = AssignmentAligner::new();
        aligner.record(0, 4);
        aligner.record(1, 4);
        aligner.apply(&mut lines, 0);
        assert_eq!(lines, vec!["a   = 1", "bcd = 2"]);
    }

    #[test]
    fn test_single_line_not_aligned() {
        let mut lines = vec!["x    = 1".to_string()];
        let mut aligner = AssignmentAligner::new();
        aligner.record(0, 5);
        aligner.apply(&mut lines, 0);
        assert_eq!(lines[0], "x    = 1");
    }

    #[test]
    fn test_overlong_line_left_alone() {
        let mut lines = vec!["x = 1".to_string(), "a_much_longer_name = 2".to_string()];
        let mut aligner = AssignmentAligner::new();
        aligner.record(0, 2);
        aligner.record(1, 19);
        aligner.apply(&mut lines, 10);
        assert_eq!(lines[0], "x = 1");
    }
}
