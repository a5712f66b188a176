//! Growing a line range until the brackets opened inside it are closed.
//!
//! The syntax tree does not always reach the closing delimiter of a
//! construct: a `]` or a heredoc terminator produces no node, so a range
//! derived from node lines can stop short of it.

use crate::range::LineRange;
use crate::source::Syntax;
use crate::token::BracketToken;

/// Brackets opened within `range` and not closed within it, in source order.
///
/// A closer cancels the most recently opened bracket of its own family;
/// closers without a match are ignored.
#[must_use]
pub fn unclosed_brackets(syntax: &Syntax, range: LineRange) -> Vec<BracketToken> {
    let mut open: Vec<BracketToken> = Vec::new();

    for line in range.lines() {
        for &token in syntax.brackets_on_line(line) {
            if token.kind.is_opener() {
                open.push(token);
            } else if let Some(index) = open
                .iter()
                .rposition(|opened| opened.kind.closer() == Some(token.kind))
            {
                open.remove(index);
            }
        }
    }

    open
}

/// Extend `range` downwards until none of the brackets left open in it
/// initially are still open. Never extends past the last line.
#[must_use]
pub fn expand(syntax: &Syntax, range: LineRange) -> LineRange {
    let initial = unclosed_brackets(syntax, range);
    if initial.is_empty() {
        return range;
    }

    let mut range = range;
    let mut unclosed = initial.clone();
    while initial.iter().any(|token| unclosed.contains(token)) {
        if range.end() >= syntax.line_count() {
            tracing::trace!(end = range.end(), "brackets still open at end of file");
            break;
        }
        range = range.grow();
        unclosed = unclosed_brackets(syntax, range);
    }

    tracing::trace!(start = range.start(), end = range.end(), "expanded range");
    range
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::BracketKind;

    fn syntax(input: &str) -> Syntax {
        Syntax::build(input).expect("should parse")
    }

    fn range(start: usize, end: usize) -> LineRange {
        LineRange::new(start, end).expect("valid range")
    }

    #[test]
    fn balanced_range_is_unchanged() {
        let s = syntax("foo(1, [2])\nbar\n");
        assert!(unclosed_brackets(&s, range(1, 1)).is_empty());
        assert_eq!(expand(&s, range(1, 1)), range(1, 1));
    }

    #[test]
    fn open_bracket_grows_to_its_closer() {
        let s = syntax("x = [\n  1,\n  2\n]\ny = 3\n");
        let open = unclosed_brackets(&s, range(1, 1));
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].kind, BracketKind::LBracket);
        assert_eq!(expand(&s, range(1, 1)), range(1, 4));
    }

    #[test]
    fn closer_matches_most_recent_of_its_family() {
        let s = syntax("foo([{\n  a: 1\n}],\n  2)\n");
        let open: Vec<_> = unclosed_brackets(&s, range(1, 3))
            .iter()
            .map(|b| b.kind)
            .collect();
        assert_eq!(open, vec![BracketKind::LParen]);
        assert_eq!(expand(&s, range(1, 1)), range(1, 4));
    }

    #[test]
    fn stray_closer_is_ignored() {
        let s = syntax("foo(\n  1\n)\n");
        assert!(unclosed_brackets(&s, range(2, 3)).is_empty());
        assert_eq!(expand(&s, range(2, 3)), range(2, 3));
    }

    #[test]
    fn heredoc_grows_to_terminator() {
        let s = syntax("x = foo(<<~EOS)\n  one\n  two\nEOS\ny = 1\n");
        let open = unclosed_brackets(&s, range(1, 3));
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].kind, BracketKind::HeredocBeg);
        assert_eq!(expand(&s, range(1, 3)), range(1, 4));
    }

    #[test]
    fn only_initially_open_brackets_drive_growth() {
        // line 2 opens a bracket, but the expansion only waits for line 1's
        let s = syntax("a = [\n  b(\n  )\n]\n");
        assert_eq!(expand(&s, range(1, 1)), range(1, 4));
        assert_eq!(expand(&s, range(1, 2)), range(1, 4));
    }
}
