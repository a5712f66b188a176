//! Finding the lines spanned by the expression that starts on a line.

use std::collections::HashSet;

use crate::SyntaxError;
use crate::balance;
use crate::range::LineRange;
use crate::source::{SourceFile, Syntax};
use crate::tree::{NodeId, SyntaxTree};

/// Why an expression range could not be determined.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Unresolved {
    /// No token node sits on the requested line.
    #[error("no expression at line {line}")]
    NoExpressionAtLine { line: usize },
    /// The file could not be tokenized or parsed.
    #[error("{0}")]
    Syntax(#[from] SyntaxError),
}

/// Line range of the expression starting at `beginning_line` of `source`.
///
/// # Errors
///
/// Returns `Unresolved::Syntax` if the file does not parse and
/// `Unresolved::NoExpressionAtLine` if nothing anchors the line.
pub fn resolve_source(source: &SourceFile, beginning_line: usize) -> Result<LineRange, Unresolved> {
    let syntax = source
        .syntax()
        .map_err(|err| Unresolved::Syntax(err.clone()))?;
    resolve(syntax, beginning_line)
}

/// Line range of the expression starting at `beginning_line`.
///
/// The range covers every located node under the outermost node that
/// encloses all nodes on the line, then grows until brackets opened inside
/// it are closed.
///
/// # Errors
///
/// Returns `Unresolved::NoExpressionAtLine` if no token node sits on
/// `beginning_line`.
pub fn resolve(syntax: &Syntax, beginning_line: usize) -> Result<LineRange, Unresolved> {
    let node = expression_node(syntax, beginning_line)?;
    let Some(range) = located_line_range(syntax.tree(), node) else {
        return Err(Unresolved::NoExpressionAtLine {
            line: beginning_line,
        });
    };
    tracing::trace!(
        line = beginning_line,
        start = range.start(),
        end = range.end(),
        "expression node range"
    );
    Ok(balance::expand(syntax, range))
}

/// Outermost node shared by every token node on `line`.
fn expression_node(syntax: &Syntax, line: usize) -> Result<NodeId, Unresolved> {
    let tree = syntax.tree();
    let seeds = syntax.nodes_on_line(line);
    let Some((&first, rest)) = seeds.split_first() else {
        return Err(Unresolved::NoExpressionAtLine { line });
    };

    let other_chains: Vec<HashSet<NodeId>> = rest
        .iter()
        .map(|&seed| tree.ancestors(seed).collect())
        .collect();

    tree.ancestors(first)
        .filter(|ancestor| other_chains.iter().all(|chain| chain.contains(ancestor)))
        .find(|&ancestor| is_outermost(tree, ancestor))
        .ok_or(Unresolved::NoExpressionAtLine { line })
}

/// Token nodes never bound an expression. Otherwise a node stops the climb
/// unless it and its parent are both links of a call chain, so `a.b\n.c`
/// resolves to the whole chain.
fn is_outermost(tree: &SyntaxTree, id: NodeId) -> bool {
    let Some(parent) = tree.parent(id) else {
        return true;
    };
    let kind = tree.kind(id);
    if kind.is_token() {
        return false;
    }
    !(kind.is_call_shaped() && tree.kind(parent).is_call_shaped())
}

fn located_line_range(tree: &SyntaxTree, id: NodeId) -> Option<LineRange> {
    let lines = tree
        .descendants(id)
        .into_iter()
        .filter_map(|node| tree.node(node).line);
    let (min, max) = lines.fold(None, |acc: Option<(usize, usize)>, line| match acc {
        None => Some((line, line)),
        Some((min, max)) => Some((min.min(line), max.max(line))),
    })?;
    LineRange::new(min, max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::NodeKind;

    fn syntax(input: &str) -> Syntax {
        Syntax::build(input).expect("should parse")
    }

    fn resolved(input: &str, line: usize) -> (usize, usize) {
        let range = resolve(&syntax(input), line).expect("should resolve");
        (range.start(), range.end())
    }

    #[test]
    fn single_line_statement() {
        assert_eq!(resolved("x = 1\ny = 2\n", 1), (1, 1));
        assert_eq!(resolved("x = 1\ny = 2\n", 2), (2, 2));
    }

    #[test]
    fn leading_dot_chain_is_one_expression() {
        let input = "result = foo\n  .bar\n  .baz\nother\n";
        assert_eq!(resolved(input, 1), (1, 3));
    }

    #[test]
    fn bare_chain_climbs_out_of_call_links() {
        let input = "foo\n  .bar(1)\n  .baz { |x| x }\n";
        assert_eq!(resolved(input, 1), (1, 3));
    }

    #[test]
    fn bracketed_literal_needs_expansion() {
        let input = "x = [\n  1,\n  2\n]\n";
        assert_eq!(resolved(input, 1), (1, 4));
    }

    #[test]
    fn heredoc_argument_reaches_terminator() {
        let input = "expect(<<~EOS).to eq(1)\n  body\nEOS\nnext_thing\n";
        assert_eq!(resolved(input, 1), (1, 3));
    }

    #[test]
    fn do_block_body_lines() {
        // `end` carries no node, so the body's last line bounds the range
        let input = "it(\"works\") do\n  a = 1\n  b = 2\nend\n";
        assert_eq!(resolved(input, 1), (1, 3));
    }

    #[test]
    fn command_without_parens_stops_before_its_block() {
        let input = "it \"works\" do\n  a = 1\nend\n";
        assert_eq!(resolved(input, 1), (1, 1));
    }

    #[test]
    fn brace_block_closer_is_picked_up() {
        let input = "items.each { |item|\n  puts item\n}\n";
        assert_eq!(resolved(input, 1), (1, 3));
    }

    #[test]
    fn keyword_bodies_span_their_clauses() {
        let input = "if ready\n  go\nelse\n  stop\nend\n";
        assert_eq!(resolved(input, 1), (1, 4));
        assert_eq!(resolved("def helper\n  1\nend\n", 1), (1, 2));
    }

    #[test]
    fn modifier_stays_on_its_line() {
        let input = "x = [1] if ok\ny = 2\n";
        assert_eq!(resolved(input, 1), (1, 1));
    }

    #[test]
    fn blank_line_has_no_expression() {
        let err = resolve(&syntax("x = 1\n\ny = 2\n"), 2).unwrap_err();
        assert_eq!(err, Unresolved::NoExpressionAtLine { line: 2 });
    }

    #[test]
    fn line_past_end_has_no_expression() {
        let err = resolve(&syntax("x = 1\n"), 9).unwrap_err();
        assert_eq!(err, Unresolved::NoExpressionAtLine { line: 9 });
    }

    #[test]
    fn syntax_error_surfaces_as_unresolved() {
        let source = SourceFile::from_source("bad.rb", "x = [1,\n");
        let err = resolve_source(&source, 1).unwrap_err();
        assert!(matches!(err, Unresolved::Syntax(_)));
    }

    #[test]
    fn outermost_rule_checks_self_and_parent_only() {
        let s = syntax("foo.bar.baz\n");
        let tree = s.tree();
        let calls: Vec<_> = tree
            .ids()
            .filter(|&id| tree.kind(id) == NodeKind::Call)
            .collect();
        // inner call sits under the outer call
        assert!(!is_outermost(tree, calls[0]));
        // outer call sits under the program
        assert!(is_outermost(tree, calls[1]));
        assert!(is_outermost(tree, tree.root()));
        let ident = s.nodes_on_line(1)[0];
        assert!(!is_outermost(tree, ident));
    }
}
