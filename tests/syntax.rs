//! Public syntax API: tokenizing, parsing, and resolving expression ranges.
#![cfg(feature = "syntax")]

use snippet_rs::{
    BracketKind, LexErrorKind, LineRange, NodeKind, ParseError, ParseErrorKind, SourceFile, Syntax,
    SyntaxError, Unresolved, expand, parse_str, resolve, resolve_source, tokenize,
    unclosed_brackets,
};

fn range(start: usize, end: usize) -> LineRange {
    LineRange::new(start, end).expect("valid range")
}

// -- Parsing --

#[test]
fn parse_str_builds_program_root() {
    let tree = parse_str("describe Foo do\n  it { ok }\nend\n").expect("parse failed");
    assert_eq!(tree.kind(tree.root()), NodeKind::Program);
    assert!(tree.parent(tree.root()).is_none());
    assert!(!tree.is_empty());
}

#[test]
fn every_node_but_root_has_a_parent() {
    let tree = parse_str("a = foo(1, b: [2, 3]) { |x| x * 2 }\n").expect("parse failed");
    for id in tree.ids() {
        if id != tree.root() {
            let parent = tree.parent(id).expect("non-root node has a parent");
            assert!(tree.node(parent).children().contains(&id));
        }
    }
}

#[test]
fn only_token_nodes_carry_lines() {
    let tree = parse_str("x = [\n  1,\n  'two'\n]\n").expect("parse failed");
    for id in tree.ids() {
        let node = tree.node(id);
        assert_eq!(node.line.is_some(), node.kind.is_token(), "{:?}", node.kind);
    }
}

#[test]
fn lex_error_through_parse_str() {
    let err = parse_str("x = \"open\n").unwrap_err();
    assert!(matches!(
        err,
        SyntaxError::Lex(ref e) if e.kind == LexErrorKind::UnterminatedString
    ));
}

#[test]
fn parse_error_through_parse_str() {
    let err = parse_str("foo(1, 2\n").unwrap_err();
    assert!(matches!(
        err,
        SyntaxError::Parse(ParseError {
            kind: ParseErrorKind::Expected { expected: ")", .. },
            ..
        })
    ));
}

#[test]
fn error_display_includes_position() {
    let err = parse_str("a = `b`\n").unwrap_err();
    assert_eq!(
        err.to_string(),
        "unexpected character: ` at line 1, column 5"
    );
}

#[test]
fn unterminated_heredoc_is_a_lex_error() {
    let err = tokenize("x = <<~EOS\n  body\n").unwrap_err();
    assert!(matches!(
        err.kind,
        LexErrorKind::UnterminatedHeredoc { ref marker } if marker == "EOS"
    ));
}

// -- Brackets --

#[test]
fn unclosed_brackets_in_order() {
    let syntax = Syntax::build("foo([\n  {\n    a: 1\n  }\n])\n").expect("parse failed");
    let kinds: Vec<_> = unclosed_brackets(&syntax, range(1, 2))
        .iter()
        .map(|b| b.kind)
        .collect();
    assert_eq!(
        kinds,
        vec![BracketKind::LParen, BracketKind::LBracket, BracketKind::LBrace]
    );
    assert_eq!(expand(&syntax, range(1, 1)), range(1, 5));
}

#[test]
fn heredoc_terminator_on_last_line() {
    let syntax = Syntax::build("x = <<~EOS\n  a\nEOS").expect("parse failed");
    assert_eq!(expand(&syntax, range(1, 1)), range(1, 3));
}

// -- Resolution --

#[test]
fn resolve_chain_with_blocks() {
    let syntax = Syntax::build(
        "expect(items)\n  .to all(be_a(Item))\n  .and have_attributes(size: 2)\nnext_line\n",
    )
    .expect("parse failed");
    assert_eq!(resolve(&syntax, 1).expect("resolve"), range(1, 3));
    assert_eq!(resolve(&syntax, 4).expect("resolve"), range(4, 4));
}

#[test]
fn resolve_inner_line_of_array() {
    // the element is its own expression
    let syntax = Syntax::build("x = [\n  foo(1),\n  2\n]\n").expect("parse failed");
    assert_eq!(resolve(&syntax, 2).expect("resolve"), range(2, 2));
}

#[test]
fn resolve_source_reports_syntax_error() {
    let source = SourceFile::from_source("bad.rb", "x = (1\n");
    assert!(matches!(
        resolve_source(&source, 1),
        Err(Unresolved::Syntax(SyntaxError::Parse(_)))
    ));
}

#[test]
fn resolve_reports_empty_line() {
    let syntax = Syntax::build("a = 1\n# note\nb = 2\n").expect("parse failed");
    assert_eq!(
        resolve(&syntax, 2),
        Err(Unresolved::NoExpressionAtLine { line: 2 })
    );
    assert_eq!(
        Unresolved::NoExpressionAtLine { line: 2 }.to_string(),
        "no expression at line 2"
    );
}
