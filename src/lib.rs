//! Extract the source lines of the expression starting at a given line.
//!
//! Failure reports want to show "the code that produced this result". A
//! single line is often not enough: the expression may open a bracketed
//! literal, continue as a call chain on following lines, or pass a heredoc.
//! This crate tokenizes and parses the file, finds the outermost expression
//! anchored on the requested line, and returns every line it spans. When
//! that cannot be done the requested line is returned on its own.
//!
//! # Quick start
//!
//! ```
//! use snippet_rs::{SnippetExtractor, SourceFile};
//!
//! let extractor = SnippetExtractor::new();
//! extractor.provider().insert(SourceFile::from_source(
//!     "spec/user_spec.rb",
//!     "result = users\n  .select(&:admin?)\n  .map(&:name)\n",
//! ));
//!
//! let lines = extractor
//!     .extract_expression_lines_at("spec/user_spec.rb", 1, None)
//!     .unwrap();
//! assert_eq!(lines.len(), 3);
//!
//! let first = extractor.extract_line_at("spec/user_spec.rb", 1).unwrap();
//! assert_eq!(first, "result = users");
//! ```
//!
//! ## Bounding the output
//!
//! ```
//! use snippet_rs::{SnippetExtractor, SourceFile};
//!
//! let extractor = SnippetExtractor::new();
//! extractor.provider().insert(SourceFile::from_source(
//!     "list.rb",
//!     "values = [\n  1,\n  2,\n]\n",
//! ));
//!
//! let lines = extractor
//!     .extract_expression_lines_at("list.rb", 1, Some(2))
//!     .unwrap();
//! assert_eq!(lines, vec!["values = [", "  1,"]);
//! ```

// Allow noisy pedantic lints that don't add value for
// a library crate.
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

use std::path::PathBuf;

#[cfg(feature = "syntax")]
pub mod balance;
pub mod extractor;
#[cfg(feature = "syntax")]
pub mod lexer;
#[cfg(feature = "syntax")]
pub mod parser;
pub mod range;
#[cfg(feature = "syntax")]
pub mod resolver;
pub mod source;
#[cfg(feature = "syntax")]
pub mod token;
#[cfg(feature = "syntax")]
pub mod tree;

#[cfg(feature = "syntax")]
pub use balance::{expand, unclosed_brackets};
pub use extractor::SnippetExtractor;
#[cfg(feature = "syntax")]
pub use lexer::{LexError, LexErrorKind, tokenize};
#[cfg(feature = "syntax")]
pub use parser::{ParseError, ParseErrorKind, parse};
pub use range::LineRange;
#[cfg(feature = "syntax")]
pub use resolver::{Unresolved, resolve, resolve_source};
#[cfg(feature = "syntax")]
pub use source::Syntax;
pub use source::{SourceCache, SourceFile, SourceProvider};
#[cfg(feature = "syntax")]
pub use token::{BracketKind, BracketToken, Span, Token, TokenKind};
#[cfg(feature = "syntax")]
pub use tree::{NodeId, NodeKind, SyntaxNode, SyntaxTree};

/// Errors reported to callers: the path or line asked for does not exist.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The path does not name an existing, readable file.
    #[error("no such file: {}", path.display())]
    NoSuchFile { path: PathBuf },
    /// The line number is 0 or past the end of the file.
    #[error("no line {line} in {}", path.display())]
    NoSuchLine { path: PathBuf, line: usize },
}

/// Unified error type covering both lexing and parsing.
#[cfg(feature = "syntax")]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyntaxError {
    /// A lexer error.
    #[error("{0}")]
    Lex(#[from] LexError),
    /// A parser error.
    #[error("{0}")]
    Parse(#[from] ParseError),
}

/// Tokenize and parse a source string in one step.
#[cfg(feature = "syntax")]
pub fn parse_str(input: &str) -> Result<SyntaxTree, SyntaxError> {
    let tokens = tokenize(input)?;
    Ok(parse(&tokens)?)
}
