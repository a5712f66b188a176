use std::fmt;

use crate::token::{Span, Token, TokenKind};

/// Classifies a lexer error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexErrorKind {
    /// Unterminated quoted string.
    UnterminatedString,
    /// Unterminated heredoc (closing marker never found).
    UnterminatedHeredoc { marker: String },
    /// Heredoc marker is empty (`<<~` followed by a non-identifier).
    EmptyHeredocMarker,
    /// Character that cannot start any token.
    UnexpectedCharacter(char),
}

impl fmt::Display for LexErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnterminatedString => {
                write!(f, "unterminated quoted string")
            }
            Self::UnterminatedHeredoc { marker } => {
                write!(
                    f,
                    "unterminated heredoc, \
                     expected closing marker: {marker}"
                )
            }
            Self::EmptyHeredocMarker => {
                write!(f, "empty heredoc marker")
            }
            Self::UnexpectedCharacter(ch) => {
                write!(f, "unexpected character: {ch}")
            }
        }
    }
}

/// Error produced during lexing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} at line {}, column {}", span.line, span.column)]
pub struct LexError {
    pub kind: LexErrorKind,
    pub span: Span,
}

/// Tokenize source text into a sequence of tokens.
///
/// Heredoc bodies are emitted right after the newline that ends the
/// opener's line, as a `HeredocBody` token followed by a `HeredocEnd`
/// token on the terminator line.
///
/// # Errors
///
/// Returns `LexError` on unterminated strings or heredocs, or bytes that
/// cannot start a token.
pub fn tokenize(input: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(input).tokenize()
}

/// Operators, longest first so that prefixes never shadow them.
const OPERATORS: &[&str] = &[
    "<=>", "===", "**", "==", "!=", "=~", "<=", ">=", "&&", "||", "<<", ">>", "::", "..", "+", "-",
    "*", "/", "%", "<", ">", "!", "&", "^", "~",
];

/// Operators followed by `=` that form an operator assignment.
const ASSIGNING_OPERATORS: &[&str] = &[
    "**", "&&", "||", "<<", ">>", "+", "-", "*", "/", "%", "&", "|", "^",
];

struct PendingHeredoc {
    marker: String,
    /// `<<-` and `<<~` allow an indented terminator.
    indented: bool,
    span: Span,
}

struct Lexer<'a> {
    input: &'a [u8],
    pos: usize,
    line: usize,
    col: usize,
    pending_heredocs: Vec<PendingHeredoc>,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        let bytes = input.as_bytes();
        let start = if bytes.starts_with(&[0xEF, 0xBB, 0xBF]) {
            3
        } else {
            0
        };
        Self {
            input: bytes,
            pos: start,
            line: 1,
            col: 1,
            pending_heredocs: Vec::new(),
        }
    }

    fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();

        while self.pos < self.input.len() {
            let ch = self.input[self.pos];

            match ch {
                b'\n' => {
                    let (span, start) = (self.span(), self.pos);
                    self.advance();
                    tokens.push(self.token(TokenKind::Newline, "\n".to_string(), span, start));
                    self.read_heredoc_bodies(&mut tokens)?;
                }
                b' ' | b'\t' | b'\r' => {
                    self.advance();
                }
                b'#' => {
                    tokens.push(self.read_comment());
                }
                b'\\' if self.peek_at(1) == Some(b'\n') => {
                    // line continuation
                    self.advance(); // skip backslash
                    self.advance(); // skip newline
                }
                b'\\' if self.peek_at(1) == Some(b'\r') && self.peek_at(2) == Some(b'\n') => {
                    self.advance();
                    self.advance();
                    self.advance();
                }
                b'"' | b'\'' => {
                    tokens.push(self.read_quoted_string(ch)?);
                }
                b'0'..=b'9' => {
                    tokens.push(self.read_number());
                }
                b':' if self.peek_at(1).is_some_and(is_ident_start) => {
                    tokens.push(self.read_symbol());
                }
                b'<' if self.at_heredoc_opener() => {
                    tokens.push(self.read_heredoc_opener()?);
                }
                b'@' | b'$' if self.at_sigil_variable() => {
                    tokens.push(self.read_sigil_variable());
                }
                _ if is_ident_start(ch) => {
                    let after_period = tokens.last().is_some_and(|t| t.kind == TokenKind::Period);
                    tokens.push(self.read_word(after_period));
                }
                _ => {
                    tokens.push(self.read_punctuation()?);
                }
            }
        }

        if let Some(pending) = self.pending_heredocs.first() {
            return Err(LexError {
                kind: LexErrorKind::UnterminatedHeredoc {
                    marker: pending.marker.clone(),
                },
                span: pending.span,
            });
        }

        Ok(tokens)
    }

    const fn span(&self) -> Span {
        Span {
            line: self.line,
            column: self.col,
        }
    }

    /// Token covering the bytes from `start` to the current position.
    const fn token(&self, kind: TokenKind, text: String, span: Span, start: usize) -> Token {
        Token {
            kind,
            text,
            span,
            start,
            end: self.pos,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.input.get(self.pos + offset).copied()
    }

    fn advance(&mut self) {
        if self.pos < self.input.len() {
            if self.input[self.pos] == b'\n' {
                self.line += 1;
                self.col = 1;
            } else {
                self.col += 1;
            }
            self.pos += 1;
        }
    }

    fn advance_by(&mut self, count: usize) {
        for _ in 0..count {
            self.advance();
        }
    }

    fn text(&self, start: usize) -> String {
        String::from_utf8_lossy(&self.input[start..self.pos]).into_owned()
    }

    fn current_char(&self) -> char {
        std::str::from_utf8(&self.input[self.pos..])
            .ok()
            .and_then(|rest| rest.chars().next())
            .unwrap_or(char::REPLACEMENT_CHARACTER)
    }

    fn read_comment(&mut self) -> Token {
        let span = self.span();
        let start = self.pos;

        while self.pos < self.input.len() && self.input[self.pos] != b'\n' {
            self.pos += 1;
            self.col += 1;
        }

        self.token(TokenKind::Comment, self.text(start), span, start)
    }

    fn read_quoted_string(&mut self, quote: u8) -> Result<Token, LexError> {
        let span = self.span();
        let start = self.pos;
        self.advance(); // skip opening quote

        let mut value = Vec::new();
        loop {
            match self.peek() {
                None => {
                    return Err(LexError {
                        kind: LexErrorKind::UnterminatedString,
                        span,
                    });
                }
                Some(b'\\') => {
                    self.advance();
                    match self.peek() {
                        Some(b'n') if quote == b'"' => {
                            value.push(b'\n');
                            self.advance();
                        }
                        Some(b't') if quote == b'"' => {
                            value.push(b'\t');
                            self.advance();
                        }
                        Some(c) if c == quote || c == b'\\' => {
                            value.push(c);
                            self.advance();
                        }
                        Some(c) => {
                            value.push(b'\\');
                            value.push(c);
                            self.advance();
                        }
                        None => {
                            value.push(b'\\');
                        }
                    }
                }
                Some(c) if c == quote => {
                    self.advance();
                    break;
                }
                Some(c) => {
                    // strings may span lines
                    value.push(c);
                    self.advance();
                }
            }
        }

        let text = String::from_utf8_lossy(&value).into_owned();
        Ok(self.token(TokenKind::StringLiteral, text, span, start))
    }

    fn read_number(&mut self) -> Token {
        let span = self.span();
        let start = self.pos;
        let mut kind = TokenKind::Integer;

        self.skip_digits();
        // `1.5` is a float, `1.abs` and `1..2` are not
        if self.peek() == Some(b'.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            kind = TokenKind::Float;
            self.advance();
            self.skip_digits();
        }

        self.token(kind, self.text(start), span, start)
    }

    fn skip_digits(&mut self) {
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_digit() || c == b'_')
        {
            self.advance();
        }
    }

    fn read_identifier(&mut self) {
        while self.peek().is_some_and(is_ident_continue) {
            self.advance();
        }
        // predicate and bang method names
        if matches!(self.peek(), Some(b'?' | b'!')) && self.peek_at(1) != Some(b'=') {
            self.advance();
        }
    }

    fn read_symbol(&mut self) -> Token {
        let span = self.span();
        let start = self.pos;
        self.advance(); // skip colon
        let name_start = self.pos;
        self.read_identifier();

        self.token(TokenKind::Symbol, self.text(name_start), span, start)
    }

    /// A word right after a period is a method name even when it spells a
    /// keyword (`x.class`, `.and`).
    fn read_word(&mut self, after_period: bool) -> Token {
        let span = self.span();
        let start = self.pos;
        self.read_identifier();
        let text = self.text(start);

        if self.peek() == Some(b':') && self.peek_at(1) != Some(b':') {
            self.advance();
            return self.token(TokenKind::Label, text, span, start);
        }

        let kind = match text.as_str() {
            _ if text.starts_with(|c: char| c.is_ascii_uppercase()) => TokenKind::Constant,
            _ if after_period => TokenKind::Ident,
            "nil" | "true" | "false" | "self" => TokenKind::Keyword,
            "do" => TokenKind::Do,
            "end" => TokenKind::End,
            "def" | "class" | "module" | "if" | "unless" | "while" | "until" | "case"
            | "begin" => TokenKind::BodyKeyword,
            "elsif" | "else" | "when" | "then" | "rescue" | "ensure" => TokenKind::ClauseKeyword,
            "and" | "or" | "not" => TokenKind::Operator,
            _ => TokenKind::Ident,
        };

        self.token(kind, text, span, start)
    }

    fn at_sigil_variable(&self) -> bool {
        match self.peek_at(1) {
            Some(b'@') => self.peek() == Some(b'@') && self.peek_at(2).is_some_and(is_ident_start),
            Some(c) => is_ident_start(c),
            None => false,
        }
    }

    /// `@ivar`, `@@cvar` and `$global` lex as identifiers.
    fn read_sigil_variable(&mut self) -> Token {
        let span = self.span();
        let start = self.pos;
        while matches!(self.peek(), Some(b'@' | b'$')) {
            self.advance();
        }
        while self.peek().is_some_and(is_ident_continue) {
            self.advance();
        }

        self.token(TokenKind::Ident, self.text(start), span, start)
    }

    fn at_heredoc_opener(&self) -> bool {
        if self.peek_at(1) != Some(b'<') {
            return false;
        }
        let marker_at = if matches!(self.peek_at(2), Some(b'~' | b'-')) {
            3
        } else {
            2
        };
        self.peek_at(marker_at)
            .is_some_and(|c| c == b'\'' || c == b'"' || c == b'_' || c.is_ascii_alphabetic())
    }

    fn read_heredoc_opener(&mut self) -> Result<Token, LexError> {
        let span = self.span();
        let start = self.pos;
        self.advance_by(2); // skip <<

        let indented = matches!(self.peek(), Some(b'~' | b'-'));
        if indented {
            self.advance();
        }

        let quote = match self.peek() {
            Some(q @ (b'\'' | b'"')) => {
                self.advance();
                Some(q)
            }
            _ => None,
        };

        let marker_start = self.pos;
        while self.peek().is_some_and(is_ident_continue) {
            self.advance();
        }
        let marker = self.text(marker_start);

        if let Some(q) = quote {
            if self.peek() != Some(q) {
                return Err(LexError {
                    kind: LexErrorKind::UnterminatedString,
                    span,
                });
            }
            self.advance();
        }

        if marker.is_empty() {
            return Err(LexError {
                kind: LexErrorKind::EmptyHeredocMarker,
                span,
            });
        }

        self.pending_heredocs.push(PendingHeredoc {
            marker: marker.clone(),
            indented,
            span,
        });

        Ok(self.token(TokenKind::HeredocBeg { marker }, self.text(start), span, start))
    }

    /// Consume the bodies of every heredoc opened on the line just ended.
    fn read_heredoc_bodies(&mut self, tokens: &mut Vec<Token>) -> Result<(), LexError> {
        let pending = std::mem::take(&mut self.pending_heredocs);

        for heredoc in pending {
            let body_span = self.span();
            let body_start = self.pos;

            loop {
                if self.pos >= self.input.len() {
                    return Err(LexError {
                        kind: LexErrorKind::UnterminatedHeredoc {
                            marker: heredoc.marker,
                        },
                        span: heredoc.span,
                    });
                }

                let line_start = self.pos;
                let line_span = self.span();
                while self.pos < self.input.len() && self.input[self.pos] != b'\n' {
                    self.pos += 1;
                    self.col += 1;
                }

                let line = String::from_utf8_lossy(&self.input[line_start..self.pos]);
                let line = line.trim_end_matches('\r');
                let candidate = if heredoc.indented {
                    line.trim_start()
                } else {
                    line
                };

                if candidate == heredoc.marker {
                    let body = String::from_utf8_lossy(&self.input[body_start..line_start])
                        .into_owned();
                    tokens.push(Token {
                        kind: TokenKind::HeredocBody,
                        text: body,
                        span: if line_start == body_start {
                            line_span
                        } else {
                            body_span
                        },
                        start: body_start,
                        end: line_start,
                    });
                    tokens.push(Token {
                        kind: TokenKind::HeredocEnd,
                        text: line.to_string(),
                        span: line_span,
                        start: line_start,
                        end: self.pos,
                    });
                    self.advance(); // terminator newline
                    break;
                }

                self.advance();
            }
        }

        Ok(())
    }

    fn read_punctuation(&mut self) -> Result<Token, LexError> {
        let span = self.span();
        let start = self.pos;
        let rest = &self.input[self.pos..];

        let single = |kind: TokenKind, text: &str| (kind, text.to_string(), 1);
        let (kind, text, len) = match rest[0] {
            b'(' => single(TokenKind::LParen, "("),
            b')' => single(TokenKind::RParen, ")"),
            b'[' => single(TokenKind::LBracket, "["),
            b']' => single(TokenKind::RBracket, "]"),
            b'{' => single(TokenKind::LBrace, "{"),
            b'}' => single(TokenKind::RBrace, "}"),
            b',' => single(TokenKind::Comma, ","),
            b';' => single(TokenKind::Semicolon, ";"),
            b'&' if rest.get(1) == Some(&b'.') => (TokenKind::Period, "&.".to_string(), 2),
            b'.' if rest.get(1) != Some(&b'.') => single(TokenKind::Period, "."),
            b'=' if rest.get(1) == Some(&b'>') => (TokenKind::HashRocket, "=>".to_string(), 2),
            b'=' if !matches!(rest.get(1), Some(b'=' | b'~')) => single(TokenKind::Assign, "="),
            b'|' if rest.get(1) != Some(&b'|') && rest.get(1) != Some(&b'=') => {
                single(TokenKind::Pipe, "|")
            }
            _ => match Self::match_operator(rest) {
                Some(token) => token,
                None => {
                    return Err(LexError {
                        kind: LexErrorKind::UnexpectedCharacter(self.current_char()),
                        span,
                    });
                }
            },
        };

        self.advance_by(len);
        Ok(self.token(kind, text, span, start))
    }

    fn match_operator(rest: &[u8]) -> Option<(TokenKind, String, usize)> {
        for op in ASSIGNING_OPERATORS {
            let len = op.len();
            if rest.starts_with(op.as_bytes()) && rest.get(len) == Some(&b'=') {
                return Some((TokenKind::Assign, format!("{op}="), len + 1));
            }
        }
        OPERATORS
            .iter()
            .find(|op| rest.starts_with(op.as_bytes()))
            .map(|op| (TokenKind::Operator, (*op).to_string(), op.len()))
    }
}

const fn is_ident_start(c: u8) -> bool {
    c == b'_' || c.is_ascii_alphabetic() || c >= 0x80
}

const fn is_ident_continue(c: u8) -> bool {
    is_ident_start(c) || c.is_ascii_digit()
}
