/// Source location for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub line: usize,
    pub column: usize,
}

/// Token kinds produced by the lexer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// Lowercase or underscore identifier.
    Ident,
    /// Capitalised identifier.
    Constant,
    /// `nil`, `true`, `false`, `self`.
    Keyword,
    /// `do`, opening a block.
    Do,
    /// `end`, closing a `do` block or a keyword body.
    End,
    /// Keyword opening a body closed by `end`: `def`, `class`, `module`,
    /// `if`, `unless`, `while`, `until`, `case`, `begin`. `if`, `unless`,
    /// `while` and `until` also act as statement modifiers.
    BodyKeyword,
    /// Keyword splitting a body into clauses: `elsif`, `else`, `when`,
    /// `then`, `rescue`, `ensure`.
    ClauseKeyword,
    /// Integer literal.
    Integer,
    /// Float literal.
    Float,
    /// Quoted string (`"..."` or `'...'`), text is the unescaped value.
    StringLiteral,
    /// Symbol (`:name`), text is the name.
    Symbol,
    /// Hash label (`name:`), text is the name.
    Label,
    /// Binary or unary operator.
    Operator,
    /// `=`.
    Assign,
    /// `=>`.
    HashRocket,
    /// `.`.
    Period,
    /// `,`.
    Comma,
    /// `;`.
    Semicolon,
    /// `|`, delimiting block parameters.
    Pipe,
    /// `[`.
    LBracket,
    /// `]`.
    RBracket,
    /// `(`.
    LParen,
    /// `)`.
    RParen,
    /// `{`.
    LBrace,
    /// `}`.
    RBrace,
    /// Heredoc opener (`<<ID`, `<<-ID`, `<<~ID`).
    HeredocBeg { marker: String },
    /// Heredoc body (every line between opener and terminator).
    HeredocBody,
    /// Heredoc terminator line.
    HeredocEnd,
    /// Comment (`# ...`).
    Comment,
    /// Newline (line separator).
    Newline,
}

impl TokenKind {
    /// Bracket family membership, if any.
    #[must_use]
    pub const fn bracket(&self) -> Option<BracketKind> {
        match self {
            Self::LBracket => Some(BracketKind::LBracket),
            Self::RBracket => Some(BracketKind::RBracket),
            Self::LParen => Some(BracketKind::LParen),
            Self::RParen => Some(BracketKind::RParen),
            Self::LBrace => Some(BracketKind::LBrace),
            Self::RBrace => Some(BracketKind::RBrace),
            Self::HeredocBeg { .. } => Some(BracketKind::HeredocBeg),
            Self::HeredocEnd => Some(BracketKind::HeredocEnd),
            _ => None,
        }
    }

    /// Tokens the parser never looks at.
    #[must_use]
    pub const fn is_trivia(&self) -> bool {
        matches!(self, Self::Comment | Self::HeredocBody | Self::HeredocEnd)
    }
}

/// A single token with its kind, text, and source location.
///
/// `text` is the token's value (string contents unescaped, symbols and
/// labels without their colon); `start..end` is the byte range the token
/// occupies in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub span: Span,
    pub start: usize,
    pub end: usize,
}

/// Open and close delimiters tracked for balance.
///
/// Heredocs count as a bracket family: the opener sits on the line of the
/// expression, the terminator possibly many lines later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BracketKind {
    LBracket,
    RBracket,
    LParen,
    RParen,
    LBrace,
    RBrace,
    HeredocBeg,
    HeredocEnd,
}

impl BracketKind {
    /// The delimiter closing this one, or `None` for closers.
    #[must_use]
    pub const fn closer(self) -> Option<Self> {
        match self {
            Self::LBracket => Some(Self::RBracket),
            Self::LParen => Some(Self::RParen),
            Self::LBrace => Some(Self::RBrace),
            Self::HeredocBeg => Some(Self::HeredocEnd),
            Self::RBracket | Self::RParen | Self::RBrace | Self::HeredocEnd => None,
        }
    }

    #[must_use]
    pub const fn is_opener(self) -> bool {
        self.closer().is_some()
    }
}

/// A bracket-family token with its identity in the token stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BracketToken {
    pub kind: BracketKind,
    pub line: usize,
    /// Position in the file's token stream.
    pub index: usize,
}
