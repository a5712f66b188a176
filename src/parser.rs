use std::collections::HashSet;
use std::fmt;

use crate::token::{Span, Token, TokenKind};
use crate::tree::{NodeId, NodeKind, SyntaxTree, TreeBuilder};

/// Classifies a parser error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// A token that cannot appear here.
    UnexpectedToken { found: String },
    /// Expected a specific token, found something else or EOF.
    Expected {
        expected: &'static str,
        found: Option<String>,
    },
    /// Input ended in the middle of an expression.
    UnexpectedEof,
    /// Expressions nest deeper than the parser follows.
    NestingTooDeep,
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedToken { found } => {
                write!(f, "unexpected '{found}'")
            }
            Self::Expected {
                expected,
                found: None,
            } => {
                write!(f, "expected '{expected}'")
            }
            Self::Expected {
                expected,
                found: Some(t),
            } => {
                write!(f, "expected '{expected}', got '{t}'")
            }
            Self::UnexpectedEof => {
                write!(f, "unexpected end of input")
            }
            Self::NestingTooDeep => {
                write!(f, "nesting too deep")
            }
        }
    }
}

/// Error produced during parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} at line {}, column {}", span.line, span.column)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub span: Span,
}

/// Parse a token stream into a syntax tree.
///
/// # Errors
///
/// Returns `ParseError` on syntax errors such as unclosed
/// brackets, unexpected tokens, or constructs the grammar does not cover.
pub fn parse(tokens: &[Token]) -> Result<SyntaxTree, ParseError> {
    Parser::new(tokens).parse()
}

/// Deepest nesting of expressions and prefix operators the parser follows.
const MAX_DEPTH: usize = 200;

/// Binding power of binary operators, loosest first.
fn precedence(token: &Token) -> Option<u8> {
    let prec = match token.kind {
        TokenKind::Pipe => 5,
        TokenKind::Operator => match token.text.as_str() {
            "and" | "or" => 0,
            ".." => 1,
            "||" => 2,
            "&&" => 3,
            "<=>" | "==" | "===" | "!=" | "=~" => 4,
            "<" | "<=" | ">" | ">=" => 5,
            "^" => 6,
            "&" => 7,
            "<<" | ">>" => 8,
            "+" | "-" => 9,
            "*" | "/" | "%" => 10,
            "**" => 11,
            "::" => 12,
            _ => return None,
        },
        _ => return None,
    };
    Some(prec)
}

/// Keywords that may follow a statement on its line (`x = 1 if ok`).
fn is_modifier(token: &Token) -> bool {
    match token.kind {
        TokenKind::BodyKeyword => {
            matches!(token.text.as_str(), "if" | "unless" | "while" | "until")
        }
        TokenKind::ClauseKeyword => token.text == "rescue",
        _ => false,
    }
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    last: Option<&'a Token>,
    builder: TreeBuilder,
    /// Indices of `HeredocBody` tokens, in opener order.
    heredoc_bodies: Vec<usize>,
    next_heredoc: usize,
    /// Names assigned so far; a bare identifier among them is a variable.
    locals: HashSet<&'a str>,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        let heredoc_bodies = tokens
            .iter()
            .enumerate()
            .filter(|(_, t)| t.kind == TokenKind::HeredocBody)
            .map(|(i, _)| i)
            .collect();
        Self {
            tokens,
            pos: 0,
            last: None,
            builder: TreeBuilder::default(),
            heredoc_bodies,
            next_heredoc: 0,
            locals: HashSet::new(),
            depth: 0,
        }
    }

    fn parse(mut self) -> Result<SyntaxTree, ParseError> {
        let statements = self.parse_statements()?;
        if let Some(token) = self.peek() {
            return Err(Self::unexpected(token));
        }
        let root = self.builder.branch(NodeKind::Program, statements);
        Ok(self.builder.finish(root))
    }

    // -- Cursor --

    fn peek_index(&self, from: usize) -> Option<usize> {
        (from..self.tokens.len()).find(|&i| !self.tokens[i].kind.is_trivia())
    }

    fn peek(&self) -> Option<&'a Token> {
        self.peek_index(self.pos).map(|i| &self.tokens[i])
    }

    fn peek_kind(&self) -> Option<&'a TokenKind> {
        self.peek().map(|t| &t.kind)
    }

    /// Next token that is neither trivia nor a newline.
    fn peek_past_newlines(&self) -> Option<&'a Token> {
        let mut from = self.pos;
        while let Some(i) = self.peek_index(from) {
            if self.tokens[i].kind != TokenKind::Newline {
                return Some(&self.tokens[i]);
            }
            from = i + 1;
        }
        None
    }

    fn at(&self, kind: &TokenKind) -> bool {
        self.peek_kind() == Some(kind)
    }

    fn bump(&mut self) -> Result<&'a Token, ParseError> {
        let Some(i) = self.peek_index(self.pos) else {
            return Err(ParseError {
                kind: ParseErrorKind::UnexpectedEof,
                span: self.eof_span(),
            });
        };
        let token = &self.tokens[i];
        self.pos = i + 1;
        self.last = Some(token);
        Ok(token)
    }

    fn skip_newlines(&mut self) {
        while self.at(&TokenKind::Newline) {
            self.pos = self.peek_index(self.pos).map_or(self.tokens.len(), |i| i + 1);
        }
    }

    fn skip_separators(&mut self) {
        while matches!(
            self.peek_kind(),
            Some(TokenKind::Newline | TokenKind::Semicolon)
        ) {
            self.pos = self.peek_index(self.pos).map_or(self.tokens.len(), |i| i + 1);
        }
    }

    /// Whether the next token touches the previous one (`foo(` vs `foo (`).
    fn next_is_adjacent(&self) -> bool {
        match (self.last, self.peek()) {
            (Some(last), Some(next)) => last.end == next.start,
            _ => false,
        }
    }

    /// Run `parse` one level deeper, failing past `MAX_DEPTH`.
    fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        if self.depth >= MAX_DEPTH {
            return Err(ParseError {
                kind: ParseErrorKind::NestingTooDeep,
                span: self.peek().map_or_else(|| self.eof_span(), |t| t.span),
            });
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn expect(&mut self, kind: &TokenKind, expected: &'static str) -> Result<(), ParseError> {
        self.skip_newlines();
        match self.peek() {
            None => Err(ParseError {
                kind: ParseErrorKind::Expected {
                    expected,
                    found: None,
                },
                span: self.eof_span(),
            }),
            Some(token) if &token.kind != kind => Err(ParseError {
                kind: ParseErrorKind::Expected {
                    expected,
                    found: Some(token.text.clone()),
                },
                span: token.span,
            }),
            Some(_) => {
                self.bump()?;
                Ok(())
            }
        }
    }

    fn unexpected(token: &Token) -> ParseError {
        ParseError {
            kind: ParseErrorKind::UnexpectedToken {
                found: token.text.clone(),
            },
            span: token.span,
        }
    }

    fn eof_span(&self) -> Span {
        self.tokens
            .last()
            .map_or(Span { line: 1, column: 1 }, |last| last.span)
    }

    // -- Statements --

    fn parse_statements(&mut self) -> Result<Vec<NodeId>, ParseError> {
        let mut statements = Vec::new();

        loop {
            self.skip_separators();
            match self.peek_kind() {
                None
                | Some(
                    TokenKind::RBrace
                    | TokenKind::RParen
                    | TokenKind::End
                    | TokenKind::ClauseKeyword,
                ) => break,
                Some(_) => {}
            }

            let statement = self.parse_expression(false)?;
            statements.push(self.parse_modifiers(statement)?);

            match self.peek() {
                None => break,
                Some(token) => match token.kind {
                    TokenKind::Newline
                    | TokenKind::Semicolon
                    | TokenKind::RBrace
                    | TokenKind::RParen
                    | TokenKind::End
                    | TokenKind::ClauseKeyword => {}
                    _ => return Err(Self::unexpected(token)),
                },
            }
        }

        Ok(statements)
    }

    fn parse_modifiers(&mut self, mut statement: NodeId) -> Result<NodeId, ParseError> {
        while let Some(keyword) = self.peek().filter(|t| is_modifier(t)) {
            self.bump()?;
            let kw = self.builder.token(NodeKind::Kw, keyword.span.line);
            self.skip_newlines();
            let condition = self.parse_expression(false)?;
            let children = vec![statement, kw, condition];
            statement = self.builder.branch(NodeKind::Modifier, children);
        }
        Ok(statement)
    }

    /// Statement lists split by clause keywords, up to the closing `end`.
    fn parse_body(&mut self, children: &mut Vec<NodeId>) -> Result<(), ParseError> {
        loop {
            let statements = self.parse_statements()?;
            children.push(self.builder.branch(NodeKind::Statements, statements));
            if !self.at(&TokenKind::ClauseKeyword) {
                break;
            }
            let keyword = self.bump()?;
            children.push(self.parse_clause(keyword)?);
        }
        self.expect(&TokenKind::End, "end")
    }

    /// A clause keyword and its head: `elsif cond`, `when a, b`,
    /// `rescue Error => e`.
    fn parse_clause(&mut self, keyword: &'a Token) -> Result<NodeId, ParseError> {
        let mut children = vec![self.builder.token(NodeKind::Kw, keyword.span.line)];

        match keyword.text.as_str() {
            "elsif" | "when" => self.parse_clause_values(&mut children)?,
            "rescue" => {
                if !matches!(
                    self.peek_kind(),
                    None | Some(
                        TokenKind::Newline
                            | TokenKind::Semicolon
                            | TokenKind::HashRocket
                            | TokenKind::ClauseKeyword
                    )
                ) {
                    self.parse_clause_values(&mut children)?;
                }
                if self.at(&TokenKind::HashRocket) {
                    self.bump()?;
                    let name = self.bump()?;
                    if name.kind != TokenKind::Ident {
                        return Err(Self::unexpected(name));
                    }
                    self.locals.insert(name.text.as_str());
                    let ident = self.builder.token(NodeKind::Ident, name.span.line);
                    children.push(self.builder.branch(NodeKind::VarField, vec![ident]));
                }
            }
            _ => {}
        }

        if self
            .peek()
            .is_some_and(|t| t.kind == TokenKind::ClauseKeyword && t.text == "then")
        {
            self.bump()?;
        }
        Ok(self.builder.branch(NodeKind::Clause, children))
    }

    fn parse_clause_values(&mut self, children: &mut Vec<NodeId>) -> Result<(), ParseError> {
        children.push(self.parse_expression(true)?);
        while self.at(&TokenKind::Comma) {
            self.bump()?;
            self.skip_newlines();
            children.push(self.parse_expression(true)?);
        }
        Ok(())
    }

    /// `no_do` is set while reading unparenthesised command arguments,
    /// where a `do` block belongs to the command rather than the argument.
    fn parse_expression(&mut self, no_do: bool) -> Result<NodeId, ParseError> {
        self.nested(|parser| parser.parse_assignment(no_do))
    }

    fn parse_assignment(&mut self, no_do: bool) -> Result<NodeId, ParseError> {
        let target = self.parse_binary(0, no_do)?;

        let Some(token) = self.peek() else {
            return Ok(target);
        };
        if token.kind != TokenKind::Assign {
            return Ok(target);
        }

        let target_kind = self.builder.kind(target);
        if matches!(target_kind, NodeKind::VCall | NodeKind::VarRef) {
            self.builder.retag(target, NodeKind::VarField);
            if let Some(last) = self.last {
                self.locals.insert(last.text.as_str());
            }
        } else if !matches!(target_kind, NodeKind::Call | NodeKind::Aref) {
            return Err(Self::unexpected(token));
        }

        let op = self.bump()?;
        self.skip_newlines();
        let value = self.parse_expression(no_do)?;
        let kind = if op.text == "=" {
            NodeKind::Assign
        } else {
            NodeKind::OpAssign
        };
        Ok(self.builder.branch(kind, vec![target, value]))
    }

    fn parse_binary(&mut self, min_prec: u8, no_do: bool) -> Result<NodeId, ParseError> {
        let mut left = self.parse_unary(no_do)?;

        while let Some(prec) = self.peek().and_then(precedence) {
            if prec < min_prec {
                break;
            }
            self.bump()?;
            self.skip_newlines();
            let right = self.parse_binary(prec + 1, no_do)?;
            left = self.builder.branch(NodeKind::Binary, vec![left, right]);
        }

        Ok(left)
    }

    fn parse_unary(&mut self, no_do: bool) -> Result<NodeId, ParseError> {
        self.nested(|parser| parser.parse_prefixed(no_do))
    }

    fn parse_prefixed(&mut self, no_do: bool) -> Result<NodeId, ParseError> {
        let is_prefix = self.peek().is_some_and(|t| {
            t.kind == TokenKind::Operator
                && matches!(
                    t.text.as_str(),
                    "!" | "-" | "+" | "~" | "&" | "*" | "**" | "not"
                )
        });
        if is_prefix {
            self.bump()?;
            let operand = self.parse_unary(no_do)?;
            return Ok(self.builder.branch(NodeKind::Unary, vec![operand]));
        }
        self.parse_postfix(no_do)
    }

    // -- Calls --

    fn parse_postfix(&mut self, no_do: bool) -> Result<NodeId, ParseError> {
        let mut node = self.parse_primary(no_do)?;

        loop {
            if self
                .peek_past_newlines()
                .is_some_and(|t| t.kind == TokenKind::Period)
            {
                node = self.parse_method_call(node, no_do)?;
            } else if self.at(&TokenKind::LBracket) && self.next_is_adjacent() {
                self.bump()?;
                let args = self.parse_arg_list(&TokenKind::RBracket)?;
                self.expect(&TokenKind::RBracket, "]")?;
                node = self.builder.branch(NodeKind::Aref, vec![node, args]);
            } else {
                break;
            }
        }

        Ok(node)
    }

    /// `receiver . name [args] [block]`, the period possibly on a later line.
    fn parse_method_call(&mut self, receiver: NodeId, no_do: bool) -> Result<NodeId, ParseError> {
        self.skip_newlines();
        let period = self.bump()?;
        let period = self.builder.token(NodeKind::Period, period.span.line);
        self.skip_newlines();

        let name = self.bump()?;
        if !matches!(
            name.kind,
            TokenKind::Ident | TokenKind::Constant | TokenKind::Keyword
        ) {
            return Err(Self::unexpected(name));
        }
        let name_kind = if name.kind == TokenKind::Constant {
            NodeKind::Const
        } else {
            NodeKind::Ident
        };
        let name = self.builder.token(name_kind, name.span.line);

        let node = if self.at(&TokenKind::LParen) {
            let call = self.builder.branch(NodeKind::Call, vec![receiver, period, name]);
            let args = self.parse_paren_args()?;
            self.builder.branch(NodeKind::MethodAddArg, vec![call, args])
        } else if self.at_command_argument() {
            let args = self.parse_command_args()?;
            self.builder
                .branch(NodeKind::CommandCall, vec![receiver, period, name, args])
        } else {
            self.builder.branch(NodeKind::Call, vec![receiver, period, name])
        };

        self.attach_block(node, no_do)
    }

    fn attach_block(&mut self, call: NodeId, no_do: bool) -> Result<NodeId, ParseError> {
        let block = match self.peek_kind() {
            Some(TokenKind::LBrace) => self.parse_block(&TokenKind::RBrace, "}")?,
            Some(TokenKind::Do) if !no_do => self.parse_block(&TokenKind::End, "end")?,
            _ => return Ok(call),
        };
        Ok(self.builder.branch(NodeKind::MethodAddBlock, vec![call, block]))
    }

    fn parse_block(
        &mut self,
        close: &TokenKind,
        expected: &'static str,
    ) -> Result<NodeId, ParseError> {
        let kind = if self.bump()?.kind == TokenKind::Do {
            NodeKind::DoBlock
        } else {
            NodeKind::BraceBlock
        };

        let mut children = Vec::new();
        if self.at(&TokenKind::Pipe) {
            children.push(self.parse_block_params()?);
        }
        if kind == NodeKind::DoBlock {
            self.parse_body(&mut children)?;
        } else {
            let statements = self.parse_statements()?;
            children.push(self.builder.branch(NodeKind::Statements, statements));
            self.expect(close, expected)?;
        }

        Ok(self.builder.branch(kind, children))
    }

    fn parse_block_params(&mut self) -> Result<NodeId, ParseError> {
        self.bump()?; // opening pipe
        let mut params = Vec::new();

        loop {
            let token = self.bump()?;
            match token.kind {
                TokenKind::Pipe => break,
                TokenKind::Comma if !params.is_empty() => {}
                TokenKind::Ident => {
                    self.locals.insert(token.text.as_str());
                    params.push(self.builder.token(NodeKind::Ident, token.span.line));
                }
                _ => return Err(Self::unexpected(token)),
            }
        }

        Ok(self.builder.branch(NodeKind::BlockParams, params))
    }

    /// Whether the next token can start an unparenthesised argument.
    fn at_command_argument(&self) -> bool {
        let Some(token) = self.peek() else {
            return false;
        };
        match token.kind {
            TokenKind::Ident
            | TokenKind::Constant
            | TokenKind::Keyword
            | TokenKind::Integer
            | TokenKind::Float
            | TokenKind::StringLiteral
            | TokenKind::Symbol
            | TokenKind::Label
            | TokenKind::HeredocBeg { .. } => true,
            // `private def name`
            TokenKind::BodyKeyword => token.text == "def",
            TokenKind::LBracket | TokenKind::LParen => !self.next_is_adjacent(),
            _ => false,
        }
    }

    fn parse_command_args(&mut self) -> Result<NodeId, ParseError> {
        let mut args = vec![self.parse_argument(true)?];
        while self.at(&TokenKind::Comma) {
            self.bump()?;
            self.skip_newlines();
            args.push(self.parse_argument(true)?);
        }
        Ok(self.builder.branch(NodeKind::Args, args))
    }

    fn parse_paren_args(&mut self) -> Result<NodeId, ParseError> {
        self.bump()?; // (
        let args = self.parse_arg_list(&TokenKind::RParen)?;
        self.expect(&TokenKind::RParen, ")")?;
        Ok(self.builder.branch(NodeKind::ArgParen, vec![args]))
    }

    /// Comma separated arguments up to (not including) `close`.
    fn parse_arg_list(&mut self, close: &TokenKind) -> Result<NodeId, ParseError> {
        let mut args = Vec::new();

        loop {
            self.skip_newlines();
            if self.peek_kind().is_none_or(|kind| kind == close) {
                break;
            }
            args.push(self.parse_argument(false)?);
            self.skip_newlines();
            if !self.at(&TokenKind::Comma) {
                break;
            }
            self.bump()?;
        }

        Ok(self.builder.branch(NodeKind::Args, args))
    }

    /// A single argument; trailing `key: value` pairs fold into one hash.
    fn parse_argument(&mut self, no_do: bool) -> Result<NodeId, ParseError> {
        let first = if self.at(&TokenKind::Label) {
            self.parse_assoc(no_do)?
        } else {
            let value = self.parse_expression(no_do)?;
            if !self.at(&TokenKind::HashRocket) {
                return Ok(value);
            }
            self.bump()?;
            self.finish_assoc(value, no_do)?
        };

        let mut entries = vec![first];
        while self.at(&TokenKind::Comma)
            && self
                .token_after_comma()
                .is_some_and(|t| t.kind == TokenKind::Label)
        {
            self.bump()?;
            self.skip_newlines();
            entries.push(self.parse_assoc(no_do)?);
        }
        Ok(self.builder.branch(NodeKind::BareAssocHash, entries))
    }

    fn token_after_comma(&self) -> Option<&'a Token> {
        let comma = self.peek_index(self.pos)?;
        let mut from = comma + 1;
        loop {
            let i = self.peek_index(from)?;
            if self.tokens[i].kind != TokenKind::Newline {
                return Some(&self.tokens[i]);
            }
            from = i + 1;
        }
    }

    fn parse_assoc(&mut self, no_do: bool) -> Result<NodeId, ParseError> {
        if self.at(&TokenKind::Label) {
            let label = self.bump()?;
            let key = self.builder.token(NodeKind::Label, label.span.line);
            return self.finish_assoc(key, no_do);
        }
        let key = self.parse_expression(no_do)?;
        self.expect(&TokenKind::HashRocket, "=>")?;
        self.finish_assoc(key, no_do)
    }

    /// Value half of an entry whose key and separator are consumed.
    fn finish_assoc(&mut self, key: NodeId, no_do: bool) -> Result<NodeId, ParseError> {
        self.skip_newlines();
        let value = self.parse_expression(no_do)?;
        Ok(self.builder.branch(NodeKind::Assoc, vec![key, value]))
    }

    // -- Primaries --

    fn parse_primary(&mut self, no_do: bool) -> Result<NodeId, ParseError> {
        let token = self.bump()?;
        let line = token.span.line;

        match &token.kind {
            TokenKind::Integer => Ok(self.builder.token(NodeKind::Int, line)),
            TokenKind::Float => Ok(self.builder.token(NodeKind::Float, line)),
            TokenKind::StringLiteral => {
                let mut children = Vec::new();
                if !token.text.is_empty() {
                    children.push(self.builder.token(NodeKind::TStringContent, line));
                }
                Ok(self.builder.branch(NodeKind::StringLiteral, children))
            }
            TokenKind::HeredocBeg { marker } => self.parse_heredoc(token, marker),
            TokenKind::Symbol => {
                let name = self.builder.token(NodeKind::Ident, line);
                Ok(self.builder.branch(NodeKind::SymbolLiteral, vec![name]))
            }
            TokenKind::Keyword => {
                let kw = self.builder.token(NodeKind::Kw, line);
                Ok(self.builder.branch(NodeKind::VarRef, vec![kw]))
            }
            TokenKind::Constant => {
                let name = self.builder.token(NodeKind::Const, line);
                if self.at(&TokenKind::LParen) && self.next_is_adjacent() {
                    return self.parse_fcall_with_args(name, no_do);
                }
                Ok(self.builder.branch(NodeKind::VarRef, vec![name]))
            }
            TokenKind::Ident => self.parse_identifier(token, no_do),
            TokenKind::LBracket => {
                let elements = self.parse_arg_list(&TokenKind::RBracket)?;
                self.expect(&TokenKind::RBracket, "]")?;
                Ok(self.builder.branch(NodeKind::Array, vec![elements]))
            }
            TokenKind::LBrace => self.parse_hash(),
            TokenKind::BodyKeyword => self.parse_keyword_body(token),
            TokenKind::LParen => {
                let statements = self.parse_statements()?;
                let body = self.builder.branch(NodeKind::Statements, statements);
                self.expect(&TokenKind::RParen, ")")?;
                Ok(self.builder.branch(NodeKind::Paren, vec![body]))
            }
            _ => Err(Self::unexpected(token)),
        }
    }

    fn parse_identifier(&mut self, token: &'a Token, no_do: bool) -> Result<NodeId, ParseError> {
        let name = self.builder.token(NodeKind::Ident, token.span.line);

        if self.at(&TokenKind::LParen) && self.next_is_adjacent() {
            return self.parse_fcall_with_args(name, no_do);
        }
        if self.locals.contains(token.text.as_str()) {
            return Ok(self.builder.branch(NodeKind::VarRef, vec![name]));
        }
        match self.peek_kind() {
            Some(TokenKind::LBrace) => {
                let fcall = self.builder.branch(NodeKind::FCall, vec![name]);
                self.attach_block(fcall, no_do)
            }
            Some(TokenKind::Do) if !no_do => {
                let fcall = self.builder.branch(NodeKind::FCall, vec![name]);
                self.attach_block(fcall, no_do)
            }
            _ if self.at_command_argument() => {
                let args = self.parse_command_args()?;
                let command = self.builder.branch(NodeKind::Command, vec![name, args]);
                self.attach_block(command, no_do)
            }
            _ => Ok(self.builder.branch(NodeKind::VCall, vec![name])),
        }
    }

    fn parse_fcall_with_args(&mut self, name: NodeId, no_do: bool) -> Result<NodeId, ParseError> {
        let fcall = self.builder.branch(NodeKind::FCall, vec![name]);
        let args = self.parse_paren_args()?;
        let call = self.builder.branch(NodeKind::MethodAddArg, vec![fcall, args]);
        self.attach_block(call, no_do)
    }

    /// `def`, `class`, `module`, `if`, `unless`, `while`, `until`, `case`
    /// or `begin` through its `end`.
    fn parse_keyword_body(&mut self, keyword: &'a Token) -> Result<NodeId, ParseError> {
        let kind = match keyword.text.as_str() {
            "def" => NodeKind::Def,
            "class" => NodeKind::Class,
            "module" => NodeKind::Module,
            "if" => NodeKind::If,
            "unless" => NodeKind::Unless,
            "while" => NodeKind::While,
            "until" => NodeKind::Until,
            "case" => NodeKind::Case,
            "begin" => NodeKind::Begin,
            _ => return Err(Self::unexpected(keyword)),
        };
        let mut children = vec![self.builder.token(NodeKind::Kw, keyword.span.line)];

        match kind {
            NodeKind::Def => {
                // method name, possibly `self.name`
                self.bump()?;
                if self.at(&TokenKind::Period) {
                    self.bump()?;
                    self.bump()?;
                }
                self.skip_header();
            }
            NodeKind::Class | NodeKind::Module => self.skip_header(),
            NodeKind::If | NodeKind::Unless | NodeKind::While | NodeKind::Until => {
                children.push(self.parse_expression(true)?);
                let opens_body = self.peek().is_some_and(|t| {
                    t.kind == TokenKind::Do
                        || (t.kind == TokenKind::ClauseKeyword && t.text == "then")
                });
                if opens_body {
                    self.bump()?;
                }
            }
            NodeKind::Case => {
                if !matches!(
                    self.peek_kind(),
                    None | Some(TokenKind::Newline | TokenKind::Semicolon)
                ) {
                    children.push(self.parse_expression(true)?);
                }
            }
            _ => {}
        }

        self.parse_body(&mut children)?;
        Ok(self.builder.branch(kind, children))
    }

    /// Skip a definition header to the end of its line. Parameter names
    /// become locals.
    fn skip_header(&mut self) {
        let mut depth = 0usize;
        loop {
            let Some(token) = self.peek() else {
                return;
            };
            match token.kind {
                TokenKind::Newline | TokenKind::Semicolon if depth == 0 => return,
                TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace => depth += 1,
                TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace => {
                    depth = depth.saturating_sub(1);
                }
                TokenKind::Ident => {
                    self.locals.insert(token.text.as_str());
                }
                TokenKind::HeredocBeg { .. } => self.next_heredoc += 1,
                _ => {}
            }
            self.pos = self.peek_index(self.pos).map_or(self.tokens.len(), |i| i + 1);
            self.last = Some(token);
        }
    }

    fn parse_hash(&mut self) -> Result<NodeId, ParseError> {
        let mut entries = Vec::new();

        loop {
            self.skip_newlines();
            if self.peek_kind().is_none_or(|kind| kind == &TokenKind::RBrace) {
                break;
            }
            entries.push(self.parse_assoc(false)?);
            self.skip_newlines();
            if !self.at(&TokenKind::Comma) {
                break;
            }
            self.bump()?;
        }

        self.expect(&TokenKind::RBrace, "}")?;
        Ok(self.builder.branch(NodeKind::Hash, entries))
    }

    /// The body was lexed after the opener's line; pair them up in order
    /// and check the terminator names the opener's marker.
    fn parse_heredoc(&mut self, opener: &Token, marker: &str) -> Result<NodeId, ParseError> {
        let Some(&body_index) = self.heredoc_bodies.get(self.next_heredoc) else {
            return Err(Self::unexpected(opener));
        };
        self.next_heredoc += 1;

        let tokens = self.tokens;
        let terminator = tokens
            .get(body_index + 1)
            .filter(|t| t.kind == TokenKind::HeredocEnd);
        if terminator.is_none_or(|t| t.text.trim() != marker) {
            return Err(ParseError {
                kind: ParseErrorKind::Expected {
                    expected: "heredoc terminator",
                    found: terminator.map(|t| t.text.trim().to_string()),
                },
                span: opener.span,
            });
        }

        let body = &tokens[body_index];
        let mut children = Vec::new();
        if !body.text.is_empty() {
            children.push(self.builder.token(NodeKind::TStringContent, body.span.line));
        }
        Ok(self.builder.branch(NodeKind::Heredoc, children))
    }
}
