//! Source files, the line reader, and the path-keyed cache that serves them.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

#[cfg(feature = "syntax")]
use std::sync::OnceLock;

use crate::Error;
use crate::range::LineRange;
#[cfg(feature = "syntax")]
use crate::{
    SyntaxError, lexer,
    parser::parse,
    token::{BracketToken, Token},
    tree::{NodeId, SyntaxTree},
};

/// An immutable source file: its lines and, on demand, its syntax.
#[derive(Debug)]
pub struct SourceFile {
    path: PathBuf,
    #[cfg(feature = "syntax")]
    text: String,
    lines: Vec<String>,
    #[cfg(feature = "syntax")]
    syntax: OnceLock<Result<Syntax, SyntaxError>>,
}

impl SourceFile {
    /// Build a source file from text already in memory.
    #[must_use]
    pub fn from_source(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        let text = text.into();
        let lines = text.lines().map(str::to_string).collect();
        Self {
            path: path.into(),
            #[cfg(feature = "syntax")]
            text,
            lines,
            #[cfg(feature = "syntax")]
            syntax: OnceLock::new(),
        }
    }

    /// Read a source file from disk.
    ///
    /// # Errors
    ///
    /// Returns `Error::NoSuchFile` when `path` is not an existing,
    /// readable UTF-8 file.
    pub fn load(path: &Path) -> Result<Self, Error> {
        match std::fs::read_to_string(path) {
            Ok(text) => Ok(Self::from_source(path, text)),
            Err(err) => {
                tracing::debug!(path = %path.display(), error = %err, "cannot read source");
                Err(Error::NoSuchFile {
                    path: path.to_path_buf(),
                })
            }
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Text of the 1-indexed `line_number`, without its terminator.
    ///
    /// # Errors
    ///
    /// Returns `Error::NoSuchLine` for line 0 or a line past the end.
    pub fn line(&self, line_number: usize) -> Result<&str, Error> {
        line_number
            .checked_sub(1)
            .and_then(|index| self.lines.get(index))
            .map(String::as_str)
            .ok_or_else(|| Error::NoSuchLine {
                path: self.path.clone(),
                line: line_number,
            })
    }

    /// Lines covered by `range`, cut off at the end of the file.
    #[must_use]
    pub fn lines_in(&self, range: LineRange) -> Vec<String> {
        let start = range.start() - 1;
        let end = range.end().min(self.lines.len());
        self.lines
            .get(start..end)
            .map(<[String]>::to_vec)
            .unwrap_or_default()
    }

    /// Tokens and syntax tree, built on first use and kept afterwards.
    ///
    /// # Errors
    ///
    /// Returns the lex or parse error that prevented building the tree.
    #[cfg(feature = "syntax")]
    pub fn syntax(&self) -> Result<&Syntax, &SyntaxError> {
        self.syntax
            .get_or_init(|| Syntax::build(&self.text))
            .as_ref()
    }

    /// Whether [`SourceFile::syntax`] has been built yet.
    #[cfg(feature = "syntax")]
    #[must_use]
    pub fn is_parsed(&self) -> bool {
        self.syntax.get().is_some()
    }
}

/// Token stream and syntax tree of a file, indexed by line.
#[cfg(feature = "syntax")]
#[derive(Debug)]
pub struct Syntax {
    tokens: Vec<Token>,
    tree: SyntaxTree,
    line_count: usize,
    brackets_by_line: HashMap<usize, Vec<BracketToken>>,
    nodes_by_line: HashMap<usize, Vec<NodeId>>,
}

#[cfg(feature = "syntax")]
impl Syntax {
    /// Tokenize and parse `text`.
    ///
    /// # Errors
    ///
    /// Returns `SyntaxError` when the text cannot be tokenized or parsed.
    pub fn build(text: &str) -> Result<Self, SyntaxError> {
        let tokens = lexer::tokenize(text)?;
        let tree = parse(&tokens)?;

        let mut brackets_by_line: HashMap<usize, Vec<BracketToken>> = HashMap::new();
        for (index, token) in tokens.iter().enumerate() {
            if let Some(kind) = token.kind.bracket() {
                brackets_by_line
                    .entry(token.span.line)
                    .or_default()
                    .push(BracketToken {
                        kind,
                        line: token.span.line,
                        index,
                    });
            }
        }

        let mut nodes_by_line: HashMap<usize, Vec<NodeId>> = HashMap::new();
        for id in tree.ids() {
            if let Some(line) = tree.node(id).line {
                nodes_by_line.entry(line).or_default().push(id);
            }
        }

        Ok(Self {
            tokens,
            tree,
            line_count: text.lines().count(),
            brackets_by_line,
            nodes_by_line,
        })
    }

    #[must_use]
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    #[must_use]
    pub const fn tree(&self) -> &SyntaxTree {
        &self.tree
    }

    #[must_use]
    pub const fn line_count(&self) -> usize {
        self.line_count
    }

    /// Bracket-family tokens on `line`, in source order.
    #[must_use]
    pub fn brackets_on_line(&self, line: usize) -> &[BracketToken] {
        self.brackets_by_line.get(&line).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Token nodes located on `line`.
    #[must_use]
    pub fn nodes_on_line(&self, line: usize) -> &[NodeId] {
        self.nodes_by_line.get(&line).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Supplies source files by path.
pub trait SourceProvider {
    /// Return the source file at `path`.
    ///
    /// # Errors
    ///
    /// Returns `Error::NoSuchFile` when `path` does not name a readable file.
    fn source_from_file(&self, path: &Path) -> Result<Arc<SourceFile>, Error>;
}

impl<P: SourceProvider + ?Sized> SourceProvider for Arc<P> {
    fn source_from_file(&self, path: &Path) -> Result<Arc<SourceFile>, Error> {
        (**self).source_from_file(path)
    }
}

impl<P: SourceProvider + ?Sized> SourceProvider for &P {
    fn source_from_file(&self, path: &Path) -> Result<Arc<SourceFile>, Error> {
        (**self).source_from_file(path)
    }
}

/// Loads each path from disk once and shares the result.
///
/// Concurrent misses on the same path may both read the file; the first
/// insert wins and every caller gets that instance.
#[derive(Debug, Default)]
pub struct SourceCache {
    sources: RwLock<HashMap<PathBuf, Arc<SourceFile>>>,
}

impl SourceCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source directly, e.g. one built with
    /// [`SourceFile::from_source`]. An existing entry for the path wins.
    pub fn insert(&self, source: SourceFile) -> Arc<SourceFile> {
        let mut sources = self.sources.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            sources
                .entry(source.path().to_path_buf())
                .or_insert_with(|| Arc::new(source)),
        )
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sources
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SourceProvider for SourceCache {
    fn source_from_file(&self, path: &Path) -> Result<Arc<SourceFile>, Error> {
        if let Some(source) = self
            .sources
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
        {
            return Ok(Arc::clone(source));
        }

        tracing::trace!(path = %path.display(), "source cache miss");
        let loaded = SourceFile::load(path)?;
        Ok(self.insert(loaded))
    }
}
