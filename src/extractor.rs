use std::path::Path;

use crate::Error;
use crate::source::{SourceCache, SourceProvider};
#[cfg(feature = "syntax")]
use crate::{resolver, source::SourceFile};

/// Entry point: extracts a line, or the lines of the expression starting
/// at a line, from files served by a [`SourceProvider`].
#[derive(Debug, Default)]
pub struct SnippetExtractor<P = SourceCache> {
    provider: P,
}

impl SnippetExtractor<SourceCache> {
    /// Extractor backed by a fresh [`SourceCache`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl<P: SourceProvider> SnippetExtractor<P> {
    #[must_use]
    pub const fn with_provider(provider: P) -> Self {
        Self { provider }
    }

    #[must_use]
    pub const fn provider(&self) -> &P {
        &self.provider
    }

    /// Text of line `line_number` (1-indexed) of `path`.
    ///
    /// # Errors
    ///
    /// Returns `Error::NoSuchFile` for an unreadable path and
    /// `Error::NoSuchLine` for a line outside the file.
    pub fn extract_line_at(
        &self,
        path: impl AsRef<Path>,
        line_number: usize,
    ) -> Result<String, Error> {
        let source = self.provider.source_from_file(path.as_ref())?;
        source.line(line_number).map(str::to_string)
    }

    /// Lines of the expression starting at `beginning_line`, at most
    /// `max_line_count` of them.
    ///
    /// Whenever the expression's extent cannot be determined (the file
    /// does not parse, or nothing anchors the line) this returns the single
    /// line at `beginning_line` instead.
    ///
    /// # Errors
    ///
    /// Returns `Error::NoSuchFile` for an unreadable path and
    /// `Error::NoSuchLine` for a line outside the file.
    #[cfg(feature = "syntax")]
    pub fn extract_expression_lines_at(
        &self,
        path: impl AsRef<Path>,
        beginning_line: usize,
        max_line_count: Option<usize>,
    ) -> Result<Vec<String>, Error> {
        let path = path.as_ref();
        if matches!(max_line_count, Some(0 | 1)) {
            return Ok(vec![self.extract_line_at(path, beginning_line)?]);
        }

        let source = self.provider.source_from_file(path)?;
        match Self::expression_lines(&source, beginning_line, max_line_count) {
            Ok(lines) => Ok(lines),
            Err(reason) => {
                tracing::debug!(
                    path = %path.display(),
                    line = beginning_line,
                    %reason,
                    "falling back to single line"
                );
                Ok(vec![source.line(beginning_line)?.to_string()])
            }
        }
    }

    /// Without a parser backend every extraction is a single line.
    ///
    /// # Errors
    ///
    /// Returns `Error::NoSuchFile` for an unreadable path and
    /// `Error::NoSuchLine` for a line outside the file.
    #[cfg(not(feature = "syntax"))]
    pub fn extract_expression_lines_at(
        &self,
        path: impl AsRef<Path>,
        beginning_line: usize,
        _max_line_count: Option<usize>,
    ) -> Result<Vec<String>, Error> {
        Ok(vec![self.extract_line_at(path, beginning_line)?])
    }

    #[cfg(feature = "syntax")]
    fn expression_lines(
        source: &SourceFile,
        beginning_line: usize,
        max_line_count: Option<usize>,
    ) -> Result<Vec<String>, resolver::Unresolved> {
        let range = resolver::resolve_source(source, beginning_line)?.clamp(max_line_count);
        Ok(source.lines_in(range))
    }
}
