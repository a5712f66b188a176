use std::ops::RangeInclusive;

/// Inclusive range of 1-indexed line numbers, `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineRange {
    start: usize,
    end: usize,
}

impl LineRange {
    /// Returns `None` unless `1 <= start <= end`.
    #[must_use]
    pub const fn new(start: usize, end: usize) -> Option<Self> {
        if start == 0 || start > end {
            None
        } else {
            Some(Self { start, end })
        }
    }

    #[must_use]
    pub const fn start(self) -> usize {
        self.start
    }

    #[must_use]
    pub const fn end(self) -> usize {
        self.end
    }

    /// Number of lines covered.
    #[must_use]
    pub const fn len(self) -> usize {
        self.end - self.start + 1
    }

    /// Never true; present for symmetry with `len`.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        false
    }

    #[must_use]
    pub const fn lines(self) -> RangeInclusive<usize> {
        self.start..=self.end
    }

    /// Same start, one more line at the end.
    #[must_use]
    pub const fn grow(self) -> Self {
        Self {
            start: self.start,
            end: self.end + 1,
        }
    }

    /// Truncate to at most `max_line_count` lines, keeping `start`.
    ///
    /// `None` leaves the range untouched; `Some(0)` behaves like `Some(1)`.
    #[must_use]
    pub fn clamp(self, max_line_count: Option<usize>) -> Self {
        let Some(max) = max_line_count else {
            return self;
        };
        let max = max.max(1);
        if self.len() > max {
            Self {
                start: self.start,
                end: self.start + max - 1,
            }
        } else {
            self
        }
    }
}
