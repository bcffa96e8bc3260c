use std::ops::Range;

use crate::error::{Error, Result};

/// Half-open range `[start, end)` of independent iterations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IterationDomain {
    start: usize,
    end: usize,
}

impl IterationDomain {
    pub fn new(start: usize, end: usize) -> Result<Self> {
        if start > end {
            return Err(Error::Config(format!(
                "malformed domain: start {start} > end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Domain `[0, n)`.
    pub fn of_len(n: usize) -> Self {
        Self { start: 0, end: n }
    }

    /// Internal constructor for bounds already known to be ordered.
    pub(crate) fn span(start: usize, end: usize) -> Self {
        debug_assert!(start <= end);
        Self { start, end }
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn indices(&self) -> Range<usize> {
        self.start..self.end
    }
}
