//! Source location tracking

/// A span represents a range in one source file.
///
/// `file_id` ties the span (and any identifier carrying it) back to the
/// file whose top-level scope it was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    /// Start char offset
    pub start: usize,
    /// End char offset (exclusive)
    pub end: usize,
    /// File ID, unique per resolver instance
    pub file_id: usize,
}

impl Span {
    pub fn new(start: usize, end: usize, file_id: usize) -> Self {
        Self { start, end, file_id }
    }

    /// Create a dummy span (for testing)
    pub fn dummy() -> Self {
        Self { start: 0, end: 0, file_id: 0 }
    }

    /// Merge two spans
    pub fn merge(&self, other: &Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
            file_id: self.file_id,
        }
    }

    /// 1-based line and column of `start` within `source`.
    pub fn line_col(&self, source: &str) -> (usize, usize) {
        let mut line = 1;
        let mut col = 1;
        for c in source.chars().take(self.start) {
            if c == '\n' {
                line += 1;
                col = 1;
            } else {
                col += 1;
            }
        }
        (line, col)
    }
}

impl Default for Span {
    fn default() -> Self {
        Self::dummy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_col() {
        let src = "package a\n\ntype X int\n";
        assert_eq!(Span::new(0, 1, 0).line_col(src), (1, 1));
        assert_eq!(Span::new(11, 15, 0).line_col(src), (3, 1));
        assert_eq!(Span::new(16, 17, 0).line_col(src), (3, 6));
    }
}
