/// Position tracking for metadata rules, document elements and diagnostics.
///
/// Stores the source location (line/column) of override rules and
/// introspection elements for error reporting and dead-rule warnings.
use std::fmt;
use std::sync::Arc;

/// A span representing a range in source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

/// A position in source text (1-indexed line, 0-indexed column).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Span {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Create a span from line/column coordinates
    pub fn from_coords(
        start_line: usize,
        start_col: usize,
        end_line: usize,
        end_col: usize,
    ) -> Self {
        Self {
            start: Position::new(start_line, start_col),
            end: Position::new(end_line, end_col),
        }
    }

    /// A zero-width span at a single position.
    pub fn point(line: usize, column: usize) -> Self {
        let p = Position::new(line, column);
        Self { start: p, end: p }
    }
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// A position inside a named source: an override file or an
/// introspection document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceRef {
    pub file: Arc<str>,
    pub span: Span,
}

impl SourceRef {
    pub fn new(file: Arc<str>, span: Span) -> Self {
        Self { file, span }
    }

    pub fn point(file: Arc<str>, line: usize, column: usize) -> Self {
        Self {
            file,
            span: Span::point(line, column),
        }
    }
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.file, self.span.start.line, self.span.start.column
        )
    }
}
