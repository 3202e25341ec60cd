//! Source location tracking shared by both evaluators.
//!
//! The HCL side gets byte spans from `hcl-edit` and maps them through
//! [`SourceMapper`]; the TypeScript lexer tracks line and column directly.

use std::fmt::Display;
use std::ops::Range;

/// A 1-based line/column position in a source file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Maps source spans (byte offsets) to line/column positions
pub struct SourceMapper<'a> {
    source: &'a str,
}

impl<'a> SourceMapper<'a> {
    pub fn new(source: &'a str) -> Self {
        Self { source }
    }

    /// Convert a byte offset to a position (1-based)
    pub fn offset_to_position(&self, offset: usize) -> Position {
        let mut line = 1;
        let mut column = 1;

        for (i, ch) in self.source.char_indices() {
            if i >= offset {
                break;
            }
            if ch == '\n' {
                line += 1;
                column = 1;
            } else {
                column += 1;
            }
        }

        Position { line, column }
    }

    pub fn span_to_position(&self, span: &Range<usize>) -> Position {
        self.offset_to_position(span.start)
    }

    pub fn optional_span_to_position(&self, span: Option<&Range<usize>>) -> Option<Position> {
        span.map(|s| self.span_to_position(s))
    }
}
