//! Source positions shared by the lexer, parser and checker

use serde::{Deserialize, Serialize};
use std::fmt;

/// A zero-based line/column position inside a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct SourceLocation {
    pub line: u32,
    pub approximate_column: u32,
}

impl SourceLocation {
    pub fn new(line: u32, approximate_column: u32) -> Self {
        Self {
            line,
            approximate_column,
        }
    }

    /// Byte offset of this location inside `text`, clamped to the text length.
    pub fn offset_in(&self, text: &str) -> usize {
        let mut offset = 0;
        for (index, line) in text.split_inclusive('\n').enumerate() {
            if index as u32 == self.line {
                let column = line
                    .char_indices()
                    .nth(self.approximate_column as usize)
                    .map(|(byte, _)| byte)
                    .unwrap_or(line.len());
                return offset + column;
            }
            offset += line.len();
        }
        text.len()
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line + 1, self.approximate_column + 1)
    }
}
