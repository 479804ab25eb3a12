//! Source locations for call sites and interface declarations.

use serde::{Deserialize, Serialize};

use crate::syntax::SourceRange;

/// A source range inside one file.
///
/// Lines are 1-based and columns 0-based, the same convention the Ruby parser
/// reports. Renders as `file:begin_line:begin_column-end_line:end_column`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location {
    pub file: String,
    pub begin_line: u32,
    pub begin_column: u32,
    pub end_line: u32,
    pub end_column: u32,
}

impl Location {
    pub fn new(
        file: impl Into<String>,
        begin_line: u32,
        begin_column: u32,
        end_line: u32,
        end_column: u32,
    ) -> Self {
        Self {
            file: file.into(),
            begin_line,
            begin_column,
            end_line,
            end_column,
        }
    }

    /// Build a location from a parser range and the file that owns it.
    pub fn from_range(file: &str, range: SourceRange) -> Self {
        Self::new(
            file,
            range.start.line,
            range.start.column,
            range.end.line,
            range.end.column,
        )
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}:{}-{}:{}",
            self.file, self.begin_line, self.begin_column, self.end_line, self.end_column
        )
    }
}
