//! Human readable rendering of a [`CompilationError`] against its source.

use super::error::CompilationError;
#[cfg(feature = "serde")]
use serde::Serialize;
use std::fmt::{self, Write};

/// lines of context shown above and below the error line
const CONTEXT_LINES: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct LineColumn {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Diagnostic {
    pub message: String,
    pub position: LineColumn,
    /// numbered source excerpt with a caret under the error column
    pub frame: String,
}

impl Diagnostic {
    pub fn from_error(err: &CompilationError, source: &str) -> Self {
        let start = err.location.start;
        let position = LineColumn {
            line: start.line,
            column: start.column,
        };
        Self {
            message: err.to_string(),
            position,
            frame: code_frame(source, position),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} ({}:{})",
            self.message, self.position.line, self.position.column
        )?;
        f.write_str(&self.frame)
    }
}

/// `>` marks the error line, the caret sits under `position.column`.
pub fn code_frame(source: &str, position: LineColumn) -> String {
    let lines: Vec<&str> = source.split('\n').collect();
    let line = position.line.clamp(1, lines.len());
    let first = line.saturating_sub(CONTEXT_LINES).max(1);
    let last = (line + CONTEXT_LINES).min(lines.len());
    let width = last.to_string().len();
    let mut frame = String::new();
    for n in first..=last {
        let text = lines[n - 1].trim_end_matches('\r');
        let marker = if n == line { '>' } else { ' ' };
        // writing into a String cannot fail
        let _ = writeln!(frame, "{} {:>width$} | {}", marker, n, text, width = width);
        if n == line {
            let caret_at = text
                .chars()
                .take(position.column.saturating_sub(1))
                .map(|c| if c == '\t' { '\t' } else { ' ' })
                .collect::<String>();
            let _ = writeln!(frame, "  {:>width$} | {}^", "", caret_at, width = width);
        }
    }
    frame
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        error::CompilationErrorKind as ErrorKind, CompilationError, Position, SourceLocation,
    };

    #[test]
    fn test_frame_marks_line_and_column() {
        let source = "a\nb {{ c\nd";
        let frame = code_frame(source, LineColumn { line: 2, column: 3 });
        assert_eq!(frame, "  1 | a\n> 2 | b {{ c\n    |   ^\n  3 | d\n");
    }

    #[test]
    fn test_gutter_width() {
        let source = "\n".repeat(10) + "x";
        let frame = code_frame(&source, LineColumn { line: 10, column: 1 });
        assert!(frame.contains("> 10 | \n"));
        assert!(frame.contains("   8 | \n"));
    }

    #[test]
    fn test_from_error() {
        let start = Position {
            offset: 2,
            line: 1,
            column: 3,
        };
        let err = CompilationError::new(ErrorKind::UnknownTag)
            .with_additional_message(" `x`.")
            .with_location(SourceLocation::new(start, start));
        let diagnostic = Diagnostic::from_error(&err, "{%x%}");
        assert_eq!(diagnostic.message, "Unknown tag `x`.");
        assert_eq!(diagnostic.position, LineColumn { line: 1, column: 3 });
        assert!(diagnostic.to_string().starts_with("Unknown tag `x`. (1:3)\n"));
    }
}
