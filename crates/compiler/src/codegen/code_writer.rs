use super::Mapping;
use crate::SourceLocation;
use std::fmt;

/// Indentation aware text buffer for one section of the generated module.
/// Writing into a String never fails, so the methods return nothing.
pub struct CodeWriter {
    buf: String,
    indent_level: usize,
    /// 0-based line of the cursor
    line: usize,
    /// 0-based column of the cursor, in chars
    column: usize,
    mappings: Option<Vec<Mapping>>,
}

impl CodeWriter {
    pub fn new(source_map: bool) -> Self {
        Self {
            buf: String::new(),
            indent_level: 0,
            line: 0,
            column: 0,
            mappings: if source_map { Some(vec![]) } else { None },
        }
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn write_str(&mut self, s: &str) {
        match s.rfind('\n') {
            Some(i) => {
                self.line += s.matches('\n').count();
                self.column = s[i + 1..].chars().count();
            }
            None => self.column += s.chars().count(),
        }
        self.buf.push_str(s);
    }

    /// indentation of a fresh line
    pub fn start_line(&mut self) {
        for _ in 0..self.indent_level {
            self.write_str("  ");
        }
    }

    pub fn end_line(&mut self) {
        self.write_str("\n");
    }

    /// `header {` on its own line, the following lines are indented
    pub fn open_block(&mut self, header: &str) {
        self.start_line();
        self.write_str(header);
        self.write_str(" {");
        self.end_line();
        self.indent_level += 1;
    }

    /// `}` of the innermost block
    pub fn close_block(&mut self) {
        self.dedent();
        self.start_line();
        self.write_str("}");
        self.end_line();
    }

    pub fn indent(&mut self) {
        self.indent_level += 1;
    }

    pub fn dedent(&mut self) {
        debug_assert!(self.indent_level > 0);
        self.indent_level = self.indent_level.saturating_sub(1);
    }

    /// map the cursor back to the start of `loc`
    pub fn mark(&mut self, loc: &SourceLocation) {
        let (line, column) = (self.line, self.column);
        if let Some(mappings) = &mut self.mappings {
            mappings.push(Mapping {
                generated_line: line + 1,
                generated_column: column + 1,
                original: loc.start,
            });
        }
    }

    /// Append `other` below the current content.
    /// Its mappings are shifted to their final lines.
    pub fn append(&mut self, other: CodeWriter) {
        let offset = self.line;
        if let (Some(mine), Some(theirs)) = (&mut self.mappings, other.mappings) {
            mine.extend(theirs.into_iter().map(|m| Mapping {
                generated_line: m.generated_line + offset,
                ..m
            }));
        }
        self.write_str(&other.buf);
    }

    pub fn finish(self) -> (String, Option<Vec<Mapping>>) {
        (self.buf, self.mappings)
    }
}

impl fmt::Write for CodeWriter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        CodeWriter::write_str(self, s);
        Ok(())
    }
}
