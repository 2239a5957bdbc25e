use crate::{Position, SourceLocation};

/// Position-tracked cursor over template source.
/// It only moves forward and never rescans consumed input.
pub struct CharStream<'a> {
    source: &'a str,
    position: Position,
}

impl<'a> CharStream<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            position: Position::default(),
        }
    }

    pub fn source(&self) -> &'a str {
        self.source
    }

    /// unconsumed part of the source
    pub fn rest(&self) -> &'a str {
        &self.source[self.position.offset..]
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn is_eof(&self) -> bool {
        self.position.offset >= self.source.len()
    }

    /// `None` stands for EOF.
    pub fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    pub fn peek_at(&self, n: usize) -> Option<char> {
        self.rest().chars().nth(n)
    }

    pub fn starts_with(&self, pat: &str) -> bool {
        self.rest().starts_with(pat)
    }

    pub fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        let pos = &mut self.position;
        pos.offset += c.len_utf8();
        if c == '\n' {
            pos.line += 1;
            pos.column = 1;
        } else {
            pos.column += 1;
        }
        Some(c)
    }

    /// move forward by `size` bytes and return the consumed str.
    /// NB: size must fall on a char boundary.
    pub fn advance_by(&mut self, size: usize) -> &'a str {
        let start = self.position.offset;
        let target = start + size;
        debug_assert!(self.source.is_char_boundary(target));
        while self.position.offset < target {
            self.advance();
        }
        &self.source[start..target]
    }

    pub fn advance_while<P>(&mut self, mut pred: P) -> &'a str
    where
        P: FnMut(char) -> bool,
    {
        let start = self.position.offset;
        while let Some(c) = self.peek() {
            if !pred(c) {
                break;
            }
            self.advance();
        }
        &self.source[start..self.position.offset]
    }

    pub fn slice_from(&self, start: Position) -> &'a str {
        &self.source[start.offset..self.position.offset]
    }

    pub fn location_from(&self, start: Position) -> SourceLocation {
        SourceLocation::new(start, self.position)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_line_column() {
        let mut s = CharStream::new("ab\ncd");
        assert_eq!(s.peek_at(3), Some('c'));
        s.advance_by(3);
        let pos = s.position();
        assert_eq!((pos.offset, pos.line, pos.column), (3, 2, 1));
        assert_eq!(s.advance(), Some('c'));
        assert_eq!(s.position().column, 2);
        s.advance();
        assert!(s.is_eof());
        assert_eq!(s.advance(), None);
    }

    #[test]
    fn test_multibyte() {
        let mut s = CharStream::new("é{{");
        assert_eq!(s.advance(), Some('é'));
        assert_eq!(s.position().offset, 2);
        assert_eq!(s.position().column, 2);
        assert!(s.starts_with("{{"));
    }
}
