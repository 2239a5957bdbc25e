//! Template tokenization.
//! The lexer is a mode stack machine. It starts in text mode and
//! pushes a mode whenever a delimiter opens a nested construct.
//!
//! | Mode        | Entered by             | Left by        |
//! |-------------|------------------------|----------------|
//! | Text        | start of input         | EOF            |
//! | Expression  | `{{`                   | `}}`           |
//! | Tag         | `{%`                   | `%}`           |
//! | Comment     | `{#`                   | `#}`           |
//! | Element     | `<name`                | `>` or `/>`    |
//! | String      | quote in expression    | same quote     |
//! | AttrString  | quote in element       | same quote     |

mod char_stream;

pub use char_stream::CharStream;

use super::{
    error::{CompilationError, CompilationErrorKind as ErrorKind},
    flags::TokenFlags,
    Position, SourceLocation,
};
#[cfg(feature = "serde")]
use serde::Serialize;
use std::{fmt, iter::FusedIterator};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum TokenKind {
    Text,
    ExpressionStart,
    ExpressionEnd,
    TagStart,
    TagEnd,
    CommentStart,
    Comment,
    CommentEnd,
    StringStart,
    String,
    StringEnd,
    Symbol,
    Number,
    Operator,
    Punctuation,
    ElementStart,
    ElementEnd,
    EndTag,
    Whitespace,
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use TokenKind::*;
        let s = match self {
            Text => "text",
            ExpressionStart => "expression start",
            ExpressionEnd => "expression end",
            TagStart => "tag start",
            TagEnd => "tag end",
            CommentStart => "comment start",
            Comment => "comment",
            CommentEnd => "comment end",
            StringStart => "string start",
            String => "string",
            StringEnd => "string end",
            Symbol => "symbol",
            Number => "number",
            Operator => "operator",
            Punctuation => "punctuation",
            ElementStart => "element start",
            ElementEnd => "element end",
            EndTag => "end tag",
            Whitespace => "whitespace",
            Eof => "end of input",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Token<'a> {
    pub kind: TokenKind,
    /// exact source slice covered by the token
    pub text: &'a str,
    pub location: SourceLocation,
    pub flags: TokenFlags,
}

impl<'a> Token<'a> {
    pub fn is(&self, kind: TokenKind, text: Option<&str>) -> bool {
        self.kind == kind && text.map_or(true, |t| t == self.text)
    }
    /// tag name of ElementStart `<div` or EndTag `</div >`
    pub fn element_name(&self) -> &'a str {
        match self.kind {
            TokenKind::ElementStart => self.text.get(1..).unwrap_or(""),
            // an end tag cut off by EOF has no `>`
            TokenKind::EndTag => {
                let inner = self.text.get(2..).unwrap_or("");
                inner.strip_suffix('>').unwrap_or(inner).trim()
            }
            _ => self.text,
        }
    }
}

impl<'a> fmt::Display for Token<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.kind == TokenKind::Eof {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{} `{}`", self.kind, self.text)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexMode {
    Text,
    // the counter tracks open brackets so `{a: {b: 1}}` is not read as `}}`
    Expression(u32),
    Tag(u32),
    Comment,
    Element,
    String(char),
    AttrString(char),
}

const PUNCTUATION: &[char] = &['(', ')', '[', ']', '{', '}', ',', '.', ':', '|', '?', '='];

pub struct Lexer<'a> {
    stream: CharStream<'a>,
    modes: Vec<LexMode>,
    /// operator texts sorted by length, longest first
    operators: &'a [String],
    /// last significant token was `.`, the next name is a property
    after_dot: bool,
    done: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str, operators: &'a [String]) -> Self {
        debug_assert!(operators.windows(2).all(|w| w[0].len() >= w[1].len()));
        Self {
            stream: CharStream::new(source),
            modes: vec![LexMode::Text],
            operators,
            after_dot: false,
            done: false,
        }
    }

    fn mode(&self) -> LexMode {
        *self.modes.last().unwrap_or(&LexMode::Text)
    }

    fn scan(&mut self) -> Result<Token<'a>, CompilationError> {
        if self.stream.is_eof() {
            return self.scan_eof();
        }
        match self.mode() {
            LexMode::Text => Ok(self.scan_text()),
            LexMode::Expression(_) | LexMode::Tag(_) => self.scan_code(),
            LexMode::Comment => self.scan_comment(),
            LexMode::Element => self.scan_element(),
            LexMode::String(q) => self.scan_string(q),
            LexMode::AttrString(q) => self.scan_attr_string(q),
        }
    }

    fn scan_eof(&mut self) -> Result<Token<'a>, CompilationError> {
        self.done = true;
        let kind = match self.mode() {
            LexMode::String(_) | LexMode::AttrString(_) => Some(ErrorKind::UnterminatedString),
            LexMode::Comment => Some(ErrorKind::UnterminatedComment),
            LexMode::Element => Some(ErrorKind::EofInElement),
            // unclosed expressions and tags are reported by the parser
            _ => None,
        };
        if let Some(kind) = kind {
            return Err(self.error_here(kind));
        }
        let start = self.stream.position();
        Ok(self.token_from(TokenKind::Eof, start, TokenFlags::empty()))
    }

    fn scan_text(&mut self) -> Token<'a> {
        let start = self.stream.position();
        if self.stream.starts_with("{{") {
            return self.scan_open_delimiter(TokenKind::ExpressionStart, LexMode::Expression(0));
        }
        if self.stream.starts_with("{%") {
            return self.scan_open_delimiter(TokenKind::TagStart, LexMode::Tag(0));
        }
        if self.stream.starts_with("{#") {
            return self.scan_open_delimiter(TokenKind::CommentStart, LexMode::Comment);
        }
        if self.is_element_start() {
            self.stream.advance();
            self.stream.advance_while(is_element_name_char);
            self.modes.push(LexMode::Element);
            return self.token_from(TokenKind::ElementStart, start, TokenFlags::empty());
        }
        if self.is_end_tag() {
            return self.scan_end_tag();
        }
        // first char is known not to open anything
        self.stream.advance();
        while !self.stream.is_eof() && !self.is_text_boundary() {
            self.stream.advance();
        }
        self.token_from(TokenKind::Text, start, TokenFlags::empty())
    }

    fn is_text_boundary(&self) -> bool {
        let s = &self.stream;
        s.starts_with("{{")
            || s.starts_with("{%")
            || s.starts_with("{#")
            || self.is_element_start()
            || self.is_end_tag()
    }

    fn is_element_start(&self) -> bool {
        self.stream.peek() == Some('<') && self.stream.peek_at(1).map_or(false, is_ascii_alpha)
    }

    fn is_end_tag(&self) -> bool {
        self.stream.starts_with("</") && self.stream.peek_at(2).map_or(false, is_ascii_alpha)
    }

    // EndTag is scanned as a whole: `</name>`
    fn scan_end_tag(&mut self) -> Token<'a> {
        let start = self.stream.position();
        self.stream.advance_by(2);
        self.stream.advance_while(|c| c != '>');
        // EOF without `>` leaves the token open, parser reports a mismatch
        self.stream.advance();
        self.token_from(TokenKind::EndTag, start, TokenFlags::empty())
    }

    fn scan_open_delimiter(&mut self, kind: TokenKind, mode: LexMode) -> Token<'a> {
        let start = self.stream.position();
        self.stream.advance_by(2);
        let mut flags = TokenFlags::empty();
        if self.stream.peek() == Some('-') {
            self.stream.advance();
            flags |= TokenFlags::TRIM_BEFORE;
        }
        self.modes.push(mode);
        self.token_from(kind, start, flags)
    }

    fn scan_close_delimiter(&mut self, kind: TokenKind, delimiter: &str) -> Option<Token<'a>> {
        let start = self.stream.position();
        let flags = if self.stream.rest().starts_with('-')
            && self.stream.rest()[1..].starts_with(delimiter)
        {
            self.stream.advance();
            TokenFlags::TRIM_AFTER
        } else if self.stream.starts_with(delimiter) {
            TokenFlags::empty()
        } else {
            return None;
        };
        self.stream.advance_by(delimiter.len());
        self.modes.pop();
        Some(self.token_from(kind, start, flags))
    }

    fn scan_code(&mut self) -> Result<Token<'a>, CompilationError> {
        let start = self.stream.position();
        let c = match self.stream.peek() {
            Some(c) => c,
            None => return self.scan_eof(),
        };
        if c.is_whitespace() {
            self.stream.advance_while(char::is_whitespace);
            return Ok(self.token_from(TokenKind::Whitespace, start, TokenFlags::empty()));
        }
        match self.mode() {
            LexMode::Expression(0) => {
                if let Some(t) = self.scan_close_delimiter(TokenKind::ExpressionEnd, "}}") {
                    return Ok(t);
                }
            }
            LexMode::Tag(0) => {
                if let Some(t) = self.scan_close_delimiter(TokenKind::TagEnd, "%}") {
                    return Ok(t);
                }
            }
            _ => {}
        }
        if c.is_ascii_digit() {
            return Ok(self.scan_number());
        }
        if c == '"' || c == '\'' {
            self.stream.advance();
            self.modes.push(LexMode::String(c));
            return Ok(self.token_from(TokenKind::StringStart, start, TokenFlags::empty()));
        }
        if let Some(len) = self.match_operator() {
            self.stream.advance_by(len);
            return Ok(self.token_from(TokenKind::Operator, start, TokenFlags::empty()));
        }
        if is_symbol_start(c) {
            self.stream.advance_while(is_symbol_char);
            return Ok(self.token_from(TokenKind::Symbol, start, TokenFlags::empty()));
        }
        if PUNCTUATION.contains(&c) {
            self.stream.advance();
            self.track_bracket(c);
            return Ok(self.token_from(TokenKind::Punctuation, start, TokenFlags::empty()));
        }
        Err(self.unexpected_char(c))
    }

    fn track_bracket(&mut self, c: char) {
        if let Some(LexMode::Expression(depth) | LexMode::Tag(depth)) = self.modes.last_mut() {
            match c {
                '(' | '[' | '{' => *depth += 1,
                ')' | ']' | '}' => *depth = depth.saturating_sub(1),
                _ => {}
            }
        }
    }

    fn scan_number(&mut self) -> Token<'a> {
        let start = self.stream.position();
        self.stream.advance_while(|c| c.is_ascii_digit());
        let is_decimal = self.stream.peek() == Some('.')
            && self.stream.peek_at(1).map_or(false, |c| c.is_ascii_digit());
        if is_decimal {
            self.stream.advance();
            self.stream.advance_while(|c| c.is_ascii_digit());
        }
        self.token_from(TokenKind::Number, start, TokenFlags::empty())
    }

    /// returns the byte length of the longest operator at the cursor
    fn match_operator(&self) -> Option<usize> {
        let rest = self.stream.rest();
        self.operators.iter().find_map(|op| {
            if !rest.starts_with(op.as_str()) {
                return None;
            }
            // `a.in` is a property, not an operator
            if self.after_dot && op.starts_with(is_symbol_char) {
                return None;
            }
            // word operators like `in` must not match the prefix of `items`
            let ends_in_word = op.ends_with(is_symbol_char);
            let next = rest[op.len()..].chars().next();
            if ends_in_word && next.map_or(false, is_symbol_char) {
                return None;
            }
            Some(op.len())
        })
    }

    fn scan_string(&mut self, quote: char) -> Result<Token<'a>, CompilationError> {
        let start = self.stream.position();
        if self.stream.peek() == Some(quote) {
            self.stream.advance();
            self.modes.pop();
            return Ok(self.token_from(TokenKind::StringEnd, start, TokenFlags::empty()));
        }
        loop {
            match self.stream.peek() {
                None => {
                    self.done = true;
                    return Err(self.error_here(ErrorKind::UnterminatedString));
                }
                Some(c) if c == quote => break,
                Some('\\') => {
                    self.stream.advance();
                    self.stream.advance();
                }
                Some(_) => {
                    self.stream.advance();
                }
            }
        }
        Ok(self.token_from(TokenKind::String, start, TokenFlags::empty()))
    }

    fn scan_attr_string(&mut self, quote: char) -> Result<Token<'a>, CompilationError> {
        let start = self.stream.position();
        if self.stream.peek() == Some(quote) {
            self.stream.advance();
            self.modes.pop();
            return Ok(self.token_from(TokenKind::StringEnd, start, TokenFlags::empty()));
        }
        if self.stream.starts_with("{{") {
            return Ok(self.scan_open_delimiter(TokenKind::ExpressionStart, LexMode::Expression(0)));
        }
        while let Some(c) = self.stream.peek() {
            if c == quote || self.stream.starts_with("{{") {
                break;
            }
            self.stream.advance();
        }
        Ok(self.token_from(TokenKind::String, start, TokenFlags::empty()))
    }

    fn scan_comment(&mut self) -> Result<Token<'a>, CompilationError> {
        let start = self.stream.position();
        if let Some(t) = self.scan_close_delimiter(TokenKind::CommentEnd, "#}") {
            return Ok(t);
        }
        let rest = self.stream.rest();
        let end = match rest.find("#}") {
            Some(i) => i,
            None => {
                self.done = true;
                return Err(CompilationError::new(ErrorKind::UnterminatedComment)
                    .with_location(SourceLocation::new(start, start)));
            }
        };
        let end = if rest[..end].ends_with('-') { end - 1 } else { end };
        self.stream.advance_by(end);
        Ok(self.token_from(TokenKind::Comment, start, TokenFlags::empty()))
    }

    fn scan_element(&mut self) -> Result<Token<'a>, CompilationError> {
        let start = self.stream.position();
        let c = match self.stream.peek() {
            Some(c) => c,
            None => return self.scan_eof(),
        };
        if c.is_whitespace() {
            self.stream.advance_while(char::is_whitespace);
            return Ok(self.token_from(TokenKind::Whitespace, start, TokenFlags::empty()));
        }
        if c == '>' || self.stream.starts_with("/>") {
            let len = if c == '>' { 1 } else { 2 };
            self.stream.advance_by(len);
            self.modes.pop();
            return Ok(self.token_from(TokenKind::ElementEnd, start, TokenFlags::empty()));
        }
        if self.stream.starts_with("{{") {
            return Ok(self.scan_open_delimiter(TokenKind::ExpressionStart, LexMode::Expression(0)));
        }
        match c {
            '=' => {
                self.stream.advance();
                Ok(self.token_from(TokenKind::Punctuation, start, TokenFlags::empty()))
            }
            '"' | '\'' => {
                self.stream.advance();
                self.modes.push(LexMode::AttrString(c));
                Ok(self.token_from(TokenKind::StringStart, start, TokenFlags::empty()))
            }
            c if is_attr_name_char(c) => {
                self.stream.advance_while(is_attr_name_char);
                Ok(self.token_from(TokenKind::Symbol, start, TokenFlags::empty()))
            }
            c => Err(self.unexpected_char(c)),
        }
    }

    fn token_from(&self, kind: TokenKind, start: Position, flags: TokenFlags) -> Token<'a> {
        Token {
            kind,
            text: self.stream.slice_from(start),
            location: self.stream.location_from(start),
            flags,
        }
    }

    fn error_here(&self, kind: ErrorKind) -> CompilationError {
        let pos = self.stream.position();
        CompilationError::new(kind).with_location(SourceLocation::new(pos, pos))
    }

    fn unexpected_char(&mut self, c: char) -> CompilationError {
        self.done = true;
        let start = self.stream.position();
        let mut end = start;
        end.offset += c.len_utf8();
        end.column += 1;
        CompilationError::new(ErrorKind::UnexpectedCharacter)
            .with_additional_message(format!(" `{}`.", c))
            .with_location(SourceLocation::new(start, end))
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Result<Token<'a>, CompilationError>;
    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let ret = self.scan();
        match &ret {
            Ok(token) if token.kind != TokenKind::Whitespace => {
                self.after_dot = token.is(TokenKind::Punctuation, Some("."));
            }
            Ok(_) => {}
            Err(_) => self.done = true,
        }
        Some(ret)
    }
}

// TokenStream relies on the lexer yielding None forever after Eof.
impl<'a> FusedIterator for Lexer<'a> {}

#[inline]
fn is_ascii_alpha(c: char) -> bool {
    c.is_ascii_alphabetic()
}

#[inline]
fn is_symbol_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

#[inline]
fn is_symbol_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

#[inline]
fn is_element_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.')
}

// `{` is excluded so that `{{` always opens an expression
#[inline]
fn is_attr_name_char(c: char) -> bool {
    !c.is_whitespace() && !matches!(c, '=' | '>' | '/' | '"' | '\'' | '{' | '<')
}

#[cfg(test)]
mod test {
    use super::*;
    use TokenKind as K;

    fn ops() -> Vec<String> {
        let mut ops: Vec<String> = ["==", "..", "-", "+", "in", "not in", "b-and", "is", "is not"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        ops.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
        ops
    }

    fn scan(source: &str) -> Vec<(TokenKind, String)> {
        let ops = ops();
        Lexer::new(source, &ops)
            .map(|t| t.expect("lex error"))
            .filter(|t| t.kind != K::Whitespace)
            .map(|t| (t.kind, t.text.to_string()))
            .collect()
    }

    #[test]
    fn test_tokens_are_contiguous() {
        let ops = ops();
        let source = "a {{ foo.bar | upper }}\n{% if x == 1 -%} <p class=\"a {{ b }}\">t</p>{# c #}";
        let tokens: Vec<_> = Lexer::new(source, &ops).map(Result::unwrap).collect();
        for pair in tokens.windows(2) {
            assert_eq!(pair[0].location.end, pair[1].location.start);
        }
        let rebuilt: String = tokens.iter().map(|t| t.text).collect();
        assert_eq!(rebuilt, source);
        assert_eq!(tokens.last().unwrap().kind, K::Eof);
    }

    #[test]
    fn test_expression() {
        let tokens = scan("{{ 1..3 + 2.5 }}");
        let kinds: Vec<_> = tokens.iter().map(|t| t.0).collect();
        assert_eq!(
            kinds,
            vec![
                K::ExpressionStart,
                K::Number,
                K::Operator,
                K::Number,
                K::Operator,
                K::Number,
                K::ExpressionEnd,
                K::Eof
            ]
        );
        assert_eq!(tokens[3].1, "3");
        assert_eq!(tokens[5].1, "2.5");
    }

    #[test]
    fn test_word_operator_boundary() {
        let tokens = scan("{{ items in index not in b-and }}");
        assert_eq!(tokens[1], (K::Symbol, "items".into()));
        assert_eq!(tokens[2], (K::Operator, "in".into()));
        assert_eq!(tokens[3], (K::Symbol, "index".into()));
        assert_eq!(tokens[4], (K::Operator, "not in".into()));
        assert_eq!(tokens[5], (K::Operator, "b-and".into()));
    }

    #[test]
    fn test_word_operator_after_dot() {
        let tokens = scan("{{ team.matches a.in . is b.not in c }}");
        assert_eq!(tokens[3], (K::Symbol, "matches".into()));
        assert_eq!(tokens[6], (K::Symbol, "in".into()));
        assert_eq!(tokens[8], (K::Symbol, "is".into()));
        assert_eq!(tokens[11], (K::Symbol, "not".into()));
        assert_eq!(tokens[12], (K::Operator, "in".into()));
    }

    #[test]
    fn test_end_tag_name() {
        let ops = ops();
        let name = |source: &str| {
            let token = Lexer::new(source, &ops)
                .map(Result::unwrap)
                .find(|t| t.kind == K::EndTag)
                .unwrap();
            token.element_name().to_string()
        };
        assert_eq!(name("</div >"), "div");
        assert_eq!(name("</pé"), "pé");
        assert_eq!(name("</p"), "p");
    }

    #[test]
    fn test_trim_flags() {
        let ops = ops();
        let tokens: Vec<_> = Lexer::new("{%- if a -%}", &ops).map(Result::unwrap).collect();
        assert_eq!(tokens[0].flags, TokenFlags::TRIM_BEFORE);
        assert_eq!(tokens[0].text, "{%-");
        let end = tokens.iter().find(|t| t.kind == K::TagEnd).unwrap();
        assert_eq!(end.flags, TokenFlags::TRIM_AFTER);
        assert_eq!(end.text, "-%}");
    }

    #[test]
    fn test_string() {
        let tokens = scan(r#"{{ "a\"b" ~ '' }}"#);
        assert_eq!(tokens[1].0, K::StringStart);
        assert_eq!(tokens[2], (K::String, r#"a\"b"#.into()));
        assert_eq!(tokens[3].0, K::StringEnd);
        // empty string has no String token
        assert_eq!(tokens[5].0, K::StringStart);
        assert_eq!(tokens[6].0, K::StringEnd);
    }

    #[test]
    fn test_hash_is_not_closing() {
        let tokens = scan("{{ {a: {b: 1}} }}");
        let ends = tokens.iter().filter(|t| t.0 == K::ExpressionEnd).count();
        assert_eq!(ends, 1);
    }

    #[test]
    fn test_element() {
        let tokens = scan(r#"<div id="x {{ y }}" hidden>t</div>"#);
        assert_eq!(tokens[0], (K::ElementStart, "<div".into()));
        assert_eq!(tokens[1], (K::Symbol, "id".into()));
        assert_eq!(tokens[2], (K::Punctuation, "=".into()));
        assert_eq!(tokens[3].0, K::StringStart);
        assert_eq!(tokens[4], (K::String, "x ".into()));
        assert_eq!(tokens[5].0, K::ExpressionStart);
        assert_eq!(tokens[8].0, K::StringEnd);
        assert_eq!(tokens[9], (K::Symbol, "hidden".into()));
        assert_eq!(tokens[10], (K::ElementEnd, ">".into()));
        assert_eq!(tokens[11], (K::Text, "t".into()));
        assert_eq!(tokens[12], (K::EndTag, "</div>".into()));
    }

    #[test]
    fn test_lone_angle_is_text() {
        let tokens = scan("a < b");
        assert_eq!(tokens, vec![(K::Text, "a < b".into()), (K::Eof, "".into())]);
    }

    #[test]
    fn test_comment() {
        let tokens = scan("{#- note -#}");
        assert_eq!(tokens[1], (K::Comment, " note ".into()));
        assert_eq!(tokens[2], (K::CommentEnd, "-#}".into()));
    }

    #[test]
    fn test_errors() {
        let ops = ops();
        let err = Lexer::new("{{ a ; }}", &ops)
            .find_map(Result::err)
            .unwrap();
        assert_eq!(err.kind, ErrorKind::UnexpectedCharacter);
        assert_eq!(err.location.start.offset, 5);
        assert_eq!(err.location.start.column, 6);
        let err = Lexer::new("{{ 'abc }}", &ops).find_map(Result::err).unwrap();
        assert_eq!(err.kind, ErrorKind::UnterminatedString);
        let err = Lexer::new("{# abc", &ops).find_map(Result::err).unwrap();
        assert_eq!(err.kind, ErrorKind::UnterminatedComment);
        // lexer is fused after an error
        let mut lexer = Lexer::new("{{ ; }}", &ops);
        assert!(lexer.by_ref().any(|t| t.is_err()));
        assert!(lexer.next().is_none());
    }
}
