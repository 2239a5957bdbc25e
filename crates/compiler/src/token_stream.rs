use super::{
    error::{CompilationError, CompilationErrorKind as ErrorKind, CompileResult},
    tokenizer::{Lexer, Token, TokenKind},
    Position,
};

/// Buffered lexer output with arbitrary lookahead.
/// Whitespace tokens are dropped here, the parser never sees them.
pub struct TokenStream<'a> {
    tokens: Vec<Token<'a>>,
    cursor: usize,
}

impl<'a> TokenStream<'a> {
    /// Drains the lexer eagerly. The first lex error aborts.
    pub fn new(lexer: Lexer<'a>) -> CompileResult<Self> {
        let mut tokens = vec![];
        for token in lexer {
            let token = token?;
            if token.kind != TokenKind::Whitespace {
                tokens.push(token);
            }
        }
        debug_assert!(matches!(tokens.last(), Some(t) if t.kind == TokenKind::Eof));
        Ok(Self { tokens, cursor: 0 })
    }

    /// Look ahead by `n` without consuming. Past the end it keeps returning Eof.
    pub fn la(&self, n: usize) -> &Token<'a> {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.cursor + n).min(last)]
    }

    pub fn peek(&self) -> &Token<'a> {
        self.la(0)
    }

    pub fn test(&self, kind: TokenKind, text: Option<&str>) -> bool {
        self.peek().is(kind, text)
    }

    pub fn next(&mut self) -> Token<'a> {
        let token = self.peek().clone();
        if token.kind != TokenKind::Eof {
            self.cursor += 1;
        }
        token
    }

    /// consume the token if it matches
    pub fn next_if(&mut self, kind: TokenKind, text: Option<&str>) -> Option<Token<'a>> {
        if self.test(kind, text) {
            Some(self.next())
        } else {
            None
        }
    }

    pub fn expect(&mut self, kind: TokenKind, text: Option<&str>) -> CompileResult<Token<'a>> {
        if self.test(kind, text) {
            return Ok(self.next());
        }
        let expected = match text {
            Some(t) => format!("{} `{}`", kind, t),
            None => kind.to_string(),
        };
        Err(unexpected(self.peek(), &expected))
    }

    pub fn is_eof(&self) -> bool {
        self.test(TokenKind::Eof, None)
    }

    /// end of the last consumed token
    pub fn prev_end(&self) -> Position {
        match self.cursor {
            0 => Position::default(),
            n => self.tokens[n - 1].location.end,
        }
    }
}

pub fn unexpected(token: &Token, expected: &str) -> CompilationError {
    let kind = if token.kind == TokenKind::Eof {
        ErrorKind::MissingEndTag
    } else {
        ErrorKind::UnexpectedToken
    };
    CompilationError::new(kind)
        .with_additional_message(format!(": expected {}, found {}.", expected, token))
        .with_location(token.location)
}
