//! Tokenizer for server responses.
//!
//! Works on a complete response buffer, literals included, as produced by
//! [`FramedStream`](crate::connection::FramedStream).

#![allow(clippy::missing_errors_doc)]

mod token;

pub use token::Token;

use crate::{Error, Result};

/// Cursor over one response buffer.
pub struct Lexer<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    /// Creates a lexer positioned at the start of `input`.
    #[must_use]
    pub const fn new(input: &'a [u8]) -> Self {
        Self { input, pos: 0 }
    }

    /// Current byte offset.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.pos
    }

    /// Unconsumed input.
    #[must_use]
    pub fn remaining(&self) -> &'a [u8] {
        self.input.get(self.pos..).unwrap_or_default()
    }

    /// Returns true once all input is consumed.
    #[must_use]
    pub const fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    /// Next byte without consuming it.
    #[must_use]
    pub fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.input.get(self.pos + offset).copied()
    }

    /// Consumes one byte.
    pub fn advance(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.pos += 1;
        Some(byte)
    }

    /// Consumes up to `n` bytes.
    pub fn skip(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.input.len());
    }

    /// Reads the next token.
    pub fn next_token(&mut self) -> Result<Token<'a>> {
        let Some(byte) = self.peek() else {
            return Ok(Token::Eof);
        };

        let simple = match byte {
            b' ' => Some(Token::Space),
            b'(' => Some(Token::LParen),
            b')' => Some(Token::RParen),
            b'[' => Some(Token::LBracket),
            b']' => Some(Token::RBracket),
            b'*' => Some(Token::Asterisk),
            b'+' => Some(Token::Plus),
            _ => None,
        };
        if let Some(token) = simple {
            self.advance();
            return Ok(token);
        }

        match byte {
            b'\r' if self.peek_at(1) == Some(b'\n') => {
                self.skip(2);
                Ok(Token::Crlf)
            }
            // Some servers terminate lines with a bare LF.
            b'\n' => {
                self.advance();
                Ok(Token::Crlf)
            }
            b'"' => self.read_quoted_string(),
            b'{' => self.read_literal(),
            _ if is_atom_char(byte) => self.read_atom(),
            _ => Err(self.error(&format!("unexpected byte {byte:#04x}"))),
        }
    }

    fn read_quoted_string(&mut self) -> Result<Token<'a>> {
        self.advance();
        let mut bytes = Vec::new();

        loop {
            match self.advance() {
                Some(b'"') => break,
                Some(b'\\') => match self.advance() {
                    Some(c @ (b'"' | b'\\')) => bytes.push(c),
                    Some(c) => {
                        // Lenient: keep unknown escapes verbatim.
                        bytes.push(b'\\');
                        bytes.push(c);
                    }
                    None => return Err(self.error("unterminated quoted string")),
                },
                Some(b'\r' | b'\n') | None => {
                    return Err(self.error("unterminated quoted string"));
                }
                Some(c) => bytes.push(c),
            }
        }

        Ok(Token::QuotedString(
            String::from_utf8_lossy(&bytes).into_owned(),
        ))
    }

    fn read_literal(&mut self) -> Result<Token<'a>> {
        self.advance();
        let start = self.pos;
        while self.peek().is_some_and(|b| b.is_ascii_digit()) {
            self.advance();
        }
        let digits = std::str::from_utf8(&self.input[start..self.pos])
            .map_err(|_| self.error("invalid literal size"))?;
        let size: usize = digits
            .parse()
            .map_err(|_| self.error("invalid literal size"))?;

        if self.peek() == Some(b'+') {
            self.advance();
        }
        if self.advance() != Some(b'}') {
            return Err(self.error("expected '}' after literal size"));
        }
        match (self.peek(), self.peek_at(1)) {
            (Some(b'\r'), Some(b'\n')) => self.skip(2),
            (Some(b'\n'), _) => self.skip(1),
            _ => return Err(self.error("expected CRLF after literal size")),
        }

        let end = self
            .pos
            .checked_add(size)
            .filter(|&end| end <= self.input.len())
            .ok_or_else(|| self.error("incomplete literal"))?;
        let data = self.input[self.pos..end].to_vec();
        self.pos = end;
        Ok(Token::Literal(data))
    }

    fn read_atom(&mut self) -> Result<Token<'a>> {
        let start = self.pos;
        while self.peek().is_some_and(is_atom_char) {
            self.advance();
        }

        let s = std::str::from_utf8(&self.input[start..self.pos])
            .map_err(|_| self.error("invalid UTF-8 in atom"))?;

        if s.eq_ignore_ascii_case("NIL") {
            return Ok(Token::Nil);
        }
        if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
            return s
                .parse()
                .map(Token::Number)
                .map_err(|_| self.error("number out of range"));
        }
        Ok(Token::Atom(s))
    }

    fn error(&self, message: &str) -> Error {
        Error::Parse {
            position: self.pos,
            message: message.to_string(),
        }
    }

    /// Consumes a token of the same kind as `expected`.
    #[allow(clippy::needless_pass_by_value)]
    pub fn expect(&mut self, expected: Token<'_>) -> Result<()> {
        let token = self.next_token()?;
        if std::mem::discriminant(&token) == std::mem::discriminant(&expected) {
            Ok(())
        } else {
            Err(self.error(&format!("expected {expected:?}, got {token:?}")))
        }
    }

    /// Consumes a single space.
    pub fn expect_space(&mut self) -> Result<()> {
        self.expect(Token::Space)
    }

    /// Reads an atom, quoted string or literal as text.
    pub fn read_astring(&mut self) -> Result<String> {
        match self.next_token()? {
            Token::Atom(s) => Ok(s.to_string()),
            Token::Number(n) => Ok(n.to_string()),
            Token::QuotedString(s) => Ok(s),
            Token::Literal(data) => Ok(String::from_utf8_lossy(&data).into_owned()),
            token => Err(self.error(&format!("expected astring, got {token:?}"))),
        }
    }

    /// Reads `NIL` or a string.
    pub fn read_nstring(&mut self) -> Result<Option<String>> {
        match self.next_token()? {
            Token::Nil => Ok(None),
            Token::QuotedString(s) => Ok(Some(s)),
            Token::Literal(data) => Ok(Some(String::from_utf8_lossy(&data).into_owned())),
            token => Err(self.error(&format!("expected nstring, got {token:?}"))),
        }
    }

    /// Reads a number.
    pub fn read_number(&mut self) -> Result<u32> {
        match self.next_token()? {
            Token::Number(n) => Ok(n),
            token => Err(self.error(&format!("expected number, got {token:?}"))),
        }
    }

    /// Reads an atom.
    pub fn read_atom_string(&mut self) -> Result<&'a str> {
        match self.next_token()? {
            Token::Atom(s) => Ok(s),
            token => Err(self.error(&format!("expected atom, got {token:?}"))),
        }
    }

    /// Consumes everything up to and including the line terminator.
    pub fn read_text_until_crlf(&mut self) -> String {
        let remaining = self.remaining();
        let end = remaining
            .iter()
            .position(|&b| b == b'\r' || b == b'\n')
            .unwrap_or(remaining.len());
        let text = String::from_utf8_lossy(&remaining[..end]).into_owned();
        self.skip(end);
        if self.peek() == Some(b'\r') {
            self.advance();
        }
        if self.peek() == Some(b'\n') {
            self.advance();
        }
        text
    }
}

/// Returns true for bytes allowed inside an atom.
///
/// `\` is accepted so flags like `\Seen` lex as one atom. `[` and `]` are
/// excluded so `BODY[]` splits into its parts.
#[must_use]
pub const fn is_atom_char(b: u8) -> bool {
    matches!(b,
        0x21 |
        0x23..=0x24 |
        0x26..=0x27 |
        0x2B..=0x5A |
        0x5C |
        0x5E..=0x7A |
        0x7C |
        0x7E
    )
}
