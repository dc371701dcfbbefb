//! Lexer tokens.

/// One token of a server response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    /// Unquoted atom, borrowed from the input.
    Atom(&'a str),
    /// Quoted string with escapes resolved.
    QuotedString(String),
    /// Literal payload (`{n}\r\n` followed by `n` bytes).
    Literal(Vec<u8>),
    /// Unsigned number.
    Number(u32),
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// Single space.
    Space,
    /// `*`
    Asterisk,
    /// `+`
    Plus,
    /// `NIL` in any case.
    Nil,
    /// Line terminator.
    Crlf,
    /// No more input.
    Eof,
}
