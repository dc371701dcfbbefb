//! Shared parsing routines.

use crate::parser::lexer::{Lexer, Token};
use crate::types::{Capability, Flag, Flags, ListResponse, Mailbox, MailboxAttribute, ResponseCode, Uid};
use crate::{Error, Result};

/// Parses `[CODE args]`.
pub fn parse_response_code(lexer: &mut Lexer<'_>) -> Result<ResponseCode> {
    lexer.expect(Token::LBracket)?;

    let atom = lexer.read_atom_string()?;
    let code = match atom.to_ascii_uppercase().as_str() {
        "ALERT" => ResponseCode::Alert,
        "READ-ONLY" => ResponseCode::ReadOnly,
        "READ-WRITE" => ResponseCode::ReadWrite,
        "TRYCREATE" => ResponseCode::TryCreate,
        "CAPABILITY" => ResponseCode::Capability(parse_capability_data(lexer)?),
        "UIDNEXT" => {
            lexer.expect_space()?;
            let n = lexer.read_number()?;
            Uid::new(n).map_or_else(|| ResponseCode::Unknown(atom.to_string()), ResponseCode::UidNext)
        }
        "UIDVALIDITY" => {
            lexer.expect_space()?;
            ResponseCode::UidValidity(lexer.read_number()?)
        }
        "UNSEEN" => {
            lexer.expect_space()?;
            ResponseCode::Unseen(lexer.read_number()?)
        }
        _ => ResponseCode::Unknown(atom.to_string()),
    };

    // Arguments of codes we do not model, e.g. PERMANENTFLAGS (\*).
    while lexer.peek().is_some_and(|b| b != b']' && b != b'\r' && b != b'\n') {
        lexer.advance();
    }
    lexer.expect(Token::RBracket)?;

    Ok(code)
}

/// Parses the space-separated atoms following `CAPABILITY`.
pub fn parse_capability_data(lexer: &mut Lexer<'_>) -> Result<Vec<Capability>> {
    let mut caps = Vec::new();

    while lexer.peek() == Some(b' ') {
        lexer.advance();
        if let Token::Atom(s) = lexer.next_token()? {
            caps.push(Capability::parse(s));
        }
    }

    Ok(caps)
}

/// Parses `(\Flag ...)`.
pub fn parse_flag_list(lexer: &mut Lexer<'_>) -> Result<Flags> {
    lexer.expect(Token::LParen)?;

    let mut flags = Flags::new();
    loop {
        match lexer.next_token()? {
            Token::RParen => break,
            Token::Atom(s) => flags.insert(Flag::parse(s)),
            // `\*` in PERMANENTFLAGS lexes as an atom `\` followed by `*`.
            Token::Space | Token::Asterisk => {}
            token => {
                return Err(Error::Parse {
                    position: lexer.position(),
                    message: format!("unexpected token in flag list: {token:?}"),
                });
            }
        }
    }

    Ok(flags)
}

/// Parses the body of `* LIST (attrs) delim name`.
pub fn parse_list_response(lexer: &mut Lexer<'_>) -> Result<ListResponse> {
    lexer.expect(Token::LParen)?;
    let mut attributes = Vec::new();
    loop {
        match lexer.next_token()? {
            Token::RParen => break,
            Token::Atom(s) => attributes.push(MailboxAttribute::parse(s)),
            Token::Space => {}
            token => {
                return Err(Error::Parse {
                    position: lexer.position(),
                    message: format!("unexpected token in LIST attributes: {token:?}"),
                });
            }
        }
    }
    lexer.expect_space()?;

    let delimiter = match lexer.next_token()? {
        Token::Nil => None,
        Token::QuotedString(s) => s.chars().next(),
        token => {
            return Err(Error::Parse {
                position: lexer.position(),
                message: format!("expected hierarchy delimiter, got {token:?}"),
            });
        }
    };
    lexer.expect_space()?;

    let name = lexer.read_astring()?;

    Ok(ListResponse {
        attributes,
        delimiter,
        mailbox: Mailbox::new(name),
    })
}
