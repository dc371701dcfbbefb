//! FETCH response items.

use crate::parser::lexer::{Lexer, Token};
use crate::types::Uid;
use crate::{Error, Result};

use super::helpers::parse_flag_list;
use super::types::{Address, Envelope, FetchItem};

/// Parses the parenthesized item list after `* n FETCH `.
pub fn parse_fetch_response(lexer: &mut Lexer<'_>) -> Result<Vec<FetchItem>> {
    lexer.expect(Token::LParen)?;

    let mut items = Vec::new();
    loop {
        match lexer.next_token()? {
            Token::RParen => break,
            Token::Space => {}
            Token::Atom(name) => match name.to_ascii_uppercase().as_str() {
                "FLAGS" => {
                    lexer.expect_space()?;
                    items.push(FetchItem::Flags(parse_flag_list(lexer)?));
                }
                "UID" => {
                    lexer.expect_space()?;
                    let n = lexer.read_number()?;
                    let uid = Uid::new(n).ok_or_else(|| Error::Parse {
                        position: lexer.position(),
                        message: "UID cannot be 0".to_string(),
                    })?;
                    items.push(FetchItem::Uid(uid));
                }
                "INTERNALDATE" => {
                    lexer.expect_space()?;
                    if let Some(date) = lexer.read_nstring()? {
                        items.push(FetchItem::InternalDate(date));
                    }
                }
                "ENVELOPE" => {
                    lexer.expect_space()?;
                    items.push(FetchItem::Envelope(Box::new(parse_envelope(lexer)?)));
                }
                "BODY" | "BODY.PEEK" if lexer.peek() == Some(b'[') => {
                    let section = parse_section(lexer)?;
                    skip_origin(lexer);
                    lexer.expect_space()?;
                    let data = match lexer.next_token()? {
                        Token::Literal(bytes) => Some(bytes),
                        Token::QuotedString(s) => Some(s.into_bytes()),
                        _ => None,
                    };
                    items.push(FetchItem::Body { section, data });
                }
                "RFC822" => {
                    lexer.expect_space()?;
                    let data = match lexer.next_token()? {
                        Token::Literal(bytes) => Some(bytes),
                        Token::QuotedString(s) => Some(s.into_bytes()),
                        _ => None,
                    };
                    items.push(FetchItem::Body {
                        section: String::new(),
                        data,
                    });
                }
                _ => skip_item_value(lexer)?,
            },
            token => {
                return Err(Error::Parse {
                    position: lexer.position(),
                    message: format!("unexpected token in FETCH: {token:?}"),
                });
            }
        }
    }

    Ok(items)
}

/// Reads `[section]` verbatim.
fn parse_section(lexer: &mut Lexer<'_>) -> Result<String> {
    lexer.expect(Token::LBracket)?;
    let mut section = Vec::new();
    loop {
        match lexer.advance() {
            Some(b']') => break,
            Some(b) => section.push(b),
            None => {
                return Err(Error::Parse {
                    position: lexer.position(),
                    message: "unterminated body section".to_string(),
                });
            }
        }
    }
    Ok(String::from_utf8_lossy(&section).into_owned())
}

/// Skips a partial-fetch origin such as `<0>`.
fn skip_origin(lexer: &mut Lexer<'_>) {
    if lexer.peek() == Some(b'<') {
        while let Some(b) = lexer.advance() {
            if b == b'>' {
                break;
            }
        }
    }
}

/// Skips the value of an item we do not decode (BODYSTRUCTURE, MODSEQ, ...).
fn skip_item_value(lexer: &mut Lexer<'_>) -> Result<()> {
    // Section-style names like BINARY[1] carry a bracket before the value.
    if lexer.peek() == Some(b'[') {
        parse_section(lexer)?;
        skip_origin(lexer);
    }
    if lexer.peek() != Some(b' ') {
        return Ok(());
    }
    lexer.expect_space()?;

    let mut depth = 0usize;
    loop {
        match lexer.next_token()? {
            Token::LParen => depth += 1,
            Token::RParen => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Ok(());
                }
            }
            Token::Eof | Token::Crlf => {
                return Err(Error::Parse {
                    position: lexer.position(),
                    message: "unterminated FETCH item".to_string(),
                });
            }
            _ if depth == 0 => return Ok(()),
            _ => {}
        }
    }
}

/// Parses an envelope structure.
pub fn parse_envelope(lexer: &mut Lexer<'_>) -> Result<Envelope> {
    lexer.expect(Token::LParen)?;

    let date = lexer.read_nstring()?;
    lexer.expect_space()?;
    let subject = lexer.read_nstring()?;
    lexer.expect_space()?;
    let from = parse_address_list(lexer)?;
    lexer.expect_space()?;
    let sender = parse_address_list(lexer)?;
    lexer.expect_space()?;
    let reply_to = parse_address_list(lexer)?;
    lexer.expect_space()?;
    let to = parse_address_list(lexer)?;
    lexer.expect_space()?;
    let cc = parse_address_list(lexer)?;
    lexer.expect_space()?;
    let bcc = parse_address_list(lexer)?;
    lexer.expect_space()?;
    let in_reply_to = lexer.read_nstring()?;
    lexer.expect_space()?;
    let message_id = lexer.read_nstring()?;

    lexer.expect(Token::RParen)?;

    Ok(Envelope {
        date,
        subject,
        from,
        sender,
        reply_to,
        to,
        cc,
        bcc,
        in_reply_to,
        message_id,
    })
}

/// Parses `NIL` or `((addr) (addr) ...)`.
pub fn parse_address_list(lexer: &mut Lexer<'_>) -> Result<Vec<Address>> {
    match lexer.next_token()? {
        Token::Nil => Ok(Vec::new()),
        Token::LParen => {
            let mut addresses = Vec::new();
            loop {
                match lexer.peek() {
                    Some(b')') => {
                        lexer.advance();
                        break;
                    }
                    Some(b'(') => addresses.push(parse_address(lexer)?),
                    Some(b' ') => {
                        lexer.advance();
                    }
                    _ => {
                        return Err(Error::Parse {
                            position: lexer.position(),
                            message: "malformed address list".to_string(),
                        });
                    }
                }
            }
            Ok(addresses)
        }
        token => Err(Error::Parse {
            position: lexer.position(),
            message: format!("expected address list, got {token:?}"),
        }),
    }
}

fn parse_address(lexer: &mut Lexer<'_>) -> Result<Address> {
    lexer.expect(Token::LParen)?;
    let name = lexer.read_nstring()?;
    lexer.expect_space()?;
    let adl = lexer.read_nstring()?;
    lexer.expect_space()?;
    let mailbox = lexer.read_nstring()?;
    lexer.expect_space()?;
    let host = lexer.read_nstring()?;
    lexer.expect(Token::RParen)?;

    Ok(Address {
        name,
        adl,
        mailbox,
        host,
    })
}
