//! Response parser.
//!
//! Turns one complete response (line plus any literals) into a [`Response`].

#![allow(clippy::missing_errors_doc)]

mod fetch;
mod helpers;
mod types;

pub use types::{Address, Envelope, FetchItem, UntaggedResponse};

use crate::parser::lexer::{Lexer, Token};
use crate::types::{ResponseCode, SeqNum, Status, Tag};
use crate::{Error, Result};

use helpers::{parse_capability_data, parse_flag_list, parse_list_response, parse_response_code};

/// A parsed server response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Command completion.
    Tagged {
        /// Tag of the completed command.
        tag: Tag,
        /// Completion status.
        status: Status,
        /// Optional bracketed code.
        code: Option<ResponseCode>,
        /// Human-readable text.
        text: String,
    },
    /// Server data.
    Untagged(UntaggedResponse),
    /// `+` continuation request.
    Continuation {
        /// Text following the `+`, if any.
        text: Option<String>,
    },
}

/// Stateless response parser.
pub struct ResponseParser;

impl ResponseParser {
    /// Parses one complete response.
    pub fn parse(input: &[u8]) -> Result<Response> {
        let mut lexer = Lexer::new(input);

        match lexer.next_token()? {
            Token::Asterisk => Self::parse_untagged(&mut lexer),
            Token::Plus => Ok(Self::parse_continuation(&mut lexer)),
            Token::Atom(tag) => Self::parse_tagged(&mut lexer, tag),
            // All-digit tags are legal.
            Token::Number(n) => Self::parse_tagged(&mut lexer, &n.to_string()),
            token => Err(Error::Parse {
                position: 0,
                message: format!("expected *, + or tag, got {token:?}"),
            }),
        }
    }

    fn parse_tagged(lexer: &mut Lexer<'_>, tag: &str) -> Result<Response> {
        lexer.expect_space()?;
        let status = Self::parse_status(lexer)?;
        let (code, text) = Self::parse_resp_text(lexer)?;

        Ok(Response::Tagged {
            tag: Tag::new(tag),
            status,
            code,
            text,
        })
    }

    fn parse_untagged(lexer: &mut Lexer<'_>) -> Result<Response> {
        lexer.expect_space()?;

        let untagged = match lexer.next_token()? {
            Token::Atom(keyword) => match keyword.to_ascii_uppercase().as_str() {
                "OK" => {
                    let (code, text) = Self::parse_resp_text(lexer)?;
                    UntaggedResponse::Ok { code, text }
                }
                "NO" => {
                    let (code, text) = Self::parse_resp_text(lexer)?;
                    UntaggedResponse::No { code, text }
                }
                "BAD" => {
                    let (code, text) = Self::parse_resp_text(lexer)?;
                    UntaggedResponse::Bad { code, text }
                }
                "PREAUTH" => {
                    let (code, text) = Self::parse_resp_text(lexer)?;
                    UntaggedResponse::PreAuth { code, text }
                }
                "BYE" => {
                    let (code, text) = Self::parse_resp_text(lexer)?;
                    UntaggedResponse::Bye { code, text }
                }
                "CAPABILITY" => UntaggedResponse::Capability(parse_capability_data(lexer)?),
                "FLAGS" => {
                    lexer.expect_space()?;
                    UntaggedResponse::Flags(parse_flag_list(lexer)?)
                }
                "LIST" => {
                    lexer.expect_space()?;
                    UntaggedResponse::List(parse_list_response(lexer)?)
                }
                other => UntaggedResponse::Other(other.to_string()),
            },
            Token::Number(n) => {
                lexer.expect_space()?;
                let keyword = lexer.read_atom_string()?;
                match keyword.to_ascii_uppercase().as_str() {
                    "EXISTS" => UntaggedResponse::Exists(n),
                    "RECENT" => UntaggedResponse::Recent(n),
                    "EXPUNGE" => UntaggedResponse::Expunge(Self::seq(lexer, n)?),
                    "FETCH" => {
                        let seq = Self::seq(lexer, n)?;
                        lexer.expect_space()?;
                        let items = fetch::parse_fetch_response(lexer)?;
                        UntaggedResponse::Fetch { seq, items }
                    }
                    other => UntaggedResponse::Other(other.to_string()),
                }
            }
            token => {
                return Err(Error::Parse {
                    position: lexer.position(),
                    message: format!("unexpected token in untagged response: {token:?}"),
                });
            }
        };

        Ok(Response::Untagged(untagged))
    }

    fn seq(lexer: &Lexer<'_>, n: u32) -> Result<SeqNum> {
        SeqNum::new(n).ok_or_else(|| Error::Parse {
            position: lexer.position(),
            message: "sequence number cannot be 0".to_string(),
        })
    }

    fn parse_continuation(lexer: &mut Lexer<'_>) -> Response {
        if lexer.peek() == Some(b' ') {
            lexer.advance();
        }
        let text = lexer.read_text_until_crlf();
        Response::Continuation {
            text: (!text.is_empty()).then_some(text),
        }
    }

    fn parse_status(lexer: &mut Lexer<'_>) -> Result<Status> {
        let s = lexer.read_atom_string()?;
        match s.to_ascii_uppercase().as_str() {
            "OK" => Ok(Status::Ok),
            "NO" => Ok(Status::No),
            "BAD" => Ok(Status::Bad),
            "PREAUTH" => Ok(Status::PreAuth),
            "BYE" => Ok(Status::Bye),
            _ => Err(Error::Parse {
                position: lexer.position(),
                message: format!("invalid status: {s}"),
            }),
        }
    }

    /// Parses ` [CODE] text`. The leading space is optional.
    fn parse_resp_text(lexer: &mut Lexer<'_>) -> Result<(Option<ResponseCode>, String)> {
        if lexer.peek() == Some(b' ') {
            lexer.advance();
        }
        let code = if lexer.peek() == Some(b'[') {
            Some(parse_response_code(lexer)?)
        } else {
            None
        };
        if lexer.peek() == Some(b' ') {
            lexer.advance();
        }
        Ok((code, lexer.read_text_until_crlf()))
    }
}
