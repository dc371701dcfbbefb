//! Transfer-encoding and encoded-word decoding.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::error::{Error, Result};

/// `Content-Transfer-Encoding` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransferEncoding {
    /// 7-bit ASCII.
    #[default]
    SevenBit,
    /// 8-bit data.
    EightBit,
    /// Base64.
    Base64,
    /// Quoted-Printable.
    QuotedPrintable,
    /// Raw binary.
    Binary,
}

impl TransferEncoding {
    /// Parses a header value; unknown tokens count as 7bit.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "8bit" => Self::EightBit,
            "base64" => Self::Base64,
            "quoted-printable" => Self::QuotedPrintable,
            "binary" => Self::Binary,
            _ => Self::SevenBit,
        }
    }
}

impl fmt::Display for TransferEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::SevenBit => "7bit",
            Self::EightBit => "8bit",
            Self::Base64 => "base64",
            Self::QuotedPrintable => "quoted-printable",
            Self::Binary => "binary",
        })
    }
}

/// Decodes Base64, ignoring line breaks and other whitespace.
///
/// # Errors
///
/// Returns an error if the input is not valid Base64.
pub fn decode_base64(data: &[u8]) -> Result<Vec<u8>> {
    let cleaned: Vec<u8> = data
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    Ok(STANDARD.decode(cleaned)?)
}

/// Decodes Quoted-Printable (RFC 2045 section 6.7).
///
/// # Errors
///
/// Returns an error on `=` followed by anything but two hex digits or a line break.
pub fn decode_quoted_printable(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(data.len());
    let mut i = 0;

    while i < data.len() {
        let byte = data[i];
        if byte != b'=' {
            out.push(byte);
            i += 1;
            continue;
        }

        // Soft line break, possibly with trailing whitespace before it.
        let mut j = i + 1;
        while j < data.len() && (data[j] == b' ' || data[j] == b'\t') {
            j += 1;
        }
        match data.get(j) {
            Some(b'\n') => {
                i = j + 1;
                continue;
            }
            Some(b'\r') if data.get(j + 1) == Some(&b'\n') => {
                i = j + 2;
                continue;
            }
            None => break,
            _ => {}
        }

        let hex = data
            .get(i + 1..i + 3)
            .and_then(|h| std::str::from_utf8(h).ok())
            .and_then(|h| u8::from_str_radix(h, 16).ok())
            .ok_or_else(|| Error::QuotedPrintable(format!("invalid escape at byte {i}")))?;
        out.push(hex);
        i += 3;
    }

    Ok(out)
}

/// Decodes `body` per `encoding` and returns it as text.
///
/// Falls back to the raw bytes when decoding fails; never errors.
#[must_use]
pub fn decode_transfer(body: &[u8], encoding: TransferEncoding) -> String {
    let decoded = match encoding {
        TransferEncoding::Base64 => decode_base64(body),
        TransferEncoding::QuotedPrintable => decode_quoted_printable(body),
        _ => return String::from_utf8_lossy(body).into_owned(),
    };

    match decoded {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) => {
            tracing::debug!(error = %e, %encoding, "transfer decoding failed, using raw body");
            String::from_utf8_lossy(body).into_owned()
        }
    }
}

/// Decodes RFC 2047 encoded words (`=?charset?B|Q?text?=`) inside a header value.
///
/// Whitespace between adjacent encoded words is dropped. Words that fail to
/// decode are kept verbatim. Only UTF-8 and ASCII-compatible charsets are
/// decoded faithfully; others are decoded lossily.
#[must_use]
pub fn decode_rfc2047(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    let mut last_was_word = false;

    while let Some(start) = rest.find("=?") {
        let (before, candidate) = rest.split_at(start);
        let word = parse_encoded_word(candidate);

        match word {
            Some((decoded, consumed)) => {
                if !(last_was_word && before.trim().is_empty()) {
                    out.push_str(before);
                }
                out.push_str(&decoded);
                rest = &candidate[consumed..];
                last_was_word = true;
            }
            None => {
                out.push_str(before);
                out.push_str("=?");
                rest = &candidate[2..];
                last_was_word = false;
            }
        }
    }

    out.push_str(rest);
    out
}

/// Parses one encoded word at the start of `s`; returns the text and bytes consumed.
fn parse_encoded_word(s: &str) -> Option<(String, usize)> {
    let inner = s.strip_prefix("=?")?;
    let (_charset, inner) = inner.split_once('?')?;
    let (encoding, inner) = inner.split_once('?')?;
    let end = inner.find("?=")?;
    let payload = &inner[..end];
    if payload.contains(char::is_whitespace) {
        return None;
    }

    let bytes = match encoding {
        "B" | "b" => decode_base64(payload.as_bytes()).ok()?,
        "Q" | "q" => decode_quoted_printable(payload.replace('_', " ").as_bytes()).ok()?,
        _ => return None,
    };

    let consumed = s.len() - inner.len() + end + 2;
    Some((String::from_utf8_lossy(&bytes).into_owned(), consumed))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_base64_with_line_breaks() {
        let decoded = decode_base64(b"SGVsbG8s\r\nIFdvcmxkIQ==\r\n").unwrap();
        assert_eq!(decoded, b"Hello, World!");
    }

    #[test]
    fn test_quoted_printable() {
        assert_eq!(decode_quoted_printable(b"H=C3=A9llo").unwrap(), "Héllo".as_bytes());
        assert_eq!(decode_quoted_printable(b"Hello=\r\nWorld").unwrap(), b"HelloWorld");
        assert_eq!(decode_quoted_printable(b"soft= \nbreak").unwrap(), b"softbreak");
        assert!(decode_quoted_printable(b"bad=ZZ").is_err());
    }

    #[test]
    fn test_decode_transfer_falls_back_to_raw() {
        assert_eq!(decode_transfer(b"SGk=", TransferEncoding::Base64), "Hi");
        assert_eq!(decode_transfer(b"not base64!!", TransferEncoding::Base64), "not base64!!");
        assert_eq!(decode_transfer(b"100%=XX", TransferEncoding::QuotedPrintable), "100%=XX");
        assert_eq!(decode_transfer(b"=C3=A9", TransferEncoding::SevenBit), "=C3=A9");
    }

    #[test]
    fn test_transfer_encoding_parse() {
        assert_eq!(TransferEncoding::parse(" Base64 "), TransferEncoding::Base64);
        assert_eq!(
            TransferEncoding::parse("quoted-printable"),
            TransferEncoding::QuotedPrintable
        );
        assert_eq!(TransferEncoding::parse("x-uuencode"), TransferEncoding::SevenBit);
    }

    #[test]
    fn test_rfc2047() {
        assert_eq!(decode_rfc2047("Hello"), "Hello");
        assert_eq!(decode_rfc2047("=?utf-8?B?SMOpbGxv?="), "Héllo");
        assert_eq!(decode_rfc2047("=?UTF-8?Q?H=C3=A9llo_there?="), "Héllo there");
        assert_eq!(
            decode_rfc2047("Re: =?utf-8?Q?caf=C3=A9?= =?utf-8?Q?_au_lait?= now"),
            "Re: café au lait now"
        );
        assert_eq!(decode_rfc2047("=?broken"), "=?broken");
    }
}
