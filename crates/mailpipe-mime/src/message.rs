//! MIME message structure.

use crate::content_type::{ContentDisposition, ContentType};
use crate::encoding::{TransferEncoding, decode_transfer};
use crate::error::Result;
use crate::header::Headers;

/// Nesting limit for multipart bodies; deeper parts are kept as opaque leaves.
const MAX_DEPTH: usize = 16;

/// A MIME entity: headers, raw body, and child parts when multipart.
#[derive(Debug, Clone, Default)]
pub struct Part {
    /// Entity headers.
    pub headers: Headers,
    /// Raw (still transfer-encoded) body.
    pub body: Vec<u8>,
    /// Child parts, in order. Empty unless the entity is multipart with a boundary.
    pub parts: Vec<Self>,
}

impl Part {
    /// Parses an entity, failing if its header block is malformed.
    ///
    /// Child parts are parsed leniently: a child with broken headers is kept
    /// with empty headers and its whole text as body.
    ///
    /// # Errors
    ///
    /// Returns an error if the top-level headers cannot be parsed.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        Self::parse_at(raw, 0)
    }

    fn parse_at(raw: &[u8], depth: usize) -> Result<Self> {
        let (head, body) = split_head_body(raw);
        let headers = Headers::parse(&String::from_utf8_lossy(head))?;
        let mut part = Self {
            headers,
            body: body.to_vec(),
            parts: Vec::new(),
        };

        if depth < MAX_DEPTH
            && let Some(ct) = part.content_type().filter(ContentType::is_multipart)
            && let Some(boundary) = ct.boundary()
        {
            part.parts = split_multipart(body, boundary)
                .into_iter()
                .map(|chunk| {
                    Self::parse_at(chunk, depth + 1).unwrap_or_else(|e| {
                        tracing::debug!(error = %e, "malformed part headers, keeping raw body");
                        Self {
                            body: chunk.to_vec(),
                            ..Self::default()
                        }
                    })
                })
                .collect();
        }

        Ok(part)
    }

    /// Content type. A missing header means `text/plain`; an unparseable one yields `None`.
    #[must_use]
    pub fn content_type(&self) -> Option<ContentType> {
        match self.headers.get("content-type") {
            None => Some(ContentType::text_plain()),
            Some(value) => ContentType::parse(value)
                .inspect_err(|e| tracing::debug!(error = %e, "ignoring content type"))
                .ok(),
        }
    }

    /// Declared transfer encoding.
    #[must_use]
    pub fn transfer_encoding(&self) -> TransferEncoding {
        self.headers
            .get("content-transfer-encoding")
            .map_or_else(TransferEncoding::default, TransferEncoding::parse)
    }

    /// Content disposition, if declared.
    #[must_use]
    pub fn disposition(&self) -> Option<ContentDisposition> {
        self.headers
            .get("content-disposition")
            .map(ContentDisposition::parse)
    }

    /// Attachment file name from the disposition or the content type `name`.
    #[must_use]
    pub fn filename(&self) -> Option<String> {
        self.disposition()
            .and_then(|d| d.filename())
            .or_else(|| self.content_type().and_then(|ct| ct.name()))
    }

    /// True when the disposition says `attachment`.
    #[must_use]
    pub fn is_attachment(&self) -> bool {
        self.disposition().is_some_and(|d| d.is_attachment())
    }

    /// Body decoded per the transfer encoding, as text.
    #[must_use]
    pub fn decoded_text(&self) -> String {
        decode_transfer(&self.body, self.transfer_encoding())
    }
}

/// A parsed RFC 5322 message.
#[derive(Debug, Clone)]
pub struct Message {
    root: Part,
}

impl Message {
    /// Parses a raw message.
    ///
    /// # Errors
    ///
    /// Returns an error if the header block is malformed.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        Part::parse(raw).map(|root| Self { root })
    }

    /// Top-level entity.
    #[must_use]
    pub const fn root(&self) -> &Part {
        &self.root
    }

    /// Top-level headers.
    #[must_use]
    pub const fn headers(&self) -> &Headers {
        &self.root.headers
    }

    /// Decoded `Subject`.
    #[must_use]
    pub fn subject(&self) -> Option<String> {
        self.root.headers.get_decoded("subject")
    }

    /// Decoded `From`.
    #[must_use]
    pub fn from(&self) -> Option<String> {
        self.root.headers.get_decoded("from")
    }

    /// Decoded `To`.
    #[must_use]
    pub fn to(&self) -> Option<String> {
        self.root.headers.get_decoded("to")
    }

    /// Raw `Date`.
    #[must_use]
    pub fn date(&self) -> Option<&str> {
        self.root.headers.get("date")
    }
}

/// Splits at the first empty line. A message starting with an empty line has no headers.
fn split_head_body(raw: &[u8]) -> (&[u8], &[u8]) {
    if raw.starts_with(b"\r\n") {
        return (&[], &raw[2..]);
    }
    if raw.starts_with(b"\n") {
        return (&[], &raw[1..]);
    }

    let crlf = find(raw, b"\r\n\r\n").map(|i| (i, i + 4));
    let lf = find(raw, b"\n\n").map(|i| (i, i + 2));
    let split = match (crlf, lf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    };

    split.map_or((raw, &[][..]), |(head_end, body_start)| {
        (&raw[..head_end], &raw[body_start..])
    })
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Returns the bodies between `--boundary` delimiter lines.
///
/// The preamble and epilogue are dropped. An unterminated final part is kept.
fn split_multipart<'a>(body: &'a [u8], boundary: &str) -> Vec<&'a [u8]> {
    let delimiter = format!("--{boundary}");
    let mut parts = Vec::new();
    let mut start = None;
    let mut pos = 0;

    while pos < body.len() {
        let end = body[pos..]
            .iter()
            .position(|&b| b == b'\n')
            .map_or(body.len(), |i| pos + i + 1);

        if let Some(rest) = body[pos..end].strip_prefix(delimiter.as_bytes()) {
            let rest = rest.trim_ascii_end();
            if rest.is_empty() || rest == b"--" {
                if let Some(s) = start {
                    parts.push(strip_line_end(&body[s..pos]));
                }
                if rest == b"--" {
                    return parts;
                }
                start = Some(end);
            }
        }

        pos = end;
    }

    if let Some(s) = start {
        parts.push(&body[s..]);
    }
    parts
}

/// Drops the line break that belongs to the following delimiter.
fn strip_line_end(s: &[u8]) -> &[u8] {
    s.strip_suffix(b"\r\n")
        .or_else(|| s.strip_suffix(b"\n"))
        .unwrap_or(s)
}
