//! `Content-Type` and `Content-Disposition` values.

use std::collections::HashMap;
use std::fmt;

use crate::encoding::decode_rfc2047;
use crate::error::{Error, Result};

/// MIME media type with parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    /// Main type, lowercased (`text`, `multipart`, ...).
    pub main_type: String,
    /// Subtype, lowercased (`plain`, `html`, `alternative`, ...).
    pub sub_type: String,
    /// Parameters with lowercased names.
    pub parameters: HashMap<String, String>,
}

impl ContentType {
    /// Creates a media type without parameters.
    #[must_use]
    pub fn new(main_type: impl Into<String>, sub_type: impl Into<String>) -> Self {
        Self {
            main_type: main_type.into(),
            sub_type: sub_type.into(),
            parameters: HashMap::new(),
        }
    }

    /// `text/plain`, the default when a part has no Content-Type.
    #[must_use]
    pub fn text_plain() -> Self {
        Self::new("text", "plain")
    }

    /// The `charset` parameter.
    #[must_use]
    pub fn charset(&self) -> Option<&str> {
        self.parameters.get("charset").map(String::as_str)
    }

    /// The `boundary` parameter, if present and non-empty.
    #[must_use]
    pub fn boundary(&self) -> Option<&str> {
        self.parameters
            .get("boundary")
            .map(String::as_str)
            .filter(|b| !b.is_empty())
    }

    /// The `name` parameter some mailers use instead of a disposition filename.
    #[must_use]
    pub fn name(&self) -> Option<String> {
        self.parameters.get("name").map(|n| decode_rfc2047(n))
    }

    /// `multipart/*`
    #[must_use]
    pub fn is_multipart(&self) -> bool {
        self.main_type == "multipart"
    }

    /// `text/plain`
    #[must_use]
    pub fn is_text_plain(&self) -> bool {
        self.main_type == "text" && self.sub_type == "plain"
    }

    /// `text/html`
    #[must_use]
    pub fn is_text_html(&self) -> bool {
        self.main_type == "text" && self.sub_type == "html"
    }

    /// Parses `type/subtype; key=value; key="quoted value"`.
    ///
    /// # Errors
    ///
    /// Returns an error if `type/subtype` is missing.
    pub fn parse(s: &str) -> Result<Self> {
        let (essence, params) = s.split_once(';').unwrap_or((s, ""));
        let (main_type, sub_type) = essence
            .trim()
            .split_once('/')
            .map(|(m, s)| (m.trim().to_ascii_lowercase(), s.trim().to_ascii_lowercase()))
            .filter(|(m, s)| !m.is_empty() && !s.is_empty())
            .ok_or_else(|| Error::InvalidContentType(s.to_string()))?;

        Ok(Self {
            main_type,
            sub_type,
            parameters: parse_parameters(params),
        })
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.main_type, self.sub_type)
    }
}

/// `Content-Disposition` value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentDisposition {
    /// Lowercased disposition type (`inline`, `attachment`).
    pub kind: String,
    /// Parameters with lowercased names.
    pub parameters: HashMap<String, String>,
}

impl ContentDisposition {
    /// Parses a disposition header value. Never fails; an empty value yields an empty kind.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        let (kind, params) = s.split_once(';').unwrap_or((s, ""));
        Self {
            kind: kind.trim().to_ascii_lowercase(),
            parameters: parse_parameters(params),
        }
    }

    /// True for `attachment`.
    #[must_use]
    pub fn is_attachment(&self) -> bool {
        self.kind == "attachment"
    }

    /// The `filename` parameter, decoding RFC 2231 and RFC 2047 forms.
    #[must_use]
    pub fn filename(&self) -> Option<String> {
        if let Some(extended) = self.parameters.get("filename*") {
            return Some(decode_rfc2231(extended));
        }
        self.parameters.get("filename").map(|f| decode_rfc2047(f))
    }
}

/// Parses `; key=value; key="quoted; value"` pairs.
fn parse_parameters(s: &str) -> HashMap<String, String> {
    let mut parameters = HashMap::new();
    let mut chars = s.chars().peekable();

    loop {
        while chars.next_if(|c| *c == ';' || c.is_whitespace()).is_some() {}

        let key: String = chars
            .by_ref()
            .take_while(|c| *c != '=')
            .collect::<String>()
            .trim()
            .to_ascii_lowercase();
        if key.is_empty() {
            break;
        }

        while chars.next_if(|c| c.is_whitespace()).is_some() {}

        let mut value = String::new();
        if chars.next_if_eq(&'"').is_some() {
            while let Some(c) = chars.next() {
                match c {
                    '"' => break,
                    '\\' => {
                        if let Some(escaped) = chars.next() {
                            value.push(escaped);
                        }
                    }
                    _ => value.push(c),
                }
            }
            while chars.next_if(|c| *c != ';').is_some() {}
        } else {
            while let Some(c) = chars.next_if(|c| *c != ';') {
                value.push(c);
            }
            value = value.trim().to_string();
        }

        parameters.insert(key, value);
    }

    parameters
}

/// Decodes `charset'lang'percent%20encoded`.
fn decode_rfc2231(value: &str) -> String {
    let encoded = value.splitn(3, '\'').nth(2).unwrap_or(value);
    let bytes = encoded.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%'
            && let Some(byte) = bytes
                .get(i + 1..i + 3)
                .and_then(|h| std::str::from_utf8(h).ok())
                .and_then(|h| u8::from_str_radix(h, 16).ok())
        {
            out.push(byte);
            i += 3;
            continue;
        }
        out.push(bytes[i]);
        i += 1;
    }

    String::from_utf8_lossy(&out).into_owned()
}
