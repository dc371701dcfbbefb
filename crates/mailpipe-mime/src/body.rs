//! Display body selection.

use crate::html::{looks_like_html, strip_html};
use crate::message::{Message, Part};

/// Text extracted from a raw message for display.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Body {
    /// Plain-text rendering of the message body.
    pub text: String,
    /// File names of attachment parts, in message order.
    pub attachments: Vec<String>,
}

/// Extracts the display body from a raw RFC 5322 message.
///
/// For multipart messages the first non-empty `text/plain` part wins,
/// trimmed; failing that the first non-empty `text/html` part is stripped
/// of markup. Nested multiparts are walked depth-first and attachment parts
/// never supply the body. Single-part bodies are decoded and stripped if
/// they look like HTML.
///
/// Never fails: a message whose headers cannot be parsed is rendered by
/// stripping markup from the raw bytes.
#[must_use]
pub fn extract(raw: &[u8]) -> Body {
    let message = match Message::parse(raw) {
        Ok(message) => message,
        Err(e) => {
            tracing::debug!(error = %e, "unparseable message, using raw text");
            return Body {
                text: strip_html(&String::from_utf8_lossy(raw)),
                attachments: Vec::new(),
            };
        }
    };

    let root = message.root();
    let is_multipart = root
        .content_type()
        .is_some_and(|ct| ct.is_multipart());

    if !is_multipart {
        return Body {
            text: render(root.decoded_text()).trim().to_string(),
            attachments: Vec::new(),
        };
    }

    if root.parts.is_empty() {
        return Body {
            text: render(root.decoded_text()),
            attachments: Vec::new(),
        };
    }

    let mut walk = Walk::default();
    walk.visit(&root.parts);

    let text = match (walk.plain, walk.html) {
        (Some(plain), _) => plain.trim().to_string(),
        (None, Some(html)) => strip_html(&html),
        (None, None) => String::new(),
    };

    Body {
        text,
        attachments: walk.attachments,
    }
}

fn render(text: String) -> String {
    if looks_like_html(&text) {
        strip_html(&text)
    } else {
        text
    }
}

#[derive(Default)]
struct Walk {
    plain: Option<String>,
    html: Option<String>,
    attachments: Vec<String>,
}

impl Walk {
    fn visit(&mut self, parts: &[Part]) {
        for part in parts {
            if !part.parts.is_empty() {
                self.visit(&part.parts);
                continue;
            }

            if let Some(name) = attachment_name(part) {
                self.attachments.push(name);
                continue;
            }

            let Some(ct) = part.content_type() else {
                continue;
            };
            let slot = if ct.is_text_plain() {
                &mut self.plain
            } else if ct.is_text_html() {
                &mut self.html
            } else {
                continue;
            };

            if slot.is_none() {
                let text = part.decoded_text();
                if !text.is_empty() {
                    *slot = Some(text);
                }
            }
        }
    }
}

fn attachment_name(part: &Part) -> Option<String> {
    match part.filename() {
        Some(name) => Some(name),
        None if part.is_attachment() => Some(String::from("unnamed")),
        None => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn alternative(plain: &str, html: &str) -> String {
        format!(
            "Content-Type: multipart/alternative; boundary=sep\r\n\r\n\
             --sep\r\nContent-Type: text/plain\r\n\r\n{plain}\r\n\
             --sep\r\nContent-Type: text/html\r\n\r\n{html}\r\n\
             --sep--\r\n"
        )
    }

    #[test]
    fn test_plain_preferred() {
        let body = extract(alternative("Hello", "<p>Hello</p>").as_bytes());
        assert_eq!(body.text, "Hello");
        assert!(body.attachments.is_empty());
    }

    #[test]
    fn test_html_fallback_when_plain_empty() {
        let body = extract(alternative("", "<p>Hi &amp; bye</p>").as_bytes());
        assert_eq!(body.text, "Hi & bye");
    }

    #[test]
    fn test_plain_is_trimmed() {
        let body = extract(alternative("\r\n  spaced  \r\n", "").as_bytes());
        assert_eq!(body.text, "spaced");
    }

    #[test]
    fn test_attachments_listed_and_skipped() {
        let raw = concat!(
            "Content-Type: multipart/mixed; boundary=m\n\n",
            "--m\n",
            "Content-Type: text/plain\n",
            "Content-Disposition: attachment; filename=notes.txt\n\n",
            "attached text\n",
            "--m\n",
            "Content-Type: multipart/alternative; boundary=a\n\n",
            "--a\n",
            "Content-Type: text/plain\n",
            "Content-Transfer-Encoding: quoted-printable\n\n",
            "soft=\nbreak\n",
            "--a--\n",
            "--m--\n",
        );
        let body = extract(raw.as_bytes());
        assert_eq!(body.text, "softbreak");
        assert_eq!(body.attachments, vec!["notes.txt".to_string()]);
    }

    #[test]
    fn test_single_part_html() {
        let raw = "Content-Type: text/html\r\n\r\n<html><body><div>Hi</div></body></html>\r\n";
        assert_eq!(extract(raw.as_bytes()).text, "Hi");
    }

    #[test]
    fn test_single_part_base64_plain() {
        let raw = "Content-Transfer-Encoding: base64\r\n\r\nSGVsbG8gd29ybGQ=\r\n";
        assert_eq!(extract(raw.as_bytes()).text, "Hello world");
    }

    #[test]
    fn test_bad_base64_falls_back_to_raw() {
        let raw = "Content-Transfer-Encoding: base64\r\n\r\n!!not base64!!";
        assert_eq!(extract(raw.as_bytes()).text, "!!not base64!!");
    }

    #[test]
    fn test_multipart_without_boundary() {
        let raw = "Content-Type: multipart/mixed\r\n\r\n<p>inline</p>";
        assert_eq!(extract(raw.as_bytes()).text, "inline");
    }

    #[test]
    fn test_unparseable_headers_strip_raw() {
        assert_eq!(extract(b"garbage line\n\n<b>bold</b>").text, "garbage line\n\nbold");
    }

    #[test]
    fn test_empty_message() {
        assert_eq!(extract(b"").text, "");
    }
}
