//! # mailpipe-mime
//!
//! MIME decoding for display: transfer encodings, RFC 2047 header words,
//! multipart walking and a best-effort HTML to text pass.
//!
//! ```
//! let raw = b"Subject: Hi\r\nContent-Type: text/html\r\n\r\n<p>Hello &amp; welcome</p>";
//! let body = mailpipe_mime::extract(raw);
//! assert_eq!(body.text, "Hello & welcome");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod body;
mod content_type;
mod error;
mod header;
mod html;
mod message;

pub mod encoding;

pub use body::{Body, extract};
pub use content_type::{ContentDisposition, ContentType};
pub use encoding::TransferEncoding;
pub use error::{Error, Result};
pub use header::Headers;
pub use html::{looks_like_html, strip_html};
pub use message::{Message, Part};
