//! Error types for MIME decoding.

/// Result type alias for MIME operations.
pub type Result<T> = std::result::Result<T, Error>;

/// MIME error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Base64 payload did not decode.
    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Quoted-printable payload had a broken escape.
    #[error("Quoted-printable decode error: {0}")]
    QuotedPrintable(String),

    /// Header block is not `Name: value` lines.
    #[error("Invalid MIME header: {0}")]
    InvalidHeader(String),

    /// Content-Type value has no `type/subtype`.
    #[error("Invalid content type: {0}")]
    InvalidContentType(String),
}
