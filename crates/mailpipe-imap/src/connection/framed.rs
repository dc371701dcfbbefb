//! Response framing.
//!
//! A response is a CRLF-terminated line, possibly interrupted by literals
//! (`{n}\r\n` followed by `n` raw bytes) after which the line continues.
//! [`FramedStream::read_response`] only consumes bytes once a whole response
//! is buffered, so it is cancel-safe and can sit inside `tokio::select!`.

#![allow(clippy::missing_errors_doc)]

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::{Error, Result};

const DEFAULT_BUFFER_SIZE: usize = 8192;

/// Longest line accepted between literals.
const MAX_LINE_LENGTH: usize = 1024 * 1024;

/// Largest literal accepted.
const MAX_LITERAL_SIZE: usize = 100 * 1024 * 1024;

/// Buffered transport that yields whole responses.
pub struct FramedStream<S> {
    stream: S,
    read_buf: BytesMut,
}

impl<S> FramedStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wraps a connected transport.
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            read_buf: BytesMut::with_capacity(DEFAULT_BUFFER_SIZE),
        }
    }

    /// Reads one complete response, literals included.
    pub async fn read_response(&mut self) -> Result<Vec<u8>> {
        loop {
            if let Some(len) = complete_response_len(&self.read_buf)? {
                return Ok(self.read_buf.split_to(len).to_vec());
            }

            self.read_buf.reserve(DEFAULT_BUFFER_SIZE);
            let n = self.stream.read_buf(&mut self.read_buf).await?;
            if n == 0 {
                return Err(Error::ConnectionClosed);
            }
        }
    }

    /// Writes a serialized command and flushes it.
    pub async fn write_command(&mut self, data: &[u8]) -> Result<()> {
        self.stream.write_all(data).await?;
        self.stream.flush().await?;
        Ok(())
    }

    /// Shuts the write half down.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.stream.shutdown().await?;
        Ok(())
    }

    /// Returns the transport.
    pub const fn get_ref(&self) -> &S {
        &self.stream
    }
}

/// Returns the length of the first complete response in `buf`, if any.
fn complete_response_len(buf: &[u8]) -> Result<Option<usize>> {
    let mut start = 0;

    loop {
        let rest = &buf[start..];
        let Some(pos) = find_crlf(rest) else {
            if rest.len() > MAX_LINE_LENGTH {
                return Err(Error::Protocol("line too long".to_string()));
            }
            return Ok(None);
        };
        if pos > MAX_LINE_LENGTH {
            return Err(Error::Protocol("line too long".to_string()));
        }

        let line_end = start + pos + 2;
        let Some(literal_len) = parse_literal_length(&buf[start..line_end]) else {
            return Ok(Some(line_end));
        };
        if literal_len > MAX_LITERAL_SIZE {
            return Err(Error::Protocol(format!(
                "literal too large: {literal_len} bytes (max {MAX_LITERAL_SIZE})"
            )));
        }

        start = line_end + literal_len;
        if start > buf.len() {
            return Ok(None);
        }
    }
}

fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\r\n")
}

/// Parses `{n}\r\n` or `{n+}\r\n` at the end of a line.
fn parse_literal_length(line: &[u8]) -> Option<usize> {
    let line = line.strip_suffix(b"\r\n")?;
    let line = line.strip_suffix(b"}")?;
    let line = line.strip_suffix(b"+").unwrap_or(line);
    let open = line.iter().rposition(|&b| b == b'{')?;
    let digits = &line[open + 1..];
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }
    std::str::from_utf8(digits).ok()?.parse().ok()
}

/// Returns true if `response` is the tagged completion for `tag`.
pub(crate) fn is_tagged(response: &[u8], tag: &str) -> bool {
    response
        .strip_prefix(tag.as_bytes())
        .is_some_and(|rest| rest.first() == Some(&b' '))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use tokio_test::io::Builder;

    use super::*;

    #[test]
    fn test_find_crlf() {
        assert_eq!(find_crlf(b"hello\r\n"), Some(5));
        assert_eq!(find_crlf(b"\r\n"), Some(0));
        assert_eq!(find_crlf(b"just\n"), None);
    }

    #[test]
    fn test_parse_literal_length() {
        assert_eq!(parse_literal_length(b"BODY[] {123}\r\n"), Some(123));
        assert_eq!(parse_literal_length(b"BODY[] {123+}\r\n"), Some(123));
        assert_eq!(parse_literal_length(b"{0}\r\n"), Some(0));
        assert_eq!(parse_literal_length(b"no literal\r\n"), None);
        assert_eq!(parse_literal_length(b"incomplete {123"), None);
        assert_eq!(parse_literal_length(b"wrong {abc}\r\n"), None);
        assert_eq!(parse_literal_length(b"empty {}\r\n"), None);
    }

    #[test]
    fn test_is_tagged() {
        assert!(is_tagged(b"A0001 OK done\r\n", "A0001"));
        assert!(!is_tagged(b"A00011 OK done\r\n", "A0001"));
        assert!(!is_tagged(b"* OK\r\n", "A0001"));
    }

    #[test]
    fn test_complete_response_len_waits_for_literal() {
        let partial = b"* 1 FETCH (BODY[] {5}\r\nhel";
        assert_eq!(complete_response_len(partial).unwrap(), None);

        let full = b"* 1 FETCH (BODY[] {5}\r\nhello)\r\n* 2 EXISTS\r\n";
        assert_eq!(
            complete_response_len(full).unwrap(),
            Some(b"* 1 FETCH (BODY[] {5}\r\nhello)\r\n".len())
        );
    }

    #[tokio::test]
    async fn test_read_simple_line() {
        let mock = Builder::new().read(b"* OK ready\r\n").build();
        let mut framed = FramedStream::new(mock);
        assert_eq!(framed.read_response().await.unwrap(), b"* OK ready\r\n");
    }

    #[tokio::test]
    async fn test_read_with_literal_split_across_reads() {
        let mock = Builder::new()
            .read(b"* 1 FETCH (BODY[] {5}\r\n")
            .read(b"hel")
            .read(b"lo)\r\n")
            .build();
        let mut framed = FramedStream::new(mock);

        let response = framed.read_response().await.unwrap();
        assert_eq!(response, b"* 1 FETCH (BODY[] {5}\r\nhello)\r\n");
    }

    #[tokio::test]
    async fn test_two_responses_in_one_read() {
        let mock = Builder::new()
            .read(b"* 3 EXISTS\r\nA0001 OK done\r\n")
            .build();
        let mut framed = FramedStream::new(mock);

        assert_eq!(framed.read_response().await.unwrap(), b"* 3 EXISTS\r\n");
        assert_eq!(framed.read_response().await.unwrap(), b"A0001 OK done\r\n");
    }

    #[tokio::test]
    async fn test_eof_is_connection_closed() {
        let mock = Builder::new().read(b"* OK partial").build();
        let mut framed = FramedStream::new(mock);
        assert!(matches!(
            framed.read_response().await,
            Err(Error::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn test_write_command() {
        let mock = Builder::new().write(b"A0001 NOOP\r\n").build();
        let mut framed = FramedStream::new(mock);
        framed.write_command(b"A0001 NOOP\r\n").await.unwrap();
    }

    #[tokio::test]
    async fn test_literal_too_large() {
        let header = format!("* 1 FETCH (BODY[] {{{}}}\r\n", MAX_LITERAL_SIZE + 1);
        let mock = Builder::new().read(header.as_bytes()).build();
        let mut framed = FramedStream::new(mock);

        let err = framed.read_response().await.unwrap_err();
        assert!(err.to_string().contains("literal too large"));
    }

    #[tokio::test]
    async fn test_line_too_long() {
        let long_line = "A".repeat(MAX_LINE_LENGTH + 100);
        let mock = Builder::new().read(long_line.as_bytes()).build();
        let mut framed = FramedStream::new(mock);

        let err = framed.read_response().await.unwrap_err();
        assert!(err.to_string().contains("line too long"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_read_keeps_partial_data() {
        let mock = Builder::new()
            .read(b"* 7 EXI")
            .wait(Duration::from_secs(10))
            .read(b"STS\r\n")
            .build();
        let mut framed = FramedStream::new(mock);

        let first = tokio::time::timeout(Duration::from_secs(1), framed.read_response()).await;
        assert!(first.is_err());

        assert_eq!(framed.read_response().await.unwrap(), b"* 7 EXISTS\r\n");
    }
}
