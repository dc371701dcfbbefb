//! Error types for the IMAP client.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while talking to an IMAP server.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error on the underlying socket.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TLS handshake or record-layer error.
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// Hostname cannot be used as a TLS server name.
    #[error("Invalid DNS name: {0}")]
    InvalidDnsName(#[from] rustls::pki_types::InvalidDnsNameError),

    /// Response could not be parsed.
    #[error("Parse error at position {position}: {message}")]
    Parse {
        /// Byte offset of the failure.
        position: usize,
        /// What went wrong.
        message: String,
    },

    /// LOGIN was rejected.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Server answered NO.
    #[error("Server returned NO: {0}")]
    No(String),

    /// Server answered BAD.
    #[error("Server returned BAD: {0}")]
    Bad(String),

    /// Server sent BYE and is closing the connection.
    #[error("Server sent BYE: {0}")]
    Bye(String),

    /// A round-trip did not finish in time.
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// Operation not valid in the current connection state.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Unexpected data on the wire.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Peer closed the connection.
    #[error("Connection closed by server")]
    ConnectionClosed,
}

impl Error {
    /// Returns true when the connection that produced this error is no longer usable.
    ///
    /// `NO`, `BAD` and parse errors leave the session in a known state and the
    /// caller may keep issuing commands.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Io(_)
                | Self::Tls(_)
                | Self::Bye(_)
                | Self::Timeout(_)
                | Self::ConnectionClosed
                | Self::InvalidState(_)
        )
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(Error::ConnectionClosed.is_fatal());
        assert!(Error::Bye("shutting down".into()).is_fatal());
        assert!(Error::Timeout(Duration::from_secs(1)).is_fatal());
        assert!(!Error::No("no such mailbox".into()).is_fatal());
        assert!(!Error::Bad("syntax".into()).is_fatal());
        assert!(
            !Error::Parse {
                position: 3,
                message: "bad atom".into()
            }
            .is_fatal()
        );
    }
}
