//! Error types for the engine.

use thiserror::Error;

/// Errors that can occur in engine operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Dialing the server or the TLS handshake failed.
    #[error("Failed to connect account {account}: {source}")]
    Connect {
        /// Account email.
        account: String,
        /// Protocol error.
        source: mailpipe_imap::Error,
    },

    /// The server rejected the credentials or the connection dropped during login.
    #[error("Failed to log in account {account}: {source}")]
    Login {
        /// Account email.
        account: String,
        /// Protocol error.
        source: mailpipe_imap::Error,
    },

    /// SELECT or EXAMINE failed.
    #[error("Failed to select mailbox {mailbox}: {source}")]
    Select {
        /// Mailbox name.
        mailbox: String,
        /// Protocol error.
        source: mailpipe_imap::Error,
    },

    /// FETCH failed.
    #[error("Failed to fetch from {mailbox}: {source}")]
    Fetch {
        /// Mailbox name.
        mailbox: String,
        /// Protocol error.
        source: mailpipe_imap::Error,
    },

    /// LIST failed.
    #[error("Failed to list mailboxes: {source}")]
    List {
        /// Protocol error.
        source: mailpipe_imap::Error,
    },

    /// IDLE could not be started or its connection died.
    #[error("IDLE failed: {0}")]
    Idle(#[source] mailpipe_imap::Error),

    /// Account not found.
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Any other protocol error.
    #[error("IMAP error: {0}")]
    Imap(#[from] mailpipe_imap::Error),
}

impl Error {
    /// The protocol error underneath, if any.
    #[must_use]
    pub const fn imap(&self) -> Option<&mailpipe_imap::Error> {
        match self {
            Self::Connect { source, .. }
            | Self::Login { source, .. }
            | Self::Select { source, .. }
            | Self::Fetch { source, .. }
            | Self::List { source }
            | Self::Idle(source)
            | Self::Imap(source) => Some(source),
            Self::AccountNotFound(_) | Self::Config(_) => None,
        }
    }

    /// Returns true when the session that produced this error must be discarded.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Connect { .. })
            || self.imap().is_some_and(mailpipe_imap::Error::is_fatal)
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_follows_protocol_error() {
        let rejected = Error::Select {
            mailbox: "Nope".into(),
            source: mailpipe_imap::Error::No("no such mailbox".into()),
        };
        assert!(!rejected.is_fatal());
        assert_eq!(
            rejected.to_string(),
            "Failed to select mailbox Nope: Server returned NO: no such mailbox"
        );

        let dropped = Error::Fetch {
            mailbox: "INBOX".into(),
            source: mailpipe_imap::Error::ConnectionClosed,
        };
        assert!(dropped.is_fatal());
        assert!(!Error::AccountNotFound("a@b".into()).is_fatal());
    }
}
