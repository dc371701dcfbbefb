//! Commands valid once logged in.

use tokio::io::{AsyncRead, AsyncWrite};

use super::states::{Authenticated, Selected};
use super::{Client, SelectError};
use crate::Result;
use crate::types::ListResponse;

impl<S> Client<S, Authenticated>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Opens `mailbox` read-write.
    pub async fn select(self, mailbox: &str) -> std::result::Result<Client<S, Selected>, SelectError<S>> {
        self.open_mailbox(mailbox, false).await
    }

    /// Opens `mailbox` read-only.
    pub async fn examine(self, mailbox: &str) -> std::result::Result<Client<S, Selected>, SelectError<S>> {
        self.open_mailbox(mailbox, true).await
    }

    /// Lists mailboxes matching `pattern` under `reference`.
    pub async fn list(&mut self, reference: &str, pattern: &str) -> Result<Vec<ListResponse>> {
        self.list_inner(reference, pattern).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tokio_test::io::Builder;

    use super::*;

    #[tokio::test]
    async fn test_examine() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"A0000 EXAMINE INBOX\r\n")
            .read(b"* 45 EXISTS\r\n")
            .read(b"* OK [UIDVALIDITY 7] ok\r\n")
            .read(b"A0000 OK [READ-ONLY] done\r\n")
            .build();

        let client = Client::from_stream(mock).await.unwrap().into_state(Authenticated);
        let client = client.examine("INBOX").await.unwrap();

        assert_eq!(client.state.mailbox(), "INBOX");
        assert_eq!(client.state.exists(), 45);
        assert!(client.state.is_read_only());
    }

    #[tokio::test]
    async fn test_select_quotes_mailbox() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"A0000 SELECT \"Sent Items\"\r\n")
            .read(b"* 0 EXISTS\r\n")
            .read(b"A0000 OK [READ-WRITE] done\r\n")
            .build();

        let client = Client::from_stream(mock).await.unwrap().into_state(Authenticated);
        let client = client.select("Sent Items").await.unwrap();

        assert_eq!(client.state.exists(), 0);
        assert!(!client.state.is_read_only());
    }
}
