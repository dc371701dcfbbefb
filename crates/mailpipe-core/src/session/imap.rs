//! [`MailSession`] over a live IMAP connection.

use std::mem;
use std::time::Duration;

use mailpipe_imap::{
    Authenticated, Client, FetchAttribute, IdleEvent, ImapStream, SelectError, Selected,
};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::{Connector, IdleOutcome, MailSession, StopSignal};
use crate::account::Account;
use crate::config::EngineConfig;
use crate::mapper::RawMessage;
use crate::pagination::SequenceRange;
use crate::{Error, Result};

enum State<S> {
    Authenticated(Client<S, Authenticated>),
    Selected(Client<S, Selected>),
    Closed,
}

/// An authenticated IMAP connection that moves between the authenticated
/// and selected states as commands require.
pub struct ImapSession<S = ImapStream> {
    account: String,
    poll_interval: Duration,
    state: State<S>,
}

impl<S> std::fmt::Debug for ImapSession<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match &self.state {
            State::Authenticated(_) => "authenticated",
            State::Selected(_) => "selected",
            State::Closed => "closed",
        };
        f.debug_struct("ImapSession")
            .field("account", &self.account)
            .field("state", &state)
            .finish_non_exhaustive()
    }
}

impl<S> ImapSession<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    /// Wraps a logged-in client.
    #[must_use]
    pub fn new(account: impl Into<String>, client: Client<S, Authenticated>) -> Self {
        Self {
            account: account.into(),
            poll_interval: EngineConfig::default().poll_interval,
            state: State::Authenticated(client),
        }
    }

    /// NOOP interval used when the server lacks IDLE.
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Account email this session belongs to.
    #[must_use]
    pub fn account(&self) -> &str {
        &self.account
    }

    /// Name of the open mailbox, if any.
    #[must_use]
    pub fn selected_mailbox(&self) -> Option<&str> {
        match &self.state {
            State::Selected(client) => Some(client.selected().mailbox()),
            _ => None,
        }
    }

    /// True after logout or a connection failure during select.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        matches!(self.state, State::Closed)
    }
}

fn closed() -> mailpipe_imap::Error {
    mailpipe_imap::Error::InvalidState("session is closed".to_string())
}

fn not_selected() -> mailpipe_imap::Error {
    mailpipe_imap::Error::InvalidState("no mailbox selected".to_string())
}

impl<S> MailSession for ImapSession<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    async fn select(&mut self, mailbox: &str, read_only: bool) -> Result<u32> {
        let opened = match mem::replace(&mut self.state, State::Closed) {
            State::Authenticated(client) if read_only => client.examine(mailbox).await,
            State::Authenticated(client) => client.select(mailbox).await,
            State::Selected(client) if read_only => client.examine(mailbox).await,
            State::Selected(client) => client.select(mailbox).await,
            State::Closed => Err(SelectError {
                client: None,
                error: closed(),
            }),
        };

        match opened {
            Ok(client) => {
                let count = client.selected().exists();
                debug!(account = %self.account, mailbox, count, read_only, "mailbox selected");
                self.state = State::Selected(client);
                Ok(count)
            }
            Err(SelectError { client, error }) => {
                if let Some(client) = client {
                    self.state = State::Authenticated(client);
                }
                Err(Error::Select {
                    mailbox: mailbox.to_string(),
                    source: error,
                })
            }
        }
    }

    async fn fetch<F>(&mut self, range: SequenceRange, mut on_message: F) -> Result<usize>
    where
        F: FnMut(RawMessage) + Send,
    {
        let State::Selected(client) = &mut self.state else {
            return Err(Error::Imap(not_selected()));
        };
        let mailbox = client.selected().mailbox().to_string();
        let Some(sequence) = range.to_sequence_set() else {
            return Ok(0);
        };

        client
            .fetch_each(sequence, &FetchAttribute::message(), |seq, items| {
                on_message(RawMessage::new(seq, items));
            })
            .await
            .map_err(|source| Error::Fetch { mailbox, source })
    }

    async fn list(&mut self) -> Result<Vec<String>> {
        let listed = match &mut self.state {
            State::Authenticated(client) => client.list("", "*").await,
            State::Selected(client) => client.list("", "*").await,
            State::Closed => Err(closed()),
        };

        listed
            .map(|entries| {
                entries
                    .into_iter()
                    .map(|entry| entry.mailbox.as_str().to_string())
                    .collect()
            })
            .map_err(|source| Error::List { source })
    }

    async fn idle(
        &mut self,
        known: u32,
        renewal: Duration,
        stop: &mut StopSignal,
    ) -> Result<IdleOutcome> {
        let poll_interval = self.poll_interval;
        let State::Selected(client) = &mut self.state else {
            return Err(Error::Idle(not_selected()));
        };
        if stop.is_stopped() {
            return Ok(IdleOutcome::Stopped);
        }

        let current = client.selected().exists();
        if current != known {
            debug!(account = %self.account, known, current, "count changed outside IDLE");
            return Ok(IdleOutcome::Changed(current));
        }

        let outcome = if client.supports_idle() {
            idle_round(client, known, renewal, stop).await?
        } else {
            poll_round(client, renewal, poll_interval, stop).await?
        };

        // EXISTS read while terminating a quiet round still counts.
        let current = client.selected().exists();
        Ok(match outcome {
            IdleOutcome::Renewed if current != known => IdleOutcome::Changed(current),
            other => other,
        })
    }

    async fn logout(&mut self) -> Result<()> {
        let result = match mem::replace(&mut self.state, State::Closed) {
            State::Authenticated(client) => client.logout().await,
            State::Selected(client) => client.logout().await,
            State::Closed => return Ok(()),
        };

        match &result {
            Ok(()) => info!(account = %self.account, "logged out"),
            Err(e) => warn!(account = %self.account, error = %e, "logout failed"),
        }
        result.map_err(Error::from)
    }
}

/// One IDLE command: wait for a size change, the deadline, or a stop, then DONE.
async fn idle_round<S>(
    client: &mut Client<S, Selected>,
    known: u32,
    renewal: Duration,
    stop: &mut StopSignal,
) -> Result<IdleOutcome>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let deadline = Instant::now() + renewal;
    let mut handle = client.idle().await.map_err(Error::Idle)?;

    // Size data sent ahead of the continuation ends the round at once.
    let outcome = loop {
        if handle.exists() != known {
            break None;
        }
        tokio::select! {
            event = handle.wait_until(deadline) => match event {
                Ok(IdleEvent::Exists(_) | IdleEvent::Expunge(_)) => break None,
                Ok(IdleEvent::Timeout) => break Some(IdleOutcome::Renewed),
                Ok(_) => {}
                Err(e) if e.is_fatal() => return Err(Error::Idle(e)),
                Err(e) => {
                    warn!(error = %e, "unexpected data while idling");
                    break Some(IdleOutcome::Renewed);
                }
            },
            () = stop.stopped() => break Some(IdleOutcome::Stopped),
        }
    };

    match handle.done().await {
        Ok(()) => {}
        Err(e) if e.is_fatal() => return Err(Error::Idle(e)),
        Err(e) => warn!(error = %e, "IDLE termination failed"),
    }

    // The count is read after DONE so changes reported during termination are included.
    Ok(outcome.unwrap_or_else(|| IdleOutcome::Changed(client.selected().exists())))
}

/// NOOP polling for servers without IDLE, bounded by the same renewal period.
async fn poll_round<S>(
    client: &mut Client<S, Selected>,
    renewal: Duration,
    interval: Duration,
    stop: &mut StopSignal,
) -> Result<IdleOutcome>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let deadline = Instant::now() + renewal;
    loop {
        let wake = (Instant::now() + interval).min(deadline);
        tokio::select! {
            () = tokio::time::sleep_until(wake) => {}
            () = stop.stopped() => return Ok(IdleOutcome::Stopped),
        }

        if let Some(count) = client.poll().await.map_err(Error::Idle)? {
            return Ok(IdleOutcome::Changed(count));
        }
        if Instant::now() >= deadline {
            return Ok(IdleOutcome::Renewed);
        }
    }
}

/// Dials accounts over TCP or implicit TLS and logs in.
#[derive(Debug, Clone, Default)]
pub struct ImapConnector {
    config: EngineConfig,
}

impl ImapConnector {
    /// Uses `config` for timeouts and the polling fallback.
    #[must_use]
    pub const fn new(config: EngineConfig) -> Self {
        Self { config }
    }
}

impl Connector for ImapConnector {
    type Session = ImapSession;

    async fn connect(&self, account: &Account) -> Result<ImapSession> {
        let config = account.imap_config(&self.config);
        let client = Client::connect(&config)
            .await
            .map_err(|source| Error::Connect {
                account: account.email.clone(),
                source,
            })?;
        let client = client
            .login(&account.email, &account.password)
            .await
            .map_err(|source| Error::Login {
                account: account.email.clone(),
                source,
            })?;

        info!(account = %account.email, host = %account.host, "logged in");
        Ok(ImapSession::new(&account.email, client).with_poll_interval(self.config.poll_interval))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use mailpipe_imap::NotAuthenticated;
    use tokio::sync::watch;
    use tokio_test::io::{Builder, Mock};

    use super::*;

    const GREETING: &[u8] = b"* OK [CAPABILITY IMAP4rev1 IDLE] ready\r\n";

    async fn session(mock: Mock) -> ImapSession<Mock> {
        let client: Client<Mock, NotAuthenticated> = Client::from_stream(mock).await.unwrap();
        let client = client.login("u@example.com", "pw").await.unwrap();
        ImapSession::new("u@example.com", client)
    }

    fn login(builder: &mut Builder) -> &mut Builder {
        builder
            .read(GREETING)
            .write(b"A0000 LOGIN u@example.com pw\r\n")
            .read(b"A0000 OK [CAPABILITY IMAP4rev1 IDLE] logged in\r\n")
    }

    fn stop() -> (watch::Sender<bool>, watch::Sender<bool>, StopSignal) {
        let (engine_tx, engine_rx) = watch::channel(false);
        let (sub_tx, sub_rx) = watch::channel(false);
        (engine_tx, sub_tx, StopSignal::new(engine_rx, sub_rx))
    }

    #[tokio::test]
    async fn test_rejected_select_keeps_session() {
        let mut builder = Builder::new();
        login(&mut builder)
            .write(b"A0001 EXAMINE Missing\r\n")
            .read(b"A0001 NO [NONEXISTENT] no such mailbox\r\n")
            .write(b"A0002 EXAMINE INBOX\r\n")
            .read(b"* 3 EXISTS\r\nA0002 OK [READ-ONLY] done\r\n");
        let mut session = session(builder.build()).await;

        let err = session.select("Missing", true).await.unwrap_err();
        assert!(matches!(&err, Error::Select { mailbox, .. } if mailbox == "Missing"));
        assert!(!err.is_fatal());
        assert!(!session.is_closed());

        assert_eq!(session.select("INBOX", true).await.unwrap(), 3);
        assert_eq!(session.selected_mailbox(), Some("INBOX"));
    }

    #[tokio::test]
    async fn test_fetch_requires_selected() {
        let mut builder = Builder::new();
        login(&mut builder);
        let mut session = session(builder.build()).await;

        let err = session
            .fetch(SequenceRange { from: 1, to: 2 }, |_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Imap(_)));
    }

    #[tokio::test]
    async fn test_fetch_streams_messages() {
        let mut builder = Builder::new();
        login(&mut builder)
            .write(b"A0001 EXAMINE INBOX\r\n")
            .read(b"* 2 EXISTS\r\nA0001 OK done\r\n")
            .write(b"A0002 FETCH 1:2 (UID FLAGS ENVELOPE BODY.PEEK[])\r\n")
            .read(b"* 1 FETCH (UID 10 FLAGS (\\Seen))\r\n")
            .read(b"* 2 FETCH (UID 11 FLAGS ())\r\n")
            .read(b"A0002 OK done\r\n");
        let mut session = session(builder.build()).await;
        session.select("INBOX", true).await.unwrap();

        let mut seen = Vec::new();
        let count = session
            .fetch(SequenceRange { from: 1, to: 2 }, |raw| seen.push(raw.seq.get()))
            .await
            .unwrap();
        assert_eq!(count, 2);
        assert_eq!(seen, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_list_names() {
        let mut builder = Builder::new();
        login(&mut builder)
            .write(b"A0001 LIST \"\" \"*\"\r\n")
            .read(b"* LIST (\\HasNoChildren) \"/\" INBOX\r\n")
            .read(b"* LIST (\\HasNoChildren) \"/\" \"Sent Items\"\r\n")
            .read(b"A0001 OK done\r\n");
        let mut session = session(builder.build()).await;

        assert_eq!(session.list().await.unwrap(), vec!["INBOX", "Sent Items"]);
    }

    #[tokio::test]
    async fn test_idle_reports_new_count() {
        let mut builder = Builder::new();
        login(&mut builder)
            .write(b"A0001 SELECT INBOX\r\n")
            .read(b"* 5 EXISTS\r\nA0001 OK [READ-WRITE] done\r\n")
            .write(b"A0002 IDLE\r\n")
            .read(b"+ idling\r\n")
            .read(b"* OK Still here\r\n")
            .read(b"* 7 EXISTS\r\n")
            .write(b"DONE\r\n")
            .read(b"A0002 OK IDLE terminated\r\n");
        let mut session = session(builder.build()).await;
        session.select("INBOX", false).await.unwrap();

        let (_e, _s, mut stop) = stop();
        let outcome = session
            .idle(5, Duration::from_secs(60), &mut stop)
            .await
            .unwrap();
        assert_eq!(outcome, IdleOutcome::Changed(7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_renews_after_quiet_period() {
        let mut builder = Builder::new();
        login(&mut builder)
            .write(b"A0001 SELECT INBOX\r\n")
            .read(b"* 5 EXISTS\r\nA0001 OK done\r\n")
            .write(b"A0002 IDLE\r\n")
            .read(b"+ idling\r\n")
            .write(b"DONE\r\n")
            .read(b"A0002 OK IDLE terminated\r\n");
        let mut session = session(builder.build()).await;
        session.select("INBOX", false).await.unwrap();

        let (_e, _s, mut stop) = stop();
        let outcome = session
            .idle(5, Duration::from_secs(30 * 60), &mut stop)
            .await
            .unwrap();
        assert_eq!(outcome, IdleOutcome::Renewed);
    }

    #[tokio::test]
    async fn test_idle_already_stopped_sends_nothing() {
        let mut builder = Builder::new();
        login(&mut builder)
            .write(b"A0001 SELECT INBOX\r\n")
            .read(b"* 5 EXISTS\r\nA0001 OK done\r\n");
        let mut session = session(builder.build()).await;
        session.select("INBOX", false).await.unwrap();

        let (engine_tx, _s, mut stop) = stop();
        engine_tx.send_replace(true);
        let outcome = session
            .idle(5, Duration::from_secs(60), &mut stop)
            .await
            .unwrap();
        assert_eq!(outcome, IdleOutcome::Stopped);
    }

    #[tokio::test]
    async fn test_idle_reports_exists_sent_before_continuation() {
        let mut builder = Builder::new();
        login(&mut builder)
            .write(b"A0001 SELECT INBOX\r\n")
            .read(b"* 5 EXISTS\r\nA0001 OK [READ-WRITE] done\r\n")
            .write(b"A0002 IDLE\r\n")
            .read(b"* 6 EXISTS\r\n+ idling\r\n")
            .write(b"DONE\r\n")
            .read(b"A0002 OK IDLE terminated\r\n");
        let mut session = session(builder.build()).await;
        session.select("INBOX", false).await.unwrap();

        let (_e, _s, mut stop) = stop();
        let outcome = session
            .idle(5, Duration::from_secs(60), &mut stop)
            .await
            .unwrap();
        assert_eq!(outcome, IdleOutcome::Changed(6));
    }

    #[tokio::test]
    async fn test_idle_reports_count_changed_since_last_round() {
        let mut builder = Builder::new();
        login(&mut builder)
            .write(b"A0001 SELECT INBOX\r\n")
            .read(b"* 5 EXISTS\r\nA0001 OK [READ-WRITE] done\r\n");
        let mut session = session(builder.build()).await;
        session.select("INBOX", false).await.unwrap();

        // No IDLE is written: the mock would fail on an unexpected write.
        let (_e, _s, mut stop) = stop();
        let outcome = session
            .idle(3, Duration::from_secs(60), &mut stop)
            .await
            .unwrap();
        assert_eq!(outcome, IdleOutcome::Changed(5));
    }

    #[tokio::test]
    async fn test_logout_closes() {
        let mut builder = Builder::new();
        login(&mut builder)
            .write(b"A0001 LOGOUT\r\n")
            .read(b"* BYE bye\r\nA0001 OK done\r\n");
        let mut session = session(builder.build()).await;

        session.logout().await.unwrap();
        assert!(session.is_closed());
        session.logout().await.unwrap();
        assert!(session.list().await.unwrap_err().is_fatal());
    }
}
