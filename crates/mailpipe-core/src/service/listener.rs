//! Live mailbox listener.
//!
//! Holds one dedicated session in IDLE and forwards every message that
//! arrives as a [`StreamEvent::Email`], oldest first. The message count seen
//! at the last round is the snapshot; a change to `n > snapshot` fetches
//! `snapshot + 1 ..= n`.

use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::fetch::fetch_range;
use crate::Result;
use crate::email::StreamEvent;
use crate::pagination::SequenceRange;
use crate::session::{IdleOutcome, MailSession, StopSignal};

/// Pause before retrying IDLE after a non-fatal failure.
const RETRY_DELAY: Duration = Duration::from_secs(5);

/// Why the listener returned without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerExit {
    /// Shutdown or cancellation was requested.
    Stopped,
    /// The event receiver was dropped.
    ConsumerGone,
}

/// Watches one mailbox on a session it owns.
#[derive(Debug)]
pub struct Listener<S> {
    session: S,
    mailbox: String,
    renewal: Duration,
    events: mpsc::Sender<StreamEvent>,
    stop: StopSignal,
}

impl<S: MailSession> Listener<S> {
    /// Wraps a logged-in session.
    pub fn new(
        session: S,
        mailbox: impl Into<String>,
        renewal: Duration,
        events: mpsc::Sender<StreamEvent>,
        stop: StopSignal,
    ) -> Self {
        Self {
            session,
            mailbox: mailbox.into(),
            renewal,
            events,
            stop,
        }
    }

    /// Listens until stopped, then logs the session out.
    ///
    /// A dead connection ends the listener; the caller decides whether to
    /// subscribe again.
    pub async fn run(mut self, account: &str) -> Result<ListenerExit> {
        let outcome = self.listen().await;
        match &outcome {
            Ok(exit) => info!(account, mailbox = %self.mailbox, ?exit, "listener stopped"),
            Err(e) => warn!(account, mailbox = %self.mailbox, error = %e, "listener failed"),
        }

        if !outcome.as_ref().is_err_and(crate::Error::is_fatal) {
            let _ = self.session.logout().await;
        }
        outcome
    }

    async fn listen(&mut self) -> Result<ListenerExit> {
        let mut snapshot = self.session.select(&self.mailbox, false).await?;
        info!(mailbox = %self.mailbox, count = snapshot, "listening for new mail");

        loop {
            if self.events.is_closed() {
                return Ok(ListenerExit::ConsumerGone);
            }

            match self.session.idle(snapshot, self.renewal, &mut self.stop).await {
                Ok(IdleOutcome::Changed(count)) => {
                    if count > snapshot {
                        let range = SequenceRange {
                            from: snapshot + 1,
                            to: count,
                        };
                        if let Some(exit) = self.forward(range).await? {
                            return Ok(exit);
                        }
                    } else if count < snapshot {
                        debug!(mailbox = %self.mailbox, count, "messages removed");
                    }
                    snapshot = count;
                }
                Ok(IdleOutcome::Renewed) => debug!(mailbox = %self.mailbox, "IDLE renewed"),
                Ok(IdleOutcome::Stopped) => return Ok(ListenerExit::Stopped),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!(mailbox = %self.mailbox, error = %e, "IDLE round failed, retrying");
                    tokio::select! {
                        () = tokio::time::sleep(RETRY_DELAY) => {}
                        () = self.stop.stopped() => return Ok(ListenerExit::Stopped),
                    }
                }
            }
        }
    }

    /// Fetches and sends the new messages. A non-fatal fetch failure skips them.
    ///
    /// A full channel does not hold off a stop request.
    async fn forward(&mut self, range: SequenceRange) -> Result<Option<ListenerExit>> {
        info!(mailbox = %self.mailbox, new = range.len(), "new messages");

        let emails = match fetch_range(&mut self.session, range).await {
            Ok(emails) => emails,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!(mailbox = %self.mailbox, error = %e, "failed to fetch new messages");
                return Ok(None);
            }
        };

        for email in emails {
            tokio::select! {
                sent = self.events.send(StreamEvent::Email(Box::new(email))) => {
                    if sent.is_err() {
                        return Ok(Some(ListenerExit::ConsumerGone));
                    }
                }
                () = self.stop.stopped() => return Ok(Some(ListenerExit::Stopped)),
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio::sync::watch;

    use super::*;
    use crate::Error;
    use crate::testing::FakeSession;

    struct Harness {
        events: mpsc::Receiver<StreamEvent>,
        stop: watch::Sender<bool>,
        _engine: watch::Sender<bool>,
        listener: Listener<FakeSession>,
    }

    fn harness(session: FakeSession) -> Harness {
        harness_with_capacity(session, 16)
    }

    fn harness_with_capacity(session: FakeSession, capacity: usize) -> Harness {
        let (tx, rx) = mpsc::channel(capacity);
        let (engine_tx, engine_rx) = watch::channel(false);
        let (stop_tx, stop_rx) = watch::channel(false);
        let stop = StopSignal::new(engine_rx, stop_rx);
        Harness {
            events: rx,
            stop: stop_tx,
            _engine: engine_tx,
            listener: Listener::new(session, "INBOX", Duration::from_secs(1800), tx, stop),
        }
    }

    fn subject(event: &StreamEvent) -> &str {
        match event {
            StreamEvent::Email(email) => &email.subject,
            StreamEvent::Batch(_) => panic!("unexpected batch"),
        }
    }

    #[tokio::test]
    async fn test_forwards_new_messages_oldest_first() {
        let session = FakeSession::with_messages(5).script(Ok(IdleOutcome::Changed(7)));
        let log = Arc::clone(&session.log);
        let mut h = harness(session);

        let task = tokio::spawn(h.listener.run("user1@example.com"));

        assert_eq!(subject(&h.events.recv().await.unwrap()), "m6");
        assert_eq!(subject(&h.events.recv().await.unwrap()), "m7");

        h.stop.send_replace(true);
        assert_eq!(task.await.unwrap().unwrap(), ListenerExit::Stopped);
        assert!(h.events.recv().await.is_none());

        let calls = log.lock().unwrap().clone();
        assert_eq!(calls[0], "select INBOX rw");
        assert!(calls.contains(&"fetch 6:7".to_string()));
        assert_eq!(calls.last().unwrap(), "logout");
    }

    #[tokio::test]
    async fn test_expunge_moves_snapshot_down() {
        let session = FakeSession::with_messages(5)
            .script(Ok(IdleOutcome::Changed(3)))
            .script(Ok(IdleOutcome::Changed(4)));
        let mut h = harness(session);

        let task = tokio::spawn(h.listener.run("user1@example.com"));

        assert_eq!(subject(&h.events.recv().await.unwrap()), "m4");

        h.stop.send_replace(true);
        assert_eq!(task.await.unwrap().unwrap(), ListenerExit::Stopped);
    }

    #[tokio::test]
    async fn test_renewal_emits_nothing() {
        let session = FakeSession::with_messages(5)
            .script(Ok(IdleOutcome::Renewed))
            .script(Ok(IdleOutcome::Renewed));
        let log = Arc::clone(&session.log);
        let mut h = harness(session);

        let task = tokio::spawn(h.listener.run("user1@example.com"));
        while log.lock().unwrap().iter().filter(|c| *c == "idle").count() < 3 {
            tokio::task::yield_now().await;
        }

        h.stop.send_replace(true);
        assert_eq!(task.await.unwrap().unwrap(), ListenerExit::Stopped);
        assert!(h.events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_fatal_idle_error_ends_listener() {
        let logouts = Arc::new(AtomicUsize::new(0));
        let session = FakeSession::with_messages(5)
            .counting_logouts(Arc::clone(&logouts))
            .script(Err(Error::Idle(mailpipe_imap::Error::ConnectionClosed)));
        let mut h = harness(session);

        let err = h.listener.run("user1@example.com").await.unwrap_err();

        assert!(err.is_fatal());
        assert!(h.events.recv().await.is_none());
        assert_eq!(logouts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_fatal_idle_error_retries() {
        let session = FakeSession::with_messages(1)
            .script(Err(Error::Idle(mailpipe_imap::Error::Bad("IDLE".into()))))
            .script(Ok(IdleOutcome::Changed(2)));
        let mut h = harness(session);

        let task = tokio::spawn(h.listener.run("user1@example.com"));

        assert_eq!(subject(&h.events.recv().await.unwrap()), "m2");
        h.stop.send_replace(true);
        assert_eq!(task.await.unwrap().unwrap(), ListenerExit::Stopped);
    }

    #[tokio::test]
    async fn test_failed_delta_fetch_is_skipped() {
        let mut session = FakeSession::with_messages(1)
            .script(Ok(IdleOutcome::Changed(3)))
            .script(Ok(IdleOutcome::Changed(4)));
        session.fetch_errors.push_back(Error::Fetch {
            mailbox: "INBOX".into(),
            source: mailpipe_imap::Error::No("try later".into()),
        });
        let mut h = harness(session);

        let task = tokio::spawn(h.listener.run("user1@example.com"));

        // 2..=3 failed part-way and is dropped; 4 arrives on the next round.
        assert_eq!(subject(&h.events.recv().await.unwrap()), "m4");
        h.stop.send_replace(true);
        assert_eq!(task.await.unwrap().unwrap(), ListenerExit::Stopped);
    }

    #[tokio::test]
    async fn test_stop_while_channel_full() {
        let session = FakeSession::with_messages(5).script(Ok(IdleOutcome::Changed(7)));
        let log = Arc::clone(&session.log);
        let h = harness_with_capacity(session, 1);

        let task = tokio::spawn(h.listener.run("user1@example.com"));
        // m6 fills the channel and the send of m7 parks; nobody reads.
        while !log.lock().unwrap().contains(&"fetch 6:7".to_string()) {
            tokio::task::yield_now().await;
        }
        tokio::task::yield_now().await;

        h.stop.send_replace(true);
        let exit = tokio::time::timeout(Duration::from_secs(1), task).await;
        assert_eq!(exit.unwrap().unwrap().unwrap(), ListenerExit::Stopped);
        assert_eq!(log.lock().unwrap().last().unwrap(), "logout");
        drop(h.events);
    }

    #[tokio::test]
    async fn test_dropped_receiver_ends_listener() {
        let session = FakeSession::with_messages(1).script(Ok(IdleOutcome::Changed(3)));
        let h = harness(session);
        drop(h.events);

        let exit = h.listener.run("user1@example.com").await.unwrap();
        assert_eq!(exit, ListenerExit::ConsumerGone);
    }

    #[tokio::test]
    async fn test_select_failure_is_returned() {
        let session = FakeSession::with_messages(1);
        let (tx, _rx) = mpsc::channel(1);
        let (_e, engine_rx) = watch::channel(false);
        let (_s, stop_rx) = watch::channel(false);
        let listener = Listener::new(
            session,
            "Missing",
            Duration::from_secs(1),
            tx,
            StopSignal::new(engine_rx, stop_rx),
        );

        let err = listener.run("user1@example.com").await.unwrap_err();
        assert!(matches!(err, Error::Select { .. }));
    }
}
