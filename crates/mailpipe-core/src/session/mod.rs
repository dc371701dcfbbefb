//! The protocol capabilities the engine relies on.
//!
//! [`MailSession`] is what the pool, the fetch pipeline and the listener
//! drive; [`ImapSession`] implements it over a real connection and tests
//! substitute scripted fakes.

mod imap;

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;

pub use self::imap::{ImapConnector, ImapSession};
use crate::Result;
use crate::account::Account;
use crate::mapper::RawMessage;
use crate::pagination::SequenceRange;

/// How one IDLE round ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleOutcome {
    /// The server reported new or removed messages; carries the message count after the change.
    Changed(u32),
    /// The renewal period passed quietly and IDLE was terminated cleanly.
    Renewed,
    /// The stop signal fired and IDLE was terminated cleanly.
    Stopped,
}

/// An authenticated connection to one account.
///
/// A session runs one command at a time; callers serialize access.
pub trait MailSession: Send + 'static {
    /// Opens `mailbox` and returns its message count.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Select`](crate::Error::Select). A rejected mailbox
    /// leaves the session usable.
    fn select(
        &mut self,
        mailbox: &str,
        read_only: bool,
    ) -> impl Future<Output = Result<u32>> + Send;

    /// Fetches envelope, flags, UID and full body for `range` in the open
    /// mailbox, handing each message to `on_message` as it arrives, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Fetch`](crate::Error::Fetch) if the command fails
    /// part-way; messages already delivered should be discarded.
    fn fetch<F>(
        &mut self,
        range: SequenceRange,
        on_message: F,
    ) -> impl Future<Output = Result<usize>> + Send
    where
        F: FnMut(RawMessage) + Send;

    /// Names of all mailboxes (`LIST "" "*"`), in server order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::List`](crate::Error::List).
    fn list(&mut self) -> impl Future<Output = Result<Vec<String>>> + Send;

    /// Waits in IDLE for a mailbox change, the renewal period, or `stop`.
    ///
    /// `known` is the message count the caller last acted on. A count that
    /// already differs, for example from EXISTS data read during an earlier
    /// fetch, is reported as [`IdleOutcome::Changed`] instead of being held
    /// until the next server push.
    ///
    /// IDLE is always terminated before returning unless the connection died.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Idle`](crate::Error::Idle); check
    /// [`is_fatal`](crate::Error::is_fatal) to tell a dead session apart.
    fn idle(
        &mut self,
        known: u32,
        renewal: Duration,
        stop: &mut StopSignal,
    ) -> impl Future<Output = Result<IdleOutcome>> + Send;

    /// Logs out. The session is unusable afterwards.
    ///
    /// # Errors
    ///
    /// Returns the protocol error if LOGOUT could not be sent.
    fn logout(&mut self) -> impl Future<Output = Result<()>> + Send;
}

/// Opens sessions for accounts.
pub trait Connector: Send + Sync + 'static {
    /// Session type produced.
    type Session: MailSession;

    /// Dials and logs in.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connect`](crate::Error::Connect) or
    /// [`Error::Login`](crate::Error::Login) naming the account.
    fn connect(&self, account: &Account) -> impl Future<Output = Result<Self::Session>> + Send;
}

/// Fires when either the engine shuts down or the subscriber goes away.
///
/// A dropped sender counts as a stop.
#[derive(Debug, Clone)]
pub struct StopSignal {
    engine: watch::Receiver<bool>,
    subscriber: watch::Receiver<bool>,
}

impl StopSignal {
    /// Combines the engine-wide and per-subscription signals.
    #[must_use]
    pub const fn new(engine: watch::Receiver<bool>, subscriber: watch::Receiver<bool>) -> Self {
        Self { engine, subscriber }
    }

    /// True once a stop was requested or a sender was dropped.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        let fired = |rx: &watch::Receiver<bool>| *rx.borrow() || rx.has_changed().is_err();
        fired(&self.engine) || fired(&self.subscriber)
    }

    /// Resolves once [`is_stopped`](Self::is_stopped) holds. Cancel-safe.
    pub async fn stopped(&mut self) {
        while !self.is_stopped() {
            tokio::select! {
                _ = self.engine.changed() => {}
                _ = self.subscriber.changed() => {}
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_stop_signal_fires_on_send() {
        let (engine_tx, engine_rx) = watch::channel(false);
        let (_sub_tx, sub_rx) = watch::channel(false);
        let mut stop = StopSignal::new(engine_rx, sub_rx);
        assert!(!stop.is_stopped());

        engine_tx.send_replace(true);
        tokio::time::timeout(Duration::from_secs(1), stop.stopped())
            .await
            .unwrap();
        assert!(stop.is_stopped());
    }

    #[tokio::test]
    async fn test_stop_signal_fires_on_drop() {
        let (_engine_tx, engine_rx) = watch::channel(false);
        let (sub_tx, sub_rx) = watch::channel(false);
        let mut stop = StopSignal::new(engine_rx, sub_rx);

        drop(sub_tx);
        tokio::time::timeout(Duration::from_secs(1), stop.stopped())
            .await
            .unwrap();
        assert!(stop.is_stopped());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_signal_pending_until_fired() {
        let (_engine_tx, engine_rx) = watch::channel(false);
        let (_sub_tx, sub_rx) = watch::channel(false);
        let mut stop = StopSignal::new(engine_rx, sub_rx);

        let waited = tokio::time::timeout(Duration::from_secs(5), stop.stopped()).await;
        assert!(waited.is_err());
    }
}
