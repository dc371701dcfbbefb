//! The engine facade: pooled fetch and list, and live subscriptions.

use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::Result;
use crate::account::{Account, AccountStore};
use crate::config::EngineConfig;
use crate::email::{Email, StreamEvent, StreamRequest};
use crate::pool::{ConnectionManager, SharedSession};
use crate::service::{Listener, fetch_page, list_mailboxes};
use crate::session::{Connector, MailSession, StopSignal};

/// Entry point for consumers.
///
/// One-shot operations share a pooled session per account. Each
/// subscription gets its own session for IDLE.
pub struct Engine<C: Connector, A> {
    pool: ConnectionManager<C>,
    accounts: A,
    config: EngineConfig,
    shutdown: watch::Sender<bool>,
    listeners: Mutex<Vec<JoinHandle<()>>>,
}

impl<C: Connector, A> std::fmt::Debug for Engine<C, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<C: Connector, A: AccountStore> Engine<C, A> {
    /// Creates an engine with an empty pool.
    #[must_use]
    pub fn new(connector: C, accounts: A, config: EngineConfig) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            pool: ConnectionManager::new(connector),
            accounts,
            config,
            shutdown,
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// Session pool.
    #[must_use]
    pub const fn pool(&self) -> &ConnectionManager<C> {
        &self.pool
    }

    /// Account lookup.
    #[must_use]
    pub const fn accounts(&self) -> &A {
        &self.accounts
    }

    /// One page of `mailbox`, newest first.
    ///
    /// Pages past the end return only the oldest message; see
    /// [`fetch_page`](crate::service::fetch_page).
    ///
    /// # Errors
    ///
    /// Returns [`Error::AccountNotFound`](crate::Error::AccountNotFound), a
    /// connection error, or the select/fetch error. A fatal error evicts
    /// the account's session.
    pub async fn fetch(
        &self,
        email: &str,
        mailbox: &str,
        page_size: i64,
        page_number: i64,
    ) -> Result<Vec<Email>> {
        let account = self.accounts.by_email(email).await?;
        let page_size = self.page_size(page_size);
        let session = self.pool.get_session(&account).await?;

        let result = {
            let mut session = session.lock().await;
            fetch_page(&mut *session, mailbox, page_size, page_number).await
        };
        self.evict_if_dead(&account, &session, result).await
    }

    /// Mailbox names for the account.
    ///
    /// # Errors
    ///
    /// As [`fetch`](Self::fetch), with the LIST error.
    pub async fn list(&self, email: &str) -> Result<Vec<String>> {
        let account = self.accounts.by_email(email).await?;
        let session = self.pool.get_session(&account).await?;

        let result = {
            let mut session = session.lock().await;
            list_mailboxes(&mut *session).await
        };
        self.evict_if_dead(&account, &session, result).await
    }

    /// Starts a live feed: the requested page as one [`StreamEvent::Batch`],
    /// then one [`StreamEvent::Email`] per arrival.
    ///
    /// The feed ends when the subscription is dropped or cancelled, the
    /// engine shuts down, or the listener's connection dies.
    ///
    /// # Errors
    ///
    /// Returns the lookup, connection or initial fetch error. No listener
    /// is started in that case.
    pub async fn subscribe(&self, request: StreamRequest) -> Result<Subscription> {
        let account = self.accounts.by_email(&request.email).await?;
        let mut session = self.pool.connector().connect(&account).await?;

        let page_size = self.page_size(request.page_size);
        let initial =
            match fetch_page(&mut session, &request.mailbox, page_size, request.page_number).await
            {
                Ok(initial) => initial,
                Err(e) => {
                    let _ = session.logout().await;
                    return Err(e);
                }
            };

        let (events_tx, events) = mpsc::channel(self.config.channel_capacity.max(1));
        let (stop_tx, stop_rx) = watch::channel(false);
        let stop = StopSignal::new(self.shutdown.subscribe(), stop_rx);

        // The channel is fresh, so the first send cannot wait.
        let _ = events_tx.try_send(StreamEvent::Batch(initial));

        let listener = Listener::new(
            session,
            request.mailbox.clone(),
            self.config.idle_renewal,
            events_tx,
            stop,
        );
        let email = account.email;
        let handle = tokio::spawn(async move {
            let _ = listener.run(&email).await;
        });

        let mut listeners = self.listeners.lock().await;
        listeners.retain(|h| !h.is_finished());
        listeners.push(handle);
        debug!(mailbox = %request.mailbox, active = listeners.len(), "subscription started");

        Ok(Subscription {
            events,
            stop: stop_tx,
        })
    }

    /// Stops every listener, waits for them, and logs out pooled sessions.
    pub async fn shutdown(&self) {
        self.shutdown.send_replace(true);

        let listeners = std::mem::take(&mut *self.listeners.lock().await);
        for handle in listeners {
            if let Err(e) = handle.await {
                warn!(error = %e, "listener task panicked");
            }
        }

        self.pool.close_all().await;
        info!("engine stopped");
    }

    fn page_size(&self, requested: i64) -> i64 {
        if requested <= 0 {
            self.config.default_page_size
        } else {
            requested
        }
    }

    async fn evict_if_dead<T>(
        &self,
        account: &Account,
        session: &SharedSession<C::Session>,
        result: Result<T>,
    ) -> Result<T> {
        if let Err(e) = &result
            && e.is_fatal()
        {
            warn!(account = %account.email, error = %e, "session lost, evicting");
            self.pool.evict(account.id, session).await;
        }
        result
    }
}

/// Receiving end of [`Engine::subscribe`].
///
/// Dropping it stops the listener.
#[derive(Debug)]
pub struct Subscription {
    events: mpsc::Receiver<StreamEvent>,
    stop: watch::Sender<bool>,
}

impl Subscription {
    /// Next event, or `None` once the feed has ended.
    pub async fn next(&mut self) -> Option<StreamEvent> {
        self.events.recv().await
    }

    /// Asks the listener to stop. Buffered events can still be read.
    pub fn cancel(&self) {
        self.stop.send_replace(true);
    }
}
