//! Pool of authenticated sessions, one per account.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::Result;
use crate::account::{Account, AccountId};
use crate::session::{Connector, MailSession};

/// A pooled session. Lock it for the duration of one operation.
pub type SharedSession<S> = Arc<Mutex<S>>;

/// Creates sessions on first use and hands out the same one afterwards.
///
/// Lookups take the read lock; insertion and eviction take the write lock.
/// Dialing happens with no lock held. When two callers race to create a
/// session for the same account, the first one inserted is kept and the
/// other is logged out.
pub struct ConnectionManager<C: Connector> {
    connector: C,
    sessions: RwLock<HashMap<AccountId, SharedSession<C::Session>>>,
}

impl<C: Connector> std::fmt::Debug for ConnectionManager<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager").finish_non_exhaustive()
    }
}

impl<C: Connector> ConnectionManager<C> {
    /// Creates an empty pool.
    #[must_use]
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// The connector, for opening sessions that must stay outside the pool.
    #[must_use]
    pub const fn connector(&self) -> &C {
        &self.connector
    }

    /// Returns the pooled session for `account`, dialing and logging in on a miss.
    ///
    /// # Errors
    ///
    /// Returns the connect or login error; nothing is inserted on failure.
    pub async fn get_session(&self, account: &Account) -> Result<SharedSession<C::Session>> {
        if let Some(session) = self.sessions.read().await.get(&account.id) {
            return Ok(Arc::clone(session));
        }

        let session = self.connector.connect(account).await?;

        let mut sessions = self.sessions.write().await;
        if let Some(existing) = sessions.get(&account.id) {
            let existing = Arc::clone(existing);
            drop(sessions);
            debug!(account = %account.email, "lost session creation race, logging out");
            let mut duplicate = session;
            // The session logs its own logout outcome.
            let _ = duplicate.logout().await;
            return Ok(existing);
        }

        let shared = Arc::new(Mutex::new(session));
        sessions.insert(account.id, Arc::clone(&shared));
        Ok(shared)
    }

    /// Number of pooled sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// True when no session is pooled.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Removes `session` from the pool and logs it out. The next access redials.
    ///
    /// Only the exact session handed out is removed: if another caller has
    /// already evicted it and pooled a replacement, the replacement stays
    /// and false is returned.
    pub async fn evict(&self, id: AccountId, session: &SharedSession<C::Session>) -> bool {
        let mut sessions = self.sessions.write().await;
        if !sessions
            .get(&id)
            .is_some_and(|pooled| Arc::ptr_eq(pooled, session))
        {
            return false;
        }
        sessions.remove(&id);
        drop(sessions);

        debug!(account = %id, "evicting session");
        let _ = session.lock().await.logout().await;
        true
    }

    /// Logs out every pooled session and empties the pool.
    pub async fn close_all(&self) {
        let sessions = std::mem::take(&mut *self.sessions.write().await);

        for (id, session) in sessions {
            match session.lock().await.logout().await {
                Ok(()) => info!(account = %id, "session closed"),
                Err(e) => warn!(account = %id, error = %e, "session closed uncleanly"),
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::Error;
    use crate::testing::{FakeSession, account};

    #[derive(Default)]
    struct CountingConnector {
        dials: AtomicUsize,
        logouts: Arc<AtomicUsize>,
        fail: bool,
    }

    impl Connector for CountingConnector {
        type Session = FakeSession;

        async fn connect(&self, account: &Account) -> Result<FakeSession> {
            self.dials.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            if self.fail {
                return Err(Error::Login {
                    account: account.email.clone(),
                    source: mailpipe_imap::Error::Auth("bad password".into()),
                });
            }
            Ok(FakeSession::with_messages(3).counting_logouts(Arc::clone(&self.logouts)))
        }
    }

    #[tokio::test]
    async fn test_reuses_session() {
        let pool = ConnectionManager::new(CountingConnector::default());
        let acct = account(1);

        let first = pool.get_session(&acct).await.unwrap();
        let second = pool.get_session(&acct).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(pool.connector().dials.load(Ordering::SeqCst), 1);

        // Two fetches on the reused session without another login.
        for _ in 0..2 {
            let mut session = second.lock().await;
            session.select("INBOX", true).await.unwrap();
        }
        assert_eq!(pool.len().await, 1);
    }

    #[tokio::test]
    async fn test_failed_login_not_pooled() {
        let pool = ConnectionManager::new(CountingConnector {
            fail: true,
            ..CountingConnector::default()
        });

        let err = pool.get_session(&account(1)).await.unwrap_err();
        assert!(matches!(err, Error::Login { ref account, .. } if account == "user1@example.com"));
        assert!(pool.is_empty().await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_race_keeps_one_and_logs_out_rest() {
        let pool = Arc::new(ConnectionManager::new(CountingConnector::default()));
        let acct = account(1);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let pool = Arc::clone(&pool);
                let acct = acct.clone();
                tokio::spawn(async move { pool.get_session(&acct).await.unwrap() })
            })
            .collect();

        let mut sessions = Vec::new();
        for handle in handles {
            sessions.push(handle.await.unwrap());
        }

        assert!(sessions.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        let dials = pool.connector().dials.load(Ordering::SeqCst);
        let logouts = pool.connector().logouts.load(Ordering::SeqCst);
        assert_eq!(logouts, dials - 1);
    }

    #[tokio::test]
    async fn test_evict_and_close_all() {
        let pool = ConnectionManager::new(CountingConnector::default());
        let first = pool.get_session(&account(1)).await.unwrap();
        pool.get_session(&account(2)).await.unwrap();

        assert!(pool.evict(AccountId(1), &first).await);
        assert!(!pool.evict(AccountId(1), &first).await);
        assert_eq!(pool.len().await, 1);

        pool.get_session(&account(1)).await.unwrap();
        assert_eq!(pool.connector().dials.load(Ordering::SeqCst), 3);

        pool.close_all().await;
        assert!(pool.is_empty().await);
        assert_eq!(pool.connector().logouts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_stale_evict_keeps_replacement() {
        let pool = ConnectionManager::new(CountingConnector::default());
        let acct = account(1);

        // Two callers fail on the same dead session; the first evicts it and
        // redials before the second reports its failure.
        let dead = pool.get_session(&acct).await.unwrap();
        assert!(pool.evict(acct.id, &dead).await);
        let replacement = pool.get_session(&acct).await.unwrap();

        assert!(!pool.evict(acct.id, &dead).await);
        assert_eq!(pool.len().await, 1);
        assert!(Arc::ptr_eq(&replacement, &pool.get_session(&acct).await.unwrap()));
        assert_eq!(pool.connector().logouts.load(Ordering::SeqCst), 1);
        assert_eq!(pool.connector().dials.load(Ordering::SeqCst), 2);
    }
}
