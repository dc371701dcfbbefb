//! Scripted session fake for engine tests.

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use mailpipe_imap::{Envelope, FetchItem, SeqNum, Uid};

use crate::account::{Account, AccountId};
use crate::mapper::RawMessage;
use crate::pagination::SequenceRange;
use crate::session::{Connector, IdleOutcome, MailSession, StopSignal};
use crate::{Error, Result};

pub fn account(id: u64) -> Account {
    Account {
        id: AccountId::new(id),
        email: format!("user{id}@example.com"),
        password: "secret".into(),
        host: "imap.example.com".into(),
        port: None,
        secure: true,
    }
}

/// Message `seq` has UID `100 + seq` and subject `m<seq>`.
pub fn raw_message(seq: u32) -> RawMessage {
    RawMessage::new(
        SeqNum::new(seq).unwrap(),
        vec![
            FetchItem::Uid(Uid::new(100 + seq).unwrap()),
            FetchItem::Envelope(Box::new(Envelope {
                subject: Some(format!("m{seq}")),
                ..Envelope::default()
            })),
            FetchItem::Body {
                section: String::new(),
                data: Some(format!("Subject: m{seq}\r\n\r\nbody {seq}").into_bytes()),
            },
        ],
    )
}

/// In-memory mailbox with scripted IDLE outcomes.
///
/// Every call is appended to `log` as a short string such as `fetch 3:5`.
#[derive(Debug)]
pub struct FakeSession {
    pub count: u32,
    pub mailboxes: Vec<String>,
    pub idle_script: VecDeque<Result<IdleOutcome>>,
    pub fetch_errors: VecDeque<Error>,
    pub log: Arc<Mutex<Vec<String>>>,
    logouts: Option<Arc<AtomicUsize>>,
    selected: bool,
    closed: bool,
}

impl FakeSession {
    pub fn with_messages(count: u32) -> Self {
        Self {
            count,
            mailboxes: vec!["INBOX".into(), "Sent".into()],
            idle_script: VecDeque::new(),
            fetch_errors: VecDeque::new(),
            log: Arc::default(),
            logouts: None,
            selected: false,
            closed: false,
        }
    }

    pub fn counting_logouts(mut self, counter: Arc<AtomicUsize>) -> Self {
        self.logouts = Some(counter);
        self
    }

    pub fn script(mut self, outcome: Result<IdleOutcome>) -> Self {
        self.idle_script.push_back(outcome);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.log.lock().unwrap().push(call);
    }

    fn check_open(&self) -> Result<()> {
        if self.closed {
            return Err(Error::Imap(mailpipe_imap::Error::ConnectionClosed));
        }
        Ok(())
    }
}

impl MailSession for FakeSession {
    async fn select(&mut self, mailbox: &str, read_only: bool) -> Result<u32> {
        self.record(format!("select {mailbox} {}", if read_only { "ro" } else { "rw" }));
        self.check_open()?;
        if !self.mailboxes.iter().any(|m| m == mailbox) {
            self.selected = false;
            return Err(Error::Select {
                mailbox: mailbox.to_string(),
                source: mailpipe_imap::Error::No("no such mailbox".into()),
            });
        }
        self.selected = true;
        Ok(self.count)
    }

    async fn fetch<F>(&mut self, range: SequenceRange, mut on_message: F) -> Result<usize>
    where
        F: FnMut(RawMessage) + Send,
    {
        self.record(format!("fetch {}:{}", range.from, range.to));
        self.check_open()?;
        assert!(self.selected, "fetch without a selected mailbox");
        assert!(range.from >= 1 && range.to <= self.count, "range outside mailbox");

        let mut delivered = 0;
        for seq in range.from..=range.to {
            // Fail after the first message to exercise discard of partial results.
            if delivered == 1
                && let Some(err) = self.fetch_errors.pop_front()
            {
                return Err(err);
            }
            on_message(raw_message(seq));
            delivered += 1;
        }
        Ok(delivered)
    }

    async fn list(&mut self) -> Result<Vec<String>> {
        self.record("list".into());
        self.check_open()?;
        Ok(self.mailboxes.clone())
    }

    async fn idle(
        &mut self,
        _known: u32,
        _renewal: Duration,
        stop: &mut StopSignal,
    ) -> Result<IdleOutcome> {
        self.record("idle".into());
        self.check_open()?;
        if stop.is_stopped() {
            return Ok(IdleOutcome::Stopped);
        }
        match self.idle_script.pop_front() {
            Some(Ok(IdleOutcome::Changed(count))) => {
                self.count = count;
                Ok(IdleOutcome::Changed(count))
            }
            Some(scripted) => scripted,
            None => {
                stop.stopped().await;
                Ok(IdleOutcome::Stopped)
            }
        }
    }

    async fn logout(&mut self) -> Result<()> {
        self.record("logout".into());
        if !self.closed {
            self.closed = true;
            if let Some(counter) = &self.logouts {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        }
        Ok(())
    }
}

/// Hands out pre-built sessions in order, then fails with a login error.
#[derive(Debug)]
pub struct ScriptedConnector {
    pub sessions: Mutex<VecDeque<FakeSession>>,
}

impl ScriptedConnector {
    pub fn new(sessions: impl IntoIterator<Item = FakeSession>) -> Self {
        Self {
            sessions: Mutex::new(sessions.into_iter().collect()),
        }
    }
}

impl Connector for ScriptedConnector {
    type Session = FakeSession;

    async fn connect(&self, account: &Account) -> Result<FakeSession> {
        let next = self.sessions.lock().unwrap().pop_front();
        next.ok_or_else(|| Error::Login {
            account: account.email.clone(),
            source: mailpipe_imap::Error::Auth("no more scripted sessions".into()),
        })
    }
}
