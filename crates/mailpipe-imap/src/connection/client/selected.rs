//! Commands valid with a mailbox open.

use std::collections::HashSet;

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

use super::states::Selected;
use super::{Client, SelectError};
use crate::Result;
use crate::command::{Command, FetchAttribute};
use crate::connection::framed::is_tagged;
use crate::parser::{FetchItem, Response, ResponseParser, UntaggedResponse};
use crate::types::{ListResponse, SeqNum, SequenceSet};

impl<S> Client<S, Selected>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// The open mailbox.
    #[must_use]
    pub const fn selected(&self) -> &Selected {
        &self.state
    }

    /// Opens another mailbox read-write.
    ///
    /// On rejection the server has closed the previous mailbox, so the
    /// client comes back authenticated.
    pub async fn select(self, mailbox: &str) -> std::result::Result<Self, SelectError<S>> {
        self.open_mailbox(mailbox, false).await
    }

    /// Opens another mailbox read-only.
    pub async fn examine(self, mailbox: &str) -> std::result::Result<Self, SelectError<S>> {
        self.open_mailbox(mailbox, true).await
    }

    /// Lists mailboxes without leaving the selected state.
    pub async fn list(&mut self, reference: &str, pattern: &str) -> Result<Vec<ListResponse>> {
        self.list_inner(reference, pattern).await
    }

    /// Fetches `sequence` and hands each message to `on_message` as it arrives.
    ///
    /// Only messages inside `sequence` are delivered, once each. A message the
    /// server splits over several responses is merged before delivery;
    /// unsolicited FETCH lines for other messages are skipped. Untagged lines
    /// that fail to parse are skipped too. Returns the number of messages
    /// delivered.
    pub async fn fetch_each<F>(
        &mut self,
        sequence: SequenceSet,
        items: &[FetchAttribute],
        mut on_message: F,
    ) -> Result<usize>
    where
        F: FnMut(SeqNum, Vec<FetchItem>),
    {
        let tag = self
            .send(&Command::Fetch {
                sequence,
                items: items.to_vec(),
            })
            .await?;

        let mut delivered = HashSet::new();
        let mut pending: Option<(SeqNum, Vec<FetchItem>)> = None;
        loop {
            let response = self.read_response().await?;
            if is_tagged(&response, &tag) {
                Self::check_tagged_ok(std::slice::from_ref(&response), &tag)?;
                if let Some((seq, items)) = pending.take() {
                    on_message(seq, items);
                    delivered.insert(seq);
                }
                return Ok(delivered.len());
            }

            match ResponseParser::parse(&response) {
                Ok(Response::Untagged(UntaggedResponse::Fetch { seq, items })) => {
                    if !sequence.contains(seq) || delivered.contains(&seq) {
                        debug!(seq = seq.get(), "ignoring unrequested FETCH response");
                        continue;
                    }
                    if let Some((current, merged)) = pending.as_mut()
                        && *current == seq
                    {
                        merged.extend(items);
                    } else if let Some((done, done_items)) = pending.replace((seq, items)) {
                        on_message(done, done_items);
                        delivered.insert(done);
                    }
                }
                Ok(Response::Untagged(untagged)) => self.track(&untagged),
                Ok(_) => {}
                Err(e) => debug!(error = %e, "skipping unparseable FETCH line"),
            }
        }
    }

    /// Fetches `sequence` and collects the results.
    pub async fn fetch(
        &mut self,
        sequence: SequenceSet,
        items: &[FetchAttribute],
    ) -> Result<Vec<(SeqNum, Vec<FetchItem>)>> {
        let mut messages = Vec::new();
        self.fetch_each(sequence, items, |seq, items| messages.push((seq, items)))
            .await?;
        Ok(messages)
    }

    /// Sends NOOP and returns the message count if the server reported a change.
    pub async fn poll(&mut self) -> Result<Option<u32>> {
        let before = self.state.status.exists;
        let responses = self.run(&Command::Noop).await?;
        for bytes in &responses {
            if let Ok(Response::Untagged(untagged)) = ResponseParser::parse(bytes) {
                self.track(&untagged);
            }
        }
        let after = self.state.status.exists;
        Ok((after != before).then_some(after))
    }

    /// Applies unsolicited size updates to the cached status.
    pub(crate) fn track(&mut self, untagged: &UntaggedResponse) {
        match untagged {
            UntaggedResponse::Exists(n) => self.state.status.exists = *n,
            UntaggedResponse::Expunge(_) => {
                self.state.status.exists = self.state.status.exists.saturating_sub(1);
            }
            _ => {}
        }
    }
}
