//! IDLE (RFC 2177).
//!
//! [`Client::idle`] sends `IDLE` and waits for the continuation. The returned
//! [`IdleHandle`] yields pushed events until [`IdleHandle::done`] sends `DONE`
//! and reads the completion. Servers drop idlers after roughly 30 minutes, so
//! callers re-issue IDLE on a shorter period.

#![allow(clippy::missing_errors_doc)]

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::{Instant, timeout_at};

use super::client::{Client, Selected, status_to_result};
use super::framed::is_tagged;
use crate::command::Command;
use crate::parser::{FetchItem, Response, ResponseParser, UntaggedResponse};
use crate::types::{Flags, SeqNum};
use crate::{Error, Result};

/// Something the server pushed while idling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdleEvent {
    /// Mailbox size changed.
    Exists(u32),
    /// A message was removed.
    Expunge(SeqNum),
    /// Flags of a message changed.
    Fetch {
        /// Message sequence number.
        seq: SeqNum,
        /// New flags.
        flags: Flags,
    },
    /// Recent count changed.
    Recent(u32),
    /// Untagged data with no bearing on the mailbox, such as `* OK Still here`.
    Other,
    /// The deadline passed first.
    Timeout,
}

/// An outstanding IDLE command.
///
/// Holds the client exclusively; no other command may run until
/// [`done`](Self::done) completes.
pub struct IdleHandle<'a, S> {
    client: &'a mut Client<S, Selected>,
    tag: String,
}

impl<S> IdleHandle<'_, S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Message count of the idling mailbox, including data pushed before the continuation.
    #[must_use]
    pub const fn exists(&self) -> u32 {
        self.client.state.status.exists
    }

    /// Waits up to `duration` for the next event.
    pub async fn wait(&mut self, duration: Duration) -> Result<IdleEvent> {
        self.wait_until(Instant::now() + duration).await
    }

    /// Waits until `deadline` for the next event.
    ///
    /// Cancel-safe: dropping the future loses no server data.
    pub async fn wait_until(&mut self, deadline: Instant) -> Result<IdleEvent> {
        let Ok(response) = timeout_at(deadline, self.client.stream.read_response()).await else {
            return Ok(IdleEvent::Timeout);
        };
        let event = self.parse_event(&response?)?;
        let status = &mut self.client.state.status;
        match event {
            IdleEvent::Exists(n) => status.exists = n,
            IdleEvent::Expunge(_) => status.exists = status.exists.saturating_sub(1),
            _ => {}
        }
        Ok(event)
    }

    fn parse_event(&self, response: &[u8]) -> Result<IdleEvent> {
        match ResponseParser::parse(response)? {
            Response::Untagged(untagged) => Ok(match untagged {
                UntaggedResponse::Exists(n) => IdleEvent::Exists(n),
                UntaggedResponse::Recent(n) => IdleEvent::Recent(n),
                UntaggedResponse::Expunge(seq) => IdleEvent::Expunge(seq),
                UntaggedResponse::Fetch { seq, items } => IdleEvent::Fetch {
                    seq,
                    flags: items
                        .into_iter()
                        .find_map(|item| match item {
                            FetchItem::Flags(flags) => Some(flags),
                            _ => None,
                        })
                        .unwrap_or_default(),
                },
                UntaggedResponse::Bye { text, .. } => return Err(Error::Bye(text)),
                _ => IdleEvent::Other,
            }),
            Response::Continuation { .. } => Err(Error::Protocol(
                "unexpected continuation during IDLE".to_string(),
            )),
            Response::Tagged { tag, status, text, .. } if tag.as_str() == self.tag => {
                // The server ended IDLE on its own; the session is no longer idling.
                status_to_result(status, text)?;
                Err(Error::InvalidState("server terminated IDLE".to_string()))
            }
            Response::Tagged { tag, .. } => Err(Error::Protocol(format!(
                "unexpected tag {tag} during IDLE"
            ))),
        }
    }

    /// Sends `DONE` and reads the completion of the IDLE command.
    ///
    /// Events arriving between `DONE` and the completion are applied to the
    /// cached mailbox status.
    pub async fn done(self) -> Result<()> {
        self.client
            .stream
            .write_command(&Command::Done.serialize(""))
            .await?;

        loop {
            let response = self.client.read_response().await?;
            if is_tagged(&response, &self.tag) {
                return Client::<S, Selected>::check_tagged_ok(
                    std::slice::from_ref(&response),
                    &self.tag,
                );
            }
            if let Ok(Response::Untagged(untagged)) = ResponseParser::parse(&response) {
                self.client.track(&untagged);
            }
        }
    }
}

impl<S> Client<S, Selected>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Starts IDLE and waits for the server's `+` continuation.
    pub async fn idle(&mut self) -> Result<IdleHandle<'_, S>> {
        let tag = self.send(&Command::Idle).await?;

        loop {
            let response = self.read_response().await?;
            match ResponseParser::parse(&response)? {
                Response::Continuation { .. } => break,
                Response::Tagged { status, text, .. } if is_tagged(&response, &tag) => {
                    status_to_result(status, text)?;
                    return Err(Error::Protocol(
                        "IDLE completed without continuation".to_string(),
                    ));
                }
                // Pending untagged data may precede the continuation.
                Response::Untagged(untagged) => self.track(&untagged),
                Response::Tagged { tag, .. } => {
                    return Err(Error::Protocol(format!("unexpected tag {tag} before IDLE")));
                }
            }
        }

        Ok(IdleHandle { client: self, tag })
    }
}
