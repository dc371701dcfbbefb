//! Type-state client.
//!
//! - `NotAuthenticated`: after the greeting
//! - `Authenticated`: after LOGIN
//! - `Selected`: after SELECT or EXAMINE
//!
//! Each state only exposes the commands valid in it.

#![allow(clippy::missing_errors_doc)]

mod authenticated;
mod not_authenticated;
mod selected;
mod states;

use std::fmt;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, trace};

pub use self::states::{Authenticated, NotAuthenticated, Selected};
use super::framed::{FramedStream, is_tagged};
use crate::command::{Command, TagGenerator};
use crate::parser::{Response, ResponseParser, UntaggedResponse};
use crate::types::{Capability, ListResponse, Mailbox, ResponseCode, Status};
use crate::{Error, Result};

/// Default limit on waiting for a single response.
pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(300);

/// IMAP connection in state `State`.
pub struct Client<S, State> {
    pub(crate) stream: FramedStream<S>,
    pub(crate) tag_gen: TagGenerator,
    pub(crate) capabilities: Vec<Capability>,
    pub(crate) io_timeout: Duration,
    pub(crate) state: State,
}

impl<S, State: fmt::Debug> fmt::Debug for Client<S, State> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("tag_gen", &self.tag_gen)
            .field("capabilities", &self.capabilities)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// SELECT or EXAMINE failed.
///
/// When the server merely rejected the mailbox the connection is still good
/// and comes back in the authenticated state.
pub struct SelectError<S> {
    /// The client, unless the connection died.
    pub client: Option<Client<S, Authenticated>>,
    /// What went wrong.
    pub error: Error,
}

impl<S> fmt::Debug for SelectError<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectError")
            .field("usable", &self.client.is_some())
            .field("error", &self.error)
            .finish()
    }
}

impl<S> From<SelectError<S>> for Error {
    fn from(err: SelectError<S>) -> Self {
        err.error
    }
}

impl<S, State> Client<S, State>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Server capabilities as last reported.
    #[must_use]
    pub fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    /// Checks for a capability.
    #[must_use]
    pub fn has_capability(&self, cap: &Capability) -> bool {
        self.capabilities.contains(cap)
    }

    /// Returns true if the server advertises IDLE (RFC 2177).
    #[must_use]
    pub fn supports_idle(&self) -> bool {
        self.has_capability(&Capability::Idle)
    }

    /// Per-response timeout.
    #[must_use]
    pub const fn io_timeout(&self) -> Duration {
        self.io_timeout
    }

    /// Replaces the per-response timeout.
    #[must_use]
    pub const fn with_io_timeout(mut self, timeout: Duration) -> Self {
        self.io_timeout = timeout;
        self
    }

    /// Sends NOOP.
    pub async fn noop(&mut self) -> Result<()> {
        self.run(&Command::Noop).await.map(drop)
    }

    /// Sends CAPABILITY and stores the result.
    pub async fn capability(&mut self) -> Result<Vec<Capability>> {
        let responses = self.run(&Command::Capability).await?;
        for bytes in &responses {
            if let Ok(Response::Untagged(UntaggedResponse::Capability(caps))) =
                ResponseParser::parse(bytes)
            {
                self.capabilities = caps;
            }
        }
        Ok(self.capabilities.clone())
    }

    /// Ends the session with LOGOUT and closes the transport.
    pub async fn logout(mut self) -> Result<()> {
        let outcome = match self.run(&Command::Logout).await {
            // BYE may be followed by the server hanging up before the tagged OK.
            Err(Error::ConnectionClosed) => Ok(()),
            other => other.map(drop),
        };
        let _ = self.stream.shutdown().await;
        outcome
    }

    /// Sends `command` and returns its tag.
    pub(crate) async fn send(&mut self, command: &Command) -> Result<String> {
        let tag = self.tag_gen.next_tag();
        trace!(tag = %tag, command = command.describe(), "sending");
        self.stream.write_command(&command.serialize(&tag)).await?;
        Ok(tag)
    }

    /// Reads one response within the I/O timeout.
    pub(crate) async fn read_response(&mut self) -> Result<Vec<u8>> {
        let limit = self.io_timeout;
        tokio::time::timeout(limit, self.stream.read_response())
            .await
            .map_err(|_| Error::Timeout(limit))?
    }

    /// Reads responses up to and including the tagged completion for `tag`.
    pub(crate) async fn read_until_tagged(&mut self, tag: &str) -> Result<Vec<Vec<u8>>> {
        let mut responses = Vec::new();
        loop {
            let response = self.read_response().await?;
            let done = is_tagged(&response, tag);
            responses.push(response);
            if done {
                return Ok(responses);
            }
        }
    }

    /// Sends `command`, collects its responses and checks the completion.
    pub(crate) async fn run(&mut self, command: &Command) -> Result<Vec<Vec<u8>>> {
        let tag = self.send(command).await?;
        let responses = self.read_until_tagged(&tag).await?;
        Self::check_tagged_ok(&responses, &tag)?;
        Ok(responses)
    }

    /// Maps the tagged completion for `tag` to a result.
    pub(crate) fn check_tagged_ok(responses: &[Vec<u8>], tag: &str) -> Result<()> {
        for bytes in responses.iter().rev() {
            if let Ok(Response::Tagged {
                tag: resp_tag,
                status,
                text,
                ..
            }) = ResponseParser::parse(bytes)
                && resp_tag.as_str() == tag
            {
                return status_to_result(status, text);
            }
        }
        Err(Error::Protocol("missing tagged response".to_string()))
    }

    pub(crate) fn into_state<T>(self, state: T) -> Client<S, T> {
        Client {
            stream: self.stream,
            tag_gen: self.tag_gen,
            capabilities: self.capabilities,
            io_timeout: self.io_timeout,
            state,
        }
    }

    /// Shared by the authenticated and selected states.
    async fn list_inner(&mut self, reference: &str, pattern: &str) -> Result<Vec<ListResponse>> {
        let responses = self
            .run(&Command::List {
                reference: reference.to_string(),
                pattern: pattern.to_string(),
            })
            .await?;

        let mut mailboxes = Vec::new();
        for bytes in &responses {
            match ResponseParser::parse(bytes) {
                Ok(Response::Untagged(UntaggedResponse::List(item))) => mailboxes.push(item),
                Ok(_) => {}
                Err(e) => debug!(error = %e, "skipping unparseable LIST line"),
            }
        }
        Ok(mailboxes)
    }

    /// Shared by the authenticated and selected states.
    async fn open_mailbox(
        mut self,
        mailbox: &str,
        read_only: bool,
    ) -> std::result::Result<Client<S, Selected>, SelectError<S>> {
        let command = if read_only {
            Command::Examine {
                mailbox: Mailbox::new(mailbox),
            }
        } else {
            Command::Select {
                mailbox: Mailbox::new(mailbox),
            }
        };

        match self.run(&command).await {
            Ok(responses) => {
                let mut status = states::parse_mailbox_status(&responses);
                status.read_only |= read_only;
                debug!(
                    mailbox,
                    exists = status.exists,
                    read_only = status.read_only,
                    "opened mailbox"
                );
                Ok(self.into_state(Selected::new(mailbox, status)))
            }
            Err(error) if error.is_fatal() => Err(SelectError {
                client: None,
                error,
            }),
            Err(error) => Err(SelectError {
                client: Some(self.into_state(Authenticated)),
                error,
            }),
        }
    }
}

pub(crate) fn status_to_result(status: Status, text: String) -> Result<()> {
    match status {
        Status::Ok | Status::PreAuth => Ok(()),
        Status::No => Err(Error::No(text)),
        Status::Bad => Err(Error::Bad(text)),
        Status::Bye => Err(Error::Bye(text)),
    }
}

/// Pulls a capability list out of a response code, if present.
pub(crate) fn code_capabilities(code: Option<ResponseCode>) -> Option<Vec<Capability>> {
    match code {
        Some(ResponseCode::Capability(caps)) => Some(caps),
        _ => None,
    }
}
