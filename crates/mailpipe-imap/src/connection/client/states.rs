//! State markers.
//!
//! `Selected` carries the opened mailbox and its status.

use std::sync::Arc;

use crate::parser::{Response, ResponseParser, UntaggedResponse};
use crate::types::{MailboxStatus, ResponseCode};

/// Greeting received, not logged in.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotAuthenticated;

/// Logged in, no mailbox open.
#[derive(Debug, Clone, Copy, Default)]
pub struct Authenticated;

/// A mailbox is open.
#[derive(Debug, Clone)]
pub struct Selected {
    pub(crate) mailbox: Arc<str>,
    pub(crate) status: MailboxStatus,
}

impl Selected {
    /// Creates the state for `mailbox`.
    #[must_use]
    pub fn new(mailbox: impl Into<Arc<str>>, status: MailboxStatus) -> Self {
        Self {
            mailbox: mailbox.into(),
            status,
        }
    }

    /// Name of the open mailbox.
    #[must_use]
    pub fn mailbox(&self) -> &str {
        &self.mailbox
    }

    /// Status snapshot, kept current with EXISTS updates seen since opening.
    #[must_use]
    pub const fn status(&self) -> &MailboxStatus {
        &self.status
    }

    /// Message count.
    #[must_use]
    pub const fn exists(&self) -> u32 {
        self.status.exists
    }

    /// True when opened with EXAMINE or the server forced READ-ONLY.
    #[must_use]
    pub const fn is_read_only(&self) -> bool {
        self.status.read_only
    }
}

/// Collects the status data sent in reply to SELECT or EXAMINE.
pub(crate) fn parse_mailbox_status(responses: &[Vec<u8>]) -> MailboxStatus {
    let mut status = MailboxStatus::default();

    for bytes in responses {
        let code = match ResponseParser::parse(bytes) {
            Ok(Response::Untagged(UntaggedResponse::Exists(n))) => {
                status.exists = n;
                continue;
            }
            Ok(Response::Untagged(UntaggedResponse::Recent(n))) => {
                status.recent = n;
                continue;
            }
            Ok(Response::Untagged(UntaggedResponse::Flags(flags))) => {
                status.flags = flags;
                continue;
            }
            Ok(
                Response::Untagged(UntaggedResponse::Ok { code, .. })
                | Response::Tagged { code, .. },
            ) => code,
            _ => continue,
        };

        match code {
            Some(ResponseCode::UidValidity(v)) => status.uid_validity = Some(v),
            Some(ResponseCode::UidNext(uid)) => status.uid_next = Some(uid),
            Some(ResponseCode::ReadOnly) => status.read_only = true,
            Some(ResponseCode::ReadWrite) => status.read_only = false,
            _ => {}
        }
    }

    status
}
