//! Command construction and wire serialization.

mod serialize;
mod tag_generator;
mod types;

use crate::types::{Mailbox, SequenceSet};

pub use tag_generator::TagGenerator;
pub use types::FetchAttribute;

use serialize::{write_astring, write_fetch_attributes};

/// A client command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `CAPABILITY`
    Capability,
    /// `NOOP`
    Noop,
    /// `LOGOUT`
    Logout,
    /// `LOGIN user pass`
    Login {
        /// Account name.
        username: String,
        /// Secret.
        password: String,
    },
    /// `SELECT mailbox` (read-write).
    Select {
        /// Mailbox to open.
        mailbox: Mailbox,
    },
    /// `EXAMINE mailbox` (read-only).
    Examine {
        /// Mailbox to open.
        mailbox: Mailbox,
    },
    /// `LIST reference pattern`
    List {
        /// Reference name, usually empty.
        reference: String,
        /// Pattern with `*`/`%` wildcards.
        pattern: String,
    },
    /// `FETCH set (items)` by sequence number.
    Fetch {
        /// Messages to fetch.
        sequence: SequenceSet,
        /// Data items to return.
        items: Vec<FetchAttribute>,
    },
    /// `IDLE`
    Idle,
    /// `DONE`, untagged continuation that ends IDLE.
    Done,
}

impl Command {
    /// Serializes the command with `tag`, including the trailing CRLF.
    ///
    /// `DONE` ignores the tag.
    #[must_use]
    pub fn serialize(&self, tag: &str) -> Vec<u8> {
        let mut buf = Vec::with_capacity(64);

        if !matches!(self, Self::Done) {
            buf.extend_from_slice(tag.as_bytes());
            buf.push(b' ');
        }

        match self {
            Self::Capability => buf.extend_from_slice(b"CAPABILITY"),
            Self::Noop => buf.extend_from_slice(b"NOOP"),
            Self::Logout => buf.extend_from_slice(b"LOGOUT"),
            Self::Idle => buf.extend_from_slice(b"IDLE"),
            Self::Done => buf.extend_from_slice(b"DONE"),
            Self::Login { username, password } => {
                buf.extend_from_slice(b"LOGIN ");
                write_astring(&mut buf, username);
                buf.push(b' ');
                write_astring(&mut buf, password);
            }
            Self::Select { mailbox } => {
                buf.extend_from_slice(b"SELECT ");
                write_astring(&mut buf, mailbox.as_str());
            }
            Self::Examine { mailbox } => {
                buf.extend_from_slice(b"EXAMINE ");
                write_astring(&mut buf, mailbox.as_str());
            }
            Self::List { reference, pattern } => {
                buf.extend_from_slice(b"LIST ");
                write_astring(&mut buf, reference);
                buf.push(b' ');
                write_astring(&mut buf, pattern);
            }
            Self::Fetch { sequence, items } => {
                buf.extend_from_slice(b"FETCH ");
                buf.extend_from_slice(sequence.to_string().as_bytes());
                buf.push(b' ');
                write_fetch_attributes(&mut buf, items);
            }
        }

        buf.extend_from_slice(b"\r\n");
        buf
    }

    /// Returns a redacted form for logging; LOGIN credentials are hidden.
    #[must_use]
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Capability => "CAPABILITY",
            Self::Noop => "NOOP",
            Self::Logout => "LOGOUT",
            Self::Login { .. } => "LOGIN",
            Self::Select { .. } => "SELECT",
            Self::Examine { .. } => "EXAMINE",
            Self::List { .. } => "LIST",
            Self::Fetch { .. } => "FETCH",
            Self::Idle => "IDLE",
            Self::Done => "DONE",
        }
    }
}
