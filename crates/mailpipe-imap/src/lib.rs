//! # mailpipe-imap
//!
//! Async IMAP4rev1 client covering what a mail retrieval engine needs:
//! LOGIN, SELECT/EXAMINE, LIST, FETCH by sequence number, IDLE and LOGOUT.
//!
//! ```ignore
//! use mailpipe_imap::{Client, Config, FetchAttribute, SequenceSet};
//!
//! let config = Config::new("imap.example.com");
//! let client = Client::connect(&config).await?;
//! let client = client.login("user@example.com", "secret").await?;
//! let mut inbox = client.examine("INBOX").await?;
//!
//! let total = inbox.selected().exists();
//! if let Some(range) = SequenceSet::range(total.saturating_sub(9).max(1), total) {
//!     inbox
//!         .fetch_each(range, &FetchAttribute::message(), |seq, items| {
//!             println!("{seq}: {} items", items.len());
//!         })
//!         .await?;
//! }
//! inbox.logout().await?;
//! ```
//!
//! ## States
//!
//! ```text
//! NotAuthenticated --login--> Authenticated --select/examine--> Selected
//!                                   ^                              |
//!                                   +------ rejected select -------+
//! ```
//!
//! The parser in [`parser`] is sans-I/O; [`connection`] owns the sockets.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
mod error;
pub mod parser;
pub mod types;

pub use command::{Command, FetchAttribute, TagGenerator};
pub use connection::{
    Authenticated, Client, Config, ConfigBuilder, FramedStream, IdleEvent, IdleHandle, ImapStream,
    NotAuthenticated, SelectError, Security, Selected,
};
pub use error::{Error, Result};
pub use parser::{Address, Envelope, FetchItem, Response, ResponseParser, UntaggedResponse};
pub use types::{
    Capability, Flag, Flags, ListResponse, Mailbox, MailboxAttribute, MailboxStatus, ResponseCode,
    SeqNum, SequenceSet, Status, Tag, Uid,
};
