//! Core IMAP types shared by the parser, the command serializer and the client.

#![allow(clippy::missing_const_for_fn)]

mod capability;
mod flags;
mod identifiers;
mod mailbox;
mod response_code;
mod sequence;

pub use capability::{Capability, Status};
pub use flags::{Flag, Flags};
pub use identifiers::{SeqNum, Tag, Uid};
pub use mailbox::{ListResponse, Mailbox, MailboxAttribute, MailboxStatus};
pub use response_code::ResponseCode;
pub use sequence::SequenceSet;
