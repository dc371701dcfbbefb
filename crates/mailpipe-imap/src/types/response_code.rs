//! Bracketed response codes (`[UIDNEXT 42]`, `[READ-ONLY]`, ...).

use super::{Capability, Uid};

/// Response code carried by a condition response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseCode {
    /// `ALERT`: text must be shown to the user.
    Alert,
    /// `CAPABILITY` list piggybacked on a greeting or LOGIN completion.
    Capability(Vec<Capability>),
    /// `READ-ONLY`
    ReadOnly,
    /// `READ-WRITE`
    ReadWrite,
    /// `TRYCREATE`
    TryCreate,
    /// `UIDNEXT`
    UidNext(Uid),
    /// `UIDVALIDITY`
    UidValidity(u32),
    /// `UNSEEN`: first unseen sequence number.
    Unseen(u32),
    /// Anything else, by name.
    Unknown(String),
}
