//! Mailbox names, LIST entries and SELECT/EXAMINE status.

use std::fmt;

use super::{Flags, Uid};

/// Mailbox name as the server knows it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Mailbox(String);

impl Mailbox {
    /// Creates a mailbox name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Mailbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Mailbox state reported while opening it with SELECT or EXAMINE.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MailboxStatus {
    /// Number of messages (`* n EXISTS`).
    pub exists: u32,
    /// Number of recent messages.
    pub recent: u32,
    /// Predicted next UID.
    pub uid_next: Option<Uid>,
    /// UIDVALIDITY of the mailbox.
    pub uid_validity: Option<u32>,
    /// Flags defined in the mailbox.
    pub flags: Flags,
    /// Server reported `[READ-ONLY]`.
    pub read_only: bool,
}

/// One `* LIST` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListResponse {
    /// Name attributes such as `\Noselect`.
    pub attributes: Vec<MailboxAttribute>,
    /// Hierarchy delimiter, if the server uses one.
    pub delimiter: Option<char>,
    /// Full mailbox name.
    pub mailbox: Mailbox,
}

impl ListResponse {
    /// Returns false for `\Noselect` and `\NonExistent` entries.
    #[must_use]
    pub fn is_selectable(&self) -> bool {
        !self
            .attributes
            .iter()
            .any(|a| matches!(a, MailboxAttribute::NoSelect | MailboxAttribute::NonExistent))
    }
}

/// Mailbox name attribute from a LIST response.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MailboxAttribute {
    /// `\Noselect`
    NoSelect,
    /// `\NonExistent`
    NonExistent,
    /// `\HasChildren`
    HasChildren,
    /// `\HasNoChildren`
    HasNoChildren,
    /// Any other attribute, including special-use markers.
    Other(String),
}

impl MailboxAttribute {
    /// Parses an attribute, case-insensitively.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_uppercase().as_str() {
            "\\NOSELECT" => Self::NoSelect,
            "\\NONEXISTENT" => Self::NonExistent,
            "\\HASCHILDREN" => Self::HasChildren,
            "\\HASNOCHILDREN" => Self::HasNoChildren,
            _ => Self::Other(s.to_string()),
        }
    }
}
