//! Parsed response data.

use crate::types::{Capability, Flags, ListResponse, ResponseCode, SeqNum, Uid};

/// One data item of a `* n FETCH (...)` response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchItem {
    /// `FLAGS (...)`
    Flags(Flags),
    /// `UID n`
    Uid(Uid),
    /// `INTERNALDATE "..."`
    InternalDate(String),
    /// `ENVELOPE (...)`
    Envelope(Box<Envelope>),
    /// `BODY[section] data`
    Body {
        /// Section specifier, empty for the whole message.
        section: String,
        /// Section bytes, `None` when the server sent `NIL`.
        data: Option<Vec<u8>>,
    },
}

/// Envelope structure computed by the server from the message headers.
///
/// Strings are raw header values; RFC 2047 encoded words are left intact.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Envelope {
    /// `Date:`
    pub date: Option<String>,
    /// `Subject:`
    pub subject: Option<String>,
    /// `From:`
    pub from: Vec<Address>,
    /// `Sender:`
    pub sender: Vec<Address>,
    /// `Reply-To:`
    pub reply_to: Vec<Address>,
    /// `To:`
    pub to: Vec<Address>,
    /// `Cc:`
    pub cc: Vec<Address>,
    /// `Bcc:`
    pub bcc: Vec<Address>,
    /// `In-Reply-To:`
    pub in_reply_to: Option<String>,
    /// `Message-ID:`
    pub message_id: Option<String>,
}

/// Address as the four-field envelope tuple.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Address {
    /// Display name.
    pub name: Option<String>,
    /// Source route, obsolete.
    pub adl: Option<String>,
    /// Local part.
    pub mailbox: Option<String>,
    /// Domain.
    pub host: Option<String>,
}

impl Address {
    /// Returns `local@domain`, or just the local part when the host is missing.
    #[must_use]
    pub fn email(&self) -> Option<String> {
        match (&self.mailbox, &self.host) {
            (Some(m), Some(h)) => Some(format!("{m}@{h}")),
            (Some(m), None) => Some(m.clone()),
            _ => None,
        }
    }
}

/// Untagged server data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UntaggedResponse {
    /// `* OK`
    Ok {
        /// Optional bracketed code.
        code: Option<ResponseCode>,
        /// Human-readable text.
        text: String,
    },
    /// `* NO`
    No {
        /// Optional bracketed code.
        code: Option<ResponseCode>,
        /// Human-readable text.
        text: String,
    },
    /// `* BAD`
    Bad {
        /// Optional bracketed code.
        code: Option<ResponseCode>,
        /// Human-readable text.
        text: String,
    },
    /// `* PREAUTH`
    PreAuth {
        /// Optional bracketed code.
        code: Option<ResponseCode>,
        /// Human-readable text.
        text: String,
    },
    /// `* BYE`
    Bye {
        /// Optional bracketed code.
        code: Option<ResponseCode>,
        /// Human-readable text.
        text: String,
    },
    /// `* CAPABILITY ...`
    Capability(Vec<Capability>),
    /// `* LIST (...) "/" name`
    List(ListResponse),
    /// `* FLAGS (...)`
    Flags(Flags),
    /// `* n EXISTS`
    Exists(u32),
    /// `* n RECENT`
    Recent(u32),
    /// `* n EXPUNGE`
    Expunge(SeqNum),
    /// `* n FETCH (...)`
    Fetch {
        /// Message sequence number.
        seq: SeqNum,
        /// Returned items.
        items: Vec<FetchItem>,
    },
    /// Any untagged response this client does not interpret, by keyword.
    Other(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_email() {
        let full = Address {
            mailbox: Some("john".into()),
            host: Some("example.com".into()),
            ..Address::default()
        };
        assert_eq!(full.email().as_deref(), Some("john@example.com"));

        let local = Address {
            mailbox: Some("undisclosed-recipients".into()),
            ..Address::default()
        };
        assert_eq!(local.email().as_deref(), Some("undisclosed-recipients"));

        assert_eq!(Address::default().email(), None);
    }
}
