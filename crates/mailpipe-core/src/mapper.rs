//! FETCH results to [`Email`] records.

use chrono::{DateTime, FixedOffset};
use mailpipe_imap::{Address, Envelope, FetchItem, Flags, SeqNum, Uid};
use mailpipe_mime::encoding::decode_rfc2047;

use crate::email::Email;

/// One message as the server returned it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    /// Sequence number at fetch time.
    pub seq: SeqNum,
    /// Data items in server order.
    pub items: Vec<FetchItem>,
}

impl RawMessage {
    /// Bundles a FETCH response.
    #[must_use]
    pub const fn new(seq: SeqNum, items: Vec<FetchItem>) -> Self {
        Self { seq, items }
    }
}

/// Builds an [`Email`] from envelope, flags and the full body section.
///
/// Never fails. Missing pieces leave their fields empty, and an
/// undecodable body falls back to its raw text.
#[must_use]
pub fn map_message(raw: RawMessage) -> Email {
    let mut envelope = None;
    let mut uid = None;
    let mut flags = Flags::default();
    let mut body: Option<Vec<u8>> = None;

    for item in raw.items {
        match item {
            FetchItem::Envelope(e) => envelope = Some(*e),
            FetchItem::Uid(u) => uid = Some(u),
            FetchItem::Flags(f) => flags = f,
            FetchItem::Body { section, data } => {
                if body.is_none() || section.is_empty() {
                    body = data.or(body);
                }
            }
            FetchItem::InternalDate(_) => {}
        }
    }

    let envelope = envelope.unwrap_or_default();
    let content = body
        .as_deref()
        .map(mailpipe_mime::extract)
        .unwrap_or_default();

    Email {
        id: uid.map_or(raw.seq.get(), Uid::get),
        from: format_addresses(&envelope.from),
        to: format_addresses(&envelope.to),
        subject: envelope
            .subject
            .as_deref()
            .map(decode_rfc2047)
            .unwrap_or_default(),
        body: content.text,
        date: parse_date(&envelope),
        read: flags.is_seen(),
        attachments: content.attachments,
    }
}

/// `Name <local@host>` or `local@host`, joined with `", "`.
#[must_use]
pub fn format_addresses(addresses: &[Address]) -> String {
    addresses
        .iter()
        .filter_map(format_address)
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_address(address: &Address) -> Option<String> {
    let email = address.email()?;
    let name = address
        .name
        .as_deref()
        .map(decode_rfc2047)
        .filter(|n| !n.is_empty());
    Some(match name {
        Some(name) => format!("{name} <{email}>"),
        None => email,
    })
}

fn parse_date(envelope: &Envelope) -> Option<DateTime<FixedOffset>> {
    let raw = envelope.date.as_deref()?.trim();
    DateTime::parse_from_rfc2822(raw)
        .or_else(|_| {
            // Some mailers append a zone comment such as "(UTC)".
            let without_comment = raw.split_once(" (").map_or(raw, |(date, _)| date);
            DateTime::parse_from_rfc2822(without_comment)
        })
        .inspect_err(|e| tracing::debug!(error = %e, date = raw, "unparseable envelope date"))
        .ok()
}
