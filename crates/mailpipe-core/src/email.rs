//! Records handed to consumers.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// One message, ready for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Email {
    /// UID when the server sent one, otherwise the sequence number.
    pub id: u32,
    /// Sender addresses joined with `", "`.
    pub from: String,
    /// Recipient addresses joined with `", "`.
    pub to: String,
    /// Decoded subject.
    pub subject: String,
    /// Plain-text body.
    pub body: String,
    /// Envelope date, if present and parseable.
    pub date: Option<DateTime<FixedOffset>>,
    /// `\Seen` is set.
    pub read: bool,
    /// Attachment file names.
    #[serde(default)]
    pub attachments: Vec<String>,
}

/// Parameters of a subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamRequest {
    /// Account email address.
    pub email: String,
    /// Mailbox to watch.
    pub mailbox: String,
    /// Initial batch page size; non-positive means the default.
    #[serde(rename = "pagesize", default)]
    pub page_size: i64,
    /// Initial batch page number; non-positive means the first page.
    #[serde(rename = "pagenumber", default)]
    pub page_number: i64,
}

/// One item of a subscription feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum StreamEvent {
    /// The initial page, newest first.
    Batch(Vec<Email>),
    /// A message that arrived while listening.
    Email(Box<Email>),
}

impl StreamEvent {
    /// `batch` or `email`.
    #[must_use]
    pub const fn event_name(&self) -> &'static str {
        match self {
            Self::Batch(_) => "batch",
            Self::Email(_) => "email",
        }
    }

    /// Server-Sent Events frame: `event: <name>\ndata: <json>\n\n`.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be serialized.
    pub fn to_sse(&self) -> serde_json::Result<String> {
        let data = serde_json::to_string(self)?;
        Ok(format!("event: {}\ndata: {data}\n\n", self.event_name()))
    }
}
