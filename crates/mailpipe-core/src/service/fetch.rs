//! Paginated retrieval.

use tracing::{debug, info};

use crate::Result;
use crate::email::Email;
use crate::mapper::map_message;
use crate::pagination::{SequenceRange, paginate};
use crate::session::MailSession;

/// Fetches one page of `mailbox`, newest message first.
///
/// The mailbox is opened read-only so `\Seen` flags are left alone. An empty
/// mailbox yields an empty page without issuing FETCH.
///
/// A page that starts past the oldest message collapses to message 1, so
/// paging on past the end keeps returning that one message. Callers that
/// walk pages should stop once `page_size * (page_number - 1)` reaches the
/// mailbox count.
///
/// # Errors
///
/// Returns the select or fetch error. Messages received before a failure
/// are discarded.
pub async fn fetch_page<S: MailSession>(
    session: &mut S,
    mailbox: &str,
    page_size: i64,
    page_number: i64,
) -> Result<Vec<Email>> {
    let total = session.select(mailbox, true).await?;
    if total == 0 {
        info!(mailbox, "no messages");
        return Ok(Vec::new());
    }

    let range = paginate(total, page_size, page_number);
    debug!(mailbox, total, from = range.from, to = range.to, "fetching page");

    let mut emails = fetch_range(session, range).await?;
    emails.reverse();
    Ok(emails)
}

/// Fetches `range` from the open mailbox, oldest first.
///
/// Each message is mapped as it arrives.
///
/// # Errors
///
/// Returns the fetch error; nothing is returned for a partial fetch.
pub async fn fetch_range<S: MailSession>(
    session: &mut S,
    range: SequenceRange,
) -> Result<Vec<Email>> {
    let mut emails = Vec::with_capacity(usize::try_from(range.len()).unwrap_or_default());
    session
        .fetch(range, |raw| emails.push(map_message(raw)))
        .await?;
    Ok(emails)
}

/// Names of every mailbox on the account.
///
/// # Errors
///
/// Returns the LIST error.
pub async fn list_mailboxes<S: MailSession>(session: &mut S) -> Result<Vec<String>> {
    let names = session.list().await?;
    debug!(count = names.len(), "listed mailboxes");
    Ok(names)
}
