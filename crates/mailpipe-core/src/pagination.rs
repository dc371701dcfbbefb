//! Page number to sequence range conversion.
//!
//! Page 1 holds the newest `page_size` messages; later pages walk back
//! toward sequence number 1.

use mailpipe_imap::SequenceSet;

use crate::config::DEFAULT_PAGE_SIZE;

/// Inclusive, 1-based range of sequence numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceRange {
    /// Oldest message in the range.
    pub from: u32,
    /// Newest message in the range.
    pub to: u32,
}

impl SequenceRange {
    /// Number of messages covered.
    #[must_use]
    pub const fn len(&self) -> u32 {
        self.to - self.from + 1
    }

    /// Always false; a range covers at least one message.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Wire form. `None` only for a range starting at zero.
    #[must_use]
    pub fn to_sequence_set(self) -> Option<SequenceSet> {
        SequenceSet::range(self.from, self.to)
    }
}

/// Maps a page request onto the mailbox's sequence numbers.
///
/// Non-positive `page_size` means 50 and non-positive `page_number` means 1.
/// Callers handle `total == 0` first; for any `total > 0` the result satisfies
/// `1 <= from <= to <= total`. A page past the oldest message collapses to
/// `1..=1`.
#[must_use]
pub fn paginate(total: u32, page_size: i64, page_number: i64) -> SequenceRange {
    let page_size = if page_size <= 0 { DEFAULT_PAGE_SIZE } else { page_size };
    let page_number = if page_number <= 0 { 1 } else { page_number };
    let total = i64::from(total);

    let to = total.saturating_sub(page_size.saturating_mul(page_number - 1));
    let from = to.saturating_sub(page_size - 1);

    let to = to.clamp(1, total.max(1));
    let from = from.max(1).min(to);

    SequenceRange {
        from: u32::try_from(from).unwrap_or(1),
        to: u32::try_from(to).unwrap_or(1),
    }
}
