//! Sequence sets addressing messages by position.

use std::fmt;

use super::SeqNum;

/// Messages addressed by sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceSet {
    /// One message.
    Single(SeqNum),
    /// Inclusive range, written `from:to` on the wire.
    Range(SeqNum, SeqNum),
}

impl SequenceSet {
    /// Returns `None` for zero.
    #[must_use]
    pub fn single(n: u32) -> Option<Self> {
        SeqNum::new(n).map(Self::Single)
    }

    /// Builds an inclusive range, collapsing `n:n` to a single number.
    ///
    /// Returns `None` if either bound is zero or `start > end`.
    #[must_use]
    pub fn range(start: u32, end: u32) -> Option<Self> {
        if start > end {
            return None;
        }
        let (first, last) = (SeqNum::new(start)?, SeqNum::new(end)?);
        if first == last {
            Some(Self::Single(first))
        } else {
            Some(Self::Range(first, last))
        }
    }

    /// Number of messages covered.
    #[must_use]
    pub fn len(&self) -> u32 {
        match self {
            Self::Single(_) => 1,
            Self::Range(first, last) => last.get() - first.get() + 1,
        }
    }

    /// True when `seq` falls inside the set.
    #[must_use]
    pub fn contains(&self, seq: SeqNum) -> bool {
        match self {
            Self::Single(n) => n.get() == seq.get(),
            Self::Range(first, last) => first.get() <= seq.get() && seq.get() <= last.get(),
        }
    }

    /// Always false; a set covers at least one message.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }
}

impl fmt::Display for SequenceSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(n) => write!(f, "{n}"),
            Self::Range(first, last) => write!(f, "{first}:{last}"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_range_display() {
        assert_eq!(SequenceSet::range(36, 45).unwrap().to_string(), "36:45");
        assert_eq!(SequenceSet::single(3).unwrap().to_string(), "3");
    }

    #[test]
    fn test_range_collapses_to_single() {
        assert_eq!(
            SequenceSet::range(5, 5).unwrap(),
            SequenceSet::single(5).unwrap()
        );
    }

    #[test]
    fn test_invalid_ranges() {
        assert!(SequenceSet::range(0, 10).is_none());
        assert!(SequenceSet::range(10, 2).is_none());
        assert!(SequenceSet::single(0).is_none());
    }

    #[test]
    fn test_contains() {
        let set = SequenceSet::range(3, 5).unwrap();
        assert!(set.contains(SeqNum::new(3).unwrap()));
        assert!(set.contains(SeqNum::new(5).unwrap()));
        assert!(!set.contains(SeqNum::new(6).unwrap()));
        assert!(!SequenceSet::single(2).unwrap().contains(SeqNum::new(1).unwrap()));
    }

    #[test]
    fn test_len() {
        assert_eq!(SequenceSet::range(1, 10).unwrap().len(), 10);
        assert_eq!(SequenceSet::single(9).unwrap().len(), 1);
    }
}
