//! Command tag generation.

/// Produces unique, monotonically increasing tags (`A0000`, `A0001`, ...).
#[derive(Debug, Clone)]
pub struct TagGenerator {
    counter: u32,
    prefix: char,
}

impl TagGenerator {
    /// Creates a generator with the given prefix.
    #[must_use]
    pub const fn new(prefix: char) -> Self {
        Self { counter: 0, prefix }
    }

    /// Returns the next tag.
    pub fn next_tag(&mut self) -> String {
        let n = self.counter;
        self.counter = self.counter.wrapping_add(1);
        format!("{}{n:04}", self.prefix)
    }
}

impl Default for TagGenerator {
    fn default() -> Self {
        Self::new('A')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequential_tags() {
        let mut tags = TagGenerator::default();
        assert_eq!(tags.next_tag(), "A0000");
        assert_eq!(tags.next_tag(), "A0001");
        assert_eq!(tags.next_tag(), "A0002");
    }

    #[test]
    fn test_wide_counter_keeps_digits() {
        let mut tags = TagGenerator {
            counter: 12_345,
            prefix: 'B',
        };
        assert_eq!(tags.next_tag(), "B12345");
    }
}
