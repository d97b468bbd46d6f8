//! Per-table primary-key allocation.
//!
//! Counters advance before identity resolution is attempted, so ids
//! consumed by rows that are later discarded are never reissued. Resumed
//! runs seeded from the persisted last-used values therefore cannot
//! collide with previously emitted ids; the sequences have gaps instead.

use std::collections::BTreeMap;

/// Monotonic id counters, one per target table.
#[derive(Debug, Clone, Default)]
pub struct RecordAllocator {
    last_used: BTreeMap<String, u64>,
}

impl RecordAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from persisted (table, last used id) pairs.
    pub fn from_entries<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, u64)>,
    {
        Self {
            last_used: pairs.into_iter().collect(),
        }
    }

    /// Consume and return the next id for `table`; first id is 1.
    pub fn next_id(&mut self, table: &str) -> u64 {
        let counter = self.last_used.entry(table.to_string()).or_insert(0);
        *counter += 1;
        *counter
    }

    /// Last consumed id per table, for persisting at run end.
    pub fn entries(&self) -> impl Iterator<Item = (&str, u64)> {
        self.last_used
            .iter()
            .map(|(table, last)| (table.as_str(), *last))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_are_per_table() {
        let mut allocator = RecordAllocator::new();
        assert_eq!(allocator.next_id("measurement"), 1);
        assert_eq!(allocator.next_id("measurement"), 2);
        assert_eq!(allocator.next_id("condition_occurrence"), 1);
    }

    #[test]
    fn seeded_counter_resumes_after_last_used() {
        let mut allocator =
            RecordAllocator::from_entries(vec![("measurement".to_string(), 41)]);
        assert_eq!(allocator.next_id("measurement"), 42);
    }
}
