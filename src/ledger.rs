// 🔍 Dedup Ledger - set of identity keys already persisted
// One membership set covers both history and the current run

use std::collections::HashSet;
use std::hash::Hash;

/// Membership ledger for admitted keys
///
/// Seeded from the destination before the first admission; every accepted
/// key is recorded immediately, so a repeat inside the same run is rejected
/// exactly like a repeat from an earlier run.
#[derive(Debug, Clone)]
pub struct DedupLedger<K: Eq + Hash> {
    seen: HashSet<K>,
    admitted: usize,
}

impl<K: Eq + Hash> DedupLedger<K> {
    /// Empty ledger (destination has no rows yet)
    pub fn new() -> Self {
        DedupLedger {
            seen: HashSet::new(),
            admitted: 0,
        }
    }

    /// Ledger seeded with keys that are already persisted
    pub fn seeded<I: IntoIterator<Item = K>>(existing: I) -> Self {
        DedupLedger {
            seen: existing.into_iter().collect(),
            admitted: 0,
        }
    }

    /// Record `key` and return true if it was not known yet
    pub fn admit(&mut self, key: K) -> bool {
        let is_new = self.seen.insert(key);
        if is_new {
            self.admitted += 1;
        }
        is_new
    }

    pub fn contains(&self, key: &K) -> bool {
        self.seen.contains(key)
    }

    /// Keys admitted since the ledger was seeded
    pub fn admitted(&self) -> usize {
        self.admitted
    }

    /// All known keys, seeded and admitted
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

impl<K: Eq + Hash> Default for DedupLedger<K> {
    fn default() -> Self {
        Self::new()
    }
}
