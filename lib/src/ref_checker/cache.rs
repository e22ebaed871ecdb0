use dashmap::DashMap;
use std::hash::Hash;

/// Memoized verdicts for one kind of symbol
///
/// Safe for any number of concurrent readers and writers. Entries are never evicted or
/// invalidated: a verdict is a pure function of the (immutable) program and the checker's fixed
/// context, so racing writers always store the same value.
pub struct VerdictCache<K: Eq + Hash> {
    verdicts: DashMap<K, bool>,
}

impl<K: Eq + Hash> VerdictCache<K> {
    pub fn new() -> Self {
        VerdictCache {
            verdicts: DashMap::new(),
        }
    }

    pub fn get(&self, key: &K) -> Option<bool> {
        self.verdicts.get(key).map(|verdict| *verdict)
    }

    pub fn put(&self, key: K, verdict: bool) {
        if let Some(previous) = self.verdicts.insert(key, verdict) {
            debug_assert_eq!(previous, verdict, "conflicting verdicts for one symbol");
        }
    }

    pub fn len(&self) -> usize {
        self.verdicts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.verdicts.is_empty()
    }
}

impl<K: Eq + Hash> Default for VerdictCache<K> {
    fn default() -> Self {
        Self::new()
    }
}
