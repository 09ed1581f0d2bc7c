//! Bounded LRU cache with pinned entries.
//!
//! Regions keep their tiles here. Lookups through `get_mut`/`touch` promote
//! an entry; eviction walks from the least recently used end and skips
//! entries the caller reports as pinned (displayed tiles).

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;

pub struct LruCache<K: Hash + Eq + Copy, V> {
    entries: HashMap<K, V>,
    order: VecDeque<K>,
    capacity: Option<usize>,
}

impl<K: Hash + Eq + Copy, V> LruCache<K, V> {
    /// Create a cache. `None` means unbounded.
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            capacity,
        }
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Look up a value without promoting it.
    pub fn get(&self, key: &K) -> Option<&V> {
        self.entries.get(key)
    }

    /// Look up a value mutably without promoting it.
    pub fn peek_mut(&mut self, key: &K) -> Option<&mut V> {
        self.entries.get_mut(key)
    }

    /// Look up a value and mark it most recently used.
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        if self.entries.contains_key(key) {
            self.touch(key);
        }
        self.entries.get_mut(key)
    }

    /// Mark a key most recently used.
    pub fn touch(&mut self, key: &K) {
        if let Some(pos) = self.order.iter().rposition(|k| k == key) {
            if pos + 1 != self.order.len() {
                self.order.remove(pos);
                self.order.push_back(*key);
            }
        }
    }

    /// Insert or replace a value as most recently used.
    ///
    /// Returns the entries evicted to get back under capacity. The inserted
    /// key and any entry for which `pinned` is true are never evicted, so the
    /// cache may stay above capacity while many entries are pinned.
    pub fn insert(&mut self, key: K, value: V, pinned: impl Fn(&V) -> bool) -> Vec<(K, V)> {
        if self.entries.insert(key, value).is_some() {
            self.order.retain(|k| *k != key);
        }
        self.order.push_back(key);
        self.enforce_cap(&key, pinned)
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        let value = self.entries.remove(key)?;
        self.order.retain(|k| k != key);
        Some(value)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter()
    }

    /// Remove and return every entry, least recently used first.
    pub fn drain(&mut self) -> Vec<(K, V)> {
        let mut drained = Vec::with_capacity(self.entries.len());
        for key in self.order.drain(..) {
            if let Some(value) = self.entries.remove(&key) {
                drained.push((key, value));
            }
        }
        drained
    }

    fn enforce_cap(&mut self, keep: &K, pinned: impl Fn(&V) -> bool) -> Vec<(K, V)> {
        let Some(capacity) = self.capacity else {
            return Vec::new();
        };
        let mut evicted = Vec::new();
        let mut pos = 0;
        while self.entries.len() > capacity && pos < self.order.len() {
            let Some(candidate) = self.order.get(pos).copied() else {
                break;
            };
            let evictable = candidate != *keep
                && self.entries.get(&candidate).is_some_and(|v| !pinned(v));
            if evictable {
                self.order.remove(pos);
                if let Some(value) = self.entries.remove(&candidate) {
                    evicted.push((candidate, value));
                }
            } else {
                pos += 1;
            }
        }
        evicted
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]
mod tests {
    use super::*;

    fn never(_: &i32) -> bool {
        false
    }

    #[test]
    fn test_basic_insert_get() {
        let mut cache: LruCache<u32, i32> = LruCache::new(Some(3));
        cache.insert(1, 10, never);
        cache.insert(2, 20, never);
        cache.insert(3, 30, never);

        assert_eq!(cache.get(&1), Some(&10));
        assert_eq!(cache.get(&2), Some(&20));
        assert_eq!(cache.get(&3), Some(&30));
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_eviction_returns_oldest() {
        let mut cache: LruCache<u32, i32> = LruCache::new(Some(2));
        cache.insert(1, 10, never);
        cache.insert(2, 20, never);
        let evicted = cache.insert(3, 30, never);

        assert_eq!(evicted, vec![(1, 10)]);
        assert_eq!(cache.get(&1), None);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_get_mut_promotes() {
        let mut cache: LruCache<u32, i32> = LruCache::new(Some(2));
        cache.insert(1, 10, never);
        cache.insert(2, 20, never);
        cache.get_mut(&1);
        let evicted = cache.insert(3, 30, never);

        assert_eq!(evicted, vec![(2, 20)]);
        assert!(cache.contains_key(&1));
    }

    #[test]
    fn test_pinned_entries_survive() {
        let mut cache: LruCache<u32, i32> = LruCache::new(Some(1));
        cache.insert(1, -10, never);
        cache.insert(2, -20, |v| *v < 0);
        // Both pinned (negative), nothing can go
        let evicted = cache.insert(3, 30, |v| *v < 0);
        assert!(evicted.is_empty());
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_unbounded() {
        let mut cache: LruCache<u32, i32> = LruCache::new(None);
        for i in 0..1000 {
            assert!(cache.insert(i, 0, never).is_empty());
        }
        assert_eq!(cache.len(), 1000);
    }

    #[test]
    fn test_replace_and_drain() {
        let mut cache: LruCache<u32, i32> = LruCache::new(Some(3));
        cache.insert(1, 10, never);
        cache.insert(2, 20, never);
        cache.insert(1, 11, never);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.drain(), vec![(2, 20), (1, 11)]);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_remove() {
        let mut cache: LruCache<u32, i32> = LruCache::new(Some(3));
        cache.insert(1, 10, never);
        assert_eq!(cache.remove(&1), Some(10));
        assert_eq!(cache.remove(&1), None);
        assert!(cache.is_empty());
    }
}
