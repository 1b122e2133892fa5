//! Entry store with its recency and frequency indices.
//!
//! Every cached entry lives in one arena slot and is reachable three ways:
//!
//! - through the key map (the Entry Store proper),
//! - through the recency list, front = most recently used,
//! - through exactly one frequency bucket, the bucket of its access count.
//!
//! ```text
//!   map: key ──▶ slot id
//!
//!   recency:  MRU ──▶ [c] ⇄ [a] ⇄ [b] ◀── LRU
//!
//!   active frequencies (min-ordered): {1, 3}
//!   buckets:  1 ──▶ [c] ⇄ [b]        (back = longest resident)
//!             3 ──▶ [a]
//! ```
//!
//! All three views are updated together by every mutating method, so the key
//! sets never diverge between calls. A frequency is present in the active set
//! exactly when its bucket holds at least one slot.

use crate::list::{Arena, Link, Linked, List, SlotId};
use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use std::collections::BTreeSet;

#[cfg(feature = "hashbrown")]
use hashbrown::DefaultHashBuilder;
#[cfg(feature = "hashbrown")]
use hashbrown::HashMap;

#[cfg(not(feature = "hashbrown"))]
use std::collections::hash_map::RandomState as DefaultHashBuilder;
#[cfg(not(feature = "hashbrown"))]
use std::collections::HashMap;

/// Tag for the recency list links.
pub(crate) struct Recency;

/// Tag for the per-frequency bucket links.
pub(crate) struct Bucket;

struct Slot<K, V> {
    key: K,
    value: V,
    size: usize,
    frequency: u64,
    recency: Link,
    bucket: Link,
}

impl<K, V> Linked<Recency> for Slot<K, V> {
    fn link(&self) -> &Link {
        &self.recency
    }

    fn link_mut(&mut self) -> &mut Link {
        &mut self.recency
    }
}

impl<K, V> Linked<Bucket> for Slot<K, V> {
    fn link(&self) -> &Link {
        &self.bucket
    }

    fn link_mut(&mut self) -> &mut Link {
        &mut self.bucket
    }
}

/// An entry taken out of the store, with the byte size it was accounted at.
#[derive(Debug)]
pub(crate) struct Removed<K, V> {
    pub(crate) key: K,
    pub(crate) value: V,
    pub(crate) size: usize,
}

/// Byte size of an entry: key length plus value length.
#[inline]
pub(crate) fn entry_size<K: AsRef<[u8]> + ?Sized, V: AsRef<[u8]> + ?Sized>(
    key: &K,
    value: &V,
) -> usize {
    key.as_ref().len() + value.as_ref().len()
}

pub(crate) struct EntryStore<K, V, S = DefaultHashBuilder> {
    map: HashMap<K, SlotId, S>,
    slots: Arena<Slot<K, V>>,
    recency: List<Recency>,
    buckets: HashMap<u64, List<Bucket>, DefaultHashBuilder>,
    active: BTreeSet<u64>,
}

impl<K, V, S> EntryStore<K, V, S>
where
    K: Hash + Eq + Clone + AsRef<[u8]>,
    V: AsRef<[u8]>,
    S: BuildHasher,
{
    pub(crate) fn with_hasher(hash_builder: S) -> Self {
        EntryStore {
            map: HashMap::with_hasher(hash_builder),
            slots: Arena::new(),
            recency: List::new(),
            buckets: HashMap::with_hasher(DefaultHashBuilder::default()),
            active: BTreeSet::new(),
        }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.map.len()
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub(crate) fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.map.contains_key(key)
    }

    /// Looks up a value without touching either index.
    pub(crate) fn peek<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let id = *self.map.get(key)?;
        Some(&self.slots[id].value)
    }

    pub(crate) fn frequency<Q>(&self, key: &Q) -> Option<u64>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let id = *self.map.get(key)?;
        Some(self.slots[id].frequency)
    }

    /// Adds a key that is not currently stored, at frequency 1 and at the
    /// recency front. Returns the byte size accounted for it.
    pub(crate) fn insert(&mut self, key: K, value: V) -> usize {
        debug_assert!(!self.map.contains_key(&key), "insert of a live key");
        let size = entry_size(&key, &value);
        let id = self.slots.insert(Slot {
            key: key.clone(),
            value,
            size,
            frequency: 1,
            recency: Link::default(),
            bucket: Link::default(),
        });
        self.map.insert(key, id);
        self.recency.push_front(&mut self.slots, id);
        self.attach_to_bucket(id, 1);
        debug_assert_eq!(self.recency.len(), self.map.len());
        size
    }

    /// Records a hit: bumps the key's frequency by one, moves it to the next
    /// bucket and to the recency front. Returns the stored value.
    pub(crate) fn touch<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let id = *self.map.get(key)?;
        let old = self.slots[id].frequency;
        let new = old.saturating_add(1);
        if new != old {
            self.detach_from_bucket(id, old);
            self.slots[id].frequency = new;
            self.attach_to_bucket(id, new);
            log::trace!("frequency {old} -> {new}");
        }
        self.recency.move_to_front(&mut self.slots, id);
        Some(&self.slots[id].value)
    }

    /// Removes `key` from the store and both indices.
    pub(crate) fn remove<Q>(&mut self, key: &Q) -> Option<Removed<K, V>>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let id = *self.map.get(key)?;
        Some(self.evict_slot(id))
    }

    /// Removes the least recently used entry.
    pub(crate) fn pop_least_recent(&mut self) -> Option<Removed<K, V>> {
        let id = self.recency.back()?;
        Some(self.evict_slot(id))
    }

    /// Removes the longest-resident entry of the lowest active frequency.
    ///
    /// The minimum is taken off the active set while it is inspected. An
    /// empty bucket found there means the active set drifted from the buckets;
    /// it is discarded and the next minimum is tried. If the chosen bucket
    /// still holds entries afterwards its frequency goes back into the set.
    pub(crate) fn pop_least_frequent(&mut self) -> Option<Removed<K, V>> {
        while let Some(frequency) = self.active.pop_first() {
            let Some(id) = self.buckets.get(&frequency).and_then(|b| b.back()) else {
                log::warn!("frequency {frequency} was active with an empty bucket");
                self.buckets.remove(&frequency);
                continue;
            };

            let removed = self.evict_slot(id);
            if self.buckets.contains_key(&frequency) {
                self.active.insert(frequency);
            }
            return Some(removed);
        }
        None
    }

    /// Drops every entry.
    pub(crate) fn clear(&mut self) {
        self.map.clear();
        self.slots.clear();
        self.recency = List::new();
        self.buckets.clear();
        self.active.clear();
    }

    /// Iterates stored keys from most to least recently used.
    pub(crate) fn keys_by_recency(&self) -> impl Iterator<Item = &K> + '_ {
        self.recency
            .iter(&self.slots)
            .map(move |id| &self.slots[id].key)
    }

    /// Lowest frequency that currently has an entry.
    pub(crate) fn min_frequency(&self) -> Option<u64> {
        self.active.first().copied()
    }

    /// Number of distinct frequencies currently in use.
    pub(crate) fn active_frequencies(&self) -> usize {
        self.active.len()
    }

    fn evict_slot(&mut self, id: SlotId) -> Removed<K, V> {
        let frequency = self.slots[id].frequency;
        self.recency.unlink(&mut self.slots, id);
        self.detach_from_bucket(id, frequency);
        let slot = match self.slots.remove(id) {
            Some(slot) => slot,
            None => panic!("evicting vacant slot {id}"),
        };
        self.map.remove(&slot.key);
        Removed {
            key: slot.key,
            value: slot.value,
            size: slot.size,
        }
    }

    fn attach_to_bucket(&mut self, id: SlotId, frequency: u64) {
        self.buckets
            .entry(frequency)
            .or_insert_with(List::new)
            .push_front(&mut self.slots, id);
        self.active.insert(frequency);
    }

    fn detach_from_bucket(&mut self, id: SlotId, frequency: u64) {
        let Some(bucket) = self.buckets.get_mut(&frequency) else {
            panic!("slot {id} claims frequency {frequency} with no bucket");
        };
        bucket.unlink(&mut self.slots, id);
        if bucket.is_empty() {
            self.buckets.remove(&frequency);
            self.active.remove(&frequency);
        }
    }

    /// Panics unless the store, the recency list and the buckets hold exactly
    /// the same keys and the active set mirrors the non-empty buckets.
    #[cfg(test)]
    pub(crate) fn assert_consistent(&self) {
        use std::collections::HashSet;

        let stored: HashSet<SlotId> = self.map.values().copied().collect();
        assert_eq!(stored.len(), self.slots.len());

        let by_recency: Vec<SlotId> = self.recency.iter(&self.slots).collect();
        assert_eq!(by_recency.len(), self.recency.len());
        assert_eq!(by_recency.iter().copied().collect::<HashSet<_>>(), stored);

        let mut bucketed = HashSet::new();
        for (&frequency, bucket) in self.buckets.iter() {
            assert!(!bucket.is_empty(), "empty bucket {frequency} kept");
            assert!(self.active.contains(&frequency));
            for id in bucket.iter(&self.slots) {
                assert_eq!(self.slots[id].frequency, frequency);
                assert!(bucketed.insert(id), "slot {id} in two buckets");
            }
        }
        assert_eq!(self.active.len(), self.buckets.len());
        assert_eq!(bucketed, stored);

        for (key, &id) in self.map.iter() {
            assert!(self.slots[id].key == *key);
            assert_eq!(
                self.slots[id].size,
                entry_size(&self.slots[id].key, &self.slots[id].value)
            );
        }
    }

    #[cfg(test)]
    pub(crate) fn corrupt_active_for_test(&mut self, frequency: u64) {
        self.active.insert(frequency);
    }
}

impl<K, V, S> fmt::Debug for EntryStore<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryStore")
            .field("len", &self.map.len())
            .field("active_frequencies", &self.active)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Store = EntryStore<&'static str, &'static str, DefaultHashBuilder>;

    fn store() -> Store {
        EntryStore::with_hasher(DefaultHashBuilder::default())
    }

    #[test]
    fn test_insert_indexes_everywhere() {
        let mut s = store();
        assert_eq!(s.insert("ab", "cde"), 5);
        s.insert("x", "y");
        s.assert_consistent();

        assert_eq!(s.len(), 2);
        assert_eq!(s.frequency(&"ab"), Some(1));
        assert_eq!(s.min_frequency(), Some(1));
        assert_eq!(s.active_frequencies(), 1);
        assert_eq!(s.keys_by_recency().copied().collect::<Vec<_>>(), vec!["x", "ab"]);
    }

    #[test]
    fn test_touch_moves_bucket_and_recency() {
        let mut s = store();
        s.insert("a", "1");
        s.insert("b", "2");
        assert_eq!(s.touch(&"a"), Some(&"1"));
        s.assert_consistent();

        assert_eq!(s.frequency(&"a"), Some(2));
        assert_eq!(s.frequency(&"b"), Some(1));
        assert_eq!(s.active_frequencies(), 2);
        assert_eq!(s.keys_by_recency().copied().collect::<Vec<_>>(), vec!["a", "b"]);

        // bucket 1 drains once "b" moves up too
        s.touch(&"b");
        s.assert_consistent();
        assert_eq!(s.min_frequency(), Some(2));
        assert_eq!(s.active_frequencies(), 1);

        assert_eq!(s.touch(&"missing"), None);
    }

    #[test]
    fn test_peek_does_not_touch() {
        let mut s = store();
        s.insert("a", "1");
        s.insert("b", "2");
        assert_eq!(s.peek(&"a"), Some(&"1"));
        assert_eq!(s.frequency(&"a"), Some(1));
        assert_eq!(s.keys_by_recency().copied().collect::<Vec<_>>(), vec!["b", "a"]);
    }

    #[test]
    fn test_pop_least_recent() {
        let mut s = store();
        s.insert("a", "1");
        s.insert("b", "2");
        s.insert("c", "3");
        s.touch(&"a");

        let removed = s.pop_least_recent().unwrap();
        assert_eq!((removed.key, removed.value, removed.size), ("b", "2", 2));
        s.assert_consistent();
        assert_eq!(s.pop_least_recent().unwrap().key, "c");
        assert_eq!(s.pop_least_recent().unwrap().key, "a");
        assert!(s.pop_least_recent().is_none());
        assert!(s.is_empty());
        s.assert_consistent();
    }

    #[test]
    fn test_pop_least_frequent_picks_oldest_in_min_bucket() {
        let mut s = store();
        s.insert("a", "1");
        s.insert("b", "2");
        s.insert("c", "3");
        s.touch(&"b");

        // "a" and "c" share frequency 1; "a" has been there longest
        assert_eq!(s.pop_least_frequent().unwrap().key, "a");
        s.assert_consistent();
        assert_eq!(s.min_frequency(), Some(1));

        assert_eq!(s.pop_least_frequent().unwrap().key, "c");
        s.assert_consistent();
        assert_eq!(s.min_frequency(), Some(2));

        assert_eq!(s.pop_least_frequent().unwrap().key, "b");
        assert!(s.pop_least_frequent().is_none());
        s.assert_consistent();
    }

    #[test]
    fn test_bucket_order_follows_arrival_not_insertion() {
        let mut s = store();
        s.insert("a", "1");
        s.insert("b", "2");
        // "b" reaches frequency 2 first, then "a"
        s.touch(&"b");
        s.touch(&"a");
        assert_eq!(s.pop_least_frequent().unwrap().key, "b");
    }

    #[test]
    fn test_pop_least_frequent_skips_stale_frequency() {
        let mut s = store();
        s.insert("a", "1");
        s.touch(&"a");
        s.corrupt_active_for_test(1);

        assert_eq!(s.pop_least_frequent().unwrap().key, "a");
        assert!(s.is_empty());
        s.assert_consistent();
    }

    #[test]
    fn test_remove_and_clear() {
        let mut s = store();
        s.insert("a", "1");
        s.insert("b", "22");
        s.touch(&"b");

        let removed = s.remove(&"b").unwrap();
        assert_eq!((removed.value, removed.size), ("22", 3));
        assert!(s.remove(&"b").is_none());
        assert!(!s.contains(&"b"));
        s.assert_consistent();

        s.clear();
        assert!(s.is_empty());
        assert_eq!(s.min_frequency(), None);
        s.insert("c", "3");
        s.assert_consistent();
    }
}
