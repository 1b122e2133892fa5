//! Learning Cache Replacement (LeCaR) Implementation.
//!
//! LeCaR keeps a single byte-bounded store but carries two eviction policies,
//! LRU and LFU, and learns online which one to trust. Every time space is
//! needed it draws one of them at random according to its current weight.
//!
//! ```text
//!              put(k, v) needs space
//!                       │
//!               ┌───────▼────────┐
//!               │ draw u ~ [0,1) │
//!               └───────┬────────┘
//!          u <= w_lfu   │   otherwise
//!        ┌──────────────┴──────────────┐
//!  ┌─────▼─────┐                 ┌─────▼─────┐
//!  │ LFU pops  │                 │ LRU pops  │
//!  │ min bucket│                 │ back of   │
//!  │ (oldest)  │                 │ recency   │
//!  └─────┬─────┘                 └─────┬─────┘
//!        └──────────────┬──────────────┘
//!                       ▼
//!     history[policy][key] = clock;  clock += 1
//! ```
//!
//! When a later `get` misses on a key found in the history, the policy that
//! evicted it made a mistake. Its weight is raised, by more the sooner the key
//! came back, so the other policy is picked more often from then on.
//!
//! # Sizes
//!
//! Capacity is measured in bytes. An entry costs `key.len() + value.len()`
//! bytes, read through `AsRef<[u8]>` on both. A single entry larger than the
//! whole capacity is refused.
//!
//! # Performance Characteristics
//!
//! | Operation | Cost |
//! |-----------|------|
//! | get (hit) | O(log F) |
//! | get (miss) | O(1) |
//! | put | O(1) plus O(log F) per eviction |
//! | remove | O(log F) |
//!
//! F is the number of distinct access counts among live entries.

use crate::config::{ConfigError, LecarCacheConfig};
use crate::history::HistoryLedger;
use crate::metrics::{CacheMetrics, CacheStats, LecarCacheMetrics};
use crate::store::{entry_size, EntryStore};
use crate::weigher::{Policy, PolicyWeigher, PolicyWeights};
use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use core::num::NonZeroUsize;
use std::collections::BTreeMap;

#[cfg(feature = "hashbrown")]
use hashbrown::DefaultHashBuilder;

#[cfg(not(feature = "hashbrown"))]
use std::collections::hash_map::RandomState as DefaultHashBuilder;

/// A byte-bounded cache that arbitrates between LRU and LFU eviction,
/// learning from its own mistakes which of the two fits the workload.
///
/// # Examples
///
/// ```
/// use lecar_cache::LecarCache;
/// use core::num::NonZeroUsize;
///
/// let mut cache = LecarCache::new(NonZeroUsize::new(1000).unwrap());
///
/// assert!(cache.put("key0", "key0"));
/// assert_eq!(cache.get(&"key0"), Some(&"key0"));
/// assert_eq!(cache.remaining_storage(), 992);
///
/// let stats = cache.stats();
/// assert_eq!((stats.hits, stats.misses), (1, 0));
/// ```
pub struct LecarCache<K, V, S = DefaultHashBuilder> {
    capacity: usize,
    size: usize,
    store: EntryStore<K, V, S>,
    history: HistoryLedger<K>,
    weigher: PolicyWeigher,
    metrics: LecarCacheMetrics,
}

impl<K, V> LecarCache<K, V>
where
    K: Hash + Eq + Clone + AsRef<[u8]>,
    V: AsRef<[u8]>,
{
    /// Creates a cache of `capacity` bytes with the default learning rate,
    /// discount rate and history window, seeded from OS entropy.
    pub fn new(capacity: NonZeroUsize) -> LecarCache<K, V, DefaultHashBuilder> {
        Self::build(LecarCacheConfig::new(capacity), DefaultHashBuilder::default())
    }

    /// Creates a cache from a configuration.
    ///
    /// # Arguments
    ///
    /// * `config` - Capacity and learning hyperparameters
    /// * `hasher` - Optional hash builder for the key map. `None` uses the default.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the learning rate, discount rate or
    /// history window is out of range.
    ///
    /// # Example
    ///
    /// ```
    /// use lecar_cache::config::{ConfigError, LecarCacheConfig};
    /// use lecar_cache::LecarCache;
    /// use core::num::NonZeroUsize;
    ///
    /// let config = LecarCacheConfig {
    ///     discount_rate: 1.5,
    ///     ..LecarCacheConfig::new(NonZeroUsize::new(100).unwrap())
    /// };
    /// let result: Result<LecarCache<String, Vec<u8>>, _> = LecarCache::init(config, None);
    /// assert_eq!(result.unwrap_err(), ConfigError::InvalidDiscountRate(1.5));
    /// ```
    pub fn init(
        config: LecarCacheConfig,
        hasher: Option<DefaultHashBuilder>,
    ) -> Result<LecarCache<K, V, DefaultHashBuilder>, ConfigError> {
        Self::init_with_hasher(config, hasher.unwrap_or_default())
    }
}

impl<K, V, S> LecarCache<K, V, S>
where
    K: Hash + Eq + Clone + AsRef<[u8]>,
    V: AsRef<[u8]>,
    S: BuildHasher,
{
    /// Creates a cache from a configuration with a custom hash builder.
    pub fn init_with_hasher(config: LecarCacheConfig, hash_builder: S) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(config, hash_builder))
    }

    fn build(config: LecarCacheConfig, hash_builder: S) -> Self {
        let capacity = config.capacity.get();
        LecarCache {
            capacity,
            size: 0,
            store: EntryStore::with_hasher(hash_builder),
            history: HistoryLedger::new(config.history_window),
            weigher: PolicyWeigher::new(&config),
            metrics: LecarCacheMetrics::new(capacity as u64),
        }
    }

    /// Total capacity in bytes.
    #[inline]
    pub fn max_storage(&self) -> usize {
        self.capacity
    }

    /// Bytes still free: capacity minus the sizes of all live entries.
    #[inline]
    pub fn remaining_storage(&self) -> usize {
        self.capacity - self.size
    }

    /// Number of live entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.store.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Hit and miss counters since construction.
    pub fn stats(&self) -> CacheStats {
        self.metrics.stats()
    }

    /// Current policy weights; they always sum to 1.
    pub fn weights(&self) -> PolicyWeights {
        self.weigher.weights()
    }

    /// Logical clock: the number of evictions made so far.
    pub fn clock(&self) -> u64 {
        self.weigher.clock()
    }

    /// Number of eviction records still waiting for a re-request.
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Detailed counters for this cache.
    pub fn lecar_metrics(&self) -> &LecarCacheMetrics {
        &self.metrics
    }

    /// Returns the value for `key`, counting a hit and promoting the entry in
    /// both the recency and the frequency order.
    ///
    /// On a miss, if `key` was evicted by one of the policies and its record
    /// has not expired yet, that policy's weight is raised. The record is
    /// consumed, so a second miss on the same key changes nothing.
    pub fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        if !self.store.contains(key) {
            self.miss(key);
            return None;
        }
        let value = self.store.touch(key)?;
        self.metrics.core.record_hit(value.as_ref().len() as u64);
        Some(value)
    }

    /// Looks up `key` without counting a hit or promoting the entry.
    pub fn peek<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.store.peek(key)
    }

    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.store.contains(key)
    }

    /// Access count of a live entry: 1 on insertion, plus one per hit.
    pub fn frequency<Q>(&self, key: &Q) -> Option<u64>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.store.frequency(key)
    }

    /// The policy holding an unexpired eviction record for `key`, if any.
    pub fn evicted_by<Q>(&self, key: &Q) -> Option<Policy>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.history.evicted_by(key)
    }

    /// Iterates live keys from most to least recently used.
    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.store.keys_by_recency()
    }

    /// Stores `value` under `key`, evicting until it fits.
    ///
    /// Returns `false` without changing anything if the entry alone is larger
    /// than the capacity. An existing entry for `key` is replaced; replacing
    /// is not an eviction, so it leaves no history and does not move the
    /// clock. The new entry starts over at frequency 1.
    pub fn put(&mut self, key: K, value: V) -> bool {
        let needed = entry_size(&key, &value);
        if needed > self.capacity {
            log::debug!(
                "rejected entry of {needed} bytes, capacity is {}",
                self.capacity
            );
            return false;
        }

        if let Some(old) = self.store.remove(&key) {
            self.size -= old.size;
            self.metrics.core.record_removal(old.size as u64);
        }

        while self.capacity - self.size < needed {
            self.evict_one();
        }

        let size = self.store.insert(key, value);
        self.size += size;
        self.metrics.core.record_insertion(size as u64);
        true
    }

    /// Removes `key` and returns its value. Like an overwrite, this is not a
    /// policy decision and is not remembered in the history.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let removed = self.store.remove(key)?;
        self.size -= removed.size;
        self.metrics.core.record_removal(removed.size as u64);
        Some(removed.value)
    }

    /// Drops every entry. Weights, clock, history and counters are kept.
    pub fn clear(&mut self) {
        self.store.clear();
        self.metrics.core.record_removal(self.size as u64);
        self.size = 0;
    }

    fn miss<Q>(&mut self, key: &Q)
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.metrics.core.record_miss();
        let Some((policy, evicted_at)) = self.history.consume(key) else {
            return;
        };
        let update = self.weigher.update_weight(policy, evicted_at);
        log::debug!(
            "regret on {} eviction {} ticks ago (factor {:.4}): w_lru {:.4} w_lfu {:.4}",
            update.policy,
            update.time_passed,
            update.regret,
            update.weights.lru,
            update.weights.lfu
        );
        self.metrics.record_regret(policy, update.weights);
    }

    /// Evicts one entry chosen by a randomly drawn policy and records it.
    ///
    /// # Panics
    ///
    /// Panics if the chosen index is empty, which means the byte accounting
    /// no longer matches the stored entries.
    fn evict_one(&mut self) {
        let policy = self.weigher.select_policy();
        let victim = match policy {
            Policy::Lru => self.store.pop_least_recent(),
            Policy::Lfu => self.store.pop_least_frequent(),
        };
        let Some(victim) = victim else {
            log::error!(
                "{policy} index is empty with {} of {} bytes accounted",
                self.size,
                self.capacity
            );
            panic!(
                "{policy} index is empty while {} bytes are accounted as live",
                self.size
            );
        };

        let clock = self.weigher.clock();
        self.size -= victim.size;
        log::debug!("{policy} evicted {} bytes at clock {clock}", victim.size);

        self.history.record_eviction(victim.key, policy, clock);
        self.weigher.tick();

        let now = self.weigher.clock();
        let expired = self.history.expire(now);
        self.metrics
            .record_policy_eviction(policy, victim.size as u64, now);
        self.metrics.record_expired(expired);
    }
}

impl<K, V, S> CacheMetrics for LecarCache<K, V, S>
where
    K: Hash + Eq + Clone + AsRef<[u8]>,
    V: AsRef<[u8]>,
    S: BuildHasher,
{
    fn metrics(&self) -> BTreeMap<String, f64> {
        let mut metrics = self.metrics.metrics();
        metrics.insert("history_len".to_string(), self.history.len() as f64);
        metrics.insert(
            "active_frequencies".to_string(),
            self.store.active_frequencies() as f64,
        );
        if let Some(min) = self.store.min_frequency() {
            metrics.insert("min_frequency".to_string(), min as f64);
        }
        metrics
    }

    fn algorithm_name(&self) -> &'static str {
        self.metrics.algorithm_name()
    }
}

impl<K, V, S> fmt::Debug for LecarCache<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LecarCache")
            .field("capacity", &self.capacity)
            .field("size", &self.size)
            .field("store", &self.store)
            .field("history", &self.history)
            .field("weigher", &self.weigher)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn make_cache(capacity: usize, seed: u64) -> LecarCache<&'static str, &'static str> {
        let config = LecarCacheConfig {
            seed: Some(seed),
            ..LecarCacheConfig::new(NonZeroUsize::new(capacity).unwrap())
        };
        LecarCache::init(config, None).unwrap()
    }

    fn live_bytes<K, V, S>(cache: &LecarCache<K, V, S>) -> usize
    where
        K: Hash + Eq + Clone + AsRef<[u8]>,
        V: AsRef<[u8]>,
        S: BuildHasher,
    {
        cache
            .keys()
            .map(|k| entry_size(k, cache.peek(k).unwrap()))
            .sum()
    }

    #[test]
    fn test_lecar_get_put() {
        let mut cache = make_cache(1000, 1);
        assert!(cache.put("key0", "key0"));
        assert_eq!(cache.get(&"key0"), Some(&"key0"));
        assert_eq!(cache.get(&"key1"), None);

        assert_eq!(cache.stats(), CacheStats { hits: 1, misses: 1 });
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.max_storage(), 1000);
        assert_eq!(cache.remaining_storage(), 992);
        assert_eq!(cache.frequency(&"key0"), Some(2));
    }

    #[test]
    fn test_lecar_rejects_oversized_entry() {
        let mut cache = make_cache(10, 1);
        assert!(cache.put("abc", "def"));
        let weights = cache.weights();

        assert!(!cache.put("k", "0123456789"));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.remaining_storage(), 4);
        assert_eq!(cache.weights(), weights);
        assert_eq!(cache.clock(), 0);
        assert!(!cache.contains(&"k"));

        // exactly the capacity still fits
        assert!(cache.put("k", "012345678"));
        assert_eq!(cache.remaining_storage(), 0);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_lecar_overwrite_is_not_an_eviction() {
        let mut cache = make_cache(100, 1);
        cache.put("a", "1");
        cache.get(&"a");
        assert!(cache.put("a", "2345"));

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.peek(&"a"), Some(&"2345"));
        assert_eq!(cache.frequency(&"a"), Some(1));
        assert_eq!(cache.remaining_storage(), 95);
        assert_eq!(cache.clock(), 0);
        assert_eq!(cache.history_len(), 0);
        cache.store.assert_consistent();
    }

    #[test]
    fn test_lecar_remove_leaves_no_history() {
        let mut cache = make_cache(100, 1);
        cache.put("a", "1");
        cache.put("b", "2");
        assert_eq!(cache.remove(&"a"), Some("1"));
        assert_eq!(cache.remove(&"a"), None);
        assert_eq!(cache.remaining_storage(), 98);
        assert_eq!(cache.history_len(), 0);

        let weights = cache.weights();
        assert_eq!(cache.get(&"a"), None);
        assert_eq!(cache.weights(), weights);
        cache.store.assert_consistent();
    }

    #[test]
    fn test_lecar_lru_regret_raises_lru_weight() {
        let mut cache = make_cache(6, 1);
        cache.put("a", "x");
        cache.put("b", "x");
        cache.put("c", "x");
        cache.get(&"a");
        cache.get(&"a");

        cache.weigher.force_weights(PolicyWeights { lru: 1.0, lfu: 0.0 });
        cache.put("d", "x");
        // "b" is the least recently used entry, "a" the most frequent
        assert!(!cache.contains(&"b"));
        assert_eq!(cache.evicted_by(&"b"), Some(Policy::Lru));
        assert_eq!(cache.clock(), 1);

        cache.weigher.force_weights(PolicyWeights::default());
        assert_eq!(cache.get(&"b"), None);
        assert!(cache.weights().lru > 0.5);
        assert!((cache.weights().lru + cache.weights().lfu - 1.0).abs() < 1e-12);
        assert_eq!(cache.lecar_metrics().lru_regrets, 1);

        // the record was consumed by the first miss
        let weights = cache.weights();
        assert_eq!(cache.get(&"b"), None);
        assert_eq!(cache.weights(), weights);
        assert_eq!(cache.stats().misses, 2);
    }

    #[test]
    fn test_lecar_lfu_eviction_spares_frequent_key() {
        let mut cache = make_cache(6, 1);
        cache.put("a", "x");
        cache.put("b", "x");
        cache.put("c", "x");
        cache.get(&"a");
        cache.get(&"b");

        cache.weigher.force_weights(PolicyWeights { lru: 0.0, lfu: 1.0 });
        cache.put("d", "x");
        assert!(!cache.contains(&"c"));
        assert!(cache.contains(&"a"));
        assert_eq!(cache.evicted_by(&"c"), Some(Policy::Lfu));

        cache.weigher.force_weights(PolicyWeights::default());
        cache.get(&"c");
        assert!(cache.weights().lfu > 0.5);
        assert_eq!(cache.lecar_metrics().lfu_regrets, 1);
    }

    #[test]
    fn test_lecar_put_evicts_until_it_fits() {
        let mut cache = make_cache(10, 3);
        for key in ["a", "b", "c", "d", "e"] {
            cache.put(key, "x");
        }
        assert_eq!(cache.remaining_storage(), 0);

        assert!(cache.put("big", "1234567"));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.remaining_storage(), 0);
        assert_eq!(cache.clock(), 5);
        assert_eq!(cache.history_len(), 5);
        assert_eq!(cache.lecar_metrics().core.evictions, 5);
    }

    #[test]
    fn test_lecar_history_window_expires_records() {
        let config = LecarCacheConfig {
            seed: Some(5),
            history_window: 1,
            ..LecarCacheConfig::new(NonZeroUsize::new(1).unwrap())
        };
        let mut cache: LecarCache<&str, &str> = LecarCache::init(config, None).unwrap();
        cache.put("a", "");
        cache.put("b", "");
        assert!(cache.evicted_by(&"a").is_some());
        cache.put("c", "");
        cache.put("d", "");

        // "a" went out at clock 0 and the clock is now 3
        assert_eq!(cache.evicted_by(&"a"), None);
        assert_eq!(cache.history_len(), 1);
        assert_eq!(cache.lecar_metrics().expired_history, 2);

        let weights = cache.weights();
        cache.get(&"a");
        assert_eq!(cache.weights(), weights);
    }

    #[test]
    fn test_lecar_clear_keeps_learning_state() {
        let mut cache = make_cache(4, 1);
        cache.put("a", "x");
        cache.put("b", "x");
        cache.put("c", "x");
        cache.get(&"c");
        let clock = cache.clock();
        let stats = cache.stats();

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.remaining_storage(), 4);
        assert_eq!(cache.clock(), clock);
        assert_eq!(cache.stats(), stats);
        assert_eq!(cache.history_len(), 1);
        assert_eq!(cache.lecar_metrics().core.cache_size_bytes, 0);

        assert!(cache.put("c", "x"));
        cache.store.assert_consistent();
    }

    #[test]
    fn test_lecar_owned_keys_borrow_lookup() {
        let mut cache: LecarCache<String, Vec<u8>> =
            LecarCache::new(NonZeroUsize::new(64).unwrap());
        assert!(cache.put("alpha".to_string(), vec![1, 2, 3]));
        assert_eq!(cache.get("alpha"), Some(&vec![1, 2, 3]));
        assert_eq!(cache.remaining_storage(), 56);
        assert_eq!(cache.remove("alpha"), Some(vec![1, 2, 3]));
    }

    #[test]
    fn test_lecar_metrics_map() {
        let mut cache = make_cache(4, 1);
        cache.put("a", "x");
        cache.put("b", "x");
        cache.put("c", "x");
        cache.get(&"c");

        let metrics = cache.metrics();
        assert_eq!(cache.algorithm_name(), "LeCaR");
        assert_eq!(metrics["evictions"], 1.0);
        assert_eq!(metrics["lru_evictions"] + metrics["lfu_evictions"], 1.0);
        assert_eq!(metrics["history_len"], 1.0);
        assert_eq!(metrics["cache_size_bytes"], 4.0);
        assert_eq!(metrics["clock"], 1.0);
        assert!(metrics.contains_key("min_frequency"));
    }

    #[test]
    #[should_panic(expected = "index is empty")]
    fn test_lecar_broken_accounting_panics() {
        let mut cache = make_cache(4, 1);
        cache.size = 4;
        cache.put("a", "x");
    }

    #[test]
    fn test_lecar_random_ops_keep_invariants() {
        const KEYS: [&str; 12] = [
            "k0", "k1", "k2", "k3", "k4", "k5", "k6", "k7", "k8", "k9", "k10", "k11",
        ];
        const VALUES: [&str; 5] = ["", "v", "vv", "vvvv", "vvvvvvvvvvvvvvvv"];

        let mut rng = StdRng::seed_from_u64(0x1eca);
        let mut cache = make_cache(40, 11);

        for _ in 0..5_000 {
            let key = KEYS[rng.gen_range(0..KEYS.len())];
            match rng.gen_range(0..10) {
                0..=4 => {
                    cache.get(&key);
                }
                5..=8 => {
                    let value = VALUES[rng.gen_range(0..VALUES.len())];
                    assert!(cache.put(key, value));
                    assert_eq!(cache.peek(&key), Some(&value));
                }
                _ => {
                    cache.remove(&key);
                }
            }

            cache.store.assert_consistent();
            assert_eq!(cache.remaining_storage(), 40 - live_bytes(&cache));
            let w = cache.weights();
            assert!((w.lru + w.lfu - 1.0).abs() < 1e-9);
            assert!(cache.history_len() as u64 <= 40);
        }
        assert!(cache.clock() > 0);
    }
}
