//! LeCaR Cache Metrics
//!
//! Metrics specific to the learning cache: how many evictions each policy
//! made, how often each was "regretted", and where the weights stand.

use super::{CacheMetrics, CacheStats, CoreCacheMetrics};
use crate::weigher::{Policy, PolicyWeights};
use std::collections::BTreeMap;

/// LeCaR-specific metrics (extends CoreCacheMetrics)
#[derive(Debug, Clone)]
pub struct LecarCacheMetrics {
    /// Core metrics common to all cache algorithms
    pub core: CoreCacheMetrics,

    /// Evictions made by the recency policy
    pub lru_evictions: u64,

    /// Evictions made by the frequency policy
    pub lfu_evictions: u64,

    /// Misses on keys the recency policy had evicted (weight updates for LRU)
    pub lru_regrets: u64,

    /// Misses on keys the frequency policy had evicted (weight updates for LFU)
    pub lfu_regrets: u64,

    /// Eviction records dropped by the history window before being requested
    pub expired_history: u64,

    /// Weights after the latest update
    pub weights: PolicyWeights,

    /// Logical clock (evictions so far)
    pub clock: u64,
}

impl LecarCacheMetrics {
    /// Creates a new LecarCacheMetrics instance for a cache of `max_cache_size_bytes`
    pub fn new(max_cache_size_bytes: u64) -> Self {
        Self {
            core: CoreCacheMetrics::new(max_cache_size_bytes),
            lru_evictions: 0,
            lfu_evictions: 0,
            lru_regrets: 0,
            lfu_regrets: 0,
            expired_history: 0,
            weights: PolicyWeights::default(),
            clock: 0,
        }
    }

    /// Records an eviction made by `policy`
    pub fn record_policy_eviction(&mut self, policy: Policy, evicted_size: u64, clock: u64) {
        self.core.record_eviction(evicted_size);
        match policy {
            Policy::Lru => self.lru_evictions += 1,
            Policy::Lfu => self.lfu_evictions += 1,
        }
        self.clock = clock;
    }

    /// Records a weight update triggered by a miss on a key `policy` evicted
    pub fn record_regret(&mut self, policy: Policy, weights: PolicyWeights) {
        match policy {
            Policy::Lru => self.lru_regrets += 1,
            Policy::Lfu => self.lfu_regrets += 1,
        }
        self.weights = weights;
    }

    /// Records eviction records dropped by the history window
    pub fn record_expired(&mut self, count: usize) {
        self.expired_history += count as u64;
    }

    /// Hit and miss counters
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.core.cache_hits,
            misses: self.core.cache_misses(),
        }
    }

    /// Share of evictions made by the frequency policy
    pub fn lfu_eviction_share(&self) -> f64 {
        let total = self.lru_evictions + self.lfu_evictions;
        if total > 0 {
            self.lfu_evictions as f64 / total as f64
        } else {
            0.0
        }
    }

    /// Converts LeCaR metrics to a BTreeMap for reporting
    pub fn to_btreemap(&self) -> BTreeMap<String, f64> {
        let mut metrics = self.core.to_btreemap();

        metrics.insert("lru_evictions".to_string(), self.lru_evictions as f64);
        metrics.insert("lfu_evictions".to_string(), self.lfu_evictions as f64);
        metrics.insert("lfu_eviction_share".to_string(), self.lfu_eviction_share());
        metrics.insert("lru_regrets".to_string(), self.lru_regrets as f64);
        metrics.insert("lfu_regrets".to_string(), self.lfu_regrets as f64);
        metrics.insert("expired_history".to_string(), self.expired_history as f64);
        metrics.insert("weight_lru".to_string(), self.weights.lru);
        metrics.insert("weight_lfu".to_string(), self.weights.lfu);
        metrics.insert("clock".to_string(), self.clock as f64);

        metrics
    }
}

impl CacheMetrics for LecarCacheMetrics {
    fn metrics(&self) -> BTreeMap<String, f64> {
        self.to_btreemap()
    }

    fn algorithm_name(&self) -> &'static str {
        "LeCaR"
    }
}
