#![doc = include_str!("../README.md")]
//!
//! ---
//!
//! # Code Reference
//!
//! ## How LeCaR Chooses a Victim
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────────┐
//! │                         One eviction in LeCaR                                │
//! ├─────────────────────────────────────────────────────────────────────────────┤
//! │                                                                              │
//! │   weights (w_lru, w_lfu) ──▶ random draw ──▶ LRU or LFU picks a victim       │
//! │                                                   │                          │
//! │                                                   ▼                          │
//! │                              history[policy][victim] = clock; clock += 1    │
//! │                                                                              │
//! │   later: get(victim) misses ──▶ policy regretted ──▶ its weight goes up      │
//! │                                                                              │
//! └─────────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Reference
//!
//! | Type | Description |
//! |------|-------------|
//! | [`LecarCache`] | Byte-bounded cache learning between LRU and LFU |
//! | [`LecarCacheConfig`](config::LecarCacheConfig) | Capacity and learning hyperparameters |
//! | [`Policy`] | The two eviction policies |
//! | [`PolicyWeights`] | Current selection probabilities |
//! | [`CacheStats`] | Hit and miss counters |
//! | `ConcurrentLecarCache` | Single-lock thread-safe wrapper (`concurrent` feature) |
//!
//! ## Code Examples
//!
//! ### Basic use
//!
//! ```rust
//! use lecar_cache::LecarCache;
//! use lecar_cache::config::LecarCacheConfig;
//! use core::num::NonZeroUsize;
//!
//! let config = LecarCacheConfig {
//!     seed: Some(1),
//!     ..LecarCacheConfig::new(NonZeroUsize::new(20).unwrap())
//! };
//! let mut cache = LecarCache::init(config, None).unwrap();
//!
//! cache.put("!key0", "val0");
//! cache.put("!key1", "val1");
//! for _ in 0..10 {
//!     cache.get(&"!key0");
//! }
//!
//! // Both policies agree that "!key1" has to go
//! cache.put("!key2", "val2");
//! assert!(cache.get(&"!key1").is_none());
//! assert!(cache.get(&"!key0").is_some());
//! ```
//!
//! ### Watching the weights move
//!
//! ```rust
//! use lecar_cache::{LecarCache, Policy};
//! use core::num::NonZeroUsize;
//!
//! let mut cache = LecarCache::new(NonZeroUsize::new(4).unwrap());
//! cache.put("a", "1");
//! cache.put("b", "2");
//! cache.put("c", "3"); // LRU and LFU both pick "a"
//!
//! let policy: Policy = cache.evicted_by(&"a").unwrap();
//! let before = cache.weights().of(policy);
//!
//! cache.get(&"a"); // a regretted eviction
//! assert!(cache.weights().of(policy) > before);
//! ```
//!
//! ## Modules
//!
//! - [`lecar`]: The cache itself
//! - [`config`]: Configuration and validation
//! - [`weigher`]: Policies and their weights
//! - [`metrics`]: Metrics collection for cache performance monitoring
//! - `concurrent`: Thread-safe wrapper (requires `concurrent` feature)

#[cfg(test)]
extern crate scoped_threadpool;

/// Slot arena and index-linked lists.
///
/// Internal infrastructure shared by the recency list and the frequency
/// buckets. Not part of the public API.
pub(crate) mod list;

/// Entry store with its recency and frequency indices.
pub(crate) mod store;

/// Per-policy eviction history.
pub(crate) mod history;

/// Eviction policies, their weights and the logical clock.
pub mod weigher;

/// Cache configuration structures.
pub mod config;

/// Learning Cache Replacement (LeCaR) cache implementation.
///
/// Provides a byte-bounded cache that evicts by LRU or LFU, chosen at random
/// according to weights it learns from its own eviction mistakes.
pub mod lecar;

/// Cache metrics system.
///
/// Counters common to every cache plus the LeCaR learning state, reported
/// through a common interface.
pub mod metrics;

/// Concurrent cache implementation.
///
/// Provides a thread-safe wrapper that serializes every call through one lock.
///
/// Available when the `concurrent` feature is enabled.
#[cfg(feature = "concurrent")]
pub mod concurrent;

pub use lecar::LecarCache;
pub use metrics::{CacheMetrics, CacheStats};
pub use weigher::{Policy, PolicyWeights};

#[cfg(feature = "concurrent")]
pub use concurrent::ConcurrentLecarCache;
