//! Concurrent LeCaR Cache
//!
//! A thread-safe wrapper around [`LecarCache`](crate::LecarCache) that holds
//! one `parking_lot::Mutex` for the whole duration of every call.
//!
//! ```text
//! ┌──────────────────────────────────────┐
//! │        ConcurrentLecarCache          │
//! │                                      │
//! │   ┌────────────────────────────┐     │
//! │   │           Mutex            │     │
//! │   └─────────────┬──────────────┘     │
//! │   ┌─────────────▼──────────────┐     │
//! │   │ LecarCache                 │     │
//! │   │  store ── recency/buckets  │     │
//! │   │  history ── weigher/clock  │     │
//! │   └────────────────────────────┘     │
//! └──────────────────────────────────────┘
//! ```
//!
//! ## Why one lock and no segments?
//!
//! A `put` may evict several entries, and each eviction touches the store,
//! one of the two indices, the history and the clock. The learned weights are
//! global state too: splitting keys across segments would give every segment
//! its own weights and its own notion of regret. So the whole cache sits
//! behind a single lock.
//!
//! ## Why Mutex Instead of RwLock?
//!
//! Every `get()` mutates: a hit moves the entry in the recency list and in the
//! frequency buckets, and a miss may consume a history record and update the
//! weights. A read lock would never be enough.
//!
//! # Example
//!
//! ```
//! use lecar_cache::concurrent::ConcurrentLecarCache;
//! use lecar_cache::config::ConcurrentLecarCacheConfig;
//! use std::num::NonZeroUsize;
//! use std::sync::Arc;
//! use std::thread;
//!
//! let config = ConcurrentLecarCacheConfig::new(NonZeroUsize::new(4096).unwrap());
//! let cache: Arc<ConcurrentLecarCache<String, Vec<u8>>> =
//!     Arc::new(ConcurrentLecarCache::init(config, None).unwrap());
//!
//! let handles: Vec<_> = (0..4)
//!     .map(|t| {
//!         let cache = Arc::clone(&cache);
//!         thread::spawn(move || {
//!             for i in 0..100 {
//!                 let key = format!("key_{}_{}", t, i);
//!                 cache.put(key.clone(), vec![0; 8]);
//!                 let _ = cache.get(&key);
//!             }
//!         })
//!     })
//!     .collect();
//!
//! for h in handles {
//!     h.join().unwrap();
//! }
//! assert!(cache.remaining_storage() <= 4096);
//! ```

use crate::config::{ConcurrentLecarCacheConfig, ConfigError};
use crate::lecar::LecarCache;
use crate::metrics::{CacheMetrics, CacheStats};
use crate::weigher::{Policy, PolicyWeights};
use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use core::num::NonZeroUsize;
use parking_lot::Mutex;
use std::collections::BTreeMap;

#[cfg(feature = "hashbrown")]
use hashbrown::DefaultHashBuilder;

#[cfg(not(feature = "hashbrown"))]
use std::collections::hash_map::RandomState as DefaultHashBuilder;

/// A thread-safe LeCaR cache.
///
/// All methods take `&self`, so the cache can be shared through an `Arc`.
/// Values are returned as clones so the lock is not held by the caller; use
/// [`get_with`](Self::get_with) to read a value in place.
pub struct ConcurrentLecarCache<K, V, S = DefaultHashBuilder> {
    inner: Mutex<LecarCache<K, V, S>>,
}

impl<K, V> ConcurrentLecarCache<K, V>
where
    K: Hash + Eq + Clone + AsRef<[u8]>,
    V: AsRef<[u8]>,
{
    /// Creates a concurrent cache of `capacity` bytes with default hyperparameters.
    pub fn new(capacity: NonZeroUsize) -> ConcurrentLecarCache<K, V, DefaultHashBuilder> {
        ConcurrentLecarCache {
            inner: Mutex::new(LecarCache::new(capacity)),
        }
    }

    /// Creates a concurrent cache from a configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] under the same conditions as
    /// [`LecarCache::init`].
    pub fn init(
        config: ConcurrentLecarCacheConfig,
        hasher: Option<DefaultHashBuilder>,
    ) -> Result<ConcurrentLecarCache<K, V, DefaultHashBuilder>, ConfigError> {
        Ok(ConcurrentLecarCache {
            inner: Mutex::new(LecarCache::init(config, hasher)?),
        })
    }
}

impl<K, V, S> ConcurrentLecarCache<K, V, S>
where
    K: Hash + Eq + Clone + AsRef<[u8]>,
    V: AsRef<[u8]>,
    S: BuildHasher,
{
    /// Creates a concurrent cache with a custom hash builder.
    pub fn init_with_hasher(
        config: ConcurrentLecarCacheConfig,
        hash_builder: S,
    ) -> Result<Self, ConfigError> {
        Ok(ConcurrentLecarCache {
            inner: Mutex::new(LecarCache::init_with_hasher(config, hash_builder)?),
        })
    }

    /// Wraps an existing cache.
    pub fn from_cache(cache: LecarCache<K, V, S>) -> Self {
        ConcurrentLecarCache {
            inner: Mutex::new(cache),
        }
    }

    /// Unwraps the inner cache.
    pub fn into_inner(self) -> LecarCache<K, V, S> {
        self.inner.into_inner()
    }

    /// Retrieves a clone of the value for `key`.
    ///
    /// Counts a hit or a miss exactly like [`LecarCache::get`], including the
    /// weight update on a regretted eviction.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        V: Clone,
    {
        self.inner.lock().get(key).cloned()
    }

    /// Retrieves a value and applies `f` to it while holding the lock.
    ///
    /// ```
    /// # use lecar_cache::concurrent::ConcurrentLecarCache;
    /// # use std::num::NonZeroUsize;
    /// let cache = ConcurrentLecarCache::new(NonZeroUsize::new(64).unwrap());
    /// cache.put("blob".to_string(), vec![7u8; 16]);
    /// assert_eq!(cache.get_with("blob", |v| v.len()), Some(16));
    /// ```
    pub fn get_with<Q, F, R>(&self, key: &Q, f: F) -> Option<R>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        F: FnOnce(&V) -> R,
    {
        self.inner.lock().get(key).map(f)
    }

    /// Stores `value` under `key`, evicting as needed. Returns `false` if the
    /// entry is larger than the whole cache.
    pub fn put(&self, key: K, value: V) -> bool {
        self.inner.lock().put(key, value)
    }

    pub fn remove<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.inner.lock().remove(key)
    }

    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.inner.lock().contains(key)
    }

    pub fn frequency<Q>(&self, key: &Q) -> Option<u64>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.inner.lock().frequency(key)
    }

    pub fn evicted_by<Q>(&self, key: &Q) -> Option<Policy>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.inner.lock().evicted_by(key)
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    pub fn max_storage(&self) -> usize {
        self.inner.lock().max_storage()
    }

    pub fn remaining_storage(&self) -> usize {
        self.inner.lock().remaining_storage()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.inner.lock().stats()
    }

    pub fn weights(&self) -> PolicyWeights {
        self.inner.lock().weights()
    }

    pub fn clock(&self) -> u64 {
        self.inner.lock().clock()
    }

    pub fn history_len(&self) -> usize {
        self.inner.lock().history_len()
    }
}

impl<K, V, S> CacheMetrics for ConcurrentLecarCache<K, V, S>
where
    K: Hash + Eq + Clone + AsRef<[u8]>,
    V: AsRef<[u8]>,
    S: BuildHasher,
{
    fn metrics(&self) -> BTreeMap<String, f64> {
        self.inner.lock().metrics()
    }

    fn algorithm_name(&self) -> &'static str {
        "ConcurrentLeCaR"
    }
}

impl<K, V, S> fmt::Debug for ConcurrentLecarCache<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.try_lock() {
            Some(cache) => f
                .debug_struct("ConcurrentLecarCache")
                .field("inner", &*cache)
                .finish(),
            None => f
                .debug_struct("ConcurrentLecarCache")
                .field("inner", &"<locked>")
                .finish(),
        }
    }
}
