//! Eviction history used to detect regret.
//!
//! Each policy has its own ledger mapping an evicted key to the clock value at
//! its eviction. A key is recorded under at most one policy at a time; a new
//! record for a key replaces any older one under either policy.
//!
//! Records are one-shot: [`HistoryLedger::consume`] removes the record it
//! returns. Records that are never consumed expire once the clock has moved
//! more than `window` ticks past their eviction, which keeps the ledger at
//! about `window` records however long the cache runs.

use crate::weigher::Policy;
use core::borrow::Borrow;
use core::fmt;
use core::hash::Hash;
use std::collections::VecDeque;

#[cfg(feature = "hashbrown")]
use hashbrown::HashMap;

#[cfg(not(feature = "hashbrown"))]
use std::collections::HashMap;

pub(crate) struct HistoryLedger<K> {
    lru: HashMap<K, u64>,
    lfu: HashMap<K, u64>,
    /// Eviction order as `(clock, key)`. May hold keys whose record was since
    /// consumed or replaced; those are skipped on expiry.
    order: VecDeque<(u64, K)>,
    window: u64,
}

impl<K: Hash + Eq + Clone> HistoryLedger<K> {
    pub(crate) fn new(window: u64) -> Self {
        HistoryLedger {
            lru: HashMap::default(),
            lfu: HashMap::default(),
            order: VecDeque::new(),
            window,
        }
    }

    /// Number of live records across both ledgers.
    pub(crate) fn len(&self) -> usize {
        self.lru.len() + self.lfu.len()
    }

    /// Notes that `policy` evicted `key` at clock `clock`.
    pub(crate) fn record_eviction(&mut self, key: K, policy: Policy, clock: u64) {
        let (own, other) = self.ledgers_mut(policy);
        other.remove(&key);
        own.insert(key.clone(), clock);
        self.order.push_back((clock, key));
    }

    /// Removes and returns the record for `key`, if any.
    pub(crate) fn consume<Q>(&mut self, key: &Q) -> Option<(Policy, u64)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        if let Some(clock) = self.lru.remove(key) {
            debug_assert!(!self.lfu.contains_key(key), "key recorded by both policies");
            return Some((Policy::Lru, clock));
        }
        self.lfu.remove(key).map(|clock| (Policy::Lfu, clock))
    }

    /// Which policy currently holds a record for `key`.
    pub(crate) fn evicted_by<Q>(&self, key: &Q) -> Option<Policy>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        if self.lru.contains_key(key) {
            Some(Policy::Lru)
        } else if self.lfu.contains_key(key) {
            Some(Policy::Lfu)
        } else {
            None
        }
    }

    /// Drops records older than the window as of clock `now`. Returns how
    /// many live records were dropped.
    pub(crate) fn expire(&mut self, now: u64) -> usize {
        let mut dropped = 0;
        while let Some((clock, _)) = self.order.front() {
            if now.saturating_sub(*clock) <= self.window {
                break;
            }
            let Some((clock, key)) = self.order.pop_front() else {
                break;
            };
            // only drop the record this queue entry was pushed for
            for ledger in [&mut self.lru, &mut self.lfu] {
                if ledger.get(&key) == Some(&clock) {
                    ledger.remove(&key);
                    dropped += 1;
                }
            }
        }
        if dropped > 0 {
            log::debug!("expired {dropped} eviction records at clock {now}");
        }
        dropped
    }

    fn ledgers_mut(&mut self, policy: Policy) -> (&mut HashMap<K, u64>, &mut HashMap<K, u64>) {
        match policy {
            Policy::Lru => (&mut self.lru, &mut self.lfu),
            Policy::Lfu => (&mut self.lfu, &mut self.lru),
        }
    }
}

impl<K> fmt::Debug for HistoryLedger<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HistoryLedger")
            .field("lru", &self.lru.len())
            .field("lfu", &self.lfu.len())
            .field("window", &self.window)
            .finish()
    }
}
