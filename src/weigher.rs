//! Policy weights, the logical clock and the regret update.
//!
//! The weigher holds one probability per eviction policy. Each eviction draws
//! a policy at random according to these probabilities. When a key that a
//! policy evicted is requested again, that policy's weight is multiplied by
//! `e^(learning_rate * discount^age)` and both weights are renormalized, where
//! `age` is the number of evictions since the key was thrown out.
//!
//! The clock advances once per eviction and never on plain gets or puts.

use crate::config::LecarCacheConfig;
use core::fmt;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// The two eviction policies LeCaR arbitrates between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Policy {
    /// Least recently used: evict the entry idle for the longest time.
    Lru,
    /// Least frequently used: evict the entry with the lowest access count,
    /// oldest first among equals.
    Lfu,
}

impl Policy {
    /// Short upper-case name, e.g. `"LRU"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Policy::Lru => "LRU",
            Policy::Lfu => "LFU",
        }
    }

    /// The competing policy.
    pub fn other(self) -> Policy {
        match self {
            Policy::Lru => Policy::Lfu,
            Policy::Lfu => Policy::Lru,
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Selection probabilities of the two policies. They always sum to 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolicyWeights {
    /// Probability of evicting by recency.
    pub lru: f64,
    /// Probability of evicting by frequency.
    pub lfu: f64,
}

impl PolicyWeights {
    /// Weight of `policy`.
    pub fn of(&self, policy: Policy) -> f64 {
        match policy {
            Policy::Lru => self.lru,
            Policy::Lfu => self.lfu,
        }
    }
}

impl Default for PolicyWeights {
    fn default() -> Self {
        PolicyWeights { lru: 0.5, lfu: 0.5 }
    }
}

/// Outcome of one weight update, kept for logging and metrics.
#[derive(Debug, Clone, Copy)]
pub(crate) struct WeightUpdate {
    pub(crate) policy: Policy,
    pub(crate) time_passed: u64,
    pub(crate) regret: f64,
    pub(crate) weights: PolicyWeights,
}

pub(crate) struct PolicyWeigher {
    weights: PolicyWeights,
    learning_rate: f64,
    /// Already normalized to the capacity.
    discount_rate: f64,
    clock: u64,
    rng: StdRng,
}

impl PolicyWeigher {
    /// Builds a weigher from a validated config, starting at 0.5 / 0.5.
    pub(crate) fn new(config: &LecarCacheConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        PolicyWeigher {
            weights: PolicyWeights::default(),
            learning_rate: config.learning_rate,
            discount_rate: config.normalized_discount_rate(),
            clock: 0,
            rng,
        }
    }

    #[inline]
    pub(crate) fn weights(&self) -> PolicyWeights {
        self.weights
    }

    #[inline]
    pub(crate) fn clock(&self) -> u64 {
        self.clock
    }

    #[cfg(test)]
    pub(crate) fn discount_rate(&self) -> f64 {
        self.discount_rate
    }

    /// Advances the logical clock by one eviction.
    #[inline]
    pub(crate) fn tick(&mut self) {
        self.clock += 1;
    }

    /// Draws uniformly from `[0, 1)`; LFU wins when the draw is at most its weight.
    pub(crate) fn select_policy(&mut self) -> Policy {
        let sample: f64 = self.rng.gen();
        let policy = if sample <= self.weights.lfu {
            Policy::Lfu
        } else {
            Policy::Lru
        };
        log::trace!("draw {sample:.4} against w_lfu {:.4} -> {policy}", self.weights.lfu);
        policy
    }

    /// Rewards `policy` for an eviction made at clock `evicted_at` that was
    /// requested again, then renormalizes.
    ///
    /// # Panics
    ///
    /// Panics if `evicted_at` lies in the future of the current clock, which
    /// can only happen if eviction records were stamped incorrectly.
    pub(crate) fn update_weight(&mut self, policy: Policy, evicted_at: u64) -> WeightUpdate {
        let Some(time_passed) = self.clock.checked_sub(evicted_at) else {
            log::error!(
                "eviction record stamped at {evicted_at} is ahead of clock {}",
                self.clock
            );
            panic!(
                "eviction record clock {evicted_at} is ahead of the logical clock {}",
                self.clock
            );
        };

        let regret = self.discount_rate.powf(time_passed as f64);
        let (this, other) = match policy {
            Policy::Lru => (self.weights.lru, self.weights.lfu),
            Policy::Lfu => (self.weights.lfu, self.weights.lru),
        };
        // this * e^x / (this * e^x + other), rearranged so a large
        // learning rate cannot overflow to inf / inf
        let damping = (-self.learning_rate * regret).exp();
        let this = if this > 0.0 {
            this / (this + other * damping)
        } else {
            0.0
        };
        let other = 1.0 - this;
        self.weights = match policy {
            Policy::Lru => PolicyWeights {
                lru: this,
                lfu: other,
            },
            Policy::Lfu => PolicyWeights {
                lru: other,
                lfu: this,
            },
        };

        WeightUpdate {
            policy,
            time_passed,
            regret,
            weights: self.weights,
        }
    }

    #[cfg(test)]
    pub(crate) fn force_weights(&mut self, weights: PolicyWeights) {
        self.weights = weights;
    }
}

impl fmt::Debug for PolicyWeigher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolicyWeigher")
            .field("weights", &self.weights)
            .field("learning_rate", &self.learning_rate)
            .field("discount_rate", &self.discount_rate)
            .field("clock", &self.clock)
            .finish()
    }
}
