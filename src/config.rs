//! Cache Configuration Module
//!
//! This module provides the configuration structure for [`LecarCache`](crate::LecarCache).
//! Like the other caches in this family, the config is a plain struct with
//! public fields; [`LecarCacheConfig::new`] fills in the usual hyperparameters
//! so only the byte capacity has to be chosen.
//!
//! # Parameters
//!
//! | Field | Meaning | Default |
//! |-------|---------|---------|
//! | `capacity` | Byte budget, counted as `key.len() + value.len()` per entry | required |
//! | `learning_rate` | Step size of the multiplicative weight update | `0.45` |
//! | `discount_rate` | Per-capacity decay of old regret, in `(0, 1)` | `0.005` |
//! | `history_window` | Clock ticks an eviction record stays usable | `capacity` |
//! | `seed` | Seed for the policy draw; `None` uses OS entropy | `None` |
//!
//! The discount rate is normalized once at construction to
//! `discount_rate^(1 / capacity)`, so a record `capacity` evictions old
//! contributes `discount_rate` of the regret of a fresh one.
//!
//! # Examples
//!
//! ```
//! use lecar_cache::config::LecarCacheConfig;
//! use lecar_cache::LecarCache;
//! use core::num::NonZeroUsize;
//!
//! // Defaults apart from the capacity
//! let config = LecarCacheConfig::new(NonZeroUsize::new(64 * 1024).unwrap());
//! let cache: LecarCache<String, Vec<u8>> = LecarCache::init(config, None).unwrap();
//!
//! // Everything spelled out, with a fixed seed for reproducible evictions
//! let config = LecarCacheConfig {
//!     capacity: NonZeroUsize::new(1000).unwrap(),
//!     learning_rate: 0.45,
//!     discount_rate: 0.005,
//!     history_window: 1000,
//!     seed: Some(7),
//! };
//! let cache: LecarCache<String, Vec<u8>> = LecarCache::init(config, None).unwrap();
//! ```

use core::fmt;
use core::num::NonZeroUsize;

/// Learning rate used by [`LecarCacheConfig::new`].
pub const DEFAULT_LEARNING_RATE: f64 = 0.45;

/// Discount rate used by [`LecarCacheConfig::new`].
pub const DEFAULT_DISCOUNT_RATE: f64 = 0.005;

/// Reasons a [`LecarCacheConfig`] is rejected at construction time.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// The learning rate is not a finite number greater than zero.
    #[error("learning rate must be finite and > 0, got {0}")]
    InvalidLearningRate(f64),
    /// The discount rate is outside the open interval (0, 1).
    #[error("discount rate must lie strictly between 0 and 1, got {0}")]
    InvalidDiscountRate(f64),
    /// The history window is zero, which would disable learning entirely.
    #[error("history window must be at least one clock tick")]
    InvalidHistoryWindow,
}

/// Configuration for a LeCaR (Learning Cache Replacement) cache.
///
/// # Fields
///
/// - `capacity`: Maximum number of bytes the cache may hold
/// - `learning_rate`: How strongly a single regret signal moves the weights
/// - `discount_rate`: How fast the regret of an old eviction fades
/// - `history_window`: How many evictions an eviction record survives
/// - `seed`: Optional seed for the random policy selection
///
/// # Examples
///
/// ```
/// use lecar_cache::config::LecarCacheConfig;
/// use core::num::NonZeroUsize;
///
/// let config = LecarCacheConfig {
///     seed: Some(42),
///     ..LecarCacheConfig::new(NonZeroUsize::new(4096).unwrap())
/// };
/// assert!(config.validate().is_ok());
/// assert_eq!(config.history_window, 4096);
/// ```
#[derive(Clone, Copy)]
pub struct LecarCacheConfig {
    /// Maximum total size in bytes (sum of key and value lengths)
    pub capacity: NonZeroUsize,
    /// Learning rate of the weight update; must be > 0
    pub learning_rate: f64,
    /// Raw discount rate in (0, 1), normalized by the capacity at construction
    pub discount_rate: f64,
    /// Clock ticks after which an eviction record is dropped; must be > 0
    pub history_window: u64,
    /// Seed for the policy selection RNG. `None` seeds from OS entropy.
    pub seed: Option<u64>,
}

impl LecarCacheConfig {
    /// Creates a config with the default hyperparameters for `capacity` bytes.
    pub fn new(capacity: NonZeroUsize) -> Self {
        LecarCacheConfig {
            capacity,
            learning_rate: DEFAULT_LEARNING_RATE,
            discount_rate: DEFAULT_DISCOUNT_RATE,
            history_window: capacity.get() as u64,
            seed: None,
        }
    }

    /// Checks the hyperparameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(ConfigError::InvalidLearningRate(self.learning_rate));
        }
        if !(self.discount_rate > 0.0 && self.discount_rate < 1.0) {
            return Err(ConfigError::InvalidDiscountRate(self.discount_rate));
        }
        if self.history_window == 0 {
            return Err(ConfigError::InvalidHistoryWindow);
        }
        Ok(())
    }

    /// The discount rate actually applied per clock tick:
    /// `discount_rate^(1 / capacity)`.
    pub fn normalized_discount_rate(&self) -> f64 {
        self.discount_rate.powf(1.0 / self.capacity.get() as f64)
    }
}

impl fmt::Debug for LecarCacheConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LecarCacheConfig")
            .field("capacity", &self.capacity)
            .field("learning_rate", &self.learning_rate)
            .field("discount_rate", &self.discount_rate)
            .field("history_window", &self.history_window)
            .field("seed", &self.seed)
            .finish()
    }
}

/// Configuration for a [`ConcurrentLecarCache`](crate::ConcurrentLecarCache).
///
/// The concurrent cache guards a single LeCaR instance with one lock, so it
/// takes exactly the same parameters.
#[cfg(feature = "concurrent")]
pub type ConcurrentLecarCacheConfig = LecarCacheConfig;
