//! Trace replay through a LeCaR cache
//!
//! Every request is a `get`; a miss is followed by a `put` of a value of the
//! requested size, so the cache only ever holds what the trace asked for.
//! Requests are streamed, keeping memory proportional to the cache size
//! (plus one key per distinct object, for the unique object count).
//!
//! An entry costs `key.len() + size` bytes. Objects whose entry is larger
//! than the whole cache are counted as rejected without allocating a value.

use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use lecar_cache::config::{ConfigError, LecarCacheConfig};
use lecar_cache::metrics::CacheMetrics;
use lecar_cache::{ConcurrentLecarCache, LecarCache};
use thiserror::Error;

use crate::input::{LogReader, TraceParseError};
use crate::models::{CacheMode, Request, SimulationConfig, SimulationResult};

/// Errors that stop a replay
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("cache capacity must be at least one byte")]
    ZeroCapacity,
    #[error("invalid cache configuration: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Trace(#[from] TraceParseError),
    #[error("no requests found in the trace")]
    EmptyTrace,
}

/// The cache a trace is replayed through
enum CacheWrapper {
    Sequential(LecarCache<String, Vec<u8>>),
    Concurrent(ConcurrentLecarCache<String, Vec<u8>>),
}

impl CacheWrapper {
    fn new(mode: CacheMode, config: LecarCacheConfig) -> Result<Self, ConfigError> {
        Ok(match mode {
            CacheMode::Sequential => CacheWrapper::Sequential(LecarCache::init(config, None)?),
            CacheMode::Concurrent => {
                CacheWrapper::Concurrent(ConcurrentLecarCache::init(config, None)?)
            }
        })
    }

    /// Returns true on a hit
    fn get(&mut self, key: &str) -> bool {
        match self {
            CacheWrapper::Sequential(c) => c.get(key).is_some(),
            CacheWrapper::Concurrent(c) => c.get_with(key, |_| ()).is_some(),
        }
    }

    /// Returns false if the object was too large to be cached
    fn put(&mut self, key: String, size: usize) -> bool {
        let value = vec![0; size];
        match self {
            CacheWrapper::Sequential(c) => c.put(key, value),
            CacheWrapper::Concurrent(c) => c.put(key, value),
        }
    }

    fn remaining_storage(&self) -> usize {
        match self {
            CacheWrapper::Sequential(c) => c.remaining_storage(),
            CacheWrapper::Concurrent(c) => c.remaining_storage(),
        }
    }

    fn metrics(&self) -> std::collections::BTreeMap<String, f64> {
        match self {
            CacheWrapper::Sequential(c) => c.metrics(),
            CacheWrapper::Concurrent(c) => c.metrics(),
        }
    }
}

/// Runner for trace replays
#[derive(Debug)]
pub struct SimulationRunner {
    config: SimulationConfig,
}

impl SimulationRunner {
    /// Create a new simulation runner
    pub fn new(config: SimulationConfig) -> Self {
        Self { config }
    }

    /// Cache configuration derived from the run configuration
    pub fn cache_config(&self) -> Result<LecarCacheConfig, SimulationError> {
        let capacity =
            NonZeroUsize::new(self.config.capacity).ok_or(SimulationError::ZeroCapacity)?;
        let mut config = LecarCacheConfig::new(capacity);
        config.learning_rate = self.config.learning_rate;
        config.discount_rate = self.config.discount_rate;
        if let Some(window) = self.config.history_window {
            config.history_window = window;
        }
        config.seed = self.config.seed;
        config.validate()?;
        Ok(config)
    }

    /// Replay the configured trace file or directory
    pub fn run(&self) -> Result<SimulationResult, SimulationError> {
        let reader = LogReader::new(&self.config.input);
        let files = reader.get_log_files()?;
        log::info!(
            "replaying {} trace file(s) from {}",
            files.len(),
            self.config.input.display()
        );
        self.replay(reader.stream_requests()?)
    }

    /// Replay a stream of requests through a fresh cache
    ///
    /// The first parse error aborts the replay.
    pub fn replay<I>(&self, requests: I) -> Result<SimulationResult, SimulationError>
    where
        I: IntoIterator<Item = Result<Request, TraceParseError>>,
    {
        let mut cache = CacheWrapper::new(self.config.mode, self.cache_config()?)?;
        let mut result = SimulationResult::default();
        let mut unique_objects: HashSet<String> = HashSet::new();
        let mut cache_time = Duration::ZERO;
        let start = Instant::now();

        for request in requests {
            let Request { key, size, .. } = request?;
            result.requests += 1;
            if !unique_objects.contains(&key) {
                unique_objects.insert(key.clone());
            }

            let op_start = Instant::now();
            let hit = cache.get(&key);
            if hit {
                result.hits += 1;
                result.bytes_hit = result.bytes_hit.saturating_add(size as u64);
            } else {
                result.misses += 1;
                result.bytes_miss = result.bytes_miss.saturating_add(size as u64);
                // refused objects are never allocated
                let fits = key.len().saturating_add(size) <= self.config.capacity;
                if !fits || !cache.put(key, size) {
                    result.rejected += 1;
                }
            }
            cache_time += op_start.elapsed();

            // Progress indicator every 10M requests
            if result.requests % 10_000_000 == 0 {
                log::info!("  replayed {} million requests", result.requests / 1_000_000);
            }
        }

        if result.requests == 0 {
            return Err(SimulationError::EmptyTrace);
        }

        let metrics = cache.metrics();
        let counter = |name: &str| metrics.get(name).copied().unwrap_or(0.0);
        result.unique_objects = unique_objects.len();
        result.weight_lru = counter("weight_lru");
        result.weight_lfu = counter("weight_lfu");
        result.clock = counter("clock") as u64;
        result.lru_evictions = counter("lru_evictions") as u64;
        result.lfu_evictions = counter("lfu_evictions") as u64;
        result.lru_regrets = counter("lru_regrets") as u64;
        result.lfu_regrets = counter("lfu_regrets") as u64;
        result.final_storage_bytes = self.config.capacity - cache.remaining_storage();
        result.cache_time = cache_time;
        result.duration = start.elapsed();

        log::info!(
            "replayed {} requests: hit rate {:.2}%, w_lru {:.4}, w_lfu {:.4}",
            result.requests,
            result.hit_rate(),
            result.weight_lru,
            result.weight_lfu
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn config(capacity: usize, mode: CacheMode) -> SimulationConfig {
        SimulationConfig {
            input: PathBuf::new(),
            capacity,
            learning_rate: 0.45,
            discount_rate: 0.005,
            history_window: None,
            seed: Some(7),
            mode,
        }
    }

    fn trace(events: &[(&str, usize)]) -> Vec<Result<Request, TraceParseError>> {
        events
            .iter()
            .enumerate()
            .map(|(i, &(key, size))| Ok(Request::new(i as u64, key, size)))
            .collect()
    }

    #[test]
    fn test_replay_counts_hits_and_misses() {
        let runner = SimulationRunner::new(config(100, CacheMode::Sequential));
        let result = runner
            .replay(trace(&[("a", 9), ("b", 9), ("a", 9), ("a", 9), ("c", 9)]))
            .unwrap();

        assert_eq!(result.requests, 5);
        assert_eq!(result.hits, 2);
        assert_eq!(result.misses, 3);
        assert_eq!(result.unique_objects, 3);
        assert_eq!(result.rejected, 0);
        // three entries of 1 key byte + 9 value bytes
        assert_eq!(result.final_storage_bytes, 30);
        assert_eq!(result.clock, 0);
        assert!((result.hit_rate() - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_replay_counts_rejected_objects() {
        let runner = SimulationRunner::new(config(10, CacheMode::Sequential));
        let result = runner
            .replay(trace(&[("big", 8), ("big", 8), ("ok", 8)]))
            .unwrap();

        assert_eq!(result.misses, 3);
        assert_eq!(result.rejected, 2);
        assert_eq!(result.final_storage_bytes, 10);
    }

    #[test]
    fn test_replay_rejects_huge_object_without_allocating() {
        let runner = SimulationRunner::new(config(1000, CacheMode::Sequential));
        let requests = vec![
            Ok(Request::new(0, "k", usize::MAX / 2)),
            Ok(Request::new(1, "k", usize::MAX)),
            Ok(Request::new(2, "small", 10)),
            Ok(Request::new(3, "small", 10)),
        ];
        let result = runner.replay(requests).unwrap();

        assert_eq!(result.misses, 3);
        assert_eq!(result.hits, 1);
        assert_eq!(result.rejected, 2);
        assert_eq!(result.final_storage_bytes, 15);
    }

    #[test]
    fn test_replay_evicts_and_learns() {
        let runner = SimulationRunner::new(config(20, CacheMode::Sequential));
        // each entry is 10 bytes, so only two fit
        let events: Vec<(&str, usize)> = ["a", "b", "c", "a", "b", "c", "a", "b", "c"]
            .iter()
            .map(|k| (*k, 9))
            .collect();
        let result = runner.replay(trace(&events)).unwrap();

        assert_eq!(result.hits, 0);
        assert_eq!(result.clock, result.lru_evictions + result.lfu_evictions);
        assert_eq!(result.clock, 7);
        assert!(result.lru_regrets + result.lfu_regrets > 0);
        assert!((result.weight_lru + result.weight_lfu - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_sequential_and_concurrent_agree() {
        let events: Vec<(String, usize)> = (0..500)
            .map(|i| (format!("k{}", (i * 7 + i / 3) % 40), 1 + i % 13))
            .collect();
        let borrowed: Vec<(&str, usize)> =
            events.iter().map(|(k, s)| (k.as_str(), *s)).collect();

        let seq = SimulationRunner::new(config(120, CacheMode::Sequential))
            .replay(trace(&borrowed))
            .unwrap();
        let conc = SimulationRunner::new(config(120, CacheMode::Concurrent))
            .replay(trace(&borrowed))
            .unwrap();

        assert_eq!(seq.hits, conc.hits);
        assert_eq!(seq.clock, conc.clock);
        assert_eq!(seq.weight_lru, conc.weight_lru);
        assert_eq!(seq.final_storage_bytes, conc.final_storage_bytes);
    }

    #[test]
    fn test_replay_errors() {
        let runner = SimulationRunner::new(config(10, CacheMode::Sequential));
        assert!(matches!(
            runner.replay(trace(&[])),
            Err(SimulationError::EmptyTrace)
        ));

        let bad = vec![Err(TraceParseError::Parse {
            path: PathBuf::from("t.tr"),
            line: 1,
            message: "missing size".to_string(),
        })];
        assert!(matches!(
            runner.replay(bad),
            Err(SimulationError::Trace(_))
        ));

        assert!(matches!(
            SimulationRunner::new(config(0, CacheMode::Sequential)).cache_config(),
            Err(SimulationError::ZeroCapacity)
        ));

        let mut bad_rate = config(10, CacheMode::Sequential);
        bad_rate.discount_rate = 1.5;
        assert!(matches!(
            SimulationRunner::new(bad_rate).cache_config(),
            Err(SimulationError::Config(_))
        ));
    }
}
