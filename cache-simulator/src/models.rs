// Data models for trace replay

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// A single request read from a trace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Timestamp as written in the trace; replay order is file order
    pub timestamp: u64,
    /// Cache key
    pub key: String,
    /// Size of the object in bytes
    pub size: usize,
}

impl Request {
    /// Create a new request
    pub fn new(timestamp: u64, key: impl Into<String>, size: usize) -> Self {
        Self {
            timestamp,
            key: key.into(),
            size,
        }
    }
}

/// Which cache type the trace is replayed through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CacheMode {
    /// `LecarCache`
    Sequential,
    /// `ConcurrentLecarCache`, driven from one thread
    Concurrent,
}

impl CacheMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheMode::Sequential => "Sequential",
            CacheMode::Concurrent => "Concurrent",
        }
    }
}

impl fmt::Display for CacheMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Configuration for a replay run
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Trace file, or directory of trace files
    pub input: PathBuf,
    /// Cache capacity in bytes
    pub capacity: usize,
    pub learning_rate: f64,
    pub discount_rate: f64,
    /// Defaults to the capacity when unset
    pub history_window: Option<u64>,
    pub seed: Option<u64>,
    pub mode: CacheMode,
}

/// Results of a replay run
#[derive(Debug, Clone, Default)]
pub struct SimulationResult {
    pub requests: u64,
    pub hits: u64,
    pub misses: u64,
    /// Bytes requested by hits
    pub bytes_hit: u64,
    /// Bytes requested by misses
    pub bytes_miss: u64,
    /// Misses whose object was larger than the whole cache
    pub rejected: u64,
    /// Distinct keys seen in the trace
    pub unique_objects: usize,
    pub weight_lru: f64,
    pub weight_lfu: f64,
    pub clock: u64,
    pub lru_evictions: u64,
    pub lfu_evictions: u64,
    pub lru_regrets: u64,
    pub lfu_regrets: u64,
    /// Bytes held by the cache when the trace ended
    pub final_storage_bytes: usize,
    /// Wall time of the whole replay, I/O included
    pub duration: Duration,
    /// Time spent inside cache calls only
    pub cache_time: Duration,
}

impl SimulationResult {
    /// Hit rate as a percentage
    pub fn hit_rate(&self) -> f64 {
        if self.requests > 0 {
            (self.hits as f64 / self.requests as f64) * 100.0
        } else {
            0.0
        }
    }

    /// Byte hit rate as a percentage
    pub fn byte_hit_rate(&self) -> f64 {
        let total = self.bytes_hit.saturating_add(self.bytes_miss);
        if total > 0 {
            (self.bytes_hit as f64 / total as f64) * 100.0
        } else {
            0.0
        }
    }

    /// Cache operations per second, I/O excluded
    pub fn ops_per_sec(&self) -> f64 {
        let secs = self.cache_time.as_secs_f64();
        if secs > 0.0 {
            (self.requests + self.misses) as f64 / secs
        } else {
            0.0
        }
    }
}

/// CSV export row for a replay run
#[derive(Debug, Serialize)]
pub struct CsvResultRow {
    pub mode: String,
    pub capacity: usize,
    pub learning_rate: f64,
    pub discount_rate: f64,
    pub requests: u64,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub byte_hit_rate: f64,
    pub rejected: u64,
    pub unique_objects: usize,
    pub weight_lru: f64,
    pub weight_lfu: f64,
    pub clock: u64,
    pub lru_evictions: u64,
    pub lfu_evictions: u64,
    pub lru_regrets: u64,
    pub lfu_regrets: u64,
    pub final_storage_bytes: usize,
    pub duration_ms: u128,
    pub ops_per_sec: f64,
}
