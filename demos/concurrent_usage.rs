//! Concurrent LeCaR Usage
//!
//! Several worker threads replay their own slice of a Zipf-like workload
//! through one shared cache.
//!
//! Run with: cargo run --example concurrent_usage --features concurrent

use lecar_cache::config::ConcurrentLecarCacheConfig;
use lecar_cache::ConcurrentLecarCache;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

const THREADS: usize = 8;
const OPS_PER_THREAD: usize = 50_000;
const KEY_SPACE: usize = 10_000;

fn main() {
    let config = ConcurrentLecarCacheConfig {
        seed: Some(7),
        ..ConcurrentLecarCacheConfig::new(NonZeroUsize::new(256 * 1024).unwrap())
    };
    let cache: Arc<ConcurrentLecarCache<String, Vec<u8>>> =
        match ConcurrentLecarCache::init(config, None) {
            Ok(cache) => Arc::new(cache),
            Err(e) => {
                eprintln!("invalid configuration: {e}");
                return;
            }
        };

    let start = Instant::now();
    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                let mut rng = StdRng::seed_from_u64(t as u64);
                for _ in 0..OPS_PER_THREAD {
                    // squaring a uniform draw skews requests towards low ids
                    let u: f64 = rng.gen();
                    let id = (u * u * KEY_SPACE as f64) as usize;
                    let key = format!("obj-{id}");
                    if cache.get(&key).is_none() {
                        cache.put(key, vec![0; 64 + id % 192]);
                    }
                }
            })
        })
        .collect();

    for h in handles {
        if h.join().is_err() {
            eprintln!("worker thread panicked");
            return;
        }
    }
    let elapsed = start.elapsed();

    let stats = cache.stats();
    let weights = cache.weights();
    println!("Concurrent LeCaR - {THREADS} threads x {OPS_PER_THREAD} requests");
    println!("  elapsed    : {elapsed:?}");
    println!("  entries    : {}", cache.len());
    println!(
        "  storage    : {} of {} bytes free",
        cache.remaining_storage(),
        cache.max_storage()
    );
    println!("  hit rate   : {:.2}%", stats.hit_rate() * 100.0);
    println!("  weights    : LRU {:.3}  LFU {:.3}", weights.lru, weights.lfu);
    println!("  clock      : {}", cache.clock());
}
