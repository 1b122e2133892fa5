//! LeCaR Metrics Demonstration
//!
//! Runs two workloads through the same cache and prints how the policy
//! weights react: a looping scan that punishes LRU, followed by a shifting hot
//! set that punishes LFU.
//!
//! Run with: cargo run --example metrics_demo

use core::num::NonZeroUsize;
use lecar_cache::config::LecarCacheConfig;
use lecar_cache::metrics::CacheMetrics;
use lecar_cache::LecarCache;
use std::collections::BTreeMap;

const CAPACITY: usize = 64 * 10;

fn key(i: usize) -> String {
    format!("key{i:05}")
}

fn main() {
    println!("LeCaR Metrics - Demonstration");
    println!("=============================\n");

    let config = LecarCacheConfig {
        seed: Some(2024),
        ..LecarCacheConfig::new(NonZeroUsize::new(CAPACITY).unwrap())
    };
    let mut cache: LecarCache<String, Vec<u8>> = match LecarCache::init(config, None) {
        Ok(cache) => cache,
        Err(e) => {
            eprintln!("invalid configuration: {e}");
            return;
        }
    };

    // Each entry costs 8 key bytes + 2 value bytes, so the cache holds 64.
    // A loop over 80 keys defeats pure LRU; a few frequent keys make LFU shine.
    println!("Phase 1: loop over 80 keys plus 8 hot keys");
    for round in 0..50 {
        for i in 0..80 {
            replay(&mut cache, key(i));
            if i % 10 == 0 {
                replay(&mut cache, key(1000 + round % 8));
            }
        }
    }
    report(&cache);

    // The hot set now moves every few rounds, old favourites never return.
    println!("\nPhase 2: hot set that keeps moving");
    for round in 0..200 {
        let base = 2000 + (round / 4) * 40;
        for i in 0..40 {
            replay(&mut cache, key(base + i));
        }
    }
    report(&cache);

    println!("\nAll metrics (deterministic order):");
    print_metrics(&cache.metrics());
}

fn replay(cache: &mut LecarCache<String, Vec<u8>>, key: String) {
    if cache.get(&key).is_none() {
        cache.put(key, vec![0; 2]);
    }
}

fn report(cache: &LecarCache<String, Vec<u8>>) {
    let stats = cache.stats();
    let weights = cache.weights();
    let detail = cache.lecar_metrics();
    println!("  hits / misses   : {} / {}", stats.hits, stats.misses);
    println!("  hit rate        : {:.2}%", stats.hit_rate() * 100.0);
    println!("  weights         : LRU {:.3}  LFU {:.3}", weights.lru, weights.lfu);
    println!(
        "  evictions       : LRU {}  LFU {}  (clock {})",
        detail.lru_evictions,
        detail.lfu_evictions,
        cache.clock()
    );
    println!(
        "  regrets         : LRU {}  LFU {}",
        detail.lru_regrets, detail.lfu_regrets
    );
}

fn print_metrics(metrics: &BTreeMap<String, f64>) {
    for (name, value) in metrics {
        println!("  {name:<26} {value:>12.4}");
    }
}
