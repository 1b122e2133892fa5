use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use lecar_cache::config::LecarCacheConfig;
use lecar_cache::LecarCache;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::num::NonZeroUsize;

// Fixed-width keys so every entry has the same byte size
fn key(i: usize) -> String {
    format!("key{i:08}")
}

fn make_lecar(capacity: usize) -> LecarCache<String, Vec<u8>> {
    let config = LecarCacheConfig {
        seed: Some(42),
        ..LecarCacheConfig::new(NonZeroUsize::new(capacity).unwrap())
    };
    LecarCache::init(config, None).unwrap()
}

pub fn criterion_benchmark(c: &mut Criterion) {
    const ENTRIES: usize = 1000;
    const VALUE_SIZE: usize = 32;
    // 11 key bytes + 32 value bytes per entry
    const CAPACITY: usize = ENTRIES * (11 + VALUE_SIZE);

    let mut group = c.benchmark_group("LeCaR Operations");

    {
        let mut cache = make_lecar(CAPACITY);
        let keys: Vec<String> = (0..ENTRIES).map(key).collect();
        for k in &keys {
            cache.put(k.clone(), vec![0; VALUE_SIZE]);
        }

        group.bench_function("get hit", |b| {
            b.iter(|| {
                for i in 0..100 {
                    black_box(cache.get(keys[i % ENTRIES].as_str()));
                }
            });
        });

        let missing: Vec<String> = (ENTRIES..ENTRIES + 100).map(key).collect();
        group.bench_function("get miss", |b| {
            b.iter(|| {
                for k in &missing {
                    black_box(cache.get(k.as_str()));
                }
            });
        });

        group.bench_function("put existing", |b| {
            b.iter(|| {
                for i in 0..100 {
                    black_box(cache.put(keys[i % ENTRIES].clone(), vec![1; VALUE_SIZE]));
                }
            });
        });
    }

    // every put evicts one entry and every get misses on a recorded key
    {
        let mut cache = make_lecar(CAPACITY);
        let mut next = 0usize;
        group.bench_function("scan with eviction", |b| {
            b.iter(|| {
                for _ in 0..100 {
                    let k = key(next % (ENTRIES * 2));
                    if cache.get(k.as_str()).is_none() {
                        black_box(cache.put(k, vec![0; VALUE_SIZE]));
                    }
                    next += 1;
                }
            });
        });
    }

    group.finish();

    let mut group = c.benchmark_group("LeCaR Skewed Workload");
    for skew in [1u32, 2, 4] {
        group.bench_with_input(BenchmarkId::from_parameter(skew), &skew, |b, &skew| {
            let mut cache = make_lecar(CAPACITY / 4);
            let mut rng = StdRng::seed_from_u64(u64::from(skew));
            b.iter(|| {
                for _ in 0..100 {
                    // powers of a uniform draw skew towards low ids
                    let u: f64 = rng.gen();
                    let id = (u.powi(skew as i32) * ENTRIES as f64) as usize;
                    let k = key(id);
                    if cache.get(k.as_str()).is_none() {
                        cache.put(k, vec![0; VALUE_SIZE]);
                    }
                }
            });
            black_box(cache.stats());
        });
    }
    group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
