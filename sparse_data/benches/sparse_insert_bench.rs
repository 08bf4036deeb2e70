use std::sync::Arc;
use std::time::Duration;

use criterion::{BenchmarkId, Criterion, criterion_group};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sparse_data::{OverlapPolicy, ResourceKey, SparseData, SparseDataCache};
use tokio::task::JoinSet;

const SEED: u64 = 42;
const RESOURCE_LEN: u64 = 1 << 30; // 1 GB
const MAX_RANGE_LEN: u64 = 1 << 16; // 64 KB
const NUM_PRELOAD: usize = 1000;
const SEQUENTIAL_LIMIT: u64 = 1 << 28; // 256 MB

fn random_block(rng: &mut StdRng) -> (u64, Vec<u8>) {
    let len = rng.random_range(1..=MAX_RANGE_LEN);
    let start = rng.random_range(0..RESOURCE_LEN - len);
    (start, vec![rng.random::<u8>(); len as usize])
}

fn preloaded(rng: &mut StdRng, policy: OverlapPolicy) -> SparseData {
    let mut sd = SparseData::with_policy(policy);
    for _ in 0..NUM_PRELOAD {
        let (start, data) = random_block(rng);
        sd.insert_bytes(start, data).unwrap();
    }
    sd
}

fn benchmark_insert(c: &mut Criterion, policy: OverlapPolicy, variant: &str) {
    let mut rng = StdRng::seed_from_u64(SEED);
    let mut sd = preloaded(&mut rng, policy);

    let name = format!("sparse_insert_{variant}");
    c.bench_function(name.as_str(), |b| {
        b.iter(|| {
            let (start, data) = random_block(&mut rng);
            sd.insert_bytes(start, data).unwrap();
        })
    });
}

fn benchmark_sequential_insert(c: &mut Criterion) {
    let mut sd = SparseData::new();
    let mut offset = 0u64;

    c.bench_function("sparse_insert_sequential", |b| {
        b.iter(|| {
            if offset >= SEQUENTIAL_LIMIT {
                sd.clear();
                offset = 0;
            }
            sd.insert_bytes(offset, vec![0u8; 4096]).unwrap();
            offset += 4096;
        })
    });
}

fn benchmark_lookup(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(SEED);
    let sd = preloaded(&mut rng, OverlapPolicy::PreferNewer);

    c.bench_function("sparse_lookup", |b| {
        b.iter(|| {
            let offset = rng.random_range(0..RESOURCE_LEN);
            sd.lookup(offset);
        })
    });
}

fn benchmark_cache_insert_mt(c: &mut Criterion) {
    let cache = Arc::new(SparseDataCache::new(u64::MAX, OverlapPolicy::PreferNewer));
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_with_input(BenchmarkId::new("sparse_cache_insert_mt", ""), &0, |b, _| {
        b.to_async(&rt).iter(|| async {
            let mut handles = JoinSet::new();
            for i in 0..4 {
                let cache = cache.clone();
                handles.spawn(async move {
                    let mut rng = StdRng::from_os_rng();
                    let key = ResourceKey::new(format!("resource-{i}"));
                    let (start, data) = random_block(&mut rng);
                    cache.insert_bytes(&key, start, data).await.unwrap();
                });
            }
            handles.join_all().await;
        });
    });
}

fn benchmark_insert_prefer_newer(c: &mut Criterion) {
    benchmark_insert(c, OverlapPolicy::PreferNewer, "prefer_newer");
}

fn benchmark_insert_prefer_existing(c: &mut Criterion) {
    benchmark_insert(c, OverlapPolicy::PreferExisting, "prefer_existing");
}

criterion_group!(
    name = benches_insert;
    config = Criterion::default().measurement_time(Duration::from_secs(10));
    targets =
        benchmark_insert_prefer_newer,
        benchmark_insert_prefer_existing,
        benchmark_sequential_insert,
);

criterion_group!(
    name = benches_lookup;
    config = Criterion::default();
    targets = benchmark_lookup,
);

criterion_group!(
    name = benches_cache_multithreaded;
    config = Criterion::default().measurement_time(Duration::from_secs(10));
    targets = benchmark_cache_insert_mt,
);

fn main() {
    benches_insert();
    benches_lookup();
    benches_cache_multithreaded();
    Criterion::default().configure_from_args().final_summary();
}
