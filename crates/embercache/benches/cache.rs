use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use embercache::{BackingStoreKind, CacheMode, Handle, ReferenceCache};

const BACKINGS: [BackingStoreKind; 3] = [
    BackingStoreKind::Hash,
    BackingStoreKind::Identity,
    BackingStoreKind::Concurrent,
];

fn bench_cached_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("cached_get");
    group.sample_size(50);
    group.throughput(Throughput::Elements(1));

    for backing in BACKINGS {
        group.bench_with_input(BenchmarkId::from_parameter(backing), &backing, |b, &backing| {
            let cache: ReferenceCache<u64, Vec<u8>> = ReferenceCache::new(backing, CacheMode::Weak);
            let values: Vec<_> = (0..100).map(|_| Handle::new(vec![b'x'; 1024])).collect();
            for (i, value) in values.iter().enumerate() {
                cache.put(i as u64, value).unwrap();
            }

            let mut counter = 0u64;
            b.iter(|| {
                black_box(cache.get(&(counter % 100)));
                counter += 1;
            });
        });
    }

    group.finish();
}

fn bench_overwrite(c: &mut Criterion) {
    let mut group = c.benchmark_group("overwrite");
    group.sample_size(50);
    group.throughput(Throughput::Elements(1));

    group.bench_function("put_same_key_held", |b| {
        let cache: ReferenceCache<u64, u64> = ReferenceCache::default();
        let values: Vec<_> = (0..2).map(Handle::new).collect();

        let mut counter = 0usize;
        b.iter(|| {
            black_box(cache.put(7u64, &values[counter % 2]).ok());
            counter += 1;
        });
    });

    group.finish();
}

fn bench_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("churn");
    group.sample_size(50);
    group.throughput(Throughput::Elements(1));

    for mode in [CacheMode::Weak, CacheMode::Soft] {
        group.bench_with_input(BenchmarkId::from_parameter(mode), &mode, |b, &mode| {
            let cache: ReferenceCache<u64, Vec<u8>> = ReferenceCache::new(BackingStoreKind::Hash, mode);

            // Weak values die on insertion; soft ones once retention overflows
            let mut counter = 0u64;
            b.iter(|| {
                black_box(cache.put(counter, &Handle::new(vec![0u8; 64])).ok());
                counter += 1;
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_cached_get, bench_overwrite, bench_churn);
criterion_main!(benches);
