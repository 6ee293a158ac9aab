use chunk_table::{ByteTable, Table};
use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use std::time::Duration;

fn lcg(mut s: u64) -> impl Iterator<Item = u64> {
    std::iter::from_fn(move || {
        s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
        Some(s)
    })
}

fn bench_set_fresh_100k(c: &mut Criterion) {
    c.bench_function("table::set_fresh_100k", |b| {
        b.iter_batched(
            || Table::<u64, u64>::with_directory_size(16_381).unwrap(),
            |t| {
                for (i, x) in lcg(1).take(100_000).enumerate() {
                    t.set(&x, &(i as u64)).unwrap();
                }
                black_box(t)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_set_overwrite(c: &mut Criterion) {
    c.bench_function("table::set_overwrite", |b| {
        let t = Table::<u64, u64>::new().unwrap();
        let keys: Vec<u64> = lcg(3).take(10_000).collect();
        for &k in &keys {
            t.set(&k, &0).unwrap();
        }
        let mut it = keys.iter().cycle();
        let mut n = 0u64;
        b.iter(|| {
            n += 1;
            black_box(t.set(it.next().unwrap(), &n).unwrap());
        })
    });
}

fn bench_get_hit(c: &mut Criterion) {
    c.bench_function("table::get_hit", |b| {
        let t = Table::<u64, u64>::with_directory_size(4_093).unwrap();
        let keys: Vec<u64> = lcg(7).take(20_000).collect();
        for (i, &k) in keys.iter().enumerate() {
            t.set(&k, &(i as u64)).unwrap();
        }
        let mut it = keys.iter().cycle();
        b.iter(|| black_box(t.get(it.next().unwrap()).unwrap()))
    });
}

fn bench_get_miss(c: &mut Criterion) {
    c.bench_function("table::get_miss", |b| {
        let t = Table::<u64, u64>::with_directory_size(4_093).unwrap();
        for (i, x) in lcg(11).take(10_000).enumerate() {
            t.set(&x, &(i as u64)).unwrap();
        }
        let mut miss = lcg(0xdead_beef);
        b.iter(|| black_box(t.get(&miss.next().unwrap())))
    });
}

// Untyped path, for comparison with the typed front-end's encoding cost.
fn bench_bytes_find_hit(c: &mut Criterion) {
    c.bench_function("bytes::find_hit", |b| {
        let t = ByteTable::with_directory_size(8, 8, 4_093).unwrap();
        let keys: Vec<[u8; 8]> = lcg(13).take(20_000).map(u64::to_le_bytes).collect();
        for k in &keys {
            t.set(k, k).unwrap();
        }
        let mut it = keys.iter().cycle();
        b.iter(|| {
            let found = t.find(it.next().unwrap()).unwrap();
            black_box(found.is_some())
        })
    });
}

// Every key in one bucket: the cost of the no-rehash worst case.
fn bench_single_bucket_get(c: &mut Criterion) {
    c.bench_function("table::single_bucket_get_1k", |b| {
        let t = Table::<u32, u32>::with_directory_size(1).unwrap();
        for k in 0..1_000u32 {
            t.set(&k, &k).unwrap();
        }
        let mut k = 0u32;
        b.iter(|| {
            k = (k + 1) % 1_000;
            black_box(t.get(&k))
        })
    });
}

fn bench_config() -> Criterion {
    Criterion::default()
        .sample_size(50)
        .measurement_time(Duration::from_secs(8))
        .warm_up_time(Duration::from_secs(2))
}

criterion_group! {
    name = benches;
    config = bench_config();
    targets = bench_set_fresh_100k, bench_set_overwrite, bench_get_hit, bench_get_miss,
        bench_bytes_find_hit, bench_single_bucket_get
}
criterion_main!(benches);
