use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use hasharray::{Hasharray, LongMap, ObjectMap};
use std::time::Duration;

fn lcg(mut s: u64) -> impl Iterator<Item = u64> {
    std::iter::from_fn(move || {
        s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
        Some(s)
    })
}

fn key(n: u64) -> String {
    format!("k{:016x}", n)
}

fn filled(seed: u64, n: usize) -> (ObjectMap<String, u64>, Vec<String>) {
    let mut m = Hasharray::new();
    let keys: Vec<String> = lcg(seed).take(n).map(key).collect();
    for (i, k) in keys.iter().enumerate() {
        m.put(k.clone(), i as u64).unwrap();
    }
    (m, keys)
}

fn bench_put_fresh_100k(c: &mut Criterion) {
    c.bench_function("hasharray::put_fresh_100k", |b| {
        b.iter_batched(
            ObjectMap::<String, u64>::new,
            |mut m| {
                for (i, x) in lcg(1).take(100_000).enumerate() {
                    m.put(key(x), i as u64).unwrap();
                }
                black_box(m)
            },
            BatchSize::SmallInput,
        )
    });

    c.bench_function("hasharray::put_fresh_long_100k", |b| {
        b.iter_batched(
            LongMap::<u64>::new,
            |mut m| {
                for (i, x) in lcg(2).take(100_000).enumerate() {
                    m.put((x >> 1) as i64, i as u64).unwrap();
                }
                black_box(m)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_lookup_hit_10k(c: &mut Criterion) {
    c.bench_function("hasharray::lookup_hit_10k_on_100k", |b| {
        let (m, keys) = filled(7, 100_000);
        // Precompute 10k random query keys using LCG
        let n = keys.len();
        let mut s = 0x9e3779b97f4a7c15u64;
        let queries: Vec<String> = (0..10_000)
            .map(|_| {
                s = s.wrapping_mul(2862933555777941757).wrapping_add(3037000493);
                keys[(s as usize) % n].clone()
            })
            .collect();
        b.iter(|| {
            for k in &queries {
                black_box(m.get(k.as_str()));
            }
        })
    });
}

fn bench_lookup_miss_10k(c: &mut Criterion) {
    c.bench_function("hasharray::lookup_miss_10k_on_100k", |b| {
        let (m, _) = filled(11, 100_000);
        let mut miss = lcg(0xdead_beef);
        b.iter(|| {
            for _ in 0..10_000 {
                let k = key(miss.next().unwrap_or_default());
                black_box(m.lookup(k.as_str()));
            }
        })
    });
}

// Removal closes the gap, so every remove touches every later row.
fn bench_remove_front_1k(c: &mut Criterion) {
    c.bench_function("hasharray::remove_front_1k_of_10k", |b| {
        b.iter_batched(
            || filled(5, 10_000).0,
            |mut m| {
                for _ in 0..1_000 {
                    let _ = m.remove_at(0);
                }
                black_box(m)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_iter_100k(c: &mut Criterion) {
    c.bench_function("hasharray::iter_all_100k", |b| {
        let (m, _) = filled(999, 100_000);
        b.iter(|| {
            let mut sum = 0u64;
            for (_k, v) in m.iter() {
                sum = sum.wrapping_add(*v);
            }
            black_box(sum)
        })
    });
}

fn bench_config() -> Criterion {
    Criterion::default()
        .sample_size(12)
        .measurement_time(Duration::from_secs(5))
        .warm_up_time(Duration::from_secs(1))
}

criterion_group! {
    name = benches_insert;
    config = bench_config();
    targets = bench_put_fresh_100k
}
criterion_group! {
    name = benches_ops;
    config = bench_config();
    targets = bench_lookup_hit_10k,
              bench_lookup_miss_10k,
              bench_remove_front_1k,
              bench_iter_100k
}
criterion_main!(benches_insert, benches_ops);
