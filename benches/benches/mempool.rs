use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use quark_txpool::{Mempool, PoolConfig, TxPool};
use quark_types::{Address, BaseTx, Codec, Genesis, Hash, Transaction};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::sync::Arc;

fn random_txs(n: u64) -> Vec<Transaction> {
    let mut rng = StdRng::seed_from_u64(7);
    (0..n)
        .map(|nonce| {
            let sender = Address::from_bytes([(nonce % 255) as u8; 20]);
            let base = BaseTx::new(sender, nonce, rng.gen_range(1..1_000), Hash::ZERO);
            Transaction::set(base, "bench", format!("k{nonce}"), "v")
        })
        .collect()
}

fn pool() -> TxPool {
    TxPool::new(Arc::new(Codec::new().unwrap()), Genesis::default(), PoolConfig::default())
}

fn bench_add(c: &mut Criterion) {
    let mut group = c.benchmark_group("mempool_add");
    let txs = random_txs(1_000);

    group.bench_function("add_1k", |b| {
        b.iter_batched(
            || (pool(), txs.clone()),
            |(pool, txs)| {
                for tx in txs {
                    black_box(pool.add(tx));
                }
            },
            BatchSize::SmallInput,
        )
    });

    group.finish();
}

fn bench_pop_and_preview(c: &mut Criterion) {
    let mut group = c.benchmark_group("mempool_select");
    let txs = random_txs(1_000);
    let filled = || {
        let pool = pool();
        for tx in txs.iter().cloned() {
            pool.add(tx);
        }
        pool
    };

    group.bench_function("pop_max_1k", |b| {
        b.iter_batched(
            filled,
            |pool| while black_box(pool.pop_max()).is_some() {},
            BatchSize::SmallInput,
        )
    });

    let pool = filled();
    let budget = Genesis::default().max_block_cost;
    group.bench_function("new_txs_block_budget", |b| {
        b.iter(|| black_box(pool.new_txs(budget)))
    });

    group.finish();
}

criterion_group!(benches, bench_add, bench_pop_and_preview);
criterion_main!(benches);
