use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use quark_core::{ChainVm, ManualClock, Vm};
use quark_storage::{Database, MemoryDatabase};
use quark_txpool::{Mempool, PoolConfig, TxPool};
use quark_types::{Address, BaseTx, Codec, Genesis, Transaction};
use std::sync::Arc;

fn vm() -> ChainVm {
    let codec = Arc::new(Codec::new().unwrap());
    let genesis = Genesis::default();
    let db: Arc<dyn Database> = Arc::new(MemoryDatabase::new());
    let mempool = Arc::new(TxPool::new(Arc::clone(&codec), genesis.clone(), PoolConfig::default()));
    ChainVm::initialize(genesis, codec, db, mempool, Arc::new(ManualClock::new(10))).unwrap()
}

/// A VM holding one claim per sender in its mempool.
fn vm_with_claims(claims: u8) -> ChainVm {
    let vm = vm();
    let parent = vm.last_accepted().0;
    let price = vm.mempool().min_price();
    for i in 0..claims {
        let base = BaseTx::new(Address::from_bytes([i; 20]), 0, price, parent);
        vm.mempool().add(Transaction::claim(base, format!("prefix{i}")));
    }
    vm
}

fn bench_block_lifecycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("execution_block");

    group.bench_function("build_block", |b| {
        b.iter_batched(
            || vm_with_claims(4),
            |vm| black_box(vm.build_block_at(10).unwrap()),
            BatchSize::SmallInput,
        )
    });

    group.bench_function("build_verify_accept", |b| {
        b.iter_batched(
            || vm_with_claims(4),
            |vm| {
                let block = vm.verify(vm.build_block_at(10).unwrap()).unwrap();
                vm.accepted(&block);
                black_box(vm.last_accepted());
            },
            BatchSize::SmallInput,
        )
    });

    group.finish();
}

fn bench_execution_context(c: &mut Criterion) {
    let mut group = c.benchmark_group("execution_context");
    let vm = vm();
    for height in 0..60u64 {
        let parent = vm.last_accepted().0;
        let base = BaseTx::new(Address::from_bytes([7; 20]), height, vm.mempool().min_price(), parent);
        vm.mempool().add(Transaction::claim(base, format!("p{height}")));
        let block = vm.verify(vm.build_block_at(10 + height).unwrap()).unwrap();
        vm.accepted(&block);
    }
    let (tip, tip_block) = vm.last_accepted();

    group.bench_function("full_window", |b| {
        b.iter(|| black_box(vm.execution_context(tip_block.timestamp + 1, &tip).unwrap()))
    });

    group.finish();
}

criterion_group!(benches, bench_block_lifecycle, bench_execution_context);
criterion_main!(benches);
