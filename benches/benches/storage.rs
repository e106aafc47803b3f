use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use quark_core::PrefixStore;
use quark_storage::{Database, FileDatabase, MemoryDatabase, Overlay, WriteBatch};
use quark_types::{Address, Codec, Genesis};
use std::sync::Arc;
use tempfile::TempDir;

const OWNER: Address = Address::from_bytes([1u8; 20]);

fn populated(store: &PrefixStore, keys: usize) -> MemoryDatabase {
    let mut db = MemoryDatabase::new();
    store.claim(&mut db, b"bench", OWNER, 0).unwrap();
    for i in 0..keys {
        store
            .set(&mut db, b"bench", format!("k{i:05}").as_bytes(), b"value", OWNER, 1)
            .unwrap();
    }
    db
}

fn bench_file_database(c: &mut Criterion) {
    let mut group = c.benchmark_group("storage_file_db");

    group.bench_function("write_batch_1k", |b| {
        b.iter_batched(
            || {
                let temp_dir = TempDir::new().unwrap();
                let db = FileDatabase::open(temp_dir.path()).unwrap();
                let mut batch = WriteBatch::new();
                for i in 0..1000 {
                    batch.put(format!("k{i}").into_bytes(), format!("v{i}").into_bytes());
                }
                (temp_dir, db, batch)
            },
            |(_temp_dir, db, batch)| db.write_batch(batch).unwrap(),
            BatchSize::SmallInput,
        )
    });

    group.finish();
}

fn bench_prefix_range(c: &mut Criterion) {
    let mut group = c.benchmark_group("storage_prefix_range");
    let store = PrefixStore::new(Arc::new(Codec::new().unwrap()), Genesis::default());
    let db = populated(&store, 2_000);

    group.bench_function("range_all", |b| {
        b.iter(|| {
            let count = store.range(&db, b"bench", b"", b"", 0, 2).unwrap().count();
            black_box(count)
        })
    });

    group.bench_function("range_over_overlay", |b| {
        b.iter_batched(
            || {
                let mut overlay = Overlay::new(&db);
                for i in (0..2_000).step_by(3) {
                    store
                        .set(&mut overlay, b"bench", format!("k{i:05}").as_bytes(), b"", OWNER, 2)
                        .unwrap();
                }
                overlay
            },
            |overlay| black_box(store.range(&overlay, b"bench", b"", b"", 0, 2).unwrap().count()),
            BatchSize::SmallInput,
        )
    });

    group.finish();
}

criterion_group!(benches, bench_file_database, bench_prefix_range);
criterion_main!(benches);
