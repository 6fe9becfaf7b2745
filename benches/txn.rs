// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Benchmarks for transaction operations.

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use std::sync::Arc;

use iridiumdb::index::StringFieldIndex;
use iridiumdb::{DbSchema, IndexSchema, Indexer, MemDb, Object, TableSchema};

#[derive(Debug)]
struct BenchObject {
    id: String,
    foo: String,
}

fn bench_obj(id: String, foo: &str) -> Object {
    Arc::new(BenchObject {
        id,
        foo: foo.to_string(),
    })
}

fn bench_schema() -> DbSchema {
    DbSchema::new().with_table(
        TableSchema::new("main")
            .with_index(
                IndexSchema::new(
                    "id",
                    Indexer::single(StringFieldIndex::new(|o: &BenchObject| Some(o.id.clone()))),
                )
                .unique(),
            )
            .with_index(IndexSchema::new(
                "foo",
                Indexer::single(StringFieldIndex::new(|o: &BenchObject| Some(o.foo.clone()))),
            )),
    )
}

fn populated_db(count: usize) -> MemDb {
    let db = MemDb::new(bench_schema()).unwrap();
    let mut txn = db.txn(true).unwrap();
    for i in 0..count {
        txn.insert("main", bench_obj(format!("obj-{i:06}"), "shared"))
            .unwrap();
    }
    txn.commit().unwrap();
    drop(txn);
    db
}

fn bench_begin(c: &mut Criterion) {
    let db = populated_db(1000);

    c.bench_function("txn::begin_read", |b| {
        b.iter(|| {
            let txn = db.txn(false).unwrap();
            black_box(txn)
        })
    });
}

fn bench_insert(c: &mut Criterion) {
    let db = MemDb::new(bench_schema()).unwrap();
    let counter = std::sync::atomic::AtomicU64::new(0);

    c.bench_function("txn::insert", |b| {
        b.iter_batched(
            || {
                let i = counter.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                (db.txn(true).unwrap(), bench_obj(format!("key{i}"), "value"))
            },
            |(mut txn, obj)| {
                txn.insert("main", obj).unwrap();
                txn.abort();
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_first(c: &mut Criterion) {
    let db = populated_db(1000);
    let txn = db.txn(false).unwrap();
    let counter = std::sync::atomic::AtomicU64::new(0);

    c.bench_function("txn::first_by_id", |b| {
        b.iter(|| {
            let i = counter.fetch_add(1, std::sync::atomic::Ordering::Relaxed) % 1000;
            let result = txn
                .first("main", "id", &[format!("obj-{i:06}").into()])
                .unwrap();
            black_box(result)
        })
    });
}

fn bench_commit(c: &mut Criterion) {
    let db = MemDb::new(bench_schema()).unwrap();
    let counter = std::sync::atomic::AtomicU64::new(0);

    let mut group = c.benchmark_group("txn");
    group.throughput(Throughput::Elements(10));

    group.bench_function("commit_10_objects", |b| {
        b.iter_batched(
            || {
                let base = counter.fetch_add(10, std::sync::atomic::Ordering::Relaxed);
                let mut txn = db.txn(true).unwrap();
                for i in 0..10 {
                    txn.insert("main", bench_obj(format!("batch{}", base + i), "value"))
                        .unwrap();
                }
                txn
            },
            |mut txn| {
                txn.commit().unwrap();
                black_box(())
            },
            BatchSize::SmallInput,
        )
    });

    group.finish();
}

fn bench_full_transaction(c: &mut Criterion) {
    let db = populated_db(100);
    let counter = std::sync::atomic::AtomicU64::new(0);

    c.bench_function("txn::full_read_write_commit", |b| {
        b.iter(|| {
            let i = counter.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            let mut txn = db.txn(true).unwrap();

            let read_key = format!("obj-{:06}", i % 100);
            let _ = txn.first("main", "id", &[read_key.into()]).unwrap();

            txn.insert("main", bench_obj(format!("new{i}"), "value"))
                .unwrap();
            txn.commit().unwrap();
            black_box(())
        })
    });
}

fn bench_prefix_scan(c: &mut Criterion) {
    let db = populated_db(1000);
    let txn = db.txn(false).unwrap();

    c.bench_function("txn::prefix_scan_1000", |b| {
        b.iter(|| {
            let count = txn
                .get("main", "id_prefix", &["obj-".into()])
                .unwrap()
                .count();
            black_box(count)
        })
    });
}

criterion_group!(
    benches,
    bench_begin,
    bench_insert,
    bench_first,
    bench_commit,
    bench_full_transaction,
    bench_prefix_scan,
);
criterion_main!(benches);
