//! Query benchmarks for TailSQL.
//!
//! Benchmarks for:
//! - SQL compilation
//! - Query execution through the datastore

use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tailsql_bench::utils::{events_stream, generate_events};
use tailsql_common::config::InputFormat;
use tailsql_common::memory::MemoryTracker;
use tailsql_server::database::{Datastore, DatastoreConfig};
use tailsql_sql::logical::compile;
use tailsql_sql::storage::{RelationCatalog, StoreWriter};

fn queries() -> Vec<(&'static str, &'static str)> {
    vec![
        ("string_eq", "SELECT amount FROM events WHERE name = 'delta'"),
        ("int_eq", "SELECT name, amount FROM events WHERE id = 500"),
        ("no_match", "SELECT amount FROM events WHERE name = 'zulu'"),
    ]
}

fn datastore(rows: usize) -> (Datastore, StoreWriter) {
    let datastore = Datastore::new(DatastoreConfig::default());
    let mut writer = datastore
        .register(&events_stream(InputFormat::Json, 4096))
        .expect("register");
    for (offset, value) in generate_events(rows, InputFormat::Json).into_iter().enumerate() {
        writer.put(offset as i64, Bytes::new(), value).expect("put");
    }
    (datastore, writer)
}

/// Benchmark SQL compilation.
fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("query/compile");
    let catalog = RelationCatalog::new(MemoryTracker::unbounded());
    let _writer = catalog
        .register(&events_stream(InputFormat::Json, 4096))
        .expect("register");

    for (name, sql) in queries() {
        group.bench_with_input(BenchmarkId::new("query", name), &sql, |b, sql| {
            b.iter(|| black_box(compile(black_box(sql), &catalog)));
        });
    }

    group.finish();
}

/// Benchmark execution over flushed batches plus a pending buffer.
fn bench_execute(c: &mut Criterion) {
    let mut group = c.benchmark_group("query/execute");

    for rows in [10_000usize, 100_000] {
        let (datastore, _writer) = datastore(rows + 100);
        group.throughput(Throughput::Elements(rows as u64));
        for (name, sql) in queries() {
            group.bench_with_input(BenchmarkId::new(name, rows), &sql, |b, sql| {
                b.iter(|| {
                    let batches = datastore
                        .query("events", sql)
                        .expect("query")
                        .collect_batches()
                        .expect("execute");
                    black_box(batches.len())
                });
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_compile, bench_execute);
criterion_main!(benches);
