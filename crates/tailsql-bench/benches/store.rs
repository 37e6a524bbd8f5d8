//! Columnar store benchmarks for TailSQL.
//!
//! Benchmarks for:
//! - Appending records until the buffer flushes
//! - Key lookups against flushed and pending rows
//! - Full scans

use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tailsql_bench::utils::{events_stream, generate_events};
use tailsql_common::config::InputFormat;
use tailsql_common::memory::MemoryTracker;
use tailsql_sql::storage::RelationCatalog;

/// Benchmark puts that end in exactly one flush per format.
fn bench_flush(c: &mut Criterion) {
    let mut group = c.benchmark_group("store/flush");

    for format in [InputFormat::Json, InputFormat::Csv, InputFormat::Psv] {
        for capacity in [256usize, 4096] {
            let records = generate_events(capacity, format);
            group.throughput(Throughput::Elements(capacity as u64));
            group.bench_with_input(
                BenchmarkId::new(format.to_string(), capacity),
                &records,
                |b, records| {
                    b.iter(|| {
                        let catalog = RelationCatalog::new(MemoryTracker::unbounded());
                        let mut writer = catalog
                            .register(&events_stream(format, capacity))
                            .expect("register");
                        for (offset, value) in records.iter().enumerate() {
                            writer
                                .put(offset as i64, Bytes::new(), value.clone())
                                .expect("put");
                        }
                        black_box(writer.store().stats())
                    });
                },
            );
        }
    }

    group.finish();
}

/// Benchmark key lookups.
fn bench_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("store/get");

    let catalog = RelationCatalog::new(MemoryTracker::unbounded());
    let mut writer = catalog
        .register(&events_stream(InputFormat::Json, 1024))
        .expect("register");
    for (offset, value) in generate_events(4000, InputFormat::Json).into_iter().enumerate() {
        writer
            .put(offset as i64, Bytes::from(format!("k{offset}")), value)
            .expect("put");
    }
    let store = writer.store().clone();

    group.bench_function("materialized", |b| {
        b.iter(|| black_box(store.get(b"k100").expect("get")));
    });
    group.bench_function("pending", |b| {
        b.iter(|| black_box(store.get(b"k3999").expect("get")));
    });

    group.finish();
}

/// Benchmark full scans.
fn bench_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("store/scan");

    for rows in [10_000usize, 100_000] {
        let catalog = RelationCatalog::new(MemoryTracker::unbounded());
        let mut writer = catalog
            .register(&events_stream(InputFormat::Json, 4096))
            .expect("register");
        for (offset, value) in generate_events(rows, InputFormat::Json).into_iter().enumerate() {
            writer.put(offset as i64, Bytes::new(), value).expect("put");
        }
        let store = writer.store().clone();

        group.throughput(Throughput::Elements(rows as u64));
        group.bench_with_input(BenchmarkId::from_parameter(rows), &store, |b, store| {
            b.iter(|| {
                let total: usize = store
                    .iterator(None)
                    .map(|batch| batch.expect("batch").num_rows())
                    .sum();
                black_box(total)
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_flush, bench_get, bench_scan);
criterion_main!(benches);
