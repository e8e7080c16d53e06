//! Benchmarks for message store operations
//!
//! - Identifier generation and parsing
//! - Pending inserts, listing and promotion on the in-memory store
//! - Atomic writes on the file store
#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::{hint::black_box, time::SystemTime};

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use courier_store::{
    FileMessageStore, MemoryMessageStore, MessageId, MessageStore, OutboundMessage,
};

fn create_test_message(body_size: usize) -> OutboundMessage {
    OutboundMessage::new(
        "recipient@example.com",
        "Benchmark",
        "X".repeat(body_size),
    )
}

fn bench_message_id_operations(c: &mut Criterion) {
    let mut group = c.benchmark_group("message_id_operations");

    group.bench_function("generate_ulid", |b| {
        b.iter(|| black_box(MessageId::generate()));
    });

    group.bench_function("from_filename_valid", |b| {
        b.iter(|| MessageId::from_filename(black_box("01ARZ3NDEKTSV4RRFFQ69G5FAV.bin")));
    });

    group.bench_function("from_filename_invalid_path", |b| {
        b.iter(|| MessageId::from_filename(black_box("../01ARZ3NDEKTSV4RRFFQ69G5FAV.bin")));
    });

    group.finish();
}

fn bench_memory_create(c: &mut Criterion) {
    let mut group = c.benchmark_group("memory_create");
    let runtime = tokio::runtime::Runtime::new().expect("Failed to create runtime");

    for (size, desc) in [(1024, "1KB"), (10 * 1024, "10KB"), (100 * 1024, "100KB")] {
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(desc), &size, |b, &size| {
            b.to_async(&runtime).iter(|| async move {
                let store = MemoryMessageStore::new();
                let record = store
                    .create(create_test_message(black_box(size)))
                    .await
                    .expect("Create succeeds");
                black_box(record)
            });
        });
    }

    group.finish();
}

fn bench_memory_list_pending(c: &mut Criterion) {
    let mut group = c.benchmark_group("memory_list_pending");
    let runtime = tokio::runtime::Runtime::new().expect("Failed to create runtime");

    for count in [10, 100, 1000] {
        let store = MemoryMessageStore::new();
        runtime.block_on(async {
            for _ in 0..count {
                store
                    .create(create_test_message(1024))
                    .await
                    .expect("Create succeeds");
            }
        });

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{count}_messages")),
            &count,
            |b, _| {
                b.to_async(&runtime).iter(|| {
                    let store = store.clone();
                    async move { black_box(store.list_pending(10).await.expect("List succeeds")) }
                });
            },
        );
    }

    group.finish();
}

fn bench_memory_lifecycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("memory_lifecycle");
    let runtime = tokio::runtime::Runtime::new().expect("Failed to create runtime");

    group.bench_function("create_get_promote", |b| {
        b.to_async(&runtime).iter(|| async {
            let store = MemoryMessageStore::new();
            let record = store
                .create(create_test_message(1024))
                .await
                .expect("Create succeeds");

            let mut record = store.get(record.id()).await.expect("Get succeeds");
            record.mark_sent(SystemTime::now());
            store.promote(&record).await.expect("Promote succeeds");
        });
    });

    group.finish();
}

fn bench_file_create(c: &mut Criterion) {
    let mut group = c.benchmark_group("file_create");
    let runtime = tokio::runtime::Runtime::new().expect("Failed to create runtime");

    let dir = tempfile::tempdir().expect("tempdir");
    let store = FileMessageStore::builder()
        .path(dir.path().to_path_buf())
        .build()
        .expect("valid path");
    store.recover().expect("recover");

    group.throughput(Throughput::Bytes(1024));
    group.bench_function("1KB", |b| {
        b.to_async(&runtime).iter(|| {
            let store = store.clone();
            async move {
                black_box(
                    store
                        .create(create_test_message(1024))
                        .await
                        .expect("Create succeeds"),
                )
            }
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_message_id_operations,
    bench_memory_create,
    bench_memory_list_pending,
    bench_memory_lifecycle,
    bench_file_create,
);
criterion_main!(benches);
