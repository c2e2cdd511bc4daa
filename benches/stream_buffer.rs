//! Criterion benchmarks for stream buffer hot paths.
//!
//! The producer callback appends at the tracker's sample rate (up to 1200 Hz
//! for gaze), while consumers poll with consume/peek operations.
//!
//! Key metrics:
//! - Append throughput on the producer path
//! - Range lookup cost for peek/consume by timestamp
//! - Append contention while a consumer drains
//!
//! Run with: cargo bench --bench stream_buffer

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use eyetracker_buffer::sample::GazeSample;
use eyetracker_buffer::{StreamBuffer, TimeRange};

fn filled(len: i64) -> StreamBuffer<GazeSample> {
    let buffer = StreamBuffer::with_capacity(len as usize);
    for ts in 0..len {
        buffer.append(GazeSample::at(ts));
    }
    buffer
}

/// Appending into a pre-reserved buffer.
fn append_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("stream_buffer_append");
    group.throughput(Throughput::Elements(1));

    let buffer = StreamBuffer::with_capacity(1 << 20);
    let mut ts = 0i64;
    group.bench_function("gaze", |b| {
        b.iter(|| {
            buffer.append(black_box(GazeSample::at(ts)));
            ts += 1;
            if buffer.len() >= 1 << 20 {
                buffer.clear();
            }
        });
    });

    group.finish();
}

/// Peeking a narrow time window out of buffers of increasing size.
fn peek_time_range(c: &mut Criterion) {
    let mut group = c.benchmark_group("stream_buffer_peek_range");

    for len in [1_000i64, 100_000, 1_000_000] {
        let buffer = filled(len);
        let mid = len / 2;
        group.bench_with_input(BenchmarkId::from_parameter(len), &len, |b, _| {
            b.iter(|| black_box(buffer.peek_time_range(TimeRange::between(mid, mid + 100))));
        });
    }

    group.finish();
}

/// Draining a full buffer with consume_n(None).
fn consume_all(c: &mut Criterion) {
    let mut group = c.benchmark_group("stream_buffer_consume");

    for len in [1_000i64, 100_000] {
        group.throughput(Throughput::Elements(len as u64));
        group.bench_with_input(BenchmarkId::new("all", len), &len, |b, &len| {
            b.iter_batched(
                || filled(len),
                |buffer| black_box(buffer.consume_n(None)),
                criterion::BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

/// Append latency while another thread keeps draining.
fn contended_append(c: &mut Criterion) {
    let buffer = Arc::new(StreamBuffer::<GazeSample>::with_capacity(1 << 16));
    let running = Arc::new(AtomicBool::new(true));
    let consumer = {
        let buffer = Arc::clone(&buffer);
        let running = Arc::clone(&running);
        thread::spawn(move || {
            while running.load(Ordering::Relaxed) {
                black_box(buffer.consume_n(Some(64)));
            }
        })
    };

    let mut ts = 0i64;
    c.bench_function("stream_buffer_contended_append", |b| {
        b.iter(|| {
            buffer.append(black_box(GazeSample::at(ts)));
            ts += 1;
        });
    });

    running.store(false, Ordering::Relaxed);
    let _ = consumer.join();
}

criterion_group!(
    benches,
    append_throughput,
    peek_time_range,
    consume_all,
    contended_append
);
criterion_main!(benches);
