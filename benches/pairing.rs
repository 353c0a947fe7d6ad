//! Pairing engine benchmarks.
//!
//! Measures the engine alone against a transport that accepts everything:
//! - Connect/match throughput at different client counts
//! - Relay throughput between established pairs
//!
//! Run with: cargo bench --bench pairing
//! Results saved to: target/criterion/

use std::hint::black_box;
use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use pairchat::{CloseReason, ConnectionId, EngineOptions, PairingEngine, Result, Transport};

// ============================================================================
// NullTransport
// ============================================================================

/// Every connection is open; every send succeeds and is discarded.
struct NullTransport;

impl Transport for NullTransport {
    fn send(&self, _id: ConnectionId, text: &str) -> Result<()> {
        black_box(text);
        Ok(())
    }

    fn close(&self, _id: ConnectionId, _reason: &str) {}

    fn is_open(&self, _id: ConnectionId) -> bool {
        true
    }
}

fn engine() -> PairingEngine<NullTransport> {
    PairingEngine::new(Arc::new(NullTransport), EngineOptions::default())
}

// ============================================================================
// Benchmark Parameters
// ============================================================================

const CLIENT_COUNTS: &[usize] = &[100, 1_000, 10_000];

// ============================================================================
// Benchmark: Connect + Match
// ============================================================================

fn bench_connect(c: &mut Criterion) {
    let mut group = c.benchmark_group("connect");

    for &count in CLIENT_COUNTS {
        let ids: Vec<ConnectionId> = (0..count).map(|_| ConnectionId::new()).collect();
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("pair_all", count), &ids, |b, ids| {
            b.iter(|| {
                let engine = engine();
                for id in ids {
                    engine.on_connect(*id);
                }
                black_box(engine.stats())
            });
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark: Connect + Disconnect churn
// ============================================================================

fn bench_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("churn");

    for &count in CLIENT_COUNTS {
        let ids: Vec<ConnectionId> = (0..count).map(|_| ConnectionId::new()).collect();
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("pair_then_drop", count), &ids, |b, ids| {
            b.iter(|| {
                let engine = engine();
                for id in ids {
                    engine.on_connect(*id);
                }
                for id in ids {
                    engine.on_disconnect(*id, &CloseReason::Remote);
                }
                black_box(engine.stats())
            });
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark: Relay
// ============================================================================

fn bench_relay(c: &mut Criterion) {
    let engine = engine();
    let a = ConnectionId::new();
    let b = ConnectionId::new();
    engine.on_connect(a);
    engine.on_connect(b);

    let payload = "x".repeat(256);

    let mut group = c.benchmark_group("relay");
    group.throughput(Throughput::Elements(1));
    group.bench_function("message_256b", |bench| {
        bench.iter(|| engine.on_message(black_box(a), black_box(&payload)));
    });
    group.finish();
}

criterion_group!(benches, bench_connect, bench_churn, bench_relay);
criterion_main!(benches);
