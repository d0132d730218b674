//! Criterion benchmarks for the engine hot paths.
//!
//! Benchmarks:
//! 1. Event loop (full backtest over a synthetic feed)
//! 2. Execution simulation (market and limit decisions)
//! 3. Ledger updates (fills and marks)

use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::collections::BTreeMap;

use tradesim_core::data::InMemoryFeed;
use tradesim_core::domain::{Decision, Fill, MarketEvent, Position, Universe};
use tradesim_core::engine::{
    run_backtest, EngineConfig, ExecutionConfig, ExecutionSimulator, FeeModel, PositionLedger,
};
use tradesim_core::signals::examples::{MovingAverageCross, PeriodicRebalance};

// ── Helpers ──────────────────────────────────────────────────────────

fn prices(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| 100.0 + (i as f64 * 0.1).sin() * 10.0)
        .collect()
}

fn single_feed(n: usize) -> InMemoryFeed {
    let start = Utc.with_ymd_and_hms(2020, 1, 2, 0, 0, 0).unwrap();
    InMemoryFeed::daily("SPY", start, &prices(n), 1_000_000.0)
}

fn multi_feed(n: usize, instruments: usize) -> InMemoryFeed {
    let start = Utc.with_ymd_and_hms(2020, 1, 2, 0, 0, 0).unwrap();
    let mut events = Vec::with_capacity(n * instruments);
    for i in 0..n {
        for s in 0..instruments {
            let price = 50.0 + s as f64 * 10.0 + (i as f64 * 0.1 + s as f64).sin() * 5.0;
            events.push(MarketEvent::new(
                start + Duration::days(i as i64),
                format!("SYM{s}"),
                price,
                500_000.0,
            ));
        }
    }
    InMemoryFeed::new(events)
}

// ── 1. Event Loop ────────────────────────────────────────────────────

fn bench_event_loop(c: &mut Criterion) {
    let mut group = c.benchmark_group("event_loop");

    for &count in &[252, 1260, 2520] {
        let feed = single_feed(count);
        let config = EngineConfig::new(100_000.0);
        let strategy = MovingAverageCross::new(10, 50, 100.0).unwrap();

        group.bench_with_input(BenchmarkId::new("ma_cross", count), &count, |b, _| {
            b.iter(|| run_backtest(black_box(&config), black_box(&feed), &strategy));
        });
    }

    // Multi-instrument rebalance (the realistic case)
    let feed = multi_feed(1260, 10);
    let weights: BTreeMap<String, f64> = (0..10).map(|s| (format!("SYM{s}"), 0.1)).collect();
    let strategy = PeriodicRebalance::new(weights, 90_000.0, Duration::days(30)).unwrap();
    let config = EngineConfig::new(100_000.0)
        .with_execution(ExecutionConfig::with_fees(FeeModel::Proportional { rate: 0.001 }));
    group.bench_function("rebalance_10_instruments_1260_days", |b| {
        b.iter(|| run_backtest(black_box(&config), black_box(&feed), &strategy));
    });

    group.finish();
}

// ── 2. Execution Simulation ──────────────────────────────────────────

fn bench_execution(c: &mut Criterion) {
    let mut group = c.benchmark_group("execution");
    let ts = Utc.with_ymd_and_hms(2020, 1, 2, 0, 0, 0).unwrap();
    let market = MarketEvent::new(ts + Duration::days(1), "SPY", 100.0, 1_000_000.0);
    let flat = Position::flat("SPY");

    group.bench_function("market_100", |b| {
        let mut sim = ExecutionSimulator::new(
            ExecutionConfig::with_fees(FeeModel::SlippageBps { bps: 5.0 }),
            Universe::open(),
        );
        let decision = Decision::market(ts, "SPY", 10.0);
        b.iter(|| {
            for seq in 0..100 {
                let _ = sim.simulate(black_box(&decision), &market, seq, &flat, 1e9);
            }
        });
    });

    group.bench_function("limit_not_reached_100", |b| {
        let mut sim = ExecutionSimulator::new(ExecutionConfig::frictionless(), Universe::open());
        let decision = Decision::limit(ts, "SPY", 10.0, 90.0);
        b.iter(|| {
            for seq in 0..100 {
                let _ = sim.simulate(black_box(&decision), &market, seq, &flat, 1e9);
            }
        });
    });

    group.finish();
}

// ── 3. Ledger Updates ────────────────────────────────────────────────

fn bench_ledger(c: &mut Criterion) {
    let mut group = c.benchmark_group("ledger");
    let ts = Utc.with_ymd_and_hms(2020, 1, 2, 0, 0, 0).unwrap();
    let fills: Vec<Fill> = (0..1000)
        .map(|i| Fill {
            sequence: i,
            timestamp: ts,
            decision_timestamp: ts,
            instrument_id: format!("SYM{}", i % 10),
            quantity: if i % 3 == 0 { -5.0 } else { 10.0 },
            price: 100.0 + (i as f64 * 0.1).sin(),
            fees: 1.0,
        })
        .collect();

    group.bench_function("apply_1000_fills", |b| {
        b.iter(|| {
            let mut ledger = PositionLedger::new(1e9, true);
            for fill in &fills {
                let _ = ledger.apply(black_box(fill));
            }
            ledger.equity()
        });
    });

    group.bench_function("mark_1000", |b| {
        let mut ledger = PositionLedger::new(1e9, true);
        for fill in &fills[..20] {
            let _ = ledger.apply(fill);
        }
        b.iter(|| {
            for i in 0..1000 {
                let _ = ledger.mark(black_box("SYM3"), 100.0 + i as f64 * 0.01);
            }
        });
    });

    group.finish();
}

criterion_group!(benches, bench_event_loop, bench_execution, bench_ledger);
criterion_main!(benches);
