//! Criterion benchmarks for the per-candle hot path.
//!
//! 1. Single indicators over a long stream
//! 2. A subscription with a typical strategy's bindings (chained included)
//! 3. Non-final previews on an active candle
//! 4. Rolling statistics push

use chrono::{TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use stratlab_core::domain::{Candle, StreamKey, SubscriptionId, Timeframe};
use stratlab_core::engine::Subscription;
use stratlab_core::indicators::{
    Adx, Atr, Bollinger, Ema, Indicator, IndicatorInput, LinearRegSlope, Macd, RollingStatistics,
    Rsi, Sma, Stochastic,
};
use stratlab_core::synthetic::{generate, SyntheticSpec};

fn candles(n: usize) -> Vec<Candle> {
    let spec = SyntheticSpec {
        bars: n,
        ..SyntheticSpec::default()
    };
    let start = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
    generate(&spec, "BENCH", Timeframe::M5, start)
}

fn run_indicator<I: Indicator>(mut indicator: I, candles: &[Candle]) -> usize {
    candles
        .iter()
        .filter_map(|c| indicator.next(&IndicatorInput::Candle(*c)))
        .count()
}

fn bench_indicators(c: &mut Criterion) {
    let data = candles(10_000);
    let mut group = c.benchmark_group("indicator_10k");
    group.bench_function("sma_50", |b| {
        b.iter(|| run_indicator(Sma::new(50), black_box(&data)))
    });
    group.bench_function("ema_50", |b| {
        b.iter(|| run_indicator(Ema::new(50), black_box(&data)))
    });
    group.bench_function("rsi_14", |b| {
        b.iter(|| run_indicator(Rsi::new(14), black_box(&data)))
    });
    group.bench_function("atr_14", |b| {
        b.iter(|| run_indicator(Atr::new(14), black_box(&data)))
    });
    group.bench_function("adx_14", |b| {
        b.iter(|| run_indicator(Adx::new(14), black_box(&data)))
    });
    group.bench_function("bollinger_20", |b| {
        b.iter(|| run_indicator(Bollinger::new(20, 2.0), black_box(&data)))
    });
    group.bench_function("stochastic_14_3_3", |b| {
        b.iter(|| run_indicator(Stochastic::new(14, 3, 3), black_box(&data)))
    });
    group.finish();
}

fn build_subscription() -> Subscription {
    let mut sub = Subscription::new(SubscriptionId(0), StreamKey::new("BENCH", Timeframe::M5));
    sub.bind(Sma::new(10));
    sub.bind(Sma::new(50));
    sub.bind(Macd::new(12, 26, 9));
    let rsi = sub.bind(Rsi::new(14));
    let _ = sub.bind_on(rsi, LinearRegSlope::new(5));
    sub.bind(Atr::new(14));
    sub
}

fn bench_subscription(c: &mut Criterion) {
    let mut group = c.benchmark_group("subscription");
    for n in [1_000usize, 10_000] {
        let data = candles(n);
        group.bench_with_input(BenchmarkId::new("process", n), &data, |b, data| {
            b.iter(|| {
                let mut sub = build_subscription();
                for candle in data {
                    let _ = sub.process(black_box(candle));
                }
                sub.finished_count()
            })
        });
    }
    group.finish();
}

fn bench_previews(c: &mut Criterion) {
    let data = candles(2_000);
    let (history, rest) = data.split_at(1_999);
    c.bench_function("preview_x100", |b| {
        b.iter_batched(
            || {
                let mut sub = build_subscription();
                for candle in history {
                    let _ = sub.process(candle);
                }
                sub
            },
            |mut sub| {
                let active = rest[0].as_active();
                for _ in 0..100 {
                    let _ = sub.process(black_box(&active));
                }
                sub
            },
            criterion::BatchSize::SmallInput,
        )
    });
}

fn bench_rolling_statistics(c: &mut Criterion) {
    let values: Vec<f64> = (0..10_000).map(|i| (i as f64 * 0.1).sin()).collect();
    c.bench_function("rolling_statistics_50", |b| {
        b.iter(|| {
            let mut stats = RollingStatistics::new(50);
            for v in &values {
                stats.push(black_box(*v));
            }
            stats.std_dev()
        })
    });
}

criterion_group!(
    benches,
    bench_indicators,
    bench_subscription,
    bench_previews,
    bench_rolling_statistics
);
criterion_main!(benches);
