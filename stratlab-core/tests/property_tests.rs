//! Property tests for indicator and position invariants.
//!
//! 1. Bounded oscillators stay in range for any reachable state
//! 2. EMA of a constant converges to the constant
//! 3. Indicators become formed after exactly their warm-up count
//! 4. Net position equals the signed sum of fills
//! 5. Entry price is zero while flat and equals the fill price after a flip

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use stratlab_core::domain::{Candle, OrderSide, OwnTrade, Timeframe, FLAT_EPSILON};
use stratlab_core::engine::OrderTranslator;
use stratlab_core::indicators::{
    Adx, Atr, Bollinger, Cci, Donchian, Ema, Hma, Indicator, IndicatorCell,
    IndicatorInput, Macd, Momentum, Rsi, Sma, Stochastic, Supertrend, WilliamsR,
};

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_candles(max: usize) -> impl Strategy<Value = Vec<Candle>> {
    prop::collection::vec((1.0..200.0_f64, 0.0..5.0_f64, 0.0..5.0_f64, -3.0..3.0_f64), 1..max)
        .prop_map(|rows| {
            let base = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
            rows.into_iter()
                .enumerate()
                .map(|(i, (open, up, down, move_))| {
                    let close = (open + move_).max(0.5);
                    Candle::finished(
                        base + Duration::hours(i as i64),
                        Timeframe::H1,
                        open,
                        open.max(close) + up,
                        (open.min(close) - down).max(0.1),
                        close,
                        1_000.0,
                    )
                })
                .collect()
        })
}

fn arb_fill() -> impl Strategy<Value = (bool, f64, f64)> {
    (
        any::<bool>(),
        (10.0..500.0_f64).prop_map(|p| (p * 100.0).round() / 100.0),
        (1.0..20.0_f64).prop_map(|v| v.round()),
    )
}

fn feed<I: Indicator>(indicator: &mut I, candles: &[Candle]) -> Vec<Option<I::Output>> {
    candles
        .iter()
        .map(|c| indicator.next(&IndicatorInput::Candle(*c)))
        .collect()
}

// ── 1. Oscillator bounds ─────────────────────────────────────────────

proptest! {
    #[test]
    fn rsi_stays_in_0_100(candles in arb_candles(200), period in 2usize..30) {
        for v in feed(&mut Rsi::new(period), &candles).into_iter().flatten() {
            prop_assert!((-1e-9..=100.0 + 1e-9).contains(&v), "rsi {v}");
        }
    }

    #[test]
    fn stochastic_stays_in_0_100(candles in arb_candles(200), period in 2usize..20) {
        for v in feed(&mut Stochastic::new(period, 3, 3), &candles).into_iter().flatten() {
            prop_assert!((-1e-9..=100.0 + 1e-9).contains(&v.k), "%K {}", v.k);
            prop_assert!((-1e-9..=100.0 + 1e-9).contains(&v.d), "%D {}", v.d);
        }
    }

    #[test]
    fn williams_r_stays_in_minus_100_0(candles in arb_candles(200), period in 2usize..30) {
        for v in feed(&mut WilliamsR::new(period), &candles).into_iter().flatten() {
            prop_assert!((-100.0 - 1e-9..=1e-9).contains(&v), "%R {v}");
        }
    }
}

// ── 2. EMA steady state ──────────────────────────────────────────────

proptest! {
    #[test]
    fn ema_of_constant_converges(c in -1_000.0..1_000.0_f64, period in 1usize..50) {
        let mut ema = Ema::new(period);
        let mut last = None;
        for _ in 0..(period * 20 + 10) {
            last = ema.next(&IndicatorInput::Scalar(c));
        }
        let v = last.unwrap();
        prop_assert!((v - c).abs() <= 1e-9 * c.abs().max(1.0), "ema {v} vs {c}");
    }
}

// ── 3. Formed at warm-up ─────────────────────────────────────────────

fn first_formed<I: Indicator>(indicator: I, candles: &[Candle]) -> Option<usize> {
    let mut cell = IndicatorCell::new(indicator);
    for (i, c) in candles.iter().enumerate() {
        cell.update(&IndicatorInput::Candle(*c), c.open_time, true).unwrap();
        if cell.is_formed() {
            return Some(i + 1);
        }
    }
    None
}

fn check_warmup<I: Indicator>(indicator: I, candles: &[Candle]) -> Result<(), TestCaseError> {
    let warmup = indicator.warmup_period();
    let name = indicator.name().to_string();
    let formed_at = first_formed(indicator, candles);
    if candles.len() >= warmup {
        prop_assert_eq!(formed_at, Some(warmup), "{}", name);
    } else {
        prop_assert_eq!(formed_at, None, "{}", name);
    }
    Ok(())
}

proptest! {
    #[test]
    fn formed_after_exactly_warmup(candles in arb_candles(120), period in 1usize..12) {
        check_warmup(Sma::new(period), &candles)?;
        check_warmup(Ema::new(period), &candles)?;
        check_warmup(Rsi::new(period), &candles)?;
        check_warmup(Atr::new(period), &candles)?;
        check_warmup(Adx::new(period), &candles)?;
        check_warmup(Momentum::new(period), &candles)?;
        check_warmup(Donchian::new(period), &candles)?;
        check_warmup(Bollinger::new(period, 2.0), &candles)?;
        check_warmup(Cci::new(period), &candles)?;
        check_warmup(Hma::new(period + 1), &candles)?;
        check_warmup(Stochastic::new(period, 3, 3), &candles)?;
        check_warmup(Supertrend::new(period, 3.0), &candles)?;
        check_warmup(Macd::new(period, period + 5, 4), &candles)?;
    }

    #[test]
    fn output_stays_some_once_formed(candles in arb_candles(120), period in 1usize..12) {
        let outputs = feed(&mut Adx::new(period), &candles);
        if let Some(first) = outputs.iter().position(Option::is_some) {
            prop_assert!(outputs[first..].iter().all(Option::is_some));
        }
    }
}

// ── 4/5. Position accounting ─────────────────────────────────────────

proptest! {
    #[test]
    fn position_is_signed_sum_of_fills(fills in prop::collection::vec(arb_fill(), 1..40)) {
        let mut translator = OrderTranslator::new("SIM", "prop");
        let base = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let mut expected = 0.0;

        for (i, (buy, price, volume)) in fills.into_iter().enumerate() {
            let side = if buy { OrderSide::Buy } else { OrderSide::Sell };
            let before = translator.position();
            let change = translator
                .on_own_trade(OwnTrade {
                    order_id: None,
                    instrument: "SIM".into(),
                    side,
                    price,
                    volume,
                    time: base + Duration::minutes(i as i64),
                })
                .unwrap();
            expected += side.sign() * volume;

            let pos = translator.position();
            prop_assert!((pos.quantity - expected).abs() < 1e-9);
            prop_assert_eq!(change.before, before);

            if pos.is_flat() {
                prop_assert_eq!(pos.entry_price, 0.0);
            } else if before.is_flat() || before.quantity.signum() != pos.quantity.signum() {
                // Opened or flipped on this fill.
                prop_assert_eq!(pos.entry_price, price);
            }
            prop_assert!(pos.quantity.abs() > FLAT_EPSILON || pos.entry_price == 0.0);
        }
    }
}

// ── Boundary: flat candles ───────────────────────────────────────────

#[test]
fn stochastic_on_flat_candles_is_50() {
    let base = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    let candles: Vec<Candle> = (0..20)
        .map(|i| {
            Candle::finished(
                base + Duration::hours(i),
                Timeframe::H1,
                42.0,
                42.0,
                42.0,
                42.0,
                0.0,
            )
        })
        .collect();
    let out = feed(&mut Stochastic::new(5, 3, 3), &candles);
    let last = out.last().copied().flatten().unwrap();
    assert_eq!(last.k, 50.0);
    assert_eq!(last.d, 50.0);
    assert!(out.iter().flatten().all(|v| v.k.is_finite() && v.d.is_finite()));
}
