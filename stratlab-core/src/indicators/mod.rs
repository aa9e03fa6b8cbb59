//! Incremental indicators.
//!
//! Every indicator implements [`Indicator`]: it owns its buffers, advances by
//! one *final* input at a time via `next`, and reports `None` until formed.
//! [`IndicatorCell`] layers the engine contract on top: time ordering,
//! sticky `formed`, and non-final previews.
//!
//! Non-final updates follow the idempotent-preview discipline: the cell clones
//! the committed state, applies the provisional input to the clone, and
//! returns the clone's output. Committed state only moves on final updates,
//! so any number of non-final updates for the same candle leave no trace.
//!
//! Multi-valued indicators return fixed records (see [`output`]); the
//! pipeline erases them into [`IndicatorValue`].

pub mod adx;
pub mod atr;
pub mod bollinger;
pub mod cci;
pub mod cell;
pub mod choppiness;
pub mod donchian;
pub mod ema;
pub mod highest_lowest;
pub mod hma;
pub mod ichimoku;
pub mod keltner;
pub mod linear_regression;
pub mod macd;
pub mod momentum;
pub mod obv;
pub mod output;
pub mod parabolic_sar;
pub mod rsi;
pub mod sma;
pub mod smma;
pub mod statistics;
pub mod std_dev;
pub mod stochastic;
pub mod supertrend;
pub mod vwap;
pub mod williams_r;
pub mod window;
pub mod wma;

pub use adx::Adx;
pub use atr::{true_range, Atr, WilderSmoother};
pub use bollinger::Bollinger;
pub use cci::Cci;
pub use cell::{ErasedIndicator, IndicatorCell, IndicatorError};
pub use choppiness::Choppiness;
pub use donchian::Donchian;
pub use ema::Ema;
pub use highest_lowest::{Highest, Lowest};
pub use hma::Hma;
pub use ichimoku::Ichimoku;
pub use keltner::Keltner;
pub use linear_regression::LinearRegSlope;
pub use macd::Macd;
pub use momentum::Momentum;
pub use obv::Obv;
pub use output::{
    AdxValue, BandsValue, IchimokuValue, IndicatorOutput, IndicatorValue, MacdValue,
    StochasticValue, SupertrendValue,
};
pub use parabolic_sar::ParabolicSar;
pub use rsi::Rsi;
pub use sma::Sma;
pub use smma::Smma;
pub use statistics::RollingStatistics;
pub use std_dev::StdDev;
pub use stochastic::Stochastic;
pub use supertrend::Supertrend;
pub use vwap::Vwap;
pub use williams_r::WilliamsR;
pub use window::RollingWindow;
pub use wma::Wma;

use crate::domain::Candle;

/// What an indicator consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputShape {
    /// Full OHLCV.
    Candle,
    /// A single number, typically another indicator's output.
    Scalar,
    /// Close price only.
    CandlePrice,
}

/// One input sample.
///
/// Candle-shaped indicators fed a scalar treat it as a flat candle
/// (open = high = low = close, zero volume).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IndicatorInput {
    Candle(Candle),
    Scalar(f64),
}

impl IndicatorInput {
    /// Close for candles, the value itself for scalars.
    pub fn price(&self) -> f64 {
        match self {
            IndicatorInput::Candle(c) => c.close,
            IndicatorInput::Scalar(v) => *v,
        }
    }

    pub fn open(&self) -> f64 {
        match self {
            IndicatorInput::Candle(c) => c.open,
            IndicatorInput::Scalar(v) => *v,
        }
    }

    pub fn high(&self) -> f64 {
        match self {
            IndicatorInput::Candle(c) => c.high,
            IndicatorInput::Scalar(v) => *v,
        }
    }

    pub fn low(&self) -> f64 {
        match self {
            IndicatorInput::Candle(c) => c.low,
            IndicatorInput::Scalar(v) => *v,
        }
    }

    pub fn volume(&self) -> f64 {
        match self {
            IndicatorInput::Candle(c) => c.volume,
            IndicatorInput::Scalar(_) => 0.0,
        }
    }

    pub fn typical_price(&self) -> f64 {
        (self.high() + self.low() + self.price()) / 3.0
    }

    pub fn median_price(&self) -> f64 {
        (self.high() + self.low()) / 2.0
    }

    pub fn candle(&self) -> Option<&Candle> {
        match self {
            IndicatorInput::Candle(c) => Some(c),
            IndicatorInput::Scalar(_) => None,
        }
    }
}

impl From<f64> for IndicatorInput {
    fn from(v: f64) -> Self {
        IndicatorInput::Scalar(v)
    }
}

impl From<Candle> for IndicatorInput {
    fn from(c: Candle) -> Self {
        IndicatorInput::Candle(c)
    }
}

/// Trait for incremental indicators.
///
/// # Contract
/// - `next` advances committed state by exactly one final input and returns
///   the current output, or `None` while not yet formed.
/// - The first `Some` is returned on the `warmup_period()`-th input, and every
///   later call returns `Some` until `reset`.
/// - `length()` and any auxiliary parameters are fixed at construction.
/// - `Clone` must deep-copy all buffers (used for non-final previews).
pub trait Indicator: Clone + Send + Sync + 'static {
    type Output: IndicatorOutput;

    /// Human-readable name (e.g., "sma_20", "atr_14").
    fn name(&self) -> &str;

    fn input_shape(&self) -> InputShape {
        InputShape::CandlePrice
    }

    /// Primary period.
    fn length(&self) -> usize;

    /// Number of final inputs after which the indicator is formed.
    fn warmup_period(&self) -> usize;

    /// Advance by one final input.
    fn next(&mut self, input: &IndicatorInput) -> Option<Self::Output>;

    /// Clear all buffers; the indicator is no longer formed.
    fn reset(&mut self);
}

/// Create synthetic finished candles from close prices for testing.
///
/// open = prev_close (or close for the first candle),
/// high = max(open,close) + 1.0, low = min(open,close) - 1.0, volume = 1000.
#[cfg(test)]
pub fn make_candles(closes: &[f64]) -> Vec<Candle> {
    let data: Vec<(f64, f64, f64, f64)> = closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            (open, open.max(close) + 1.0, open.min(close) - 1.0, close)
        })
        .collect();
    make_ohlc_candles(&data)
}

/// Create finished hourly candles from (open, high, low, close) tuples.
#[cfg(test)]
pub fn make_ohlc_candles(data: &[(f64, f64, f64, f64)]) -> Vec<Candle> {
    use crate::domain::Timeframe;
    use chrono::TimeZone;
    let base = chrono::Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    data.iter()
        .enumerate()
        .map(|(i, &(open, high, low, close))| {
            Candle::finished(
                base + chrono::Duration::hours(i as i64),
                Timeframe::H1,
                open,
                high,
                low,
                close,
                1000.0,
            )
        })
        .collect()
}

/// Feed every candle into the indicator and collect the outputs.
#[cfg(test)]
pub fn run<I: Indicator>(indicator: &mut I, candles: &[Candle]) -> Vec<Option<I::Output>> {
    candles
        .iter()
        .map(|c| indicator.next(&IndicatorInput::Candle(*c)))
        .collect()
}

/// Feed scalar values into the indicator and collect the outputs.
#[cfg(test)]
pub fn run_values<I: Indicator>(indicator: &mut I, values: &[f64]) -> Vec<Option<I::Output>> {
    values
        .iter()
        .map(|v| indicator.next(&IndicatorInput::Scalar(*v)))
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
