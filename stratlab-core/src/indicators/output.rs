//! Indicator output records.
//!
//! Multi-valued indicators expose a fixed record with named fields instead of
//! runtime attribute lookup. `IndicatorValue` is the type-erased form the
//! pipeline stores; `IndicatorOutput` converts back to the concrete record.

use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Upper / middle / lower channel (Bollinger, Keltner, Donchian).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandsValue {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

impl BandsValue {
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StochasticValue {
    pub k: f64,
    pub d: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacdValue {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

/// ADX line (Wilder-smoothed DX) with the directional indicators.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdxValue {
    pub adx: f64,
    pub plus_di: f64,
    pub minus_di: f64,
}

/// Ichimoku lines as of the current candle.
///
/// `senkou_a`/`senkou_b` are the values projected onto the current candle
/// (computed `kijun` candles ago). `chikou` is the current close, which a
/// chart plots `kijun` candles back.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IchimokuValue {
    pub tenkan: f64,
    pub kijun: f64,
    pub senkou_a: f64,
    pub senkou_b: f64,
    pub chikou: f64,
}

impl IchimokuValue {
    pub fn cloud_top(&self) -> f64 {
        self.senkou_a.max(self.senkou_b)
    }

    pub fn cloud_bottom(&self) -> f64 {
        self.senkou_a.min(self.senkou_b)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SupertrendValue {
    /// Active band: lower band in an uptrend, upper band in a downtrend.
    pub value: f64,
    pub is_up_trend: bool,
}

/// Type-erased indicator output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum IndicatorValue {
    Scalar(f64),
    Bands(BandsValue),
    Stochastic(StochasticValue),
    Macd(MacdValue),
    Adx(AdxValue),
    Ichimoku(IchimokuValue),
    Supertrend(SupertrendValue),
}

impl IndicatorValue {
    /// The value a chained indicator consumes: the scalar itself, the middle
    /// band, %K, the MACD line, the ADX line, Tenkan, or the active band.
    pub fn primary(&self) -> f64 {
        match self {
            IndicatorValue::Scalar(v) => *v,
            IndicatorValue::Bands(b) => b.middle,
            IndicatorValue::Stochastic(s) => s.k,
            IndicatorValue::Macd(m) => m.macd,
            IndicatorValue::Adx(a) => a.adx,
            IndicatorValue::Ichimoku(i) => i.tenkan,
            IndicatorValue::Supertrend(s) => s.value,
        }
    }

    /// True when every field is finite.
    pub fn is_finite(&self) -> bool {
        match self {
            IndicatorValue::Scalar(v) => v.is_finite(),
            IndicatorValue::Bands(b) => {
                b.upper.is_finite() && b.middle.is_finite() && b.lower.is_finite()
            }
            IndicatorValue::Stochastic(s) => s.k.is_finite() && s.d.is_finite(),
            IndicatorValue::Macd(m) => {
                m.macd.is_finite() && m.signal.is_finite() && m.histogram.is_finite()
            }
            IndicatorValue::Adx(a) => {
                a.adx.is_finite() && a.plus_di.is_finite() && a.minus_di.is_finite()
            }
            IndicatorValue::Ichimoku(i) => [i.tenkan, i.kijun, i.senkou_a, i.senkou_b, i.chikou]
                .iter()
                .all(|v| v.is_finite()),
            IndicatorValue::Supertrend(s) => s.value.is_finite(),
        }
    }
}

/// A concrete output record that round-trips through `IndicatorValue`.
pub trait IndicatorOutput: Copy + Debug + Send + Sync + 'static {
    fn into_value(self) -> IndicatorValue;
    fn from_value(value: &IndicatorValue) -> Option<Self>;
}

macro_rules! impl_output {
    ($ty:ty, $variant:ident) => {
        impl IndicatorOutput for $ty {
            fn into_value(self) -> IndicatorValue {
                IndicatorValue::$variant(self)
            }

            fn from_value(value: &IndicatorValue) -> Option<Self> {
                match value {
                    IndicatorValue::$variant(v) => Some(*v),
                    _ => None,
                }
            }
        }
    };
}

impl_output!(f64, Scalar);
impl_output!(BandsValue, Bands);
impl_output!(StochasticValue, Stochastic);
impl_output!(MacdValue, Macd);
impl_output!(AdxValue, Adx);
impl_output!(IchimokuValue, Ichimoku);
impl_output!(SupertrendValue, Supertrend);
