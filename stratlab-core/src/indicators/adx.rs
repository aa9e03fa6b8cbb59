//! ADX: Average Directional Index (Wilder).
//!
//! Steps per candle (from the second one on):
//! 1. +DM / -DM from consecutive highs and lows, plus true range
//! 2. Wilder-smooth +DM, -DM and TR (period)
//! 3. +DI = 100 * sm(+DM) / sm(TR), -DI = 100 * sm(-DM) / sm(TR)
//! 4. DX = 100 * |+DI - -DI| / (+DI + -DI)
//! 5. ADX = Wilder-smoothed DX (period)
//!
//! The DI stage needs `period` changes (period + 1 candles) and the ADX stage
//! `period` DX values, so ADX is formed after 2 * period candles.

use super::atr::{true_range, WilderSmoother};
use super::{AdxValue, Indicator, IndicatorInput, InputShape};

#[derive(Debug, Clone)]
pub struct Adx {
    period: usize,
    name: String,
    prev: Option<(f64, f64, f64)>,
    tr: WilderSmoother,
    plus_dm: WilderSmoother,
    minus_dm: WilderSmoother,
    adx: WilderSmoother,
}

impl Adx {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "ADX period must be >= 1");
        Self {
            period,
            name: format!("adx_{period}"),
            prev: None,
            tr: WilderSmoother::new(period),
            plus_dm: WilderSmoother::new(period),
            minus_dm: WilderSmoother::new(period),
            adx: WilderSmoother::new(period),
        }
    }
}

/// +DM and -DM for one step.
fn directional_movement(high: f64, low: f64, prev_high: f64, prev_low: f64) -> (f64, f64) {
    let up = high - prev_high;
    let down = prev_low - low;
    let plus = if up > down && up > 0.0 { up } else { 0.0 };
    let minus = if down > up && down > 0.0 { down } else { 0.0 };
    (plus, minus)
}

impl Indicator for Adx {
    type Output = AdxValue;

    fn name(&self) -> &str {
        &self.name
    }

    fn input_shape(&self) -> InputShape {
        InputShape::Candle
    }

    fn length(&self) -> usize {
        self.period
    }

    fn warmup_period(&self) -> usize {
        2 * self.period
    }

    fn next(&mut self, input: &IndicatorInput) -> Option<AdxValue> {
        let (high, low, close) = (input.high(), input.low(), input.price());
        let (prev_high, prev_low, prev_close) = self.prev.replace((high, low, close))?;

        let (plus, minus) = directional_movement(high, low, prev_high, prev_low);
        let tr = self.tr.push(true_range(high, low, Some(prev_close)));
        let plus = self.plus_dm.push(plus);
        let minus = self.minus_dm.push(minus);
        let (tr, plus, minus) = (tr?, plus?, minus?);

        let (plus_di, minus_di) = if tr > 0.0 {
            (100.0 * plus / tr, 100.0 * minus / tr)
        } else {
            (0.0, 0.0)
        };
        let di_sum = plus_di + minus_di;
        let dx = if di_sum > 0.0 {
            100.0 * (plus_di - minus_di).abs() / di_sum
        } else {
            0.0
        };

        let adx = self.adx.push(dx)?;
        Some(AdxValue {
            adx,
            plus_di,
            minus_di,
        })
    }

    fn reset(&mut self) {
        self.prev = None;
        self.tr.reset();
        self.plus_dm.reset();
        self.minus_dm.reset();
        self.adx.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{make_ohlc_candles, run};

    #[test]
    fn adx_bounds() {
        let candles = make_ohlc_candles(&[
            (100.0, 105.0, 95.0, 102.0),
            (102.0, 108.0, 100.0, 106.0),
            (106.0, 107.0, 98.0, 99.0),
            (99.0, 103.0, 97.0, 101.0),
            (101.0, 106.0, 100.0, 105.0),
            (105.0, 110.0, 103.0, 108.0),
            (108.0, 112.0, 106.0, 110.0),
            (110.0, 111.0, 104.0, 105.0),
            (105.0, 109.0, 103.0, 107.0),
            (107.0, 113.0, 105.0, 112.0),
        ]);
        let result = run(&mut Adx::new(3), &candles);
        for (i, v) in result.iter().enumerate() {
            if let Some(v) = v {
                assert!((0.0..=100.0).contains(&v.adx), "ADX out of bounds at {i}: {}", v.adx);
            }
        }
        let first = result.iter().position(|v| v.is_some()).unwrap();
        assert_eq!(first + 1, 6);
    }

    #[test]
    fn adx_strong_trend_elevated() {
        let data: Vec<_> = (0..30)
            .map(|i| {
                let base = 100.0 + i as f64 * 5.0;
                (base - 1.0, base + 3.0, base - 3.0, base + 2.0)
            })
            .collect();
        let candles = make_ohlc_candles(&data);
        let result = run(&mut Adx::new(5), &candles);
        let last = result.last().copied().flatten().unwrap();
        assert!(last.adx > 20.0, "ADX should be elevated in a strong trend, got {}", last.adx);
        assert!(last.plus_di > last.minus_di);
    }

    #[test]
    fn adx_warmup() {
        assert_eq!(Adx::new(14).warmup_period(), 28);
        assert_eq!(Adx::new(7).warmup_period(), 14);
    }
}
