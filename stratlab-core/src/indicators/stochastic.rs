//! Stochastic oscillator.
//!
//! raw_k = (close - lowest_low) / (highest_high - lowest_low) * 100 over
//! `period` candles (50 when the range is zero); K = SMA(raw_k, k_period);
//! D = SMA(K, d_period). Formed after period + k_period - 1 + d_period - 1
//! inputs.

use super::{Highest, Indicator, IndicatorInput, InputShape, Lowest, Sma, StochasticValue};

#[derive(Debug, Clone)]
pub struct Stochastic {
    period: usize,
    k_period: usize,
    d_period: usize,
    name: String,
    highest: Highest,
    lowest: Lowest,
    k_sma: Sma,
    d_sma: Sma,
}

impl Stochastic {
    pub fn new(period: usize, k_period: usize, d_period: usize) -> Self {
        assert!(period >= 1, "Stochastic period must be >= 1");
        assert!(k_period >= 1, "Stochastic %K smoothing must be >= 1");
        assert!(d_period >= 1, "Stochastic %D smoothing must be >= 1");
        Self {
            period,
            k_period,
            d_period,
            name: format!("stoch_{period}_{k_period}_{d_period}"),
            highest: Highest::new(period),
            lowest: Lowest::new(period),
            k_sma: Sma::new(k_period),
            d_sma: Sma::new(d_period),
        }
    }
}

/// Position of `close` inside [low, high] scaled to 0..100; 50 on a zero range.
pub(crate) fn raw_stochastic(close: f64, high: f64, low: f64) -> f64 {
    let range = high - low;
    if range <= 0.0 {
        50.0
    } else {
        ((close - low) / range * 100.0).clamp(0.0, 100.0)
    }
}

impl Indicator for Stochastic {
    type Output = StochasticValue;

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
        self.period + self.k_period - 1 + self.d_period - 1
    }

    fn next(&mut self, input: &IndicatorInput) -> Option<StochasticValue> {
        let high = self.highest.push(input.high());
        let low = self.lowest.push(input.low());
        let raw = raw_stochastic(input.price(), high?, low?);
        let k = self.k_sma.push(raw)?;
        let d = self.d_sma.push(k)?;
        Some(StochasticValue { k, d })
    }

    fn reset(&mut self) {
        self.highest.reset();
        self.lowest.reset();
        self.k_sma.reset();
        self.d_sma.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_ohlc_candles, run, DEFAULT_EPSILON};

    #[test]
    fn flat_candles_give_50() {
        let candles = make_ohlc_candles(&[(10.0, 10.0, 10.0, 10.0); 8]);
        let result = run(&mut Stochastic::new(3, 2, 2), &candles);
        let first = result.iter().position(|v| v.is_some()).unwrap();
        assert_eq!(first + 1, 5);
        for v in result.iter().skip(first) {
            let v = v.unwrap();
            assert_approx(v.k, 50.0, DEFAULT_EPSILON);
            assert_approx(v.d, 50.0, DEFAULT_EPSILON);
        }
    }

    #[test]
    fn close_at_high_is_100() {
        let candles = make_ohlc_candles(&[
            (10.0, 11.0, 9.0, 10.0),
            (10.0, 12.0, 9.5, 11.0),
            (11.0, 13.0, 10.0, 13.0),
        ]);
        let result = run(&mut Stochastic::new(3, 1, 1), &candles);
        let v = result[2].unwrap();
        assert_approx(v.k, 100.0, DEFAULT_EPSILON);
    }

    #[test]
    fn warmup_formula() {
        assert_eq!(Stochastic::new(14, 3, 3).warmup_period(), 18);
    }
}
