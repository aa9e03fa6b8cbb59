//! Average True Range (ATR).
//!
//! True Range: max(high-low, |high-prev_close|, |low-prev_close|); the first
//! candle has no previous close and uses high-low.
//! ATR uses Wilder smoothing (alpha = 1/period) seeded with the simple
//! average of the first `period` true ranges. Formed after `period` inputs.

use super::{Indicator, IndicatorInput, InputShape};

/// True range of one candle given the previous close.
pub fn true_range(high: f64, low: f64, prev_close: Option<f64>) -> f64 {
    match prev_close {
        None => high - low,
        Some(pc) => (high - low).max((high - pc).abs()).max((low - pc).abs()),
    }
}

/// Wilder smoothing: SMA seed over the first `period` values, then
/// `value = prev + (x - prev) / period`.
#[derive(Debug, Clone)]
pub struct WilderSmoother {
    period: usize,
    count: usize,
    seed_sum: f64,
    value: Option<f64>,
}

impl WilderSmoother {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "Wilder period must be >= 1");
        Self {
            period,
            count: 0,
            seed_sum: 0.0,
            value: None,
        }
    }

    pub fn push(&mut self, x: f64) -> Option<f64> {
        match self.value {
            Some(prev) => {
                let next = prev + (x - prev) / self.period as f64;
                self.value = Some(next);
            }
            None => {
                self.count += 1;
                self.seed_sum += x;
                if self.count == self.period {
                    self.value = Some(self.seed_sum / self.period as f64);
                }
            }
        }
        self.value
    }

    pub fn value(&self) -> Option<f64> {
        self.value
    }

    pub fn reset(&mut self) {
        self.count = 0;
        self.seed_sum = 0.0;
        self.value = None;
    }
}

#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
    name: String,
    smoother: WilderSmoother,
    prev_close: Option<f64>,
}

impl Atr {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "ATR period must be >= 1");
        Self {
            period,
            name: format!("atr_{period}"),
            smoother: WilderSmoother::new(period),
            prev_close: None,
        }
    }

    pub fn value(&self) -> Option<f64> {
        self.smoother.value()
    }
}

impl Indicator for Atr {
    type Output = f64;

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
        self.period
    }

    fn next(&mut self, input: &IndicatorInput) -> Option<f64> {
        let tr = true_range(input.high(), input.low(), self.prev_close);
        self.prev_close = Some(input.price());
        self.smoother.push(tr)
    }

    fn reset(&mut self) {
        self.smoother.reset();
        self.prev_close = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_ohlc_candles, run, DEFAULT_EPSILON};

    #[test]
    fn true_range_basic() {
        assert_approx(true_range(12.0, 8.0, None), 4.0, DEFAULT_EPSILON);
        // gap up: |high - prev_close| dominates
        assert_approx(true_range(15.0, 13.0, Some(10.0)), 5.0, DEFAULT_EPSILON);
        // gap down: |low - prev_close| dominates
        assert_approx(true_range(9.0, 6.0, Some(12.0)), 6.0, DEFAULT_EPSILON);
    }

    #[test]
    fn atr_3_seed_and_smoothing() {
        let candles = make_ohlc_candles(&[
            (10.0, 12.0, 8.0, 11.0),  // TR 4
            (11.0, 13.0, 10.0, 12.0), // TR 3
            (12.0, 14.0, 11.0, 13.0), // TR 3
            (13.0, 19.0, 13.0, 18.0), // TR 6
        ]);
        let mut atr = Atr::new(3);
        let result = run(&mut atr, &candles);
        assert!(result[1].is_none());
        assert_approx(result[2].unwrap(), 10.0 / 3.0, DEFAULT_EPSILON);
        // 10/3 + (6 - 10/3) / 3
        assert_approx(result[3].unwrap(), 10.0 / 3.0 + (6.0 - 10.0 / 3.0) / 3.0, DEFAULT_EPSILON);
    }

    #[test]
    fn wilder_seed_is_simple_average() {
        let mut w = WilderSmoother::new(4);
        assert_eq!(w.push(1.0), None);
        assert_eq!(w.push(2.0), None);
        assert_eq!(w.push(3.0), None);
        assert_approx(w.push(4.0).unwrap(), 2.5, DEFAULT_EPSILON);
        assert_approx(w.push(6.5).unwrap(), 3.5, DEFAULT_EPSILON);
    }
}
