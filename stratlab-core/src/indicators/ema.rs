//! Exponential Moving Average (EMA).
//!
//! alpha = 2 / (period + 1). Seeded with the first input value; the running
//! value is reported once `period` inputs have been absorbed.

use super::{Indicator, IndicatorInput};

#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    name: String,
    alpha: f64,
    value: Option<f64>,
    count: usize,
}

impl Ema {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "EMA period must be >= 1");
        Self {
            period,
            name: format!("ema_{period}"),
            alpha: 2.0 / (period as f64 + 1.0),
            value: None,
            count: 0,
        }
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Advance with a raw value.
    pub fn push(&mut self, value: f64) -> Option<f64> {
        let next = match self.value {
            None => value,
            Some(prev) => self.alpha * value + (1.0 - self.alpha) * prev,
        };
        self.value = Some(next);
        self.count += 1;
        if self.count >= self.period {
            Some(next)
        } else {
            None
        }
    }
}

impl Indicator for Ema {
    type Output = f64;

    fn name(&self) -> &str {
        &self.name
    }

    fn length(&self) -> usize {
        self.period
    }

    fn warmup_period(&self) -> usize {
        self.period
    }

    fn next(&mut self, input: &IndicatorInput) -> Option<f64> {
        self.push(input.price())
    }

    fn reset(&mut self) {
        self.value = None;
        self.count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_candles, run, run_values, DEFAULT_EPSILON};

    #[test]
    fn ema_3_basic() {
        let candles = make_candles(&[10.0, 11.0, 12.0, 13.0, 14.0]);
        let mut ema = Ema::new(3);
        let result = run(&mut ema, &candles);

        assert!(result[0].is_none());
        assert!(result[1].is_none());
        // alpha = 0.5; seed 10 -> 10.5 -> 11.25
        assert_approx(result[2].unwrap(), 11.25, DEFAULT_EPSILON);
        // 0.5*13 + 0.5*11.25 = 12.125
        assert_approx(result[3].unwrap(), 12.125, DEFAULT_EPSILON);
        assert_approx(result[4].unwrap(), 13.0625, DEFAULT_EPSILON);
    }

    #[test]
    fn ema_constant_input_is_constant() {
        let mut ema = Ema::new(10);
        let result = run_values(&mut ema, &[42.0; 30]);
        for v in result.iter().skip(9) {
            assert_approx(v.unwrap(), 42.0, DEFAULT_EPSILON);
        }
    }

    #[test]
    fn ema_1_tracks_input() {
        let mut ema = Ema::new(1);
        let result = run_values(&mut ema, &[3.0, 8.0]);
        assert_approx(result[1].unwrap(), 8.0, DEFAULT_EPSILON);
    }

    #[test]
    fn ema_alpha() {
        assert_approx(Ema::new(9).alpha(), 0.2, DEFAULT_EPSILON);
    }
}
