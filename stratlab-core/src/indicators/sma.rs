//! Simple Moving Average (SMA).
//!
//! Rolling mean of the input price over `period` samples.
//! Formed after `period` inputs.

use super::{Indicator, IndicatorInput, RollingWindow};

#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    name: String,
    window: RollingWindow<f64>,
    sum: f64,
}

impl Sma {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "SMA period must be >= 1");
        Self {
            period,
            name: format!("sma_{period}"),
            window: RollingWindow::new(period),
            sum: 0.0,
        }
    }

    /// Advance with a raw value.
    pub fn push(&mut self, value: f64) -> Option<f64> {
        if let Some(old) = self.window.push(value) {
            self.sum -= old;
        }
        self.sum += value;
        if self.window.is_full() {
            Some(self.sum / self.period as f64)
        } else {
            None
        }
    }
}

impl Indicator for Sma {
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
        self.window.clear();
        self.sum = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_candles, run, run_values, DEFAULT_EPSILON};

    #[test]
    fn sma_5_basic() {
        let candles = make_candles(&[10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 16.0]);
        let mut sma = Sma::new(5);
        let result = run(&mut sma, &candles);

        for (i, v) in result.iter().take(4).enumerate() {
            assert!(v.is_none(), "expected None at index {i}");
        }
        // SMA[4] = mean(10,11,12,13,14) = 12.0
        assert_approx(result[4].unwrap(), 12.0, DEFAULT_EPSILON);
        assert_approx(result[5].unwrap(), 13.0, DEFAULT_EPSILON);
        assert_approx(result[6].unwrap(), 14.0, DEFAULT_EPSILON);
    }

    #[test]
    fn sma_1_is_close() {
        let mut sma = Sma::new(1);
        let result = run_values(&mut sma, &[100.0, 200.0, 300.0]);
        assert_approx(result[0].unwrap(), 100.0, DEFAULT_EPSILON);
        assert_approx(result[2].unwrap(), 300.0, DEFAULT_EPSILON);
    }

    #[test]
    fn sma_reset_unforms() {
        let mut sma = Sma::new(2);
        run_values(&mut sma, &[1.0, 2.0]);
        sma.reset();
        assert_eq!(sma.next(&5.0.into()), None);
        assert_approx(sma.next(&7.0.into()).unwrap(), 6.0, DEFAULT_EPSILON);
    }

    #[test]
    fn sma_warmup() {
        assert_eq!(Sma::new(20).warmup_period(), 20);
        assert_eq!(Sma::new(20).name(), "sma_20");
    }
}
