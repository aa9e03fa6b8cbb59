//! Weighted Moving Average (WMA).
//!
//! Linear weights 1..=period, newest sample heaviest. The weighted sum is
//! rolled forward in O(1): num' = num - sum + period * x.

use super::{Indicator, IndicatorInput, RollingWindow};

#[derive(Debug, Clone)]
pub struct Wma {
    period: usize,
    name: String,
    window: RollingWindow<f64>,
    sum: f64,
    weighted: f64,
    denominator: f64,
}

impl Wma {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "WMA period must be >= 1");
        Self {
            period,
            name: format!("wma_{period}"),
            window: RollingWindow::new(period),
            sum: 0.0,
            weighted: 0.0,
            denominator: (period * (period + 1)) as f64 / 2.0,
        }
    }

    pub fn push(&mut self, value: f64) -> Option<f64> {
        if self.window.is_full() {
            let old = self.window.push(value).unwrap_or(0.0);
            self.weighted = self.weighted - self.sum + self.period as f64 * value;
            self.sum = self.sum - old + value;
        } else {
            self.window.push(value);
            self.weighted += self.window.len() as f64 * value;
            self.sum += value;
        }

        if self.window.is_full() {
            Some(self.weighted / self.denominator)
        } else {
            None
        }
    }
}

impl Indicator for Wma {
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
        self.weighted = 0.0;
    }
}
