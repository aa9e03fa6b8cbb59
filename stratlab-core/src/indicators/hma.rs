//! Hull Moving Average (HMA).
//!
//! HMA = WMA(2 * WMA(n/2) - WMA(n), round(sqrt(n))).
//! Formed after n + round(sqrt(n)) - 1 inputs.

use super::{Indicator, IndicatorInput, Wma};

#[derive(Debug, Clone)]
pub struct Hma {
    period: usize,
    name: String,
    half: Wma,
    full: Wma,
    smooth: Wma,
    smooth_len: usize,
}

impl Hma {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "HMA period must be >= 1");
        let half_len = (period / 2).max(1);
        let smooth_len = ((period as f64).sqrt().round() as usize).max(1);
        Self {
            period,
            name: format!("hma_{period}"),
            half: Wma::new(half_len),
            full: Wma::new(period),
            smooth: Wma::new(smooth_len),
            smooth_len,
        }
    }
}

impl Indicator for Hma {
    type Output = f64;

    fn name(&self) -> &str {
        &self.name
    }

    fn length(&self) -> usize {
        self.period
    }

    fn warmup_period(&self) -> usize {
        self.period + self.smooth_len - 1
    }

    fn next(&mut self, input: &IndicatorInput) -> Option<f64> {
        let price = input.price();
        let half = self.half.push(price);
        let full = self.full.push(price);
        match (half, full) {
            (Some(h), Some(f)) => self.smooth.push(2.0 * h - f),
            _ => None,
        }
    }

    fn reset(&mut self) {
        self.half.reset();
        self.full.reset();
        self.smooth.reset();
    }
}
