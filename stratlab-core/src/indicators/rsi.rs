//! Relative Strength Index (RSI), Wilder.
//!
//! Average gain / loss of close-to-close changes, each Wilder-smoothed
//! (SMA seed over the first `period` changes). Needs `period` changes, so
//! formed after `period + 1` inputs.
//!
//! Degenerate cases: no losses gives 100; no movement at all gives 50.

use super::atr::WilderSmoother;
use super::{Indicator, IndicatorInput};

#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    name: String,
    prev: Option<f64>,
    gains: WilderSmoother,
    losses: WilderSmoother,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "RSI period must be >= 1");
        Self {
            period,
            name: format!("rsi_{period}"),
            prev: None,
            gains: WilderSmoother::new(period),
            losses: WilderSmoother::new(period),
        }
    }
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss <= 0.0 {
        if avg_gain <= 0.0 {
            50.0
        } else {
            100.0
        }
    } else {
        let rs = avg_gain / avg_loss;
        (100.0 - 100.0 / (1.0 + rs)).clamp(0.0, 100.0)
    }
}

impl Indicator for Rsi {
    type Output = f64;

    fn name(&self) -> &str {
        &self.name
    }

    fn length(&self) -> usize {
        self.period
    }

    fn warmup_period(&self) -> usize {
        self.period + 1
    }

    fn next(&mut self, input: &IndicatorInput) -> Option<f64> {
        let price = input.price();
        let prev = self.prev.replace(price)?;
        let change = price - prev;
        let gain = self.gains.push(change.max(0.0));
        let loss = self.losses.push((-change).max(0.0));
        match (gain, loss) {
            (Some(g), Some(l)) => Some(rsi_from_averages(g, l)),
            _ => None,
        }
    }

    fn reset(&mut self) {
        self.prev = None;
        self.gains.reset();
        self.losses.reset();
    }
}
