//! Choppiness Index.
//!
//! CHOP = 100 * log10(sum(TR, n) / (highest_high(n) - lowest_low(n))) / log10(n).
//! High values mean sideways chop, low values a directional trend. A zero
//! range over the window reads as maximal chop (100).

use super::atr::true_range;
use super::{Highest, Indicator, IndicatorInput, InputShape, Lowest, RollingWindow};

#[derive(Debug, Clone)]
pub struct Choppiness {
    period: usize,
    name: String,
    tr_window: RollingWindow<f64>,
    tr_sum: f64,
    highest: Highest,
    lowest: Lowest,
    prev_close: Option<f64>,
}

impl Choppiness {
    pub fn new(period: usize) -> Self {
        assert!(period >= 2, "Choppiness period must be >= 2");
        Self {
            period,
            name: format!("chop_{period}"),
            tr_window: RollingWindow::new(period),
            tr_sum: 0.0,
            highest: Highest::new(period),
            lowest: Lowest::new(period),
            prev_close: None,
        }
    }
}

impl Indicator for Choppiness {
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
        if let Some(old) = self.tr_window.push(tr) {
            self.tr_sum -= old;
        }
        self.tr_sum += tr;

        let high = self.highest.push(input.high());
        let low = self.lowest.push(input.low());
        let range = high? - low?;
        if range <= 0.0 || self.tr_sum <= 0.0 {
            return Some(100.0);
        }
        Some(100.0 * (self.tr_sum / range).log10() / (self.period as f64).log10())
    }

    fn reset(&mut self) {
        self.tr_window.clear();
        self.tr_sum = 0.0;
        self.highest.reset();
        self.lowest.reset();
        self.prev_close = None;
    }
}
