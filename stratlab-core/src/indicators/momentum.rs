//! Momentum: price - price `period` inputs ago. Formed after period + 1 inputs.

use super::{Indicator, IndicatorInput, RollingWindow};

#[derive(Debug, Clone)]
pub struct Momentum {
    period: usize,
    name: String,
    window: RollingWindow<f64>,
}

impl Momentum {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "Momentum period must be >= 1");
        Self {
            period,
            name: format!("momentum_{period}"),
            window: RollingWindow::new(period + 1),
        }
    }
}

impl Indicator for Momentum {
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
        self.window.push(price);
        if !self.window.is_full() {
            return None;
        }
        Some(price - self.window.first()?)
    }

    fn reset(&mut self) {
        self.window.clear();
    }
}
