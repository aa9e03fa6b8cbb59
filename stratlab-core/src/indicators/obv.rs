//! On-Balance Volume (OBV).
//!
//! Running total: add the candle's volume on an up close, subtract it on a
//! down close. Starts at zero on the first candle.

use super::{Indicator, IndicatorInput, InputShape};

#[derive(Debug, Clone)]
pub struct Obv {
    name: String,
    total: f64,
    prev_close: Option<f64>,
}

impl Obv {
    pub fn new() -> Self {
        Self {
            name: "obv".to_string(),
            total: 0.0,
            prev_close: None,
        }
    }
}

impl Default for Obv {
    fn default() -> Self {
        Self::new()
    }
}

impl Indicator for Obv {
    type Output = f64;

    fn name(&self) -> &str {
        &self.name
    }

    fn input_shape(&self) -> InputShape {
        InputShape::Candle
    }

    fn length(&self) -> usize {
        1
    }

    fn warmup_period(&self) -> usize {
        1
    }

    fn next(&mut self, input: &IndicatorInput) -> Option<f64> {
        let close = input.price();
        if let Some(prev) = self.prev_close {
            if close > prev {
                self.total += input.volume();
            } else if close < prev {
                self.total -= input.volume();
            }
        }
        self.prev_close = Some(close);
        Some(self.total)
    }

    fn reset(&mut self) {
        self.total = 0.0;
        self.prev_close = None;
    }
}
