//! Williams %R.
//!
//! %R = (highest_high - close) / (highest_high - lowest_low) * -100, in
//! [-100, 0]. A zero range gives -50.

use super::{Highest, Indicator, IndicatorInput, InputShape, Lowest};

#[derive(Debug, Clone)]
pub struct WilliamsR {
    period: usize,
    name: String,
    highest: Highest,
    lowest: Lowest,
}

impl WilliamsR {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "Williams %R period must be >= 1");
        Self {
            period,
            name: format!("williams_r_{period}"),
            highest: Highest::new(period),
            lowest: Lowest::new(period),
        }
    }
}

impl Indicator for WilliamsR {
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
        let high = self.highest.push(input.high());
        let low = self.lowest.push(input.low());
        let (high, low) = (high?, low?);
        let range = high - low;
        if range <= 0.0 {
            return Some(-50.0);
        }
        Some(((high - input.price()) / range * -100.0).clamp(-100.0, 0.0))
    }

    fn reset(&mut self) {
        self.highest.reset();
        self.lowest.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_ohlc_candles, run, DEFAULT_EPSILON};

    #[test]
    fn williams_r_extremes() {
        let candles = make_ohlc_candles(&[
            (10.0, 12.0, 8.0, 10.0),
            (10.0, 12.0, 8.0, 12.0),
            (10.0, 12.0, 8.0, 8.0),
        ]);
        let result = run(&mut WilliamsR::new(2), &candles);
        assert!(result[0].is_none());
        assert_approx(result[1].unwrap(), 0.0, DEFAULT_EPSILON);
        assert_approx(result[2].unwrap(), -100.0, DEFAULT_EPSILON);
    }
}
