//! Rolling highest high / lowest low.
//!
//! Candle input reads `high` (Highest) or `low` (Lowest); scalar input reads
//! the value itself.

use super::{Indicator, IndicatorInput, InputShape, RollingWindow};

#[derive(Debug, Clone)]
pub struct Highest {
    period: usize,
    name: String,
    window: RollingWindow<f64>,
}

impl Highest {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "Highest period must be >= 1");
        Self {
            period,
            name: format!("highest_{period}"),
            window: RollingWindow::new(period),
        }
    }

    pub fn push(&mut self, value: f64) -> Option<f64> {
        self.window.push(value);
        if self.window.is_full() {
            self.window.max()
        } else {
            None
        }
    }
}

impl Indicator for Highest {
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
        self.push(input.high())
    }

    fn reset(&mut self) {
        self.window.clear();
    }
}

#[derive(Debug, Clone)]
pub struct Lowest {
    period: usize,
    name: String,
    window: RollingWindow<f64>,
}

impl Lowest {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "Lowest period must be >= 1");
        Self {
            period,
            name: format!("lowest_{period}"),
            window: RollingWindow::new(period),
        }
    }

    pub fn push(&mut self, value: f64) -> Option<f64> {
        self.window.push(value);
        if self.window.is_full() {
            self.window.min()
        } else {
            None
        }
    }
}

impl Indicator for Lowest {
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
        self.push(input.low())
    }

    fn reset(&mut self) {
        self.window.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_ohlc_candles, run, run_values, DEFAULT_EPSILON};

    #[test]
    fn highest_and_lowest_over_candles() {
        let candles = make_ohlc_candles(&[
            (10.0, 12.0, 9.0, 11.0),
            (11.0, 15.0, 10.0, 14.0),
            (14.0, 14.5, 8.0, 9.0),
            (9.0, 10.0, 8.5, 9.5),
        ]);
        let hi = run(&mut Highest::new(3), &candles);
        let lo = run(&mut Lowest::new(3), &candles);
        assert!(hi[1].is_none());
        assert_approx(hi[2].unwrap(), 15.0, DEFAULT_EPSILON);
        assert_approx(hi[3].unwrap(), 15.0, DEFAULT_EPSILON);
        assert_approx(lo[2].unwrap(), 8.0, DEFAULT_EPSILON);
        assert_approx(lo[3].unwrap(), 8.0, DEFAULT_EPSILON);
    }

    #[test]
    fn scalar_input_uses_value() {
        let result = run_values(&mut Highest::new(2), &[1.0, 3.0, 2.0]);
        assert_approx(result[2].unwrap(), 3.0, DEFAULT_EPSILON);
    }
}
