//! Donchian Channel.
//!
//! upper = highest high over `period`, lower = lowest low over `period`,
//! middle = (upper + lower) / 2. The current candle is part of the window.

use super::{BandsValue, Highest, Indicator, IndicatorInput, InputShape, Lowest};

#[derive(Debug, Clone)]
pub struct Donchian {
    period: usize,
    name: String,
    highest: Highest,
    lowest: Lowest,
}

impl Donchian {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "Donchian period must be >= 1");
        Self {
            period,
            name: format!("donchian_{period}"),
            highest: Highest::new(period),
            lowest: Lowest::new(period),
        }
    }
}

impl Indicator for Donchian {
    type Output = BandsValue;

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

    fn next(&mut self, input: &IndicatorInput) -> Option<BandsValue> {
        let upper = self.highest.push(input.high());
        let lower = self.lowest.push(input.low());
        match (upper, lower) {
            (Some(upper), Some(lower)) => Some(BandsValue {
                upper,
                middle: (upper + lower) / 2.0,
                lower,
            }),
            _ => None,
        }
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
    fn donchian_3_basic() {
        let candles = make_ohlc_candles(&[
            (100.0, 105.0, 95.0, 102.0),
            (102.0, 108.0, 100.0, 106.0),
            (106.0, 107.0, 98.0, 99.0),
            (99.0, 103.0, 97.0, 101.0),
        ]);
        let result = run(&mut Donchian::new(3), &candles);
        assert!(result[1].is_none());
        let b = result[2].unwrap();
        assert_approx(b.upper, 108.0, DEFAULT_EPSILON);
        assert_approx(b.lower, 95.0, DEFAULT_EPSILON);
        assert_approx(b.middle, 101.5, DEFAULT_EPSILON);
        let b = result[3].unwrap();
        assert_approx(b.upper, 108.0, DEFAULT_EPSILON);
        assert_approx(b.lower, 97.0, DEFAULT_EPSILON);
    }
}
