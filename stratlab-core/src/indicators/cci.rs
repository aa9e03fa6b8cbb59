//! Commodity Channel Index (CCI).
//!
//! CCI = (TP - SMA(TP)) / (0.015 * mean_deviation), with TP the typical
//! price and the mean absolute deviation taken over the same window.
//! A zero deviation gives 0.

use super::{Indicator, IndicatorInput, InputShape, RollingWindow};

const LAMBERT: f64 = 0.015;

#[derive(Debug, Clone)]
pub struct Cci {
    period: usize,
    name: String,
    window: RollingWindow<f64>,
    sum: f64,
}

impl Cci {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "CCI period must be >= 1");
        Self {
            period,
            name: format!("cci_{period}"),
            window: RollingWindow::new(period),
            sum: 0.0,
        }
    }
}

impl Indicator for Cci {
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
        let tp = input.typical_price();
        if let Some(old) = self.window.push(tp) {
            self.sum -= old;
        }
        self.sum += tp;
        if !self.window.is_full() {
            return None;
        }
        let n = self.period as f64;
        let mean = self.sum / n;
        let mean_dev = self.window.iter().map(|v| (v - mean).abs()).sum::<f64>() / n;
        if mean_dev <= 0.0 {
            return Some(0.0);
        }
        Some((tp - mean) / (LAMBERT * mean_dev))
    }

    fn reset(&mut self) {
        self.window.clear();
        self.sum = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_ohlc_candles, run, DEFAULT_EPSILON};

    #[test]
    fn cci_known_value() {
        // Flat candles: TP = close. TPs 10, 12, 14 -> mean 12, mean dev 4/3.
        let candles = make_ohlc_candles(&[
            (10.0, 10.0, 10.0, 10.0),
            (12.0, 12.0, 12.0, 12.0),
            (14.0, 14.0, 14.0, 14.0),
        ]);
        let result = run(&mut Cci::new(3), &candles);
        assert!(result[1].is_none());
        assert_approx(result[2].unwrap(), 2.0 / (0.015 * 4.0 / 3.0), 1e-9);
    }

    #[test]
    fn cci_constant_is_zero() {
        let candles = make_ohlc_candles(&[(5.0, 6.0, 4.0, 5.0); 5]);
        let result = run(&mut Cci::new(3), &candles);
        assert_approx(result[4].unwrap(), 0.0, DEFAULT_EPSILON);
    }
}
