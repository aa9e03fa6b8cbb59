//! Bollinger Bands.
//!
//! middle = SMA(period); upper/lower = middle +/- width * stddev, where
//! stddev is the population standard deviation over the same window.

use super::{BandsValue, Indicator, IndicatorInput, RollingStatistics};

#[derive(Debug, Clone)]
pub struct Bollinger {
    period: usize,
    width: f64,
    name: String,
    stats: RollingStatistics,
}

impl Bollinger {
    pub fn new(period: usize, width: f64) -> Self {
        assert!(period >= 1, "Bollinger period must be >= 1");
        assert!(width >= 0.0, "Bollinger width must be >= 0");
        Self {
            period,
            width,
            name: format!("bollinger_{period}_{width}"),
            stats: RollingStatistics::new(period),
        }
    }

    pub fn width(&self) -> f64 {
        self.width
    }
}

impl Indicator for Bollinger {
    type Output = BandsValue;

    fn name(&self) -> &str {
        &self.name
    }

    fn length(&self) -> usize {
        self.period
    }

    fn warmup_period(&self) -> usize {
        self.period
    }

    fn next(&mut self, input: &IndicatorInput) -> Option<BandsValue> {
        self.stats.push(input.price());
        if !self.stats.is_full() {
            return None;
        }
        let middle = self.stats.mean()?;
        let sd = self.stats.std_dev()?;
        Some(BandsValue {
            upper: middle + self.width * sd,
            middle,
            lower: middle - self.width * sd,
        })
    }

    fn reset(&mut self) {
        self.stats.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_candles, run, DEFAULT_EPSILON};

    #[test]
    fn bollinger_basic() {
        let candles = make_candles(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        let result = run(&mut Bollinger::new(8, 2.0), &candles);
        let b = result[7].unwrap();
        // mean 5, population sd 2
        assert_approx(b.middle, 5.0, 1e-12);
        assert_approx(b.upper, 9.0, 1e-9);
        assert_approx(b.lower, 1.0, 1e-9);
    }

    #[test]
    fn bollinger_constant_collapses() {
        let candles = make_candles(&[50.0; 5]);
        let result = run(&mut Bollinger::new(5, 2.0), &candles);
        let b = result[4].unwrap();
        assert_approx(b.upper, 50.0, DEFAULT_EPSILON);
        assert_approx(b.lower, 50.0, DEFAULT_EPSILON);
    }
}
