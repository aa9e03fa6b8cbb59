//! Linear regression slope.
//!
//! Least-squares slope of the last `period` inputs against x = 0..period-1,
//! in price units per candle. A window of one sample has slope zero.

use super::{Indicator, IndicatorInput, RollingWindow};

#[derive(Debug, Clone)]
pub struct LinearRegSlope {
    period: usize,
    name: String,
    window: RollingWindow<f64>,
    sum_x: f64,
    denominator: f64,
}

impl LinearRegSlope {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "Linear regression period must be >= 1");
        let n = period as f64;
        let sum_x = n * (n - 1.0) / 2.0;
        let sum_x2 = (n - 1.0) * n * (2.0 * n - 1.0) / 6.0;
        Self {
            period,
            name: format!("linreg_slope_{period}"),
            window: RollingWindow::new(period),
            sum_x,
            denominator: n * sum_x2 - sum_x * sum_x,
        }
    }
}

impl Indicator for LinearRegSlope {
    type Output = f64;

    fn name(&self) -> &str {
        &self.name
    }

    fn length(&self) -> usize {
        self.period
    }

    fn warmup_period(&self) -> usize {
        self.period
    }

    fn next(&mut self, input: &IndicatorInput) -> Option<f64> {
        self.window.push(input.price());
        if !self.window.is_full() {
            return None;
        }
        if self.denominator == 0.0 {
            return Some(0.0);
        }
        let (sum_y, sum_xy) = self
            .window
            .iter()
            .enumerate()
            .fold((0.0, 0.0), |(sy, sxy), (i, &y)| (sy + y, sxy + i as f64 * y));
        let n = self.period as f64;
        Some((n * sum_xy - self.sum_x * sum_y) / self.denominator)
    }

    fn reset(&mut self) {
        self.window.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, run_values, DEFAULT_EPSILON};

    #[test]
    fn slope_of_line() {
        let values: Vec<f64> = (0..10).map(|i| 5.0 + 2.5 * i as f64).collect();
        let result = run_values(&mut LinearRegSlope::new(4), &values);
        assert!(result[2].is_none());
        for v in result.iter().skip(3) {
            assert_approx(v.unwrap(), 2.5, 1e-9);
        }
    }

    #[test]
    fn single_sample_is_flat() {
        let result = run_values(&mut LinearRegSlope::new(1), &[3.0, 9.0]);
        assert_approx(result[1].unwrap(), 0.0, DEFAULT_EPSILON);
    }
}
