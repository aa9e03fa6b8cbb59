//! Smoothed Moving Average (SMMA, a.k.a. RMA).
//!
//! Wilder smoothing of the input price: alpha = 1/period, seeded with the
//! simple average of the first `period` inputs.

use super::atr::WilderSmoother;
use super::{Indicator, IndicatorInput};

#[derive(Debug, Clone)]
pub struct Smma {
    period: usize,
    name: String,
    smoother: WilderSmoother,
}

impl Smma {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "SMMA period must be >= 1");
        Self {
            period,
            name: format!("smma_{period}"),
            smoother: WilderSmoother::new(period),
        }
    }
}

impl Indicator for Smma {
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
        self.smoother.push(input.price())
    }

    fn reset(&mut self) {
        self.smoother.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, run_values, DEFAULT_EPSILON};

    #[test]
    fn smma_seed_then_wilder() {
        let mut smma = Smma::new(3);
        let result = run_values(&mut smma, &[3.0, 6.0, 9.0, 12.0]);
        assert!(result[1].is_none());
        assert_approx(result[2].unwrap(), 6.0, DEFAULT_EPSILON);
        // 6 + (12 - 6) / 3
        assert_approx(result[3].unwrap(), 8.0, DEFAULT_EPSILON);
    }
}
