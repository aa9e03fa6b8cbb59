//! Rolling standard deviation (population) of the input price.

use super::{Indicator, IndicatorInput, RollingStatistics};

#[derive(Debug, Clone)]
pub struct StdDev {
    period: usize,
    name: String,
    stats: RollingStatistics,
}

impl StdDev {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "StdDev period must be >= 1");
        Self {
            period,
            name: format!("stddev_{period}"),
            stats: RollingStatistics::new(period),
        }
    }
}

impl Indicator for StdDev {
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
        self.stats.push(input.price());
        if self.stats.is_full() {
            self.stats.std_dev()
        } else {
            None
        }
    }

    fn reset(&mut self) {
        self.stats.reset();
    }
}
