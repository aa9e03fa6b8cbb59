//! MACD with signal line.
//!
//! macd = EMA(fast) - EMA(slow); signal = EMA(macd, signal_period);
//! histogram = macd - signal. Formed after slow + signal_period - 1 inputs.

use super::{Ema, Indicator, IndicatorInput, MacdValue};

#[derive(Debug, Clone)]
pub struct Macd {
    fast_period: usize,
    slow_period: usize,
    signal_period: usize,
    name: String,
    fast: Ema,
    slow: Ema,
    signal: Ema,
}

impl Macd {
    pub fn new(fast_period: usize, slow_period: usize, signal_period: usize) -> Self {
        assert!(fast_period >= 1, "MACD fast period must be >= 1");
        assert!(
            slow_period >= fast_period,
            "MACD slow period must be >= fast period"
        );
        assert!(signal_period >= 1, "MACD signal period must be >= 1");
        Self {
            fast_period,
            slow_period,
            signal_period,
            name: format!("macd_{fast_period}_{slow_period}_{signal_period}"),
            fast: Ema::new(fast_period),
            slow: Ema::new(slow_period),
            signal: Ema::new(signal_period),
        }
    }

    pub fn fast_period(&self) -> usize {
        self.fast_period
    }
}

impl Indicator for Macd {
    type Output = MacdValue;

    fn name(&self) -> &str {
        &self.name
    }

    fn length(&self) -> usize {
        self.slow_period
    }

    fn warmup_period(&self) -> usize {
        self.slow_period + self.signal_period - 1
    }

    fn next(&mut self, input: &IndicatorInput) -> Option<MacdValue> {
        let fast = self.fast.next(input);
        let slow = self.slow.next(input);
        let macd = fast? - slow?;
        let signal = self.signal.push(macd)?;
        Some(MacdValue {
            macd,
            signal,
            histogram: macd - signal,
        })
    }

    fn reset(&mut self) {
        self.fast.reset();
        self.slow.reset();
        self.signal.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, run_values, DEFAULT_EPSILON};

    #[test]
    fn macd_constant_is_zero() {
        let mut macd = Macd::new(3, 6, 4);
        let result = run_values(&mut macd, &[100.0; 20]);
        let first = result.iter().position(|v| v.is_some()).unwrap();
        assert_eq!(first + 1, macd.warmup_period());
        let v = result[19].unwrap();
        assert_approx(v.macd, 0.0, DEFAULT_EPSILON);
        assert_approx(v.signal, 0.0, DEFAULT_EPSILON);
        assert_approx(v.histogram, 0.0, DEFAULT_EPSILON);
    }

    #[test]
    fn macd_positive_in_uptrend() {
        let values: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        let mut macd = Macd::new(12, 26, 9);
        let v = run_values(&mut macd, &values).last().copied().flatten().unwrap();
        assert!(v.macd > 0.0);
    }
}
