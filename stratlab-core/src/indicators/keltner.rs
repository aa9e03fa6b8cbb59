//! Keltner Channel.
//!
//! middle = EMA(period) of close; upper/lower = middle +/- multiplier * ATR(period).

use super::{Atr, BandsValue, Ema, Indicator, IndicatorInput, InputShape};

#[derive(Debug, Clone)]
pub struct Keltner {
    period: usize,
    multiplier: f64,
    name: String,
    ema: Ema,
    atr: Atr,
}

impl Keltner {
    pub fn new(period: usize, multiplier: f64) -> Self {
        assert!(period >= 1, "Keltner period must be >= 1");
        Self {
            period,
            multiplier,
            name: format!("keltner_{period}_{multiplier}"),
            ema: Ema::new(period),
            atr: Atr::new(period),
        }
    }
}

impl Indicator for Keltner {
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
        let middle = self.ema.next(input);
        let atr = self.atr.next(input);
        let (middle, atr) = (middle?, atr?);
        Some(BandsValue {
            upper: middle + self.multiplier * atr,
            middle,
            lower: middle - self.multiplier * atr,
        })
    }

    fn reset(&mut self) {
        self.ema.reset();
        self.atr.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_ohlc_candles, run, DEFAULT_EPSILON};

    #[test]
    fn keltner_constant_range() {
        // Every candle: range 2 around a flat close of 10, no gaps -> ATR 2.
        let data = vec![(10.0, 11.0, 9.0, 10.0); 6];
        let candles = make_ohlc_candles(&data);
        let result = run(&mut Keltner::new(3, 1.5), &candles);
        assert!(result[1].is_none());
        let b = result[5].unwrap();
        assert_approx(b.middle, 10.0, DEFAULT_EPSILON);
        assert_approx(b.upper, 13.0, DEFAULT_EPSILON);
        assert_approx(b.lower, 7.0, DEFAULT_EPSILON);
    }
}
