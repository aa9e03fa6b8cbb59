//! Session VWAP.
//!
//! Cumulative sum(typical_price * volume) / sum(volume), reset at each UTC
//! day boundary (by candle open time). With zero cumulative volume the
//! output is the current typical price.

use super::{Indicator, IndicatorInput, InputShape};
use chrono::NaiveDate;

#[derive(Debug, Clone)]
pub struct Vwap {
    name: String,
    session: Option<NaiveDate>,
    pv: f64,
    volume: f64,
}

impl Vwap {
    pub fn new() -> Self {
        Self {
            name: "vwap".to_string(),
            session: None,
            pv: 0.0,
            volume: 0.0,
        }
    }
}

impl Default for Vwap {
    fn default() -> Self {
        Self::new()
    }
}

impl Indicator for Vwap {
    type Output = f64;

    fn name(&self) -> &str {
        &self.name
    }

    fn input_shape(&self) -> InputShape {
        InputShape::Candle
    }

    fn length(&self) -> usize {
        1
    }

    fn warmup_period(&self) -> usize {
        1
    }

    fn next(&mut self, input: &IndicatorInput) -> Option<f64> {
        if let Some(candle) = input.candle() {
            let day = candle.open_time.date_naive();
            if self.session != Some(day) {
                self.session = Some(day);
                self.pv = 0.0;
                self.volume = 0.0;
            }
        }
        let tp = input.typical_price();
        let vol = input.volume().max(0.0);
        self.pv += tp * vol;
        self.volume += vol;
        if self.volume > 0.0 {
            Some(self.pv / self.volume)
        } else {
            Some(tp)
        }
    }

    fn reset(&mut self) {
        self.session = None;
        self.pv = 0.0;
        self.volume = 0.0;
    }
}
