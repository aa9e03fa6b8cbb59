//! Parabolic SAR: Wilder's stop-and-reverse system.
//!
//! State: direction, extreme point (EP) and acceleration factor (AF).
//! AF starts at `acceleration`, grows by the same amount on each new extreme
//! and is capped at `max_acceleration`. The SAR flips to the prior EP when
//! price crosses it. The second candle seeds the direction, so the first
//! value is reported on the second input.

use super::{Indicator, IndicatorInput, InputShape};

#[derive(Debug, Clone, Copy)]
struct SarState {
    is_long: bool,
    sar: f64,
    ep: f64,
    af: f64,
}

#[derive(Debug, Clone)]
pub struct ParabolicSar {
    acceleration: f64,
    max_acceleration: f64,
    name: String,
    /// (high, low, close) of the previous two candles, newest first.
    prev: [Option<(f64, f64, f64)>; 2],
    state: Option<SarState>,
}

impl ParabolicSar {
    pub fn new(acceleration: f64, max_acceleration: f64) -> Self {
        assert!(acceleration > 0.0, "SAR acceleration must be > 0");
        assert!(
            max_acceleration >= acceleration,
            "SAR max acceleration must be >= acceleration"
        );
        Self {
            acceleration,
            max_acceleration,
            name: format!("psar_{acceleration}_{max_acceleration}"),
            prev: [None, None],
            state: None,
        }
    }

    /// Default parameters: 0.02, 0.20
    pub fn default_params() -> Self {
        Self::new(0.02, 0.20)
    }

    /// True while the SAR sits below price.
    pub fn is_long(&self) -> Option<bool> {
        self.state.map(|s| s.is_long)
    }

    fn step(&self, mut s: SarState, high: f64, low: f64) -> SarState {
        let mut sar = s.sar + s.af * (s.ep - s.sar);
        let recent = self.prev.iter().flatten();
        if s.is_long {
            for &(_, prev_low, _) in recent {
                sar = sar.min(prev_low);
            }
            if low < sar {
                s.is_long = false;
                sar = s.ep;
                s.ep = low;
                s.af = self.acceleration;
            } else if high > s.ep {
                s.ep = high;
                s.af = (s.af + self.acceleration).min(self.max_acceleration);
            }
        } else {
            for &(prev_high, _, _) in recent {
                sar = sar.max(prev_high);
            }
            if high > sar {
                s.is_long = true;
                sar = s.ep;
                s.ep = high;
                s.af = self.acceleration;
            } else if low < s.ep {
                s.ep = low;
                s.af = (s.af + self.acceleration).min(self.max_acceleration);
            }
        }
        s.sar = sar;
        s
    }
}

impl Indicator for ParabolicSar {
    type Output = f64;

    fn name(&self) -> &str {
        &self.name
    }

    fn input_shape(&self) -> InputShape {
        InputShape::Candle
    }

    fn length(&self) -> usize {
        2
    }

    fn warmup_period(&self) -> usize {
        2
    }

    fn next(&mut self, input: &IndicatorInput) -> Option<f64> {
        let (high, low, close) = (input.high(), input.low(), input.price());

        let next_state = match (self.state, self.prev[0]) {
            (Some(s), _) => Some(self.step(s, high, low)),
            (None, Some((prev_high, prev_low, prev_close))) => {
                let is_long = close >= prev_close;
                Some(SarState {
                    is_long,
                    sar: if is_long { prev_low } else { prev_high },
                    ep: if is_long { high } else { low },
                    af: self.acceleration,
                })
            }
            (None, None) => None,
        };

        self.prev[1] = self.prev[0];
        self.prev[0] = Some((high, low, close));
        self.state = next_state;
        self.state.map(|s| s.sar)
    }

    fn reset(&mut self) {
        self.prev = [None, None];
        self.state = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_ohlc_candles, run, DEFAULT_EPSILON};

    #[test]
    fn sar_below_price_in_uptrend() {
        let data: Vec<_> = (0..15)
            .map(|i| {
                let b = 100.0 + i as f64 * 2.0;
                (b, b + 1.5, b - 0.5, b + 1.0)
            })
            .collect();
        let candles = make_ohlc_candles(&data);
        let result = run(&mut ParabolicSar::default_params(), &candles);
        assert!(result[0].is_none());
        assert_approx(result[1].unwrap(), candles[0].low, DEFAULT_EPSILON);
        for (i, v) in result.iter().enumerate().skip(1) {
            assert!(v.unwrap() < candles[i].low, "SAR above low at {i}");
        }
    }

    #[test]
    fn sar_flips_on_reversal() {
        let mut data: Vec<_> = (0..8)
            .map(|i| {
                let b = 100.0 + i as f64 * 2.0;
                (b, b + 1.0, b - 1.0, b + 0.5)
            })
            .collect();
        // Crash well through the SAR.
        data.push((110.0, 110.0, 90.0, 91.0));
        let candles = make_ohlc_candles(&data);
        let mut sar = ParabolicSar::new(0.02, 0.2);
        let result = run(&mut sar, &candles);
        assert_eq!(sar.is_long(), Some(false));
        // After the flip the SAR is the prior extreme (highest high of the run).
        assert_approx(result[8].unwrap(), candles[7].high, DEFAULT_EPSILON);
    }
}
