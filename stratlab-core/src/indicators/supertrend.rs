//! Supertrend: ATR-based trailing band that flips with the trend.
//!
//! basic bands = hl2 +/- multiplier * ATR(period). The final upper band only
//! tightens (min with the previous final upper) while the previous close stayed
//! at or below it; otherwise it resets to the basic band. The lower band is
//! symmetric. The trend flips when the close crosses the active band.
//!
//! Output: the active band (lower in an uptrend, upper in a downtrend) and the
//! direction. Formed with the ATR, after `period` inputs; starts in an uptrend.

use super::{Atr, Indicator, IndicatorInput, InputShape, SupertrendValue};

#[derive(Debug, Clone, Copy)]
struct Bands {
    upper: f64,
    lower: f64,
    up_trend: bool,
}

#[derive(Debug, Clone)]
pub struct Supertrend {
    period: usize,
    multiplier: f64,
    name: String,
    atr: Atr,
    prev_close: Option<f64>,
    bands: Option<Bands>,
}

impl Supertrend {
    pub fn new(period: usize, multiplier: f64) -> Self {
        assert!(period >= 1, "Supertrend period must be >= 1");
        Self {
            period,
            multiplier,
            name: format!("supertrend_{period}_{multiplier}"),
            atr: Atr::new(period),
            prev_close: None,
            bands: None,
        }
    }
}

impl Indicator for Supertrend {
    type Output = SupertrendValue;

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

    fn next(&mut self, input: &IndicatorInput) -> Option<SupertrendValue> {
        let close = input.price();
        let prev_close = self.prev_close.replace(close);
        let atr = self.atr.next(input)?;

        let hl2 = input.median_price();
        let basic_upper = hl2 + self.multiplier * atr;
        let basic_lower = hl2 - self.multiplier * atr;

        let bands = match (self.bands, prev_close) {
            (Some(prev), Some(pc)) => {
                let upper = if pc <= prev.upper {
                    basic_upper.min(prev.upper)
                } else {
                    basic_upper
                };
                let lower = if pc >= prev.lower {
                    basic_lower.max(prev.lower)
                } else {
                    basic_lower
                };
                let up_trend = if prev.up_trend && close < lower {
                    false
                } else if !prev.up_trend && close > upper {
                    true
                } else {
                    prev.up_trend
                };
                Bands {
                    upper,
                    lower,
                    up_trend,
                }
            }
            _ => Bands {
                upper: basic_upper,
                lower: basic_lower,
                up_trend: true,
            },
        };
        self.bands = Some(bands);

        Some(SupertrendValue {
            value: if bands.up_trend {
                bands.lower
            } else {
                bands.upper
            },
            is_up_trend: bands.up_trend,
        })
    }

    fn reset(&mut self) {
        self.atr.reset();
        self.prev_close = None;
        self.bands = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{make_ohlc_candles, run};

    #[test]
    fn supertrend_uptrend_below_price() {
        let data: Vec<_> = (0..20)
            .map(|i| {
                let b = 100.0 + i as f64 * 2.0;
                (b, b + 2.0, b - 1.0, b + 1.5)
            })
            .collect();
        let candles = make_ohlc_candles(&data);
        let result = run(&mut Supertrend::new(5, 3.0), &candles);
        assert!(result[3].is_none());
        for (i, v) in result.iter().enumerate().skip(4) {
            let v = v.unwrap();
            assert!(v.is_up_trend);
            assert!(v.value < candles[i].close, "band above close at {i}");
        }
    }

    #[test]
    fn supertrend_flips_down_on_crash() {
        let mut data: Vec<_> = (0..10)
            .map(|i| {
                let b = 100.0 + i as f64;
                (b, b + 1.0, b - 1.0, b + 0.5)
            })
            .collect();
        for i in 0..5 {
            let b = 90.0 - i as f64 * 5.0;
            data.push((b, b + 1.0, b - 1.0, b - 0.5));
        }
        let candles = make_ohlc_candles(&data);
        let result = run(&mut Supertrend::new(3, 2.0), &candles);
        let last = result.last().copied().flatten().unwrap();
        assert!(!last.is_up_trend);
        assert!(last.value > candles.last().unwrap().close);
    }

    #[test]
    fn lower_band_only_ratchets_up_in_trend() {
        let data: Vec<_> = (0..25)
            .map(|i| {
                let b = 100.0 + i as f64;
                (b, b + 1.0, b - 1.0, b + 0.5)
            })
            .collect();
        let candles = make_ohlc_candles(&data);
        let result = run(&mut Supertrend::new(4, 2.0), &candles);
        let values: Vec<f64> = result.iter().flatten().map(|v| v.value).collect();
        for w in values.windows(2) {
            assert!(w[1] >= w[0] - 1e-12);
        }
    }
}
