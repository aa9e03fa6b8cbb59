//! Three-bar reversal pattern.
//!
//! Bullish: two bearish candles, the second making a lower low, then a
//! bullish candle closing above the second candle's high. The strategy keeps
//! its own stop at `min(bar2.low, bar3.low) * (1 - StopBufferPercent/100)`
//! and closes the position itself when a close breaches it. Bearish is the
//! mirror image. An optional SMA trend filter requires longs above the
//! average and shorts below it.

use crate::common::{candle_type, go_long, go_short, CANDLE_TYPE};
use stratlab_core::domain::{Candle, Side, SubscriptionId, Timeframe};
use stratlab_core::engine::{Handle, IndicatorOutputs};
use stratlab_core::error::EngineError;
use stratlab_core::indicators::Sma;
use stratlab_core::params::{ParamDescriptor, ParamSet};
use stratlab_core::strategy::{Previous, StartContext, Strategy, TrackedState, TradeContext};

pub const NAME: &str = "three_bar_reversal";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reversal {
    Bullish,
    Bearish,
}

/// Classify three consecutive candles, oldest first.
pub fn detect_reversal(bar1: &Candle, bar2: &Candle, bar3: &Candle) -> Option<Reversal> {
    let falling = bar1.is_bearish() && bar2.is_bearish() && bar2.low < bar1.low;
    let rising = bar1.is_bullish() && bar2.is_bullish() && bar2.high > bar1.high;
    if falling && bar3.is_bullish() && bar3.close > bar2.high {
        Some(Reversal::Bullish)
    } else if rising && bar3.is_bearish() && bar3.close < bar2.low {
        Some(Reversal::Bearish)
    } else {
        None
    }
}

/// Protective level for a detected pattern.
pub fn stop_level(pattern: Reversal, bar2: &Candle, bar3: &Candle, buffer_percent: f64) -> f64 {
    let buffer = buffer_percent / 100.0;
    match pattern {
        Reversal::Bullish => bar2.low.min(bar3.low) * (1.0 - buffer),
        Reversal::Bearish => bar2.high.max(bar3.high) * (1.0 + buffer),
    }
}

#[derive(Debug, Default)]
struct Tracked {
    bar1: Previous<Candle>,
    bar2: Previous<Candle>,
    stop: Option<(Side, f64)>,
}

pub struct ThreeBarReversal {
    params: ParamSet,
    trend: Option<Handle<f64>>,
    state: Tracked,
}

impl ThreeBarReversal {
    pub fn new() -> Self {
        Self {
            params: ParamSet::new()
                .declare(
                    ParamDescriptor::float("StopBufferPercent", 1.0)
                        .range(0.0, 10.0, 0.25)
                        .optimize()
                        .display("Stop buffer %", "Distance below the pattern low", "Risk"),
                )
                .declare(
                    ParamDescriptor::int("TrendLength", 0)
                        .range(0.0, 400.0, 1.0)
                        .display("Trend SMA", "Trend filter period, 0 disables", "Filters"),
                )
                .declare(candle_type(Timeframe::H1)),
            trend: None,
            state: Tracked::default(),
        }
    }

    /// The stop this strategy currently holds, if any.
    pub fn stop(&self) -> Option<f64> {
        self.state.stop.map(|(_, level)| level)
    }
}

impl Default for ThreeBarReversal {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for ThreeBarReversal {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Three-bar reversal pattern with a stop under the pattern"
    }

    fn params(&self) -> &ParamSet {
        &self.params
    }

    fn params_mut(&mut self) -> &mut ParamSet {
        &mut self.params
    }

    fn on_started(&mut self, ctx: &mut StartContext<'_>) -> Result<(), EngineError> {
        let sub = ctx.subscribe(self.params.get_timeframe(CANDLE_TYPE)?);
        let trend_len = self.params.get_int("TrendLength")?;
        self.trend = if trend_len > 0 {
            Some(ctx.bind(sub, Sma::new(self.params.get_usize("TrendLength")?))?)
        } else {
            None
        };
        let chart = ctx.chart_area("main").candles(sub).own_trades();
        if let Some(trend) = self.trend {
            chart.indicator(trend);
        }
        Ok(())
    }

    fn on_candle(
        &mut self,
        _sub: SubscriptionId,
        candle: &Candle,
        outputs: &IndicatorOutputs,
        ctx: &mut TradeContext<'_>,
    ) -> Result<(), EngineError> {
        // Own stop first; it only guards the side it was placed for.
        if let Some((side, level)) = self.state.stop {
            let breached = match side {
                Side::Long => candle.close <= level,
                Side::Short => candle.close >= level,
            };
            if ctx.side() != Some(side) {
                self.state.stop = None;
            } else if breached {
                ctx.info(format!("stop {level:.4} breached at {:.4}", candle.close));
                ctx.close_position()?;
                self.state.stop = None;
            }
        }

        let (bar1, bar2) = (self.state.bar1.get(), self.state.bar2.get());
        if let Some(previous) = bar2 {
            self.state.bar1.set(previous);
        }
        self.state.bar2.set(*candle);
        let (Some(bar1), Some(bar2)) = (bar1, bar2) else {
            return Ok(());
        };

        let trend = match self.trend {
            Some(h) => match outputs.get(h) {
                Some(v) => Some(v),
                None => return Ok(()),
            },
            None => None,
        };

        let Some(pattern) = detect_reversal(&bar1, &bar2, candle) else {
            return Ok(());
        };
        let buffer = self.params.get_float("StopBufferPercent")?;
        let level = stop_level(pattern, &bar2, candle, buffer);
        match pattern {
            Reversal::Bullish if trend.map_or(true, |t| candle.close > t) => {
                if ctx.side() != Some(Side::Long) {
                    ctx.info("bullish three-bar reversal");
                    if go_long(ctx)?.is_some_and(|o| o.is_submitted()) {
                        ctx.info(format!("stop set at {level:.4}"));
                        self.state.stop = Some((Side::Long, level));
                    }
                }
            }
            Reversal::Bearish if trend.map_or(true, |t| candle.close < t) => {
                if ctx.side() != Some(Side::Short) {
                    ctx.info("bearish three-bar reversal");
                    if go_short(ctx)?.is_some_and(|o| o.is_submitted()) {
                        ctx.info(format!("stop set at {level:.4}"));
                        self.state.stop = Some((Side::Short, level));
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn on_reseted(&mut self) {
        self.state.clear();
    }

    fn create_clone(&self) -> Box<dyn Strategy> {
        let mut clone = Self::new();
        clone.params.copy_values_from(&self.params);
        Box::new(clone)
    }
}
