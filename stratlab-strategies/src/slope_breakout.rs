//! Breakout of the moving-average slope from its own recent distribution.
//!
//! The slope is the candle-to-candle change of an EMA. When it moves more
//! than `DeviationMultiplier` standard deviations away from the mean of the
//! previous `SlopeLookback` slopes the strategy goes with it. The slope
//! returning inside one deviation closes the position.

use crate::common::{candle_type, go_long, go_short, start_protection, with_protection, CANDLE_TYPE};
use stratlab_core::domain::{Candle, Side, SubscriptionId, Timeframe};
use stratlab_core::engine::{Handle, IndicatorOutputs};
use stratlab_core::error::EngineError;
use stratlab_core::indicators::{Ema, RollingStatistics};
use stratlab_core::params::{ParamDescriptor, ParamSet};
use stratlab_core::strategy::{Previous, StartContext, Strategy, TrackedState, TradeContext};

pub const NAME: &str = "slope_breakout";

#[derive(Debug, Default)]
struct Tracked {
    prev_ema: Previous<f64>,
}

pub struct SlopeBreakout {
    params: ParamSet,
    ema: Option<Handle<f64>>,
    slopes: Option<RollingStatistics>,
    state: Tracked,
}

impl SlopeBreakout {
    pub fn new() -> Self {
        let params = ParamSet::new()
            .declare(
                ParamDescriptor::int("MaLength", 20)
                    .range(1.0, 200.0, 1.0)
                    .optimize()
                    .display("EMA length", "Average whose slope is measured", "Indicators"),
            )
            .declare(
                ParamDescriptor::int("SlopeLookback", 20)
                    .range(2.0, 200.0, 1.0)
                    .display("Slope lookback", "Slopes in the reference window", "Signals"),
            )
            .declare(
                ParamDescriptor::float("DeviationMultiplier", 2.0)
                    .range(0.5, 5.0, 0.1)
                    .optimize()
                    .display("Deviations", "Standard deviations for a breakout", "Signals"),
            )
            .declare(candle_type(Timeframe::H1));
        Self {
            params: with_protection(params, 2.0, 0.0),
            ema: None,
            slopes: None,
            state: Tracked::default(),
        }
    }
}

impl Default for SlopeBreakout {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for SlopeBreakout {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Trade EMA slope outliers against the slope's rolling distribution"
    }

    fn params(&self) -> &ParamSet {
        &self.params
    }

    fn params_mut(&mut self) -> &mut ParamSet {
        &mut self.params
    }

    fn on_started(&mut self, ctx: &mut StartContext<'_>) -> Result<(), EngineError> {
        let sub = ctx.subscribe(self.params.get_timeframe(CANDLE_TYPE)?);
        let ema = ctx.bind(sub, Ema::new(self.params.get_usize("MaLength")?))?;
        self.ema = Some(ema);
        self.slopes = Some(RollingStatistics::new(self.params.get_usize("SlopeLookback")?));
        ctx.chart_area("main").candles(sub).indicator(ema).own_trades();
        start_protection(ctx, &self.params, false)
    }

    fn on_candle(
        &mut self,
        _sub: SubscriptionId,
        _candle: &Candle,
        outputs: &IndicatorOutputs,
        ctx: &mut TradeContext<'_>,
    ) -> Result<(), EngineError> {
        let Some(ema) = self.ema.and_then(|h| outputs.get(h)) else {
            return Ok(());
        };
        let Some(prev_ema) = self.state.prev_ema.shift(ema) else {
            return Ok(());
        };
        let multiplier = self.params.get_float("DeviationMultiplier")?;
        let Some(slopes) = self.slopes.as_mut() else {
            return Ok(());
        };
        let slope = ema - prev_ema;

        // Judge against the window as it was, then add the new slope.
        let reference = match (slopes.is_full(), slopes.mean(), slopes.std_dev()) {
            (true, Some(mean), Some(sd)) if sd > f64::EPSILON => Some((mean, sd)),
            _ => None,
        };
        slopes.push(slope);
        let Some((mean, sd)) = reference else {
            return Ok(());
        };
        let deviations = (slope - mean) / sd;

        match ctx.side() {
            Some(Side::Long) if deviations < 1.0 => {
                ctx.info(format!("slope back to {deviations:.2} sd, exit long"));
                ctx.close_position()?;
                return Ok(());
            }
            Some(Side::Short) if deviations > -1.0 => {
                ctx.info(format!("slope back to {deviations:.2} sd, exit short"));
                ctx.close_position()?;
                return Ok(());
            }
            _ => {}
        }

        if deviations > multiplier {
            ctx.info(format!("slope breakout up, {deviations:.2} sd"));
            go_long(ctx)?;
        } else if deviations < -multiplier {
            ctx.info(format!("slope breakout down, {deviations:.2} sd"));
            go_short(ctx)?;
        }
        Ok(())
    }

    fn on_reseted(&mut self) {
        self.state.clear();
        self.slopes = None;
    }

    fn create_clone(&self) -> Box<dyn Strategy> {
        let mut clone = Self::new();
        clone.params.copy_values_from(&self.params);
        Box::new(clone)
    }
}
