//! Parabolic SAR trend following.
//!
//! The close crossing above the SAR dots goes long, crossing below goes
//! short. Protection uses a trailing stop.

use crate::common::{candle_type, go_long, go_short, start_protection, with_protection, CANDLE_TYPE};
use stratlab_core::domain::{Candle, SubscriptionId, Timeframe};
use stratlab_core::engine::{Handle, IndicatorOutputs};
use stratlab_core::error::EngineError;
use stratlab_core::indicators::ParabolicSar;
use stratlab_core::params::{ParamDescriptor, ParamError, ParamSet};
use stratlab_core::strategy::{Previous, StartContext, Strategy, TrackedState, TradeContext};

pub const NAME: &str = "parabolic_sar";

#[derive(Debug, Default)]
struct Tracked {
    was_above: Previous<bool>,
}

pub struct ParabolicSarTrend {
    params: ParamSet,
    sar: Option<Handle<f64>>,
    state: Tracked,
}

impl ParabolicSarTrend {
    pub fn new() -> Self {
        let params = ParamSet::new()
            .declare(
                ParamDescriptor::float("Acceleration", 0.02)
                    .range(0.005, 0.1, 0.005)
                    .optimize()
                    .display("Acceleration", "Step of the acceleration factor", "Indicators"),
            )
            .declare(
                ParamDescriptor::float("MaxAcceleration", 0.2)
                    .range(0.1, 0.5, 0.05)
                    .display("Max acceleration", "Cap of the acceleration factor", "Indicators"),
            )
            .declare(candle_type(Timeframe::H1));
        Self {
            params: with_protection(params, 3.0, 0.0),
            sar: None,
            state: Tracked::default(),
        }
    }
}

impl Default for ParabolicSarTrend {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for ParabolicSarTrend {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Follow the side of the Parabolic SAR, trailing stop attached"
    }

    fn params(&self) -> &ParamSet {
        &self.params
    }

    fn params_mut(&mut self) -> &mut ParamSet {
        &mut self.params
    }

    fn on_started(&mut self, ctx: &mut StartContext<'_>) -> Result<(), EngineError> {
        let acceleration = self.params.get_float("Acceleration")?;
        let max_acceleration = self.params.get_float("MaxAcceleration")?;
        if max_acceleration < acceleration {
            return Err(ParamError::OutOfRange {
                name: "MaxAcceleration".to_string(),
                value: max_acceleration,
                min: acceleration,
                max: 0.5,
            }
            .into());
        }
        let sub = ctx.subscribe(self.params.get_timeframe(CANDLE_TYPE)?);
        let sar = ctx.bind(sub, ParabolicSar::new(acceleration, max_acceleration))?;
        self.sar = Some(sar);
        ctx.chart_area("main").candles(sub).indicator(sar).own_trades();
        start_protection(ctx, &self.params, true)
    }

    fn on_candle(
        &mut self,
        _sub: SubscriptionId,
        candle: &Candle,
        outputs: &IndicatorOutputs,
        ctx: &mut TradeContext<'_>,
    ) -> Result<(), EngineError> {
        let Some(sar) = self.sar.and_then(|h| outputs.get(h)) else {
            return Ok(());
        };
        let above = candle.close > sar;
        let Some(was_above) = self.state.was_above.shift(above) else {
            return Ok(());
        };
        if above && !was_above {
            ctx.info(format!("close crossed above SAR {sar:.4}"));
            go_long(ctx)?;
        } else if !above && was_above {
            ctx.info(format!("close crossed below SAR {sar:.4}"));
            go_short(ctx)?;
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
